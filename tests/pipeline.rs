//! Session pipeline integration tests
//!
//! Drives full sessions over in-memory channels with scripted engines and a
//! mocked LLM endpoint; no audio hardware or real models involved.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{DecodeStep, ScriptedAsrEngine, TestSession, ToneTtsEngine, test_config};
use voxgate::session::Outbound;

fn is_state(v: &Value, state: &str) -> bool {
    v["type"] == "state_change" && v["state"] == state
}

fn is_transcript(v: &Value) -> bool {
    v.get("type").is_none() && v.get("idx").is_some()
}

fn is_synthesis_finished(v: &Value) -> bool {
    v.get("progress").is_some() && v["finished"] == true
}

async fn mount_llm_reply(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": content}}]
        })))
        .mount(server)
        .await;
}

/// Spawn a session and complete the start handshake
async fn started_session(
    server: &MockServer,
    asr: Arc<ScriptedAsrEngine>,
    tts: Arc<ToneTtsEngine>,
) -> TestSession {
    let config = test_config(&format!("{}/v1/chat/completions", server.uri()));
    let mut session = TestSession::spawn(config, asr, tts);

    session.send_text(r#"{"type":"start_session"}"#).await;
    let started = session
        .next_json_where(|v| v["type"] == "session_started")
        .await;
    assert_eq!(started["client_id"], "test-client");
    assert_eq!(started["mode"], "voice_agent");
    session.next_json_where(|v| is_state(v, "listening")).await;
    session
}

#[tokio::test]
async fn full_turn_reaches_every_state_in_order() {
    let server = MockServer::start().await;
    mount_llm_reply(&server, "Hi there.").await;

    let asr = Arc::new(ScriptedAsrEngine::new(vec![
        DecodeStep::Hypothesis("hello"),
        DecodeStep::Endpoint,
    ]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let mut session = started_session(&server, asr, Arc::clone(&tts)).await;

    session.send_audio_frame().await;
    session.send_audio_frame().await;

    let partial = session.next_json_where(is_transcript).await;
    assert_eq!(partial["text"], "hello");
    assert_eq!(partial["finished"], false);

    let fin = session
        .next_json_where(|v| is_transcript(v) && v["finished"] == true)
        .await;
    assert_eq!(fin["text"], "hello");
    assert_eq!(fin["idx"], 0);

    session.next_json_where(|v| is_state(v, "thinking")).await;
    session.next_json_where(|v| is_state(v, "speaking")).await;

    let audio = session.next_audio().await;
    assert_eq!(&audio[..4], b"RIFF");

    let notification = session.next_json_where(is_synthesis_finished).await;
    assert_eq!(notification["progress"], 1.0);
    session.next_json_where(|v| is_state(v, "listening")).await;

    assert_eq!(tts.synthesized.lock().unwrap().as_slice(), ["Hi there"]);
}

#[tokio::test]
async fn partial_transcripts_are_deduplicated() {
    let server = MockServer::start().await;
    mount_llm_reply(&server, "ok").await;

    let asr = Arc::new(ScriptedAsrEngine::new(vec![
        DecodeStep::Hypothesis("he"),
        DecodeStep::Hypothesis("he"),
        DecodeStep::Hypothesis("hello"),
        DecodeStep::Endpoint,
    ]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let mut session = started_session(&server, asr, tts).await;

    for _ in 0..4 {
        session.send_audio_frame().await;
    }

    let mut texts = Vec::new();
    loop {
        let event = session.next_json_where(is_transcript).await;
        let finished = event["finished"] == true;
        texts.push(event["text"].as_str().unwrap().to_string());
        if finished {
            break;
        }
    }

    assert_eq!(texts, ["he", "hello", "hello"]);
}

#[tokio::test]
async fn audio_is_dropped_while_thinking() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "done"}}]}))
                .set_delay(Duration::from_millis(600)),
        )
        .mount(&server)
        .await;

    let asr = Arc::new(ScriptedAsrEngine::new(vec![
        DecodeStep::Hypothesis("hello"),
        DecodeStep::Endpoint,
    ]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let mut session = started_session(&server, Arc::clone(&asr), tts).await;

    session.send_audio_frame().await;
    session.send_audio_frame().await;
    session.next_json_where(|v| is_state(v, "thinking")).await;

    // These frames arrive while the turn is still resolving
    for _ in 0..3 {
        session.send_audio_frame().await;
    }
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(session.asr.accept_count(), 2);

    session.next_json_where(|v| is_state(v, "listening")).await;
    assert_eq!(session.asr.accept_count(), 2);
}

#[tokio::test]
async fn llm_failure_echoes_transcript_through_tts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let asr = Arc::new(ScriptedAsrEngine::new(vec![
        DecodeStep::Hypothesis("hello world"),
        DecodeStep::Endpoint,
    ]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let mut session = started_session(&server, asr, Arc::clone(&tts)).await;

    session.send_audio_frame().await;
    session.send_audio_frame().await;

    session.next_json_where(|v| is_state(v, "thinking")).await;
    session.next_json_where(|v| is_state(v, "speaking")).await;

    let audio = session.next_audio().await;
    assert_eq!(&audio[..4], b"RIFF");
    session.next_json_where(is_synthesis_finished).await;
    session.next_json_where(|v| is_state(v, "listening")).await;

    assert_eq!(tts.synthesized.lock().unwrap().as_slice(), ["hello world"]);
}

#[tokio::test]
async fn empty_llm_reply_returns_to_listening_silently() {
    let server = MockServer::start().await;
    mount_llm_reply(&server, "").await;

    let asr = Arc::new(ScriptedAsrEngine::new(vec![
        DecodeStep::Hypothesis("anyone there"),
        DecodeStep::Endpoint,
    ]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let mut session = started_session(&server, asr, Arc::clone(&tts)).await;

    session.send_audio_frame().await;
    session.send_audio_frame().await;

    session.next_json_where(|v| is_state(v, "thinking")).await;
    let next_state = session
        .next_json_where(|v| v["type"] == "state_change")
        .await;
    assert_eq!(next_state["state"], "listening");
    assert!(tts.synthesized.lock().unwrap().is_empty());
}

#[tokio::test]
async fn split_synthesis_preserves_sentence_order() {
    let server = MockServer::start().await;
    mount_llm_reply(&server, "Hello. World!").await;

    let asr = Arc::new(ScriptedAsrEngine::new(vec![
        DecodeStep::Hypothesis("hi"),
        DecodeStep::Endpoint,
    ]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let mut session = started_session(&server, asr, Arc::clone(&tts)).await;

    session.send_audio_frame().await;
    session.send_audio_frame().await;

    let first = session.next_audio().await;
    let second = session.next_audio().await;
    assert_eq!(&first[..4], b"RIFF");
    assert_eq!(&second[..4], b"RIFF");

    session.next_json_where(is_synthesis_finished).await;
    assert_eq!(tts.synthesized.lock().unwrap().as_slice(), ["Hello", "World"]);
}

#[tokio::test]
async fn failed_sub_unit_is_skipped_not_fatal() {
    let server = MockServer::start().await;
    mount_llm_reply(&server, "Good. Bad. Ugly.").await;

    let asr = Arc::new(ScriptedAsrEngine::new(vec![
        DecodeStep::Hypothesis("go"),
        DecodeStep::Endpoint,
    ]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    tts.fail_on("Bad");
    let mut session = started_session(&server, asr, Arc::clone(&tts)).await;

    session.send_audio_frame().await;
    session.send_audio_frame().await;

    let _ = session.next_audio().await;
    let _ = session.next_audio().await;
    let notification = session.next_json_where(is_synthesis_finished).await;
    assert_eq!(notification["finished"], true);
    session.next_json_where(|v| is_state(v, "listening")).await;

    assert_eq!(tts.synthesized.lock().unwrap().as_slice(), ["Good", "Ugly"]);
}

#[tokio::test]
async fn synthesis_resamples_to_session_rate() {
    let server = MockServer::start().await;
    mount_llm_reply(&server, "Hello.").await;

    let asr = Arc::new(ScriptedAsrEngine::new(vec![
        DecodeStep::Hypothesis("hi"),
        DecodeStep::Endpoint,
    ]));
    // Engine speaks at 22050 Hz, session wants 16000 Hz
    let tts = Arc::new(ToneTtsEngine::new(22_050));
    let mut session = started_session(&server, asr, tts).await;

    session.send_audio_frame().await;
    session.send_audio_frame().await;

    let audio = session.next_audio().await;
    assert_eq!(&audio[..4], b"RIFF");
    // WAV fmt chunk sample rate field, little endian at offset 24
    let rate = u32::from_le_bytes([audio[24], audio[25], audio[26], audio[27]]);
    assert_eq!(rate, 16_000);
}

#[tokio::test]
async fn ping_gets_pong_without_a_session() {
    let server = MockServer::start().await;
    let asr = Arc::new(ScriptedAsrEngine::new(vec![]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let config = test_config(&format!("{}/v1/chat/completions", server.uri()));
    let mut session = TestSession::spawn(config, asr, tts);

    session.send_text(r#"{"type":"ping"}"#).await;
    let pong = session.next_json().await;
    assert_eq!(pong["type"], "pong");
}

#[tokio::test]
async fn malformed_control_messages_are_ignored() {
    let server = MockServer::start().await;
    let asr = Arc::new(ScriptedAsrEngine::new(vec![]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let config = test_config(&format!("{}/v1/chat/completions", server.uri()));
    let mut session = TestSession::spawn(config, asr, tts);

    session.send_text("not json at all").await;
    session.send_text(r#"{"type":"dance"}"#).await;
    session.send_text(r#"{"type":"ping"}"#).await;

    // The connection survived both bad messages
    let pong = session.next_json().await;
    assert_eq!(pong["type"], "pong");
}

#[tokio::test]
async fn unknown_asr_model_fails_start_and_disconnects() {
    let server = MockServer::start().await;
    let asr = Arc::new(ScriptedAsrEngine::new(vec![]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let config = test_config(&format!("{}/v1/chat/completions", server.uri()));
    let mut session = TestSession::spawn(config, asr, tts);

    session
        .send_text(r#"{"type":"start_session","asr_model":"missing-model"}"#)
        .await;

    let error = session.next_json().await;
    assert_eq!(error["type"], "error");
    assert!(error["message"].as_str().unwrap().contains("missing-model"));

    let close = tokio::time::timeout(Duration::from_secs(5), session.outbound.recv())
        .await
        .expect("timed out waiting for close");
    assert!(matches!(close, Some(Outbound::Close) | None));
}

#[tokio::test]
async fn zero_sample_rate_override_fails_start_and_disconnects() {
    let server = MockServer::start().await;
    let asr = Arc::new(ScriptedAsrEngine::new(vec![]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let config = test_config(&format!("{}/v1/chat/completions", server.uri()));
    let mut session = TestSession::spawn(config, asr, tts);

    session
        .send_text(r#"{"type":"start_session","sample_rate":0}"#)
        .await;

    let error = session.next_json().await;
    assert_eq!(error["type"], "error");
    assert!(error["message"].as_str().unwrap().contains("sample rate"));

    let close = tokio::time::timeout(Duration::from_secs(5), session.outbound.recv())
        .await
        .expect("timed out waiting for close");
    assert!(matches!(close, Some(Outbound::Close) | None));
}

#[tokio::test]
async fn end_session_acknowledges_and_teardown_is_idempotent() {
    let server = MockServer::start().await;
    mount_llm_reply(&server, "ok").await;

    let asr = Arc::new(ScriptedAsrEngine::new(vec![DecodeStep::Silence]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let mut session = started_session(&server, asr, tts).await;

    session.send_text(r#"{"type":"end_session"}"#).await;
    let ended = session
        .next_json_where(|v| v["type"] == "session_ended")
        .await;
    assert_eq!(ended["type"], "session_ended");

    // Closing the streams ends the pipeline task and the whole session
    let _ = tokio::time::timeout(Duration::from_secs(5), &mut session.handle).await;

    session.session.teardown().await;
    session.session.teardown().await;
}

#[tokio::test]
async fn session_start_overrides_llm_model() {
    let server = MockServer::start().await;
    mount_llm_reply(&server, "ok").await;

    let asr = Arc::new(ScriptedAsrEngine::new(vec![]));
    let tts = Arc::new(ToneTtsEngine::new(16_000));
    let config = test_config(&format!("{}/v1/chat/completions", server.uri()));
    let mut session = TestSession::spawn(config, asr, tts);

    session
        .send_text(r#"{"type":"start_session","llm_model":"bigger-model"}"#)
        .await;
    let started = session
        .next_json_where(|v| v["type"] == "session_started")
        .await;
    assert_eq!(started["llm_model"], "bigger-model");
}
