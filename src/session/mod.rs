//! Per-connection voice pipeline session
//!
//! Each connection gets one [`Session`] driving three concurrent tasks: one
//! receiving client frames, one connecting finalized transcripts through the
//! LLM into synthesis, and one streaming synthesized audio back. The tasks
//! are joined as a unit; when any of them exits the others are cancelled and
//! teardown runs exactly once.

mod history;
mod state;

pub use history::{ChatHistory, ChatTurn, Role};
pub use state::{AgentState, StateCell};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::{Mutex, mpsc};

use crate::api::protocol::{ControlMessage, ServerEvent};
use crate::asr::AsrStream;
use crate::config::Config;
use crate::engines::EngineCatalog;
use crate::llm::LlmClient;
use crate::tts::{NumberExpansion, TextTransform, TtsStream};
use crate::{Error, Result};

/// Poll interval while the pipeline task waits for an ASR stream
const ASR_WAIT: Duration = Duration::from_millis(500);
/// Poll interval while the send task waits for a TTS stream
const TTS_WAIT: Duration = Duration::from_millis(100);
/// Pause hint between sentence units, forwarded to clients for pacing
const SENTENCE_PAUSE: f32 = 0.2;

/// Frame arriving from the client transport
#[derive(Debug)]
pub enum Inbound {
    Text(String),
    Binary(Vec<u8>),
}

/// Frame leaving for the client transport
#[derive(Debug)]
pub enum Outbound {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

/// Per-session overrides carried by `start_session`, layered over config
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionOverrides {
    pub asr_model: Option<String>,
    pub asr_lang: Option<String>,
    pub llm_model: Option<String>,
    pub sample_rate: Option<u32>,
    pub speed: Option<f32>,
    pub tts_model: Option<String>,
    pub tts_speaker: Option<String>,
    pub split: Option<bool>,
}

/// Mutable session state shared by the three tasks
struct Shared {
    asr: Mutex<Option<Arc<AsrStream>>>,
    tts: Mutex<Option<Arc<TtsStream>>>,
    state: StateCell,
    history: Mutex<ChatHistory>,
    llm_model: Mutex<String>,
    tts_split: AtomicBool,
    torn_down: AtomicBool,
}

/// One live voice pipeline session
pub struct Session {
    client_id: String,
    config: Config,
    catalog: Arc<EngineCatalog>,
    llm: Arc<LlmClient>,
    outbound: mpsc::Sender<Outbound>,
    shared: Shared,
}

impl Session {
    #[must_use]
    pub fn new(
        client_id: String,
        config: Config,
        catalog: Arc<EngineCatalog>,
        llm: Arc<LlmClient>,
        outbound: mpsc::Sender<Outbound>,
    ) -> Arc<Self> {
        let shared = Shared {
            asr: Mutex::new(None),
            tts: Mutex::new(None),
            state: StateCell::new(outbound.clone()),
            history: Mutex::new(ChatHistory::new(config.llm.system_prompt.clone())),
            llm_model: Mutex::new(config.llm.model.clone()),
            tts_split: AtomicBool::new(config.tts.split),
            torn_down: AtomicBool::new(false),
        };

        Arc::new(Self {
            client_id,
            config,
            catalog,
            llm,
            outbound,
            shared,
        })
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Drive the session until the connection ends or a task finishes
    ///
    /// Joins the three pipeline tasks; the first to exit cancels the others,
    /// then teardown runs and the transport is asked to close.
    pub async fn run(self: Arc<Self>, inbound: mpsc::Receiver<Inbound>) {
        let mut receive = tokio::spawn(Arc::clone(&self).receive_loop(inbound));
        let mut pipeline = tokio::spawn(Arc::clone(&self).pipeline_loop());
        let mut send = tokio::spawn(Arc::clone(&self).send_loop());

        tokio::select! {
            _ = &mut receive => {
                tracing::debug!(client_id = %self.client_id, "receive task finished");
            }
            _ = &mut pipeline => {
                tracing::debug!(client_id = %self.client_id, "pipeline task finished");
            }
            _ = &mut send => {
                tracing::debug!(client_id = %self.client_id, "send task finished");
            }
        }

        receive.abort();
        pipeline.abort();
        send.abort();

        self.teardown().await;
        let _ = self.outbound.send(Outbound::Close).await;
    }

    /// Release session resources; safe to call more than once
    pub async fn teardown(&self) {
        if self.shared.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!(client_id = %self.client_id, "tearing down session");

        if let Some(asr) = self.shared.asr.lock().await.take() {
            asr.close();
        }
        if let Some(tts) = self.shared.tts.lock().await.take() {
            tts.close();
        }
    }

    /// Receive task: control messages and state-gated audio forwarding
    async fn receive_loop(self: Arc<Self>, mut inbound: mpsc::Receiver<Inbound>) {
        while let Some(frame) = inbound.recv().await {
            match frame {
                Inbound::Text(text) => self.handle_control(&text).await,
                Inbound::Binary(data) => self.handle_audio(&data).await,
            }
        }
    }

    async fn handle_control(&self, text: &str) {
        let message = match serde_json::from_str::<ControlMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(client_id = %self.client_id, error = %e, "ignoring malformed control message");
                return;
            }
        };

        match message {
            ControlMessage::Ping => {
                self.send_event(&ServerEvent::Pong).await;
            }
            ControlMessage::StartSession(overrides) => {
                if let Err(e) = self.start_session(overrides).await {
                    tracing::error!(client_id = %self.client_id, error = %e, "session start failed");
                    self.send_event(&ServerEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                    let _ = self.outbound.send(Outbound::Close).await;
                }
            }
            ControlMessage::EndSession => {
                self.end_session().await;
            }
        }
    }

    /// Forward audio to the recognizer, but only while listening
    async fn handle_audio(&self, data: &[u8]) {
        if self.shared.state.get() != AgentState::Listening {
            return;
        }
        let asr = self.shared.asr.lock().await.clone();
        if let Some(asr) = asr {
            asr.write(data);
        }
    }

    /// Build both streams from overrides layered over config defaults
    async fn start_session(&self, overrides: SessionOverrides) -> Result<()> {
        tracing::info!(client_id = %self.client_id, "starting voice session");

        if let Some(rate) = overrides.sample_rate {
            if !(8_000..=192_000).contains(&rate) {
                return Err(Error::Config(format!("unsupported sample rate: {rate}")));
            }
        }

        let llm_model = overrides
            .llm_model
            .unwrap_or_else(|| self.config.llm.model.clone());
        *self.shared.llm_model.lock().await = llm_model.clone();

        let asr_model = overrides
            .asr_model
            .unwrap_or_else(|| self.config.asr.model.clone());
        let asr_lang = overrides
            .asr_lang
            .unwrap_or_else(|| self.config.asr.lang.clone());
        let asr_rate = overrides.sample_rate.unwrap_or(self.config.asr.sample_rate);

        tracing::info!(
            client_id = %self.client_id,
            asr_model = %asr_model,
            asr_lang = %asr_lang,
            llm_model = %llm_model,
            "session configuration resolved"
        );

        let asr_engine = self.catalog.asr(&asr_model).await?;
        let asr_stream = AsrStream::start(&asr_engine, asr_rate)?;
        *self.shared.asr.lock().await = Some(Arc::clone(&asr_stream));

        let tts_model = overrides
            .tts_model
            .unwrap_or_else(|| self.config.tts.model.clone());
        let tts_speaker = overrides
            .tts_speaker
            .unwrap_or_else(|| self.config.tts.speaker.clone());
        let tts_rate = overrides.sample_rate.unwrap_or(self.config.tts.sample_rate);
        let tts_speed = overrides.speed.unwrap_or(self.config.tts.speed);
        let split = overrides.split.unwrap_or(self.config.tts.split);
        self.shared.tts_split.store(split, Ordering::SeqCst);

        let tts_engine = match self.catalog.tts(&tts_model).await {
            Ok(engine) => engine,
            Err(e) => {
                // ASR is already live; release it before failing the start
                asr_stream.close();
                *self.shared.asr.lock().await = None;
                return Err(e);
            }
        };
        let transforms: Vec<Box<dyn TextTransform>> = vec![Box::new(NumberExpansion)];
        let tts_stream = TtsStream::start(tts_engine, tts_speaker, tts_speed, tts_rate, transforms);
        *self.shared.tts.lock().await = Some(tts_stream);

        self.send_event(&ServerEvent::SessionStarted {
            client_id: self.client_id.clone(),
            mode: "voice_agent".to_string(),
            pipeline: "audio -> ASR -> LLM -> TTS -> audio".to_string(),
            llm_model,
        })
        .await;

        self.shared.state.set(AgentState::Listening);
        Ok(())
    }

    /// Acknowledge and close both streams; the session object survives
    ///
    /// The ack goes out first: closing the ASR stream ends the pipeline
    /// task, which cancels this one.
    async fn end_session(&self) {
        tracing::info!(client_id = %self.client_id, "ending voice session");
        self.send_event(&ServerEvent::SessionEnded).await;

        if let Some(asr) = self.shared.asr.lock().await.as_ref() {
            asr.close();
        }
        if let Some(tts) = self.shared.tts.lock().await.as_ref() {
            tts.close();
        }
    }

    /// Pipeline task: transcripts through the LLM into synthesis
    async fn pipeline_loop(self: Arc<Self>) {
        loop {
            let asr = self.shared.asr.lock().await.clone();
            let Some(asr) = asr else {
                tokio::time::sleep(ASR_WAIT).await;
                continue;
            };

            let Some(event) = asr.read().await else {
                return;
            };

            // Forward every transcription event for client-side display
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if self.outbound.send(Outbound::Text(json)).await.is_err() {
                        return;
                    }
                }
                Err(e) => {
                    tracing::error!(client_id = %self.client_id, error = %e, "transcript serialization failed");
                }
            }

            let user_text = event.text.trim();
            if event.finished && !user_text.is_empty() {
                self.run_turn(user_text).await;
            }
        }
    }

    /// One conversational turn: transcript in, synthesized reply out
    async fn run_turn(&self, user_text: &str) {
        let tts = self.shared.tts.lock().await.clone();
        let Some(tts) = tts else {
            tracing::warn!(client_id = %self.client_id, "final transcript with no TTS stream, dropping");
            return;
        };

        // A turn already in flight owns the pipeline; late finals are dropped
        let state = self.shared.state.get();
        if state != AgentState::Listening {
            tracing::warn!(
                client_id = %self.client_id,
                state = state.as_str(),
                "ignoring transcription, agent is busy"
            );
            return;
        }

        self.shared.state.set(AgentState::Thinking);
        tracing::info!(client_id = %self.client_id, text = %user_text, "user said");

        let messages = {
            let mut history = self.shared.history.lock().await;
            history.push_user(user_text);
            history.trimmed(self.config.llm.history_max_tokens)
        };
        let model = self.shared.llm_model.lock().await.clone();
        let split = self.shared.tts_split.load(Ordering::SeqCst);

        match self.llm.chat(&model, &messages).await {
            Ok(reply) if !reply.is_empty() => {
                tracing::info!(client_id = %self.client_id, text = %reply, "assistant replied");
                self.shared.history.lock().await.push_assistant(reply.clone());
                self.shared.state.set(AgentState::Speaking);
                tts.write(&reply, split, SENTENCE_PAUSE).await;
            }
            Ok(_) => {
                tracing::warn!(client_id = %self.client_id, "empty LLM reply, returning to listening");
                self.shared.state.set(AgentState::Listening);
            }
            Err(e) => {
                tracing::error!(client_id = %self.client_id, error = %e, "LLM call failed, echoing transcript");
                self.shared.state.set(AgentState::Speaking);
                tts.write(user_text, split, SENTENCE_PAUSE).await;
            }
        }
    }

    /// Send task: synthesized audio back to the client
    async fn send_loop(self: Arc<Self>) {
        loop {
            let tts = self.shared.tts.lock().await.clone();
            let Some(tts) = tts else {
                tokio::time::sleep(TTS_WAIT).await;
                continue;
            };

            let Some(event) = tts.read().await else {
                return;
            };

            if event.finished {
                let notification = event.to_notification().to_string();
                if self.outbound.send(Outbound::Text(notification)).await.is_err() {
                    return;
                }
                self.shared.state.set(AgentState::Listening);
            } else if let Some(audio) = event.audio {
                if self.outbound.send(Outbound::Binary(audio)).await.is_err() {
                    return;
                }
            }
        }
    }

    async fn send_event(&self, event: &ServerEvent) {
        match serde_json::to_string(event) {
            Ok(json) => {
                let _ = self.outbound.send(Outbound::Text(json)).await;
            }
            Err(e) => {
                tracing::error!(client_id = %self.client_id, error = %e, "event serialization failed");
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}
