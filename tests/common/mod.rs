//! Shared test utilities: scripted engines and session plumbing

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use voxgate::Config;
use voxgate::asr::{AsrDecoder, AsrEngine};
use voxgate::config::{AsrConfig, LlmConfig, ServerConfig, TtsConfig};
use voxgate::engines::{AsrEngineLoader, EngineCatalog, TtsEngineLoader};
use voxgate::llm::LlmClient;
use voxgate::session::{Inbound, Outbound, Session};
use voxgate::tts::{SynthesizedAudio, TtsEngine};

/// One scripted reaction per audio frame fed to the decoder
#[derive(Debug, Clone)]
pub enum DecodeStep {
    /// Produce a ready frame whose decode yields this hypothesis
    Hypothesis(&'static str),
    /// Signal utterance end; the current hypothesis becomes final
    Endpoint,
    /// Nothing recognized in this frame
    Silence,
}

/// Decoder that follows a fixed script, one step per `accept` call
pub struct ScriptedDecoder {
    script: Vec<DecodeStep>,
    cursor: usize,
    ready: bool,
    text: String,
    endpoint: bool,
    accepts: Arc<AtomicUsize>,
}

impl AsrDecoder for ScriptedDecoder {
    fn accept(&mut self, _sample_rate: u32, _samples: &[f32]) {
        self.accepts.fetch_add(1, Ordering::SeqCst);
        let step = self.script.get(self.cursor).cloned();
        self.cursor += 1;
        match step {
            Some(DecodeStep::Hypothesis(text)) => {
                self.ready = true;
                self.text = text.to_string();
                self.endpoint = false;
            }
            Some(DecodeStep::Endpoint) => {
                self.ready = false;
                self.endpoint = true;
            }
            Some(DecodeStep::Silence) | None => {
                self.ready = false;
                self.endpoint = false;
            }
        }
    }

    fn has_ready_frame(&self) -> bool {
        self.ready
    }

    fn decode_ready_frame(&mut self) -> voxgate::Result<()> {
        self.ready = false;
        Ok(())
    }

    fn is_endpoint(&self) -> bool {
        self.endpoint
    }

    fn current_text(&self) -> String {
        self.text.clone()
    }

    fn reset_utterance(&mut self) {
        self.text.clear();
        self.endpoint = false;
    }
}

/// ASR engine handing out scripted decoders
pub struct ScriptedAsrEngine {
    script: Vec<DecodeStep>,
    pub accepts: Arc<AtomicUsize>,
}

impl ScriptedAsrEngine {
    #[must_use]
    pub fn new(script: Vec<DecodeStep>) -> Self {
        Self {
            script,
            accepts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn accept_count(&self) -> usize {
        self.accepts.load(Ordering::SeqCst)
    }
}

impl AsrEngine for ScriptedAsrEngine {
    fn create_decoder(&self) -> voxgate::Result<Box<dyn AsrDecoder>> {
        Ok(Box::new(ScriptedDecoder {
            script: self.script.clone(),
            cursor: 0,
            ready: false,
            text: String::new(),
            endpoint: false,
            accepts: Arc::clone(&self.accepts),
        }))
    }
}

/// TTS engine emitting fixed-length tones, with optional per-text failures
pub struct ToneTtsEngine {
    native_rate: u32,
    failing: Mutex<HashSet<String>>,
    pub synthesized: Mutex<Vec<String>>,
}

impl ToneTtsEngine {
    #[must_use]
    pub fn new(native_rate: u32) -> Self {
        Self {
            native_rate,
            failing: Mutex::new(HashSet::new()),
            synthesized: Mutex::new(Vec::new()),
        }
    }

    /// Make synthesis fail for this exact text
    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }
}

impl TtsEngine for ToneTtsEngine {
    #[allow(clippy::cast_precision_loss)]
    fn synthesize(
        &self,
        text: &str,
        _speaker: &str,
        _target_rate: u32,
    ) -> voxgate::Result<SynthesizedAudio> {
        if self.failing.lock().unwrap().contains(text) {
            return Err(voxgate::Error::Tts(format!("scripted failure: {text}")));
        }
        self.synthesized.lock().unwrap().push(text.to_string());

        // 100ms of quiet tone at the native rate
        let n = usize::try_from(self.native_rate / 10).unwrap();
        let samples = (0..n).map(|i| ((i % 7) as f32 - 3.0) * 0.01).collect();
        Ok(SynthesizedAudio {
            samples,
            sample_rate: self.native_rate,
        })
    }
}

struct FixedAsrLoader(Arc<ScriptedAsrEngine>);

#[async_trait]
impl AsrEngineLoader for FixedAsrLoader {
    async fn load(&self, _model: &str) -> voxgate::Result<Arc<dyn AsrEngine>> {
        Ok(Arc::clone(&self.0) as Arc<dyn AsrEngine>)
    }
}

struct FixedTtsLoader(Arc<ToneTtsEngine>);

#[async_trait]
impl TtsEngineLoader for FixedTtsLoader {
    async fn load(&self, _model: &str) -> voxgate::Result<Arc<dyn TtsEngine>> {
        Ok(Arc::clone(&self.0) as Arc<dyn TtsEngine>)
    }
}

/// Config with fast defaults pointing the LLM at `llm_endpoint`
#[must_use]
pub fn test_config(llm_endpoint: &str) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            models_root: PathBuf::from("/tmp/voxgate-test-models"),
            engine_threads: 2,
        },
        llm: LlmConfig {
            endpoint: llm_endpoint.to_string(),
            model: "test-llm".to_string(),
            system_prompt: "You are a test assistant.".to_string(),
            temperature: 0.0,
            max_tokens: 64,
            history_max_tokens: 800,
        },
        asr: AsrConfig {
            model: "test-asr".to_string(),
            lang: "en".to_string(),
            sample_rate: 16_000,
        },
        tts: TtsConfig {
            model: "test-tts".to_string(),
            speaker: "0".to_string(),
            sample_rate: 16_000,
            speed: 1.0,
            split: true,
        },
    }
}

/// A running session wired to in-memory channels
pub struct TestSession {
    pub session: Arc<Session>,
    pub inbound: mpsc::Sender<Inbound>,
    pub outbound: mpsc::Receiver<Outbound>,
    pub asr: Arc<ScriptedAsrEngine>,
    pub tts: Arc<ToneTtsEngine>,
    pub handle: tokio::task::JoinHandle<()>,
}

impl TestSession {
    /// Spawn a session over the scripted engines
    #[must_use]
    pub fn spawn(config: Config, asr: Arc<ScriptedAsrEngine>, tts: Arc<ToneTtsEngine>) -> Self {
        let mut catalog = EngineCatalog::new();
        catalog.register_asr(
            config.asr.model.clone(),
            Arc::new(FixedAsrLoader(Arc::clone(&asr))),
        );
        catalog.register_tts(
            config.tts.model.clone(),
            Arc::new(FixedTtsLoader(Arc::clone(&tts))),
        );

        let llm =
            Arc::new(LlmClient::new(config.llm.endpoint.clone(), 0.0, 64).expect("llm client"));

        let (inbound_tx, inbound_rx) = mpsc::channel(64);
        let (outbound_tx, outbound_rx) = mpsc::channel(64);

        let session = Session::new(
            "test-client".to_string(),
            config,
            Arc::new(catalog),
            llm,
            outbound_tx,
        );
        let handle = tokio::spawn(Arc::clone(&session).run(inbound_rx));

        Self {
            session,
            inbound: inbound_tx,
            outbound: outbound_rx,
            asr,
            tts,
            handle,
        }
    }

    /// Send a control message
    pub async fn send_text(&self, text: &str) {
        self.inbound
            .send(Inbound::Text(text.to_string()))
            .await
            .expect("session inbound closed");
    }

    /// Send one audio frame of silence-valued PCM
    pub async fn send_audio_frame(&self) {
        let frame = vec![0_u8; 640];
        self.inbound
            .send(Inbound::Binary(frame))
            .await
            .expect("session inbound closed");
    }

    /// Await the next text frame, skipping binary, panicking on close
    pub async fn next_json(&mut self) -> serde_json::Value {
        loop {
            match self.expect_frame().await {
                Outbound::Text(text) => {
                    return serde_json::from_str(&text).expect("invalid JSON frame");
                }
                Outbound::Binary(_) => {}
                Outbound::Close => panic!("session closed while awaiting JSON"),
            }
        }
    }

    /// Await a text frame satisfying the predicate, skipping others
    pub async fn next_json_where(
        &mut self,
        predicate: impl Fn(&serde_json::Value) -> bool,
    ) -> serde_json::Value {
        loop {
            let v = self.next_json().await;
            if predicate(&v) {
                return v;
            }
        }
    }

    /// Await the next binary audio frame, skipping text
    pub async fn next_audio(&mut self) -> Vec<u8> {
        loop {
            match self.expect_frame().await {
                Outbound::Binary(data) => return data,
                Outbound::Text(_) => {}
                Outbound::Close => panic!("session closed while awaiting audio"),
            }
        }
    }

    async fn expect_frame(&mut self) -> Outbound {
        tokio::time::timeout(std::time::Duration::from_secs(5), self.outbound.recv())
            .await
            .expect("timed out waiting for session frame")
            .expect("session outbound closed")
    }
}
