//! Streaming synthesis over an output queue

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};

use super::engine::TtsEngine;
use super::text::{self, TextTransform};
use super::SynthesisEvent;
use crate::audio::{resample, samples_to_wav};
use crate::Result;

/// TTS stream: one utterance in per `write`, ordered audio chunks out
///
/// Sub-units are synthesized strictly sequentially so audio ordering matches
/// text ordering; the final event for an utterance is always emitted last.
pub struct TtsStream {
    engine: Arc<dyn TtsEngine>,
    speaker: String,
    speed: f32,
    target_rate: u32,
    transforms: Vec<Box<dyn TextTransform>>,
    sender: std::sync::Mutex<Option<mpsc::UnboundedSender<SynthesisEvent>>>,
    output: Mutex<mpsc::UnboundedReceiver<SynthesisEvent>>,
}

impl TtsStream {
    /// Create a stream bound to a loaded engine
    #[must_use]
    pub fn start(
        engine: Arc<dyn TtsEngine>,
        speaker: String,
        speed: f32,
        target_rate: u32,
        transforms: Vec<Box<dyn TextTransform>>,
    ) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        tracing::debug!(speaker = %speaker, speed, target_rate, "TTS stream started");

        Arc::new(Self {
            engine,
            speaker,
            speed,
            target_rate,
            transforms,
            sender: std::sync::Mutex::new(Some(tx)),
            output: Mutex::new(rx),
        })
    }

    /// Output sample rate negotiated for this stream
    #[must_use]
    pub const fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Configured speaking-rate multiplier
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Synthesize one utterance into the output queue
    ///
    /// Runs normalization, optionally splits on sentence punctuation, then
    /// synthesizes each non-empty sub-unit in order. A sub-unit that fails is
    /// logged and skipped; the rest of the utterance still renders. Exactly
    /// one final event follows the chunks. `pause_hint` is advisory pacing
    /// for clients and does not alter the generated audio.
    pub async fn write(&self, utterance: &str, split: bool, pause_hint: f32) {
        let started = Instant::now();
        tracing::debug!(split, pause_hint, chars = utterance.len(), "TTS write");

        let normalized = text::normalize(utterance, &self.transforms);
        let units = if split {
            text::split_sentences(&normalized)
        } else {
            vec![normalized]
        };

        let mut audio_duration = 0.0_f64;
        let mut byte_size = 0_usize;

        for unit in units {
            let unit = unit.trim().to_string();
            if unit.is_empty() {
                continue;
            }

            let sub_started = Instant::now();
            let audio = match self.synthesize_unit(unit.clone()).await {
                Ok(audio) => audio,
                Err(e) => {
                    tracing::error!(error = %e, text = %unit, "TTS failed for sub-unit, skipping");
                    continue;
                }
            };

            #[allow(clippy::cast_precision_loss)]
            let unit_duration = audio.samples.len() as f64 / f64::from(audio.sample_rate);

            let rendered = match self.encode_unit(&audio.samples, audio.sample_rate) {
                Ok(wav) => wav,
                Err(e) => {
                    tracing::error!(error = %e, text = %unit, "TTS encode failed, skipping");
                    continue;
                }
            };

            audio_duration += unit_duration;
            byte_size += rendered.len();

            if self.send(SynthesisEvent::chunk(rendered)).is_err() {
                // Stream closed mid-utterance; remaining sub-units are moot
                return;
            }

            tracing::info!(
                text = %unit,
                elapsed = ?sub_started.elapsed(),
                "TTS generated sub-unit"
            );
        }

        let final_event = SynthesisEvent::finished(started.elapsed(), audio_duration, byte_size);
        let _ = self.send(final_event);
    }

    /// Await the next synthesis event; `None` means the stream is closed
    pub async fn read(&self) -> Option<SynthesisEvent> {
        self.output.lock().await.recv().await
    }

    /// Close the stream
    ///
    /// Idempotent. Pending events drain in order, after which every reader
    /// observes the closed sentinel.
    pub fn close(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            if sender.take().is_some() {
                tracing::debug!("TTS stream closed");
            }
        }
    }

    /// Synthesize a single sub-unit on the blocking pool
    async fn synthesize_unit(&self, unit: String) -> Result<super::SynthesizedAudio> {
        let engine = Arc::clone(&self.engine);
        let speaker = self.speaker.clone();
        let target_rate = self.target_rate;

        tokio::task::spawn_blocking(move || engine.synthesize(&unit, &speaker, target_rate))
            .await
            .map_err(|e| crate::Error::Tts(format!("synthesis task failed: {e}")))?
    }

    /// Resample to the session rate when needed and wrap in a WAV container
    fn encode_unit(&self, samples: &[f32], native_rate: u32) -> Result<Vec<u8>> {
        if native_rate == self.target_rate {
            samples_to_wav(samples, self.target_rate)
        } else {
            let resampled = resample(samples, native_rate, self.target_rate)?;
            samples_to_wav(&resampled, self.target_rate)
        }
    }

    fn send(&self, event: SynthesisEvent) -> Result<()> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| crate::Error::Tts("sender lock poisoned".to_string()))?;
        match sender.as_ref() {
            Some(tx) => tx
                .send(event)
                .map_err(|_| crate::Error::Tts("output queue gone".to_string())),
            None => Err(crate::Error::Tts("stream closed".to_string())),
        }
    }
}
