//! Streaming recognition over input/output queues

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, mpsc};

use super::engine::{AsrDecoder, AsrEngine};
use super::TranscriptEvent;
use crate::Result;
use crate::audio::pcm16le_to_f32;

/// Messages on the decode loop's input queue
enum Input {
    Samples(Vec<f32>),
    Shutdown,
}

/// ASR stream: unbounded audio in, ordered transcript events out
///
/// One background decode loop per stream processes audio sequentially; there
/// is never concurrent decoding on a single stream. `close` wakes the loop,
/// which drops the event sender so every pending `read` unblocks.
pub struct AsrStream {
    input: mpsc::UnboundedSender<Input>,
    output: Mutex<mpsc::UnboundedReceiver<TranscriptEvent>>,
    closed: AtomicBool,
    sample_rate: u32,
}

impl AsrStream {
    /// Create a stream and spawn its decode loop
    ///
    /// # Errors
    ///
    /// Returns error if the engine cannot allocate a decoder handle
    pub fn start(engine: &Arc<dyn AsrEngine>, sample_rate: u32) -> Result<Arc<Self>> {
        let decoder = engine.create_decoder()?;

        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tokio::spawn(decode_loop(decoder, sample_rate, input_rx, event_tx));
        tracing::debug!(sample_rate, "ASR stream started");

        Ok(Arc::new(Self {
            input: input_tx,
            output: Mutex::new(event_rx),
            closed: AtomicBool::new(false),
            sample_rate,
        }))
    }

    /// Input sample rate negotiated for this stream
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Feed raw PCM 16-bit little-endian audio into the decoder
    ///
    /// Never blocks; a no-op once the stream is closed.
    pub fn write(&self, data: &[u8]) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        let samples = pcm16le_to_f32(data);
        let _ = self.input.send(Input::Samples(samples));
    }

    /// Await the next transcript event; `None` means the stream is closed
    pub async fn read(&self) -> Option<TranscriptEvent> {
        self.output.lock().await.recv().await
    }

    /// Close the stream and stop the decode loop
    ///
    /// Idempotent; the shutdown marker is pushed exactly once.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.input.send(Input::Shutdown);
            tracing::debug!("ASR stream closed");
        }
    }

    /// Whether `close` has been called
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Sequential decode loop: feed, drain ready frames, emit partials/finals
async fn decode_loop(
    mut decoder: Box<dyn AsrDecoder>,
    sample_rate: u32,
    mut input: mpsc::UnboundedReceiver<Input>,
    events: mpsc::UnboundedSender<TranscriptEvent>,
) {
    let mut last_text = String::new();
    let mut segment: u64 = 0;

    while let Some(msg) = input.recv().await {
        let samples = match msg {
            Input::Samples(samples) => samples,
            Input::Shutdown => break,
        };

        decoder.accept(sample_rate, &samples);

        while decoder.has_ready_frame() {
            if let Err(e) = decoder.decode_ready_frame() {
                tracing::error!(error = %e, "ASR decode failed, terminating stream");
                return;
            }
        }

        let is_endpoint = decoder.is_endpoint();
        let text = decoder.current_text();

        // Partials only when the hypothesis actually changed
        if !text.is_empty() && text != last_text {
            last_text.clone_from(&text);
            let (start, end) = decoder.segment_bounds();
            let mut event = TranscriptEvent::partial(text.clone(), segment);
            event.start = start;
            event.end = end;
            tracing::trace!(idx = segment, text = %event.text, "ASR partial");
            if events.send(event).is_err() {
                return;
            }
        }

        if is_endpoint {
            if !text.is_empty() {
                let (start, end) = decoder.segment_bounds();
                let mut event = TranscriptEvent::fin(text, segment);
                event.start = start;
                event.end = end;
                tracing::info!(idx = segment, text = %event.text, "ASR final");
                if events.send(event).is_err() {
                    return;
                }
                segment += 1;
            }

            // Utterance state resets whether or not any text was recognized
            decoder.reset_utterance();
            last_text.clear();
        }
    }

    tracing::debug!("ASR decode loop ended");
}
