//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] to begin forwarding [`AudioBlock`]s into the
//! bounded capture queue.  The returned [`StreamHandle`] is a RAII guard —
//! dropping it stops the underlying cpal stream and releases the device.
//!
//! The capture callback runs on a real-time audio thread and must never
//! block or compute: it copies the hardware buffer into an [`AudioBlock`]
//! and `try_send`s it.  When the queue is full the block is dropped and the
//! drop counter incremented; stalling the callback would corrupt capture.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::AudioConfig;
use crate::pipeline::PipelineCounters;

// ---------------------------------------------------------------------------
// AudioBlock
// ---------------------------------------------------------------------------

/// One capture interval of raw audio as delivered by the cpal callback.
///
/// Samples are interleaved signed 16-bit PCM.  A block is immutable once
/// produced and owned by the queue until the consumer takes it.
#[derive(Debug, Clone)]
pub struct AudioBlock {
    /// Interleaved PCM samples.
    pub samples: Vec<i16>,
    /// Sample rate of this block in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono).
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// Dropping this value stops the underlying hardware stream; the pipeline
/// state machine drops it exactly once during shutdown.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while setting up or running the audio capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// Queue producer
// ---------------------------------------------------------------------------

/// Push `block` into the capture queue without blocking.
///
/// On a full queue the block is discarded and `dropped_blocks` incremented —
/// the consumer keeps its FIFO view of the stream minus the gap.  A closed
/// queue (consumer shut down) is ignored so the audio thread never panics.
pub(crate) fn enqueue_block(
    tx: &mpsc::Sender<AudioBlock>,
    block: AudioBlock,
    counters: &PipelineCounters,
) {
    use mpsc::error::TrySendError;

    match tx.try_send(block) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            let total = counters.dropped_blocks.fetch_add(1, Ordering::Relaxed) + 1;
            log::debug!("capture queue full — block dropped (total dropped: {total})");
        }
        Err(TrySendError::Closed(_)) => {}
    }
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use noise_monitor::audio::{AudioBlock, AudioCapture};
/// use noise_monitor::config::AudioConfig;
/// use noise_monitor::pipeline::PipelineCounters;
///
/// let audio = AudioConfig::default();
/// let (tx, rx) = tokio::sync::mpsc::channel::<AudioBlock>(audio.queue_capacity);
/// let counters = Arc::new(PipelineCounters::new());
///
/// let capture = AudioCapture::open(&audio).unwrap();
/// let _handle = capture.start(tx, counters).unwrap();
/// // `_handle` keeps the stream alive; drop it to release the device.
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_rate: u32,
    channels: u16,
}

impl AudioCapture {
    /// Open the system default input device with the configured stream
    /// parameters.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::NoDevice`] when no input device is available.
    pub fn open(audio: &AudioConfig) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        if let Ok(name) = device.name() {
            log::info!("capture device: {name}");
        }

        let config = cpal::StreamConfig {
            channels: audio.channels,
            sample_rate: cpal::SampleRate(audio.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(audio.block_size),
        };

        Ok(Self {
            device,
            config,
            sample_rate: audio.sample_rate,
            channels: audio.channels,
        })
    }

    /// Start recording and forward [`AudioBlock`]s into `tx`.
    ///
    /// The cpal callback runs on a dedicated audio thread; each time the
    /// hardware delivers a buffer the raw `i16` samples are wrapped in an
    /// [`AudioBlock`] and pushed with [`enqueue_block`] — drop-on-full,
    /// never blocking.
    ///
    /// # Errors
    ///
    /// Returns [`CaptureError::BuildStream`] or [`CaptureError::PlayStream`]
    /// if the platform rejects the stream configuration.
    pub fn start(
        &self,
        tx: mpsc::Sender<AudioBlock>,
        counters: Arc<PipelineCounters>,
    ) -> Result<StreamHandle, CaptureError> {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let block = AudioBlock {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                };
                enqueue_block(&tx, block, &counters);
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    /// Sample rate the stream was opened with, in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels in each [`AudioBlock`].
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn block(n: usize) -> AudioBlock {
        AudioBlock {
            samples: vec![0; n],
            sample_rate: 44_100,
            channels: 1,
        }
    }

    /// `AudioBlock` must be `Send` so it can cross the queue.
    #[test]
    fn audio_block_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioBlock>();
    }

    #[test]
    fn audio_block_fields() {
        let b = block(1024);
        assert_eq!(b.samples.len(), 1024);
        assert_eq!(b.sample_rate, 44_100);
        assert_eq!(b.channels, 1);
    }

    // ---- Drop-on-full producer policy ---------------------------------------

    #[tokio::test]
    async fn enqueue_drops_when_queue_full() {
        let (tx, mut rx) = mpsc::channel::<AudioBlock>(2);
        let counters = PipelineCounters::new();

        enqueue_block(&tx, block(4), &counters);
        enqueue_block(&tx, block(4), &counters);
        // Queue is full now; the third block must be dropped, not block.
        enqueue_block(&tx, block(4), &counters);

        assert_eq!(counters.snapshot().dropped_blocks, 1);

        // The two queued blocks are still delivered in order.
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn enqueue_ignores_closed_queue() {
        let (tx, rx) = mpsc::channel::<AudioBlock>(2);
        drop(rx);

        let counters = PipelineCounters::new();
        enqueue_block(&tx, block(4), &counters);

        // Closed is not "dropped because full" — counter stays at zero.
        assert_eq!(counters.snapshot().dropped_blocks, 0);
    }
}
