//! Monitor lifecycle — owns the capture device, the queue and the consumer.
//!
//! [`NoiseMonitor`] is the explicitly constructed pipeline object: no
//! ambient globals, every task it spawns borrows shared state through
//! `Arc`s it hands out itself.  The state machine is
//! `Idle → Starting → Running → Stopping → Idle`; the capture device is
//! opened in `Starting` and released exactly once in `Stopping`.
//!
//! The cpal stream handle is not `Send`, so the monitor must live on the
//! thread that created it (the main task); the consumer runs as a separate
//! tokio task and only shares atomics and sinks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::audio::{AudioBlock, AudioCapture, CaptureError, StreamHandle};
use crate::config::MonitorConfig;
use crate::sink::{AlertSink, MetricsSink};

use super::runner::PipelineRunner;
use super::state::{CounterSnapshot, MonitorState, PipelineCounters};

// ---------------------------------------------------------------------------
// MonitorError
// ---------------------------------------------------------------------------

/// Errors surfaced by the monitor lifecycle transitions.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// `start()` while the pipeline is already starting or running — the
    /// capture device must not be opened twice.
    #[error("monitor is already {0}")]
    AlreadyActive(&'static str),

    /// The capture device failed to open or start.
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

// ---------------------------------------------------------------------------
// NoiseMonitor
// ---------------------------------------------------------------------------

/// Owner of the capture → process pipeline.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use noise_monitor::config::MonitorConfig;
/// use noise_monitor::pipeline::NoiseMonitor;
/// use noise_monitor::sink::{HttpAlertSink, HttpMetricsSink};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = MonitorConfig::default();
/// let alerts = Arc::new(HttpAlertSink::from_config(&config.sinks));
/// let metrics = Arc::new(HttpMetricsSink::from_config(&config.sinks));
///
/// let mut monitor = NoiseMonitor::new(config, alerts, metrics);
/// monitor.start()?;
/// tokio::signal::ctrl_c().await?;
/// monitor.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct NoiseMonitor {
    config: MonitorConfig,
    alert_sink: Arc<dyn AlertSink>,
    metrics_sink: Arc<dyn MetricsSink>,
    state: MonitorState,
    running: Arc<AtomicBool>,
    counters: Arc<PipelineCounters>,
    stream: Option<StreamHandle>,
    consumer: Option<JoinHandle<()>>,
}

impl NoiseMonitor {
    /// Create an idle monitor.  Nothing is opened or spawned until
    /// [`start`](Self::start).
    pub fn new(
        config: MonitorConfig,
        alert_sink: Arc<dyn AlertSink>,
        metrics_sink: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            alert_sink,
            metrics_sink,
            state: MonitorState::Idle,
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(PipelineCounters::new()),
            stream: None,
            consumer: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Snapshot of the pipeline counters.
    pub fn counters(&self) -> CounterSnapshot {
        self.counters.snapshot()
    }

    /// Open the capture device, spawn the consumer and enter `Running`.
    ///
    /// Must be called from within a tokio runtime (the consumer is spawned
    /// with `tokio::spawn`).
    ///
    /// # Errors
    ///
    /// [`MonitorError::AlreadyActive`] when the monitor is already starting
    /// or running; [`MonitorError::Capture`] when the device cannot be
    /// opened or started — the monitor returns to `Idle` in that case.
    pub fn start(&mut self) -> Result<(), MonitorError> {
        if self.state.is_active() {
            return Err(MonitorError::AlreadyActive(self.state.label()));
        }

        self.state = MonitorState::Starting;
        log::info!("starting noise monitoring");

        let capture = match AudioCapture::open(&self.config.audio) {
            Ok(capture) => capture,
            Err(e) => {
                self.state = MonitorState::Idle;
                return Err(e.into());
            }
        };

        let (tx, rx) = mpsc::channel::<AudioBlock>(self.config.audio.queue_capacity);

        self.running.store(true, Ordering::SeqCst);

        let runner = PipelineRunner::new(
            &self.config,
            Arc::clone(&self.alert_sink),
            Arc::clone(&self.metrics_sink),
            Arc::clone(&self.counters),
            Arc::clone(&self.running),
        );
        self.consumer = Some(tokio::spawn(runner.run(rx)));

        match capture.start(tx, Arc::clone(&self.counters)) {
            Ok(handle) => {
                self.stream = Some(handle);
                self.state = MonitorState::Running;
                log::info!(
                    "noise monitoring started ({} Hz, {} ch, block {})",
                    self.config.audio.sample_rate,
                    self.config.audio.channels,
                    self.config.audio.block_size
                );
                Ok(())
            }
            Err(e) => {
                // Wind the consumer back down before surfacing the cause.
                self.running.store(false, Ordering::SeqCst);
                if let Some(consumer) = self.consumer.take() {
                    consumer.abort();
                }
                self.state = MonitorState::Idle;
                Err(e.into())
            }
        }
    }

    /// Clear the running flag, release the capture device and wait for the
    /// consumer to exit.
    ///
    /// Shutdown latency is bounded by the consumer's poll interval plus one
    /// block-processing duration.  Calling `stop` on a monitor that is not
    /// running is a no-op.
    pub async fn stop(&mut self) {
        if self.state != MonitorState::Running {
            return;
        }

        self.state = MonitorState::Stopping;
        log::info!("stopping noise monitoring");

        self.running.store(false, Ordering::SeqCst);

        // Releases the device and drops the queue sender, so the consumer
        // sees either the cleared flag or a closed queue.
        self.stream = None;

        if let Some(consumer) = self.consumer.take() {
            if let Err(e) = consumer.await {
                log::error!("consumer task failed during shutdown: {e}");
            }
        }

        self.state = MonitorState::Idle;
        log::info!("noise monitoring stopped ({})", self.counters.snapshot());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
