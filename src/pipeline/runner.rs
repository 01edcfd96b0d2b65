//! Consumer loop — drives the block → decibel → classify → dispatch pipeline.
//!
//! [`PipelineRunner`] owns the [`NoiseHistory`] and drains the bounded
//! capture queue filled by the cpal callback.
//!
//! # Pipeline flow
//!
//! ```text
//! AudioBlock (bounded mpsc)
//!   └─▶ estimate_decibels ─▶ Severity::classify ─▶ Reading
//!         ├─▶ history.push(db)
//!         ├─▶ Warning/Violation → AlertSink::send     (failure: log + count)
//!         └─▶ every Nth reading → mean(last N) → MetricsSink::send
//! ```
//!
//! The queue wait is bounded by [`RunnerTiming::poll_interval`]; the timeout
//! is the cancellation checkpoint, so shutdown latency is bounded by one
//! poll interval plus one block-processing duration.  A pacing sleep after
//! each block caps the processing rate below real-time audio production.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::audio::{estimate_decibels, AudioBlock};
use crate::config::{MonitorConfig, ThresholdConfig};
use crate::sink::{AlertMessage, AlertSink, MetricsSample, MetricsSink};

use super::history::NoiseHistory;
use super::severity::Severity;
use super::state::PipelineCounters;

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One classified decibel reading, produced per consumed [`AudioBlock`].
/// Never mutated after creation.
#[derive(Debug, Clone)]
pub struct Reading {
    /// Estimated sound pressure level in dB.
    pub decibels: f64,
    /// Classification against the configured thresholds.
    pub status: Severity,
    /// Creation time of the reading.
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Classify `decibels` and stamp the reading with the current time.
    pub fn new(decibels: f64, thresholds: &ThresholdConfig) -> Self {
        Self {
            decibels,
            status: Severity::classify(decibels, thresholds),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// RunnerTiming
// ---------------------------------------------------------------------------

/// Timing knobs of the consumer loop.
///
/// The defaults (1 s queue poll, 100 ms pacing) are the production values;
/// tests shrink them to keep the suite fast.
#[derive(Debug, Clone, Copy)]
pub struct RunnerTiming {
    /// Upper bound on one queue wait; doubles as the cancellation poll
    /// interval.
    pub poll_interval: Duration,
    /// Sleep after each processed block, capping the consumption rate.
    pub pace: Duration,
}

impl Default for RunnerTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            pace: Duration::from_millis(100),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineRunner
// ---------------------------------------------------------------------------

/// The single consumer of the capture queue.
///
/// Create with [`PipelineRunner::new`], then hand it to a tokio task via
/// [`run`](Self::run).  The runner is the only writer of the history and
/// the only reader of the queue, so no locks are involved; the running flag
/// and counters are shared atomics.
pub struct PipelineRunner {
    thresholds: ThresholdConfig,
    device_id: String,
    location: String,
    aggregation_interval: usize,
    history: NoiseHistory,
    alert_sink: Arc<dyn AlertSink>,
    metrics_sink: Arc<dyn MetricsSink>,
    counters: Arc<PipelineCounters>,
    running: Arc<AtomicBool>,
    timing: RunnerTiming,
}

impl PipelineRunner {
    /// Build a runner from configuration and its shared collaborators.
    pub fn new(
        config: &MonitorConfig,
        alert_sink: Arc<dyn AlertSink>,
        metrics_sink: Arc<dyn MetricsSink>,
        counters: Arc<PipelineCounters>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            device_id: config.device.id.clone(),
            location: config.device.location.clone(),
            aggregation_interval: config.aggregation_interval,
            history: NoiseHistory::new(config.history_capacity),
            alert_sink,
            metrics_sink,
            counters,
            running,
            timing: RunnerTiming::default(),
        }
    }

    /// Override the loop timing (useful for tests).
    pub fn with_timing(mut self, timing: RunnerTiming) -> Self {
        self.timing = timing;
        self
    }

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------

    /// Consume blocks until the running flag clears or the queue closes.
    ///
    /// Blocks are processed in strict production order; the queue wait is
    /// the only suspension point where cancellation is observed.
    pub async fn run(mut self, mut rx: mpsc::Receiver<AudioBlock>) {
        log::info!("pipeline runner started");

        while self.running.load(Ordering::SeqCst) {
            let block = match timeout(self.timing.poll_interval, rx.recv()).await {
                // Timed out — loop around and re-check the running flag.
                Err(_) => continue,
                // Queue closed: the capture side is gone, nothing more to do.
                Ok(None) => break,
                Ok(Some(block)) => block,
            };

            self.process_block(block).await;

            // Cap the processing rate so a burst of queued blocks cannot
            // pin the CPU ahead of real-time capture.
            tokio::time::sleep(self.timing.pace).await;
        }

        log::info!("pipeline runner stopped ({})", self.counters.snapshot());
    }

    // -----------------------------------------------------------------------
    // Per-block work
    // -----------------------------------------------------------------------

    /// Estimate one block and feed the reading through the pipeline.
    async fn process_block(&mut self, block: AudioBlock) {
        if block.samples.is_empty() {
            // Estimation maps this to a 0.0 reading; count it so the
            // swallowed anomaly stays visible.
            self.counters.empty_blocks.fetch_add(1, Ordering::Relaxed);
        }

        let decibels = estimate_decibels(&block.samples);
        self.handle_reading(decibels).await;
        self.counters.blocks_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Classify a decibel value, record it and dispatch to the sinks.
    ///
    /// Sink failures are logged and counted but never stop the loop and
    /// never trigger a retry.
    async fn handle_reading(&mut self, decibels: f64) {
        let reading = Reading::new(decibels, &self.thresholds);
        self.history.push(reading.decibels);

        log::info!(
            "noise level: {:.1} dB - status: {}",
            reading.decibels,
            reading.status
        );

        if reading.status.is_alertable() {
            let alert = AlertMessage::new(
                reading.decibels,
                reading.status,
                &self.device_id,
                &self.location,
            );
            match self.alert_sink.send(&alert).await {
                Ok(message_id) => {
                    log::debug!("alert delivered: {} (id: {message_id})", alert.message);
                }
                Err(e) => {
                    self.counters.alert_failures.fetch_add(1, Ordering::Relaxed);
                    log::warn!("alert delivery failed: {e}");
                }
            }
        }

        if self.history.len() % self.aggregation_interval == 0 {
            let average = self.history.mean_of_last(self.aggregation_interval);
            let status = Severity::classify(average, &self.thresholds);
            let sample = MetricsSample::new(average, status, &self.device_id, &self.location);

            match self.metrics_sink.send(&sample).await {
                Ok(()) => {
                    log::debug!("metrics sample delivered: {average:.1} dB ({status})");
                }
                Err(e) => {
                    self.counters.metrics_failures.fetch_add(1, Ordering::Relaxed);
                    log::warn!("metrics delivery failed: {e}");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::level::block_at_db;
    use crate::sink::SinkError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Test doubles
    // -----------------------------------------------------------------------

    /// Records every alert; optionally fails each send.
    struct RecordingAlertSink {
        sent: Mutex<Vec<AlertMessage>>,
        fail: bool,
    }

    impl RecordingAlertSink {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl AlertSink for RecordingAlertSink {
        async fn send(&self, alert: &AlertMessage) -> Result<String, SinkError> {
            self.sent.lock().unwrap().push(alert.clone());
            if self.fail {
                Err(SinkError::Request("connection refused".into()))
            } else {
                Ok("msg-1".into())
            }
        }
    }

    /// Records every metrics sample; optionally fails each send.
    struct RecordingMetricsSink {
        sent: Mutex<Vec<MetricsSample>>,
        fail: bool,
    }

    impl RecordingMetricsSink {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl MetricsSink for RecordingMetricsSink {
        async fn send(&self, sample: &MetricsSample) -> Result<(), SinkError> {
            self.sent.lock().unwrap().push(sample.clone());
            if self.fail {
                Err(SinkError::Status(500))
            } else {
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn test_timing() -> RunnerTiming {
        RunnerTiming {
            poll_interval: Duration::from_millis(20),
            pace: Duration::from_millis(1),
        }
    }

    struct Harness {
        runner: PipelineRunner,
        alerts: Arc<RecordingAlertSink>,
        metrics: Arc<RecordingMetricsSink>,
        counters: Arc<PipelineCounters>,
        running: Arc<AtomicBool>,
    }

    fn make_harness(fail_alerts: bool, fail_metrics: bool) -> Harness {
        let mut config = MonitorConfig::default();
        config.device.id = "unit-test".into();
        config.device.location = "lab".into();

        let alerts = RecordingAlertSink::new(fail_alerts);
        let metrics = RecordingMetricsSink::new(fail_metrics);
        let counters = Arc::new(PipelineCounters::new());
        let running = Arc::new(AtomicBool::new(true));

        let runner = PipelineRunner::new(
            &config,
            Arc::clone(&alerts) as Arc<dyn AlertSink>,
            Arc::clone(&metrics) as Arc<dyn MetricsSink>,
            Arc::clone(&counters),
            Arc::clone(&running),
        )
        .with_timing(test_timing());

        Harness {
            runner,
            alerts,
            metrics,
            counters,
            running,
        }
    }

    fn block(samples: Vec<i16>) -> AudioBlock {
        AudioBlock {
            samples,
            sample_rate: 44_100,
            channels: 1,
        }
    }

    // -----------------------------------------------------------------------
    // End-to-end reading sequence (thresholds {60, 70, 80})
    // -----------------------------------------------------------------------

    /// Ten readings through the consumer: alerts exactly for values above
    /// the acceptable threshold, one metrics dispatch after the tenth
    /// reading carrying the mean of all ten.
    #[tokio::test]
    async fn reading_sequence_dispatches_alerts_and_one_aggregate() {
        let mut h = make_harness(false, false);
        let readings = [50.0, 65.0, 85.0, 72.0, 58.0, 69.0, 71.0, 55.0, 80.0, 62.0];

        for &db in &readings {
            h.runner.handle_reading(db).await;
        }

        // Values > 60 are Warning or Violation.
        let expected: Vec<f64> = readings.iter().copied().filter(|&db| db > 60.0).collect();
        let alerts = h.alerts.sent.lock().unwrap();
        let alerted: Vec<f64> = alerts.iter().map(|a| a.decibel_level).collect();
        assert_eq!(alerted, expected);

        // Exactly one aggregate, after the tenth reading, with the mean.
        let metrics = h.metrics.sent.lock().unwrap();
        assert_eq!(metrics.len(), 1);
        let mean = readings.iter().sum::<f64>() / readings.len() as f64;
        assert!((metrics[0].decibel_level - mean).abs() < 1e-9);
        assert_eq!(metrics[0].status, Severity::classify(mean, &ThresholdConfig::default()));
        assert_eq!(metrics[0].unit_id, "unit-test");
    }

    #[tokio::test]
    async fn alert_severity_matches_reading() {
        let mut h = make_harness(false, false);

        h.runner.handle_reading(65.0).await; // Warning
        h.runner.handle_reading(85.0).await; // Violation
        h.runner.handle_reading(50.0).await; // Acceptable → no alert

        let alerts = h.alerts.sent.lock().unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].status, Severity::Warning);
        assert_eq!(alerts[1].status, Severity::Violation);
    }

    #[tokio::test]
    async fn aggregate_fires_every_interval() {
        let mut h = make_harness(false, false);

        for _ in 0..30 {
            h.runner.handle_reading(50.0).await;
        }

        // Intervals of 10 → aggregates after readings 10, 20 and 30.
        assert_eq!(h.metrics.sent.lock().unwrap().len(), 3);
    }

    // -----------------------------------------------------------------------
    // Failure tolerance
    // -----------------------------------------------------------------------

    /// Sink failures must be counted, not propagated: the loop keeps
    /// processing and the history keeps growing.
    #[tokio::test]
    async fn sink_failures_are_counted_and_non_fatal() {
        let mut h = make_harness(true, true);
        let readings = [50.0, 65.0, 85.0, 72.0, 58.0, 69.0, 71.0, 55.0, 80.0, 62.0];

        for &db in &readings {
            h.runner.handle_reading(db).await;
        }

        let snap = h.counters.snapshot();
        assert_eq!(snap.alert_failures, 7); // every reading > 60
        assert_eq!(snap.metrics_failures, 1); // the one aggregate
        assert_eq!(h.runner.history.len(), 10);
    }

    // -----------------------------------------------------------------------
    // Full loop over the queue
    // -----------------------------------------------------------------------

    /// Blocks flow through the whole loop in FIFO order; closing the queue
    /// ends the loop.
    #[tokio::test]
    async fn run_processes_blocks_until_queue_closes() {
        let h = make_harness(false, false);
        let (tx, rx) = mpsc::channel::<AudioBlock>(16);

        tx.send(block(vec![0; 1024])).await.unwrap(); // silence → 0 dB
        tx.send(block(block_at_db(85.0, 1024))).await.unwrap(); // violation
        tx.send(block(Vec::new())).await.unwrap(); // empty → counted
        drop(tx);

        h.runner.run(rx).await;

        let snap = h.counters.snapshot();
        assert_eq!(snap.blocks_processed, 3);
        assert_eq!(snap.empty_blocks, 1);

        let alerts = h.alerts.sent.lock().unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].status, Severity::Violation);
    }

    /// Clearing the running flag stops the loop within one poll interval
    /// plus one block-processing duration.
    #[tokio::test]
    async fn cancellation_observed_within_poll_interval() {
        let h = make_harness(false, false);
        let (_tx, rx) = mpsc::channel::<AudioBlock>(16);

        let running = Arc::clone(&h.running);
        let handle = tokio::spawn(h.runner.run(rx));

        running.store(false, Ordering::SeqCst);

        // Budget: several poll intervals of headroom; the loop must exit
        // after at most one 20 ms poll once the flag is observed clear.
        timeout(Duration::from_millis(500), handle)
            .await
            .expect("consumer did not stop within the cancellation budget")
            .expect("consumer task panicked");
    }

    /// A runner that was never signalled keeps polling an idle queue; the
    /// loop must not exit on timeouts alone.
    #[tokio::test]
    async fn timeouts_alone_do_not_stop_the_loop() {
        let h = make_harness(false, false);
        let (tx, rx) = mpsc::channel::<AudioBlock>(16);

        let running = Arc::clone(&h.running);
        let counters = Arc::clone(&h.counters);
        let handle = tokio::spawn(h.runner.run(rx));

        // Let a few poll intervals elapse with no input.
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Still able to process a late block.
        tx.send(block(block_at_db(65.0, 1024))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counters.snapshot().blocks_processed, 1);

        running.store(false, Ordering::SeqCst);
        timeout(Duration::from_millis(500), handle)
            .await
            .expect("consumer did not stop")
            .expect("consumer task panicked");
    }
}
