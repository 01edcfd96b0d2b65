//! Monitor state machine and observable pipeline counters.
//!
//! [`MonitorState`] drives the capture lifecycle owned by
//! [`NoiseMonitor`](crate::pipeline::NoiseMonitor).  [`PipelineCounters`]
//! makes the "never crash the pipeline" error swallowing observable: every
//! dropped block, empty block and failed sink delivery is counted, so tests
//! and operators can assert on failure totals instead of scraping logs.

use std::sync::atomic::{AtomicU64, Ordering};

// ---------------------------------------------------------------------------
// MonitorState
// ---------------------------------------------------------------------------

/// Lifecycle states of the capture → process pipeline.
///
/// ```text
/// Idle ──start()──▶ Starting ──device opened──▶ Running
///                      │ device error                │ stop()
///                      ▼                              ▼
///                    Idle ◀──consumer joined── Stopping
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Initial and terminal state; no device held, no consumer running.
    Idle,

    /// `start()` is opening the capture device and spawning the consumer.
    Starting,

    /// Steady state: blocks flow from the capture callback to the consumer.
    Running,

    /// `stop()` has cleared the running flag and is waiting for the
    /// consumer to observe it.
    Stopping,
}

impl MonitorState {
    /// Returns `true` while the pipeline holds (or is acquiring) the
    /// capture device.  A second `start()` in an active state is an error —
    /// the device must never be opened twice.
    pub fn is_active(&self) -> bool {
        matches!(self, MonitorState::Starting | MonitorState::Running)
    }

    /// A short human-readable label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            MonitorState::Idle => "idle",
            MonitorState::Starting => "starting",
            MonitorState::Running => "running",
            MonitorState::Stopping => "stopping",
        }
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        MonitorState::Idle
    }
}

// ---------------------------------------------------------------------------
// PipelineCounters
// ---------------------------------------------------------------------------

/// Shared failure/throughput counters, incremented with relaxed atomics.
///
/// Shared between the capture callback (drop counter), the consumer task
/// and the owner as `Arc<PipelineCounters>`.
#[derive(Debug, Default)]
pub struct PipelineCounters {
    /// Blocks consumed and turned into readings.
    pub blocks_processed: AtomicU64,
    /// Blocks discarded by the producer because the queue was full.
    pub dropped_blocks: AtomicU64,
    /// Blocks that arrived empty and yielded a forced 0.0 reading.
    pub empty_blocks: AtomicU64,
    /// Alert deliveries that failed (logged, never retried).
    pub alert_failures: AtomicU64,
    /// Metrics deliveries that failed (logged, never retried).
    pub metrics_failures: AtomicU64,
}

/// Point-in-time copy of [`PipelineCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub blocks_processed: u64,
    pub dropped_blocks: u64,
    pub empty_blocks: u64,
    pub alert_failures: u64,
    pub metrics_failures: u64,
}

impl PipelineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a consistent-enough snapshot for logging and assertions.
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            blocks_processed: self.blocks_processed.load(Ordering::Relaxed),
            dropped_blocks: self.dropped_blocks.load(Ordering::Relaxed),
            empty_blocks: self.empty_blocks.load(Ordering::Relaxed),
            alert_failures: self.alert_failures.load(Ordering::Relaxed),
            metrics_failures: self.metrics_failures.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Display for CounterSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "processed={} dropped={} empty={} alert_failures={} metrics_failures={}",
            self.blocks_processed,
            self.dropped_blocks,
            self.empty_blocks,
            self.alert_failures,
            self.metrics_failures
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        assert_eq!(MonitorState::default(), MonitorState::Idle);
    }

    #[test]
    fn active_states() {
        assert!(!MonitorState::Idle.is_active());
        assert!(MonitorState::Starting.is_active());
        assert!(MonitorState::Running.is_active());
        assert!(!MonitorState::Stopping.is_active());
    }

    #[test]
    fn labels() {
        assert_eq!(MonitorState::Idle.label(), "idle");
        assert_eq!(MonitorState::Starting.label(), "starting");
        assert_eq!(MonitorState::Running.label(), "running");
        assert_eq!(MonitorState::Stopping.label(), "stopping");
    }

    #[test]
    fn counters_start_at_zero() {
        let counters = PipelineCounters::new();
        let snap = counters.snapshot();
        assert_eq!(snap.blocks_processed, 0);
        assert_eq!(snap.dropped_blocks, 0);
        assert_eq!(snap.empty_blocks, 0);
        assert_eq!(snap.alert_failures, 0);
        assert_eq!(snap.metrics_failures, 0);
    }

    #[test]
    fn snapshot_reflects_increments() {
        let counters = PipelineCounters::new();
        counters.blocks_processed.fetch_add(3, Ordering::Relaxed);
        counters.alert_failures.fetch_add(1, Ordering::Relaxed);

        let snap = counters.snapshot();
        assert_eq!(snap.blocks_processed, 3);
        assert_eq!(snap.alert_failures, 1);
    }

    #[test]
    fn snapshot_display_is_compact() {
        let counters = PipelineCounters::new();
        counters.dropped_blocks.fetch_add(2, Ordering::Relaxed);
        let text = counters.snapshot().to_string();
        assert!(text.contains("dropped=2"));
    }
}
