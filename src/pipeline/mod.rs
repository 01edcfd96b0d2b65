//! Capture → process pipeline for the noise monitor.
//!
//! This module wires the concurrency core: the bounded queue fed by the
//! capture callback, the consumer loop that turns blocks into classified
//! readings, and the lifecycle state machine that owns both ends.
//!
//! # Architecture
//!
//! ```text
//! cpal callback (audio thread)
//!        │ try_send (drop-on-full + counter)
//!        ▼
//! bounded mpsc queue of AudioBlock
//!        │ recv with 1 s timeout  ← cancellation checkpoint
//!        ▼
//! PipelineRunner (tokio task)
//!        ├─ estimate_decibels → Severity::classify → Reading
//!        ├─ NoiseHistory (rolling window, FIFO eviction)
//!        ├─ Warning/Violation → AlertSink
//!        └─ every Nth reading → mean(last N)       → MetricsSink
//!
//! NoiseMonitor: Idle → Starting → Running → Stopping → Idle
//! ```

pub mod history;
pub mod monitor;
pub mod runner;
pub mod severity;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use history::NoiseHistory;
pub use monitor::{MonitorError, NoiseMonitor};
pub use runner::{PipelineRunner, Reading, RunnerTiming};
pub use severity::Severity;
pub use state::{CounterSnapshot, MonitorState, PipelineCounters};
