//! Sink adapters — delivery of alerts and aggregate metrics to remote
//! HTTP endpoints.
//!
//! The pipeline only sees the [`AlertSink`] and [`MetricsSink`] traits;
//! [`HttpAlertSink`] / [`HttpMetricsSink`] are the `reqwest`-backed
//! implementations built from [`SinkConfig`](crate::config::SinkConfig).
//! Delivery is at-most-once: the caller never retries, failures are logged
//! and counted.

pub mod alert;
pub mod metrics;

use thiserror::Error;

// ---------------------------------------------------------------------------
// SinkError
// ---------------------------------------------------------------------------

/// Errors that can occur while delivering to a remote sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// HTTP transport or connection error.
    #[error("request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("sink request timed out")]
    Timeout,

    /// The endpoint answered with a non-success status code.
    #[error("sink returned HTTP {0}")]
    Status(u16),

    /// The response body could not be parsed as expected JSON.
    #[error("failed to parse sink response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SinkError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SinkError::Timeout
        } else {
            SinkError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use alert::{AlertMessage, AlertSink, HttpAlertSink};
pub use metrics::{HttpMetricsSink, MetricsSample, MetricsSink, DEVICE_TYPE};
