//! Metrics delivery — the `MetricsSink` trait and its HTTP implementation.
//!
//! A [`MetricsSample`] carries the rolling average computed every
//! `aggregation_interval` readings.  The camelCase field names and the
//! `deviceType` constant match what the storage backend indexes on.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::config::SinkConfig;
use crate::pipeline::Severity;

use super::SinkError;

/// Fixed `deviceType` discriminator expected by the storage backend.
pub const DEVICE_TYPE: &str = "raspberry_pi";

// ---------------------------------------------------------------------------
// MetricsSample
// ---------------------------------------------------------------------------

/// Value object delivered to the metrics sink.  Immutable once built.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSample {
    /// Rolling average over the last aggregation window, in dB.
    pub decibel_level: f64,
    /// ISO-8601 creation time.
    pub timestamp: String,
    /// Human-readable placement of the device.
    pub location: String,
    /// Unique device identifier (`unitId` on the wire).
    pub unit_id: String,
    /// Severity of the averaged level, serialised lowercase.
    pub status: Severity,
    /// Always [`DEVICE_TYPE`].
    pub device_type: &'static str,
}

impl MetricsSample {
    /// Build a sample for an averaged reading, stamping it with the
    /// current time.
    pub fn new(average_db: f64, status: Severity, unit_id: &str, location: &str) -> Self {
        Self {
            decibel_level: average_db,
            timestamp: Utc::now().to_rfc3339(),
            location: location.to_string(),
            unit_id: unit_id.to_string(),
            status,
            device_type: DEVICE_TYPE,
        }
    }
}

// ---------------------------------------------------------------------------
// MetricsSink trait
// ---------------------------------------------------------------------------

/// Async trait for metrics delivery.
///
/// Implementors must be `Send + Sync` (shared as `Arc<dyn MetricsSink>`).
/// Failures are logged and counted by the pipeline, never retried.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Deliver `sample` to the storage backend.
    async fn send(&self, sample: &MetricsSample) -> Result<(), SinkError>;
}

// ---------------------------------------------------------------------------
// HttpMetricsSink
// ---------------------------------------------------------------------------

/// POSTs [`MetricsSample`]s as JSON to the configured metrics endpoint.
pub struct HttpMetricsSink {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpMetricsSink {
    /// Build a metrics sink from sink configuration.
    pub fn from_config(config: &SinkConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: config.metrics_endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl MetricsSink for HttpMetricsSink {
    async fn send(&self, sample: &MetricsSample) -> Result<(), SinkError> {
        let mut req = self.client.post(&self.endpoint).json(sample);

        let key = self.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status(status.as_u16()));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
