//! Alert delivery — the `AlertSink` trait and its HTTP implementation.
//!
//! An [`AlertMessage`] is dispatched for every Warning or Violation reading.
//! Field names and the human-readable `message` format are part of the wire
//! contract with the notification backend and must not change.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use crate::config::SinkConfig;
use crate::pipeline::Severity;

use super::SinkError;

// ---------------------------------------------------------------------------
// AlertMessage
// ---------------------------------------------------------------------------

/// Value object delivered to the alert sink.  Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct AlertMessage {
    /// ISO-8601 creation time.
    pub timestamp: String,
    /// The reading that triggered the alert.
    pub decibel_level: f64,
    /// Severity of the reading, serialised lowercase.
    pub status: Severity,
    /// Human-readable placement of the device.
    pub location: String,
    /// Unique device identifier.
    pub device_id: String,
    /// Human-readable summary shown in notifications.
    pub message: String,
}

impl AlertMessage {
    /// Build an alert for a reading, stamping it with the current time.
    pub fn new(decibels: f64, status: Severity, device_id: &str, location: &str) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            decibel_level: decibels,
            status,
            location: location.to_string(),
            device_id: device_id.to_string(),
            message: format!(
                "Noise level: {decibels:.1} dB - Status: {}",
                status.as_str().to_uppercase()
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// AlertSink trait
// ---------------------------------------------------------------------------

/// Async trait for alert delivery.
///
/// Implementors must be `Send + Sync` so they can be shared with the
/// consumer task as `Arc<dyn AlertSink>`.  Semantics are at-most-once: the
/// pipeline never retries a failed send.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver `alert`, returning the backend-assigned message id.
    async fn send(&self, alert: &AlertMessage) -> Result<String, SinkError>;
}

// ---------------------------------------------------------------------------
// HttpAlertSink
// ---------------------------------------------------------------------------

/// POSTs [`AlertMessage`]s as JSON to the configured alert endpoint.
///
/// All connection details (`alert_endpoint`, `api_key`, `timeout_secs`)
/// come exclusively from the [`SinkConfig`] passed to
/// [`HttpAlertSink::from_config`]; nothing is hardcoded.
pub struct HttpAlertSink {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAlertSink {
    /// Build an alert sink from sink configuration.
    ///
    /// The HTTP client is pre-configured with the per-request timeout.  A
    /// default (no-timeout) client is used as a last-resort fallback if the
    /// builder fails (should never happen in practice).
    pub fn from_config(config: &SinkConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: config.alert_endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl AlertSink for HttpAlertSink {
    /// Send the alert payload to the configured endpoint.
    ///
    /// The `Authorization: Bearer …` header is attached **only** when
    /// `api_key` is `Some(key)` and `key` is non-empty, so unauthenticated
    /// local endpoints work out of the box.
    async fn send(&self, alert: &AlertMessage) -> Result<String, SinkError> {
        let mut req = self.client.post(&self.endpoint).json(alert);

        let key = self.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status(status.as_u16()));
        }

        // The backend echoes a message id on success; an absent or
        // non-JSON body yields an empty id rather than a failure.
        let message_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("messageId").and_then(|id| id.as_str().map(String::from)))
            .unwrap_or_default();

        Ok(message_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
