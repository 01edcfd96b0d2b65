//! Monitor settings structs, defaults, validation and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Configuration is loaded once at startup and never mutated afterwards;
//! a missing or invalid file is fatal before any pipeline state exists.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::MonitorPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating the monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file exists at the expected location.
    #[error("config file not found: {}", .0.display())]
    Missing(PathBuf),

    /// The file exists but could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for [`MonitorConfig`].
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The file could not be serialised back to TOML.
    #[error("failed to serialise config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The parsed config violates a structural constraint.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// DeviceConfig
// ---------------------------------------------------------------------------

/// Identity of this monitoring unit, embedded in every outbound payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (`device_id` / `unitId` on the wire).
    pub id: String,
    /// Human-readable placement of the device.
    pub location: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            id: "noise-monitor-01".into(),
            location: "unknown".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ThresholdConfig
// ---------------------------------------------------------------------------

/// Severity thresholds in decibels.
///
/// A reading at or below `acceptable` is fine, at or below `warning` raises
/// a warning, anything above is a violation.  `violation` is kept for wire
/// and dashboard compatibility; classification only branches on the lower
/// two bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub acceptable: f64,
    pub warning: f64,
    pub violation: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            acceptable: 60.0,
            warning: 70.0,
            violation: 80.0,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Capture stream parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Sample rate in Hz requested from the input device.
    pub sample_rate: u32,
    /// Samples per capture block; one block is one decibel reading.
    pub block_size: u32,
    /// Number of input channels (the INMP441 style MEMS mic is mono).
    pub channels: u16,
    /// Capture queue depth in blocks.  When the consumer falls behind, new
    /// blocks beyond this bound are dropped and counted — the capture
    /// callback never blocks.
    pub queue_capacity: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 1024,
            channels: 1,
            queue_capacity: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// SinkConfig
// ---------------------------------------------------------------------------

/// Remote endpoints for alert and metrics delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// URL that receives [`AlertMessage`](crate::sink::AlertMessage) payloads.
    pub alert_endpoint: String,
    /// URL that receives [`MetricsSample`](crate::sink::MetricsSample) payloads.
    pub metrics_endpoint: String,
    /// Bearer token attached to requests — `None` or empty means no auth.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            alert_endpoint: "http://localhost:8080/alerts".into(),
            metrics_endpoint: "http://localhost:8080/metrics".into(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// MonitorConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level monitor configuration, serialised as `config.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use noise_monitor::config::MonitorConfig;
///
/// let config = MonitorConfig::load().expect("config.toml must exist");
/// config.validate().expect("thresholds must be ordered");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Device identity.
    pub device: DeviceConfig,
    /// Severity thresholds in dB.
    pub thresholds: ThresholdConfig,
    /// Capture stream parameters.
    pub audio: AudioConfig,
    /// Remote sink endpoints.
    pub sinks: SinkConfig,
    /// Number of recent readings kept for rolling averages.
    pub history_capacity: usize,
    /// A rolling average is dispatched every this-many readings.
    pub aggregation_interval: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            thresholds: ThresholdConfig::default(),
            audio: AudioConfig::default(),
            sinks: SinkConfig::default(),
            history_capacity: 100,
            aggregation_interval: 10,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the platform-appropriate `config.toml`.
    ///
    /// Unlike a desktop app, a headless monitor must not silently run with
    /// defaults: a missing file is an error so the operator notices before
    /// readings go to the wrong endpoint.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&MonitorPaths::new().config_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save to an explicit path, creating parent directories as needed.
    ///
    /// Used to write a default template on first run and by tests.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check structural constraints that the TOML schema cannot express.
    ///
    /// Called once at startup; any violation is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.id.trim().is_empty() {
            return Err(ConfigError::Invalid("device.id must not be empty".into()));
        }
        if !(self.thresholds.acceptable < self.thresholds.warning
            && self.thresholds.warning < self.thresholds.violation)
        {
            return Err(ConfigError::Invalid(format!(
                "thresholds must be strictly increasing (got {} / {} / {})",
                self.thresholds.acceptable, self.thresholds.warning, self.thresholds.violation
            )));
        }
        if self.audio.sample_rate == 0 || self.audio.block_size == 0 {
            return Err(ConfigError::Invalid(
                "audio.sample_rate and audio.block_size must be > 0".into(),
            ));
        }
        if self.audio.channels == 0 {
            return Err(ConfigError::Invalid("audio.channels must be > 0".into()));
        }
        if self.audio.queue_capacity == 0 {
            return Err(ConfigError::Invalid("audio.queue_capacity must be > 0".into()));
        }
        if self.history_capacity == 0 || self.aggregation_interval == 0 {
            return Err(ConfigError::Invalid(
                "history_capacity and aggregation_interval must be > 0".into(),
            ));
        }
        if self.aggregation_interval > self.history_capacity {
            return Err(ConfigError::Invalid(format!(
                "aggregation_interval ({}) cannot exceed history_capacity ({})",
                self.aggregation_interval, self.history_capacity
            )));
        }
        if self.sinks.alert_endpoint.trim().is_empty()
            || self.sinks.metrics_endpoint.trim().is_empty()
        {
            return Err(ConfigError::Invalid("sink endpoints must not be empty".into()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
