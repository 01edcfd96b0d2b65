//! Configuration module for the noise monitor.
//!
//! Provides `MonitorConfig` (top-level settings), sub-configs for each
//! subsystem, `MonitorPaths` for cross-platform config locations, and TOML
//! persistence via `MonitorConfig::load` / `MonitorConfig::save_to`.

pub mod paths;
pub mod settings;

pub use paths::MonitorPaths;
pub use settings::{
    AudioConfig, ConfigError, DeviceConfig, MonitorConfig, SinkConfig, ThresholdConfig,
};
