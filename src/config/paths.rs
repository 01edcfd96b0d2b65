//! Cross-platform config file location using the `dirs` crate.
//!
//! Layout:
//!
//!   Windows: %APPDATA%\noise-monitor\config.toml
//!   macOS:   ~/Library/Application Support/noise-monitor/config.toml
//!   Linux:   ~/.config/noise-monitor/config.toml

use std::path::PathBuf;

/// Holds the resolved configuration directory/file paths.
#[derive(Debug, Clone)]
pub struct MonitorPaths {
    /// Directory holding `config.toml`.
    pub config_dir: PathBuf,
    /// Full path to `config.toml`.
    pub config_file: PathBuf,
}

impl MonitorPaths {
    const APP_NAME: &'static str = "noise-monitor";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let config_file = config_dir.join("config.toml");

        Self {
            config_dir,
            config_file,
        }
    }
}

impl Default for MonitorPaths {
    fn default() -> Self {
        Self::new()
    }
}
