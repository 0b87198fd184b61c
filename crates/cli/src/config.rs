//! Configuration file management
//!
//! Settings come from a TOML file and are overridden by command-line flags:
//!
//! ```toml
//! directory = "/srv/inbox"
//! format = "text"
//! log_file = "/var/log/dirwatch.log"
//!
//! [monitor]
//! interval_ms = 1000
//! fault_policy = "propagate"
//! scan_timeout_ms = 5000
//! ```

use crate::console::OutputFormat;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use watcher::{FaultPolicy, MonitorConfig};

/// Effective configuration of a `dirwatch` run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory to watch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Console output format
    pub format: OutputFormat,

    /// Write logs here instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,

    /// Engine settings
    pub monitor: MonitorConfig,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub directory: Option<PathBuf>,
    pub interval_ms: Option<i64>,
    pub isolate_faults: bool,
    pub scan_timeout_ms: Option<u64>,
    pub format: Option<OutputFormat>,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse config file")
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Apply command-line overrides on top of file values
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(directory) = overrides.directory {
            self.directory = Some(directory);
        }
        if let Some(interval_ms) = overrides.interval_ms {
            self.monitor.interval_ms = interval_ms;
        }
        if overrides.isolate_faults {
            self.monitor.fault_policy = FaultPolicy::Isolate;
        }
        if let Some(timeout) = overrides.scan_timeout_ms {
            self.monitor.scan_timeout_ms = Some(timeout);
        }
        if let Some(format) = overrides.format {
            self.format = format;
        }
        if let Some(log_file) = overrides.log_file {
            self.log_file = Some(log_file);
        }
    }

    /// Check values that can be checked without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        self.monitor.validate()?;
        Ok(())
    }

    /// Directory to watch, or an error explaining how to set one
    pub fn require_directory(&self) -> Result<&Path> {
        self.directory.as_deref().context(
            "No directory to watch (pass DIR or set `directory` in the config file)",
        )
    }
}

/// Default config file location (`<config dir>/dirwatch/config.toml`)
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dirwatch").join("config.toml"))
}

/// Load configuration
///
/// An explicit `path` must exist. Without one, the default location is used
/// if present; otherwise defaults apply.
pub fn load(path: Option<&Path>) -> Result<AppConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Some(default) if default.exists() => default,
            _ => return Ok(AppConfig::default()),
        },
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    AppConfig::from_toml_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
}
