//! Monitor configuration

use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default poll interval (one second)
pub const DEFAULT_INTERVAL_MS: i64 = 1000;

/// What to do when a listener returns an error during notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultPolicy {
    /// Abort the remaining notifications of the scan and return `ListenerFault`
    #[default]
    Propagate,
    /// Log the fault and keep notifying
    Isolate,
}

/// Serializable monitor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Poll interval in milliseconds (must be positive)
    pub interval_ms: i64,

    /// Listener fault handling
    pub fault_policy: FaultPolicy,

    /// Give up waiting on a scan after this many milliseconds (unset or 0 = no limit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scan_timeout_ms: Option<u64>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            fault_policy: FaultPolicy::default(),
            scan_timeout_ms: None,
        }
    }
}

impl MonitorConfig {
    /// Check the settings without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        self.interval().map(|_| ())
    }

    pub fn interval(&self) -> Result<Duration> {
        interval_from_millis(self.interval_ms)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

/// Convert a millisecond count into a poll interval
///
/// Zero and negative values are rejected with `InvalidInterval`.
pub fn interval_from_millis(millis: i64) -> Result<Duration> {
    if millis <= 0 {
        return Err(WatchError::InvalidInterval { millis });
    }
    Ok(Duration::from_millis(millis as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_from_millis() {
        assert_eq!(interval_from_millis(100).unwrap(), Duration::from_millis(100));
        assert!(matches!(
            interval_from_millis(0),
            Err(WatchError::InvalidInterval { millis: 0 })
        ));
        assert!(matches!(
            interval_from_millis(-5),
            Err(WatchError::InvalidInterval { millis: -5 })
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.interval().unwrap(), Duration::from_secs(1));
        assert_eq!(config.fault_policy, FaultPolicy::Propagate);
        assert_eq!(config.scan_timeout(), None);
    }

    #[test]
    fn test_zero_scan_timeout_means_none() {
        let config = MonitorConfig {
            scan_timeout_ms: Some(0),
            ..Default::default()
        };
        assert_eq!(config.scan_timeout(), None);

        let config = MonitorConfig {
            scan_timeout_ms: Some(250),
            ..Default::default()
        };
        assert_eq!(config.scan_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: MonitorConfig = serde_json::from_str(r#"{"fault_policy":"isolate"}"#).unwrap();
        assert_eq!(config.interval_ms, DEFAULT_INTERVAL_MS);
        assert_eq!(config.fault_policy, FaultPolicy::Isolate);

        let config: MonitorConfig = serde_json::from_str(r#"{"interval_ms":-1}"#).unwrap();
        assert!(config.validate().is_err());
    }
}
