//! Error types for the directory watcher

use crate::event::ChangeKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for watcher operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors raised while starting or running a [`DirectoryMonitor`](crate::DirectoryMonitor)
#[derive(Debug, Error)]
pub enum WatchError {
    /// Watched path is missing, not a directory, or unreadable at start time
    #[error("Directory not found or unreadable: {}", path.display())]
    DirectoryNotFound { path: PathBuf },

    /// Poll interval was zero or negative
    #[error("Invalid poll interval: {millis}ms (must be positive)")]
    InvalidInterval { millis: i64 },

    /// Listing the directory or reading an entry's metadata failed
    #[error("Scan of {} failed: {source}", path.display())]
    ScanIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A listener returned an error while being notified
    #[error("Listener failed handling {kind} for {}: {source}", path.display())]
    ListenerFault {
        kind: ChangeKind,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A scan did not finish within the configured timeout
    #[error("Scan exceeded timeout of {0:?}")]
    ScanTimeout(Duration),

    /// The blocking scan task panicked
    #[error("Scan task panicked")]
    ScanPanicked,

    /// `start` was called outside a Tokio runtime
    #[error("DirectoryMonitor::start requires a running Tokio runtime")]
    NoRuntime,
}

impl WatchError {
    /// Whether this error only affects a single scan cycle
    pub fn is_per_scan(&self) -> bool {
        matches!(
            self,
            WatchError::ScanIo { .. }
                | WatchError::ListenerFault { .. }
                | WatchError::ScanTimeout(_)
                | WatchError::ScanPanicked
        )
    }
}
