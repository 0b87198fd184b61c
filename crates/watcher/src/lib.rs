//! Polling directory watcher
//!
//! This crate provides a timer-driven watcher for a single directory:
//! - Snapshot of path -> last modification time
//! - Poll-diff scans classifying Created / Changed / Deleted
//! - Synchronous fan-out to registered listeners
//! - Non-overlapping scans driven by a Tokio ticker

pub mod config;
pub mod error;
pub mod event;
pub mod listener;
pub mod monitor;
pub mod scan;
pub mod store;

// Re-exports
pub use config::{interval_from_millis, FaultPolicy, MonitorConfig};
pub use error::{Result, WatchError};
pub use event::{ChangeEvent, ChangeKind};
pub use listener::{ChannelListener, Listener, ListenerRegistry};
pub use monitor::{DirectoryMonitor, MonitorBuilder, ScanSummary};
pub use store::{Snapshot, SnapshotHandle};
