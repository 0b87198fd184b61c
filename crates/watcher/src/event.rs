//! Change events produced by a scan

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A classified transition for one path, produced during a scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Type of change
    pub kind: ChangeKind,
    /// Absolute path that changed
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self { kind, path: path.into() }
    }
}

/// Type of change observed between two scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// Path absent from the previous snapshot
    Created,
    /// Modification time differs from the previous snapshot
    Changed,
    /// Path in the previous snapshot but missing from the listing
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Created => "Created",
            ChangeKind::Changed => "Changed",
            ChangeKind::Deleted => "Deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_display() {
        assert_eq!(ChangeKind::Created.to_string(), "Created");
        assert_eq!(ChangeKind::Changed.to_string(), "Changed");
        assert_eq!(ChangeKind::Deleted.to_string(), "Deleted");
    }

    #[test]
    fn test_event_json_shape() {
        let event = ChangeEvent::new(ChangeKind::Created, "/tmp/a.txt");
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"kind":"Created","path":"/tmp/a.txt"}"#);
    }
}
