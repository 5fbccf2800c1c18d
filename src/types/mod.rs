use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Logical configuration artifacts tracked by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    GatewayLogSettings,
    MessageRouterSettings,
    SiteManagerSettings,
    TunnelManagerSettings,
    DataOffloaderServiceEndpoints,
    ObjectMaps,
    DataCollectionConfiguration,
    /// Sentinel for paths that map to no known artifact.
    Unknown,
}

impl ArtifactKind {
    /// Every kind, in declaration order. Iterated once at startup.
    pub const ALL: [ArtifactKind; 8] = [
        ArtifactKind::GatewayLogSettings,
        ArtifactKind::MessageRouterSettings,
        ArtifactKind::SiteManagerSettings,
        ArtifactKind::TunnelManagerSettings,
        ArtifactKind::DataOffloaderServiceEndpoints,
        ArtifactKind::ObjectMaps,
        ArtifactKind::DataCollectionConfiguration,
        ArtifactKind::Unknown,
    ];

    pub fn is_unknown(self) -> bool {
        self == ArtifactKind::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::GatewayLogSettings => "GatewayLogSettings",
            ArtifactKind::MessageRouterSettings => "MessageRouterSettings",
            ArtifactKind::SiteManagerSettings => "SiteManagerSettings",
            ArtifactKind::TunnelManagerSettings => "TunnelManagerSettings",
            ArtifactKind::DataOffloaderServiceEndpoints => "DataOffloaderServiceEndpoints",
            ArtifactKind::ObjectMaps => "ObjectMaps",
            ArtifactKind::DataCollectionConfiguration => "DataCollectionConfiguration",
            ArtifactKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw change reported by the notification backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeType {
    Created,
    Changed,
    Deleted,
}

/// A classified change, handed to the caller's handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub kind: ArtifactKind,
    /// File name component of `path`.
    pub name: String,
    pub change: ChangeType,
    pub path: PathBuf,
}

impl ChangeEvent {
    /// The classifier's fallback result for paths it cannot place.
    pub fn unknown(path: &Path, change: ChangeType) -> Self {
        Self {
            kind: ArtifactKind::Unknown,
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            change,
            path: path.to_path_buf(),
        }
    }
}

/// Identifies the watcher instance that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatcherId(u64);

static NEXT_WATCHER_ID: AtomicU64 = AtomicU64::new(1);

impl WatcherId {
    pub(crate) fn next() -> Self {
        Self(NEXT_WATCHER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatcherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watcher-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_kinds_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for kind in ArtifactKind::ALL {
            assert!(seen.insert(kind), "{kind} listed twice");
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn test_unknown_event_keeps_name() {
        let event = ChangeEvent::unknown(Path::new("/tmp/stray.txt"), ChangeType::Created);
        assert!(event.kind.is_unknown());
        assert_eq!(event.name, "stray.txt");
        assert_eq!(event.change, ChangeType::Created);
    }

    #[test]
    fn test_watcher_ids_increase() {
        let a = WatcherId::next();
        let b = WatcherId::next();
        assert!(b.value() > a.value());
    }
}
