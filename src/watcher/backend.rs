//! File-change notification backends.
//!
//! The registrar asks a [`WatchBackend`] for one registration per target.
//! Each registration delivers `(path, change)` pairs to an [`EventSink`]
//! from the backend's own thread until its [`WatchGuard`] is dropped.

use std::any::Any;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use glob::Pattern;
use notify::event::{MetadataKind, ModifyKind};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::types::ChangeType;

use super::error::WatchError;
use super::target::{file_names_equal, glob_options};

/// Callback a backend invokes for every matching raw event.
pub type EventSink = Arc<dyn Fn(&Path, ChangeType) + Send + Sync>;

/// Keeps one registration alive. Dropping it stops delivery.
pub struct WatchGuard {
    _inner: Box<dyn Any + Send>,
}

impl WatchGuard {
    pub fn new<T: Send + 'static>(inner: T) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

impl fmt::Debug for WatchGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchGuard").finish_non_exhaustive()
    }
}

/// Capability to watch files and directories.
pub trait WatchBackend: Send + Sync {
    /// Watch `directory` for last-write changes to the file named `filename`.
    fn watch_file(
        &self,
        directory: &Path,
        filename: &str,
        sink: EventSink,
    ) -> Result<WatchGuard, WatchError>;

    /// Watch `directory` for creates, changes and deletes of files matching `pattern`.
    fn watch_directory(
        &self,
        directory: &Path,
        pattern: &str,
        sink: EventSink,
    ) -> Result<WatchGuard, WatchError>;
}

/// Backend built on `notify::RecommendedWatcher`, one watcher per registration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifyBackend;

impl NotifyBackend {
    fn start<F>(directory: &Path, on_event: F) -> Result<WatchGuard, WatchError>
    where
        F: Fn(Event) + Send + 'static,
    {
        if !directory.is_dir() {
            return Err(WatchError::PathWatchFailed {
                path: directory.to_path_buf(),
                reason: "directory does not exist".to_string(),
            });
        }

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => on_event(event),
            Err(e) => tracing::error!("[watcher] file watch error: {e}"),
        })?;

        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: directory.to_path_buf(),
                reason: e.to_string(),
            })?;

        crate::debug_event!("watcher", "watching", "{}", directory.display());
        Ok(WatchGuard::new(watcher))
    }
}

impl WatchBackend for NotifyBackend {
    fn watch_file(
        &self,
        directory: &Path,
        filename: &str,
        sink: EventSink,
    ) -> Result<WatchGuard, WatchError> {
        let filename = filename.to_string();

        Self::start(directory, move |event| {
            let Some(change) = last_write_change(&event.kind) else {
                return;
            };
            for path in &event.paths {
                let matches = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| file_names_equal(name, &filename));
                if matches {
                    sink(path.as_path(), change);
                }
            }
        })
    }

    fn watch_directory(
        &self,
        directory: &Path,
        pattern: &str,
        sink: EventSink,
    ) -> Result<WatchGuard, WatchError> {
        let glob = Pattern::new(pattern).map_err(|e| WatchError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        Self::start(directory, move |event| {
            let Some(change) = directory_change(&event.kind) else {
                return;
            };
            for path in &event.paths {
                let matches = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| glob.matches_with(name, glob_options()));
                if matches {
                    sink(path.as_path(), change);
                }
            }
        })
    }
}

/// Map a notify event to a change for single-file watches.
///
/// Only content writes and write-time updates count.
pub(crate) fn last_write_change(kind: &EventKind) -> Option<ChangeType> {
    match kind {
        EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => {
            Some(ChangeType::Changed)
        }
        _ => None,
    }
}

/// Map a notify event to a change for directory watches.
pub(crate) fn directory_change(kind: &EventKind) -> Option<ChangeType> {
    match kind {
        EventKind::Create(_) => Some(ChangeType::Created),
        EventKind::Remove(_) => Some(ChangeType::Deleted),
        // Renames are not part of the subscription
        EventKind::Modify(ModifyKind::Name(_)) => None,
        EventKind::Modify(_) => Some(ChangeType::Changed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};

    #[test]
    fn test_last_write_mapping() {
        assert_eq!(
            last_write_change(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(ChangeType::Changed)
        );
        assert_eq!(
            last_write_change(&EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime))),
            Some(ChangeType::Changed)
        );
        assert_eq!(
            last_write_change(&EventKind::Modify(ModifyKind::Metadata(
                MetadataKind::Permissions
            ))),
            None
        );
        assert_eq!(last_write_change(&EventKind::Create(CreateKind::File)), None);
        assert_eq!(last_write_change(&EventKind::Remove(RemoveKind::File)), None);
    }

    #[test]
    fn test_directory_mapping() {
        assert_eq!(
            directory_change(&EventKind::Create(CreateKind::File)),
            Some(ChangeType::Created)
        );
        assert_eq!(
            directory_change(&EventKind::Modify(ModifyKind::Data(DataChange::Any))),
            Some(ChangeType::Changed)
        );
        assert_eq!(
            directory_change(&EventKind::Remove(RemoveKind::Any)),
            Some(ChangeType::Deleted)
        );
        assert_eq!(
            directory_change(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            None
        );
        assert_eq!(
            directory_change(&EventKind::Access(AccessKind::Any)),
            None
        );
    }

    #[test]
    fn test_missing_directory_is_rejected() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = temp_dir.path().join("absent");
        let sink: EventSink = Arc::new(|_: &Path, _: ChangeType| {});

        let result = NotifyBackend.watch_file(&missing, "SiteManagerSettings.xml", sink);
        assert!(matches!(result, Err(WatchError::PathWatchFailed { .. })));
    }
}
