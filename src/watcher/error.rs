//! Error types for the settings watcher.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::ArtifactKind;

/// Errors from watcher operations.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Cannot resolve watch target for {kind}: {reason}")]
    ResolveFailed { kind: ArtifactKind, reason: String },

    #[error("Cannot watch {path} for {kind}: {reason}")]
    RegistrationFailed {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },

    #[error("Invalid filter pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}
