//! Watch target resolution.
//!
//! Maps each [`ArtifactKind`] to the directory, filter and mode the
//! registrar should watch. Kind-specific policy lives in a static table so
//! adding a kind never touches dispatch logic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::{MatchOptions, Pattern};
use serde::Serialize;

use crate::config::{
    DATA_COLLECTION_CONFIGURATION_DIRECTORY, OBJECT_MAP_FOLDER, PERSISTENCE_DIRECTORY,
    SettingsLookup,
};
use crate::types::ArtifactKind;

use super::error::WatchError;

/// Glob used for the data collection configuration directory.
pub const DATA_COLLECTION_FILTER: &str = "*.spo";

#[cfg(windows)]
mod defaults {
    pub const OBJECT_MAP_DIR: &str = r"C:\SPGateway\Metadata\";
    pub const SETTINGS_DIR: &str = r"C:\SPGateway\Settings\";
    pub const DATA_COLLECTION_DIR: &str = r"C:\SPGateway\Objects\DataCollectionConfiguration\";
}

#[cfg(not(windows))]
mod defaults {
    pub const OBJECT_MAP_DIR: &str = "/var/lib/spgateway/metadata";
    pub const SETTINGS_DIR: &str = "/var/lib/spgateway/settings";
    pub const DATA_COLLECTION_DIR: &str = "/var/lib/spgateway/objects/data_collection_configuration";
}

pub use defaults::{DATA_COLLECTION_DIR, OBJECT_MAP_DIR, SETTINGS_DIR};

/// Lookup from artifact kind to its file name pattern.
pub trait ArtifactNames: Send + Sync {
    /// File name (possibly with leading relative directories) for `kind`,
    /// or `None` when the kind has no single backing file.
    fn filename_for(&self, kind: ArtifactKind) -> Option<String>;
}

/// The file names the gateway ships with.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultArtifactNames;

impl ArtifactNames for DefaultArtifactNames {
    fn filename_for(&self, kind: ArtifactKind) -> Option<String> {
        let name = match kind {
            ArtifactKind::GatewayLogSettings => "GatewayLogSettings.xml",
            ArtifactKind::MessageRouterSettings => "MessageRouterSettings.xml",
            ArtifactKind::SiteManagerSettings => "SiteManagerSettings.xml",
            ArtifactKind::TunnelManagerSettings => "TunnelManagerSettings.xml",
            ArtifactKind::DataOffloaderServiceEndpoints => "DataOffloaderServiceEndpoints.xml",
            ArtifactKind::ObjectMaps => "ObjectMaps.xml",
            ArtifactKind::DataCollectionConfiguration | ArtifactKind::Unknown => return None,
        };
        Some(name.to_string())
    }
}

/// How a target is watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WatchMode {
    /// One exact file; last-write notifications only.
    SingleFile,
    /// Every file in a directory matching a glob; create, change and delete.
    DirectoryGlob,
}

/// Concrete watch registration for one artifact kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchTarget {
    pub kind: ArtifactKind,
    pub directory: PathBuf,
    /// Exact file name for `SingleFile`, glob for `DirectoryGlob`.
    pub filter: String,
    pub mode: WatchMode,
}

impl WatchTarget {
    /// Full path of the watched file, for single-file targets.
    pub fn file_path(&self) -> Option<PathBuf> {
        match self.mode {
            WatchMode::SingleFile => Some(self.directory.join(&self.filter)),
            WatchMode::DirectoryGlob => None,
        }
    }
}

/// Resolution policy for one kind.
#[derive(Debug, Clone, Copy)]
enum ResolveStrategy {
    /// Artifact file name appended to an overridable base directory.
    File {
        base_key: &'static str,
        default_dir: &'static str,
    },
    /// An overridable directory filtered by a glob.
    Directory {
        dir_key: &'static str,
        default_dir: &'static str,
        glob: &'static str,
    },
}

const SETTINGS_FILE: ResolveStrategy = ResolveStrategy::File {
    base_key: PERSISTENCE_DIRECTORY,
    default_dir: SETTINGS_DIR,
};

/// Every watchable kind. Kinds missing here are skipped at startup.
const WATCH_TABLE: &[(ArtifactKind, ResolveStrategy)] = &[
    (ArtifactKind::GatewayLogSettings, SETTINGS_FILE),
    (ArtifactKind::MessageRouterSettings, SETTINGS_FILE),
    (ArtifactKind::SiteManagerSettings, SETTINGS_FILE),
    (ArtifactKind::TunnelManagerSettings, SETTINGS_FILE),
    (ArtifactKind::DataOffloaderServiceEndpoints, SETTINGS_FILE),
    (
        ArtifactKind::ObjectMaps,
        ResolveStrategy::File {
            base_key: OBJECT_MAP_FOLDER,
            default_dir: OBJECT_MAP_DIR,
        },
    ),
    (
        ArtifactKind::DataCollectionConfiguration,
        ResolveStrategy::Directory {
            dir_key: DATA_COLLECTION_CONFIGURATION_DIRECTORY,
            default_dir: DATA_COLLECTION_DIR,
            glob: DATA_COLLECTION_FILTER,
        },
    ),
];

fn strategy_for(kind: ArtifactKind) -> Option<ResolveStrategy> {
    WATCH_TABLE
        .iter()
        .find(|(k, _)| *k == kind)
        .map(|(_, strategy)| *strategy)
}

/// Resolves artifact kinds to watch targets.
#[derive(Clone)]
pub struct TargetResolver {
    names: Arc<dyn ArtifactNames>,
    settings: Arc<dyn SettingsLookup>,
}

impl TargetResolver {
    pub fn new(names: Arc<dyn ArtifactNames>, settings: Arc<dyn SettingsLookup>) -> Self {
        Self { names, settings }
    }

    /// Resolve one kind. `Ok(None)` means the kind is not watchable.
    pub fn resolve(&self, kind: ArtifactKind) -> Result<Option<WatchTarget>, WatchError> {
        let Some(strategy) = strategy_for(kind) else {
            return Ok(None);
        };

        let target = match strategy {
            ResolveStrategy::File {
                base_key,
                default_dir,
            } => self.resolve_file(kind, base_key, default_dir)?,
            ResolveStrategy::Directory {
                dir_key,
                default_dir,
                glob,
            } => {
                Pattern::new(glob).map_err(|e| WatchError::InvalidPattern {
                    pattern: glob.to_string(),
                    reason: e.to_string(),
                })?;

                WatchTarget {
                    kind,
                    directory: self.base_dir(dir_key, default_dir),
                    filter: glob.to_string(),
                    mode: WatchMode::DirectoryGlob,
                }
            }
        };

        Ok(Some(target))
    }

    /// Resolve every kind, logging and skipping the ones that fail.
    pub fn resolve_all(&self) -> Vec<WatchTarget> {
        let mut targets = Vec::new();

        for kind in ArtifactKind::ALL {
            match self.resolve(kind) {
                Ok(Some(target)) => {
                    crate::debug_event!(
                        "resolver",
                        "resolved",
                        "{kind} -> {} ({})",
                        target.directory.display(),
                        target.filter
                    );
                    targets.push(target);
                }
                Ok(None) => {}
                Err(e) => tracing::error!("[resolver] {e}"),
            }
        }

        targets
    }

    fn resolve_file(
        &self,
        kind: ArtifactKind,
        base_key: &str,
        default_dir: &str,
    ) -> Result<WatchTarget, WatchError> {
        let pattern = self
            .names
            .filename_for(kind)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| WatchError::ResolveFailed {
                kind,
                reason: "no file name registered".to_string(),
            })?;

        let full_path = self.base_dir(base_key, default_dir).join(&pattern);

        let filter = full_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| WatchError::ResolveFailed {
                kind,
                reason: format!("'{pattern}' has no file name component"),
            })?
            .to_string();

        let directory = full_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .ok_or_else(|| WatchError::ResolveFailed {
                kind,
                reason: format!("'{}' has no directory component", full_path.display()),
            })?;

        Ok(WatchTarget {
            kind,
            directory,
            filter,
            mode: WatchMode::SingleFile,
        })
    }

    /// Override from settings when present and non-empty, else the default.
    fn base_dir(&self, key: &str, default_dir: &str) -> PathBuf {
        match self.settings.get_setting(key) {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => PathBuf::from(default_dir),
        }
    }
}

/// Compare two file names the way the host file system does.
pub(crate) fn file_names_equal(a: &str, b: &str) -> bool {
    if cfg!(any(windows, target_os = "macos")) {
        a.eq_ignore_ascii_case(b)
    } else {
        a == b
    }
}

/// Glob match options consistent with [`file_names_equal`].
pub(crate) fn glob_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: !cfg!(any(windows, target_os = "macos")),
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}
