//! Debounced change notifications for configuration artifacts.
//!
//! # Architecture
//!
//! ```text
//! SettingsWatcherBuilder::build
//!   - TargetResolver: ArtifactKind -> WatchTarget (static table)
//!   - WatchBackend: one registration per target
//!         |
//!   backend thread(s)
//!         |
//!   Dispatcher
//!     Debouncer (quiet window, shared)
//!       -> Classifier (path -> ArtifactKind)
//!         -> ChangeHandler (optional)
//! ```

mod backend;
mod classifier;
mod debouncer;
mod dispatcher;
mod error;
mod handler;
mod settings_watcher;
mod target;

pub use backend::{EventSink, NotifyBackend, WatchBackend, WatchGuard};
pub use classifier::Classifier;
pub use debouncer::{DEFAULT_QUIET_INTERVAL_MS, Debouncer};
pub use dispatcher::Dispatcher;
pub use error::WatchError;
pub use handler::{ChangeHandler, ChannelHandler};
pub use settings_watcher::{SettingsWatcher, SettingsWatcherBuilder};
pub use target::{
    ArtifactNames, DATA_COLLECTION_DIR, DATA_COLLECTION_FILTER, DefaultArtifactNames,
    OBJECT_MAP_DIR, SETTINGS_DIR, TargetResolver, WatchMode, WatchTarget,
};
