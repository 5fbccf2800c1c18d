pub mod config;
pub mod logging;
pub mod types;
pub mod watcher;

pub use config::{Settings, SettingsLookup};
pub use types::{ArtifactKind, ChangeEvent, ChangeType, WatcherId};
pub use watcher::{
    ChangeHandler, ChannelHandler, SettingsWatcher, SettingsWatcherBuilder, WatchError,
    WatchTarget,
};
