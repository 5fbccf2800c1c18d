//! Multi-target settings watcher and its builder.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{Settings, SettingsLookup};
use crate::types::{ArtifactKind, ChangeEvent, ChangeType, WatcherId};

use super::backend::{EventSink, NotifyBackend, WatchBackend, WatchGuard};
use super::classifier::Classifier;
use super::debouncer::{DEFAULT_QUIET_INTERVAL_MS, Debouncer};
use super::dispatcher::Dispatcher;
use super::error::WatchError;
use super::handler::ChangeHandler;
use super::target::{ArtifactNames, DefaultArtifactNames, TargetResolver, WatchMode, WatchTarget};

/// Active registration for one artifact kind.
#[derive(Debug)]
struct Registration {
    kind: ArtifactKind,
    _guard: WatchGuard,
}

/// Watches every configured artifact and reports debounced, classified changes.
///
/// All watches are registered during [`SettingsWatcherBuilder::build`].
/// Kinds that fail to resolve or register stay unwatched for the lifetime
/// of the instance; the rest keep working.
pub struct SettingsWatcher {
    id: WatcherId,
    debouncer: Arc<Debouncer>,
    dispatcher: Arc<Dispatcher>,
    /// Every target that resolved, registered or not.
    targets: Vec<WatchTarget>,
    registrations: Mutex<Vec<Registration>>,
}

impl SettingsWatcher {
    /// Create a builder for configuring the watcher.
    pub fn builder() -> SettingsWatcherBuilder {
        SettingsWatcherBuilder::new()
    }

    pub fn id(&self) -> WatcherId {
        self.id
    }

    pub fn quiet_interval(&self) -> Duration {
        self.debouncer.interval()
    }

    pub fn set_quiet_interval_ms(&self, interval_ms: u64) {
        self.debouncer.set_interval_ms(interval_ms);
    }

    pub fn filter_recent_events(&self) -> bool {
        self.debouncer.is_enabled()
    }

    pub fn set_filter_recent_events(&self, enabled: bool) {
        self.debouncer.set_enabled(enabled);
    }

    /// Targets that resolved at startup.
    pub fn targets(&self) -> &[WatchTarget] {
        &self.targets
    }

    /// Kinds with a live registration, in registration order.
    pub fn watched_kinds(&self) -> Vec<ArtifactKind> {
        self.registrations.lock().iter().map(|r| r.kind).collect()
    }

    pub fn is_watching(&self, kind: ArtifactKind) -> bool {
        self.registrations.lock().iter().any(|r| r.kind == kind)
    }

    /// Feed a raw event through the same path a backend notification takes.
    pub fn dispatch(&self, path: &Path, change: ChangeType) -> Option<ChangeEvent> {
        self.dispatcher.dispatch(path, change)
    }

    /// Stop every watch and release its handle. Returns how many were stopped.
    pub fn stop(&self) -> usize {
        let stopped: Vec<Registration> = std::mem::take(&mut *self.registrations.lock());
        let count = stopped.len();
        drop(stopped);

        if count > 0 {
            crate::log_event!("watcher", "stopped", "{count} watches released");
        }
        count
    }
}

impl Drop for SettingsWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Builder for constructing a [`SettingsWatcher`].
pub struct SettingsWatcherBuilder {
    handler: Option<Arc<dyn ChangeHandler>>,
    settings: Option<Arc<dyn SettingsLookup>>,
    names: Option<Arc<dyn ArtifactNames>>,
    backend: Option<Arc<dyn WatchBackend>>,
    quiet_interval_ms: u64,
    filter_recent_events: bool,
}

impl SettingsWatcherBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            handler: None,
            settings: None,
            names: None,
            backend: None,
            quiet_interval_ms: DEFAULT_QUIET_INTERVAL_MS,
            filter_recent_events: true,
        }
    }

    /// Take interval, toggle and directory overrides from loaded settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new()
            .quiet_interval_ms(settings.watcher.quiet_interval_ms)
            .filter_recent_events(settings.watcher.filter_recent_events)
            .settings(Arc::new(settings.clone()))
    }

    /// Set the change handler.
    pub fn handler(mut self, handler: impl ChangeHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Set a shared change handler.
    pub fn shared_handler(mut self, handler: Arc<dyn ChangeHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Set the configuration lookup used for directory overrides.
    pub fn settings(mut self, settings: Arc<dyn SettingsLookup>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Set the kind to file name lookup.
    pub fn names(mut self, names: Arc<dyn ArtifactNames>) -> Self {
        self.names = Some(names);
        self
    }

    /// Set the notification backend.
    pub fn backend(mut self, backend: Arc<dyn WatchBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set the quiet interval in milliseconds.
    pub fn quiet_interval_ms(mut self, ms: u64) -> Self {
        self.quiet_interval_ms = ms;
        self
    }

    /// Enable or disable suppression of recent events.
    pub fn filter_recent_events(mut self, enabled: bool) -> Self {
        self.filter_recent_events = enabled;
        self
    }

    /// Resolve every artifact kind and register its watch.
    ///
    /// Never fails as a whole: per-kind failures are logged and that kind
    /// is left unwatched.
    pub fn build(self) -> SettingsWatcher {
        let id = WatcherId::next();
        let settings = self
            .settings
            .unwrap_or_else(|| Arc::new(Settings::default()));
        let names = self.names.unwrap_or_else(|| Arc::new(DefaultArtifactNames));
        let backend = self.backend.unwrap_or_else(|| Arc::new(NotifyBackend));

        let debouncer = Arc::new(Debouncer::new(self.quiet_interval_ms));
        debouncer.set_enabled(self.filter_recent_events);

        let targets = TargetResolver::new(names, settings).resolve_all();
        let dispatcher = Arc::new(Dispatcher::new(
            id,
            Arc::clone(&debouncer),
            Classifier::new(&targets),
            self.handler,
        ));

        let mut registrations = Vec::with_capacity(targets.len());
        for target in &targets {
            match register(backend.as_ref(), target, &dispatcher) {
                Ok(guard) => {
                    crate::debug_event!(
                        "watcher",
                        "registered",
                        "{} {} ({})",
                        target.kind,
                        target.directory.display(),
                        target.filter
                    );
                    registrations.push(Registration {
                        kind: target.kind,
                        _guard: guard,
                    });
                }
                Err(e) => tracing::error!("[watcher] {e}"),
            }
        }

        crate::log_event!(
            "watcher",
            "started",
            "{} of {} targets watched",
            registrations.len(),
            targets.len()
        );

        SettingsWatcher {
            id,
            debouncer,
            dispatcher,
            targets,
            registrations: Mutex::new(registrations),
        }
    }
}

impl Default for SettingsWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Register one target with the backend, routing its events to `dispatcher`.
fn register(
    backend: &dyn WatchBackend,
    target: &WatchTarget,
    dispatcher: &Arc<Dispatcher>,
) -> Result<WatchGuard, WatchError> {
    let dispatcher = Arc::clone(dispatcher);
    let sink: EventSink = Arc::new(move |path: &Path, change: ChangeType| {
        dispatcher.dispatch(path, change);
    });

    let result = match target.mode {
        WatchMode::SingleFile => backend.watch_file(&target.directory, &target.filter, sink),
        WatchMode::DirectoryGlob => backend.watch_directory(&target.directory, &target.filter, sink),
    };

    result.map_err(|e| WatchError::RegistrationFailed {
        kind: target.kind,
        path: target.directory.clone(),
        reason: e.to_string(),
    })
}
