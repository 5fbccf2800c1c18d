//! Routes raw notifications through debouncing and classification to the handler.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::types::{ChangeEvent, ChangeType, WatcherId};

use super::classifier::Classifier;
use super::debouncer::Debouncer;
use super::handler::ChangeHandler;

/// Notification entry point shared by every registration of one watcher.
pub struct Dispatcher {
    source: WatcherId,
    debouncer: Arc<Debouncer>,
    classifier: Classifier,
    handler: Option<Arc<dyn ChangeHandler>>,
}

impl Dispatcher {
    pub fn new(
        source: WatcherId,
        debouncer: Arc<Debouncer>,
        classifier: Classifier,
        handler: Option<Arc<dyn ChangeHandler>>,
    ) -> Self {
        Self {
            source,
            debouncer,
            classifier,
            handler,
        }
    }

    /// Handle one raw event observed now.
    ///
    /// Returns the classified event when it survived debouncing and
    /// classification, whether or not a handler was installed.
    pub fn dispatch(&self, path: &Path, change: ChangeType) -> Option<ChangeEvent> {
        self.dispatch_at(path, change, Instant::now())
    }

    /// Handle one raw event observed at `now`.
    pub fn dispatch_at(&self, path: &Path, change: ChangeType, now: Instant) -> Option<ChangeEvent> {
        if self.debouncer.should_suppress(path, now) {
            return None;
        }

        let event = self.classifier.classify(path, change);
        if event.kind.is_unknown() {
            crate::debug_event!("dispatcher", "unrecognised", "{:?} {}", change, path.display());
            return None;
        }

        crate::log_event!("dispatcher", "settings changed", "{} {}", event.kind, event.name);

        if let Some(handler) = &self.handler {
            let delivered = catch_unwind(AssertUnwindSafe(|| handler.on_change(self.source, &event)));
            if delivered.is_err() {
                tracing::error!(
                    "[{}] handler panicked for {}",
                    handler.name(),
                    event.path.display()
                );
            }
        }

        Some(event)
    }
}
