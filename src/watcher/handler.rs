//! Handler trait for classified change events.

use crossbeam_channel::{Receiver, Sender};

use crate::types::{ChangeEvent, WatcherId};

/// Receives classified, debounced change events.
///
/// Called synchronously on the notification thread that observed the
/// change. Implementations should return quickly; a slow handler delays
/// later events for the same watch target.
pub trait ChangeHandler: Send + Sync {
    /// Handler name for logging.
    fn name(&self) -> &str {
        "callback"
    }

    /// Handle one change. `source` identifies the reporting watcher.
    fn on_change(&self, source: WatcherId, event: &ChangeEvent);
}

impl<F> ChangeHandler for F
where
    F: Fn(WatcherId, &ChangeEvent) + Send + Sync,
{
    fn on_change(&self, source: WatcherId, event: &ChangeEvent) {
        self(source, event)
    }
}

/// Forwards events into a channel for consumption on another thread.
#[derive(Debug, Clone)]
pub struct ChannelHandler {
    tx: Sender<(WatcherId, ChangeEvent)>,
}

impl ChannelHandler {
    /// Create a handler and the receiving end of its unbounded channel.
    pub fn channel() -> (Self, Receiver<(WatcherId, ChangeEvent)>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl ChangeHandler for ChannelHandler {
    fn name(&self) -> &str {
        "channel"
    }

    fn on_change(&self, source: WatcherId, event: &ChangeEvent) {
        if self.tx.send((source, event.clone())).is_err() {
            crate::debug_event!("channel", "receiver dropped", "{}", event.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ArtifactKind, ChangeType};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample() -> ChangeEvent {
        ChangeEvent {
            kind: ArtifactKind::ObjectMaps,
            name: "ObjectMaps.xml".to_string(),
            change: ChangeType::Changed,
            path: PathBuf::from("/maps/ObjectMaps.xml"),
        }
    }

    #[test]
    fn test_closure_handler() {
        let calls = AtomicUsize::new(0);
        let handler = |_: WatcherId, event: &ChangeEvent| {
            assert_eq!(event.kind, ArtifactKind::ObjectMaps);
            calls.fetch_add(1, Ordering::SeqCst);
        };

        handler.on_change(WatcherId::next(), &sample());
        assert_eq!(handler.name(), "callback");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_channel_handler() {
        let (handler, rx) = ChannelHandler::channel();
        let id = WatcherId::next();

        handler.on_change(id, &sample());

        let (source, event) = rx.try_recv().unwrap();
        assert_eq!(source, id);
        assert_eq!(event, sample());
    }

    #[test]
    fn test_channel_handler_survives_dropped_receiver() {
        let (handler, rx) = ChannelHandler::channel();
        drop(rx);
        handler.on_change(WatcherId::next(), &sample());
    }
}
