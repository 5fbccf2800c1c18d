//! Quiet-window debouncing for raw change notifications.
//!
//! Notification backends often report a single logical write as several
//! events. The debouncer remembers when each path was last seen and
//! suppresses events that arrive before the quiet interval has elapsed.
//! Every sighting slides the window forward, so a sustained burst only lets
//! its first event through.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Default quiet interval in milliseconds.
pub const DEFAULT_QUIET_INTERVAL_MS: u64 = 100;

/// Debounces change notifications by path.
///
/// Safe to share between notification threads: each lookup is an atomic
/// read-modify-write of one map entry.
#[derive(Debug)]
pub struct Debouncer {
    /// Last observation per path key. Entries are never evicted.
    last_seen: DashMap<String, Instant>,
    /// Quiet interval in milliseconds.
    interval_ms: AtomicU64,
    /// When false, nothing is suppressed and nothing is recorded.
    enabled: AtomicBool,
}

impl Debouncer {
    /// Create a new debouncer with the given quiet interval in milliseconds.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            last_seen: DashMap::new(),
            interval_ms: AtomicU64::new(interval_ms),
            enabled: AtomicBool::new(true),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.load(Ordering::Relaxed))
    }

    pub fn set_interval_ms(&self, interval_ms: u64) {
        self.interval_ms.store(interval_ms, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Decide whether an event for `path` observed at `now` should be dropped.
    ///
    /// The stored timestamp is updated to `now` whether or not the event is
    /// suppressed. Threads racing on one path can reach the entry out of
    /// timestamp order; an observation older than the stored one counts as
    /// zero elapsed time and the newer stored value is kept.
    pub fn should_suppress(&self, path: &Path, now: Instant) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let interval = self.interval();

        match self.last_seen.entry(path_key(path)) {
            Entry::Vacant(slot) => {
                slot.insert(now);
                false
            }
            Entry::Occupied(mut slot) => match now.checked_duration_since(*slot.get()) {
                Some(elapsed) => {
                    slot.insert(now);
                    elapsed < interval
                }
                None => {
                    crate::debug_event!("debouncer", "reordered observation", "{}", path.display());
                    true
                }
            },
        }
    }

    /// Number of distinct paths seen so far.
    pub fn tracked_count(&self) -> usize {
        self.last_seen.len()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_INTERVAL_MS)
    }
}

/// Map a path to its tracker key, folding case where the host file system does.
fn path_key(path: &Path) -> String {
    let key = path.to_string_lossy();
    if cfg!(any(windows, target_os = "macos")) {
        key.to_ascii_lowercase()
    } else {
        key.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn at(base: Instant, ms: u64) -> Instant {
        base + Duration::from_millis(ms)
    }

    #[test]
    fn test_first_sighting_passes() {
        let debouncer = Debouncer::new(100);
        let base = Instant::now();

        assert!(!debouncer.should_suppress(Path::new("/settings/a.cfg"), base));
        assert!(!debouncer.should_suppress(Path::new("/settings/b.cfg"), at(base, 1)));
        assert_eq!(debouncer.tracked_count(), 2);
    }

    #[test]
    fn test_burst_scenario() {
        let debouncer = Debouncer::new(100);
        let path = Path::new("/settings/a.cfg");
        let base = Instant::now();

        assert!(!debouncer.should_suppress(path, base));
        assert!(debouncer.should_suppress(path, at(base, 50)));
        // 110ms after the previous sighting
        assert!(!debouncer.should_suppress(path, at(base, 160)));
    }

    #[test]
    fn test_exact_interval_is_not_suppressed() {
        let debouncer = Debouncer::new(100);
        let path = Path::new("/settings/a.cfg");
        let base = Instant::now();

        debouncer.should_suppress(path, base);
        assert!(!debouncer.should_suppress(path, at(base, 100)));
    }

    #[test]
    fn test_sustained_burst_slides_window() {
        let debouncer = Debouncer::new(100);
        let path = Path::new("/settings/a.cfg");
        let base = Instant::now();

        assert!(!debouncer.should_suppress(path, base));
        // Every event lands within 100ms of the previous one, so none pass
        // even though 300ms elapse in total.
        for ms in [60, 120, 180, 240, 300] {
            assert!(debouncer.should_suppress(path, at(base, ms)), "t={ms}");
        }
        assert!(!debouncer.should_suppress(path, at(base, 400)));
    }

    #[test]
    fn test_disabled_never_suppresses_or_records() {
        let debouncer = Debouncer::new(100);
        debouncer.set_enabled(false);
        let path = Path::new("/settings/a.cfg");
        let base = Instant::now();

        for ms in [0, 1, 2, 3] {
            assert!(!debouncer.should_suppress(path, at(base, ms)));
        }
        assert_eq!(debouncer.tracked_count(), 0);
    }

    #[test]
    fn test_interval_change_applies_to_next_decision() {
        let debouncer = Debouncer::new(100);
        let path = Path::new("/settings/a.cfg");
        let base = Instant::now();

        debouncer.should_suppress(path, base);
        debouncer.set_interval_ms(10);
        assert_eq!(debouncer.interval(), Duration::from_millis(10));
        assert!(!debouncer.should_suppress(path, at(base, 50)));
    }

    #[test]
    fn test_reordered_observation_is_suppressed() {
        let debouncer = Debouncer::new(100);
        let path = Path::new("/settings/a.cfg");
        let base = Instant::now();

        assert!(!debouncer.should_suppress(path, at(base, 5)));
        assert!(debouncer.should_suppress(path, base));
        // The newer stored timestamp is kept.
        assert!(debouncer.should_suppress(path, at(base, 104)));
        assert!(!debouncer.should_suppress(path, at(base, 210)));
    }

    #[test]
    fn test_path_key_folds_ascii_only_where_host_folds() {
        let key = path_key(Path::new("/Settings/Ä.CFG"));
        if cfg!(any(windows, target_os = "macos")) {
            assert_eq!(key, "/settings/Ä.cfg");
        } else {
            assert_eq!(key, "/Settings/Ä.CFG");
        }
    }

    #[test]
    fn test_concurrent_paths_do_not_interfere() {
        let debouncer = Arc::new(Debouncer::new(100));
        let base = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let debouncer = Arc::clone(&debouncer);
                thread::spawn(move || {
                    let path = PathBuf::from(format!("/settings/file{i}.cfg"));
                    let first = debouncer.should_suppress(&path, base);
                    let second = debouncer.should_suppress(&path, at(base, 10));
                    let third = debouncer.should_suppress(&path, at(base, 200));
                    (first, second, third)
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), (false, true, false));
        }
        assert_eq!(debouncer.tracked_count(), 8);
    }

    #[test]
    fn test_concurrent_same_path_passes_once() {
        let debouncer = Arc::new(Debouncer::new(10_000));
        let base = Instant::now();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let debouncer = Arc::clone(&debouncer);
                thread::spawn(move || {
                    !debouncer.should_suppress(Path::new("/settings/shared.cfg"), base)
                })
            })
            .collect();

        let passed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|passed| *passed)
            .count();
        assert_eq!(passed, 1);
    }

    #[test]
    fn test_concurrent_live_clock_burst_passes_once() {
        let threads = 4;
        let path = Path::new("/settings/shared.cfg");

        for round in 0..500 {
            let debouncer = Arc::new(Debouncer::new(10_000));
            let barrier = Arc::new(Barrier::new(threads));

            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    let debouncer = Arc::clone(&debouncer);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        let now = Instant::now();
                        !debouncer.should_suppress(path, now)
                    })
                })
                .collect();

            let passed = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|passed| *passed)
                .count();
            assert_eq!(passed, 1, "round {round}");
        }
    }
}
