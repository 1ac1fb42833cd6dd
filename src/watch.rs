//! Watcher bookkeeping shared by the async and blocking clients.
//!
//! A client holds one `WatcherTable` mapping configuration names to the
//! cancellation signal of their active poller. The table enforces the
//! at-most-one-watcher-per-name invariant: inserting a watcher for a name
//! that already has one returns the displaced signal so the caller can
//! cancel it before the new poller observes anything.
//!
//! Entries carry a generation id so that a stale `WatchHandle` (one whose
//! watcher was already replaced) can never tear down the replacement.

use std::collections::HashMap;
use std::time::Duration;

/// Default polling cadence, matching the service's recommended interval.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(5);

/// Cancellation signal owned by a watcher table entry.
pub trait CancelSignal {
    /// Request cooperative cancellation. Observed by the poll loop at the
    /// top of a cycle, immediately before a callback invocation, or during
    /// the inter-cycle wait; never interrupts an in-flight request.
    fn cancel(&self);
}

/// Name -> (generation, signal) map with monotonically increasing ids.
pub struct WatcherTable<S> {
    next_id: u64,
    watchers: HashMap<String, (u64, S)>,
}

impl<S> Default for WatcherTable<S> {
    fn default() -> Self {
        Self {
            next_id: 0,
            watchers: HashMap::new(),
        }
    }
}

impl<S: CancelSignal> WatcherTable<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a watcher for `name`, cancelling and discarding any prior
    /// one. Returns the generation id of the new entry.
    pub fn insert(&mut self, name: &str, signal: S) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if let Some((_, displaced)) = self.watchers.insert(name.to_string(), (id, signal)) {
            tracing::debug!(config = %name, "replacing existing watcher");
            displaced.cancel();
        }
        id
    }

    /// Cancel and remove the watcher for `name`, but only if the entry still
    /// belongs to generation `id`. A stale handle is a no-op.
    pub fn cancel_if_current(&mut self, name: &str, id: u64) {
        let current = self.watchers.get(name).map(|(entry_id, _)| *entry_id);
        if current == Some(id) {
            if let Some((_, signal)) = self.watchers.remove(name) {
                signal.cancel();
            }
        }
    }

    /// Cancel and remove every watcher. Used by `destroy`.
    pub fn cancel_all(&mut self) {
        for (_, (_, signal)) in self.watchers.drain() {
            signal.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.watchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watchers.is_empty()
    }
}

/// Handle returned by `watch`; consuming it with [`WatchHandle::stop`]
/// signals cancellation and removes the watcher entry.
///
/// Dropping the handle does *not* stop the watcher: a watch outlives the
/// handle unless explicitly stopped, replaced, or torn down with the client.
pub struct WatchHandle {
    stop: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchHandle {
    pub(crate) fn new(stop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            stop: Some(Box::new(stop)),
        }
    }

    /// Signal cancellation and remove the watcher entry.
    pub fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            stop();
        }
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle").finish_non_exhaustive()
    }
}
