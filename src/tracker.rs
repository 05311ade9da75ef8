//! In-flight download bookkeeping
//!
//! [`DownloadTracker`] is the only state shared between concurrent download
//! tasks. Mutations replace the published set with a new one
//! (copy-on-write), so a [`InFlightSet`] snapshot handed to an observer never
//! changes underneath it.

use crate::types::DownloadKey;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Immutable snapshot of the keys being downloaded
pub type InFlightSet = Arc<BTreeSet<DownloadKey>>;

#[derive(Debug, Default)]
struct TrackerState {
    published: InFlightSet,
    // live guards per key; a guarded key stays published until the last one drops
    guards: HashMap<DownloadKey, usize>,
}

impl TrackerState {
    fn insert(&mut self, key: &DownloadKey) -> bool {
        if self.published.contains(key) {
            return false;
        }
        let mut next = BTreeSet::clone(&self.published);
        next.insert(key.clone());
        self.published = Arc::new(next);
        true
    }

    fn remove(&mut self, key: &DownloadKey) -> bool {
        if !self.published.contains(key) {
            return false;
        }
        let mut next = BTreeSet::clone(&self.published);
        next.remove(key);
        self.published = Arc::new(next);
        true
    }
}

/// Set of download keys with an active task (cloneable handle)
#[derive(Clone, Debug, Default)]
pub struct DownloadTracker {
    state: Arc<Mutex<TrackerState>>,
}

impl DownloadTracker {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as in flight
    ///
    /// Returns `false` (and publishes nothing) if it already was.
    pub fn begin(&self, key: &DownloadKey) -> bool {
        let inserted = self.state.lock().insert(key);
        if !inserted {
            tracing::debug!(key = %key, "download already tracked");
        }
        inserted
    }

    /// Clear the in-flight mark for `key`
    ///
    /// Returns `false` (and publishes nothing) if it was not tracked.
    pub fn end(&self, key: &DownloadKey) -> bool {
        let removed = self.state.lock().remove(key);
        if !removed {
            tracing::debug!(key = %key, "download was not tracked");
        }
        removed
    }

    /// Whether `key` currently has an active task
    pub fn is_active(&self, key: &DownloadKey) -> bool {
        self.state.lock().published.contains(key)
    }

    /// The currently published set
    pub fn snapshot(&self) -> InFlightSet {
        Arc::clone(&self.state.lock().published)
    }

    /// Mark `key` in flight until the returned guard is dropped
    ///
    /// The guard ends tracking on every exit path, including early returns
    /// and panics in the task holding it. Several guards for the same key may
    /// be alive at once; the key stays in flight until the last is dropped.
    #[must_use = "tracking ends as soon as the guard is dropped"]
    pub fn track(&self, key: DownloadKey) -> InFlightGuard {
        {
            let mut state = self.state.lock();
            let holders = state.guards.entry(key.clone()).or_insert(0);
            *holders += 1;
            if *holders > 1 {
                tracing::debug!(key = %key, holders = *holders, "key already has a running task");
            }
            state.insert(&key);
        }
        InFlightGuard {
            tracker: self.clone(),
            key,
        }
    }

    fn release(&self, key: &DownloadKey) {
        let mut state = self.state.lock();
        let remaining = match state.guards.get_mut(key) {
            Some(holders) => {
                *holders -= 1;
                *holders
            }
            None => 0,
        };
        if remaining == 0 {
            state.guards.remove(key);
            state.remove(key);
        }
    }
}

/// Scoped in-flight mark created by [`DownloadTracker::track`]
#[derive(Debug)]
pub struct InFlightGuard {
    tracker: DownloadTracker,
    key: DownloadKey,
}

impl InFlightGuard {
    /// Key being tracked
    pub fn key(&self) -> &DownloadKey {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.release(&self.key);
    }
}
