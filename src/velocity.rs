//! Per-key sliding-window velocity tracking.

use dashmap::DashMap;
use std::collections::VecDeque;

/// Width of the counting window in milliseconds.
pub const WINDOW_MS: u64 = 1_000;

/// Age beyond which a key's timestamps are considered idle and reclaimable.
/// Strictly larger than [`WINDOW_MS`] so a key mid-burst is never deleted.
pub const IDLE_THRESHOLD_MS: u64 = 60_000;

/// Concurrent store mapping client keys to their recent arrival timestamps.
///
/// Each entry is an ordered, append-only sequence of millisecond timestamps.
/// Arrivals are recorded in time order, so expiry is an amortized O(1) prefix
/// pop on a deque rather than a full-scan filter.
///
/// Every per-key mutation runs under the owning shard's write lock
/// ([`DashMap::entry`] / [`DashMap::get_mut`]), which makes each
/// read-modify-write atomic per key: concurrent recorders against the same
/// key cannot lose updates. Keys on different shards never contend, and the
/// reaper's sweep ([`VelocityStore::evict_idle`]) uses [`DashMap::retain`],
/// which locks one shard at a time instead of stalling the whole map.
#[derive(Debug, Default)]
pub struct VelocityStore {
    windows: DashMap<String, VecDeque<u64>>,
}

impl VelocityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an arrival for `key` at `now` and return how many arrivals the
    /// key has inside the trailing window, this one included.
    ///
    /// A blank key carries no identity to track: nothing is recorded and the
    /// count is 0. This is a defined outcome, not an error.
    pub fn record_and_count(&self, key: &str, now: u64) -> usize {
        if key.trim().is_empty() {
            return 0;
        }
        let mut entry = self.windows.entry(key.to_owned()).or_default();
        entry.push_back(now);
        trim_before(&mut entry, now.saturating_sub(WINDOW_MS));
        entry.len()
    }

    /// Count arrivals for `key` inside the trailing window without recording
    /// one. Unknown and blank keys count 0.
    pub fn current_count(&self, key: &str, now: u64) -> usize {
        if key.trim().is_empty() {
            return 0;
        }
        match self.windows.get_mut(key) {
            Some(mut entry) => {
                trim_before(&mut entry, now.saturating_sub(WINDOW_MS));
                entry.len()
            }
            None => 0,
        }
    }

    /// Drop timestamps older than [`IDLE_THRESHOLD_MS`] for every key and
    /// remove keys left empty. Returns the number of keys removed.
    pub fn evict_idle(&self, now: u64) -> usize {
        let cutoff = now.saturating_sub(IDLE_THRESHOLD_MS);
        let mut evicted = 0usize;
        self.windows.retain(|_, timestamps| {
            trim_before(timestamps, cutoff);
            if timestamps.is_empty() {
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Clear all tracked keys. Administrative and test use.
    pub fn reset(&self) {
        self.windows.clear();
    }

    /// Number of keys currently tracked.
    pub fn tracked_key_count(&self) -> usize {
        self.windows.len()
    }
}

/// Pop the expired prefix: everything strictly older than `cutoff` goes, a
/// timestamp equal to `cutoff` stays.
fn trim_before(timestamps: &mut VecDeque<u64>, cutoff: u64) {
    while timestamps.front().is_some_and(|&ts| ts < cutoff) {
        timestamps.pop_front();
    }
}
