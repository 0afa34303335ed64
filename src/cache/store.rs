use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use tracing::debug;

/// Source of wall-clock time for freshness checks.
///
/// Production code uses [`SystemClock`]; tests inject a manual clock to pin
/// `fetched_at` and the staleness boundary.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// One cached payload with the wall-clock time it was fetched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub payload: Value,
    pub fetched_at: DateTime<Utc>,
}

/// Per-key bookkeeping: the entry itself plus issue/apply counters for
/// write ordering.
#[derive(Debug, Default)]
struct KeySlot {
    entry: Option<CacheEntry>,
    issued: u64,
    applied: u64,
}

/// Process-wide TTL-bounded cache, keyed by resource name or range id.
///
/// The lock is only held for map operations, never across an await point.
/// Growth is unbounded in principle but bounded in practice by the fixed
/// set of dashboard keys.
pub struct CacheStore {
    slots: Mutex<HashMap<String, KeySlot>>,
    clock: Box<dyn Clock>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, KeySlot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current wall-clock time as seen by this store.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Look up an entry. Staleness is the caller's judgment via
    /// [`CacheStore::is_fresh`]; expired entries are not removed here.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.lock().get(key).and_then(|slot| slot.entry.clone())
    }

    pub fn has(&self, key: &str) -> bool {
        self.lock()
            .get(key)
            .map(|slot| slot.entry.is_some())
            .unwrap_or(false)
    }

    /// Store a payload under `key` with the current timestamp, overwriting
    /// any prior entry.
    pub fn set(&self, key: &str, payload: Value) {
        let ticket = self.issue(key);
        self.commit(key, ticket, payload);
    }

    /// Take a write ticket for `key` at request-issue time.
    ///
    /// Tickets order cache writes by when their request was *issued*, not
    /// when its response arrived, so a slow early response cannot clobber
    /// the result of a later forced refresh.
    pub fn issue(&self, key: &str) -> u64 {
        let mut slots = self.lock();
        let slot = slots.entry(key.to_string()).or_default();
        slot.issued += 1;
        slot.issued
    }

    /// Apply a fetched payload under the given ticket. Returns false (and
    /// leaves the cache untouched) when a later-issued request has already
    /// committed.
    pub fn commit(&self, key: &str, ticket: u64, payload: Value) -> bool {
        let now = self.clock.now();
        let mut slots = self.lock();
        let slot = slots.entry(key.to_string()).or_default();
        if ticket <= slot.applied {
            debug!(key, ticket, applied = slot.applied, "Discarding out-of-order cache write");
            return false;
        }
        slot.applied = ticket;
        slot.entry = Some(CacheEntry {
            payload,
            fetched_at: now,
        });
        true
    }

    /// Freshness gate: fresh iff `now - fetched_at < ttl`. Exactly `ttl`
    /// elapsed counts as stale.
    pub fn is_fresh(&self, entry: &CacheEntry, ttl: Duration) -> bool {
        let age = self.clock.now() - entry.fetched_at;
        let ttl = TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX);
        age < ttl
    }

    /// Convenience: the payload for `key` if present and fresh.
    pub fn get_fresh(&self, key: &str, ttl: Duration) -> Option<Value> {
        let entry = self.get(key)?;
        if self.is_fresh(&entry, ttl) {
            Some(entry.payload)
        } else {
            None
        }
    }

    pub fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}
