//! In-memory caching module for dashboard data.
//!
//! This module provides the `CacheStore`, a process-wide map from cache key
//! to `{ payload, fetched_at }`. Entries are overwritten on each successful
//! fetch and judged stale lazily at read time against a fixed TTL; there is
//! no background sweep.
//!
//! The store is an explicit service shared by `Arc` rather than a module
//! singleton, and takes its notion of time from a pluggable [`Clock`] so
//! tests can drive freshness deterministically.

pub mod store;

pub use store::{CacheEntry, CacheStore, Clock, SystemClock};
