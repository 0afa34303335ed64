//! Cached data-access layer for a staff & cash-register dashboard API.
//!
//! The crate wraps a JSON-envelope HTTP API with a TTL-bounded in-memory
//! cache and per-resource loaders:
//!
//! - [`api::ApiClient`] issues the GETs and unwraps the response envelope.
//! - [`cache::CacheStore`] holds `{ payload, fetched_at }` per cache key,
//!   judged stale lazily at read time.
//! - [`loader::DataLoader`] composes the two per resource: fresh hits skip
//!   the network, misses coalesce through an in-flight registry, and
//!   `refresh()` always fetches.
//! - [`preload::start_preload`] fires the whole dashboard's fetches
//!   concurrently and reports aggregate progress.

pub mod api;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod loader;
pub mod models;
pub mod preload;

pub use api::{ApiClient, ApiError};
pub use cache::{CacheEntry, CacheStore, Clock, SystemClock};
pub use config::Config;
pub use dashboard::Dashboard;
pub use loader::{DataLoader, FlightTable, LoaderState};
pub use preload::{start_preload, PreloadHandle, PreloadStatus};
