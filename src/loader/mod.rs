//! Per-resource data loaders.
//!
//! A [`DataLoader`] composes the cache store and the HTTP client for one
//! cache key: check the cache, fetch on miss or staleness, write through on
//! success, and expose a `{ data, is_loading, error }` snapshot for display
//! bindings. `refresh()` bypasses the cache entirely.
//!
//! Simultaneous cache misses on the same key are coalesced through a
//! [`FlightTable`] so only one request goes to the network.

pub mod data;
pub mod flight;

pub use data::{DataLoader, FetchFn, LoaderState};
pub use flight::FlightTable;
