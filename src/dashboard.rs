//! Dashboard facade wiring the client, cache, and loaders together.
//!
//! One `Dashboard` owns the shared cache store and flight table; every
//! loader it hands out reads and writes the same cache, so two widgets
//! bound to the same key share entries and coalesce their requests.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::api::ApiClient;
use crate::cache::CacheStore;
use crate::config::DEFAULT_CACHE_TTL_SECS;
use crate::loader::{DataLoader, FetchFn, FlightTable};
use crate::models::{CashEntry, ReportRange, ReportSummary, Shift, StaffMember};

pub struct Dashboard {
    client: ApiClient,
    store: Arc<CacheStore>,
    flights: Arc<FlightTable>,
    ttl: Duration,
}

impl Dashboard {
    pub fn new(client: ApiClient) -> Self {
        Self::with_ttl(client, Duration::from_secs(DEFAULT_CACHE_TTL_SECS))
    }

    pub fn with_ttl(client: ApiClient, ttl: Duration) -> Self {
        Self::with_store(client, Arc::new(CacheStore::new()), ttl)
    }

    /// Build on an existing store, e.g. one with an injected clock.
    pub fn with_store(client: ApiClient, store: Arc<CacheStore>, ttl: Duration) -> Self {
        Self {
            client,
            store,
            flights: Arc::new(FlightTable::new()),
            ttl,
        }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn loader<T: serde::de::DeserializeOwned>(&self, key: String, fetch: FetchFn) -> DataLoader<T> {
        DataLoader::new(
            key,
            self.ttl,
            Arc::clone(&self.store),
            Arc::clone(&self.flights),
            fetch,
        )
    }

    /// Loader for the revenue summary of one date range.
    pub fn reporting(&self, range: ReportRange) -> DataLoader<ReportSummary> {
        let client = self.client.clone();
        let fetch: FetchFn = Arc::new(move || {
            let client = client.clone();
            async move {
                client
                    .fetch_reporting_raw(range)
                    .await
                    .map_err(|e| e.to_string())
            }
            .boxed()
        });
        self.loader(format!("reporting:{}", range), fetch)
    }

    /// Loader for the employee list.
    pub fn staff(&self) -> DataLoader<Vec<StaffMember>> {
        let client = self.client.clone();
        let fetch: FetchFn = Arc::new(move || {
            let client = client.clone();
            async move { client.fetch_staff_raw().await.map_err(|e| e.to_string()) }.boxed()
        });
        self.loader("staff".to_string(), fetch)
    }

    /// Loader for shift/time-tracking entries.
    pub fn shifts(&self) -> DataLoader<Vec<Shift>> {
        let client = self.client.clone();
        let fetch: FetchFn = Arc::new(move || {
            let client = client.clone();
            async move { client.fetch_shifts_raw().await.map_err(|e| e.to_string()) }.boxed()
        });
        self.loader("shifts".to_string(), fetch)
    }

    /// Loader for cash-register reconciliation entries.
    pub fn cash_entries(&self) -> DataLoader<Vec<CashEntry>> {
        let client = self.client.clone();
        let fetch: FetchFn = Arc::new(move || {
            let client = client.clone();
            async move {
                client
                    .fetch_cash_entries_raw()
                    .await
                    .map_err(|e| e.to_string())
            }
            .boxed()
        });
        self.loader("cash-entries".to_string(), fetch)
    }
}
