use std::marker::PhantomData;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::CacheStore;

use super::FlightTable;

/// A fetch operation for one cache key, returning the payload to cache or
/// a display-ready error string.
pub type FetchFn = Arc<dyn Fn() -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// Snapshot a display binding reads: cached/fetched data, whether a request
/// is in flight, and the last failure.
///
/// The snapshot keeps previously loaded data while a refresh is in flight
/// and across failures, so a widget can keep rendering stale numbers next
/// to an inline error.
#[derive(Debug, Clone)]
pub struct LoaderState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl<T> Default for LoaderState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct Snapshot {
    data: Option<Value>,
    is_loading: bool,
    error: Option<String>,
}

/// Cache-aware loader for a single dashboard resource.
///
/// `load()` serves fresh cache hits without touching the network; misses and
/// stale entries go through the flight table so concurrent callers coalesce
/// into one request. `refresh()` always fetches.
pub struct DataLoader<T> {
    key: String,
    ttl: Duration,
    store: Arc<CacheStore>,
    flights: Arc<FlightTable>,
    fetch: FetchFn,
    snapshot: Mutex<Snapshot>,
    _payload: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> DataLoader<T> {
    pub fn new(
        key: impl Into<String>,
        ttl: Duration,
        store: Arc<CacheStore>,
        flights: Arc<FlightTable>,
        fetch: FetchFn,
    ) -> Self {
        Self {
            key: key.into(),
            ttl,
            store,
            flights,
            fetch,
            snapshot: Mutex::new(Snapshot::default()),
            _payload: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn snapshot(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current `{ data, is_loading, error }` state.
    pub fn state(&self) -> LoaderState<T> {
        let snap = self.snapshot().clone();
        let (data, decode_error) = match snap.data {
            Some(value) => match serde_json::from_value::<T>(value) {
                Ok(data) => (Some(data), None),
                Err(e) => (None, Some(format!("Invalid cached payload: {}", e))),
            },
            None => (None, None),
        };
        LoaderState {
            data,
            is_loading: snap.is_loading,
            error: snap.error.or(decode_error),
        }
    }

    /// Load the resource, serving a fresh cache hit without a network call.
    ///
    /// On miss or staleness this joins (or starts) the flight for the key,
    /// writes the payload through to the cache, and updates the snapshot.
    pub async fn load(&self) -> Result<T, String> {
        if let Some(payload) = self.store.get_fresh(&self.key, self.ttl) {
            debug!(key = %self.key, "Cache hit");
            let mut snap = self.snapshot();
            snap.data = Some(payload.clone());
            snap.is_loading = false;
            snap.error = None;
            drop(snap);
            return decode(&self.key, payload);
        }

        debug!(key = %self.key, "Cache miss or stale, fetching");
        self.snapshot().is_loading = true;

        let store = Arc::clone(&self.store);
        let fetch = Arc::clone(&self.fetch);
        let key = self.key.clone();
        let result = self
            .flights
            .run(&self.key, async move {
                let ticket = store.issue(&key);
                let payload = fetch().await?;
                if !store.commit(&key, ticket, payload.clone()) {
                    // A later-issued refresh already landed; serve its data.
                    if let Some(entry) = store.get(&key) {
                        return Ok(entry.payload);
                    }
                }
                Ok(payload)
            })
            .await;

        self.apply(result)
    }

    /// Force a network request and cache overwrite regardless of freshness.
    ///
    /// Bypasses the flight table on purpose: an explicit refresh must issue
    /// its own request even when a TTL-triggered fetch is in flight.
    pub async fn refresh(&self) -> Result<T, String> {
        debug!(key = %self.key, "Forced refresh");
        self.snapshot().is_loading = true;

        let ticket = self.store.issue(&self.key);
        let result = match (self.fetch)().await {
            Ok(payload) => {
                self.store.commit(&self.key, ticket, payload.clone());
                Ok(payload)
            }
            Err(e) => Err(e),
        };

        self.apply(result)
    }

    /// Fold a fetch outcome into the snapshot. Errors keep prior data so the
    /// binding can show stale values alongside the failure.
    fn apply(&self, result: Result<Value, String>) -> Result<T, String> {
        match result {
            Ok(payload) => {
                let mut snap = self.snapshot();
                snap.data = Some(payload.clone());
                snap.is_loading = false;
                snap.error = None;
                drop(snap);
                decode(&self.key, payload)
            }
            Err(message) => {
                warn!(key = %self.key, error = %message, "Fetch failed");
                let mut snap = self.snapshot();
                snap.is_loading = false;
                snap.error = Some(message.clone());
                Err(message)
            }
        }
    }
}

fn decode<T: DeserializeOwned>(key: &str, payload: Value) -> Result<T, String> {
    serde_json::from_value(payload).map_err(|e| format!("Invalid payload for {}: {}", key, e))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, Utc};
    use serde_json::json;

    use crate::cache::store::test_clock::ManualClock;
    use crate::cache::Clock;

    use super::*;

    struct SharedClock(Arc<ManualClock>);

    impl Clock for SharedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0.now()
        }
    }

    struct Fixture {
        store: Arc<CacheStore>,
        flights: Arc<FlightTable>,
        clock: Arc<ManualClock>,
        calls: Arc<AtomicUsize>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(CacheStore::with_clock(Box::new(SharedClock(Arc::clone(
            &clock,
        )))));
        Fixture {
            store,
            flights: Arc::new(FlightTable::new()),
            clock,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn counting_fetch(calls: &Arc<AtomicUsize>, payload: Value) -> FetchFn {
        let calls = Arc::clone(calls);
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            let payload = payload.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(payload)
            })
        })
    }

    fn failing_fetch(calls: &Arc<AtomicUsize>, message: &str) -> FetchFn {
        let calls = Arc::clone(calls);
        let message = message.to_string();
        Arc::new(move || {
            let calls = Arc::clone(&calls);
            let message = message.clone();
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(message)
            })
        })
    }

    fn loader(fx: &Fixture, key: &str, ttl_ms: u64, fetch: FetchFn) -> DataLoader<Value> {
        DataLoader::new(
            key,
            Duration::from_millis(ttl_ms),
            Arc::clone(&fx.store),
            Arc::clone(&fx.flights),
            fetch,
        )
    }

    #[tokio::test]
    async fn second_load_within_ttl_hits_cache() {
        let fx = fixture();
        let fetch = counting_fetch(&fx.calls, json!({"TTC": 100.0, "HT": 80.0}));
        let loader = loader(&fx, "reporting:yesterday", 30_000, fetch);

        let first = loader.load().await.unwrap();
        assert_eq!(first, json!({"TTC": 100.0, "HT": 80.0}));
        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);

        fx.clock.advance_ms(10_000);
        let second = loader.load().await.unwrap();
        assert_eq!(second, json!({"TTC": 100.0, "HT": 80.0}));
        // No new request: served from cache.
        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_entry_triggers_refetch_and_overwrite() {
        let fx = fixture();
        let fetch = counting_fetch(&fx.calls, json!({"TTC": 100.0}));
        let loader = loader(&fx, "reporting:yesterday", 30_000, fetch);

        loader.load().await.unwrap();
        let first_fetched_at = fx.store.get("reporting:yesterday").unwrap().fetched_at;

        fx.clock.advance_ms(31_000);
        loader.load().await.unwrap();
        assert_eq!(fx.calls.load(Ordering::SeqCst), 2);

        let second_fetched_at = fx.store.get("reporting:yesterday").unwrap().fetched_at;
        assert!(second_fetched_at > first_fetched_at);
    }

    #[tokio::test]
    async fn refresh_bypasses_fresh_cache() {
        let fx = fixture();
        let fetch = counting_fetch(&fx.calls, json!([1, 2]));
        let loader = loader(&fx, "staff", 30_000, fetch);

        loader.load().await.unwrap();
        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);

        // Still fresh, but refresh must fetch anyway.
        loader.refresh().await.unwrap();
        assert_eq!(fx.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn refresh_overwrites_cache_payload() {
        let fx = fixture();
        let loader = loader(&fx, "staff", 30_000, counting_fetch(&fx.calls, json!("v2")));
        fx.store.set("staff", json!("v1"));

        loader.refresh().await.unwrap();
        assert_eq!(fx.store.get("staff").unwrap().payload, json!("v2"));
    }

    #[tokio::test]
    async fn failure_surfaces_error_and_leaves_cache_untouched() {
        let fx = fixture();
        let loader: DataLoader<Value> =
            loader(&fx, "cash", 30_000, failing_fetch(&fx.calls, "Server error: boom"));
        fx.store.set("cash", json!("cached"));
        fx.clock.advance_ms(31_000); // stale, so load() must fetch

        let err = loader.load().await.unwrap_err();
        assert_eq!(err, "Server error: boom");

        // Cache still holds the old payload.
        assert_eq!(fx.store.get("cash").unwrap().payload, json!("cached"));

        let state = loader.state();
        assert!(!state.is_loading);
        assert_eq!(state.error.as_deref(), Some("Server error: boom"));
        // Prior data is not in this loader's snapshot (it never loaded it),
        // but a subsequent load serves the stale-cache refetch normally.
        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_automatic_retry_after_failure() {
        let fx = fixture();
        let loader: DataLoader<Value> =
            loader(&fx, "cash", 30_000, failing_fetch(&fx.calls, "down"));

        assert!(loader.load().await.is_err());
        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);

        // Recovery is manual: each explicit call issues exactly one request.
        assert!(loader.refresh().await.is_err());
        assert_eq!(fx.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn state_reflects_loaded_data() {
        let fx = fixture();
        let fetch = counting_fetch(&fx.calls, json!({"TTC": 42.0}));
        let loader = loader(&fx, "reporting:today", 30_000, fetch);

        let idle = loader.state();
        assert!(idle.data.is_none());
        assert!(!idle.is_loading);
        assert!(idle.error.is_none());

        loader.load().await.unwrap();
        let ready = loader.state();
        assert_eq!(ready.data, Some(json!({"TTC": 42.0})));
        assert!(!ready.is_loading);
        assert!(ready.error.is_none());
    }

    #[tokio::test]
    async fn concurrent_misses_coalesce_into_one_request() {
        let fx = fixture();
        let calls = Arc::clone(&fx.calls);
        let slow_fetch: FetchFn = Arc::new(move || {
            let calls = Arc::clone(&calls);
            Box::pin(async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(40)).await;
                Ok(json!({"HT": 80.0}))
            })
        });

        // Two loader instances for the same key, as two widgets would hold.
        let a = loader(&fx, "reporting:week", 30_000, Arc::clone(&slow_fetch));
        let b = loader(&fx, "reporting:week", 30_000, slow_fetch);

        let (ra, rb) = tokio::join!(a.load(), b.load());
        assert_eq!(ra.unwrap(), json!({"HT": 80.0}));
        assert_eq!(rb.unwrap(), json!({"HT": 80.0}));
        assert_eq!(fx.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_load_does_not_clobber_later_refresh() {
        let fx = fixture();

        // First request is slow, second (the refresh) is fast.
        let calls = Arc::clone(&fx.calls);
        let fetch: FetchFn = Arc::new(move || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if n == 0 {
                    tokio::time::sleep(Duration::from_millis(80)).await;
                    Ok(json!("slow-old"))
                } else {
                    Ok(json!("fast-new"))
                }
            })
        });
        let loader = loader(&fx, "reporting:month", 30_000, fetch);

        let slow = loader.load();
        let fast = async {
            // Let the slow load issue its ticket first.
            tokio::time::sleep(Duration::from_millis(10)).await;
            loader.refresh().await
        };
        let (_, refreshed) = tokio::join!(slow, fast);

        assert_eq!(refreshed.unwrap(), json!("fast-new"));
        // The earlier-issued slow response must not overwrite the refresh.
        assert_eq!(
            fx.store.get("reporting:month").unwrap().payload,
            json!("fast-new")
        );
    }
}
