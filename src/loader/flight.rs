use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

/// Outcome of one coalesced fetch, broadcast to every waiter.
pub type FlightResult = Result<Value, String>;

/// Per-key in-flight request registry.
///
/// The first caller for a key becomes the leader and runs the fetch; callers
/// arriving while the flight is open subscribe and receive the leader's
/// result without issuing their own request.
pub struct FlightTable {
    flights: Mutex<HashMap<String, broadcast::Sender<FlightResult>>>,
}

impl FlightTable {
    pub fn new() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<FlightResult>>> {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `fetch` for `key`, or join the flight already running for it.
    pub async fn run<F>(&self, key: &str, fetch: F) -> FlightResult
    where
        F: Future<Output = FlightResult>,
    {
        let waiter = {
            let mut flights = self.lock();
            match flights.get(key) {
                Some(tx) => Some(tx.subscribe()),
                None => {
                    let (tx, _) = broadcast::channel(1);
                    flights.insert(key.to_string(), tx);
                    None
                }
            }
        };

        if let Some(mut rx) = waiter {
            debug!(key, "Joining in-flight request");
            return match rx.recv().await {
                Ok(result) => result,
                // Leader dropped without broadcasting (task aborted).
                Err(_) => Err("request aborted before completing".to_string()),
            };
        }

        // Leader path. The guard closes the flight even if we are cancelled
        // mid-fetch, so waiters get an error instead of hanging.
        let guard = FlightGuard { table: self, key };
        let result = fetch.await;
        guard.finish(result.clone());
        result
    }
}

impl Default for FlightTable {
    fn default() -> Self {
        Self::new()
    }
}

struct FlightGuard<'a> {
    table: &'a FlightTable,
    key: &'a str,
}

impl FlightGuard<'_> {
    fn finish(self, result: FlightResult) {
        if let Some(tx) = self.table.lock().remove(self.key) {
            // Send fails only when no waiters subscribed.
            let _ = tx.send(result);
        }
        std::mem::forget(self);
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // Leader future dropped before finishing: close the flight so the
        // key is not stuck and waiters see the sender go away.
        self.table.lock().remove(self.key);
    }
}
