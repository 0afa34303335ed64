//! Eager preloading of the dashboard's data set.
//!
//! `start_preload` fires every dashboard fetch concurrently as independent
//! Tokio tasks - one failure never cancels its siblings - and tracks
//! aggregate progress in a shared [`PreloadStatus`]. Because the tasks go
//! through the same loaders the widgets use, everything they fetch lands in
//! the shared cache and later screen loads are hits.
//!
//! Dropping (or cancelling) the handle aborts outstanding tasks instead of
//! leaking in-flight requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::dashboard::Dashboard;
use crate::loader::DataLoader;
use crate::models::ReportRange;

/// Aggregate progress of one preload run.
#[derive(Debug, Clone, Default)]
pub struct PreloadStatus {
    /// Per-target success flag, filled in as each fetch settles.
    pub per_api: HashMap<String, bool>,
    /// Number of targets that have settled, success or failure.
    pub completed: usize,
    pub total: usize,
    /// Error messages from failed targets, in settle order.
    pub errors: Vec<String>,
}

impl PreloadStatus {
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }

    pub fn succeeded(&self) -> usize {
        self.per_api.values().filter(|&&ok| ok).count()
    }
}

/// Handle to a running preload.
pub struct PreloadHandle {
    status: Arc<Mutex<PreloadStatus>>,
    tasks: Vec<JoinHandle<()>>,
}

impl PreloadHandle {
    /// Snapshot of the current progress.
    pub fn status(&self) -> PreloadStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_preloading(&self) -> bool {
        !self.status().is_complete()
    }

    /// Wait for every target to settle and return the final status.
    pub async fn wait(mut self) -> PreloadStatus {
        let tasks = std::mem::take(&mut self.tasks);
        futures::future::join_all(tasks).await;
        self.status()
    }

    /// Abort outstanding fetch tasks.
    pub fn cancel(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for PreloadHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Fire all dashboard fetches concurrently and return a progress handle.
pub fn start_preload(dashboard: &Dashboard) -> PreloadHandle {
    let status = Arc::new(Mutex::new(PreloadStatus::default()));
    let mut tasks = Vec::new();

    for range in ReportRange::ALL {
        let loader = dashboard.reporting(range);
        tasks.push(spawn_target(loader, &status));
    }
    tasks.push(spawn_target(dashboard.staff(), &status));
    tasks.push(spawn_target(dashboard.shifts(), &status));
    tasks.push(spawn_target(dashboard.cash_entries(), &status));

    {
        let mut st = status.lock().unwrap_or_else(PoisonError::into_inner);
        st.total = tasks.len();
    }
    info!(targets = tasks.len(), "Preload started");

    PreloadHandle { status, tasks }
}

fn spawn_target<T>(loader: DataLoader<T>, status: &Arc<Mutex<PreloadStatus>>) -> JoinHandle<()>
where
    T: DeserializeOwned + Send + 'static,
{
    let status = Arc::clone(status);
    tokio::spawn(async move {
        let name = loader.key().to_string();
        let result = loader.load().await;

        let mut st = status.lock().unwrap_or_else(PoisonError::into_inner);
        st.completed += 1;
        match result {
            Ok(_) => {
                debug!(target = %name, completed = st.completed, "Preload target done");
                st.per_api.insert(name, true);
            }
            Err(e) => {
                debug!(target = %name, error = %e, "Preload target failed");
                st.errors.push(format!("{}: {}", name, e));
                st.per_api.insert(name, false);
            }
        }
    })
}
