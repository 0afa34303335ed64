//! Tillboard CLI - preload and display dashboard data from the terminal.
//!
//! Runs the full preload against the configured server, shows per-target
//! progress, then prints the dashboard summary from the warmed cache.

use std::io;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tillboard::models::ReportRange;
use tillboard::{start_preload, ApiClient, Config, Dashboard};

/// How often to print preload progress while waiting.
const PROGRESS_POLL_MS: u64 = 250;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = Config::load()?;
    info!(base_url = %config.base_url, "Tillboard starting");

    let mut client = ApiClient::with_timeout(&config.base_url, config.request_timeout())?;
    if let Some(ref token) = config.api_token {
        client = client.with_token(token.clone());
    }

    let dashboard = Dashboard::with_ttl(client, config.cache_ttl());

    let handle = start_preload(&dashboard);
    let mut last_reported = 0;
    while handle.is_preloading() {
        tokio::time::sleep(Duration::from_millis(PROGRESS_POLL_MS)).await;
        let status = handle.status();
        if status.completed != last_reported {
            eprintln!("Loading dashboard... {}/{}", status.completed, status.total);
            last_reported = status.completed;
        }
    }
    let status = handle.wait().await;

    for error in &status.errors {
        eprintln!("warning: {}", error);
    }
    if status.succeeded() == 0 {
        bail!("Could not reach {}: every fetch failed", config.base_url);
    }

    // Everything below is served from the cache the preload just warmed.
    println!("Revenue");
    for range in ReportRange::ALL {
        match dashboard.reporting(range).load().await {
            Ok(summary) => println!(
                "  {:<10} TTC {:>10.2}  HT {:>10.2}  ({} tickets)",
                range, summary.total_ttc, summary.total_ht, summary.ticket_count
            ),
            Err(_) => println!("  {:<10} unavailable", range),
        }
    }

    if let Ok(staff) = dashboard.staff().load().await {
        let active = staff.iter().filter(|s| s.active).count();
        println!("Staff: {} ({} active)", staff.len(), active);
    }
    if let Ok(shifts) = dashboard.shifts().load().await {
        println!("Shifts: {}", shifts.len());
    }
    if let Ok(entries) = dashboard.cash_entries().load().await {
        let unbalanced = entries.iter().filter(|e| !e.is_balanced()).count();
        println!("Cash entries: {} ({} unbalanced)", entries.len(), unbalanced);
    }

    info!("Tillboard done");
    Ok(())
}
