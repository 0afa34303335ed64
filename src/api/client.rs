//! API client for the staff & cash-register dashboard backend.
//!
//! All data endpoints are plain GETs returning a JSON envelope. The raw
//! `fetch_*_raw` methods return the envelope's `data` field as untyped JSON
//! (this is what the cache stores); the typed variants deserialize into the
//! domain models.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::models::{CashEntry, ReportRange, ReportSummary, Shift, StaffMember};

use super::ApiError;

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Response envelope used by every dashboard endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// API client for the dashboard backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<Arc<String>>,
}

impl ApiClient {
    /// Create a new API client with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Create a new API client with an explicit request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Create a new ApiClient with the given bearer token, sharing the
    /// connection pool.
    pub fn with_token(&self, token: impl Into<String>) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: Some(Arc::new(token.into())),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidResponse(format!("Invalid token: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// GET `path` and unwrap the response envelope into its `data` field.
    async fn get_data(&self, path: &str) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ApiError::from_status(status, &body));
        }

        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|e| ApiError::InvalidResponse(format!("{} from {}", e, path)))?;

        if !envelope.success {
            let message = envelope
                .error
                .unwrap_or_else(|| "unknown server error".to_string());
            return Err(ApiError::Api(message));
        }

        debug!(path, "API response received");
        envelope
            .data
            .ok_or_else(|| ApiError::InvalidResponse(format!("missing data field from {}", path)))
    }

    // ===== Raw (untyped) fetches - these feed the cache =====

    /// Fetch the revenue summary for a date range as untyped JSON.
    pub async fn fetch_reporting_raw(&self, range: ReportRange) -> Result<Value, ApiError> {
        self.get_data(&format!("/api/reporting?range={}", range.as_str()))
            .await
    }

    /// Fetch the staff list as untyped JSON.
    pub async fn fetch_staff_raw(&self) -> Result<Value, ApiError> {
        self.get_data("/api/staff").await
    }

    /// Fetch shift entries as untyped JSON.
    pub async fn fetch_shifts_raw(&self) -> Result<Value, ApiError> {
        self.get_data("/api/shift/list").await
    }

    /// Fetch cash-register entries as untyped JSON.
    pub async fn fetch_cash_entries_raw(&self) -> Result<Value, ApiError> {
        self.get_data("/api/cash-entry").await
    }

    // ===== Typed fetches =====

    /// Fetch the revenue summary for a date range.
    pub async fn fetch_reporting(&self, range: ReportRange) -> Result<ReportSummary, ApiError> {
        let value = self.fetch_reporting_raw(range).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("reporting payload: {}", e)))
    }

    /// Fetch all employee records.
    pub async fn fetch_staff(&self) -> Result<Vec<StaffMember>, ApiError> {
        let value = self.fetch_staff_raw().await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("staff payload: {}", e)))
    }

    /// Fetch all shift/time-tracking entries.
    pub async fn fetch_shifts(&self) -> Result<Vec<Shift>, ApiError> {
        let value = self.fetch_shifts_raw().await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("shift payload: {}", e)))
    }

    /// Fetch all cash-register reconciliation entries.
    pub async fn fetch_cash_entries(&self) -> Result<Vec<CashEntry>, ApiError> {
        let value = self.fetch_cash_entries_raw().await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("cash-entry payload: {}", e)))
    }
}
