//! Backend HTTP client
//!
//! Thin reqwest wrapper over the backend's read-only dashboard endpoints.
//! Every response arrives in the uniform envelope; anything other than a
//! 2xx status with `code == 0` and a decodable payload is a `FetchError`.
//! Errors never escape as panics - the poller turns them into per-operation
//! outcomes.

use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use wellspring_common::config::DashConfig;
use wellspring_common::{Envelope, Error};

use crate::view::{DashboardStats, RecentItem, SourceHealth, TrendPoint};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Ways a single fetch operation can fail
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout, or any other transport error
    #[error("network error: {0}")]
    Network(String),

    /// Backend answered with a non-2xx HTTP status
    #[error("HTTP status {0}")]
    Status(u16),

    /// Backend answered 2xx but marked the envelope as failed (`code != 0`)
    #[error("backend error (code {code}): {message}")]
    Backend { code: i64, message: String },

    /// Body was not a decodable envelope, or a success envelope had no data
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Client for the backend's dashboard API
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: &DashConfig) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            http,
        })
    }

    /// GET a path and unwrap its envelope
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "fetching");

        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        envelope.into_result().map_err(|e| match e {
            Error::Backend { code, message } => FetchError::Backend { code, message },
            other => FetchError::Malformed(other.to_string()),
        })
    }

    /// `GET /api/dashboard/stats`
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, FetchError> {
        self.get_json("/api/dashboard/stats").await
    }

    /// `GET /api/dashboard/collection-trend?days=N`
    pub async fn collection_trend(&self, days: u32) -> Result<Vec<TrendPoint>, FetchError> {
        self.get_json(&format!("/api/dashboard/collection-trend?days={}", days))
            .await
    }

    /// `GET /api/dashboard/source-health`
    pub async fn source_health(&self) -> Result<Vec<SourceHealth>, FetchError> {
        self.get_json("/api/dashboard/source-health").await
    }

    /// `GET /api/dashboard/recent-content?limit=N`
    pub async fn recent_content(&self, limit: u32) -> Result<Vec<RecentItem>, FetchError> {
        self.get_json(&format!("/api/dashboard/recent-content?limit={}", limit))
            .await
    }
}
