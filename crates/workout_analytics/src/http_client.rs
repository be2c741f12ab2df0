//! HTTP client for the upstream workout service.
//!
//! This module provides a reqwest-based implementation of the [`RowSource`](crate::RowSource) trait.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use crate::retry::RetryPolicy;
use crate::{AnalyticsError, RawRow, RowSource};

const BODY_SNIPPET_CHARS: usize = 256;

#[derive(Deserialize)]
struct RowsPayload {
    #[serde(default)]
    rows: Vec<RawRow>,
}

/// Fetches flattened set rows from `{base_url}/analytics/workouts`.
#[derive(Clone, Debug)]
pub struct ReqwestRowSource {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ReqwestRowSource {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the workout service (e.g., "http://core-api:3000")
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AnalyticsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_once(&self, url: &str, from: &str, to: &str) -> Result<Vec<RawRow>, AnalyticsError> {
        let resp = self
            .client
            .get(url)
            .query(&[("from", from), ("to", to)])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(error_from_response(resp).await);
        }
        let payload: RowsPayload = resp.json().await?;
        Ok(payload.rows)
    }
}

/// Extract error information from a failed response.
async fn error_from_response(resp: reqwest::Response) -> AnalyticsError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    AnalyticsError::Upstream {
        status,
        body: body.chars().take(BODY_SNIPPET_CHARS).collect(),
    }
}

// Only transport failures are worth another attempt; an answer from the
// service, even an error status, is final.
fn is_transient(err: &AnalyticsError) -> bool {
    match err {
        AnalyticsError::Http(e) => e.is_connect() || e.is_timeout(),
        _ => false,
    }
}

#[async_trait]
impl RowSource for ReqwestRowSource {
    async fn fetch_rows(&self, from: &str, to: &str) -> Result<Vec<RawRow>, AnalyticsError> {
        let url = format!("{}/analytics/workouts", self.base_url);
        let start = Instant::now();
        let result = self
            .retry
            .retry_async(|| self.fetch_once(&url, from, to), is_transient)
            .await;
        let elapsed = start.elapsed();
        metrics::histogram!("workout_analytics_upstream_duration_seconds")
            .record(elapsed.as_secs_f64());
        match &result {
            Ok(rows) => tracing::debug!(from, to, rows = rows.len(), ?elapsed, "fetched rows"),
            Err(e) => tracing::warn!(from, to, error = %e, ?elapsed, "row fetch failed"),
        }
        result
    }
}
