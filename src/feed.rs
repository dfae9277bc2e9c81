//! Client for the external telemetry gateway (ThingSpeak-style channel feed).
//!
//! One call issues one request. There is no retry here: a failed fetch fails
//! the whole cycle and the caller decides whether to try again later.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PipelineError;

// ---

/// Raw gateway response: channel metadata plus a time-ordered list of data
/// points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeedPayload {
    #[serde(default)]
    pub channel: Option<serde_json::Value>,
    #[serde(default)]
    pub feeds: Vec<FeedEntry>,
}

/// One data point. Sensor channels arrive as `field1`..`field8`, usually as
/// string-encoded numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entry_id: Option<i64>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl RawFeedPayload {
    /// Most recent data point.
    pub fn latest(&self) -> Option<&FeedEntry> {
        self.feeds.last()
    }
}

/// Outbound, read-only client for the gateway.
#[derive(Debug, Clone)]
pub struct FeedClient {
    // ---
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
    results: u32,
}

impl FeedClient {
    /// Build a client whose requests time out after `timeout`.
    pub fn new(
        url: impl Into<String>,
        api_key: Option<String>,
        results: u32,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        // ---
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::GatewayUnavailable(e.to_string()))?;

        Ok(Self {
            http,
            url: url.into(),
            api_key,
            results: results.max(1),
        })
    }

    /// Fetch the latest feed.
    ///
    /// Fails with `GatewayUnavailable` on connect errors, timeouts and
    /// non-success statuses, and with `GatewayMalformed` when the body is not
    /// a feed or carries no data point.
    pub async fn fetch_latest_feed(&self) -> Result<RawFeedPayload, PipelineError> {
        // ---
        let mut query: Vec<(&str, String)> = vec![("results", self.results.to_string())];
        if let Some(key) = &self.api_key {
            query.push(("api_key", key.clone()));
        }

        debug!("Fetching feed from: {}", self.url);

        let response = self.http.get(&self.url).query(&query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::GatewayUnavailable(format!(
                "gateway responded with {status}"
            )));
        }

        let body = response.text().await?;
        let payload = parse_payload(&body)?;

        debug!("Feed returned {} data point(s)", payload.feeds.len());
        Ok(payload)
    }
}

/// Parse a gateway body, enforcing the minimum of one data point.
pub fn parse_payload(body: &str) -> Result<RawFeedPayload, PipelineError> {
    // ---
    // ThingSpeak answers a bad read key with a bare `-1`.
    if body.trim() == "-1" {
        return Err(PipelineError::GatewayMalformed(
            "gateway rejected the request (-1)".into(),
        ));
    }

    let payload: RawFeedPayload = serde_json::from_str(body)
        .map_err(|e| PipelineError::GatewayMalformed(format!("not a feed payload: {e}")))?;

    if payload.feeds.is_empty() {
        return Err(PipelineError::GatewayMalformed(
            "payload contains no data points".into(),
        ));
    }

    Ok(payload)
}
