//! Identification oracle client
//!
//! The oracle answers one question: is this track commercially released?
//! It never participates in text matching. Verdicts are stored verbatim on
//! new entries as their external match payload.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("setlist-ingest/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Oracle client errors
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Oracle answer for one (artist, title)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleVerdict {
    pub released: bool,
    /// Full oracle response, stored opaque
    pub payload: serde_json::Value,
}

/// Release-status lookup
#[async_trait]
pub trait IdentificationOracle: Send + Sync {
    /// `Ok(None)` when the oracle does not know the track
    async fn identify(&self, artist: &str, title: &str) -> Result<Option<OracleVerdict>, OracleError>;
}

#[derive(Debug, Deserialize)]
struct IdentifyResponse {
    #[serde(default)]
    released: bool,
}

/// HTTP oracle: `GET {base_url}/identify?artist=..&title=..`
pub struct HttpOracle {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpOracle {
    pub fn new(base_url: impl Into<String>) -> Result<Self, OracleError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| OracleError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentificationOracle for HttpOracle {
    async fn identify(&self, artist: &str, title: &str) -> Result<Option<OracleVerdict>, OracleError> {
        let url = format!("{}/identify", self.base_url);
        tracing::debug!(artist = %artist, title = %title, url = %url, "Querying identification oracle");

        let response = self
            .http_client
            .get(&url)
            .query(&[("artist", artist), ("title", title)])
            .send()
            .await
            .map_err(|e| OracleError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OracleError::ApiError(status.as_u16(), error_text));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OracleError::ParseError(e.to_string()))?;
        let parsed: IdentifyResponse =
            serde_json::from_value(payload.clone()).map_err(|e| OracleError::ParseError(e.to_string()))?;

        Ok(Some(OracleVerdict {
            released: parsed.released,
            payload,
        }))
    }
}
