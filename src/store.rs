//! Scores/annotations service client.
//!
//! [`AnnotationStore`] is the seam the session talks to; [`HttpAnnotationStore`]
//! implements it over the service's REST endpoints. A 404 on load means the
//! page has never been annotated and comes back as `Ok(None)`.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::PersistenceError;

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Wire shape of one page's stored annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub page_number: u32,
    /// A serialized scene document.
    pub annotations_json: String,
}

/// The remote store for score PDFs and per-page annotation documents.
#[async_trait::async_trait(?Send)]
pub trait AnnotationStore {
    async fn fetch_pdf(&self, score_id: &str) -> Result<Vec<u8>, PersistenceError>;

    async fn save(&self, score_id: &str, record: &AnnotationRecord) -> Result<(), PersistenceError>;

    /// `Ok(None)` when nothing has been stored for the page yet.
    async fn load(&self, score_id: &str, page: u32) -> Result<Option<AnnotationRecord>, PersistenceError>;
}

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpAnnotationStore {
    http: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpAnnotationStore {
    /// # Errors
    ///
    /// Returns [`PersistenceError::InvalidUrl`] if `base_url` is not an
    /// absolute http(s)-style URL, and [`PersistenceError::HttpClientBuild`]
    /// if the client cannot be constructed.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PersistenceError> {
        let base_url = reqwest::Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| PersistenceError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PersistenceError::InvalidUrl(base_url.to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PersistenceError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    /// # Errors
    ///
    /// See [`HttpAnnotationStore::new`].
    pub fn from_config(config: &EngineConfig) -> Result<Self, PersistenceError> {
        Self::new(&config.api_base_url, config.http_timeout)
    }

    fn annotations_url(&self, score_id: &str) -> Result<reqwest::Url, PersistenceError> {
        self.score_url(score_id, "annotations")
    }

    /// `{base}/api/scores/{score_id}/{resource}`, with the id escaped as a
    /// single path segment.
    fn score_url(&self, score_id: &str, resource: &str) -> Result<reqwest::Url, PersistenceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| PersistenceError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "scores", score_id, resource]);
        Ok(url)
    }
}

#[async_trait::async_trait(?Send)]
impl AnnotationStore for HttpAnnotationStore {
    async fn fetch_pdf(&self, score_id: &str) -> Result<Vec<u8>, PersistenceError> {
        let response = self
            .http
            .get(self.score_url(score_id, "pdf")?)
            .send()
            .await
            .map_err(|e| PersistenceError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Status { status, body });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PersistenceError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn save(&self, score_id: &str, record: &AnnotationRecord) -> Result<(), PersistenceError> {
        let response = self
            .http
            .post(self.annotations_url(score_id)?)
            .json(record)
            .send()
            .await
            .map_err(|e| PersistenceError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Status { status, body });
        }
        Ok(())
    }

    async fn load(&self, score_id: &str, page: u32) -> Result<Option<AnnotationRecord>, PersistenceError> {
        let response = self
            .http
            .get(self.annotations_url(score_id)?)
            .query(&[("page", page)])
            .send()
            .await
            .map_err(|e| PersistenceError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| PersistenceError::Transport(e.to_string()))?;

        match status {
            404 => Ok(None),
            200..=299 => parse_record(&text),
            _ => Err(PersistenceError::Status { status, body: text }),
        }
    }
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse a load response. An empty body or `null` means nothing is stored.
fn parse_record(text: &str) -> Result<Option<AnnotationRecord>, PersistenceError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text).map_err(|e| PersistenceError::Malformed(e.to_string()))
}
