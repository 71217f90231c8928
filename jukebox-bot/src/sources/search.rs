//! YouTube Data API search
//!
//! Returns the watch URL of the first video matching a query.
//!
//! # API Reference
//! - Endpoint: https://www.googleapis.com/youtube/v3/search
//! - Parameters: `part=id`, `type=video`, `q`, `key`

use super::youtube::watch_url;
use super::{SearchError, Searcher};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// YouTube Data API search endpoint
const SEARCH_API_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// Default timeout for search requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
}

#[derive(Debug, Deserialize)]
struct ItemId {
    #[serde(rename = "videoId", default)]
    video_id: Option<String>,
}

/// Searcher backed by the YouTube Data API v3
pub struct YoutubeSearcher {
    http_client: Client,
    api_key: String,
    endpoint: String,
}

impl YoutubeSearcher {
    pub fn new(api_key: impl Into<String>) -> Result<Self, SearchError> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SearchError::RequestFailed(format!("HTTP client setup: {}", e)))?;
        Ok(Self {
            http_client,
            api_key: api_key.into(),
            endpoint: SEARCH_API_URL.to_string(),
        })
    }

    /// Point the searcher at a different endpoint (used by tests)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Build the request URL for a query
    pub fn request_url(&self, query: &str) -> Result<Url, SearchError> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("part", "id"),
                ("q", query),
                ("key", self.api_key.as_str()),
                ("type", "video"),
            ],
        )
        .map_err(|e| SearchError::RequestFailed(format!("bad search endpoint: {}", e)))
    }
}

/// Extract the first video id from a search response body
fn first_video_id(body: &[u8]) -> Result<String, SearchError> {
    let response: SearchResponse = serde_json::from_slice(body)
        .map_err(|e| SearchError::RequestFailed(format!("invalid search response: {}", e)))?;

    response
        .items
        .into_iter()
        .find_map(|item| item.id.video_id)
        .ok_or(SearchError::EmptyResult)
}

#[async_trait]
impl Searcher for YoutubeSearcher {
    async fn search(&self, query: &str) -> Result<String, SearchError> {
        let request_url = self.request_url(query)?;
        debug!(query = query, "Searching YouTube");

        let response = self
            .http_client
            .get(request_url)
            .send()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SearchError::RequestFailed(format!(
                "search API returned {}",
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SearchError::RequestFailed(e.to_string()))?;

        Ok(watch_url(&first_video_id(&body)?))
    }
}
