//! Thumbnail fetcher over HTTP
//!
//! Downloads the image, keeps the reported content type and base64-encodes
//! the body so it can be inlined into chat HTML.

use super::{FetchError, ThumbnailFetcher};
use crate::track::Thumbnail;
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

/// Default timeout for thumbnail requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Content type assumed when the host does not send one
const FALLBACK_MIME_TYPE: &str = "image/jpeg";

/// Fetches thumbnails with a shared reqwest client
#[derive(Clone)]
pub struct HttpThumbnailFetcher {
    http_client: Client,
}

impl HttpThumbnailFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| FetchError::DownloadFailed(format!("HTTP client setup: {}", e)))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ThumbnailFetcher for HttpThumbnailFetcher {
    async fn fetch(&self, url: &str) -> Result<Thumbnail, FetchError> {
        if url.is_empty() {
            return Err(FetchError::NoUrl);
        }

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::DownloadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::DownloadFailed(format!("{} returned {}", url, status)));
        }

        let mime_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(FALLBACK_MIME_TYPE)
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::DownloadFailed(e.to_string()))?;

        debug!(url = url, bytes = body.len(), mime_type = %mime_type, "Thumbnail downloaded");

        Ok(Thumbnail {
            source_url: url.to_string(),
            mime_type,
            encoded: base64::engine::general_purpose::STANDARD.encode(&body),
        })
    }
}
