//! External collaborators that turn chat input into Tracks
//!
//! **Contracts:**
//! - [`Resolver`]: URL → ordered list of tracks
//! - [`ThumbnailFetcher`]: thumbnail URL → encoded image + MIME type
//! - [`Searcher`]: free-text query → one canonical URL
//!
//! The engine only sees these traits; production implementations live in the
//! submodules and tests substitute scripted fakes.

pub mod search;
pub mod thumbnail;
pub mod youtube;

pub use search::YoutubeSearcher;
pub use thumbnail::HttpThumbnailFetcher;
pub use youtube::YtDlpResolver;

use crate::track::{Thumbnail, Track};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;
use thiserror::Error;
use url::Url;

/// Resolver failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Host or path is not something this resolver understands
    #[error("unsupported url: {0}")]
    Unsupported(String),

    /// The item exists but has no audio-only format
    #[error("no audio format found for {0}")]
    NoFormatFound(String),

    /// The source could not be queried or returned unusable data
    #[error("request failed: {0}")]
    RequestFailed(String),
}

/// Thumbnail fetch failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Empty thumbnail URL
    #[error("no URL found for thumbnail")]
    NoUrl,

    /// Non-2xx status or transport error
    #[error("could not download thumbnail: {0}")]
    DownloadFailed(String),
}

/// Search failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The query matched nothing
    #[error("the search result is empty")]
    EmptyResult,

    /// The search service could not be queried
    #[error("could not fetch search results: {0}")]
    RequestFailed(String),
}

/// URL → ordered track list (one entry for an item, N for a collection)
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, url: &Url) -> Result<Vec<Track>, ResolveError>;
}

/// Thumbnail URL → downloaded, encoded image
#[async_trait]
pub trait ThumbnailFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Thumbnail, FetchError>;
}

/// Free-text query → canonical item URL
///
/// Implementations carry their own API credentials.
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, query: &str) -> Result<String, SearchError>;
}

/// Run `f` over `items` with at most `concurrency` futures in flight.
///
/// Results come back in input order regardless of completion order. The
/// first error ends the run and drops every future still in flight.
pub async fn collect_in_order<I, T, E, F, Fut>(
    items: I,
    concurrency: usize,
    f: F,
) -> Result<Vec<T>, E>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    stream::iter(items)
        .map(f)
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_collect_in_order_preserves_input_order() {
        // Later items finish first
        let items = vec![5u64, 4, 3, 2, 1];
        let results: Result<Vec<u64>, ()> = collect_in_order(items, 5, |n| async move {
            tokio::time::sleep(Duration::from_millis(n * 10)).await;
            Ok(n)
        })
        .await;

        assert_eq!(results.unwrap(), vec![5, 4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_collect_in_order_stops_at_first_error() {
        let results: Result<Vec<u32>, String> = collect_in_order(0..10u32, 3, |n| async move {
            if n == 2 {
                Err(format!("item {} failed", n))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(results.unwrap_err(), "item 2 failed");
    }

    #[tokio::test]
    async fn test_collect_in_order_empty_input() {
        let results: Result<Vec<u32>, ()> =
            collect_in_order(Vec::<u32>::new(), 4, |n| async move { Ok(n) }).await;
        assert!(results.unwrap().is_empty());
    }
}
