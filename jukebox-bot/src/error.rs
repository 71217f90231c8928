//! Error types for jukebox-bot
//!
//! One enum covers every failure a chat user can be told about. The command
//! router maps the well-known variants to friendly text and falls back to the
//! `Display` output for the rest.

use crate::sources::{FetchError, ResolveError, SearchError};
use thiserror::Error;

/// Main error type for jukebox-bot
#[derive(Error, Debug)]
pub enum Error {
    /// Start requested while the playback loop is running
    #[error("the playlist is already playing")]
    AlreadyPlaying,

    /// Stop requested while idle
    #[error("the playlist is already stopped")]
    AlreadyStopped,

    /// Operation needs at least one queued track
    #[error("empty playlist")]
    EmptyQueue,

    /// Volume percentage outside 0-100
    #[error("the volume level {0} is outside 0-100")]
    VolumeOutOfRange(i64),

    /// Resolver found no audio-only format for the item
    #[error("no audio format found for {0}")]
    NoFormatFound(String),

    /// Resolver rejected the URL or could not reach the source
    #[error("could not resolve track: {0}")]
    ResolveFailed(ResolveError),

    /// A thumbnail in the batch could not be fetched
    #[error("could not get thumbnail: {0}")]
    ThumbnailFailed(#[from] FetchError),

    /// Search returned no hits
    #[error("the search result is empty")]
    SearchEmptyResult,

    /// Search request failed or returned garbage
    #[error("could not fetch search results: {0}")]
    SearchRequestFailed(String),

    /// A search hit resolved to something other than one track
    #[error("search hit resolved to {0} tracks, expected exactly one")]
    IncorrectResult(usize),

    /// Search is disabled because no API key is configured
    #[error("cannot search without an API key")]
    SearchNotConfigured,

    /// Chat command is missing its argument
    #[error("too few arguments in command")]
    TooFewArguments,

    /// Chat command text contains no http(s) URL
    #[error("no url source found")]
    NoUrlFound,

    /// Chat command argument could not be parsed
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Audio sink or playable handle failure
    #[error("Audio output error: {0}")]
    Audio(String),

    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File or process I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors bubbled up from jukebox-common
    #[error(transparent)]
    Common(#[from] jukebox_common::Error),
}

impl From<ResolveError> for Error {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoFormatFound(item) => Error::NoFormatFound(item),
            other => Error::ResolveFailed(other),
        }
    }
}

impl From<SearchError> for Error {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::EmptyResult => Error::SearchEmptyResult,
            SearchError::RequestFailed(reason) => Error::SearchRequestFailed(reason),
        }
    }
}

/// Convenience Result type using jukebox-bot Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_format_found_keeps_its_own_kind() {
        let err: Error = ResolveError::NoFormatFound("abc".to_string()).into();
        assert!(matches!(err, Error::NoFormatFound(item) if item == "abc"));
    }

    #[test]
    fn test_other_resolve_errors_become_resolve_failed() {
        let err: Error = ResolveError::Unsupported("https://example.com".to_string()).into();
        assert!(matches!(err, Error::ResolveFailed(ResolveError::Unsupported(_))));

        let err: Error = ResolveError::RequestFailed("timeout".to_string()).into();
        assert!(matches!(err, Error::ResolveFailed(ResolveError::RequestFailed(_))));
    }

    #[test]
    fn test_search_errors_map_to_search_kinds() {
        assert!(matches!(Error::from(SearchError::EmptyResult), Error::SearchEmptyResult));
        assert!(matches!(
            Error::from(SearchError::RequestFailed("503".to_string())),
            Error::SearchRequestFailed(_)
        ));
    }

    #[test]
    fn test_fetch_errors_become_thumbnail_failed() {
        let err: Error = FetchError::NoUrl.into();
        assert!(matches!(err, Error::ThumbnailFailed(FetchError::NoUrl)));
    }
}
