//! Chat command router
//!
//! Turns `<prefix><command> [args]` chat text into engine calls and renders
//! the outcome, success or error, as chat HTML.
//!
//! | Command | Engine call |
//! |---------|-------------|
//! | `start` | [`PlaybackEngine::start`] |
//! | `stop` | [`PlaybackEngine::stop`] |
//! | `add <url>` | [`PlaybackEngine::add_to_queue`] |
//! | `search <query>` | [`PlaybackEngine::search_and_add`] |
//! | `skip` | [`PlaybackEngine::skip`] |
//! | `clear` | [`PlaybackEngine::clear_queue`] |
//! | `vol [n]` | [`PlaybackEngine::get_volume`] / [`PlaybackEngine::set_volume`] |
//! | `now` | [`PlaybackEngine::current_track_info`] |
//! | `help` | usage text |

use crate::error::{Error, Result};
use crate::playback::PlaybackEngine;
use crate::sources::{FetchError, ResolveError};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};
use url::Url;

const HELP_MESSAGE: &str = "<h2>Usage</h2><br>\
<b>{p}start</b>: Starts the playlist.<br>\
<b>{p}stop</b>: Stops the playlist.<br>\
<b>{p}add $URL</b>: Add the youtube URL to the playlist.<br>\
<b>{p}search $QUERY</b>: Searches and adds the song to the playlist.<br>\
<b>{p}skip</b>: Skips a track from the playlist.<br>\
<b>{p}clear</b>: Clears the playlist.<br>\
<b>{p}vol $NUM</b>: Sets the volume to the specified number. The number must be between 0-100.<br>\
<b>{p}now</b>: Shows the track being played.<br>\
<b>{p}help</b>: Shows this message.<br>";

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#"https?://[^\s<>"']+"#).expect("URL pattern is valid"))
}

/// First http(s) URL in arbitrary chat text (anchors included)
pub fn extract_url(text: &str) -> Result<Url> {
    let raw = url_pattern()
        .find(text)
        .map(|m| m.as_str())
        .ok_or(Error::NoUrlFound)?;
    Url::parse(raw).map_err(|e| Error::InvalidArgument(format!("{}: {}", raw, e)))
}

/// Chat text for an error
pub fn error_message(err: &Error) -> String {
    match err {
        Error::AlreadyPlaying => "The playlist is already playing".to_string(),
        Error::EmptyQueue => "The playlist is empty".to_string(),
        Error::AlreadyStopped => "The playlist is already stopped".to_string(),
        Error::NoFormatFound(_) => "Could not find correct format for song".to_string(),
        Error::VolumeOutOfRange(_) => "The volume must be between 0 and 100".to_string(),
        Error::ThumbnailFailed(FetchError::DownloadFailed(_)) => {
            "Could not download the track's thumbnail".to_string()
        }
        Error::ThumbnailFailed(FetchError::NoUrl) => "Did not find the thumbnail URL.".to_string(),
        Error::ResolveFailed(ResolveError::Unsupported(_)) => {
            "That URL is not supported".to_string()
        }
        Error::SearchEmptyResult => "No matching results found".to_string(),
        Error::SearchRequestFailed(_) => "Could not get search results from Youtube".to_string(),
        Error::IncorrectResult(_) => "The search result did not resolve to a single song".to_string(),
        Error::TooFewArguments => "Too few arguments given".to_string(),
        Error::NoUrlFound => "Could not find URL".to_string(),
        Error::SearchNotConfigured => {
            "The bot has not been configured to search youtube. Add a Youtube API key in the config."
                .to_string()
        }
        other => other.to_string(),
    }
}

/// Chat front-end for one [`PlaybackEngine`]
pub struct CommandRouter {
    engine: Arc<PlaybackEngine>,
    prefix: String,
}

impl CommandRouter {
    pub fn new(engine: Arc<PlaybackEngine>, prefix: impl Into<String>) -> Self {
        Self {
            engine,
            prefix: prefix.into(),
        }
    }

    pub fn help(&self) -> String {
        HELP_MESSAGE.replace("{p}", &self.prefix)
    }

    /// Reply for a chat message, or `None` when it is not a command
    pub async fn handle(&self, message: &str) -> Option<String> {
        let body = message.trim_start().strip_prefix(self.prefix.as_str())?;
        let words: Vec<&str> = body.split_whitespace().collect();
        let (command, args) = words.split_first()?;

        let result = match *command {
            "start" => self.on_start().await,
            "stop" => self.on_stop().await,
            "add" => self.on_add(args).await,
            "search" => self.on_search(args).await,
            "skip" => self.on_skip().await,
            "clear" => Ok(self.on_clear()),
            "vol" => self.on_volume(args),
            "now" => Ok(self.on_now()),
            "help" => Ok(self.help()),
            unknown => {
                debug!(command = unknown, "Ignoring unknown command");
                return None;
            }
        };

        Some(match result {
            Ok(reply) => reply,
            Err(e) => {
                info!(command = *command, "Command failed: {}", e);
                error_message(&e)
            }
        })
    }

    async fn on_start(&self) -> Result<String> {
        self.engine.start().await?;
        Ok("Playlist started".to_string())
    }

    async fn on_stop(&self) -> Result<String> {
        self.engine.stop().await?;
        Ok("Playlist stopped".to_string())
    }

    async fn on_add(&self, args: &[&str]) -> Result<String> {
        if args.is_empty() {
            return Err(Error::TooFewArguments);
        }
        let url = extract_url(&args.join(" "))?;

        let tracks = self.engine.add_to_queue(&url).await?;
        Ok(match tracks.as_slice() {
            [track] => format!("Added:{}", track.card()),
            many => format!("Added {} tracks to the playlist", many.len()),
        })
    }

    async fn on_search(&self, args: &[&str]) -> Result<String> {
        if !self.engine.can_search() {
            return Err(Error::SearchNotConfigured);
        }
        if args.is_empty() {
            return Err(Error::TooFewArguments);
        }
        let track = self.engine.search_and_add(&args.join(" ")).await?;
        Ok(format!("Added:{}", track.card()))
    }

    async fn on_skip(&self) -> Result<String> {
        self.engine.skip().await?;
        Ok("Song skipped".to_string())
    }

    fn on_clear(&self) -> String {
        self.engine.clear_queue();
        "Playlist cleared".to_string()
    }

    fn on_volume(&self, args: &[&str]) -> Result<String> {
        let Some(raw) = args.first() else {
            let percent = (self.engine.get_volume() * 100.0).round() as i64;
            return Ok(format!("Current volume is {}", percent));
        };

        let percent: i64 = raw
            .parse()
            .map_err(|_| Error::InvalidArgument(format!("{} is not a number", raw)))?;
        self.engine.set_volume(percent)?;
        Ok(format!("Volume set to {}", percent))
    }

    fn on_now(&self) -> String {
        self.engine
            .current_track_info()
            .unwrap_or_else(|| "Nothing is playing".to_string())
    }
}
