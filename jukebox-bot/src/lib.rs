//! # Jukebox Bot Library (jukebox-bot)
//!
//! Chat-driven music relay: chat commands resolve media URLs or search
//! queries into tracks, queue them, and a single playback loop streams them
//! one after another into the session's audio output.
//!
//! **Architecture:** [`router::CommandRouter`] → [`playback::PlaybackEngine`]
//! → resolver / thumbnail fetcher → bounded queue → playback loop →
//! [`audio::Playable`]

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;
pub mod router;
pub mod session;
pub mod sources;
pub mod state;
pub mod track;

pub use error::{Error, Result};
pub use playback::PlaybackEngine;
pub use track::{Thumbnail, Track};
