//! # Jukebox Common Library
//!
//! Shared code for the jukebox relay:
//! - Common error type
//! - Bootstrap configuration helpers (config file discovery, logging section)
//! - Engine event types and the broadcast EventBus
//! - Human-readable time formatting for chat output

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;

pub use error::{Error, Result};
pub use events::{EventBus, JukeboxEvent};
