//! Playable handle and audio sink contracts
//!
//! The playback loop never touches audio itself. It asks an [`AudioSink`] to
//! bind a dequeued track and then drives the returned [`Playable`].

use crate::error::Result;
use crate::track::Track;
use async_trait::async_trait;
use std::sync::Arc;

/// A track bound to the session's audio output
#[async_trait]
pub trait Playable: Send + Sync {
    /// Apply a gain fraction in [0.0, 1.0]; takes effect on the next frame
    fn set_volume(&self, volume: f32);

    /// Play to the end.
    ///
    /// Resolves `Ok(())` on natural completion, and early once [`Playable::stop`]
    /// has been called.
    async fn play(&self) -> Result<()>;

    /// Halt playback; a running `play` returns promptly
    fn stop(&self);
}

/// Already-connected audio output that can bind tracks
pub trait AudioSink: Send + Sync {
    fn bind(&self, track: &Track) -> Result<Arc<dyn Playable>>;
}
