//! Playback engine
//!
//! **Module Structure:**
//! - `core.rs`: construction, lifecycle (start/stop), volume, now-playing info
//! - `queue.rs`: queue operations (add, search, skip, clear) and batch resolution
//! - `playback.rs`: the background playback loop

mod core;
mod playback;
mod queue;

pub use core::{Collaborators, EngineOptions, PlaybackEngine};

use tokio::sync::oneshot;

/// Signals from the control operations to the playback loop
#[derive(Debug)]
pub(crate) enum Control {
    /// Halt and terminate; the sender is acknowledged once the loop is done
    Stop(oneshot::Sender<()>),
    /// Halt the current track and advance
    Skip,
}
