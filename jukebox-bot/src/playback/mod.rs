//! Playback core
//!
//! - `queue`: bounded FIFO between enqueue callers and the loop
//! - `state`: Idle/Playing transition table
//! - `engine`: control operations and the background loop

pub mod engine;
pub mod queue;
pub mod state;

pub use engine::{Collaborators, EngineOptions, PlaybackEngine};
pub use queue::{TrackQueue, MAX_QUEUE_SIZE};
pub use state::{transition, EngineState, LoopAction, LoopEvent};
