//! Playback state machine
//!
//! Two states and four loop events. [`transition`] is the only place that
//! decides whether the playback loop keeps going after a track ends, so the
//! stop / skip / completion race can be tested without any audio.

use jukebox_common::events::StopReason;
use std::fmt;

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Playing,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Idle => write!(f, "idle"),
            EngineState::Playing => write!(f, "playing"),
        }
    }
}

/// What ended the wait on the current track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopEvent {
    /// Explicit stop request
    Stop,
    /// Explicit skip request
    Skip,
    /// The playable reached its natural end
    Completed,
    /// The track could not be bound or its playback failed
    Failed,
}

/// What the loop does next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    /// Pop the next track
    Advance,
    /// Leave the loop
    Terminate(StopReason),
}

/// Result of one transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: EngineState,
    pub action: LoopAction,
}

impl Transition {
    fn advance() -> Self {
        Self {
            next: EngineState::Playing,
            action: LoopAction::Advance,
        }
    }

    fn terminate(reason: StopReason) -> Self {
        Self {
            next: EngineState::Idle,
            action: LoopAction::Terminate(reason),
        }
    }
}

/// Next state and action for `event` given whether the queue is empty
pub fn transition(state: EngineState, event: LoopEvent, queue_empty: bool) -> Transition {
    match (state, event) {
        (EngineState::Idle, _) => Transition::terminate(StopReason::Requested),
        (EngineState::Playing, LoopEvent::Stop) => Transition::terminate(StopReason::Requested),
        (EngineState::Playing, LoopEvent::Skip | LoopEvent::Completed | LoopEvent::Failed) => {
            if queue_empty {
                Transition::terminate(StopReason::QueueExhausted)
            } else {
                Transition::advance()
            }
        }
    }
}
