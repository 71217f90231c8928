//! Event types for the jukebox event system
//!
//! Provides the shared event definitions and the EventBus the playback
//! engine publishes on. Chat sessions subscribe to announce track changes.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Why the playback loop stopped
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A user asked for the stop (stop command, or skip on the last track)
    Requested,
    /// The last queued track finished on its own
    QueueExhausted,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Requested => write!(f, "requested"),
            StopReason::QueueExhausted => write!(f, "queue exhausted"),
        }
    }
}

/// Jukebox event types
///
/// Events are broadcast via EventBus and can be serialized for logging or
/// forwarding to other chat surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JukeboxEvent {
    /// A track was bound to the audio sink and began playing
    TrackStarted {
        title: String,
        artist: String,
        public_url: String,
        /// Track length in whole seconds (0 for live streams)
        duration_secs: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A track could not be played and was dropped from the session
    TrackFailed {
        title: String,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The playback loop terminated
    PlaybackStopped {
        reason: StopReason,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for [`JukeboxEvent`]s
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lose the
/// oldest events once `capacity` is exceeded.
pub struct EventBus {
    tx: broadcast::Sender<JukeboxEvent>,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use jukebox_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(64);
    /// let _rx = event_bus.subscribe();
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<JukeboxEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: JukeboxEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopped() -> JukeboxEvent {
        JukeboxEvent::PlaybackStopped {
            reason: StopReason::Requested,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new(10);
        bus.emit_lossy(stopped());
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let bus = EventBus::new(10);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.emit_lossy(JukeboxEvent::TrackStarted {
            title: "Song".to_string(),
            artist: "Band".to_string(),
            public_url: "https://www.youtube.com/watch?v=abc".to_string(),
            duration_secs: 180,
            timestamp: chrono::Utc::now(),
        });

        for rx in [&mut first, &mut second] {
            match rx.recv().await.unwrap() {
                JukeboxEvent::TrackStarted { title, duration_secs, .. } => {
                    assert_eq!(title, "Song");
                    assert_eq!(duration_secs, 180);
                }
                other => panic!("Wrong event type received: {:?}", other),
            }
        }
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let json = serde_json::to_value(stopped()).unwrap();
        assert_eq!(json["type"], "PlaybackStopped");
        assert_eq!(json["reason"], "requested");
    }
}
