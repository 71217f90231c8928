//! Console chat session
//!
//! Stands in for a voice-chat connection: each input line is a chat message
//! and every reply is written as `[username] text`. Messages are handled on
//! their own tasks, so an `add` waiting for queue space never holds up a
//! `start` typed after it. Engine events are announced to the same output.

use crate::error::Result;
use crate::router::CommandRouter;
use jukebox_common::events::{JukeboxEvent, StopReason};
use jukebox_common::EventBus;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Serialized chat output
struct ChatWriter<W> {
    username: String,
    out: Mutex<W>,
}

impl<W: AsyncWrite + Unpin> ChatWriter<W> {
    async fn say(&self, text: &str) {
        let line = format!("[{}] {}\n", self.username, text);
        let mut out = self.out.lock().await;
        if let Err(e) = out.write_all(line.as_bytes()).await {
            warn!("Chat output failed: {}", e);
            return;
        }
        let _ = out.flush().await;
    }
}

/// Chat text for an engine event, if it is worth announcing
pub fn announcement(event: &JukeboxEvent) -> Option<String> {
    match event {
        JukeboxEvent::TrackStarted { title, artist, .. } => {
            Some(format!("Now playing: {} by {}", title, artist))
        }
        JukeboxEvent::TrackFailed { title, reason, .. } => {
            Some(format!("Could not play {}: {}", title, reason))
        }
        JukeboxEvent::PlaybackStopped {
            reason: StopReason::QueueExhausted,
            ..
        } => Some("The playlist has ended".to_string()),
        JukeboxEvent::PlaybackStopped { .. } => None,
    }
}

pub struct ConsoleSession {
    router: Arc<CommandRouter>,
    events: Arc<EventBus>,
    username: String,
}

impl ConsoleSession {
    pub fn new(router: Arc<CommandRouter>, events: Arc<EventBus>, username: impl Into<String>) -> Self {
        Self {
            router,
            events,
            username: username.into(),
        }
    }

    /// Serve chat until `input` ends or `shutdown` fires.
    ///
    /// On end of input, waits for in-flight messages to be answered.
    pub async fn run<R, W>(self, input: R, output: W, shutdown: CancellationToken) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let writer = Arc::new(ChatWriter {
            username: self.username.clone(),
            out: Mutex::new(output),
        });

        let announcer = tokio::spawn(announce_events(self.events.subscribe(), Arc::clone(&writer)));

        let mut lines = input.lines();
        let mut in_flight = JoinSet::new();

        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Session shutting down");
                    in_flight.abort_all();
                    break;
                }
                line = lines.next_line() => line?,
            };

            let Some(message) = line else {
                debug!("Chat input closed");
                while in_flight.join_next().await.is_some() {}
                break;
            };
            if message.trim().is_empty() {
                continue;
            }

            let router = Arc::clone(&self.router);
            let writer = Arc::clone(&writer);
            in_flight.spawn(async move {
                if let Some(reply) = router.handle(&message).await {
                    writer.say(&reply).await;
                }
            });

            // Reap finished handlers so the set does not grow unbounded
            while in_flight.try_join_next().is_some() {}
        }

        announcer.abort();
        Ok(())
    }
}

async fn announce_events<W: AsyncWrite + Unpin>(
    mut rx: broadcast::Receiver<JukeboxEvent>,
    writer: Arc<ChatWriter<W>>,
) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                if let Some(text) = announcement(&event) {
                    writer.say(&text).await;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped = skipped, "Session lagged behind engine events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
