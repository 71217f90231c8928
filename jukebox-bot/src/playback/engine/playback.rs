//! Playback loop
//!
//! One instance runs while the engine is playing. Each iteration pops a
//! track, binds it, and races three outcomes: stop, skip and natural
//! completion. [`transition`] decides what happens next.

use super::core::PlaybackEngine;
use super::Control;
use crate::error::Error;
use crate::playback::state::{transition, EngineState, LoopAction, LoopEvent};
use crate::track::Track;
use jukebox_common::events::{JukeboxEvent, StopReason};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

/// How long a halted playable gets to wind down before its task is aborted
const HALT_GRACE: Duration = Duration::from_secs(2);

impl PlaybackEngine {
    pub(super) async fn playback_loop(self, mut control: mpsc::UnboundedReceiver<Control>) {
        info!("Playback loop started");
        let mut state = EngineState::Playing;

        loop {
            let track = tokio::select! {
                biased;
                signal = control.recv() => match signal {
                    Some(Control::Stop(ack)) => {
                        self.finish(StopReason::Requested);
                        let _ = ack.send(());
                        return;
                    }
                    // Between tracks the skip lands on the next one
                    Some(Control::Skip) => {
                        if let Some(skipped) = self.queue.try_pop() {
                            info!(title = %skipped.title, "Skipped next track");
                            let next = transition(state, LoopEvent::Skip, self.queue.is_empty());
                            if let LoopAction::Terminate(reason) = next.action {
                                self.finish(reason);
                                return;
                            }
                        }
                        continue;
                    }
                    None => {
                        self.finish(StopReason::Requested);
                        return;
                    }
                },
                track = self.queue.pop() => track,
            };

            let (event, ack) = self.drive(track, &mut control).await;

            let next = transition(state, event, self.queue.is_empty());
            debug!(event = ?event, next = %next.next, "Loop transition");
            state = next.next;

            match next.action {
                LoopAction::Advance => {
                    self.state.clear_current();
                }
                LoopAction::Terminate(reason) => {
                    self.finish(reason);
                    if let Some(ack) = ack {
                        let _ = ack.send(());
                    }
                    return;
                }
            }
        }
    }

    /// Play one track until it ends or a control signal arrives
    async fn drive(
        &self,
        track: Track,
        control: &mut mpsc::UnboundedReceiver<Control>,
    ) -> (LoopEvent, Option<oneshot::Sender<()>>) {
        let handle = match self.sink.bind(&track) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(title = %track.title, "Could not start track: {}", e);
                self.emit_failed(&track, &e);
                return (LoopEvent::Failed, None);
            }
        };

        self.state.begin(track.clone(), Arc::clone(&handle));
        self.events.emit_lossy(JukeboxEvent::TrackStarted {
            title: track.title.clone(),
            artist: track.artist.clone(),
            public_url: track.public_url.clone(),
            duration_secs: track.duration.as_secs(),
            timestamp: chrono::Utc::now(),
        });
        info!(title = %track.title, artist = %track.artist, "Now playing");

        let mut play_task = tokio::spawn(async move { handle.play().await });

        let (event, ack) = tokio::select! {
            signal = control.recv() => match signal {
                Some(Control::Stop(ack)) => (LoopEvent::Stop, Some(ack)),
                Some(Control::Skip) => (LoopEvent::Skip, None),
                None => (LoopEvent::Stop, None),
            },
            finished = &mut play_task => {
                return match finished {
                    Ok(Ok(())) => {
                        debug!(title = %track.title, "Track completed");
                        (LoopEvent::Completed, None)
                    }
                    Ok(Err(e)) => {
                        warn!(title = %track.title, "Track playback failed: {}", e);
                        self.emit_failed(&track, &e);
                        (LoopEvent::Failed, None)
                    }
                    Err(e) => {
                        error!(title = %track.title, "Playback task failed: {}", e);
                        self.emit_failed(&track, &Error::Audio(e.to_string()));
                        (LoopEvent::Failed, None)
                    }
                };
            }
        };

        self.state.halt_current();
        if tokio::time::timeout(HALT_GRACE, &mut play_task).await.is_err() {
            warn!(title = %track.title, "Playable ignored stop, aborting its task");
            play_task.abort();
        }
        (event, ack)
    }

    fn emit_failed(&self, track: &Track, err: &Error) {
        self.events.emit_lossy(JukeboxEvent::TrackFailed {
            title: track.title.clone(),
            reason: err.to_string(),
            timestamp: chrono::Utc::now(),
        });
    }
}
