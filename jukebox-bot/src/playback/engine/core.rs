//! Engine construction, lifecycle and volume

use super::Control;
use crate::audio::AudioSink;
use crate::error::{Error, Result};
use crate::playback::queue::{TrackQueue, MAX_QUEUE_SIZE};
use crate::sources::{Resolver, Searcher, ThumbnailFetcher};
use crate::state::SharedState;
use jukebox_common::events::{JukeboxEvent, StopReason};
use jukebox_common::human_time::{format_clock, progress_bar};
use jukebox_common::EventBus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// External collaborators the engine drives
pub struct Collaborators {
    pub resolver: Arc<dyn Resolver>,
    pub fetcher: Arc<dyn ThumbnailFetcher>,
    /// `None` disables search
    pub searcher: Option<Arc<dyn Searcher>>,
    pub sink: Arc<dyn AudioSink>,
}

/// Engine tuning
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Initial volume fraction in [0.0, 1.0]
    pub default_volume: f32,
    pub queue_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            default_volume: 0.6,
            queue_capacity: MAX_QUEUE_SIZE,
        }
    }
}

/// Loop task bookkeeping, guarded by the lifecycle mutex
#[derive(Default)]
pub(super) struct Lifecycle {
    pub(super) control: Option<mpsc::UnboundedSender<Control>>,
    pub(super) task: Option<JoinHandle<()>>,
}

/// Playback queue and control state machine
///
/// Constructed once per connected session and shared by reference (usually
/// behind an `Arc`) with the command router.
pub struct PlaybackEngine {
    pub(super) queue: Arc<TrackQueue>,
    pub(super) resolver: Arc<dyn Resolver>,
    pub(super) fetcher: Arc<dyn ThumbnailFetcher>,
    pub(super) searcher: Option<Arc<dyn Searcher>>,
    pub(super) sink: Arc<dyn AudioSink>,

    /// Volume and current track, shared with the loop under one lock
    pub(super) state: Arc<SharedState>,

    pub(super) playing: Arc<AtomicBool>,

    /// Serializes start / stop / skip so at most one loop exists
    pub(super) lifecycle: Arc<Mutex<Lifecycle>>,

    pub(super) events: Arc<EventBus>,
}

impl PlaybackEngine {
    pub fn new(collaborators: Collaborators, events: Arc<EventBus>, options: EngineOptions) -> Self {
        Self {
            queue: Arc::new(TrackQueue::new(options.queue_capacity)),
            resolver: collaborators.resolver,
            fetcher: collaborators.fetcher,
            searcher: collaborators.searcher,
            sink: collaborators.sink,
            state: Arc::new(SharedState::new(options.default_volume)),
            playing: Arc::new(AtomicBool::new(false)),
            lifecycle: Arc::new(Mutex::new(Lifecycle::default())),
            events,
        }
    }

    /// Begin draining the queue in a background task.
    ///
    /// Returns as soon as the loop has been spawned.
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;

        if self.is_playing() {
            return Err(Error::AlreadyPlaying);
        }
        if self.queue.is_empty() {
            return Err(Error::EmptyQueue);
        }

        // A loop that terminated on its own may still be unwinding
        if let Some(previous) = lifecycle.task.take() {
            if let Err(e) = previous.await {
                warn!("Previous playback loop ended abnormally: {}", e);
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.playing.store(true, Ordering::SeqCst);

        let self_clone = self.clone_handles();
        lifecycle.task = Some(tokio::spawn(async move {
            self_clone.playback_loop(rx).await;
        }));
        lifecycle.control = Some(tx);

        info!(queued = self.queue.len(), "Playback started");
        Ok(())
    }

    /// Halt playback; returns once the loop acknowledges
    pub async fn stop(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        self.stop_locked(&mut lifecycle).await
    }

    pub(super) async fn stop_locked(&self, lifecycle: &mut Lifecycle) -> Result<()> {
        if !self.is_playing() {
            return Err(Error::AlreadyStopped);
        }
        self.playing.store(false, Ordering::SeqCst);

        let (ack_tx, ack_rx) = oneshot::channel();
        let delivered = lifecycle
            .control
            .as_ref()
            .map(|control| control.send(Control::Stop(ack_tx)).is_ok())
            .unwrap_or(false);

        // A closed channel or dropped ack means the loop already exited
        if delivered && ack_rx.await.is_err() {
            debug!("Playback loop exited before acknowledging stop");
        }
        lifecycle.control = None;

        info!("Playback stopped");
        Ok(())
    }

    /// Store `percent / 100`; a playing track picks it up immediately
    pub fn set_volume(&self, percent: i64) -> Result<()> {
        if !(0..=100).contains(&percent) {
            return Err(Error::VolumeOutOfRange(percent));
        }
        self.state.set_volume(percent as f32 / 100.0);
        debug!(percent = percent, "Volume set");
        Ok(())
    }

    /// Stored volume fraction
    pub fn get_volume(&self) -> f32 {
        self.state.volume()
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Whether a searcher was configured
    pub fn can_search(&self) -> bool {
        self.searcher.is_some()
    }

    /// Progress line plus card for the track being played, if any
    pub fn current_track_info(&self) -> Option<String> {
        let current = self.state.current()?;
        let total = current.track.duration;
        let elapsed = if total.is_zero() {
            current.elapsed()
        } else {
            current.elapsed().min(total)
        };

        Some(format!(
            "<h4>{} ▶ {} {}</h4>{}",
            format_clock(elapsed),
            progress_bar(total, elapsed),
            format_clock(total),
            current.track.card()
        ))
    }

    /// Release the current track, mark idle and announce it
    pub(super) fn finish(&self, reason: StopReason) {
        self.state.clear_current();
        self.playing.store(false, Ordering::SeqCst);
        self.events.emit_lossy(JukeboxEvent::PlaybackStopped {
            reason,
            timestamp: chrono::Utc::now(),
        });
        info!(reason = %reason, "Playback loop terminated");
    }

    /// Clone the shared handles for the background loop
    pub(super) fn clone_handles(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            resolver: Arc::clone(&self.resolver),
            fetcher: Arc::clone(&self.fetcher),
            searcher: self.searcher.clone(),
            sink: Arc::clone(&self.sink),
            state: Arc::clone(&self.state),
            playing: Arc::clone(&self.playing),
            lifecycle: Arc::clone(&self.lifecycle),
            events: Arc::clone(&self.events),
        }
    }
}
