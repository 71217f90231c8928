//! Shared playback state
//!
//! Volume and the current track's playable handle live behind one lock that
//! both the control operations and the playback loop take. Nothing awaits
//! while holding it, so a plain `std::sync::Mutex` is enough.

use crate::audio::Playable;
use crate::track::Track;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Track the playback loop is driving right now
#[derive(Clone)]
pub struct CurrentTrack {
    pub track: Track,
    /// Bound handle (the track's playable)
    pub handle: Arc<dyn Playable>,
    pub started_at: Instant,
}

impl CurrentTrack {
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

struct Inner {
    /// Fraction in [0.0, 1.0]
    volume: f32,
    current: Option<CurrentTrack>,
}

/// Volume and current-track slot shared between the engine and its loop
pub struct SharedState {
    inner: Mutex<Inner>,
}

impl SharedState {
    pub fn new(volume: f32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                volume: volume.clamp(0.0, 1.0),
                current: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stored volume fraction
    pub fn volume(&self) -> f32 {
        self.lock().volume
    }

    /// Store a new volume and push it to the current handle, if any
    pub fn set_volume(&self, volume: f32) {
        let mut inner = self.lock();
        inner.volume = volume.clamp(0.0, 1.0);
        if let Some(current) = &inner.current {
            current.handle.set_volume(inner.volume);
        }
    }

    /// Install a freshly bound track, applying the stored volume first
    pub fn begin(&self, track: Track, handle: Arc<dyn Playable>) {
        let mut inner = self.lock();
        handle.set_volume(inner.volume);
        inner.current = Some(CurrentTrack {
            track,
            handle,
            started_at: Instant::now(),
        });
    }

    /// Halt the current handle without releasing the slot
    pub fn halt_current(&self) {
        if let Some(current) = &self.lock().current {
            current.handle.stop();
        }
    }

    /// Release the current track
    pub fn clear_current(&self) -> Option<CurrentTrack> {
        self.lock().current.take()
    }

    /// Snapshot of the current track
    pub fn current(&self) -> Option<CurrentTrack> {
        self.lock().current.clone()
    }

    pub fn has_current(&self) -> bool {
        self.lock().current.is_some()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    #[derive(Default)]
    struct Recorder {
        volume_bits: AtomicU32,
        stopped: AtomicBool,
    }

    #[async_trait]
    impl Playable for Recorder {
        fn set_volume(&self, volume: f32) {
            self.volume_bits.store(volume.to_bits(), Ordering::SeqCst);
        }

        async fn play(&self) -> Result<()> {
            Ok(())
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    impl Recorder {
        fn volume(&self) -> f32 {
            f32::from_bits(self.volume_bits.load(Ordering::SeqCst))
        }
    }

    fn track() -> Track {
        Track {
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            public_url: "https://www.youtube.com/watch?v=a".to_string(),
            stream_url: "https://cdn.example/a".to_string(),
            duration: Duration::from_secs(60),
            thumbnail_url: None,
            thumbnail: None,
        }
    }

    #[test]
    fn test_begin_applies_stored_volume() {
        let state = SharedState::new(0.4);
        let recorder = Arc::new(Recorder::default());

        state.begin(track(), recorder.clone());

        assert_eq!(recorder.volume(), 0.4);
        assert!(state.has_current());
    }

    #[test]
    fn test_set_volume_reaches_current_handle() {
        let state = SharedState::new(0.4);
        let recorder = Arc::new(Recorder::default());
        state.begin(track(), recorder.clone());

        state.set_volume(0.9);

        assert_eq!(state.volume(), 0.9);
        assert_eq!(recorder.volume(), 0.9);
    }

    #[test]
    fn test_set_volume_without_current_only_stores() {
        let state = SharedState::new(0.4);
        state.set_volume(0.1);
        assert_eq!(state.volume(), 0.1);
        assert!(state.current().is_none());
    }

    #[test]
    fn test_halt_then_clear() {
        let state = SharedState::default();
        let recorder = Arc::new(Recorder::default());
        state.begin(track(), recorder.clone());

        state.halt_current();
        assert!(recorder.stopped.load(Ordering::SeqCst));
        assert!(state.has_current());

        let released = state.clear_current().unwrap();
        assert_eq!(released.track, track());
        assert!(!state.has_current());
    }
}
