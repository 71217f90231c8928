//! Bounded track queue
//!
//! FIFO hand-off between enqueue callers and the playback loop. Two
//! semaphores count free slots and queued tracks, so `push` waits while the
//! queue is full and `pop` waits while it is empty. Both are cancel-safe:
//! once a permit is acquired the rest of the operation is synchronous.

use crate::track::Track;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Semaphore;
use tracing::debug;

/// Maximum number of queued tracks
pub const MAX_QUEUE_SIZE: usize = 100;

pub struct TrackQueue {
    entries: Mutex<VecDeque<Track>>,
    free_slots: Semaphore,
    queued: Semaphore,
    /// Serializes batch producers so a batch lands contiguously
    producer: tokio::sync::Mutex<()>,
}

impl TrackQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            free_slots: Semaphore::new(capacity),
            queued: Semaphore::new(0),
            producer: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Track>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append one track, waiting for a free slot
    pub async fn push(&self, track: Track) {
        let _batch = self.producer.lock().await;
        self.push_one(track).await;
    }

    /// Append tracks in order, waiting for free slots as needed
    pub async fn push_all(&self, tracks: Vec<Track>) {
        let _batch = self.producer.lock().await;
        for track in tracks {
            self.push_one(track).await;
        }
    }

    async fn push_one(&self, track: Track) {
        // Semaphores are never closed
        if let Ok(permit) = self.free_slots.acquire().await {
            permit.forget();
        }
        debug!(title = %track.title, "Track queued");
        self.lock().push_back(track);
        self.queued.add_permits(1);
    }

    /// Remove the front track, waiting while the queue is empty
    pub async fn pop(&self) -> Track {
        loop {
            if let Ok(permit) = self.queued.acquire().await {
                permit.forget();
            }
            if let Some(track) = self.lock().pop_front() {
                self.free_slots.add_permits(1);
                return track;
            }
        }
    }

    /// Remove the front track if there is one
    pub fn try_pop(&self) -> Option<Track> {
        let permit = self.queued.try_acquire().ok()?;
        permit.forget();
        let track = self.lock().pop_front();
        if track.is_some() {
            self.free_slots.add_permits(1);
        }
        track
    }

    /// Discard every queued track; returns how many were dropped
    pub fn clear(&self) -> usize {
        let mut dropped = 0;
        while self.try_pop().is_some() {
            dropped += 1;
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl Default for TrackQueue {
    fn default() -> Self {
        Self::new(MAX_QUEUE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn track(title: &str) -> Track {
        Track {
            title: title.to_string(),
            artist: "Artist".to_string(),
            public_url: format!("https://www.youtube.com/watch?v={}", title),
            stream_url: format!("https://cdn.example/{}", title),
            duration: Duration::from_secs(10),
            thumbnail_url: None,
            thumbnail: None,
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = TrackQueue::default();
        queue.push_all(vec![track("a"), track("b")]).await;
        queue.push(track("c")).await;

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.pop().await.title, "a");
        assert_eq!(queue.pop().await.title, "b");
        assert_eq!(queue.try_pop().unwrap().title, "c");
        assert!(queue.try_pop().is_none());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_pop_waits_for_push() {
        let queue = Arc::new(TrackQueue::default());

        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        queue.push(track("late")).await;
        let popped = timeout(Duration::from_secs(1), consumer).await.unwrap().unwrap();
        assert_eq!(popped.title, "late");
    }

    #[tokio::test]
    async fn test_push_waits_for_free_slot() {
        let queue = Arc::new(TrackQueue::new(2));
        queue.push_all(vec![track("a"), track("b")]).await;

        let producer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.push(track("c")).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!producer.is_finished());
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop().await.title, "a");
        timeout(Duration::from_secs(1), producer).await.unwrap().unwrap();
        assert_eq!(queue.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_frees_capacity() {
        let queue = TrackQueue::new(3);
        queue.push_all(vec![track("a"), track("b"), track("c")]).await;

        assert_eq!(queue.clear(), 3);
        assert!(queue.is_empty());

        // All three slots are usable again
        timeout(
            Duration::from_secs(1),
            queue.push_all(vec![track("d"), track("e"), track("f")]),
        )
        .await
        .unwrap();
        assert_eq!(queue.len(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_pop_loses_nothing() {
        let queue = TrackQueue::default();
        assert!(timeout(Duration::from_millis(10), queue.pop()).await.is_err());

        queue.push(track("kept")).await;
        assert_eq!(queue.pop().await.title, "kept");
    }
}
