//! Queue operations
//!
//! Adding is all-or-nothing: a batch is resolved, every thumbnail is fetched
//! concurrently, and only a fully successful batch reaches the queue. The
//! first failed fetch drops the remaining in-flight fetches.

use super::core::PlaybackEngine;
use super::Control;
use crate::error::{Error, Result};
use crate::track::Track;
use futures::stream::{FuturesUnordered, TryStreamExt};
use tracing::{debug, info};
use url::Url;

impl PlaybackEngine {
    /// Resolve `url`, attach thumbnails and enqueue the batch in order.
    ///
    /// Waits for queue capacity. Returns the tracks that were queued.
    pub async fn add_to_queue(&self, url: &Url) -> Result<Vec<Track>> {
        let tracks = self.resolve_batch(url).await?;
        self.queue.push_all(tracks.clone()).await;
        info!(url = %url, added = tracks.len(), "Tracks added to queue");
        Ok(tracks)
    }

    /// Search, then enqueue the single hit
    pub async fn search_and_add(&self, query: &str) -> Result<Track> {
        let searcher = self.searcher.as_ref().ok_or(Error::SearchNotConfigured)?;

        let found = searcher.search(query).await?;
        let url = Url::parse(&found).map_err(|e| {
            Error::SearchRequestFailed(format!("search returned invalid URL {}: {}", found, e))
        })?;
        debug!(query = query, url = %url, "Search hit");

        let mut tracks = self.resolve_batch(&url).await?;
        if tracks.len() != 1 {
            return Err(Error::IncorrectResult(tracks.len()));
        }
        let track = tracks.remove(0);

        self.queue.push(track.clone()).await;
        info!(title = %track.title, "Search result added to queue");
        Ok(track)
    }

    /// Drop every queued track; the current track keeps playing.
    ///
    /// Returns the number of tracks removed.
    pub fn clear_queue(&self) -> usize {
        let dropped = self.queue.clear();
        info!(dropped = dropped, "Queue cleared");
        dropped
    }

    /// Abandon the current track, or discard the next one when idle
    pub async fn skip(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;

        match (self.queue.is_empty(), self.is_playing()) {
            (true, false) => Err(Error::EmptyQueue),
            (true, true) => self.stop_locked(&mut lifecycle).await,
            (false, false) => {
                if let Some(track) = self.queue.try_pop() {
                    info!(title = %track.title, "Skipped queued track");
                }
                Ok(())
            }
            (false, true) => {
                if let Some(control) = &lifecycle.control {
                    // Send fails only if the loop is already gone
                    let _ = control.send(Control::Skip);
                }
                info!("Skipping current track");
                Ok(())
            }
        }
    }

    /// Resolver output with thumbnails attached, in resolution order
    async fn resolve_batch(&self, url: &Url) -> Result<Vec<Track>> {
        let tracks = self.resolver.resolve(url).await?;
        debug!(url = %url, resolved = tracks.len(), "Resolved batch");

        let mut slots: Vec<Option<Track>> = vec![None; tracks.len()];
        let mut fetches: FuturesUnordered<_> = tracks
            .into_iter()
            .enumerate()
            .map(|(index, track)| {
                let fetcher = &self.fetcher;
                async move {
                    match track.thumbnail_url.clone() {
                        Some(thumbnail_url) => {
                            let thumbnail = fetcher.fetch(&thumbnail_url).await?;
                            Ok::<_, Error>((index, track.with_thumbnail(thumbnail)))
                        }
                        None => Ok((index, track)),
                    }
                }
            })
            .collect();

        // Returning early drops `fetches`, cancelling whatever is in flight
        while let Some((index, track)) = fetches.try_next().await? {
            slots[index] = Some(track);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
