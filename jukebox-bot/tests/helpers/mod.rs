//! Test helpers for jukebox-bot integration tests
//!
//! Scripted collaborators so the engine runs without network or audio:
//! - FakeResolver: URL → fixed track list
//! - FakeFetcher: fails on URLs containing "fail", stalls on "slow"
//! - FakeSearcher: fixed answer
//! - FakeSink / FakePlayable: records binds, plays and volume; completion is
//!   triggered by the test

#![allow(dead_code)]

use async_trait::async_trait;
use jukebox_bot::audio::{AudioSink, Playable};
use jukebox_bot::playback::{Collaborators, EngineOptions, PlaybackEngine};
use jukebox_bot::sources::{
    FetchError, ResolveError, Resolver, SearchError, Searcher, ThumbnailFetcher,
};
use jukebox_bot::{Error, Result, Thumbnail, Track};
use jukebox_common::EventBus;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Track whose thumbnail lives at `https://img.example/<name>.jpg`
pub fn track(name: &str) -> Track {
    Track {
        title: name.to_string(),
        artist: format!("{} artist", name),
        public_url: format!("https://www.youtube.com/watch?v={}", name),
        stream_url: format!("https://cdn.example/{}.webm", name),
        duration: Duration::from_secs(180),
        thumbnail_url: Some(format!("https://img.example/{}.jpg", name)),
        thumbnail: None,
    }
}

pub fn url(raw: &str) -> Url {
    Url::parse(raw).unwrap()
}

/// Poll `condition` until it holds or two seconds pass
pub async fn wait_until<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Await `future`, panicking after two seconds
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("operation timed out")
}

// ========================================
// Resolver
// ========================================

#[derive(Default)]
pub struct FakeResolver {
    answers: Mutex<HashMap<String, Vec<Track>>>,
}

impl FakeResolver {
    pub fn with(self, url: &str, tracks: Vec<Track>) -> Self {
        self.answers.lock().unwrap().insert(url.to_string(), tracks);
        self
    }
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn resolve(&self, url: &Url) -> std::result::Result<Vec<Track>, ResolveError> {
        self.answers
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| ResolveError::Unsupported(url.to_string()))
    }
}

// ========================================
// Thumbnail fetcher
// ========================================

/// Sets a flag when dropped before completing
struct DropFlag {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl Drop for DropFlag {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    pub fetches: AtomicUsize,
    /// Set when a "slow" fetch was cancelled mid-flight
    pub slow_cancelled: Arc<AtomicBool>,
}

#[async_trait]
impl ThumbnailFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<Thumbnail, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if url.is_empty() {
            return Err(FetchError::NoUrl);
        }
        if url.contains("fail") {
            // Let the slow siblings get going first
            tokio::time::sleep(Duration::from_millis(20)).await;
            return Err(FetchError::DownloadFailed(format!("{} returned 404", url)));
        }
        if url.contains("slow") {
            let mut guard = DropFlag {
                flag: Arc::clone(&self.slow_cancelled),
                armed: true,
            };
            tokio::time::sleep(Duration::from_secs(10)).await;
            guard.armed = false;
        }
        Ok(Thumbnail {
            source_url: url.to_string(),
            mime_type: "image/png".to_string(),
            encoded: "AAEC".to_string(),
        })
    }
}

// ========================================
// Searcher
// ========================================

pub struct FakeSearcher {
    answer: std::result::Result<String, SearchError>,
}

impl FakeSearcher {
    pub fn returning(url: &str) -> Self {
        Self { answer: Ok(url.to_string()) }
    }

    pub fn failing(err: SearchError) -> Self {
        Self { answer: Err(err) }
    }
}

#[async_trait]
impl Searcher for FakeSearcher {
    async fn search(&self, _query: &str) -> std::result::Result<String, SearchError> {
        self.answer.clone()
    }
}

// ========================================
// Audio sink
// ========================================

pub struct FakePlayable {
    pub title: String,
    volume_bits: AtomicU32,
    pub plays: AtomicUsize,
    completed: CancellationToken,
    stopped: CancellationToken,
    fail_on_play: bool,
}

impl FakePlayable {
    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::SeqCst))
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Make `play` return as if the track reached its end
    pub fn complete(&self) {
        self.completed.cancel();
    }
}

#[async_trait]
impl Playable for FakePlayable {
    fn set_volume(&self, volume: f32) {
        self.volume_bits.store(volume.to_bits(), Ordering::SeqCst);
    }

    async fn play(&self) -> Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_play {
            return Err(Error::Audio(format!("{} is corrupt", self.title)));
        }
        tokio::select! {
            _ = self.completed.cancelled() => Ok(()),
            _ = self.stopped.cancelled() => Ok(()),
        }
    }

    fn stop(&self) {
        self.stopped.cancel();
    }
}

#[derive(Default)]
pub struct FakeSink {
    bound: Mutex<Vec<Arc<FakePlayable>>>,
    /// Titles that fail to bind
    pub unbindable: Mutex<Vec<String>>,
    /// Titles whose playback fails
    pub unplayable: Mutex<Vec<String>>,
}

impl FakeSink {
    /// Titles bound so far, in order
    pub fn bound_titles(&self) -> Vec<String> {
        self.bound.lock().unwrap().iter().map(|p| p.title.clone()).collect()
    }

    pub fn bind_count(&self) -> usize {
        self.bound.lock().unwrap().len()
    }

    /// Most recently bound handle
    pub fn last(&self) -> Option<Arc<FakePlayable>> {
        self.bound.lock().unwrap().last().cloned()
    }

    pub fn total_plays(&self) -> usize {
        self.bound
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.plays.load(Ordering::SeqCst))
            .sum()
    }
}

impl AudioSink for FakeSink {
    fn bind(&self, track: &Track) -> Result<Arc<dyn Playable>> {
        if self.unbindable.lock().unwrap().contains(&track.title) {
            return Err(Error::Audio(format!("cannot bind {}", track.title)));
        }
        let playable = Arc::new(FakePlayable {
            title: track.title.clone(),
            volume_bits: AtomicU32::new(0),
            plays: AtomicUsize::new(0),
            completed: CancellationToken::new(),
            stopped: CancellationToken::new(),
            fail_on_play: self.unplayable.lock().unwrap().contains(&track.title),
        });
        self.bound.lock().unwrap().push(Arc::clone(&playable));
        Ok(playable)
    }
}

// ========================================
// Engine harness
// ========================================

pub struct Harness {
    pub engine: Arc<PlaybackEngine>,
    pub sink: Arc<FakeSink>,
    pub fetcher: Arc<FakeFetcher>,
    pub events: Arc<EventBus>,
}

impl Harness {
    pub fn new(resolver: FakeResolver, searcher: Option<FakeSearcher>) -> Self {
        let sink = Arc::new(FakeSink::default());
        let fetcher = Arc::new(FakeFetcher::default());
        let events = Arc::new(EventBus::new(64));

        let engine = PlaybackEngine::new(
            Collaborators {
                resolver: Arc::new(resolver),
                fetcher: fetcher.clone(),
                searcher: searcher.map(|s| Arc::new(s) as Arc<dyn Searcher>),
                sink: sink.clone(),
            },
            Arc::clone(&events),
            EngineOptions::default(),
        );

        Self {
            engine: Arc::new(engine),
            sink,
            fetcher,
            events,
        }
    }

    /// Wait until `n` tracks have been bound
    pub async fn wait_for_binds(&self, n: usize) -> bool {
        wait_until(|| self.sink.bind_count() >= n).await
    }
}
