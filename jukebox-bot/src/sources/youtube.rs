//! YouTube resolver backed by the `yt-dlp` command
//!
//! Single items are resolved with one `yt-dlp --dump-single-json` call.
//! Playlists are listed flat first, then every entry is resolved with up to
//! `concurrency` processes in flight. Entries come back in playlist order and
//! the first failing entry aborts the rest (dropped futures kill their
//! child processes).

use super::{collect_in_order, ResolveError, Resolver};
use crate::track::Track;
use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;
use url::Url;

/// Audio-only formats in order of preference (opus ~160k, ~70k, ~50k)
const PREFERRED_FORMATS: [&str; 3] = ["251", "250", "249"];

/// Hosts this resolver accepts
const SUPPORTED_HOSTS: [&str; 5] = [
    "www.youtube.com",
    "youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtu.be",
];

/// Upper bound for one yt-dlp invocation
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(60);

/// What a supported URL points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    /// One video
    Item,
    /// A playlist
    Collection,
}

/// Classify a URL, rejecting hosts and paths the resolver cannot handle.
///
/// A watch URL carrying a `list` parameter is treated as the single video.
pub fn classify_url(url: &Url) -> Result<UrlKind, ResolveError> {
    let unsupported = || ResolveError::Unsupported(url.to_string());
    let host = url.host_str().ok_or_else(unsupported)?;
    if !SUPPORTED_HOSTS.contains(&host) {
        return Err(unsupported());
    }

    let has_param = |name: &str| url.query_pairs().any(|(k, v)| k == name && !v.is_empty());

    if host == "youtu.be" {
        let id = url.path().trim_start_matches('/');
        return if id.is_empty() { Err(unsupported()) } else { Ok(UrlKind::Item) };
    }

    match url.path() {
        "/watch" if has_param("v") => Ok(UrlKind::Item),
        "/playlist" if has_param("list") => Ok(UrlKind::Collection),
        path if path.starts_with("/shorts/") || path.starts_with("/live/") => Ok(UrlKind::Item),
        _ => Err(unsupported()),
    }
}

/// Subset of the `yt-dlp -J` output for a single video
#[derive(Debug, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    /// Seconds; absent for live streams
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub formats: Vec<FormatInfo>,
    #[serde(default)]
    pub thumbnails: Vec<ThumbnailInfo>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FormatInfo {
    pub format_id: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ThumbnailInfo {
    pub url: String,
}

/// Subset of the `yt-dlp -J --flat-playlist` output
#[derive(Debug, Deserialize)]
pub struct PlaylistInfo {
    #[serde(default)]
    pub entries: Vec<PlaylistEntry>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistEntry {
    pub id: String,
}

/// Canonical watch URL for a video id
pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

/// Pick the preferred audio-only format's stream URL
pub fn select_stream_url(formats: &[FormatInfo]) -> Option<&str> {
    PREFERRED_FORMATS.iter().find_map(|wanted| {
        formats
            .iter()
            .find(|f| f.format_id == *wanted)
            .and_then(|f| f.url.as_deref())
    })
}

/// Convert yt-dlp video metadata into a Track
pub fn track_from_info(info: VideoInfo) -> Result<Track, ResolveError> {
    let stream_url = select_stream_url(&info.formats)
        .ok_or_else(|| ResolveError::NoFormatFound(watch_url(&info.id)))?
        .to_string();

    let duration = info
        .duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(Duration::from_secs_f64)
        .unwrap_or_default();

    // yt-dlp sorts thumbnails smallest first; small is what chat wants
    let thumbnail_url = info
        .thumbnails
        .into_iter()
        .map(|t| t.url)
        .next()
        .or(info.thumbnail)
        .filter(|u| !u.is_empty());

    Ok(Track {
        artist: info
            .uploader
            .or(info.channel)
            .unwrap_or_else(|| "Unknown artist".to_string()),
        title: info.title,
        public_url: watch_url(&info.id),
        stream_url,
        duration,
        thumbnail_url,
        thumbnail: None,
    })
}

/// Resolver that shells out to yt-dlp
pub struct YtDlpResolver {
    ytdlp_path: String,
    concurrency: usize,
}

impl YtDlpResolver {
    pub fn new(ytdlp_path: impl Into<String>, concurrency: usize) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            concurrency: concurrency.max(1),
        }
    }

    /// Run yt-dlp and return its JSON stdout
    async fn dump_json(&self, extra_args: &[&str], url: &str) -> Result<Vec<u8>, ResolveError> {
        debug!(url = url, "Running yt-dlp");

        let child = Command::new(&self.ytdlp_path)
            .args(["--dump-single-json", "--no-warnings", "--skip-download"])
            .args(extra_args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(RESOLVE_TIMEOUT, child)
            .await
            .map_err(|_| ResolveError::RequestFailed(format!("yt-dlp timed out for {}", url)))?
            .map_err(|e| {
                ResolveError::RequestFailed(format!("failed to run {}: {}", self.ytdlp_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().next().unwrap_or("unknown error").trim().to_string();
            if reason.contains("Unsupported URL") {
                return Err(ResolveError::Unsupported(url.to_string()));
            }
            return Err(ResolveError::RequestFailed(reason));
        }

        Ok(output.stdout)
    }

    async fn resolve_item(&self, url: &str) -> Result<Track, ResolveError> {
        let json = self.dump_json(&["--no-playlist"], url).await?;
        let info: VideoInfo = serde_json::from_slice(&json)
            .map_err(|e| ResolveError::RequestFailed(format!("invalid yt-dlp output: {}", e)))?;
        track_from_info(info)
    }

    async fn resolve_collection(&self, url: &str) -> Result<Vec<Track>, ResolveError> {
        let json = self.dump_json(&["--flat-playlist"], url).await?;
        let playlist: PlaylistInfo = serde_json::from_slice(&json)
            .map_err(|e| ResolveError::RequestFailed(format!("invalid yt-dlp output: {}", e)))?;

        if playlist.entries.is_empty() {
            return Err(ResolveError::RequestFailed(format!("playlist {} is empty", url)));
        }

        debug!(entries = playlist.entries.len(), "Resolving playlist entries");

        let urls: Vec<String> = playlist.entries.iter().map(|e| watch_url(&e.id)).collect();
        collect_in_order(urls, self.concurrency, |entry_url| async move {
            self.resolve_item(&entry_url).await
        })
        .await
    }
}

#[async_trait]
impl Resolver for YtDlpResolver {
    async fn resolve(&self, url: &Url) -> Result<Vec<Track>, ResolveError> {
        match classify_url(url)? {
            UrlKind::Item => Ok(vec![self.resolve_item(url.as_str()).await?]),
            UrlKind::Collection => self.resolve_collection(url.as_str()).await,
        }
    }
}
