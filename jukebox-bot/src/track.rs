//! Track model
//!
//! A [`Track`] is the immutable metadata for one playable item. The resolver
//! creates it, the thumbnail fetcher attaches artwork before it is queued,
//! and the playback loop binds it to a playable handle when it is dequeued
//! (see [`crate::state::CurrentTrack`]).

use jukebox_common::human_time::format_clock;
use std::time::Duration;

/// Downloaded thumbnail, ready to inline into chat HTML
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    /// URL the image was downloaded from
    pub source_url: String,
    /// Content type reported by the image host (e.g. `image/jpeg`)
    pub mime_type: String,
    /// Base64 (standard alphabet) encoding of the image bytes
    pub encoded: String,
}

impl Thumbnail {
    /// `data:` URI for use as an `<img src>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.encoded)
    }
}

/// Resolved metadata for one playable item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub title: String,
    pub artist: String,
    /// Canonical link shown to users
    pub public_url: String,
    /// Direct audio stream handed to the audio sink
    pub stream_url: String,
    /// Zero for live streams
    pub duration: Duration,
    /// Where the thumbnail can be fetched from, if the source has one
    pub thumbnail_url: Option<String>,
    /// Attached by the thumbnail fetcher before the track is queued
    pub thumbnail: Option<Thumbnail>,
}

impl Track {
    /// Attach a downloaded thumbnail
    pub fn with_thumbnail(mut self, thumbnail: Thumbnail) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }

    /// Short plain-text label for logs and events
    pub fn label(&self) -> String {
        format!("{} by {}", self.title, self.artist)
    }

    /// Chat card: link, title, artist, duration and inline thumbnail
    pub fn card(&self) -> String {
        let url = escape_html(&self.public_url);
        let mut card = format!("<a href=\"{url}\">{url}</a><br>");
        card.push_str(&format!(
            "<h3 style=\"margin: 0px; padding: 0px;\"><a style=\"margin: 0px; padding: 0px;\" href=\"{}\">{}</a></h3>",
            url,
            escape_html(&self.title)
        ));
        card.push_str(&format!(
            "<h4 style=\"margin: 0px; padding: 0px;\"> by {}</h4>",
            escape_html(&self.artist)
        ));
        card.push_str(&format!("{}<br>", format_clock(self.duration)));
        if let Some(thumbnail) = &self.thumbnail {
            card.push_str(&format!(
                "<img style=\"float: left; padding:0px;\" src=\"{}\"/><br>",
                thumbnail.data_uri()
            ));
        }
        card
    }
}

/// Escape the characters that would break out of chat HTML
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
