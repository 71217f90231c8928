//! Audio path
//!
//! **Components:**
//! - `sink`: [`Playable`] / [`AudioSink`] contracts consumed by the engine
//! - `ffmpeg`: decodes a track's stream URL to PCM and applies live gain
//! - `output`: shared PCM channel drained into the output command

pub mod ffmpeg;
pub mod output;
pub mod sink;

pub use ffmpeg::{apply_gain, FfmpegSink};
pub use output::PcmOutput;
pub use sink::{AudioSink, Playable};
