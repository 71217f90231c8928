//! ffmpeg-backed audio sink
//!
//! Each bound track spawns its own `ffmpeg` process that decodes the stream
//! URL to interleaved signed 16-bit little-endian PCM. Frames are scaled by
//! the handle's current gain and pushed into the shared output channel, so a
//! volume change is audible within one frame.

use super::sink::{AudioSink, Playable};
use crate::error::{Error, Result};
use crate::track::Track;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Frames per second pushed to the output (20 ms frames)
const FRAMES_PER_SECOND: u32 = 50;

/// Scale signed 16-bit little-endian samples by `gain`.
///
/// Samples saturate at the i16 range. A trailing odd byte is dropped.
pub fn apply_gain(pcm: &[u8], gain: f32) -> Vec<u8> {
    if (gain - 1.0).abs() < f32::EPSILON {
        return pcm[..pcm.len() & !1].to_vec();
    }

    let mut scaled = Vec::with_capacity(pcm.len());
    for sample in pcm.chunks_exact(2) {
        let value = i16::from_le_bytes([sample[0], sample[1]]) as f32 * gain;
        let clamped = value.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16;
        scaled.extend_from_slice(&clamped.to_le_bytes());
    }
    scaled
}

/// Binds tracks to ffmpeg decoders feeding one PCM channel
pub struct FfmpegSink {
    ffmpeg_path: PathBuf,
    sample_rate: u32,
    channels: u16,
    output: mpsc::Sender<Vec<u8>>,
}

impl FfmpegSink {
    pub fn new(
        ffmpeg_path: impl Into<PathBuf>,
        sample_rate: u32,
        channels: u16,
        output: mpsc::Sender<Vec<u8>>,
    ) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            sample_rate,
            channels,
            output,
        }
    }

    fn frame_bytes(&self) -> usize {
        let frames = (self.sample_rate / FRAMES_PER_SECOND).max(1) as usize;
        frames * self.channels.max(1) as usize * 2
    }
}

impl AudioSink for FfmpegSink {
    fn bind(&self, track: &Track) -> Result<Arc<dyn Playable>> {
        if track.stream_url.is_empty() {
            return Err(Error::Audio(format!("{} has no stream URL", track.label())));
        }

        Ok(Arc::new(FfmpegPlayable {
            ffmpeg_path: self.ffmpeg_path.clone(),
            stream_url: track.stream_url.clone(),
            sample_rate: self.sample_rate,
            channels: self.channels,
            frame_bytes: self.frame_bytes(),
            output: self.output.clone(),
            gain_bits: AtomicU32::new(1.0f32.to_bits()),
            cancel: CancellationToken::new(),
        }))
    }
}

/// One track's decoder process and gain
pub struct FfmpegPlayable {
    ffmpeg_path: PathBuf,
    stream_url: String,
    sample_rate: u32,
    channels: u16,
    frame_bytes: usize,
    output: mpsc::Sender<Vec<u8>>,
    /// f32 gain stored as bits so the hot path never locks
    gain_bits: AtomicU32,
    cancel: CancellationToken,
}

impl FfmpegPlayable {
    fn gain(&self) -> f32 {
        f32::from_bits(self.gain_bits.load(Ordering::Relaxed))
    }

    fn decoder_command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(["-hide_banner", "-loglevel", "error"])
            .args(["-reconnect", "1", "-reconnect_streamed", "1"])
            .arg("-i")
            .arg(&self.stream_url)
            .args(["-f", "s16le"])
            .arg("-ar")
            .arg(self.sample_rate.to_string())
            .arg("-ac")
            .arg(self.channels.to_string())
            .arg("-")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

/// Fill `frame` unless the reader hits EOF first; returns bytes read
async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R, frame: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < frame.len() {
        let n = reader.read(&mut frame[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[async_trait]
impl Playable for FfmpegPlayable {
    fn set_volume(&self, volume: f32) {
        self.gain_bits
            .store(volume.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    async fn play(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        let mut child = self.decoder_command().spawn().map_err(|e| {
            Error::Audio(format!("failed to spawn {}: {}", self.ffmpeg_path.display(), e))
        })?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Audio("decoder stdout not captured".to_string()))?;

        // Keep stderr drained so ffmpeg never blocks on a full pipe
        let stderr_task = child.stderr.take().map(|mut stderr| {
            tokio::spawn(async move {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text).await;
                text
            })
        });

        debug!(stream_url = %self.stream_url, "Decoder started");

        let mut frame = vec![0u8; self.frame_bytes];
        loop {
            let filled = tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Decoder stopped");
                    return Ok(());
                }
                read = read_frame(&mut stdout, &mut frame) => read?,
            };
            if filled == 0 {
                break;
            }

            let pcm = apply_gain(&frame[..filled], self.gain());
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Decoder stopped");
                    return Ok(());
                }
                sent = self.output.send(pcm) => {
                    if sent.is_err() {
                        return Err(Error::Audio("audio output closed".to_string()));
                    }
                }
            }
        }

        let status = child.wait().await?;
        if status.success() {
            return Ok(());
        }

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        warn!(status = %status, "Decoder exited abnormally");
        Err(Error::Audio(format!(
            "ffmpeg exited with {}: {}",
            status,
            stderr.trim()
        )))
    }

    fn stop(&self) {
        self.cancel.cancel();
    }
}
