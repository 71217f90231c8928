//! PCM output
//!
//! Every playable handle writes frames into one bounded channel. A single
//! writer task drains it into the stdin of the configured output command
//! (by default `aplay` reading raw S16_LE). The command is spawned lazily on
//! the first frame and respawned after a write failure. Failed spawns back
//! off exponentially; frames arriving in the meantime are dropped.

use crate::error::{Error, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Shared PCM channel and its writer task
pub struct PcmOutput {
    tx: mpsc::Sender<Vec<u8>>,
    writer: JoinHandle<()>,
}

impl PcmOutput {
    /// Spawn the writer task.
    ///
    /// `buffer_frames` bounds the channel; producers wait when it is full.
    pub fn new(command: Vec<String>, buffer_frames: usize) -> Result<Self> {
        if command.first().map_or(true, |program| program.is_empty()) {
            return Err(Error::Config("audio output_command is empty".to_string()));
        }

        let (tx, rx) = mpsc::channel(buffer_frames.max(1));
        let writer = tokio::spawn(run_writer(command, rx));
        Ok(Self { tx, writer })
    }

    /// Sender for decoders to push frames into
    pub fn sender(&self) -> mpsc::Sender<Vec<u8>> {
        self.tx.clone()
    }

    /// Close this handle's sender and wait for the writer to flush.
    ///
    /// Returns once every other sender has been dropped too.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.writer.await {
            warn!("PCM writer task failed: {}", e);
        }
    }
}

const FIRST_RETRY: Duration = Duration::from_secs(1);
const MAX_RETRY: Duration = Duration::from_secs(30);

/// Spawn retry schedule for the output command
struct SpawnBackoff {
    delay: Duration,
    retry_at: Option<Instant>,
    dropped: u64,
}

impl SpawnBackoff {
    fn new() -> Self {
        Self {
            delay: FIRST_RETRY,
            retry_at: None,
            dropped: 0,
        }
    }

    /// False while waiting out a failed spawn; the frame counts as dropped
    fn should_attempt(&mut self, now: Instant) -> bool {
        match self.retry_at {
            Some(at) if now < at => {
                self.dropped += 1;
                false
            }
            _ => true,
        }
    }

    /// Schedule the next attempt, doubling the wait up to [`MAX_RETRY`]
    fn failed(&mut self, now: Instant) -> Duration {
        let wait = self.delay;
        self.retry_at = Some(now + wait);
        self.delay = (self.delay * 2).min(MAX_RETRY);
        self.dropped += 1;
        wait
    }

    /// Reset after a successful spawn; returns frames dropped meanwhile
    fn succeeded(&mut self) -> u64 {
        self.delay = FIRST_RETRY;
        self.retry_at = None;
        std::mem::take(&mut self.dropped)
    }
}

struct OutputProcess {
    child: Child,
    stdin: ChildStdin,
}

fn spawn_output(command: &[String]) -> Result<OutputProcess> {
    let (program, args) = command
        .split_first()
        .ok_or_else(|| Error::Config("audio output_command is empty".to_string()))?;

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| Error::Audio(format!("failed to spawn {}: {}", program, e)))?;
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| Error::Audio("output stdin not captured".to_string()))?;

    info!(program = %program, "Audio output started");
    Ok(OutputProcess { child, stdin })
}

async fn run_writer(command: Vec<String>, mut rx: mpsc::Receiver<Vec<u8>>) {
    let mut output: Option<OutputProcess> = None;
    let mut backoff = SpawnBackoff::new();

    while let Some(frame) = rx.recv().await {
        if output.is_none() {
            if !backoff.should_attempt(Instant::now()) {
                continue;
            }
            match spawn_output(&command) {
                Ok(process) => {
                    let dropped = backoff.succeeded();
                    if dropped > 0 {
                        info!(dropped = dropped, "Audio output recovered");
                    }
                    output = Some(process);
                }
                Err(e) => {
                    let wait = backoff.failed(Instant::now());
                    warn!("{}; retrying in {:?}", e, wait);
                    continue;
                }
            }
        }

        if let Some(process) = output.as_mut() {
            if let Err(e) = process.stdin.write_all(&frame).await {
                warn!("Audio output write failed, restarting: {}", e);
                if let Some(mut dead) = output.take() {
                    let _ = dead.child.kill().await;
                }
            }
        }
    }

    debug!("PCM channel closed");
    if let Some(OutputProcess { mut child, stdin }) = output {
        drop(stdin);
        if let Err(e) = child.wait().await {
            warn!("Audio output did not exit cleanly: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_command_is_config_error() {
        assert!(matches!(PcmOutput::new(vec![], 4), Err(Error::Config(_))));
        assert!(matches!(
            PcmOutput::new(vec![String::new()], 4),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_frames_reach_output_command_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcm.raw");
        let command = vec![
            "sh".to_string(),
            "-c".to_string(),
            format!("cat > '{}'", path.display()),
        ];

        let output = PcmOutput::new(command, 4).unwrap();
        let tx = output.sender();
        tx.send(vec![1, 2]).await.unwrap();
        tx.send(vec![3, 4, 5, 6]).await.unwrap();
        drop(tx);
        output.close().await;

        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_failed_spawn_waits_before_retrying() {
        let start = Instant::now();
        let mut backoff = SpawnBackoff::new();
        assert!(backoff.should_attempt(start));

        assert_eq!(backoff.failed(start), FIRST_RETRY);
        // One 20 ms frame after another: no attempts until the delay passes
        for i in 1..50 {
            assert!(!backoff.should_attempt(start + Duration::from_millis(20 * i)));
        }
        assert!(backoff.should_attempt(start + FIRST_RETRY));

        assert_eq!(backoff.failed(start + FIRST_RETRY), FIRST_RETRY * 2);
        assert!(!backoff.should_attempt(start + FIRST_RETRY * 2));
        assert!(backoff.should_attempt(start + FIRST_RETRY * 3));

        assert_eq!(backoff.succeeded(), 52);
        assert!(backoff.should_attempt(start + FIRST_RETRY * 3));
    }

    #[test]
    fn test_backoff_is_capped() {
        let now = Instant::now();
        let mut backoff = SpawnBackoff::new();
        for _ in 0..10 {
            backoff.failed(now);
        }
        assert_eq!(backoff.failed(now), MAX_RETRY);
    }

    #[tokio::test]
    async fn test_missing_program_drops_frames_without_panicking() {
        let output = PcmOutput::new(vec!["/nonexistent/aplay".to_string()], 2).unwrap();
        let tx = output.sender();
        tx.send(vec![0; 4]).await.unwrap();
        drop(tx);
        output.close().await;
    }
}
