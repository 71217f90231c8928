//! Jukebox bot - main entry point
//!
//! Wires the production collaborators (yt-dlp resolver, HTTP thumbnail
//! fetcher, optional YouTube search, ffmpeg audio sink) into one playback
//! engine and serves chat commands from the console until shutdown.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use jukebox_bot::audio::{FfmpegSink, PcmOutput};
use jukebox_bot::config::{BotConfig, ConfigOverrides};
use jukebox_bot::playback::{Collaborators, EngineOptions, PlaybackEngine, MAX_QUEUE_SIZE};
use jukebox_bot::router::CommandRouter;
use jukebox_bot::session::ConsoleSession;
use jukebox_bot::sources::{HttpThumbnailFetcher, Searcher, YoutubeSearcher, YtDlpResolver};
use jukebox_common::EventBus;
use tokio::io::BufReader;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for the jukebox bot
#[derive(Parser, Debug)]
#[command(name = "jukebox")]
#[command(about = "Chat-driven music relay")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "JUKEBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Initial volume (0-100), overrides the config file
    #[arg(long, env = "JUKEBOX_VOLUME")]
    volume: Option<u8>,

    /// YouTube Data API key, overrides the config file
    #[arg(long, env = "JUKEBOX_YOUTUBE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

/// Filter directive for a configured level
///
/// A bare level applies to both jukebox crates; anything else is passed
/// through as a full directive.
fn filter_directive(level: &str) -> String {
    let level = level.trim();
    if level.is_empty() {
        "jukebox_bot=info,jukebox_common=info".to_string()
    } else if level.contains('=') || level.contains(',') {
        level.to_string()
    } else {
        format!("jukebox_bot={0},jukebox_common={0}", level)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = BotConfig::load(ConfigOverrides {
        config_path: args.config,
        default_volume: args.volume,
        youtube_api_key: args.api_key,
    })
    .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter_directive(&config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "Starting jukebox {} (git {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("JUKEBOX_GIT_HASH"),
        env!("JUKEBOX_BUILT_AT")
    );
    info!(
        username = %config.username,
        prefix = %config.command_prefix,
        volume = config.default_volume,
        "Configuration ready"
    );

    let fetcher = HttpThumbnailFetcher::new().context("Failed to build HTTP client")?;
    let resolver = YtDlpResolver::new(&config.resolver.ytdlp_path, config.resolver.concurrency);

    let searcher: Option<Arc<dyn Searcher>> = if config.search_enabled() {
        let searcher = YoutubeSearcher::new(config.youtube_api_key.clone())
            .context("Failed to build search client")?;
        Some(Arc::new(searcher))
    } else {
        warn!("No YouTube API key configured, search is disabled");
        None
    };

    let output = PcmOutput::new(config.audio.output_command.clone(), config.audio.buffer_frames)
        .context("Failed to start audio output")?;
    let sink = FfmpegSink::new(
        &config.audio.ffmpeg_path,
        config.audio.sample_rate,
        config.audio.channels,
        output.sender(),
    );

    let events = Arc::new(EventBus::default());
    let engine = Arc::new(PlaybackEngine::new(
        Collaborators {
            resolver: Arc::new(resolver),
            fetcher: Arc::new(fetcher),
            searcher,
            sink: Arc::new(sink),
        },
        Arc::clone(&events),
        EngineOptions {
            default_volume: config.volume_fraction(),
            queue_capacity: MAX_QUEUE_SIZE,
        },
    ));
    info!("Playback engine initialized");

    let router = Arc::new(CommandRouter::new(Arc::clone(&engine), config.command_prefix.clone()));
    let session = ConsoleSession::new(router, events, config.username.clone());

    let shutdown = CancellationToken::new();
    let mut session_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            session
                .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), shutdown)
                .await
        })
    };

    // Runs until a signal arrives or chat input ends
    let finished = tokio::select! {
        _ = shutdown_signal() => {
            shutdown.cancel();
            None
        }
        finished = &mut session_task => Some(finished),
    };

    if engine.is_playing() {
        if let Err(e) = engine.stop().await {
            warn!("Could not stop playback cleanly: {}", e);
        }
    }

    let finished = match finished {
        Some(finished) => finished,
        None => session_task.await,
    };
    match finished {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Chat session ended with error: {}", e),
        Err(e) => warn!("Chat session task failed: {}", e),
    }

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
