//! jukebox-bot configuration
//!
//! # Configuration Priority
//!
//! 1. Command-line arguments / their environment variables (highest)
//! 2. TOML configuration file (see [`jukebox_common::config`] for discovery)
//! 3. Built-in defaults (lowest)

use crate::error::{Error, Result};
use jukebox_common::config::{load_toml_or_default, resolve_config_path, LoggingConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Bot configuration (TOML file contents)
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BotConfig {
    /// Name the bot speaks under in chat
    pub username: String,
    pub command_prefix: String,
    /// Empty disables `search`
    pub youtube_api_key: String,
    /// Percent, 0-100
    pub default_volume: u8,
    pub audio: AudioConfig,
    pub resolver: ResolverConfig,
    pub logging: LoggingConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            username: "music_bot".to_string(),
            command_prefix: "!".to_string(),
            youtube_api_key: String::new(),
            default_volume: 60,
            audio: AudioConfig::default(),
            resolver: ResolverConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub ffmpeg_path: PathBuf,
    /// Program and arguments that read raw PCM on stdin
    pub output_command: Vec<String>,
    pub sample_rate: u32,
    pub channels: u16,
    /// PCM frames (20 ms each) buffered ahead of the output command
    pub buffer_frames: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            output_command: ["aplay", "-q", "-t", "raw", "-f", "S16_LE", "-r", "48000", "-c", "2"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sample_rate: 48000,
            channels: 2,
            buffer_frames: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    pub ytdlp_path: String,
    /// Collection entries resolved at once
    pub concurrency: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: "yt-dlp".to_string(),
            concurrency: 8,
        }
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub default_volume: Option<u8>,
    pub youtube_api_key: Option<String>,
}

impl BotConfig {
    /// Discover, parse, override and validate
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let path = resolve_config_path(overrides.config_path.as_deref());
        let mut config = Self::from_file(path.as_deref())?;

        if let Some(volume) = overrides.default_volume {
            config.default_volume = volume;
        }
        if let Some(key) = overrides.youtube_api_key {
            config.youtube_api_key = key;
        }

        config.validate()?;
        if let Some(path) = &path {
            info!("Configuration loaded from {}", path.display());
        }
        Ok(config)
    }

    /// Parse a config file; a missing file yields defaults
    pub fn from_file(path: Option<&Path>) -> Result<Self> {
        load_toml_or_default(path).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_volume > 100 {
            return Err(Error::Config("The volume must be between 0 and 100".to_string()));
        }
        if self.command_prefix.is_empty() {
            return Err(Error::Config("command_prefix must not be empty".to_string()));
        }
        if self.audio.output_command.is_empty() {
            return Err(Error::Config("audio.output_command must not be empty".to_string()));
        }
        if self.audio.sample_rate == 0 || self.audio.channels == 0 {
            return Err(Error::Config(
                "audio.sample_rate and audio.channels must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn search_enabled(&self) -> bool {
        !self.youtube_api_key.is_empty()
    }

    /// Default volume as a fraction
    pub fn volume_fraction(&self) -> f32 {
        f32::from(self.default_volume) / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.username, "music_bot");
        assert_eq!(config.command_prefix, "!");
        assert_eq!(config.default_volume, 60);
        assert_eq!(config.audio.output_command[0], "aplay");
        assert_eq!(config.resolver.concurrency, 8);
        assert!(!config.search_enabled());
        assert!((config.volume_fraction() - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"
            command_prefix = "?"
            youtube_api_key = "key"

            [audio]
            sample_rate = 44100
            "#,
        );

        let config = BotConfig::from_file(Some(file.path())).unwrap();
        assert_eq!(config.command_prefix, "?");
        assert!(config.search_enabled());
        assert_eq!(config.audio.sample_rate, 44100);
        assert_eq!(config.audio.channels, 2);
        assert_eq!(config.username, "music_bot");
    }

    #[test]
    fn test_volume_over_100_rejected() {
        let file = write_config("default_volume = 150\n");
        let overrides = ConfigOverrides {
            config_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        assert!(matches!(BotConfig::load(overrides), Err(Error::Config(_))));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let file = write_config("default_volume = \"loud\"\n");
        assert!(matches!(
            BotConfig::from_file(Some(file.path())),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_overrides_win() {
        let file = write_config("default_volume = 20\nyoutube_api_key = \"from-file\"\n");
        let config = BotConfig::load(ConfigOverrides {
            config_path: Some(file.path().to_path_buf()),
            default_volume: Some(90),
            youtube_api_key: Some("from-cli".to_string()),
        })
        .unwrap();

        assert_eq!(config.default_volume, 90);
        assert_eq!(config.youtube_api_key, "from-cli");
    }

    #[test]
    fn test_missing_explicit_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BotConfig::load(ConfigOverrides {
            config_path: Some(dir.path().join("absent.toml")),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config, BotConfig::default());
    }
}
