//! Application configuration
//!
//! Loaded from `config.toml` in the platform config directory
//! (`directories::ProjectDirs`). Every section falls back to its defaults,
//! so a partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub transport: TransportConfig,
    pub capture: CaptureConfig,
    pub playback: PlaybackConfig,
    pub session: SessionConfig,
}

/// WebSocket endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub url: String,
    pub connect_timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

/// How capture audio reaches the wire rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownsampleMode {
    /// Capture at `sample_rate` and box-filter down to 16 kHz
    Resample,
    /// Ask the device for 16 kHz directly
    Native,
}

/// Microphone settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// cpal device id (`input:<name>`), default input device if unset
    pub device_id: Option<String>,
    pub sample_rate: u32,
    /// Frames per capture block
    pub block_size: usize,
    pub downsample: DownsampleMode,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            sample_rate: DEFAULT_CAPTURE_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            downsample: DownsampleMode::Resample,
        }
    }
}

impl CaptureConfig {
    /// Rate to request from the capture device
    pub fn requested_rate(&self) -> u32 {
        match self.downsample {
            DownsampleMode::Resample => self.sample_rate,
            DownsampleMode::Native => TARGET_SAMPLE_RATE,
        }
    }
}

/// Playback reconstruction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackMode {
    /// Play every chunk as it arrives
    Streaming,
    /// Collect chunks and play them as one WAV clip on request
    Buffered,
}

/// Speaker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub mode: PlaybackMode,
    /// cpal device id (`output:<name>`), default output device if unset
    pub device_id: Option<String>,
    pub queue_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            mode: PlaybackMode::Streaming,
            device_id: None,
            queue_capacity: PLAYBACK_QUEUE_CAPACITY,
        }
    }
}

/// When the microphone starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStart {
    OnConnect,
    Manual,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub capture_start: CaptureStart,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture_start: CaptureStart::OnConnect,
        }
    }
}

impl AppConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "voicelink")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the default location, or defaults when there is no file
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.capture.block_size == 0 {
            return Err(Error::Config("capture.block_size must be positive".into()));
        }
        if self.capture.sample_rate == 0 {
            return Err(Error::Config("capture.sample_rate must be positive".into()));
        }
        if self.playback.queue_capacity == 0 {
            return Err(Error::Config("playback.queue_capacity must be positive".into()));
        }
        let url = &self.transport.url;
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            return Err(Error::Config(format!("transport.url must be ws:// or wss://, got {}", url)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [playback]
            mode = "buffered"

            [session]
            capture_start = "manual"
            "#,
        )
        .unwrap();

        assert_eq!(config.playback.mode, PlaybackMode::Buffered);
        assert_eq!(config.session.capture_start, CaptureStart::Manual);
        assert_eq!(config.transport.url, DEFAULT_URL);
        assert_eq!(config.capture.block_size, DEFAULT_BLOCK_SIZE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_native_mode_requests_target_rate() {
        let mut capture = CaptureConfig::default();
        assert_eq!(capture.requested_rate(), 48000);

        capture.downsample = DownsampleMode::Native;
        assert_eq!(capture.requested_rate(), TARGET_SAMPLE_RATE);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.capture.block_size = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.transport.url = "http://localhost:8000".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("voicelink-config-{}", std::process::id()));
        let path = dir.join("config.toml");

        let mut config = AppConfig::default();
        config.capture.block_size = 1024;
        config.playback.mode = PlaybackMode::Buffered;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.capture.block_size, 1024);
        assert_eq!(loaded.playback.mode, PlaybackMode::Buffered);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
