//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::display::DisplayMode;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Audio configuration
    pub audio: AudioConfig,

    /// UI configuration
    pub ui: UiConfig,
}

/// Audio configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device ID (system default when unset)
    pub input_device: Option<String>,

    /// Output device ID for pass-through (system default when unset)
    pub output_device: Option<String>,

    /// Requested sample rate (device default when unset)
    pub sample_rate: Option<u32>,

    /// Fixed callback buffer size in frames (host default when unset)
    pub buffer_size: Option<u32>,

    /// Replay the metered signal to the output device
    pub pass_through: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            output_device: None,
            sample_rate: None,
            buffer_size: None,
            pass_through: true,
        }
    }
}

/// UI configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Bind address for web server
    pub bind_address: String,

    /// HTTP server port
    pub http_port: u16,

    /// How often consumers poll the reading, in Hz
    pub poll_hz: u32,

    /// Selected rendering
    pub display_mode: DisplayMode,

    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            http_port: DEFAULT_HTTP_PORT,
            poll_hz: DEFAULT_POLL_HZ,
            display_mode: DisplayMode::default(),
            enable_cors: true,
        }
    }
}

impl UiConfig {
    /// Poll period derived from `poll_hz` (a zero rate falls back to the default)
    pub fn poll_interval(&self) -> std::time::Duration {
        let hz = if self.poll_hz == 0 {
            DEFAULT_POLL_HZ
        } else {
            self.poll_hz
        };
        std::time::Duration::from_secs_f64(1.0 / hz as f64)
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from `path`, or return defaults when the file does not exist yet
    pub fn load_or_default(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Get default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "vu-meter", "vu-meter")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
