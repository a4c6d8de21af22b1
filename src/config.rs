// SPDX-License-Identifier: GPL-3.0-only

use crate::constants::DEFAULT_COUNTDOWN_SECONDS;
use crate::errors::{AppError, AppResult};
use crate::session::SessionTiming;
use crate::storage::DirectoryDownloads;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory name under the user's config dir
pub const CONFIG_DIR: &str = "photobooth";

/// Config file name inside [`CONFIG_DIR`]
pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Countdown before each capture, in seconds
    pub countdown_seconds: u32,
    /// Mirror the preview and the captures
    pub mirror_preview: bool,
    /// Record a clip alongside the stills
    pub record_video: bool,
    /// V4L2 device path (e.g. `/dev/video0`); `None` picks the default camera
    pub camera_device: Option<String>,
    /// Strip artwork; `None` uses the built-in strip
    pub template_path: Option<PathBuf>,
    /// Extra strips offered as thumbnails
    pub alternate_templates: Vec<PathBuf>,
    /// Where downloads go; `None` uses the download directory
    pub output_dir: Option<PathBuf>,
    /// Give up on a camera that never reports its size
    pub metadata_timeout_secs: Option<u64>,
    /// Width the main strip is displayed at
    pub display_width: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            countdown_seconds: DEFAULT_COUNTDOWN_SECONDS,
            mirror_preview: false,
            record_video: true,
            camera_device: None,
            template_path: None,
            alternate_templates: Vec::new(),
            output_dir: None,
            metadata_timeout_secs: None,
            display_width: 400.0,
        }
    }
}

impl Config {
    /// `$XDG_CONFIG_HOME/photobooth/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                let config: Config = serde_json::from_str(&contents)?;
                debug!(path = %path.display(), "Config loaded");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(AppError::Config(format!("{}: {}", path.display(), e))),
        }
    }

    /// Load from the default location
    pub fn load() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Countdown to run with; zero falls back to the default
    pub fn countdown(&self) -> u32 {
        match self.countdown_seconds {
            0 => DEFAULT_COUNTDOWN_SECONDS,
            seconds => seconds,
        }
    }

    /// Session waits derived from this config
    pub fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            metadata_timeout: self.metadata_timeout_secs.map(Duration::from_secs),
            ..SessionTiming::default()
        }
    }

    /// Directory downloads are written to
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(DirectoryDownloads::default_dir)
    }
}
