// SPDX-License-Identifier: GPL-3.0-only

//! Persistent user configuration
//!
//! Stored as JSON under the user's config directory. A missing or unreadable
//! file yields defaults; unknown or missing keys fall back per field.

use crate::backends::camera::types::{CameraBackendType, LensFacing};
use crate::constants;
use crate::errors::{AppError, AppResult};
use crate::pipelines::photo::EncodingQuality;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Current on-disk schema version
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema version the file was written with
    pub version: u32,
    /// Camera backend to use
    pub backend: CameraBackendType,
    /// Lens facing requested when binding
    pub lens_facing: LensFacing,
    /// Directory name under the pictures directory
    pub app_name: String,
    /// JPEG quality preset for captured photos
    pub photo_quality: EncodingQuality,
    /// Upper bound on the bound stream size, in pixels
    pub max_capture_pixels: u64,
    /// Seconds a tap-to-focus lock is held before continuous AF resumes
    pub focus_auto_cancel_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            backend: CameraBackendType::default(),
            lens_facing: LensFacing::Back,
            app_name: constants::APP_NAME.to_string(),
            photo_quality: EncodingQuality::High,
            max_capture_pixels: constants::DEFAULT_MAX_CAPTURE_PIXELS,
            focus_auto_cancel_secs: constants::FOCUS_AUTO_CANCEL.as_secs(),
        }
    }
}

impl Config {
    /// Default location: `<config dir>/viewfinder/config.json`
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("viewfinder").join("config.json"))
    }

    /// Load from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&contents)?;
        if config.version > CONFIG_VERSION {
            return Err(AppError::Config(format!(
                "config version {} is newer than supported version {}",
                config.version, CONFIG_VERSION
            )));
        }
        config.version = CONFIG_VERSION;
        Ok(config)
    }

    /// Save to the default location
    pub fn save(&self) -> AppResult<()> {
        let path = Self::config_path()
            .ok_or_else(|| AppError::Config("no config directory".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    pub fn focus_auto_cancel(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.focus_auto_cancel_secs)
    }
}
