// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::detector::Symbology;
use crate::constants::{app_info, capture, timing};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Scanner configuration
///
/// Stored as JSON in `$XDG_CONFIG_HOME/barcode-scanner/config.json`. Every
/// field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum time between detection attempts
    pub detection_interval_ms: u64,
    /// Delay between releasing one camera and opening the next
    pub device_switch_settle_ms: u64,
    /// Preferred capture width
    pub ideal_width: u32,
    /// Preferred capture height
    pub ideal_height: u32,
    /// Frame callback rate of the detection loop
    pub frame_rate_hz: u32,
    /// Barcode formats to decode
    pub symbologies: Vec<Symbology>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            detection_interval_ms: timing::DETECTION_INTERVAL_MS,
            device_switch_settle_ms: timing::DEVICE_SWITCH_SETTLE_MS,
            ideal_width: capture::IDEAL_WIDTH,
            ideal_height: capture::IDEAL_HEIGHT,
            frame_rate_hz: timing::FRAME_RATE_HZ,
            symbologies: Symbology::RETAIL.to_vec(),
        }
    }
}

impl Config {
    /// Default config file location
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(app_info::APP_NAME).join("config.json"))
    }

    /// Load the config, falling back to defaults
    ///
    /// A missing file is normal. An unreadable or malformed file is logged
    /// and ignored.
    pub fn load() -> Self {
        let Some(path) = Self::path() else {
            debug!("No config directory, using defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring invalid config file");
                Self::default()
            }
        }
    }

    /// Load from a specific file
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Write to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.symbologies.is_empty() {
            return Err(AppError::Config("symbologies must not be empty".into()));
        }
        if self.frame_rate_hz == 0 {
            return Err(AppError::Config("frame_rate_hz must be positive".into()));
        }
        if self.ideal_width == 0 || self.ideal_height == 0 {
            return Err(AppError::Config("ideal resolution must be non-zero".into()));
        }
        Ok(())
    }

    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.detection_interval_ms)
    }

    pub fn device_switch_settle(&self) -> Duration {
        Duration::from_millis(self.device_switch_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{ "detection_interval_ms": 350 }"#).unwrap();
        assert_eq!(config.detection_interval(), Duration::from_millis(350));
        assert_eq!(config.device_switch_settle_ms, 100);
        assert_eq!(config.symbologies, Symbology::RETAIL.to_vec());
    }

    #[test]
    fn test_empty_symbologies_are_invalid() {
        let config = Config {
            symbologies: Vec::new(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
