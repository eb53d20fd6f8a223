// src/config.rs
//! Converter configuration with file-based storage

use crate::error::{ConvertError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Time gap that finalizes the current track and starts a new one, in seconds
    pub gap_seconds: u64,
    /// Fixes closer than this (seconds) AND `dedup_coord_delta` to the previous
    /// fix of the same stream are dropped as duplicates
    pub dedup_seconds: f64,
    /// Coordinate delta (degrees) below which two fixes count as the same point
    pub dedup_coord_delta: f64,
    /// Line width used for track styles in the output KML
    pub line_width: u32,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            gap_seconds: 600,
            dedup_seconds: 1.0,
            dedup_coord_delta: 0.0001,
            line_width: 3,
        }
    }
}

impl ConvertConfig {
    /// Load configuration from the config file, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| ConvertError::Other(format!("Failed to read config file: {}", e)))?;

        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            ConvertError::Parse(format!("config file {}: {}", config_path.display(), e))
        })?;

        Ok(config)
    }

    /// Save configuration to the config file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConvertError::Other(format!("Failed to create config directory: {}", e)))?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ConvertError::Other(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(&config_path, contents)
            .map_err(|e| ConvertError::Other(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_config_path() -> Result<std::path::PathBuf> {
        use std::path::PathBuf;

        let home = std::env::var("HOME")
            .map_err(|_| ConvertError::Other("HOME environment variable not set".to_string()))?;

        Ok(PathBuf::from(home).join(".config").join("nmea2kml").join("config.json"))
    }

    /// Override the gap threshold, given in whole minutes
    pub fn set_gap_minutes(&mut self, minutes: u64) {
        self.gap_seconds = minutes * 60;
    }
}
