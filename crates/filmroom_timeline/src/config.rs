// SPDX-License-Identifier: MIT OR Apache-2.0
//! Review configuration.
//!
//! Stored as RON next to the game documents:
//!
//! ```ron
//! TimelineConfig(
//!     version: 1,
//!     grid_ms: 100,
//!     max_lanes: 4,
//!     auto_skip_gaps: true,
//!     history_depth: 100,
//! )
//! ```

use crate::time::{Millis, DEFAULT_GRID_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current config format version
pub const CONFIG_FORMAT_VERSION: u32 = 1;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "filmroom.ron";

/// Timeline and review settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Format version
    pub version: u32,
    /// Snap grid for computed positions (0 disables snapping)
    pub grid_ms: Millis,
    /// Camera-count ceiling (set by the subscription tier)
    pub max_lanes: u8,
    /// Jump the logical clock over coverage gaps on the live lane
    pub auto_skip_gaps: bool,
    /// Maximum undo depth
    pub history_depth: usize,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_FORMAT_VERSION,
            grid_ms: DEFAULT_GRID_MS,
            max_lanes: 4,
            auto_skip_gaps: true,
            history_depth: 100,
        }
    }
}

impl TimelineConfig {
    /// Load config from a RON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Parse config from a RON string
    pub fn from_ron(content: &str) -> std::io::Result<Self> {
        let config: TimelineConfig = ron::from_str(content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        if config.version > CONFIG_FORMAT_VERSION {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "Config version {} is newer than supported version {}",
                    config.version, CONFIG_FORMAT_VERSION
                ),
            ));
        }

        Ok(config)
    }

    /// Load config if the file exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> std::io::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to a RON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);

        let content = ron::ser::to_string_pretty(self, config).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;

        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TimelineConfig::default();
        assert_eq!(config.version, CONFIG_FORMAT_VERSION);
        assert_eq!(config.grid_ms, 100);
        assert_eq!(config.max_lanes, 4);
        assert!(config.auto_skip_gaps);
    }

    #[test]
    fn test_serialization() {
        let config = TimelineConfig { max_lanes: 8, grid_ms: 250, ..Default::default() };
        let ron_str = ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::default()).unwrap();
        let loaded = TimelineConfig::from_ron(&ron_str).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let loaded = TimelineConfig::from_ron("(max_lanes: 2)").unwrap();
        assert_eq!(loaded.max_lanes, 2);
        assert_eq!(loaded.grid_ms, 100);
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = TimelineConfig::from_ron("(version: 99)").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
