//! Headless run configuration, read from a JSON file.

use std::path::Path;

use emu_core::Settings;
use serde::Deserialize;
use thiserror::Error;

use crate::engine::BATTERY_SUFFIX;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

/// Overrides on top of [`Settings::headless`] plus run options. Every field
/// is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeadlessConfig {
    pub skip_frames: u32,
    pub turbo_skip_frames: u32,
    pub max_sprite_tiles_per_line: u32,
    pub sound_playback_rate: u32,
    pub hdma_timing_hack: u32,
    pub battery_suffix: String,
    /// Frames to run when no other mode is chosen.
    pub frames: u32,
    /// Suppress rendering while running `frames`.
    pub warp: bool,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        let settings = Settings::headless();
        Self {
            skip_frames: settings.skip_frames,
            turbo_skip_frames: settings.turbo_skip_frames,
            max_sprite_tiles_per_line: settings.max_sprite_tiles_per_line,
            sound_playback_rate: settings.sound_playback_rate,
            hdma_timing_hack: settings.hdma_timing_hack,
            battery_suffix: BATTERY_SUFFIX.to_string(),
            frames: 200,
            warp: false,
        }
    }
}

impl HeadlessConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The settings record to apply.
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            skip_frames: self.skip_frames,
            turbo_skip_frames: self.turbo_skip_frames,
            max_sprite_tiles_per_line: self.max_sprite_tiles_per_line,
            sound_playback_rate: self.sound_playback_rate,
            hdma_timing_hack: self.hdma_timing_hack,
            ..Settings::headless()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_default() {
        let config = HeadlessConfig::from_json("{}").expect("valid");
        assert_eq!(config, HeadlessConfig::default());
        assert_eq!(config.settings(), Settings::headless());
    }

    #[test]
    fn overrides_apply() {
        let config =
            HeadlessConfig::from_json(r#"{"skip_frames": 3, "battery_suffix": ".sav", "warp": true}"#)
                .expect("valid");
        assert_eq!(config.settings().skip_frames, 3);
        assert_eq!(config.settings().max_sprite_tiles_per_line, 34);
        assert_eq!(config.battery_suffix, ".sav");
        assert!(config.warp);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(HeadlessConfig::from_json(r#"{"skipframes": 3}"#).is_err());
    }
}
