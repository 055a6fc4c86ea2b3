use std::path::{Path, PathBuf};

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Engine and host settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Colour applied to new components until the user picks another
    pub initial_color: Color32,
    pub background_color: Color32,
    /// Edge length of snapshot thumbnails in pixels; 0 keeps the full canvas
    pub thumbnail_size: u32,
    /// Directory the drawing store keeps named drawings and autosaves in
    pub drawings_dir: PathBuf,
    pub autosave_interval_secs: u64,
    pub max_autosaves: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_color: Color32::BLACK,
            background_color: Color32::WHITE,
            thumbnail_size: 256,
            drawings_dir: PathBuf::from("drawings"),
            autosave_interval_secs: 300, // 5 minutes
            max_autosaves: 5,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Read a JSON config file, falling back to defaults if it is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                log::info!("Using default config ({}): {}", path.display(), err);
                Self::default()
            }
        }
    }

    /// Thumbnail edge to request from a snapshot, `None` for full size
    pub fn thumbnail(&self) -> Option<u32> {
        (self.thumbnail_size > 0).then_some(self.thumbnail_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_autosaves": 2}"#).unwrap();
        assert_eq!(config.max_autosaves, 2);
        assert_eq!(config.autosave_interval_secs, 300);
        assert_eq!(config.initial_color, Color32::BLACK);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"thumbnail_size": 0}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.thumbnail(), None);
        assert!(EngineConfig::load(dir.path().join("missing.json")).is_err());
        assert_eq!(EngineConfig::load_or_default(dir.path().join("missing.json")), EngineConfig::default());
    }
}
