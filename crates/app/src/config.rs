use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use stationvoice_core::pitch::{clamp_ratio, DEFAULT_PITCH_RATIO};
use std::fs;
use std::path::{Path, PathBuf};

/// Application configuration for persisting user preferences.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub last_input: String,
    #[serde(default)]
    pub last_output: String,
    #[serde(default = "default_pitch_ratio")]
    pub pitch_ratio: f32,
    #[serde(default = "default_effects_enabled")]
    pub effects_enabled: bool,
}

fn default_pitch_ratio() -> f32 {
    DEFAULT_PITCH_RATIO
}

fn default_effects_enabled() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            last_input: String::new(),
            last_output: String::new(),
            pitch_ratio: default_pitch_ratio(),
            effects_enabled: default_effects_enabled(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from disk, or returns default if not found.
    pub fn load() -> Self {
        config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Loads from an explicit path. Unreadable or malformed files give defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut cfg = fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<Self>(&content).ok())
            .unwrap_or_default();
        cfg.pitch_ratio = clamp_ratio(cfg.pitch_ratio);
        cfg
    }

    /// Saves configuration to disk in JSON format.
    pub fn save(&self) {
        if let Some(path) = config_path() {
            if let Err(e) = self.save_to(&path) {
                log::warn!("Failed to save config to {}: {}", path.display(), e);
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Device to open: the explicit choice, else the last one used, else "default".
    pub fn resolve_device(explicit: Option<String>, last: &str) -> String {
        explicit
            .filter(|name| !name.is_empty())
            .or_else(|| (!last.is_empty()).then(|| last.to_string()))
            .unwrap_or_else(|| "default".to_string())
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "stationvoice", "stationvoice")
        .map(|dirs| dirs.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("stationvoice-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_default_config_values() {
        let config = AppConfig::default();
        assert_eq!(config.pitch_ratio, 1.12);
        assert!(config.effects_enabled);
        assert!(config.last_input.is_empty());
    }

    #[test]
    fn test_config_deserialization_with_defaults() {
        // Minimal JSON - should fill in defaults
        let json = r#"{"last_input":"Mic"}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.last_input, "Mic");
        assert_eq!(config.last_output, "");
        assert_eq!(config.pitch_ratio, 1.12);
        assert!(config.effects_enabled);
    }

    #[test]
    fn test_config_roundtrip_on_disk() {
        let path = temp_path("roundtrip.json");
        let original = AppConfig {
            last_input: "USB Mic".to_string(),
            last_output: "Headphones".to_string(),
            pitch_ratio: 1.3,
            effects_enabled: false,
        };
        original.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path), original);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_out_of_range_ratio_is_clamped_on_load() {
        let path = temp_path("clamp.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"pitch_ratio":4.0}"#).unwrap();
        assert_eq!(AppConfig::load_from(&path).pitch_ratio, 1.5);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let path = temp_path("broken.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
        let _ = fs::remove_file(&path);
        assert_eq!(AppConfig::load_from(&path), AppConfig::default());
    }

    #[test]
    fn test_resolve_device() {
        assert_eq!(AppConfig::resolve_device(Some("Mic".into()), "Old"), "Mic");
        assert_eq!(AppConfig::resolve_device(None, "Old"), "Old");
        assert_eq!(AppConfig::resolve_device(None, ""), "default");
        assert_eq!(AppConfig::resolve_device(Some(String::new()), ""), "default");
    }
}
