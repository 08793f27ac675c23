//! Application settings document.

use crate::error::ConfigError;
use crate::settings::DisplaySettings;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "GammaTool";
const FALLBACK_DIR: &str = ".gammatool";

/// Directory holding `config.json` and `presets.json`.
///
/// The platform config directory (`%APPDATA%` on Windows) joined with
/// `GammaTool`, or `~/.gammatool` when that is unknown.
pub fn config_dir() -> PathBuf {
    if let Some(dir) = dirs::config_dir() {
        return dir.join(APP_DIR);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(FALLBACK_DIR)
}

/// Combos for the built-in actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Raise brightness by one step.
    pub increase_brightness: String,
    /// Lower brightness by one step.
    pub decrease_brightness: String,
    /// Raise contrast by one step.
    pub increase_contrast: String,
    /// Lower contrast by one step.
    pub decrease_contrast: String,
    /// Restore the original ramp.
    pub reset: String,
    /// Load the next preset.
    pub next_preset: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            increase_brightness: "ctrl+alt+up".to_string(),
            decrease_brightness: "ctrl+alt+down".to_string(),
            increase_contrast: "ctrl+alt+right".to_string(),
            decrease_contrast: "ctrl+alt+left".to_string(),
            reset: "ctrl+alt+r".to_string(),
            next_preset: "ctrl+alt+n".to_string(),
        }
    }
}

/// Process-level behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Reinstall the original ramp when the listener exits.
    pub restore_on_exit: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            restore_on_exit: true,
        }
    }
}

/// Tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedConfig {
    /// Step used by the brightness and contrast hotkeys.
    pub adjustment_step: i32,
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self { adjustment_step: 5 }
    }
}

/// The persisted settings document.
///
/// Keys missing from the file take their default value, so documents
/// written by older versions keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Version that wrote the document.
    pub version: String,
    /// Last applied display settings.
    pub display: DisplaySettings,
    /// Built-in action hotkeys.
    pub hotkeys: HotkeyConfig,
    /// Process-level behavior.
    pub system: SystemConfig,
    /// Tuning knobs.
    pub advanced: AdvancedConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            display: DisplaySettings::default(),
            hotkeys: HotkeyConfig::default(),
            system: SystemConfig::default(),
            advanced: AdvancedConfig::default(),
        }
    }
}

impl AppConfig {
    /// Read the document, falling back to defaults.
    ///
    /// When the file is missing or unreadable the defaults are written
    /// back so the next start finds a valid document.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Self::write_defaults(path);
        }

        match Self::read(path) {
            Ok(config) => {
                debug!("config loaded from {}", path.display());
                config
            }
            Err(e) => {
                error!("failed to load config: {}", e);
                Self::write_defaults(path)
            }
        }
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_defaults(path: &Path) -> Self {
        let config = Self::default();
        if let Err(e) = config.save(path) {
            error!("failed to write default config: {}", e);
        }
        config
    }

    /// Rewrite the whole document.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(io_err)?;
        debug!("config saved to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ChannelScale;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig::load(&path);
        assert_eq!(config, AppConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_partial_document_is_completed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"display": {"brightness": 80, "rgb": {"red": 300}}, "hotkeys": {"reset": "ctrl+shift+r"}, "ui": {"theme": "dark"}}"#,
        )
        .unwrap();

        let config = AppConfig::load(&path);
        assert_eq!(config.display.brightness, 80);
        assert_eq!(config.display.contrast, 100);
        assert_eq!(config.display.rgb, ChannelScale::new(255, 255, 255));
        assert_eq!(config.hotkeys.reset, "ctrl+shift+r");
        assert_eq!(config.hotkeys.increase_brightness, "ctrl+alt+up");
        assert!(config.system.restore_on_exit);
        assert_eq!(config.advanced.adjustment_step, 5);
    }

    #[test]
    fn test_corrupt_document_is_replaced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "[1, 2").unwrap();
        assert_eq!(AppConfig::load(&path), AppConfig::default());

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"display\""));
    }

    #[test]
    fn test_save_round_trips_display() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        let mut config = AppConfig::default();
        config.display = DisplaySettings::new(130, 90, 20, ChannelScale::new(255, 220, 200));
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path).display, config.display);
    }
}
