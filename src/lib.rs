//! Software display adjustment through the graphics driver's gamma ramp.
//!
//! This crate computes 256-entry gamma lookup tables from brightness,
//! contrast, grayscale and per-channel settings, installs them on a display
//! output, keeps named presets on disk and routes global hotkeys to
//! actions.
//!
//! # Requirements
//!
//! Hardware access needs Windows and a display driver that accepts custom
//! gamma ramps. On other platforms, or when the driver refuses, every
//! operation still works on in-memory state and reports
//! [`GammaError::Unsupported`].
//!
//! # Example
//!
//! ```no_run
//! use gammatool_core::{GammaController, GammaPort, PresetStore, config_dir, platform};
//!
//! fn main() -> Result<(), gammatool_core::GammaError> {
//!     let mut controller = GammaController::new(GammaPort::new(platform::system_gamma()));
//!
//!     controller.set_brightness(80);
//!     controller.set_rgb(255, 200, 150);
//!     controller.apply_settings()?;
//!
//!     let mut presets = PresetStore::open(config_dir().join("presets.json"));
//!     if let Some(settings) = presets.switch_to_next() {
//!         controller.set_settings(&settings);
//!         controller.apply_settings()?;
//!     }
//!
//!     controller.reset_to_default()
//! }
//! ```
//!
//! # Testing
//!
//! Use [`MockGammaDevice`] and [`MockHotkeys`] to test code without hardware:
//!
//! ```
//! use gammatool_core::{DeviceTarget, GammaController, GammaPort, MockGammaDevice};
//!
//! let mut controller = GammaController::new(GammaPort::new(MockGammaDevice::new()));
//! controller.set_grayscale(100);
//! controller.apply_settings().unwrap();
//!
//! let installed = controller.port().device().installed(&DeviceTarget::Primary).unwrap();
//! assert!(installed.red.iter().all(|&v| v == 0));
//! ```

#![warn(missing_docs)]

mod config;
mod controller;
mod error;
mod hotkey;
mod mock;
pub mod platform;
mod port;
mod preset;
mod ramp;
mod settings;

// Re-export public API
pub use config::{AdvancedConfig, AppConfig, HotkeyConfig, SystemConfig, config_dir};
pub use controller::GammaController;
pub use error::{ConfigError, GammaError, HotkeyError, PresetError};
pub use hotkey::{Combo, HotkeyBackend, HotkeyEvent, HotkeyRouter, Key, Modifier};
pub use mock::{MockGammaDevice, MockHotkeys};
pub use port::{DeviceTarget, DisplayOutput, GammaDevice, GammaPort, UNSUPPORTED_NOTICE};
pub use preset::{Preset, PresetStore};
pub use ramp::{GammaTable, RAMP_SIZE};
pub use settings::{
    Channel, ChannelScale, DisplaySettings, MAX_CHANNEL, MAX_GRAYSCALE, MAX_LEVEL,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    enum Action {
        Brighter,
        Preset(String),
    }

    #[test]
    fn test_preset_applied_through_controller() {
        let dir = TempDir::new().unwrap();
        let mut presets = PresetStore::open(dir.path().join("presets.json"));
        let mut controller = GammaController::new(GammaPort::new(MockGammaDevice::new()));

        let night = presets.load("Night").unwrap();
        controller.set_settings(&night);
        controller.apply_settings().unwrap();

        let installed = controller
            .port()
            .device()
            .installed(&DeviceTarget::Primary)
            .unwrap();
        assert_eq!(installed, GammaTable::compute(&night));
        assert!(installed.blue[255] < installed.red[255]);
        assert_eq!(presets.current_name(), Some("Night"));
    }

    #[test]
    fn test_hotkey_press_drives_controller() {
        let (tx, rx) = mpsc::channel();
        let mut router = HotkeyRouter::new(MockHotkeys::new(tx), rx);
        router.register("ctrl+alt+up", Action::Brighter).unwrap();
        router
            .register("ctrl+shift+1", Action::Preset("Reading".to_string()))
            .unwrap();
        router.start_listening();

        let mut controller = GammaController::new(GammaPort::new(MockGammaDevice::new()));
        router.backend().press("Alt+Ctrl+Up");
        match router.next_action(Duration::from_millis(100)) {
            Some(Action::Brighter) => {
                controller.adjust_brightness(5);
            }
            other => panic!("unexpected action {:?}", other),
        }
        controller.apply_settings().unwrap();
        assert_eq!(controller.current_settings().brightness, 105);

        router.backend().press("ctrl+shift+1");
        assert_eq!(
            router.pending_actions(),
            vec![Action::Preset("Reading".to_string())]
        );
    }

    #[test]
    fn test_unsupported_hardware_keeps_state_usable() {
        let mut controller = GammaController::new(GammaPort::new(
            MockGammaDevice::new().reject(DeviceTarget::Primary),
        ));
        assert!(!controller.port().is_supported());

        controller.set_contrast(150);
        assert_eq!(controller.apply_settings(), Err(GammaError::Unsupported));
        assert_eq!(controller.current_settings().contrast, 150);
        assert_eq!(controller.port().device().set_calls(), 0);
    }
}
