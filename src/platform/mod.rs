//! OS backends for gamma ramps and global hotkeys.
//!
//! Windows gets the GDI gamma calls and `RegisterHotKey`. Other platforms
//! get backends that refuse every call, which leaves the rest of the
//! crate running in its "unsupported" mode.

use crate::error::HotkeyError;
use crate::hotkey::HotkeyEvent;

use std::sync::mpsc::Sender;

mod unavailable;
#[cfg(windows)]
mod windows;

pub use unavailable::{UnavailableGamma, UnavailableHotkeys};
#[cfg(windows)]
pub use windows::{WinContext, WinGammaDevice, WinHotkeys};

/// Gamma device for the current platform.
#[cfg(windows)]
pub type SystemGamma = WinGammaDevice;
/// Gamma device for the current platform.
#[cfg(not(windows))]
pub type SystemGamma = UnavailableGamma;

/// Hotkey backend for the current platform.
#[cfg(windows)]
pub type SystemHotkeys = WinHotkeys;
/// Hotkey backend for the current platform.
#[cfg(not(windows))]
pub type SystemHotkeys = UnavailableHotkeys;

/// Create the gamma device for the current platform.
pub fn system_gamma() -> SystemGamma {
    SystemGamma::default()
}

/// Start the hotkey backend for the current platform.
///
/// Presses are delivered on `events`.
pub fn system_hotkeys(events: Sender<HotkeyEvent>) -> Result<SystemHotkeys, HotkeyError> {
    SystemHotkeys::spawn(events)
}
