//! Backends for platforms without gamma ramp or global hotkey support.

use crate::error::{GammaError, HotkeyError};
use crate::hotkey::{Combo, HotkeyBackend, HotkeyEvent};
use crate::port::{DeviceTarget, DisplayOutput, GammaDevice};
use crate::ramp::GammaTable;

use std::sync::mpsc::Sender;

/// A gamma device that has no outputs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableGamma;

impl GammaDevice for UnavailableGamma {
    type Context = ();

    fn acquire(&self, target: &DeviceTarget) -> Result<(), GammaError> {
        Err(GammaError::AcquireFailed {
            device: target.to_string(),
        })
    }

    fn release(&self, _target: &DeviceTarget, _context: ()) {}

    fn get_ramp(&self, _context: &()) -> Result<GammaTable, GammaError> {
        Err(GammaError::Unsupported)
    }

    fn set_ramp(&self, _context: &(), _table: &GammaTable) -> Result<(), GammaError> {
        Err(GammaError::Unsupported)
    }

    fn enumerate(&self) -> Vec<DisplayOutput> {
        Vec::new()
    }
}

/// A hotkey backend that refuses every registration.
#[derive(Debug, Default)]
pub struct UnavailableHotkeys;

impl UnavailableHotkeys {
    /// Create the backend. Nothing is ever sent on `events`.
    pub fn spawn(_events: Sender<HotkeyEvent>) -> Result<Self, HotkeyError> {
        Ok(Self)
    }
}

impl HotkeyBackend for UnavailableHotkeys {
    fn register(&mut self, combo: &Combo) -> Result<(), HotkeyError> {
        Err(HotkeyError::Rejected {
            combo: combo.to_string(),
            reason: "global hotkeys are not supported on this platform".to_string(),
        })
    }

    fn unregister(&mut self, combo: &Combo) -> Result<(), HotkeyError> {
        Err(HotkeyError::NotRegistered(combo.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::GammaPort;
    use std::sync::mpsc;

    #[test]
    fn test_unavailable_gamma_is_unsupported() {
        let port = GammaPort::new(UnavailableGamma);
        assert!(!port.is_supported());
        assert_eq!(port.apply(&GammaTable::default()), Err(GammaError::Unsupported));
    }

    #[test]
    fn test_unavailable_hotkeys_reject() {
        let (tx, _rx) = mpsc::channel();
        let mut backend = UnavailableHotkeys::spawn(tx).unwrap();
        let combo: Combo = "ctrl+alt+up".parse().unwrap();
        assert!(matches!(
            backend.register(&combo),
            Err(HotkeyError::Rejected { .. })
        ));
    }
}
