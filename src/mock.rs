//! Mock gamma device and hotkey backend for testing.

use crate::error::{GammaError, HotkeyError};
use crate::hotkey::{Combo, HotkeyBackend, HotkeyEvent};
use crate::port::{DeviceTarget, DisplayOutput, GammaDevice};
use crate::ramp::GammaTable;

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::mpsc::Sender;

// =============================================================================
// Gamma
// =============================================================================

#[derive(Debug, Default)]
struct DeviceState {
    ramps: HashMap<DeviceTarget, GammaTable>,
    open_contexts: usize,
    set_calls: usize,
    reads_left: Option<usize>,
    fail_writes: bool,
}

/// A mock display gamma device.
///
/// This allows testing code that drives a [`GammaPort`](crate::GammaPort)
/// without real display hardware. Every capable output starts with the
/// identity ramp installed.
///
/// # Example
///
/// ```
/// use gammatool_core::{DeviceTarget, GammaPort, MockGammaDevice};
///
/// let device = MockGammaDevice::new()
///     .reject(DeviceTarget::Primary)
///     .with_output(r"\\.\DISPLAY2", true);
/// let port = GammaPort::new(device);
/// assert_eq!(port.target(), Some(&DeviceTarget::Named(r"\\.\DISPLAY2".into())));
/// ```
pub struct MockGammaDevice {
    outputs: Vec<DisplayOutput>,
    rejected: HashSet<DeviceTarget>,
    state: Mutex<DeviceState>,
}

impl MockGammaDevice {
    /// Create a device whose primary output supports gamma ramps.
    pub fn new() -> Self {
        let mut state = DeviceState::default();
        state.ramps.insert(DeviceTarget::Primary, GammaTable::default());
        Self {
            outputs: Vec::new(),
            rejected: HashSet::new(),
            state: Mutex::new(state),
        }
    }

    /// Make a target reject ramp reads and writes.
    pub fn reject(mut self, target: DeviceTarget) -> Self {
        self.rejected.insert(target);
        self
    }

    /// Add an enumerable output.
    pub fn with_output(mut self, name: &str, capable: bool) -> Self {
        self.outputs.push(DisplayOutput {
            name: name.to_string(),
            description: format!("Mock adapter {}", self.outputs.len() + 1),
        });
        let target = DeviceTarget::Named(name.to_string());
        if capable {
            self.lock().ramps.insert(target, GammaTable::default());
        } else {
            self.rejected.insert(target);
        }
        self
    }

    /// Let `count` ramp reads succeed, then fail every later one.
    pub fn fail_reads_after(self, count: usize) -> Self {
        self.lock().reads_left = Some(count);
        self
    }

    /// Make ramp writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// The ramp currently installed on a target.
    pub fn installed(&self, target: &DeviceTarget) -> Option<GammaTable> {
        self.lock().ramps.get(target).cloned()
    }

    /// Number of attempted ramp writes.
    pub fn set_calls(&self) -> usize {
        self.lock().set_calls
    }

    /// Number of acquired contexts not yet released.
    pub fn open_contexts(&self) -> usize {
        self.lock().open_contexts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn known(&self, target: &DeviceTarget) -> bool {
        match target {
            DeviceTarget::Primary => true,
            DeviceTarget::Named(name) => self.outputs.iter().any(|o| &o.name == name),
        }
    }
}

impl Default for MockGammaDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaDevice for MockGammaDevice {
    type Context = DeviceTarget;

    fn acquire(&self, target: &DeviceTarget) -> Result<DeviceTarget, GammaError> {
        if !self.known(target) {
            return Err(GammaError::AcquireFailed {
                device: target.to_string(),
            });
        }
        self.lock().open_contexts += 1;
        Ok(target.clone())
    }

    fn release(&self, _target: &DeviceTarget, _context: DeviceTarget) {
        let mut state = self.lock();
        state.open_contexts = state.open_contexts.saturating_sub(1);
    }

    fn get_ramp(&self, context: &DeviceTarget) -> Result<GammaTable, GammaError> {
        let failed = || GammaError::CallFailed {
            call: "GetDeviceGammaRamp",
            device: context.to_string(),
        };
        if self.rejected.contains(context) {
            return Err(failed());
        }

        let mut state = self.lock();
        match state.reads_left {
            Some(0) => return Err(failed()),
            Some(ref mut left) => *left -= 1,
            None => {}
        }
        state.ramps.get(context).cloned().ok_or_else(failed)
    }

    fn set_ramp(&self, context: &DeviceTarget, table: &GammaTable) -> Result<(), GammaError> {
        let mut state = self.lock();
        state.set_calls += 1;
        if state.fail_writes || self.rejected.contains(context) {
            return Err(GammaError::CallFailed {
                call: "SetDeviceGammaRamp",
                device: context.to_string(),
            });
        }
        state.ramps.insert(context.clone(), table.clone());
        Ok(())
    }

    fn enumerate(&self) -> Vec<DisplayOutput> {
        self.outputs.clone()
    }
}

// =============================================================================
// Hotkeys
// =============================================================================

/// A mock global hotkey backend.
///
/// [`press`](Self::press) simulates the OS delivering a registered combo.
pub struct MockHotkeys {
    events: Sender<HotkeyEvent>,
    active: HashSet<Combo>,
    rejected: HashSet<String>,
    stuck: HashSet<String>,
    calls: Vec<String>,
}

impl MockHotkeys {
    /// Create a backend that delivers presses on `events`.
    pub fn new(events: Sender<HotkeyEvent>) -> Self {
        Self {
            events,
            active: HashSet::new(),
            rejected: HashSet::new(),
            stuck: HashSet::new(),
            calls: Vec::new(),
        }
    }

    /// Refuse registration of a normalized combo string.
    pub fn reject(mut self, combo: &str) -> Self {
        self.rejected.insert(combo.to_string());
        self
    }

    /// Make unregistration of a normalized combo string fail.
    ///
    /// The combo stays installed, like an OS listener that could not be removed.
    pub fn fail_unregister(mut self, combo: &str) -> Self {
        self.stuck.insert(combo.to_string());
        self
    }

    /// Simulate a key press. Unregistered or malformed combos are ignored.
    pub fn press(&self, combo: &str) {
        let Ok(combo) = combo.parse::<Combo>() else {
            return;
        };
        if self.active.contains(&combo) {
            let _ = self.events.send(HotkeyEvent { combo });
        }
    }

    /// Currently installed combos.
    pub fn active(&self) -> Vec<String> {
        let mut combos: Vec<String> = self.active.iter().map(Combo::to_string).collect();
        combos.sort();
        combos
    }

    /// Log of register/unregister calls in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.clone()
    }
}

impl HotkeyBackend for MockHotkeys {
    fn register(&mut self, combo: &Combo) -> Result<(), HotkeyError> {
        self.calls.push(format!("register {}", combo));
        if self.rejected.contains(&combo.to_string()) {
            return Err(HotkeyError::Rejected {
                combo: combo.to_string(),
                reason: "already in use by another application".to_string(),
            });
        }
        self.active.insert(combo.clone());
        Ok(())
    }

    fn unregister(&mut self, combo: &Combo) -> Result<(), HotkeyError> {
        self.calls.push(format!("unregister {}", combo));
        if self.stuck.contains(&combo.to_string()) {
            return Err(HotkeyError::Backend(format!(
                "could not remove listener for {}",
                combo
            )));
        }
        if self.active.remove(combo) {
            Ok(())
        } else {
            Err(HotkeyError::NotRegistered(combo.to_string()))
        }
    }
}
