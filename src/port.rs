//! Bridge between computed gamma tables and the OS display gamma interface.

use crate::error::GammaError;
use crate::ramp::GammaTable;

use log::{debug, error, info, warn};
use std::fmt;

/// Message shown once when no display accepts gamma ramps.
pub const UNSUPPORTED_NOTICE: &str = "Hardware gamma control is not available on this system. \
The display driver rejected gamma ramp requests, so brightness, contrast and color changes \
will have no visible effect. Try the monitor's on-screen menu, the graphics driver's \
control panel, or updating the display driver.";

/// Which display output a call targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceTarget {
    /// The output behind the desktop's default device context.
    Primary,
    /// A specific output, by OS device name (e.g. `\\.\DISPLAY2`).
    Named(String),
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceTarget::Primary => f.write_str("primary display"),
            DeviceTarget::Named(name) => f.write_str(name),
        }
    }
}

/// An attached display output reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayOutput {
    /// OS device name, usable as [`DeviceTarget::Named`].
    pub name: String,
    /// Human readable adapter description.
    pub description: String,
}

/// OS display gamma primitive.
///
/// Implementations convert every failure into a [`GammaError`]; nothing
/// panics across this boundary. A context is acquired right before each
/// call and released right after, never cached.
pub trait GammaDevice {
    /// Device context handle.
    type Context;

    /// Acquire a context for the target output.
    fn acquire(&self, target: &DeviceTarget) -> Result<Self::Context, GammaError>;

    /// Release a context obtained from [`GammaDevice::acquire`].
    fn release(&self, target: &DeviceTarget, context: Self::Context);

    /// Read the ramp currently installed on the output.
    fn get_ramp(&self, context: &Self::Context) -> Result<GammaTable, GammaError>;

    /// Install a ramp on the output.
    fn set_ramp(&self, context: &Self::Context, table: &GammaTable) -> Result<(), GammaError>;

    /// List attached outputs.
    fn enumerate(&self) -> Vec<DisplayOutput>;
}

/// Gamma access with capability detection and device fallback.
///
/// Support is probed once at construction: first against the primary
/// output, then against each enumerated output. The first output that
/// answers a ramp read is used for every later call. When none does, the
/// port is unsupported for its whole lifetime and [`apply`](Self::apply)
/// and [`restore_default`](Self::restore_default) fail without touching
/// the hardware.
pub struct GammaPort<D: GammaDevice> {
    device: D,
    target: Option<DeviceTarget>,
    default_ramp: Option<GammaTable>,
}

impl<D: GammaDevice> GammaPort<D> {
    /// Probe the device and save the original ramp.
    pub fn new(device: D) -> Self {
        let mut port = Self {
            device,
            target: None,
            default_ramp: None,
        };
        port.target = port.probe_support();
        port.save_default();
        port
    }

    /// Whether an output accepting gamma ramps was found.
    pub fn is_supported(&self) -> bool {
        self.target.is_some()
    }

    /// The output chosen during probing.
    pub fn target(&self) -> Option<&DeviceTarget> {
        self.target.as_ref()
    }

    /// The ramp read before any modification, if it could be read.
    pub fn default_ramp(&self) -> Option<&GammaTable> {
        self.default_ramp.as_ref()
    }

    /// Access the underlying device.
    pub fn device(&self) -> &D {
        &self.device
    }

    fn probe_support(&self) -> Option<DeviceTarget> {
        if self.try_read(&DeviceTarget::Primary).is_ok() {
            info!("gamma ramps supported on primary display");
            return Some(DeviceTarget::Primary);
        }

        debug!("primary display rejected gamma read, enumerating outputs");
        for output in self.device.enumerate() {
            let target = DeviceTarget::Named(output.name.clone());
            match self.try_read(&target) {
                Ok(_) => {
                    info!(
                        "gamma ramps supported on {} ({})",
                        output.name, output.description
                    );
                    return Some(target);
                }
                Err(e) => debug!("{} rejected gamma read: {}", output.name, e),
            }
        }

        warn!("no attached display supports gamma ramps");
        None
    }

    fn save_default(&mut self) {
        let Some(target) = self.target.clone() else {
            return;
        };
        match self.try_read(&target) {
            Ok(ramp) => {
                debug!("saved default gamma ramp from {}", target);
                self.default_ramp = Some(ramp);
            }
            Err(e) => warn!("could not save default gamma ramp: {}", e),
        }
    }

    fn try_read(&self, target: &DeviceTarget) -> Result<GammaTable, GammaError> {
        let context = self.device.acquire(target)?;
        let result = self.device.get_ramp(&context);
        self.device.release(target, context);
        result
    }

    /// Install a ramp on the chosen output.
    ///
    /// # Errors
    ///
    /// - [`GammaError::Unsupported`] if probing found no capable output
    /// - [`GammaError::AcquireFailed`] or [`GammaError::CallFailed`] if the OS call failed
    pub fn apply(&self, table: &GammaTable) -> Result<(), GammaError> {
        let Some(target) = self.target.as_ref() else {
            return Err(GammaError::Unsupported);
        };

        let context = self.device.acquire(target).inspect_err(|e| {
            error!("failed to apply gamma ramp: {}", e);
        })?;
        let result = self.device.set_ramp(&context, table);
        self.device.release(target, context);

        match &result {
            Ok(()) => debug!("gamma ramp applied to {}", target),
            Err(e) => error!("failed to apply gamma ramp: {}", e),
        }
        result
    }

    /// Reinstall the ramp saved at startup.
    ///
    /// # Errors
    ///
    /// - [`GammaError::Unsupported`] if probing found no capable output
    /// - [`GammaError::NoDefaultRamp`] if the original ramp could not be read
    /// - any error from [`apply`](Self::apply)
    pub fn restore_default(&self) -> Result<(), GammaError> {
        if !self.is_supported() {
            return Err(GammaError::Unsupported);
        }
        let Some(ramp) = self.default_ramp.as_ref() else {
            warn!("no saved default gamma ramp to restore");
            return Err(GammaError::NoDefaultRamp);
        };
        self.apply(ramp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGammaDevice;
    use crate::settings::DisplaySettings;

    fn dimmed() -> GammaTable {
        let mut settings = DisplaySettings::default();
        settings.brightness = 40;
        GammaTable::compute(&settings)
    }

    #[test]
    fn test_primary_display_is_preferred() {
        let port = GammaPort::new(MockGammaDevice::new());
        assert!(port.is_supported());
        assert_eq!(port.target(), Some(&DeviceTarget::Primary));
        assert_eq!(port.default_ramp(), Some(&GammaTable::default()));
    }

    #[test]
    fn test_falls_back_to_first_capable_output() {
        let device = MockGammaDevice::new()
            .reject(DeviceTarget::Primary)
            .with_output("\\\\.\\DISPLAY1", false)
            .with_output("\\\\.\\DISPLAY2", true)
            .with_output("\\\\.\\DISPLAY3", true);
        let port = GammaPort::new(device);

        assert_eq!(
            port.target(),
            Some(&DeviceTarget::Named("\\\\.\\DISPLAY2".to_string()))
        );

        port.apply(&dimmed()).unwrap();
        let installed = port.device().installed(&DeviceTarget::Named("\\\\.\\DISPLAY2".into()));
        assert_eq!(installed, Some(dimmed()));
    }

    #[test]
    fn test_unsupported_port_never_touches_hardware() {
        let device = MockGammaDevice::new()
            .reject(DeviceTarget::Primary)
            .with_output("\\\\.\\DISPLAY1", false);
        let port = GammaPort::new(device);
        assert!(!port.is_supported());
        assert!(port.default_ramp().is_none());

        let calls = port.device().set_calls();
        assert_eq!(port.apply(&dimmed()), Err(GammaError::Unsupported));
        assert_eq!(port.restore_default(), Err(GammaError::Unsupported));
        assert_eq!(port.device().set_calls(), calls);
    }

    #[test]
    fn test_apply_failure_is_reported_and_context_released() {
        let port = GammaPort::new(MockGammaDevice::new());
        port.device().fail_writes(true);

        let err = port.apply(&dimmed()).unwrap_err();
        assert!(matches!(err, GammaError::CallFailed { .. }));
        assert_eq!(port.device().open_contexts(), 0);
    }

    #[test]
    fn test_restore_default_reinstalls_saved_ramp() {
        let port = GammaPort::new(MockGammaDevice::new());
        port.apply(&dimmed()).unwrap();
        port.restore_default().unwrap();
        assert_eq!(
            port.device().installed(&DeviceTarget::Primary),
            Some(GammaTable::default())
        );
    }

    #[test]
    fn test_restore_without_saved_ramp_fails() {
        let device = MockGammaDevice::new().fail_reads_after(1);
        let port = GammaPort::new(device);
        assert!(port.is_supported());
        assert!(port.default_ramp().is_none());
        assert_eq!(port.restore_default(), Err(GammaError::NoDefaultRamp));
    }
}
