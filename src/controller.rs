//! Logical display settings driving the gamma port.

use crate::error::GammaError;
use crate::port::{GammaDevice, GammaPort};
use crate::ramp::GammaTable;
use crate::settings::{
    Channel, ChannelScale, DisplaySettings, MAX_GRAYSCALE, MAX_LEVEL, clamp_u8,
};

use log::{debug, info, warn};

/// Holds the current display settings and applies them through a [`GammaPort`].
///
/// Setters only change the in-memory settings; nothing reaches the
/// display until [`apply_settings`](Self::apply_settings) is called.
///
/// # Example
///
/// ```
/// use gammatool_core::{GammaController, GammaPort, MockGammaDevice};
///
/// let mut controller = GammaController::new(GammaPort::new(MockGammaDevice::new()));
/// controller.set_brightness(999);
/// assert_eq!(controller.current_settings().brightness, 200);
/// controller.apply_settings().unwrap();
/// ```
pub struct GammaController<D: GammaDevice> {
    port: GammaPort<D>,
    settings: DisplaySettings,
}

impl<D: GammaDevice> GammaController<D> {
    /// Create a controller with default settings.
    pub fn new(port: GammaPort<D>) -> Self {
        Self {
            port,
            settings: DisplaySettings::default(),
        }
    }

    /// The gamma port, for capability checks.
    pub fn port(&self) -> &GammaPort<D> {
        &self.port
    }

    /// A copy of the current settings.
    pub fn current_settings(&self) -> DisplaySettings {
        self.settings
    }

    /// Set brightness, clamped to 0-200.
    pub fn set_brightness(&mut self, value: i32) {
        self.settings.brightness = clamp_u8(value, MAX_LEVEL);
        debug!("brightness set to {}", self.settings.brightness);
    }

    /// Set contrast, clamped to 0-200.
    pub fn set_contrast(&mut self, value: i32) {
        self.settings.contrast = clamp_u8(value, MAX_LEVEL);
        debug!("contrast set to {}", self.settings.contrast);
    }

    /// Set grayscale, clamped to 0-100.
    pub fn set_grayscale(&mut self, value: i32) {
        self.settings.grayscale = clamp_u8(value, MAX_GRAYSCALE);
        debug!("grayscale set to {}", self.settings.grayscale);
    }

    /// Set one channel scale, clamped to 0-255.
    pub fn set_channel(&mut self, channel: Channel, value: i32) {
        self.settings.rgb.set(channel, value);
        debug!("{:?} channel set to {}", channel, self.settings.rgb.get(channel));
    }

    /// Set all three channel scales, each clamped to 0-255.
    pub fn set_rgb(&mut self, red: i32, green: i32, blue: i32) {
        self.settings.rgb = ChannelScale::new(red, green, blue);
        debug!("rgb set to {:?}", self.settings.rgb);
    }

    /// Replace every setting at once, clamping each field.
    pub fn set_settings(&mut self, settings: &DisplaySettings) {
        self.settings = settings.clamped();
        debug!("settings replaced: {:?}", self.settings);
    }

    /// Nudge brightness by `delta`, clamped to 0-200. Returns the new value.
    pub fn adjust_brightness(&mut self, delta: i32) -> u8 {
        self.set_brightness(i32::from(self.settings.brightness) + delta);
        self.settings.brightness
    }

    /// Nudge contrast by `delta`, clamped to 0-200. Returns the new value.
    pub fn adjust_contrast(&mut self, delta: i32) -> u8 {
        self.set_contrast(i32::from(self.settings.contrast) + delta);
        self.settings.contrast
    }

    /// Compute the ramp for the current settings and install it.
    ///
    /// A failure leaves the in-memory settings as they are.
    pub fn apply_settings(&self) -> Result<(), GammaError> {
        let table = GammaTable::compute(&self.settings);
        self.port.apply(&table)?;
        info!("gamma settings applied: {:?}", self.settings);
        Ok(())
    }

    /// Restore the original ramp and reset the settings to defaults.
    ///
    /// On hardware without gamma support the settings are still reset so
    /// the user sees the defaults they asked for, but
    /// [`GammaError::Unsupported`] is returned. Any other failure leaves the
    /// settings untouched.
    pub fn reset_to_default(&mut self) -> Result<(), GammaError> {
        match self.port.restore_default() {
            Ok(()) => {
                self.settings = DisplaySettings::default();
                info!("default gamma restored");
                Ok(())
            }
            Err(GammaError::Unsupported) => {
                self.settings = DisplaySettings::default();
                warn!("gamma unsupported, settings reset without hardware confirmation");
                Err(GammaError::Unsupported)
            }
            Err(e) => {
                warn!("could not restore default gamma: {}", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockGammaDevice;
    use crate::port::DeviceTarget;

    fn controller() -> GammaController<MockGammaDevice> {
        GammaController::new(GammaPort::new(MockGammaDevice::new()))
    }

    fn unsupported() -> GammaController<MockGammaDevice> {
        GammaController::new(GammaPort::new(
            MockGammaDevice::new().reject(DeviceTarget::Primary),
        ))
    }

    #[test]
    fn test_setters_clamp() {
        let mut c = controller();
        c.set_brightness(-10);
        assert_eq!(c.current_settings().brightness, 0);
        c.set_brightness(999);
        assert_eq!(c.current_settings().brightness, 200);
        c.set_contrast(-1);
        assert_eq!(c.current_settings().contrast, 0);
        c.set_contrast(201);
        assert_eq!(c.current_settings().contrast, 200);
        c.set_grayscale(-5);
        assert_eq!(c.current_settings().grayscale, 0);
        c.set_grayscale(101);
        assert_eq!(c.current_settings().grayscale, 100);
        c.set_channel(Channel::Red, -3);
        c.set_channel(Channel::Blue, 256);
        assert_eq!(c.current_settings().rgb, ChannelScale::new(0, 255, 255));
    }

    #[test]
    fn test_setters_do_not_touch_hardware() {
        let mut c = controller();
        c.set_brightness(50);
        c.set_rgb(10, 20, 30);
        assert_eq!(c.port().device().set_calls(), 0);
    }

    #[test]
    fn test_apply_installs_computed_ramp() {
        let mut c = controller();
        c.set_brightness(150);
        c.apply_settings().unwrap();

        let installed = c.port().device().installed(&DeviceTarget::Primary).unwrap();
        assert_eq!(installed, GammaTable::compute(&c.current_settings()));
        assert_eq!(installed.red[255], 65535);
    }

    #[test]
    fn test_apply_failure_keeps_settings() {
        let mut c = controller();
        c.port().device().fail_writes(true);
        c.set_brightness(70);
        assert!(c.apply_settings().is_err());
        assert_eq!(c.current_settings().brightness, 70);
    }

    #[test]
    fn test_adjust_nudges_within_range() {
        let mut c = controller();
        assert_eq!(c.adjust_brightness(5), 105);
        assert_eq!(c.adjust_brightness(-200), 0);
        assert_eq!(c.adjust_contrast(150), 200);
    }

    #[test]
    fn test_reset_restores_default_ramp_and_settings() {
        let mut c = controller();
        c.set_brightness(30);
        c.set_grayscale(40);
        c.apply_settings().unwrap();

        c.reset_to_default().unwrap();
        assert_eq!(c.current_settings(), DisplaySettings::default());
        assert_eq!(
            c.port().device().installed(&DeviceTarget::Primary),
            Some(GammaTable::default())
        );
    }

    #[test]
    fn test_reset_on_unsupported_hardware_still_resets_state() {
        let mut c = unsupported();
        c.set_brightness(30);
        assert_eq!(c.apply_settings(), Err(GammaError::Unsupported));
        assert_eq!(c.reset_to_default(), Err(GammaError::Unsupported));
        assert_eq!(c.current_settings(), DisplaySettings::default());
    }

    #[test]
    fn test_reset_failure_keeps_state_when_supported() {
        let mut c = controller();
        c.set_brightness(30);
        c.port().device().fail_writes(true);
        assert!(c.reset_to_default().is_err());
        assert_eq!(c.current_settings().brightness, 30);
    }

    #[test]
    fn test_current_settings_is_a_copy() {
        let mut c = controller();
        let mut snapshot = c.current_settings();
        snapshot.brightness = 10;
        c.set_contrast(120);
        assert_eq!(c.current_settings().brightness, 100);
        assert_eq!(snapshot.contrast, 100);
    }
}
