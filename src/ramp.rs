//! Gamma ramp computation.

use crate::settings::{Channel, DisplaySettings};

/// Number of entries per channel in a gamma ramp.
pub const RAMP_SIZE: usize = 256;

/// A 3x256 table of 16-bit output levels.
///
/// The layout matches the `WORD[3][256]` buffer the GDI gamma calls take,
/// so a reference can be handed to the OS directly.
#[derive(Clone, PartialEq, Eq)]
#[repr(C)]
pub struct GammaTable {
    /// Red channel levels.
    pub red: [u16; RAMP_SIZE],
    /// Green channel levels.
    pub green: [u16; RAMP_SIZE],
    /// Blue channel levels.
    pub blue: [u16; RAMP_SIZE],
}

impl GammaTable {
    /// Compute the table for a set of display settings.
    ///
    /// Per entry `i`: contrast pivots around mid-gray, brightness scales,
    /// the result is clamped to `[0, 1]` and truncated into 16 bits; a
    /// non-zero grayscale then pulls the level toward black before each
    /// channel scale is applied. Every float-to-integer step truncates, so
    /// identical settings always produce identical tables.
    pub fn compute(settings: &DisplaySettings) -> Self {
        let settings = settings.clamped();
        let brightness = f64::from(settings.brightness) / 100.0;
        let contrast = f64::from(settings.contrast) / 100.0;
        let grayscale = f64::from(settings.grayscale) / 100.0;

        let red_factor = f64::from(settings.rgb.red) / 255.0;
        let green_factor = f64::from(settings.rgb.green) / 255.0;
        let blue_factor = f64::from(settings.rgb.blue) / 255.0;

        let mut table = Self::zeroed();
        for i in 0..RAMP_SIZE {
            let mut value = i as f64 / 255.0;
            value = (value - 0.5) * contrast + 0.5;
            value *= brightness;
            let value = value.clamp(0.0, 1.0);

            let base = (value * 65535.0) as u16;
            let level = if grayscale > 0.0 {
                f64::from(base) * (1.0 - grayscale)
            } else {
                f64::from(base)
            };

            table.red[i] = (level * red_factor) as u16;
            table.green[i] = (level * green_factor) as u16;
            table.blue[i] = (level * blue_factor) as u16;
        }
        table
    }

    /// A table with every entry set to zero.
    pub fn zeroed() -> Self {
        Self {
            red: [0; RAMP_SIZE],
            green: [0; RAMP_SIZE],
            blue: [0; RAMP_SIZE],
        }
    }

    /// Levels for one channel.
    pub fn channel(&self, channel: Channel) -> &[u16; RAMP_SIZE] {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }
}

impl Default for GammaTable {
    /// The table for [`DisplaySettings::default`], i.e. the identity ramp.
    fn default() -> Self {
        Self::compute(&DisplaySettings::default())
    }
}

impl std::fmt::Debug for GammaTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ends = |c: &[u16; RAMP_SIZE]| (c[0], c[RAMP_SIZE / 2], c[RAMP_SIZE - 1]);
        f.debug_struct("GammaTable")
            .field("red", &ends(&self.red))
            .field("green", &ends(&self.green))
            .field("blue", &ends(&self.blue))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ChannelScale;

    fn settings(
        brightness: i32,
        contrast: i32,
        grayscale: i32,
        rgb: (i32, i32, i32),
    ) -> DisplaySettings {
        DisplaySettings::new(
            brightness,
            contrast,
            grayscale,
            ChannelScale::new(rgb.0, rgb.1, rgb.2),
        )
    }

    fn all_entries(table: &GammaTable) -> impl Iterator<Item = u16> + '_ {
        table.red.iter().chain(&table.green).chain(&table.blue).copied()
    }

    #[test]
    fn test_default_settings_give_identity_ramp() {
        let table = GammaTable::compute(&DisplaySettings::default());
        for channel in [Channel::Red, Channel::Green, Channel::Blue] {
            let levels = table.channel(channel);
            assert_eq!(levels[0], 0);
            assert_eq!(levels[255], 65535);
            for (i, &level) in levels.iter().enumerate() {
                let expected = i as i64 * 257;
                assert!((i64::from(level) - expected).abs() <= 1, "entry {i}: {level}");
            }
            assert!(levels.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    #[test]
    fn test_zero_brightness_blacks_out_everything() {
        let cases = [
            (100, 0, (255, 255, 255)),
            (200, 50, (10, 20, 30)),
            (0, 100, (0, 128, 255)),
        ];
        for (contrast, grayscale, rgb) in cases {
            let table = GammaTable::compute(&settings(0, contrast, grayscale, rgb));
            assert!(all_entries(&table).all(|v| v == 0));
        }
    }

    #[test]
    fn test_full_grayscale_is_all_zero() {
        let table = GammaTable::compute(&settings(100, 100, 100, (255, 200, 100)));
        assert!(all_entries(&table).all(|v| v == 0));
    }

    #[test]
    fn test_half_grayscale_halves_base_level() {
        let table = GammaTable::compute(&settings(100, 100, 50, (255, 255, 255)));
        assert_eq!(table.red[255], 32767);
        assert_eq!(table.red, table.green);
        assert_eq!(table.green, table.blue);
    }

    #[test]
    fn test_zero_channel_zeroes_only_that_channel() {
        let table = GammaTable::compute(&settings(100, 100, 0, (255, 0, 255)));
        assert!(table.green.iter().all(|&v| v == 0));
        assert_eq!(table.red[255], 65535);
        assert_eq!(table.blue[255], 65535);
    }

    #[test]
    fn test_channel_scaling_truncates() {
        let table = GammaTable::compute(&settings(50, 100, 0, (128, 255, 255)));
        // base 32767, then 32767 * 128 / 255 = 16447.7...
        assert_eq!(table.red[255], 16447);
        assert_eq!(table.green[255], 32767);
    }

    #[test]
    fn test_zero_contrast_collapses_to_mid_gray() {
        let table = GammaTable::compute(&settings(100, 0, 0, (255, 255, 255)));
        assert!(table.red.iter().all(|&v| v == 32767));
    }

    #[test]
    fn test_overbright_clamps_to_full_scale() {
        let table = GammaTable::compute(&settings(150, 100, 0, (255, 255, 255)));
        assert_eq!(table.red[255], 65535);
        assert_eq!(table.green[255], 65535);
        assert_eq!(table.blue[255], 65535);
        // 101 * 257 * 1.5 = 38935.5
        assert_eq!(table.red[101], 38935);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let s = settings(137, 83, 12, (250, 190, 77));
        assert_eq!(GammaTable::compute(&s), GammaTable::compute(&s));
    }
}
