//! Logical display settings.

use serde::{Deserialize, Deserializer, Serialize};

/// Upper bound for brightness and contrast (percent, 100 = unchanged).
pub const MAX_LEVEL: i32 = 200;
/// Upper bound for grayscale (percent).
pub const MAX_GRAYSCALE: i32 = 100;
/// Upper bound for a color channel scale.
pub const MAX_CHANNEL: i32 = 255;

/// One of the three color channels of a gamma ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Red channel.
    Red,
    /// Green channel.
    Green,
    /// Blue channel.
    Blue,
}

/// Per-channel scale factors (0-255, 255 = unchanged).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelScale {
    /// Red channel scale.
    #[serde(deserialize_with = "de_channel")]
    pub red: u8,
    /// Green channel scale.
    #[serde(deserialize_with = "de_channel")]
    pub green: u8,
    /// Blue channel scale.
    #[serde(deserialize_with = "de_channel")]
    pub blue: u8,
}

impl ChannelScale {
    /// Build a scale, clamping each component to 0-255.
    pub fn new(red: i32, green: i32, blue: i32) -> Self {
        Self {
            red: clamp_u8(red, MAX_CHANNEL),
            green: clamp_u8(green, MAX_CHANNEL),
            blue: clamp_u8(blue, MAX_CHANNEL),
        }
    }

    /// Value of a single channel.
    pub fn get(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Red => self.red,
            Channel::Green => self.green,
            Channel::Blue => self.blue,
        }
    }

    /// Replace a single channel, clamping to 0-255.
    pub fn set(&mut self, channel: Channel, value: i32) {
        let value = clamp_u8(value, MAX_CHANNEL);
        match channel {
            Channel::Red => self.red = value,
            Channel::Green => self.green = value,
            Channel::Blue => self.blue = value,
        }
    }
}

impl Default for ChannelScale {
    fn default() -> Self {
        Self {
            red: 255,
            green: 255,
            blue: 255,
        }
    }
}

/// Brightness, contrast, grayscale and channel scale.
///
/// Every field is kept inside its valid range: constructors and setters
/// clamp, and deserialization clamps out-of-range integers instead of
/// failing. The default value leaves the display unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Brightness percent (0-200).
    #[serde(deserialize_with = "de_level")]
    pub brightness: u8,
    /// Contrast percent around mid-gray (0-200).
    #[serde(deserialize_with = "de_level")]
    pub contrast: u8,
    /// Grayscale mix percent (0-100).
    #[serde(deserialize_with = "de_grayscale")]
    pub grayscale: u8,
    /// Per-channel scale.
    pub rgb: ChannelScale,
}

impl DisplaySettings {
    /// Build settings from raw integers, clamping every field.
    pub fn new(brightness: i32, contrast: i32, grayscale: i32, rgb: ChannelScale) -> Self {
        Self {
            brightness: clamp_u8(brightness, MAX_LEVEL),
            contrast: clamp_u8(contrast, MAX_LEVEL),
            grayscale: clamp_u8(grayscale, MAX_GRAYSCALE),
            rgb,
        }
    }

    /// Re-apply the range limits to every field.
    ///
    /// Fields are public, so a value assembled by hand may be out of range.
    pub fn clamped(self) -> Self {
        Self::new(
            i32::from(self.brightness),
            i32::from(self.contrast),
            i32::from(self.grayscale),
            self.rgb,
        )
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            brightness: 100,
            contrast: 100,
            grayscale: 0,
            rgb: ChannelScale::default(),
        }
    }
}

pub(crate) fn clamp_u8(value: i32, max: i32) -> u8 {
    // max never exceeds 255, so the cast is lossless
    value.clamp(0, max) as u8
}

fn de_clamped<'de, D>(deserializer: D, max: i32) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(0, i64::from(max)) as u8)
}

fn de_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    de_clamped(deserializer, MAX_LEVEL)
}

fn de_grayscale<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    de_clamped(deserializer, MAX_GRAYSCALE)
}

fn de_channel<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    de_clamped(deserializer, MAX_CHANNEL)
}
