//! Error types for the gamma engine, preset store and hotkey router.

use std::path::PathBuf;

/// Errors reported by the display gamma port.
///
/// None of these are fatal: callers keep running with the display left
/// as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GammaError {
    /// No attached display accepts gamma ramps.
    #[error("Gamma ramps are not supported by any attached display")]
    Unsupported,

    /// The original ramp could not be read at startup, so there is nothing to restore.
    #[error("No default gamma ramp was saved")]
    NoDefaultRamp,

    /// A device context could not be obtained for the display.
    #[error("Failed to acquire device context for {device}")]
    AcquireFailed {
        /// Display the context was requested for.
        device: String,
    },

    /// An individual OS call failed.
    #[error("{call} failed on {device}")]
    CallFailed {
        /// Name of the OS call.
        call: &'static str,
        /// Display the call targeted.
        device: String,
    },
}

/// Errors reported by the preset store.
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    /// No preset with this name exists.
    #[error("Preset not found: {0}")]
    NotFound(String),

    /// Preset names must contain at least one non-whitespace character.
    #[error("Preset name is empty")]
    EmptyName,

    /// The hotkey attached to a preset is malformed.
    #[error("Invalid hotkey for preset: {0}")]
    InvalidHotkey(#[from] HotkeyError),

    /// Reading or writing the preset document failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The preset document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by combo parsing and the hotkey router.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HotkeyError {
    /// The combo string is empty.
    #[error("Hotkey is empty")]
    Empty,

    /// No modifier precedes the key.
    #[error("Hotkey '{0}' needs at least one modifier (ctrl, alt, shift, win)")]
    MissingModifier(String),

    /// A token before the key is not a modifier.
    #[error("Unknown modifier '{0}'")]
    UnknownModifier(String),

    /// The same modifier appears twice.
    #[error("Modifier '{0}' appears more than once")]
    DuplicateModifier(String),

    /// Nothing follows the last `+`.
    #[error("Hotkey '{0}' has no key after the modifiers")]
    EmptyKey(String),

    /// The key is neither a single printable character nor an arrow.
    #[error("Unsupported key '{0}'")]
    UnsupportedKey(String),

    /// The combo has no registered binding.
    #[error("Hotkey not registered: {0}")]
    NotRegistered(String),

    /// The OS refused the registration.
    #[error("Hotkey {combo} rejected: {reason}")]
    Rejected {
        /// Normalized combo.
        combo: String,
        /// Reason reported by the backend.
        reason: String,
    },

    /// The hotkey backend itself is unavailable.
    #[error("Hotkey backend error: {0}")]
    Backend(String),
}

/// Errors reported when reading or writing the settings document.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the document failed.
    #[error("IO error on {}: {source}", path.display())]
    Io {
        /// Document path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The document could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
