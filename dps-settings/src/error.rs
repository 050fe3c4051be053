//! Settings error type

use core::fmt;

use dps_past::PastError;

/// Errors from loading or saving settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SettingsError {
    /// The underlying store failed
    Past(PastError),
    /// Value or stored unit has an unexpected length
    InvalidLength,
    /// Stored string is not UTF-8
    InvalidUtf8,
    /// No parameter with this name
    UnknownParameter,
    /// Value outside the range the setting accepts
    OutOfRange,
}

impl From<PastError> for SettingsError {
    fn from(e: PastError) -> Self {
        SettingsError::Past(e)
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Past(e) => write!(f, "past: {}", e),
            SettingsError::InvalidLength => f.write_str("value has wrong length"),
            SettingsError::InvalidUtf8 => f.write_str("stored string is not UTF-8"),
            SettingsError::UnknownParameter => f.write_str("unknown parameter"),
            SettingsError::OutOfRange => f.write_str("value out of range"),
        }
    }
}
