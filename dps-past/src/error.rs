//! Past error type

use core::fmt;

use dps_hal::FlashError;

/// Errors from past operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PastError {
    /// Unit id is one of the reserved values (0 or 0xFFFFFFFF)
    InvalidId,
    /// Payload is empty or shorter than the minimum unit length
    TooShort,
    /// The store has not been (successfully) initialized
    Uninitialized,
    /// No room for the unit, even after garbage collection
    Full,
    /// No live unit with this id
    NotFound,
    /// Caller buffer cannot hold the unit
    BufferTooSmall,
    /// Block placement does not fit the device
    Geometry,
    /// Unit chain is broken at this address
    Corrupted { address: u32 },
    /// Flash did not read back what was programmed or erased
    Verify { address: u32 },
    /// The block device reported an error
    Flash(FlashError),
}

impl PastError {
    /// Check if the error was caused by invalid arguments
    ///
    /// Caller errors are raised before flash is touched.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            PastError::InvalidId | PastError::TooShort | PastError::BufferTooSmall
        )
    }

    /// Check if re-running `init` is expected to repair the store
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PastError::Uninitialized
                | PastError::Corrupted { .. }
                | PastError::Verify { .. }
                | PastError::Flash(FlashError::PowerLoss)
        )
    }
}

impl From<FlashError> for PastError {
    fn from(e: FlashError) -> Self {
        PastError::Flash(e)
    }
}

impl fmt::Display for PastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PastError::InvalidId => f.write_str("reserved unit id"),
            PastError::TooShort => f.write_str("unit shorter than 4 bytes"),
            PastError::Uninitialized => f.write_str("past not initialized"),
            PastError::Full => f.write_str("past full"),
            PastError::NotFound => f.write_str("unit not found"),
            PastError::BufferTooSmall => f.write_str("buffer too small"),
            PastError::Geometry => f.write_str("invalid block geometry"),
            PastError::Corrupted { address } => write!(f, "corrupted unit at {:#010x}", address),
            PastError::Verify { address } => write!(f, "flash verify failed at {:#010x}", address),
            PastError::Flash(e) => write!(f, "flash error: {:?}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_errors() {
        assert!(PastError::InvalidId.is_caller_error());
        assert!(PastError::TooShort.is_caller_error());
        assert!(!PastError::Full.is_caller_error());
        assert!(!PastError::Flash(FlashError::Program).is_caller_error());
    }

    #[test]
    fn test_recoverable() {
        assert!(PastError::Verify { address: 8 }.is_recoverable());
        assert!(PastError::from(FlashError::PowerLoss).is_recoverable());
        assert!(!PastError::Full.is_recoverable());
        assert!(!PastError::NotFound.is_recoverable());
    }
}
