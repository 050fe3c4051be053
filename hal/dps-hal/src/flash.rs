//! Flash block device abstractions
//!
//! NOR flash as seen by the parameter store: words can be read at any
//! time, programming can only clear bits, and the only way to set bits
//! again is to erase a whole page.

/// Value of a word in erased flash
pub const ERASED_WORD: u32 = 0xFFFF_FFFF;

/// Errors reported by a block device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Word programming failed (controller reported an error)
    Program,
    /// Page erase failed
    Erase,
    /// Address outside the device
    OutOfBounds,
    /// Address not aligned to the word or page size
    Unaligned,
    /// Device is write protected
    Locked,
    /// Power was lost in the middle of the operation
    PowerLoss,
}

/// Word-granular flash block device
///
/// Addresses are byte offsets from the start of the device. All word
/// accesses must be 4-byte aligned and words are little-endian.
pub trait BlockDevice {
    /// Erase page size in bytes
    const PAGE_SIZE: u32;

    /// Total device size in bytes
    fn capacity(&self) -> u32;

    /// Read the 32-bit word at `address`
    fn read_word(&self, address: u32) -> u32;

    /// Program the 32-bit word at `address`
    ///
    /// Returns the controller status. Callers that need certainty must
    /// read the word back, as programming can only clear bits.
    fn program_word(&mut self, address: u32, value: u32) -> Result<(), FlashError>;

    /// Erase the page starting at `address`
    fn erase_page(&mut self, address: u32) -> Result<(), FlashError>;

    /// Lift write protection before a sequence of program/erase calls
    fn unlock(&mut self) {}

    /// Restore write protection
    fn lock(&mut self) {}
}

/// Block device whose contents are directly addressable
///
/// On internal MCU flash the whole array is mapped into the address space,
/// so stored values can be handed out as slices without copying.
pub trait MemoryMapped: BlockDevice {
    /// Borrow `len` bytes starting at `address`
    ///
    /// Returns `None` if the range is outside the device.
    fn slice(&self, address: u32, len: usize) -> Option<&[u8]>;
}
