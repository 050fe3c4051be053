//! On-flash layout
//!
//! ```text
//! [  magic:32  ] [ counter:32 ]
//! [   id:32    ] [  size:32   ] [   data+   ] [ padding <0-3 bytes> ]
//! [   id:32    ] [  size:32   ] [   data+   ] [ padding <0-3 bytes> ]
//!    .
//!    .
//! [ 0xffffffff ] [ 0xffffffff ]  <- first unwritten word, not a unit
//! ```
//!
//! All fields are little-endian 32-bit words. Units start on word
//! boundaries, which is the minimum programmable unit of the STM32F100.

/// Block magic, "Past" in ASCII
pub const PAST_MAGIC: u32 = 0x5061_7374;

/// Id of a removed unit. Never a valid write target.
pub const UNIT_ID_INVALID: u32 = 0;

/// Id read at the first unwritten slot of a block. Never a valid write target.
pub const UNIT_ID_END: u32 = 0xFFFF_FFFF;

pub const HEADER_MAGIC_OFFSET: u32 = 0;
pub const HEADER_COUNTER_OFFSET: u32 = 4;
pub const HEADER_FIRST_UNIT_OFFSET: u32 = 8;

pub const UNIT_ID_OFFSET: u32 = 0;
pub const UNIT_SIZE_OFFSET: u32 = 4;
pub const UNIT_DATA_OFFSET: u32 = 8;

/// Shortest payload accepted by `write`
///
/// Sub-word units are known to corrupt the store, so they are rejected.
pub const MIN_UNIT_LENGTH: usize = 4;

/// Round a payload length up to the next word boundary
///
/// Returns `None` if the result does not fit 32 bits.
pub const fn word_align(len: u32) -> Option<u32> {
    match len.checked_add(3) {
        Some(n) => Some(n & !3),
        None => None,
    }
}

/// Bytes taken by a unit with a `len` byte payload, header included
pub const fn unit_span(len: u32) -> Option<u32> {
    match word_align(len) {
        Some(n) => n.checked_add(UNIT_DATA_OFFSET),
        None => None,
    }
}

/// Check that `id` can be written, read or erased
pub const fn is_valid_id(id: u32) -> bool {
    id != UNIT_ID_INVALID && id != UNIT_ID_END
}

/// One of the two flash regions used in alternation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Block {
    /// Device address of the block header
    pub base: u32,
    /// Block size in bytes
    pub size: u32,
}

impl Block {
    pub const fn magic_address(&self) -> u32 {
        self.base + HEADER_MAGIC_OFFSET
    }

    pub const fn counter_address(&self) -> u32 {
        self.base + HEADER_COUNTER_OFFSET
    }

    /// Address of the first unit slot
    pub const fn first_unit(&self) -> u32 {
        self.base + HEADER_FIRST_UNIT_OFFSET
    }

    /// First address past the block
    pub const fn end(&self) -> u32 {
        self.base + self.size
    }

    /// Largest unit span the block can ever hold
    pub const fn capacity(&self) -> u32 {
        self.size - HEADER_FIRST_UNIT_OFFSET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_spells_past() {
        assert_eq!(&PAST_MAGIC.to_be_bytes(), b"Past");
    }

    #[test]
    fn test_word_align() {
        assert_eq!(word_align(0), Some(0));
        assert_eq!(word_align(4), Some(4));
        assert_eq!(word_align(13), Some(16));
        assert_eq!(word_align(19), Some(20));
        assert_eq!(word_align(u32::MAX), None);
    }

    #[test]
    fn test_unit_span() {
        assert_eq!(unit_span(4), Some(12));
        assert_eq!(unit_span(13), Some(24));
        assert_eq!(unit_span(u32::MAX - 5), None);
    }

    #[test]
    fn test_reserved_ids() {
        assert!(!is_valid_id(UNIT_ID_INVALID));
        assert!(!is_valid_id(UNIT_ID_END));
        assert!(is_valid_id(1));
        assert!(is_valid_id(0xFF));
    }

    #[test]
    fn test_block_addresses() {
        let block = Block { base: 1024, size: 1024 };
        assert_eq!(block.magic_address(), 1024);
        assert_eq!(block.counter_address(), 1028);
        assert_eq!(block.first_unit(), 1032);
        assert_eq!(block.end(), 2048);
        assert_eq!(block.capacity(), 1016);
    }
}
