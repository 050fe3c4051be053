//! Unit codec
//!
//! Lays out `[id][size][payload][padding]` records at a flash address and
//! reads them back. Every program and erase is verified by reading the
//! flash back.
//!
//! Fields are committed in a fixed order so that a power cut leaves a
//! state the next init can recognize: payload, then size, then id. Until
//! the id word is programmed the slot still reads as the end marker.

use dps_hal::{BlockDevice, ERASED_WORD};

use crate::error::PastError;
use crate::layout::{
    unit_span, Block, UNIT_DATA_OFFSET, UNIT_ID_INVALID, UNIT_ID_OFFSET, UNIT_SIZE_OFFSET,
};

/// A live unit as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnitInfo {
    /// Unit id
    pub id: u32,
    /// Payload length in bytes
    pub length: u32,
}

/// A unit header found while walking a block
///
/// Only produced by the scanner, which guarantees that `size` is sane and
/// that the whole unit lies inside the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub address: u32,
    pub id: u32,
    pub size: u32,
}

impl Slot {
    /// Tombstoned units keep their size but have id 0
    pub fn is_live(&self) -> bool {
        self.id != UNIT_ID_INVALID
    }

    pub fn data_address(&self) -> u32 {
        self.address + UNIT_DATA_OFFSET
    }

    /// Bytes taken by the unit, header and padding included
    pub fn span(&self) -> u32 {
        unit_span(self.size).unwrap_or(u32::MAX)
    }

    /// Address of the slot following this unit
    pub fn next(&self) -> u32 {
        self.address.saturating_add(self.span())
    }

    fn payload_words(&self) -> u32 {
        (self.span() - UNIT_DATA_OFFSET) / 4
    }

    pub fn info(&self) -> UnitInfo {
        UnitInfo {
            id: self.id,
            length: self.size,
        }
    }
}

/// Program a word and read it back
pub(crate) fn program<D: BlockDevice>(
    flash: &mut D,
    address: u32,
    value: u32,
) -> Result<(), PastError> {
    flash.program_word(address, value)?;
    if flash.read_word(address) != value {
        warn!("past: verify failed at {:#x}", address);
        return Err(PastError::Verify { address });
    }
    Ok(())
}

/// Erase every page of a block and check that it reads back erased
pub(crate) fn erase_block<D: BlockDevice>(flash: &mut D, block: Block) -> Result<(), PastError> {
    for page in (block.base..block.end()).step_by(D::PAGE_SIZE as usize) {
        flash.erase_page(page)?;
    }
    for address in (block.base..block.end()).step_by(4) {
        if flash.read_word(address) != ERASED_WORD {
            warn!("past: erase verify failed at {:#x}", address);
            return Err(PastError::Verify { address });
        }
    }
    Ok(())
}

/// Append a unit at `address`
///
/// The caller must have checked that the unit fits. Returns the address
/// of the next free slot.
pub(crate) fn write_unit<D: BlockDevice>(
    flash: &mut D,
    address: u32,
    id: u32,
    data: &[u8],
) -> Result<u32, PastError> {
    let size = u32::try_from(data.len()).map_err(|_| PastError::Full)?;
    let span = unit_span(size).ok_or(PastError::Full)?;

    let mut word_address = address + UNIT_DATA_OFFSET;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        program(flash, word_address, u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))?;
        word_address += 4;
    }

    // Trailing 1..3 bytes, least significant byte first, zero padded
    let tail = chunks.remainder();
    if !tail.is_empty() {
        let word = tail
            .iter()
            .enumerate()
            .fold(0u32, |word, (i, &b)| word | (b as u32) << (8 * i));
        program(flash, word_address, word)?;
    }

    program(flash, address + UNIT_SIZE_OFFSET, size)?;
    // Commit
    program(flash, address + UNIT_ID_OFFSET, id)?;

    trace!("past: wrote unit {} ({} bytes) at {:#x}", id, size, address);
    Ok(address + span)
}

/// Copy a unit's payload into `buf`
pub(crate) fn read_payload<D: BlockDevice>(
    flash: &D,
    slot: &Slot,
    buf: &mut [u8],
) -> Result<usize, PastError> {
    let len = slot.size as usize;
    let buf = buf.get_mut(..len).ok_or(PastError::BufferTooSmall)?;

    let mut address = slot.data_address();
    for chunk in buf.chunks_mut(4) {
        let word = flash.read_word(address).to_le_bytes();
        chunk.copy_from_slice(&word[..chunk.len()]);
        address += 4;
    }
    Ok(len)
}

/// Turn a unit into a tombstone: zero the payload, then the id
///
/// The size field is left alone so the span can still be skipped.
pub(crate) fn tombstone<D: BlockDevice>(flash: &mut D, slot: &Slot) -> Result<(), PastError> {
    let base = slot.data_address();
    for i in 0..slot.payload_words() {
        program(flash, base + 4 * i, 0)?;
    }
    program(flash, slot.address + UNIT_ID_OFFSET, UNIT_ID_INVALID)?;

    trace!("past: removed unit {} at {:#x}", slot.id, slot.address);
    Ok(())
}

/// Copy a unit to `dst` in commit order, returning the next free slot
pub(crate) fn copy_unit<D: BlockDevice>(flash: &mut D, slot: &Slot, dst: u32) -> Result<u32, PastError> {
    let src = slot.data_address();
    let dst_data = dst + UNIT_DATA_OFFSET;
    for i in 0..slot.payload_words() {
        let word = flash.read_word(src + 4 * i);
        program(flash, dst_data + 4 * i, word)?;
    }
    program(flash, dst + UNIT_SIZE_OFFSET, slot.size)?;
    program(flash, dst + UNIT_ID_OFFSET, slot.id)?;
    Ok(dst + slot.span())
}
