//! Block scanner
//!
//! Walks the unit chain of a block from its first slot until the end
//! marker. The walk never leaves the block: a unit whose size is erased,
//! zero, or reaches past the block end is reported as corruption instead
//! of being skipped.

use dps_hal::BlockDevice;

use crate::error::PastError;
use crate::layout::{unit_span, Block, UNIT_DATA_OFFSET, UNIT_ID_END, UNIT_ID_OFFSET, UNIT_SIZE_OFFSET};
use crate::unit::{Slot, UnitInfo};

/// Cursor over the unit chain of one block
///
/// Does not borrow the device, so units can be rewritten between steps.
#[derive(Debug, Clone)]
pub(crate) struct Walk {
    block: Block,
    address: u32,
    end_marker: Option<u32>,
    done: bool,
}

impl Walk {
    pub fn new(block: Block) -> Self {
        Self::starting_at(block, block.first_unit())
    }

    /// Resume a walk at a known slot boundary
    pub fn starting_at(block: Block, address: u32) -> Self {
        Self {
            block,
            address,
            end_marker: None,
            done: false,
        }
    }

    /// Address of the end marker, once the walk has reached it
    ///
    /// `None` after a finished walk means the block has no free slot.
    pub fn end_marker(&self) -> Option<u32> {
        self.end_marker
    }

    /// Step to the next unit, tombstones included
    pub fn next_slot<D: BlockDevice>(&mut self, flash: &D) -> Option<Result<Slot, PastError>> {
        if self.done {
            return None;
        }

        let address = self.address;
        let end = self.block.end();
        if address >= end {
            self.done = true;
            return None;
        }

        let id = flash.read_word(address + UNIT_ID_OFFSET);
        if id == UNIT_ID_END {
            self.done = true;
            self.end_marker = Some(address);
            return None;
        }

        if address + UNIT_DATA_OFFSET > end {
            return Some(Err(self.corrupted(address)));
        }

        let size = flash.read_word(address + UNIT_SIZE_OFFSET);
        if size == 0 || size == UNIT_ID_END {
            return Some(Err(self.corrupted(address)));
        }

        let next = match unit_span(size).and_then(|span| address.checked_add(span)) {
            Some(next) if next <= end => next,
            _ => return Some(Err(self.corrupted(address))),
        };
        self.address = next;

        Some(Ok(Slot { address, id, size }))
    }

    fn corrupted(&mut self, address: u32) -> PastError {
        warn!("past: corrupted unit at {:#x}", address);
        self.done = true;
        PastError::Corrupted { address }
    }
}

/// Find the unit with `id` in `block`
///
/// Returns the first match. Reaching the end marker or the block end
/// without a match is `Ok(None)`; a broken chain is an error.
pub(crate) fn find_unit<D: BlockDevice>(
    flash: &D,
    block: Block,
    id: u32,
) -> Result<Option<Slot>, PastError> {
    find_unit_from(flash, Walk::new(block), id)
}

/// Find the next unit with the same id after `slot`
pub(crate) fn find_newer<D: BlockDevice>(
    flash: &D,
    block: Block,
    slot: &Slot,
) -> Result<Option<Slot>, PastError> {
    find_unit_from(flash, Walk::starting_at(block, slot.next()), slot.id)
}

fn find_unit_from<D: BlockDevice>(flash: &D, mut walk: Walk, id: u32) -> Result<Option<Slot>, PastError> {
    while let Some(slot) = walk.next_slot(flash) {
        let slot = slot?;
        if slot.id == id {
            return Ok(Some(slot));
        }
    }
    Ok(None)
}

/// Find the end marker of `block`
///
/// Returns `Ok(None)` if the chain fills the block completely.
pub(crate) fn find_end<D: BlockDevice>(flash: &D, block: Block) -> Result<Option<u32>, PastError> {
    let mut walk = Walk::new(block);
    while let Some(slot) = walk.next_slot(flash) {
        slot?;
    }
    Ok(walk.end_marker())
}

/// Sum of the spans held by tombstones in `block`
pub(crate) fn tombstone_bytes<D: BlockDevice>(flash: &D, block: Block) -> Result<u32, PastError> {
    let mut walk = Walk::new(block);
    let mut total = 0u32;
    while let Some(slot) = walk.next_slot(flash) {
        let slot = slot?;
        if !slot.is_live() {
            total += slot.span();
        }
    }
    Ok(total)
}

/// Iterator over the live units of the current block
///
/// Stops after the first error.
pub struct Units<'a, D: BlockDevice> {
    flash: &'a D,
    walk: Walk,
}

impl<'a, D: BlockDevice> Units<'a, D> {
    pub(crate) fn new(flash: &'a D, block: Block) -> Self {
        Self {
            flash,
            walk: Walk::new(block),
        }
    }
}

impl<'a, D: BlockDevice> Iterator for Units<'a, D> {
    type Item = Result<UnitInfo, PastError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.walk.next_slot(self.flash)? {
                Ok(slot) if slot.is_live() => return Some(Ok(slot.info())),
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
