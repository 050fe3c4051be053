//! Garbage collection
//!
//! Copies the live units of the current block to the spare block, then
//! makes the spare current. The spare only becomes current once its magic
//! is programmed, which happens after every unit and the new generation
//! counter are in place. A power cut at any earlier point leaves the old
//! block current on the next init.

use dps_hal::BlockDevice;

use crate::error::PastError;
use crate::layout::PAST_MAGIC;
use crate::scan::{self, Walk};
use crate::store::Past;
use crate::unit;

impl<D: BlockDevice> Past<D> {
    /// Compact the store into the other block
    pub fn garbage_collect(&mut self) -> Result<(), PastError> {
        self.ensure_valid()?;
        let result = self.collect();
        self.track(result)
    }

    /// Collect if free space is below the configured limit
    ///
    /// Skipped when there is nothing to reclaim. Returns whether a
    /// collection ran. Cheap enough to call from an idle loop.
    pub fn gc_check(&mut self) -> Result<bool, PastError> {
        self.ensure_valid()?;
        if self.remaining() >= self.config.gc_limit {
            return Ok(false);
        }

        let reclaimable = scan::tombstone_bytes(&self.flash, self.block());
        match self.track(reclaimable)? {
            0 => Ok(false),
            _ => {
                let result = self.collect();
                self.track(result).map(|()| true)
            }
        }
    }

    pub(crate) fn collect(&mut self) -> Result<(), PastError> {
        self.unlocked(Self::relocate)
    }

    fn relocate(&mut self) -> Result<(), PastError> {
        let from = self.block();
        let to = self.spare();
        let counter = self.counter.wrapping_add(1);
        debug!("past: gc {:#x} -> {:#x}, generation {}", from.base, to.base, counter);

        unit::erase_block(&mut self.flash, to)?;

        let mut cursor = to.first_unit();
        let mut walk = Walk::new(from);
        while let Some(slot) = walk.next_slot(&self.flash) {
            let slot = match slot {
                Ok(slot) => slot,
                Err(e) => {
                    // Keep what precedes the damage
                    warn!("past: gc stopped at {}", e);
                    break;
                }
            };
            if !slot.is_live() {
                continue;
            }
            if let Ok(Some(_)) = scan::find_newer(&self.flash, from, &slot) {
                continue;
            }
            cursor = unit::copy_unit(&mut self.flash, &slot, cursor)?;
        }

        unit::program(&mut self.flash, to.counter_address(), counter)?;
        unit::program(&mut self.flash, to.magic_address(), PAST_MAGIC)?;

        let reclaimed = (self.cursor.saturating_sub(from.first_unit()))
            .saturating_sub(cursor - to.first_unit());
        self.current ^= 1;
        self.counter = counter;
        self.cursor = cursor;

        unit::erase_block(&mut self.flash, from)?;

        info!(
            "past: gc done, generation {}, {} bytes reclaimed, {} free",
            counter,
            reclaimed,
            self.remaining()
        );
        Ok(())
    }
}
