//! Store controller
//!
//! Owns the block device and tracks which block is current, its
//! generation counter and the write cursor. All of this state is rebuilt
//! from flash by [`Past::init`], nothing is persisted besides the blocks.

use dps_hal::{BlockDevice, MemoryMapped, ERASED_WORD};

use crate::config::PastConfig;
use crate::error::PastError;
use crate::layout::{is_valid_id, unit_span, Block, MIN_UNIT_LENGTH, PAST_MAGIC};
use crate::scan::{self, Units, Walk};
use crate::unit::{self, Slot};

/// Parameter store over two flash blocks
pub struct Past<D: BlockDevice> {
    pub(crate) flash: D,
    pub(crate) config: PastConfig,
    /// Index of the current block in `config.blocks`
    pub(crate) current: usize,
    pub(crate) counter: u32,
    /// First free slot of the current block
    pub(crate) cursor: u32,
    pub(crate) valid: bool,
    unlock_depth: u8,
}

impl<D: BlockDevice> Past<D> {
    /// Take ownership of `flash` and check the block placement against it
    ///
    /// The store is unusable until [`Past::init`] succeeds.
    pub fn new(flash: D, config: PastConfig) -> Result<Self, PastError> {
        config.validate(D::PAGE_SIZE, flash.capacity())?;
        Ok(Self {
            flash,
            config,
            current: 0,
            counter: 0,
            cursor: config.block(0).first_unit(),
            valid: false,
            unlock_depth: 0,
        })
    }

    /// Pick the current block and rebuild the in-memory state
    ///
    /// Formats the store if neither block carries a valid header. A
    /// half-written unit, a full block or a broken unit chain is repaired
    /// by a garbage collection. Calling `init` on a healthy store leaves
    /// flash untouched.
    pub fn init(&mut self) -> Result<(), PastError> {
        self.valid = false;

        let current = match [self.header(0), self.header(1)] {
            [Some(a), Some(b)] if b > a => 1,
            [Some(_), _] => 0,
            [None, Some(_)] => 1,
            [None, None] => {
                info!("past: no valid block, formatting");
                return self.format();
            }
        };
        self.current = current;
        self.counter = self.header(current).unwrap_or(0);
        debug!("past: block {} is current, generation {}", current, self.counter);

        let block = self.block();
        let repair = match scan::find_end(&self.flash, block) {
            Ok(Some(end)) => {
                self.cursor = end;
                match self.first_dirty_word(end) {
                    Some(address) => {
                        warn!("past: half-written unit at {:#x}", address);
                        true
                    }
                    None => false,
                }
            }
            Ok(None) => {
                debug!("past: block {} is full", current);
                self.cursor = block.end();
                true
            }
            Err(_) => {
                self.cursor = block.end();
                true
            }
        };

        if repair {
            self.collect()?;
        }
        self.settle_duplicates()?;

        self.valid = true;
        info!(
            "past: ready, block {} generation {}, {} bytes free",
            self.current,
            self.counter,
            self.remaining()
        );
        Ok(())
    }

    /// Erase both blocks and start over on block A at generation 0
    pub fn format(&mut self) -> Result<(), PastError> {
        self.valid = false;

        let a = self.config.block(0);
        let b = self.config.block(1);
        self.unlocked(|past| {
            unit::erase_block(&mut past.flash, a)?;
            unit::erase_block(&mut past.flash, b)?;
            unit::program(&mut past.flash, a.counter_address(), 0)?;
            unit::program(&mut past.flash, a.magic_address(), PAST_MAGIC)
        })?;

        self.current = 0;
        self.counter = 0;
        self.cursor = a.first_unit();
        self.valid = true;
        info!("past: formatted");
        Ok(())
    }

    /// Store `data` under `id`, replacing any previous value
    ///
    /// Arguments are checked before flash is touched. The new unit is
    /// committed before the previous one is removed, so a power cut leaves
    /// either the old or the new value readable after `init`.
    pub fn write(&mut self, id: u32, data: &[u8]) -> Result<(), PastError> {
        if !is_valid_id(id) {
            return Err(PastError::InvalidId);
        }
        if data.len() < MIN_UNIT_LENGTH {
            return Err(PastError::TooShort);
        }
        self.ensure_valid()?;

        let capacity = self.block().capacity();
        let span = match u32::try_from(data.len()).ok().and_then(unit_span) {
            Some(span) if span <= capacity => span,
            _ => {
                warn!("past: unit {} ({} bytes) can never fit", id, data.len());
                return Err(PastError::Full);
            }
        };

        let result = self.unlocked(|past| past.append(id, data, span));
        self.track(result)?;

        if let Err(e) = self.gc_check() {
            warn!("past: proactive gc failed: {}", e);
        }
        Ok(())
    }

    /// Remove the unit stored under `id`
    pub fn erase(&mut self, id: u32) -> Result<(), PastError> {
        if !is_valid_id(id) {
            return Err(PastError::InvalidId);
        }
        let block = self.block();
        let first = self.lookup(id)?;

        let result = self.unlocked(|past| {
            let mut next = Some(first);
            while let Some(slot) = next {
                unit::tombstone(&mut past.flash, &slot)?;
                next = scan::find_newer(&past.flash, block, &slot)?;
            }
            Ok(())
        });
        self.track(result)
    }

    /// Copy the unit stored under `id` into `buf`
    ///
    /// Returns the payload length.
    pub fn read_into(&self, id: u32, buf: &mut [u8]) -> Result<usize, PastError> {
        let slot = self.lookup(id)?;
        unit::read_payload(&self.flash, &slot, buf)
    }

    /// Check whether a live unit is stored under `id`
    pub fn contains(&self, id: u32) -> Result<bool, PastError> {
        match self.lookup(id) {
            Ok(_) => Ok(true),
            Err(PastError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Bytes left between the write cursor and the end of the current block
    pub fn remaining(&self) -> u32 {
        self.block().end().saturating_sub(self.cursor)
    }

    /// Bytes held by removed units, recovered by the next collection
    pub fn reclaimable(&self) -> Result<u32, PastError> {
        self.ensure_valid()?;
        scan::tombstone_bytes(&self.flash, self.block())
    }

    /// Generation counter of the current block
    pub fn generation(&self) -> u32 {
        self.counter
    }

    /// Index of the current block, 0 for block A and 1 for block B
    pub fn current_block(&self) -> usize {
        self.current
    }

    /// Check whether the store has been initialized and not invalidated
    /// by a failed flash operation since
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Iterate over the live units of the current block
    pub fn units(&self) -> Result<Units<'_, D>, PastError> {
        self.ensure_valid()?;
        Ok(Units::new(&self.flash, self.block()))
    }

    pub fn flash(&self) -> &D {
        &self.flash
    }

    /// Give the block device back
    pub fn release(self) -> D {
        self.flash
    }

    pub(crate) fn block(&self) -> Block {
        self.config.block(self.current)
    }

    pub(crate) fn spare(&self) -> Block {
        self.config.block(self.current ^ 1)
    }

    pub(crate) fn ensure_valid(&self) -> Result<(), PastError> {
        if self.valid {
            Ok(())
        } else {
            Err(PastError::Uninitialized)
        }
    }

    /// Run `f` with the device write enabled
    ///
    /// Nested calls keep the device unlocked until the outermost one
    /// returns, whether it succeeded or not.
    pub(crate) fn unlocked<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, PastError>,
    ) -> Result<T, PastError> {
        if self.unlock_depth == 0 {
            self.flash.unlock();
        }
        self.unlock_depth += 1;

        let result = f(self);

        self.unlock_depth -= 1;
        if self.unlock_depth == 0 {
            self.flash.lock();
        }
        result
    }

    /// Invalidate the store if a flash sequence failed part way
    ///
    /// The in-memory cursor can no longer be trusted, `init` must rescan.
    pub(crate) fn track<T>(&mut self, result: Result<T, PastError>) -> Result<T, PastError> {
        if let Err(e) = &result {
            if !matches!(e, PastError::Full) && !e.is_caller_error() {
                warn!("past: invalidated by {}", e);
                self.valid = false;
            }
        }
        result
    }

    /// Magic check and generation counter of block `index`
    fn header(&self, index: usize) -> Option<u32> {
        let block = self.config.block(index);
        if self.flash.read_word(block.magic_address()) == PAST_MAGIC {
            Some(self.flash.read_word(block.counter_address()))
        } else {
            None
        }
    }

    /// First programmed word between `from` and the end of the current block
    fn first_dirty_word(&self, from: u32) -> Option<u32> {
        (from..self.block().end())
            .step_by(4)
            .find(|&address| self.flash.read_word(address) != ERASED_WORD)
    }

    fn lookup(&self, id: u32) -> Result<Slot, PastError> {
        if !is_valid_id(id) {
            return Err(PastError::InvalidId);
        }
        self.ensure_valid()?;
        scan::find_unit(&self.flash, self.block(), id)?.ok_or(PastError::NotFound)
    }

    fn append(&mut self, id: u32, data: &[u8], span: u32) -> Result<(), PastError> {
        if self.remaining() < span {
            debug!("past: {} bytes needed, {} free, collecting", span, self.remaining());
            self.collect()?;
            if self.remaining() < span {
                warn!("past: no room for unit {} ({} bytes)", id, data.len());
                return Err(PastError::Full);
            }
        }

        let previous = scan::find_unit(&self.flash, self.block(), id)?;
        self.cursor = unit::write_unit(&mut self.flash, self.cursor, id, data)?;
        if let Some(previous) = previous {
            unit::tombstone(&mut self.flash, &previous)?;
        }
        Ok(())
    }

    /// Remove older copies of ids that were written twice
    ///
    /// Only happens when power was lost between committing a new unit and
    /// removing the one it replaces. The newest copy wins.
    fn settle_duplicates(&mut self) -> Result<(), PastError> {
        let block = self.block();
        let mut walk = Walk::new(block);
        while let Some(slot) = walk.next_slot(&self.flash) {
            let slot = slot?;
            if slot.is_live() && scan::find_newer(&self.flash, block, &slot)?.is_some() {
                warn!("past: unit {} at {:#x} superseded", slot.id, slot.address);
                self.unlocked(|past| unit::tombstone(&mut past.flash, &slot))?;
            }
        }
        Ok(())
    }
}

impl<D: MemoryMapped> Past<D> {
    /// Borrow the payload stored under `id` directly from flash
    ///
    /// The borrow ends before the store can be modified again.
    pub fn read(&self, id: u32) -> Result<&[u8], PastError> {
        let slot = self.lookup(id)?;
        self.flash
            .slice(slot.data_address(), slot.size as usize)
            .ok_or(PastError::Corrupted {
                address: slot.address,
            })
    }
}
