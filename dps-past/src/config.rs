//! Store placement and tuning

use crate::error::PastError;
use crate::layout::{unit_span, Block, HEADER_FIRST_UNIT_OFFSET, MIN_UNIT_LENGTH};

/// Default block size, one STM32F100 flash page
pub const PAST_BLOCK_SIZE: u32 = 1024;

/// Free space below which a garbage collection is run after a write
pub const PAST_GC_LIMIT: u32 = 32;

/// Where the two past blocks live and how eagerly to compact them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PastConfig {
    /// Device addresses of block A and block B
    pub blocks: [u32; 2],
    /// Size of each block in bytes, a multiple of the erase page size
    pub block_size: u32,
    /// Proactive garbage collection threshold in bytes
    pub gc_limit: u32,
}

impl Default for PastConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

impl PastConfig {
    /// Two adjacent default-sized blocks starting at `base`
    pub const fn new(base: u32) -> Self {
        Self::with_blocks([base, base + PAST_BLOCK_SIZE])
    }

    /// Default-sized blocks at arbitrary addresses
    pub const fn with_blocks(blocks: [u32; 2]) -> Self {
        Self {
            blocks,
            block_size: PAST_BLOCK_SIZE,
            gc_limit: PAST_GC_LIMIT,
        }
    }

    /// Override the block size
    ///
    /// Adjacent blocks, as placed by [`PastConfig::new`], stay adjacent.
    pub const fn block_size(mut self, block_size: u32) -> Self {
        if self.blocks[1] == self.blocks[0].wrapping_add(self.block_size) {
            self.blocks[1] = self.blocks[0].wrapping_add(block_size);
        }
        self.block_size = block_size;
        self
    }

    /// Override the proactive garbage collection threshold
    pub const fn gc_limit(mut self, gc_limit: u32) -> Self {
        self.gc_limit = gc_limit;
        self
    }

    /// Block A (`index` 0) or block B (`index` 1)
    pub const fn block(&self, index: usize) -> Block {
        Block {
            base: self.blocks[index & 1],
            size: self.block_size,
        }
    }

    /// Check the placement against a device
    ///
    /// Blocks must be page aligned, span whole pages, fit the device, not
    /// overlap, and have room for at least one minimum sized unit.
    pub fn validate(&self, page_size: u32, capacity: u32) -> Result<(), PastError> {
        let min_size = HEADER_FIRST_UNIT_OFFSET + unit_span(MIN_UNIT_LENGTH as u32).unwrap_or(u32::MAX);

        if page_size == 0 || self.block_size < min_size || self.block_size % page_size != 0 {
            return Err(PastError::Geometry);
        }
        if self.gc_limit >= self.block_size {
            return Err(PastError::Geometry);
        }

        for base in self.blocks {
            if base % page_size != 0 {
                return Err(PastError::Geometry);
            }
            match base.checked_add(self.block_size) {
                Some(end) if end <= capacity => {}
                _ => return Err(PastError::Geometry),
            }
        }

        let [a, b] = self.blocks;
        if a.abs_diff(b) < self.block_size {
            return Err(PastError::Geometry);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PastConfig::default();
        assert_eq!(config.blocks, [0, 1024]);
        assert_eq!(config.block_size, PAST_BLOCK_SIZE);
        assert_eq!(config.gc_limit, PAST_GC_LIMIT);
        assert_eq!(config.validate(1024, 2048), Ok(()));
    }

    #[test]
    fn test_block_selection() {
        let config = PastConfig::with_blocks([4096, 1024]);
        assert_eq!(config.block(0).base, 4096);
        assert_eq!(config.block(1).base, 1024);
        assert_eq!(config.block(1).end(), 2048);
    }

    #[test]
    fn test_block_must_span_whole_pages() {
        let config = PastConfig::new(0).block_size(1536);
        assert_eq!(config.validate(1024, 8192), Err(PastError::Geometry));

        let config = PastConfig::new(0).block_size(2048);
        assert_eq!(config.validate(1024, 8192), Ok(()));
    }

    #[test]
    fn test_block_size_keeps_blocks_adjacent() {
        let config = PastConfig::new(4096).block_size(2048);
        assert_eq!(config.blocks, [4096, 6144]);
        assert_eq!(config.block(0).end(), config.block(1).base);
        assert_eq!(config.validate(1024, 8192), Ok(()));

        let config = PastConfig::with_blocks([0, 4096]).block_size(2048);
        assert_eq!(config.blocks, [0, 4096]);
    }

    #[test]
    fn test_blocks_must_fit_device() {
        assert_eq!(PastConfig::new(1024).validate(1024, 2048), Err(PastError::Geometry));
        assert_eq!(
            PastConfig::with_blocks([0, u32::MAX - 1023]).validate(1024, u32::MAX),
            Err(PastError::Geometry)
        );
    }

    #[test]
    fn test_blocks_must_not_overlap() {
        let config = PastConfig::with_blocks([1024, 1024]);
        assert_eq!(config.validate(1024, 4096), Err(PastError::Geometry));
    }

    #[test]
    fn test_blocks_must_be_page_aligned() {
        let config = PastConfig::with_blocks([0, 1536]).block_size(512);
        assert_eq!(config.validate(1024, 4096), Err(PastError::Geometry));
        assert_eq!(config.validate(512, 4096), Ok(()));
    }

    #[test]
    fn test_gc_limit_must_leave_room() {
        let config = PastConfig::new(0).gc_limit(1024);
        assert_eq!(config.validate(1024, 2048), Err(PastError::Geometry));
    }
}
