//! Flash block device for STM32F1
//!
//! STM32F100 parts have 1KB pages and program in half-words; the embassy
//! driver takes care of unlocking the controller around each operation.
//! The flash array is memory mapped at `FLASH_BASE`, so reads go straight
//! to memory and stored values can be handed out without copying.

use embassy_stm32::flash::{Blocking, Error, Flash, FLASH_BASE, FLASH_SIZE};
use embassy_stm32::peripherals::FLASH;
use embassy_stm32::Peri;

use dps_hal::flash::{BlockDevice, FlashError, MemoryMapped, ERASED_WORD};

/// Flash page size for STM32F100 series
pub const FLASH_PAGE_SIZE: u32 = 1024; // 1KB pages

/// Size of one past block
pub const PAST_BLOCK_SIZE: u32 = FLASH_PAGE_SIZE;

/// Past partition: the last two pages of flash
pub const PAST_PARTITION_SIZE: u32 = 2 * PAST_BLOCK_SIZE;
pub const PAST_PARTITION_START: u32 = FLASH_SIZE as u32 - PAST_PARTITION_SIZE;

/// Offsets of the two past blocks
pub const PAST_BLOCKS: [u32; 2] = [PAST_PARTITION_START, PAST_PARTITION_START + PAST_BLOCK_SIZE];

/// STM32F1 internal flash as a past block device
///
/// Addresses are offsets from the start of flash.
pub struct Stm32Flash<'d> {
    flash: Flash<'d, Blocking>,
}

impl<'d> Stm32Flash<'d> {
    /// Create a new flash block device
    pub fn new(flash: Peri<'d, FLASH>) -> Self {
        Self {
            flash: Flash::new_blocking(flash),
        }
    }

    fn in_bounds(address: u32, len: usize) -> bool {
        (address as usize)
            .checked_add(len)
            .is_some_and(|end| end <= FLASH_SIZE)
    }
}

fn to_flash_error(error: Error) -> FlashError {
    match error {
        Error::Unaligned => FlashError::Unaligned,
        Error::Size => FlashError::OutOfBounds,
        Error::Protected => FlashError::Locked,
        _ => FlashError::Program,
    }
}

impl<'d> BlockDevice for Stm32Flash<'d> {
    const PAGE_SIZE: u32 = FLASH_PAGE_SIZE;

    fn capacity(&self) -> u32 {
        FLASH_SIZE as u32
    }

    fn read_word(&self, address: u32) -> u32 {
        if address % 4 != 0 || !Self::in_bounds(address, 4) {
            return ERASED_WORD;
        }
        // SAFETY: the range was checked against the mapped flash array and
        // the address is word aligned.
        unsafe { core::ptr::read_volatile((FLASH_BASE + address as usize) as *const u32) }
    }

    fn program_word(&mut self, address: u32, value: u32) -> Result<(), FlashError> {
        self.flash
            .blocking_write(address, &value.to_le_bytes())
            .map_err(to_flash_error)
    }

    fn erase_page(&mut self, address: u32) -> Result<(), FlashError> {
        self.flash
            .blocking_erase(address, address + FLASH_PAGE_SIZE)
            .map_err(|e| match to_flash_error(e) {
                FlashError::Program => FlashError::Erase,
                other => other,
            })
    }
}

impl<'d> MemoryMapped for Stm32Flash<'d> {
    fn slice(&self, address: u32, len: usize) -> Option<&[u8]> {
        if !Self::in_bounds(address, len) {
            return None;
        }
        // SAFETY: flash is memory mapped for the lifetime of the program and
        // the range was checked. The borrow of `self` keeps the driver from
        // programming or erasing while the slice is alive.
        Some(unsafe { core::slice::from_raw_parts((FLASH_BASE + address as usize) as *const u8, len) })
    }
}
