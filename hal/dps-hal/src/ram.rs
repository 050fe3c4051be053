//! RAM-backed flash device
//!
//! Behaves like internal NOR flash: programming clears bits only, erase
//! sets a whole page to `0xFF`, and the device comes up write protected.
//! A power budget can be set to cut power after a given number of
//! program/erase operations, which is how power-loss recovery is tested.

use crate::flash::{BlockDevice, FlashError, MemoryMapped, ERASED_WORD};

/// In-memory flash device of `SIZE` bytes with `PAGE` byte erase pages
pub struct RamFlash<const SIZE: usize, const PAGE: usize = 1024> {
    data: [u8; SIZE],
    locked: bool,
    /// Remaining program/erase operations before power is cut
    budget: Option<usize>,
    programs: usize,
    erases: usize,
}

impl<const SIZE: usize, const PAGE: usize> Default for RamFlash<SIZE, PAGE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize, const PAGE: usize> RamFlash<SIZE, PAGE> {
    /// Create a fully erased device
    pub const fn new() -> Self {
        Self::filled(0xFF)
    }

    /// Create a device where every byte reads `byte`
    ///
    /// Useful to simulate flash holding garbage from a previous firmware.
    pub const fn filled(byte: u8) -> Self {
        Self {
            data: [byte; SIZE],
            locked: true,
            budget: None,
            programs: 0,
            erases: 0,
        }
    }

    /// Cut power after `operations` more program/erase calls
    ///
    /// Every program/erase after that fails with [`FlashError::PowerLoss`]
    /// and leaves the contents untouched, until [`Self::restore_power`].
    pub fn cut_power_after(&mut self, operations: usize) {
        self.budget = Some(operations);
    }

    /// Power the device back up
    pub fn restore_power(&mut self) {
        self.budget = None;
    }

    /// Check whether a power cut has been triggered
    pub fn is_powered_down(&self) -> bool {
        self.budget == Some(0)
    }

    /// Number of successful word programs since creation
    pub fn program_count(&self) -> usize {
        self.programs
    }

    /// Number of successful page erases since creation
    pub fn erase_count(&self) -> usize {
        self.erases
    }

    /// Check if the device is currently write protected
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Raw device contents
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite a word regardless of flash semantics
    ///
    /// Used to inject corruption that real programming could not produce.
    pub fn poke_word(&mut self, address: u32, value: u32) -> Result<(), FlashError> {
        let index = Self::word_index(address)?;
        self.data[index..index + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn word_index(address: u32) -> Result<usize, FlashError> {
        if address % 4 != 0 {
            return Err(FlashError::Unaligned);
        }
        let index = address as usize;
        if index + 4 > SIZE {
            return Err(FlashError::OutOfBounds);
        }
        Ok(index)
    }

    /// Account for one program/erase operation against the power budget
    fn spend(&mut self) -> Result<(), FlashError> {
        match self.budget {
            Some(0) => Err(FlashError::PowerLoss),
            Some(n) => {
                self.budget = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

#[cfg(feature = "std")]
impl<const SIZE: usize, const PAGE: usize> RamFlash<SIZE, PAGE> {
    /// Load a device image from a file
    ///
    /// A missing file yields an erased device. Short files are padded
    /// with erased bytes.
    pub fn load(path: impl AsRef<std::path::Path>) -> std::io::Result<Self> {
        let mut flash = Self::new();
        match std::fs::read(path) {
            Ok(image) => {
                let len = image.len().min(SIZE);
                flash.data[..len].copy_from_slice(&image[..len]);
                Ok(flash)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(flash),
            Err(e) => Err(e),
        }
    }

    /// Save the device image to a file
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> std::io::Result<()> {
        std::fs::write(path, &self.data[..])
    }
}

impl<const SIZE: usize, const PAGE: usize> BlockDevice for RamFlash<SIZE, PAGE> {
    const PAGE_SIZE: u32 = PAGE as u32;

    fn capacity(&self) -> u32 {
        SIZE as u32
    }

    fn read_word(&self, address: u32) -> u32 {
        match Self::word_index(address) {
            Ok(index) => {
                let mut word = [0u8; 4];
                word.copy_from_slice(&self.data[index..index + 4]);
                u32::from_le_bytes(word)
            }
            Err(_) => ERASED_WORD,
        }
    }

    fn program_word(&mut self, address: u32, value: u32) -> Result<(), FlashError> {
        let index = Self::word_index(address)?;
        if self.locked {
            return Err(FlashError::Locked);
        }
        self.spend()?;

        let old = self.read_word(address);
        self.data[index..index + 4].copy_from_slice(&(old & value).to_le_bytes());
        self.programs += 1;
        Ok(())
    }

    fn erase_page(&mut self, address: u32) -> Result<(), FlashError> {
        if address as usize % PAGE != 0 {
            return Err(FlashError::Unaligned);
        }
        let start = address as usize;
        if start + PAGE > SIZE {
            return Err(FlashError::OutOfBounds);
        }
        if self.locked {
            return Err(FlashError::Locked);
        }
        self.spend()?;

        self.data[start..start + PAGE].fill(0xFF);
        self.erases += 1;
        Ok(())
    }

    fn unlock(&mut self) {
        self.locked = false;
    }

    fn lock(&mut self) {
        self.locked = true;
    }
}

impl<const SIZE: usize, const PAGE: usize> MemoryMapped for RamFlash<SIZE, PAGE> {
    fn slice(&self, address: u32, len: usize) -> Option<&[u8]> {
        let start = address as usize;
        let end = start.checked_add(len)?;
        self.data.get(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Flash = RamFlash<2048>;

    #[test]
    fn test_new_device_is_erased_and_locked() {
        let flash = Flash::new();
        assert!(flash.is_locked());
        assert!(flash.as_bytes().iter().all(|&b| b == 0xFF));
        assert_eq!(flash.read_word(0), ERASED_WORD);
    }

    #[test]
    fn test_program_requires_unlock() {
        let mut flash = Flash::new();
        assert_eq!(flash.program_word(0, 0x1234_5678), Err(FlashError::Locked));

        flash.unlock();
        flash.program_word(0, 0x1234_5678).unwrap();
        assert_eq!(flash.read_word(0), 0x1234_5678);
        assert_eq!(flash.as_bytes()[..4], [0x78, 0x56, 0x34, 0x12]);
    }

    #[test]
    fn test_program_only_clears_bits() {
        let mut flash = Flash::new();
        flash.unlock();
        flash.program_word(8, 0xF0F0_F0F0).unwrap();
        flash.program_word(8, 0x0FFF_FFFF).unwrap();
        assert_eq!(flash.read_word(8), 0x00F0_F0F0);
    }

    #[test]
    fn test_erase_page() {
        let mut flash = Flash::filled(0xCD);
        flash.unlock();
        flash.erase_page(1024).unwrap();
        assert_eq!(flash.read_word(0), 0xCDCD_CDCD);
        assert_eq!(flash.read_word(1024), ERASED_WORD);
        assert_eq!(flash.read_word(2044), ERASED_WORD);
        assert_eq!(flash.erase_count(), 1);

        assert_eq!(flash.erase_page(100), Err(FlashError::Unaligned));
        assert_eq!(flash.erase_page(2048), Err(FlashError::OutOfBounds));
    }

    #[test]
    fn test_alignment_and_bounds() {
        let mut flash = Flash::new();
        flash.unlock();
        assert_eq!(flash.program_word(2, 0), Err(FlashError::Unaligned));
        assert_eq!(flash.program_word(2048, 0), Err(FlashError::OutOfBounds));
        assert_eq!(flash.read_word(4096), ERASED_WORD);
    }

    #[test]
    fn test_power_cut() {
        let mut flash = Flash::new();
        flash.unlock();
        flash.cut_power_after(2);
        flash.program_word(0, 1).unwrap();
        flash.program_word(4, 2).unwrap();
        assert!(flash.is_powered_down());
        assert_eq!(flash.program_word(8, 3), Err(FlashError::PowerLoss));
        assert_eq!(flash.erase_page(0), Err(FlashError::PowerLoss));
        assert_eq!(flash.read_word(0), 1);
        assert_eq!(flash.read_word(8), ERASED_WORD);

        flash.restore_power();
        flash.program_word(8, 3).unwrap();
        assert_eq!(flash.program_count(), 3);
    }

    #[test]
    fn test_slice() {
        let mut flash = Flash::new();
        flash.unlock();
        flash.program_word(16, u32::from_le_bytes(*b"Past")).unwrap();
        assert_eq!(flash.slice(16, 4), Some(&b"Past"[..]));
        assert_eq!(flash.slice(2046, 4), None);
    }

    #[test]
    fn test_poke_ignores_flash_rules() {
        let mut flash = Flash::new();
        flash.poke_word(0, 0).unwrap();
        flash.poke_word(0, 0xFFFF_0000).unwrap();
        assert_eq!(flash.read_word(0), 0xFFFF_0000);
        assert!(flash.is_locked());
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_image_round_trip() {
        let dir = std::env::temp_dir().join("dps-hal-ram-image-test.bin");
        let mut flash = Flash::new();
        flash.unlock();
        flash.program_word(12, 0xDEAD_BEEF).unwrap();
        flash.save(&dir).unwrap();

        let loaded = Flash::load(&dir).unwrap();
        assert_eq!(loaded.read_word(12), 0xDEAD_BEEF);
        std::fs::remove_file(&dir).unwrap();
    }
}
