//! TFT settings

use dps_hal::BlockDevice;
use dps_past::Past;

use crate::error::SettingsError;
use crate::ids::ParameterId;
use crate::param;

/// Backlight brightness used until one is stored, in percent
pub const DEFAULT_BRIGHTNESS: u8 = 73;

pub const MAX_BRIGHTNESS: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplaySettings {
    pub inverted: bool,
    /// Backlight brightness in percent
    pub brightness: u8,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            inverted: false,
            brightness: DEFAULT_BRIGHTNESS,
        }
    }
}

impl DisplaySettings {
    pub fn load<D: BlockDevice>(past: &Past<D>) -> Self {
        let mut settings = Self::default();

        match param::load_u32(past, ParameterId::TftInversion.as_u32()) {
            Ok(Some(value)) => settings.inverted = value != 0,
            Ok(None) => {}
            Err(e) => warn!("display: inversion unreadable ({})", e),
        }

        match param::load_u32(past, ParameterId::TftBrightness.as_u32()) {
            Ok(Some(value)) => match u8::try_from(value) {
                Ok(brightness) if brightness <= MAX_BRIGHTNESS => settings.brightness = brightness,
                _ => warn!("display: brightness {} out of range", value),
            },
            Ok(None) => {}
            Err(e) => warn!("display: brightness unreadable ({})", e),
        }

        settings
    }

    /// Store whichever setting changed
    ///
    /// Returns whether anything was written. A brightness above
    /// [`MAX_BRIGHTNESS`] is rejected before anything is written.
    pub fn save<D: BlockDevice>(&self, past: &mut Past<D>) -> Result<bool, SettingsError> {
        if self.brightness > MAX_BRIGHTNESS {
            return Err(SettingsError::OutOfRange);
        }
        let inversion = param::update_u32(past, ParameterId::TftInversion.as_u32(), self.inverted as u32)?;
        let brightness = param::update_u32(past, ParameterId::TftBrightness.as_u32(), self.brightness as u32)?;
        Ok(inversion || brightness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mounted, reboot};

    #[test]
    fn test_defaults() {
        let past = mounted();
        let settings = DisplaySettings::load(&past);
        assert!(!settings.inverted);
        assert_eq!(settings.brightness, DEFAULT_BRIGHTNESS);
    }

    #[test]
    fn test_only_changes_are_written() {
        let mut past = mounted();
        let mut settings = DisplaySettings::default();
        assert_eq!(settings.save(&mut past), Ok(true));
        assert_eq!(settings.save(&mut past), Ok(false));

        settings.brightness = 40;
        let programs = past.flash().program_count();
        assert_eq!(settings.save(&mut past), Ok(true));
        // One 4-byte unit plus the tombstone of the old one
        assert_eq!(past.flash().program_count(), programs + 3 + 2);

        settings.inverted = true;
        settings.save(&mut past).unwrap();

        let past = reboot(past);
        assert_eq!(DisplaySettings::load(&past), settings);
    }

    #[test]
    fn test_out_of_range_brightness() {
        let mut past = mounted();
        past.write(ParameterId::TftBrightness.as_u32(), &300u32.to_le_bytes()).unwrap();
        assert_eq!(DisplaySettings::load(&past).brightness, DEFAULT_BRIGHTNESS);
    }

    #[test]
    fn test_save_rejects_out_of_range_brightness() {
        let mut past = mounted();
        let settings = DisplaySettings {
            inverted: true,
            brightness: 101,
        };
        assert_eq!(settings.save(&mut past), Err(SettingsError::OutOfRange));
        assert_eq!(past.units().unwrap().count(), 0);

        let settings = DisplaySettings {
            inverted: true,
            brightness: MAX_BRIGHTNESS,
        };
        assert_eq!(settings.save(&mut past), Ok(true));
        assert_eq!(DisplaySettings::load(&reboot(past)), settings);
    }
}
