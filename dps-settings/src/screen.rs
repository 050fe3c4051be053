//! Values owned by function screens
//!
//! Each screen (constant voltage, function generator, ...) keeps its own
//! word sized values under ids scoped by its screen number.

use dps_hal::BlockDevice;
use dps_past::Past;

use crate::error::SettingsError;
use crate::ids::screen_unit;
use crate::param;

/// Parameter space of one screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScreenParams {
    screen: u8,
}

impl ScreenParams {
    /// Screens are numbered from 1
    pub const fn new(screen: u8) -> Option<Self> {
        if screen == 0 {
            None
        } else {
            Some(Self { screen })
        }
    }

    /// Unit id of screen value `key`
    pub const fn id(&self, key: u32) -> u32 {
        screen_unit(self.screen, key)
    }

    pub fn load<D: BlockDevice>(&self, past: &Past<D>, key: u32) -> Result<Option<u32>, SettingsError> {
        param::load_u32(past, self.id(key))
    }

    /// Store `value` unless it is already stored
    pub fn save<D: BlockDevice>(&self, past: &mut Past<D>, key: u32, value: u32) -> Result<bool, SettingsError> {
        param::update_u32(past, self.id(key), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mounted;

    const PAST_U: u32 = 1;
    const PAST_I: u32 = 2;

    #[test]
    fn test_screens_do_not_collide() {
        let mut past = mounted();
        let cv = ScreenParams::new(1).unwrap();
        let cc = ScreenParams::new(2).unwrap();

        cv.save(&mut past, PAST_U, 5000).unwrap();
        cv.save(&mut past, PAST_I, 1000).unwrap();
        cc.save(&mut past, PAST_U, 12000).unwrap();

        assert_eq!(cv.load(&past, PAST_U), Ok(Some(5000)));
        assert_eq!(cv.load(&past, PAST_I), Ok(Some(1000)));
        assert_eq!(cc.load(&past, PAST_U), Ok(Some(12000)));
        assert_eq!(cc.load(&past, PAST_I), Ok(None));
        assert_eq!(past.read(0x0100_0001), Ok(&5000u32.to_le_bytes()[..]));
    }

    #[test]
    fn test_screen_zero_is_reserved() {
        assert!(ScreenParams::new(0).is_none());
    }
}
