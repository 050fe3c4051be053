//! Output voltage and current limit

use dps_hal::BlockDevice;
use dps_past::Past;

use crate::error::SettingsError;
use crate::ids::ParameterId;
use crate::param;

pub const DEFAULT_V_OUT_MV: u16 = 5000;
pub const DEFAULT_I_LIMIT_MA: u16 = 500;

/// Output settings restored at power up
///
/// Stored as one word, `[I_limit:16][V_out:16]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutputSettings {
    /// Output voltage in mV
    pub v_out_mv: u16,
    /// Current limit in mA
    pub i_limit_ma: u16,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            v_out_mv: DEFAULT_V_OUT_MV,
            i_limit_ma: DEFAULT_I_LIMIT_MA,
        }
    }
}

impl OutputSettings {
    pub const fn pack(self) -> u32 {
        ((self.i_limit_ma as u32) << 16) | self.v_out_mv as u32
    }

    pub const fn unpack(word: u32) -> Self {
        Self {
            v_out_mv: (word & 0xFFFF) as u16,
            i_limit_ma: (word >> 16) as u16,
        }
    }

    /// Load the stored settings
    ///
    /// Falls back to the defaults when nothing is stored or either value
    /// is zero.
    pub fn load<D: BlockDevice>(past: &Past<D>) -> Self {
        match param::load_u32(past, ParameterId::Power.as_u32()) {
            Ok(Some(word)) => {
                let settings = Self::unpack(word);
                if settings.v_out_mv != 0 && settings.i_limit_ma != 0 {
                    return settings;
                }
                debug!("output: zero setting stored, using defaults");
            }
            Ok(None) => {}
            Err(e) => warn!("output: unreadable ({}), using defaults", e),
        }
        Self::default()
    }

    /// Store the settings if they changed
    pub fn save<D: BlockDevice>(&self, past: &mut Past<D>) -> Result<bool, SettingsError> {
        param::update_u32(past, ParameterId::Power.as_u32(), self.pack())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mounted, reboot};

    #[test]
    fn test_packing() {
        let settings = OutputSettings {
            v_out_mv: 12000,
            i_limit_ma: 1500,
        };
        assert_eq!(settings.pack(), (1500 << 16) | 12000);
        assert_eq!(OutputSettings::unpack(settings.pack()), settings);
    }

    #[test]
    fn test_defaults() {
        let past = mounted();
        assert_eq!(OutputSettings::load(&past), OutputSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let mut past = mounted();
        let settings = OutputSettings {
            v_out_mv: 3300,
            i_limit_ma: 250,
        };
        assert_eq!(settings.save(&mut past), Ok(true));
        assert_eq!(settings.save(&mut past), Ok(false));

        let past = reboot(past);
        assert_eq!(OutputSettings::load(&past), settings);
    }

    #[test]
    fn test_zero_current_limit_means_defaults() {
        let mut past = mounted();
        let settings = OutputSettings {
            v_out_mv: 3300,
            i_limit_ma: 0,
        };
        settings.save(&mut past).unwrap();
        assert_eq!(OutputSettings::load(&past), OutputSettings::default());
    }
}
