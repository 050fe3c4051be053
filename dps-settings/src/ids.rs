//! Unit id catalogue
//!
//! Ids are shared between the bootloader and the application, so existing
//! values must never be renumbered.

/// Parameters stored in past
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum ParameterId {
    /// Output settings, `[I_limit:16][V_out:16]`
    Power = 1,
    /// TFT inversion, 0 or 1
    TftInversion = 2,
    /// Bootloader git hash string. Also read by the bootloader.
    BootGitHash = 3,
    /// Application git hash string
    AppGitHash = 4,
    AAdcK = 5,
    AAdcC = 6,
    ADacK = 7,
    ADacC = 8,
    VDacK = 9,
    VDacC = 10,
    VAdcK = 11,
    VAdcC = 12,
    VinAdcK = 13,
    VinAdcC = 14,
    /// Backlight brightness in percent
    TftBrightness = 15,
    /// Present while a firmware upgrade has not completed
    UpgradeStarted = 0xFF,
}

impl ParameterId {
    /// Get the unit id
    pub const fn as_u32(self) -> u32 {
        self as u32
    }

    /// Look up a catalogue entry by unit id
    pub fn from_u32(value: u32) -> Option<Self> {
        use ParameterId::*;
        let id = match value {
            1 => Power,
            2 => TftInversion,
            3 => BootGitHash,
            4 => AppGitHash,
            5 => AAdcK,
            6 => AAdcC,
            7 => ADacK,
            8 => ADacC,
            9 => VDacK,
            10 => VDacC,
            11 => VAdcK,
            12 => VAdcC,
            13 => VinAdcK,
            14 => VinAdcC,
            15 => TftBrightness,
            0xFF => UpgradeStarted,
            _ => return None,
        };
        Some(id)
    }
}

impl From<ParameterId> for u32 {
    fn from(id: ParameterId) -> Self {
        id.as_u32()
    }
}

/// Unit id of parameter `param` owned by function screen `screen`
///
/// The screen id lives in the top byte. Screen 0 is the catalogue above,
/// so screens are numbered from 1.
pub const fn screen_unit(screen: u8, param: u32) -> u32 {
    ((screen as u32) << 24) | (param & 0x00FF_FFFF)
}
