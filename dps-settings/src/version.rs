//! Installed firmware versions
//!
//! Bootloader and application each record their git hash at start up, so
//! a host tool can query what is installed.

use dps_hal::BlockDevice;
use dps_past::{Past, PastError};
use heapless::String;

use crate::error::SettingsError;
use crate::ids::ParameterId;

/// Longest version string returned by [`stored_version`]
pub const MAX_VERSION_LEN: usize = 48;

/// Which firmware image a version belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Firmware {
    Boot,
    App,
}

impl Firmware {
    pub const fn parameter(self) -> ParameterId {
        match self {
            Firmware::Boot => ParameterId::BootGitHash,
            Firmware::App => ParameterId::AppGitHash,
        }
    }
}

/// Record `version` unless it is already stored
///
/// Returns whether it was written. Versions must be 4 to
/// [`MAX_VERSION_LEN`] bytes long.
pub fn sync_version<D: BlockDevice>(
    past: &mut Past<D>,
    firmware: Firmware,
    version: &str,
) -> Result<bool, SettingsError> {
    if version.len() > MAX_VERSION_LEN {
        warn!("version: {} hash of {} bytes is too long", firmware, version.len());
        return Err(SettingsError::InvalidLength);
    }
    let id = firmware.parameter().as_u32();

    let mut buf = [0u8; MAX_VERSION_LEN];
    match past.read_into(id, &mut buf) {
        Ok(len) if buf[..len] == *version.as_bytes() => return Ok(false),
        Ok(_) | Err(PastError::NotFound) | Err(PastError::BufferTooSmall) => {}
        Err(e) => return Err(e.into()),
    }

    past.write(id, version.as_bytes()).map_err(|e| {
        warn!("version: writing {} hash failed: {}", firmware, e);
        SettingsError::from(e)
    })?;
    info!("version: {} is now {}", firmware, version);
    Ok(true)
}

/// Read back a recorded version
pub fn stored_version<D: BlockDevice>(
    past: &Past<D>,
    firmware: Firmware,
) -> Result<Option<String<MAX_VERSION_LEN>>, SettingsError> {
    let mut buf = [0u8; MAX_VERSION_LEN];
    let len = match past.read_into(firmware.parameter().as_u32(), &mut buf) {
        Ok(len) => len,
        Err(PastError::NotFound) => return Ok(None),
        Err(PastError::BufferTooSmall) => return Err(SettingsError::InvalidLength),
        Err(e) => return Err(e.into()),
    };

    let text = core::str::from_utf8(&buf[..len]).map_err(|_| SettingsError::InvalidUtf8)?;
    let mut version = String::new();
    version.push_str(text).map_err(|_| SettingsError::InvalidLength)?;
    Ok(Some(version))
}
