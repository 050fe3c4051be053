//! Word sized values

use dps_hal::BlockDevice;
use dps_past::{Past, PastError};

use crate::error::SettingsError;

pub(crate) fn load_u32<D: BlockDevice>(past: &Past<D>, id: u32) -> Result<Option<u32>, SettingsError> {
    let mut buf = [0u8; 4];
    match past.read_into(id, &mut buf) {
        Ok(4) => Ok(Some(u32::from_le_bytes(buf))),
        Ok(_) | Err(PastError::BufferTooSmall) => Err(SettingsError::InvalidLength),
        Err(PastError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn save_u32<D: BlockDevice>(past: &mut Past<D>, id: u32, value: u32) -> Result<(), SettingsError> {
    past.write(id, &value.to_le_bytes())?;
    Ok(())
}

/// Write `value` unless it is already stored, returning whether it was written
pub(crate) fn update_u32<D: BlockDevice>(
    past: &mut Past<D>,
    id: u32,
    value: u32,
) -> Result<bool, SettingsError> {
    if matches!(load_u32(past, id), Ok(Some(stored)) if stored == value) {
        return Ok(false);
    }
    save_u32(past, id, value)?;
    Ok(true)
}

pub(crate) fn load_f32<D: BlockDevice>(past: &Past<D>, id: u32) -> Result<Option<f32>, SettingsError> {
    Ok(load_u32(past, id)?.map(f32::from_bits))
}

pub(crate) fn update_f32<D: BlockDevice>(
    past: &mut Past<D>,
    id: u32,
    value: f32,
) -> Result<bool, SettingsError> {
    update_u32(past, id, value.to_bits())
}

/// Erase a unit, treating a missing one as already erased
pub(crate) fn remove<D: BlockDevice>(past: &mut Past<D>, id: u32) -> Result<(), SettingsError> {
    match past.erase(id) {
        Ok(()) | Err(PastError::NotFound) => Ok(()),
        Err(e) => Err(e.into()),
    }
}
