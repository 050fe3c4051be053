//! Firmware upgrade bookkeeping
//!
//! The bootloader marks an upgrade as started before it touches the
//! application image and removes the mark once the new image checks out.
//! A mark found at reset means the last upgrade was interrupted and the
//! application must not be started.

use dps_hal::BlockDevice;
use dps_past::Past;

use crate::error::SettingsError;
use crate::ids::ParameterId;
use crate::param;

/// Why the bootloader stays in upgrade mode, as reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum UpgradeReason {
    Unknown = 0,
    /// Upgrade forced with the button at power up
    Forced = 1,
    /// Past could not be initialized
    PastFailure = 2,
    /// The application asked for an upgrade
    Bootcom = 3,
    /// A previous upgrade never finished
    UnfinishedUpgrade = 4,
    /// The application returned to the bootloader
    AppStartFailed = 5,
}

/// Outcome of the bootloader's reset checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootDecision {
    StartApp,
    Upgrade(UpgradeReason),
}

impl BootDecision {
    /// Decide whether to start the application
    ///
    /// Checks run in priority order: forced upgrade, store health, upgrade
    /// request from the application, interrupted upgrade.
    pub fn decide<D: BlockDevice>(forced: bool, past: &Past<D>, bootcom_request: bool) -> Self {
        let reason = if forced {
            UpgradeReason::Forced
        } else if !past.is_valid() {
            UpgradeReason::PastFailure
        } else if bootcom_request {
            UpgradeReason::Bootcom
        } else {
            match upgrade_pending(past) {
                Ok(false) => return BootDecision::StartApp,
                Ok(true) => UpgradeReason::UnfinishedUpgrade,
                Err(e) => {
                    warn!("upgrade: flag unreadable ({})", e);
                    UpgradeReason::PastFailure
                }
            }
        };
        info!("upgrade: staying in bootloader, {}", reason);
        BootDecision::Upgrade(reason)
    }
}

/// Mark an upgrade as started
pub fn begin_upgrade<D: BlockDevice>(past: &mut Past<D>) -> Result<(), SettingsError> {
    param::save_u32(past, ParameterId::UpgradeStarted.as_u32(), 1)
}

/// Clear the upgrade mark after a verified image was written
pub fn finish_upgrade<D: BlockDevice>(past: &mut Past<D>) -> Result<(), SettingsError> {
    param::remove(past, ParameterId::UpgradeStarted.as_u32())
}

pub fn upgrade_pending<D: BlockDevice>(past: &Past<D>) -> Result<bool, SettingsError> {
    Ok(past.contains(ParameterId::UpgradeStarted.as_u32())?)
}

/// Erase every stored setting
pub fn factory_reset<D: BlockDevice>(past: &mut Past<D>) -> Result<(), SettingsError> {
    past.format()?;
    info!("settings: factory reset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputSettings;
    use crate::testing::{mounted, reboot, Flash};
    use dps_past::PastConfig;

    #[test]
    fn test_upgrade_flag() {
        let mut past = mounted();
        assert_eq!(upgrade_pending(&past), Ok(false));

        begin_upgrade(&mut past).unwrap();
        let mut past = reboot(past);
        assert_eq!(upgrade_pending(&past), Ok(true));
        assert_eq!(past.read(0xFF), Ok(&1u32.to_le_bytes()[..]));

        finish_upgrade(&mut past).unwrap();
        assert_eq!(upgrade_pending(&past), Ok(false));
        assert_eq!(finish_upgrade(&mut past), Ok(()));
    }

    #[test]
    fn test_boot_decision() {
        let mut past = mounted();
        assert_eq!(BootDecision::decide(false, &past, false), BootDecision::StartApp);
        assert_eq!(
            BootDecision::decide(false, &past, true),
            BootDecision::Upgrade(UpgradeReason::Bootcom)
        );

        begin_upgrade(&mut past).unwrap();
        assert_eq!(
            BootDecision::decide(false, &past, false),
            BootDecision::Upgrade(UpgradeReason::UnfinishedUpgrade)
        );
        assert_eq!(
            BootDecision::decide(true, &past, false),
            BootDecision::Upgrade(UpgradeReason::Forced)
        );
    }

    #[test]
    fn test_uninitialized_past_blocks_boot() {
        let past = Past::new(Flash::new(), PastConfig::default()).unwrap();
        assert_eq!(
            BootDecision::decide(false, &past, false),
            BootDecision::Upgrade(UpgradeReason::PastFailure)
        );
    }

    #[test]
    fn test_reason_codes() {
        assert_eq!(UpgradeReason::Unknown as u8, 0);
        assert_eq!(UpgradeReason::AppStartFailed as u8, 5);
    }

    #[test]
    fn test_factory_reset() {
        let mut past = mounted();
        OutputSettings {
            v_out_mv: 1200,
            i_limit_ma: 100,
        }
        .save(&mut past)
        .unwrap();
        begin_upgrade(&mut past).unwrap();

        factory_reset(&mut past).unwrap();
        assert_eq!(past.units().unwrap().count(), 0);
        assert_eq!(OutputSettings::load(&past), OutputSettings::default());
        assert_eq!(past.generation(), 0);
    }
}
