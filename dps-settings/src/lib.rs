//! DPS settings persisted in past
//!
//! Typed access to the parameters the power supply firmware and its
//! bootloader keep in the past store:
//!
//! - [`ids`] - the unit id catalogue shared by bootloader and application
//! - [`calibration`] - ADC/DAC calibration coefficients with per-model defaults
//! - [`output`] - output voltage and current limit
//! - [`display`] - TFT inversion and backlight brightness
//! - [`screen`] - values owned by individual function screens
//! - [`version`] - git hashes of the installed bootloader and application
//! - [`upgrade`] - upgrade-in-progress flag and the bootloader's boot decision

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod calibration;
pub mod display;
pub mod error;
pub mod ids;
pub mod output;
mod param;
pub mod screen;
pub mod upgrade;
pub mod version;

pub use calibration::{Calibration, Coefficient, Model};
pub use display::DisplaySettings;
pub use error::SettingsError;
pub use ids::ParameterId;
pub use output::OutputSettings;
pub use screen::ScreenParams;
pub use upgrade::{factory_reset, BootDecision, UpgradeReason};
pub use version::Firmware;
