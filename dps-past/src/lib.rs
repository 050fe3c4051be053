//! Past: persistent parameter storage on raw flash
//!
//! A small key/value store for the handful of parameters a power supply
//! keeps across power cycles: calibration, output settings, boot flags.
//! Values are appended as units to one of two flash blocks; when the block
//! runs full the live units are copied to the other block and the first
//! one is erased.
//!
//! Every update is ordered so that losing power at any point leaves a
//! store that `init` recovers to either the old or the new value.
//!
//! ```
//! use dps_hal::RamFlash;
//! use dps_past::{Past, PastConfig};
//!
//! let mut past = Past::new(RamFlash::<2048>::new(), PastConfig::default())?;
//! past.init()?;
//! past.write(1, b"5000mV")?;
//! assert_eq!(past.read(1)?, b"5000mV");
//! # Ok::<(), dps_past::PastError>(())
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod error;
mod gc;
pub mod layout;
mod scan;
mod store;
mod unit;

pub use config::{PastConfig, PAST_BLOCK_SIZE, PAST_GC_LIMIT};
pub use error::PastError;
pub use layout::{Block, MIN_UNIT_LENGTH, PAST_MAGIC, UNIT_ID_END, UNIT_ID_INVALID};
pub use scan::Units;
pub use store::Past;
pub use unit::UnitInfo;
