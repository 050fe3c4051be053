//! DPS Flash Hardware Abstraction Layer
//!
//! This crate defines the block device traits that the past parameter
//! store is written against. Chip-specific crates implement them on top
//! of the real flash controller; [`ram::RamFlash`] implements them in RAM
//! for host tests and emulation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Settings / bootloader (dps-settings)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  Past parameter store (dps-past)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  dps-hal (this crate - traits)          │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ dps-hal-stm32 │       │   RamFlash    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`flash::BlockDevice`] - Word read, word program, page erase, lock
//! - [`flash::MemoryMapped`] - Zero-copy access to flash contents

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod flash;
pub mod ram;

// Re-export key traits at crate root for convenience
pub use flash::{BlockDevice, FlashError, MemoryMapped, ERASED_WORD};
pub use ram::RamFlash;
