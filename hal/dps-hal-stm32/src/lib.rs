//! STM32F1-specific HAL for the DPS past parameter store
//!
//! This crate provides the [`dps_hal::BlockDevice`] implementation for the
//! internal flash of the STM32F100 family used on DPS power supplies.
//!
//! # Features
//!
//! - `stm32f100c8` - STM32F100C8 (64KB flash, DPS5005 and friends)
//! - `stm32f100cb` - STM32F100CB (128KB flash)
//! - `defmt` - Enable debug formatting support
//!
//! # Usage
//!
//! The firmware creates the embassy flash driver, wraps it in
//! [`flash::Stm32Flash`] and hands it to the past store together with
//! the partition constants from [`flash`].

#![no_std]

pub mod flash;

pub use flash::Stm32Flash;
