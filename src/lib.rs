//! # Flash Map Library
//!
//! Flash abstraction layer of an MCU bootloader: a static partition
//! table, the image slot mapping, and a sector-aware area API over the
//! internal flash of the STM32G4 family.
#![cfg_attr(test, allow(unused_imports))]
#![cfg_attr(target_arch = "arm", no_std)]

#[cfg(feature = "stm32g431")]
pub use stm32g4::stm32g431 as stm32pac;

extern crate static_assertions;

#[macro_use]
pub mod utilities {
    mod macros;
    pub mod bitwise;
    pub mod guard;
    pub mod memory;
}

pub mod hal;
pub mod drivers;
pub mod devices;
pub mod ports;
pub mod error;
