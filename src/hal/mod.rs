//! Hardware Abstraction Layer, containing interfaces
//! for low level drivers.
#![macro_use]

pub mod flash;

#[cfg(not(target_arch = "arm"))]
#[doc(hidden)]
pub mod doubles;
