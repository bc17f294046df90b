//! Driver implementations for all supported platforms. They offer
//! a safe API over the raw register interfaces in [`crate::hal`].

pub mod stm32g4 {
    pub mod flash;
    #[cfg(all(target_arch = "arm", feature = "stm32g431"))]
    pub mod peripheral;
}
