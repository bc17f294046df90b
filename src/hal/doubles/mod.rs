//! Test doubles for the hardware abstraction layer.
pub mod flash;
