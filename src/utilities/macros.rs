//! Convenience macros for the flash map project
#![macro_use]

/// Define and export a specific port module (transparently pulls
/// its namespace to the current one).
///
/// Used mostly to conveniently fit the module declaration and reexport
/// under a single configuration flag.
///
/// # Example
/// ```ignore
/// #[cfg(feature = "nucleo_g431kb")]
/// port!(nucleo_g431kb);
/// // Expands into:
/// pub mod nucleo_g431kb;
/// pub use self::nucleo_g431kb::*;
/// ```
#[macro_export]
macro_rules! port {
    ($mod:ident) => {
        pub mod $mod;
        pub use self::$mod::*;
    };
    ($mod:ident as $name:ident) => {
        pub mod $mod;
        pub use self::$mod as $name;
    };
}

#[macro_export]
macro_rules! kb {
    ($val:expr) => {
        $val * 1024
    };
}

// Logging goes through defmt when the `defmt` feature is enabled, and
// vanishes otherwise (arguments are still evaluated by reference so that
// disabling logs doesn't produce unused variable warnings).

#[cfg(feature = "defmt")]
macro_rules! log_error {
    ($($arg:tt)+) => { defmt::error!($($arg)+) };
}
#[cfg(not(feature = "defmt"))]
macro_rules! log_error {
    ($fmt:literal $(, $arg:expr)* $(,)?) => { { $( let _ = &$arg; )* } };
}

#[cfg(feature = "defmt")]
macro_rules! log_warn {
    ($($arg:tt)+) => { defmt::warn!($($arg)+) };
}
#[cfg(not(feature = "defmt"))]
macro_rules! log_warn {
    ($fmt:literal $(, $arg:expr)* $(,)?) => { { $( let _ = &$arg; )* } };
}

#[cfg(feature = "defmt")]
macro_rules! log_info {
    ($($arg:tt)+) => { defmt::info!($($arg)+) };
}
#[cfg(not(feature = "defmt"))]
macro_rules! log_info {
    ($fmt:literal $(, $arg:expr)* $(,)?) => { { $( let _ = &$arg; )* } };
}

#[cfg(feature = "defmt")]
macro_rules! log_debug {
    ($($arg:tt)+) => { defmt::debug!($($arg)+) };
}
#[cfg(not(feature = "defmt"))]
macro_rules! log_debug {
    ($fmt:literal $(, $arg:expr)* $(,)?) => { { $( let _ = &$arg; )* } };
}
