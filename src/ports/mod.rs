//! Full project ports for specific targets. They bind the generic
//! flash map to the peripherals of a particular board.

#[cfg(all(target_arch = "arm", feature = "nucleo_g431kb"))]
port!(nucleo_g431kb);
