//! Register level access to an embedded flash controller.
//!
//! The low level driver only sequences register operations; how
//! those registers are reached is abstracted here, so the same
//! sequencing runs against the real peripheral and against the
//! simulated controller used in tests.

/// Raw access to the registers of an STM32 style flash controller, and
/// to the flash memory it controls (which is mapped into the address space).
pub trait Controller {
    /// Access control register (latency, prefetch and caches).
    fn acr(&self) -> u32;
    fn write_acr(&mut self, value: u32);

    /// Key register, used to unlock the control register.
    fn write_keyr(&mut self, key: u32);

    /// Status register (busy and error flags, write one to clear).
    fn sr(&self) -> u32;
    fn write_sr(&mut self, value: u32);

    /// Control register (operation selection, start, lock).
    fn cr(&self) -> u32;
    fn write_cr(&mut self, value: u32);

    /// Read-modify-write of the control register.
    fn modify_cr<F: FnOnce(u32) -> u32>(&mut self, f: F) {
        let value = f(self.cr());
        self.write_cr(value);
    }

    /// Read-modify-write of the access control register.
    fn modify_acr<F: FnOnce(u32) -> u32>(&mut self, f: F) {
        let value = f(self.acr());
        self.write_acr(value);
    }

    /// Volatile word store into flash memory (programming sequence).
    fn store_word(&mut self, address: u32, word: u32);

    /// Guarantees every store issued before it retires before any store
    /// issued after it.
    fn instruction_barrier(&mut self);

    /// Copies flash memory starting at an absolute address.
    fn read_memory(&self, address: u32, bytes: &mut [u8]);
}
