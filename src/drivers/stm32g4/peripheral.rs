//! Register access for the STM32G4 flash peripheral, through the PAC.
use crate::{hal::flash::Controller, stm32pac::FLASH};

impl Controller for FLASH {
    fn acr(&self) -> u32 { self.acr.read().bits() }

    fn write_acr(&mut self, value: u32) { self.acr.write(|w| unsafe { w.bits(value) }); }

    fn write_keyr(&mut self, key: u32) { self.keyr.write(|w| unsafe { w.bits(key) }); }

    fn sr(&self) -> u32 { self.sr.read().bits() }

    fn write_sr(&mut self, value: u32) { self.sr.write(|w| unsafe { w.bits(value) }); }

    fn cr(&self) -> u32 { self.cr.read().bits() }

    fn write_cr(&mut self, value: u32) { self.cr.write(|w| unsafe { w.bits(value) }); }

    fn store_word(&mut self, address: u32, word: u32) {
        // NOTE(Safety): Writing to memory-mapped flash is naturally unsafe.
        // The driver only calls this with programming enabled, for aligned
        // addresses it has checked against the memory map.
        unsafe { core::ptr::write_volatile(address as *mut u32, word) }
    }

    fn instruction_barrier(&mut self) { cortex_m::asm::isb(); }

    fn read_memory(&self, address: u32, bytes: &mut [u8]) {
        let base = address as *const u8;
        for (index, byte) in bytes.iter_mut().enumerate() {
            // NOTE(Safety): The driver only reads ranges inside the memory
            // map, and any write to them goes through a mutable reference
            // to the same controller, so there can't be a data race.
            *byte = unsafe { core::ptr::read_volatile(base.add(index)) };
        }
    }
}
