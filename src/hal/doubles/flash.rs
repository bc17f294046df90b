//! Simulated STM32G4 flash controller.
//!
//! Models the parts of the peripheral the driver depends on: key
//! unlocking, cache control, busy cycles, write-one-to-clear status
//! flags and the double word programming sequence. Programming ANDs
//! data into memory, so bits can only go from 1 to 0 until an erase.
//! Every semantically relevant register change is recorded as an
//! [`Event`] so tests can assert on ordering.
use crate::{
    drivers::stm32g4::flash::{
        registers::{acr, bit, cr, sr, UNLOCK_KEYS},
        ProgramFlag, BASE_ADDRESS, DOUBLE_WORD, FLASH_SIZE, PAGE_SIZE,
    },
    hal::flash::Controller,
    utilities::bitwise::BitFlags,
};
use std::cell::Cell;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Unlocked,
    Locked,
    KeyRejected,
    InstructionCacheDisabled,
    InstructionCacheReset,
    InstructionCacheEnabled,
    DataCacheDisabled,
    DataCacheReset,
    DataCacheEnabled,
    ErrorsCleared(u32),
    ProgrammingEnabled,
    ProgrammingDisabled,
    PageSelected(u8),
    EraseEnabled,
    EraseDisabled,
    EraseStarted(u8),
    Stored { address: u32, word: u32 },
    Barrier,
}

pub struct FakeController {
    pub memory: Vec<u8>,
    pub events: Vec<Event>,
    /// Status reads that report busy after each started operation.
    pub busy_polls: u32,
    /// Controller never leaves its busy state.
    pub stuck_busy: bool,
    /// Pages whose programming or erasure raises WRPERR.
    pub write_protected_pages: Vec<u8>,
    /// Error flags raised by the next operation instead of performing it.
    pub pending_errors: u32,
    acr: u32,
    cr: u32,
    sr: u32,
    remaining_busy: Cell<u32>,
    status_reads: Cell<usize>,
    key_stage: usize,
    locked_out: bool,
    low_word: Option<(u32, u32)>,
    barrier_since_low_word: bool,
}

impl Default for FakeController {
    fn default() -> Self {
        Self {
            memory: vec![0xFF; FLASH_SIZE],
            events: Vec::new(),
            busy_polls: 3,
            stuck_busy: false,
            write_protected_pages: Vec::new(),
            pending_errors: 0,
            acr: bit(acr::PRFTEN) | bit(acr::ICEN) | bit(acr::DCEN),
            cr: bit(cr::LOCK),
            sr: 0,
            remaining_busy: Cell::new(0),
            status_reads: Cell::new(0),
            key_stage: 0,
            locked_out: false,
            low_word: None,
            barrier_since_low_word: false,
        }
    }
}

impl FakeController {
    pub fn with_caches(mut self, instruction: bool, data: bool) -> Self {
        self.acr &= !(bit(acr::ICEN) | bit(acr::DCEN));
        if instruction {
            self.acr |= bit(acr::ICEN);
        }
        if data {
            self.acr |= bit(acr::DCEN);
        }
        self
    }

    /// Sets an error flag, as if left behind by an earlier operation.
    pub fn raise(&mut self, flag: ProgramFlag) { self.sr |= bit(flag.position()); }

    pub fn is_locked(&self) -> bool { self.cr.is_set(cr::LOCK) }

    /// Whether the (instruction, data) caches are enabled.
    pub fn caches(&self) -> (bool, bool) { (self.acr.is_set(acr::ICEN), self.acr.is_set(acr::DCEN)) }

    /// Number of status register reads so far.
    pub fn status_reads(&self) -> usize { self.status_reads.get() }

    pub fn contents(&self, address: u32, length: usize) -> &[u8] {
        let offset = self.offset(address);
        &self.memory[offset..offset + length]
    }

    pub fn erase_count(&self) -> usize {
        self.events.iter().filter(|e| matches!(e, Event::EraseStarted(_))).count()
    }

    fn offset(&self, address: u32) -> usize { (address - BASE_ADDRESS.0) as usize }

    fn page_of(&self, address: u32) -> u8 { (self.offset(address) / PAGE_SIZE) as u8 }

    fn fail(&mut self, flags: u32) { self.sr |= flags; }

    fn start_busy(&mut self) { self.remaining_busy.set(self.busy_polls); }

    fn take_injected_errors(&mut self) -> bool {
        if self.pending_errors == 0 {
            return false;
        }
        self.fail(self.pending_errors);
        self.pending_errors = 0;
        true
    }

    fn erase(&mut self, page: u8) {
        self.events.push(Event::EraseStarted(page));
        if self.cr.is_set(cr::PG) || page as usize * PAGE_SIZE >= FLASH_SIZE {
            self.fail(bit(sr::PGSERR));
            return;
        }
        if self.write_protected_pages.contains(&page) {
            self.fail(bit(sr::WRPERR));
            return;
        }
        if self.take_injected_errors() {
            return;
        }
        let start = page as usize * PAGE_SIZE;
        self.memory[start..start + PAGE_SIZE].fill(0xFF);
        self.start_busy();
    }

    fn program(&mut self, address: u32, low: u32, high: u32) {
        let in_range = address >= BASE_ADDRESS.0
            && (self.offset(address) + DOUBLE_WORD) <= FLASH_SIZE;
        if !in_range {
            self.fail(bit(sr::PGAERR));
            return;
        }
        if self.write_protected_pages.contains(&self.page_of(address)) {
            self.fail(bit(sr::WRPERR));
            return;
        }
        if self.take_injected_errors() {
            return;
        }
        let data = ((high as u64) << 32 | low as u64).to_le_bytes();
        let offset = self.offset(address);
        self.memory[offset..offset + DOUBLE_WORD]
            .iter_mut()
            .zip(data.iter())
            .for_each(|(cell, byte)| *cell &= byte);
        self.start_busy();
    }

    fn record_transition(&mut self, old: u32, new: u32, position: u8, rising: Event, falling: Option<Event>) {
        match (old.is_set(position), new.is_set(position)) {
            (false, true) => self.events.push(rising),
            (true, false) => {
                if let Some(event) = falling {
                    self.events.push(event)
                }
            }
            _ => (),
        }
    }
}

impl Controller for FakeController {
    fn acr(&self) -> u32 { self.acr }

    fn write_acr(&mut self, value: u32) {
        let old = self.acr;
        // Caches can only be reset while disabled.
        if old.is_set(acr::ICEN) && value.is_set(acr::ICRST) && old.is_clear(acr::ICRST) {
            panic!("Instruction cache reset while enabled");
        }
        if old.is_set(acr::DCEN) && value.is_set(acr::DCRST) && old.is_clear(acr::DCRST) {
            panic!("Data cache reset while enabled");
        }
        self.record_transition(old, value, acr::ICEN, Event::InstructionCacheEnabled, Some(Event::InstructionCacheDisabled));
        self.record_transition(old, value, acr::ICRST, Event::InstructionCacheReset, None);
        self.record_transition(old, value, acr::DCEN, Event::DataCacheEnabled, Some(Event::DataCacheDisabled));
        self.record_transition(old, value, acr::DCRST, Event::DataCacheReset, None);
        self.acr = value;
    }

    fn write_keyr(&mut self, key: u32) {
        if self.locked_out || !self.is_locked() || key != UNLOCK_KEYS[self.key_stage] {
            // A wrong key, or any key while unlocked, locks the controller
            // until the next reset.
            self.events.push(Event::KeyRejected);
            self.locked_out = true;
            self.cr |= bit(cr::LOCK);
            self.key_stage = 0;
            return;
        }
        self.key_stage += 1;
        if self.key_stage == UNLOCK_KEYS.len() {
            self.key_stage = 0;
            self.cr &= !bit(cr::LOCK);
            self.events.push(Event::Unlocked);
        }
    }

    fn sr(&self) -> u32 {
        self.status_reads.set(self.status_reads.get() + 1);
        let remaining = self.remaining_busy.get();
        if self.stuck_busy {
            self.sr | bit(sr::BSY)
        } else if remaining > 0 {
            self.remaining_busy.set(remaining - 1);
            self.sr | bit(sr::BSY)
        } else {
            self.sr
        }
    }

    fn write_sr(&mut self, value: u32) {
        let cleared = value & !bit(sr::BSY);
        self.sr &= !cleared;
        self.events.push(Event::ErrorsCleared(cleared));
    }

    fn cr(&self) -> u32 { self.cr }

    fn write_cr(&mut self, value: u32) {
        let old = self.cr;
        if old.is_set(cr::LOCK) {
            return;
        }
        self.record_transition(old, value, cr::LOCK, Event::Locked, None);
        self.record_transition(old, value, cr::PG, Event::ProgrammingEnabled, Some(Event::ProgrammingDisabled));
        if (old & cr::PNB_MASK) != (value & cr::PNB_MASK) {
            self.events.push(Event::PageSelected(((value & cr::PNB_MASK) >> cr::PNB_SHIFT) as u8));
        }
        self.record_transition(old, value, cr::PER, Event::EraseEnabled, Some(Event::EraseDisabled));
        if value.is_clear(cr::PG) {
            self.low_word = None;
        }
        self.cr = value & !bit(cr::STRT);
        if value.is_set(cr::STRT) {
            if value.is_set(cr::PER) {
                self.erase(((value & cr::PNB_MASK) >> cr::PNB_SHIFT) as u8);
            } else {
                self.fail(bit(sr::PGSERR));
            }
        }
    }

    fn store_word(&mut self, address: u32, word: u32) {
        self.events.push(Event::Stored { address, word });
        if self.cr.is_clear(cr::PG) || self.cr.is_set(cr::PER) {
            self.fail(bit(sr::PGSERR));
            return;
        }
        match self.low_word.take() {
            None => {
                if address as usize % DOUBLE_WORD != 0 {
                    self.fail(bit(sr::PGAERR));
                    return;
                }
                self.low_word = Some((address, word));
                self.barrier_since_low_word = false;
            }
            Some((low_address, low)) => {
                if address != low_address + 4 {
                    self.fail(bit(sr::PGAERR));
                } else if !self.barrier_since_low_word {
                    self.fail(bit(sr::PGSERR));
                } else {
                    self.program(low_address, low, word);
                }
            }
        }
    }

    fn instruction_barrier(&mut self) {
        self.events.push(Event::Barrier);
        self.barrier_since_low_word = true;
    }

    fn read_memory(&self, address: u32, bytes: &mut [u8]) {
        let offset = self.offset(address);
        bytes.copy_from_slice(&self.memory[offset..offset + bytes.len()]);
    }
}
