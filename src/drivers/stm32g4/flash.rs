//! Internal Flash controller for the STM32G4 family
//!
//! Every program and erase operation runs inside the same envelope,
//! mandated by section 3.3 of the RM0440 reference manual:
//!
//! unlock -> suspend caches -> wait not busy -> clear stale errors ->
//! operation -> wait not busy -> check errors -> restore caches -> lock
//!
//! The envelope is held by a [`Guard`], so caches are restored and the
//! control register is locked again on every exit path, including
//! timeouts and controller errors. Reads are plain memory accesses and
//! bypass it entirely.
use crate::{
    hal::flash::Controller,
    utilities::{
        bitwise::BitFlags,
        guard::Guard,
        memory::{self, Region},
    },
};
use core::ops::Add;
use nb::block;
use static_assertions::const_assert;

use self::{
    config::{BusyWait, Config},
    registers::{acr, bit, cr, sr, UNLOCK_KEYS},
};

/// Register layout from RM0440 section 3.7
pub mod registers {
    pub const fn bit(position: u8) -> u32 { 1 << position }

    /// From RM0440 section 3.3.5
    pub const UNLOCK_KEYS: [u32; 2] = [0x4567_0123, 0xCDEF_89AB];

    pub mod acr {
        pub const PRFTEN: u8 = 8;
        pub const ICEN: u8 = 9;
        pub const DCEN: u8 = 10;
        pub const ICRST: u8 = 11;
        pub const DCRST: u8 = 12;
    }

    pub mod sr {
        pub const EOP: u8 = 0;
        pub const OPERR: u8 = 1;
        pub const PROGERR: u8 = 3;
        pub const WRPERR: u8 = 4;
        pub const PGAERR: u8 = 5;
        pub const SIZERR: u8 = 6;
        pub const PGSERR: u8 = 7;
        pub const MISERR: u8 = 8;
        pub const FASTERR: u8 = 9;
        pub const BSY: u8 = 16;
    }

    pub mod cr {
        pub const PG: u8 = 0;
        pub const PER: u8 = 1;
        pub const PNB_SHIFT: u8 = 3;
        pub const PNB_MASK: u32 = 0x7F << PNB_SHIFT;
        pub const STRT: u8 = 16;
        pub const LOCK: u8 = 31;
    }
}

pub mod config {
    /// How long to poll the busy flag before giving up.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum BusyWait {
        /// Poll until the controller is idle, however long it takes. A
        /// controller that never leaves its busy state blocks forever.
        Unbounded,
        /// Poll at most this many times, then fail with a timeout.
        Polls(u32),
    }

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Config {
        pub busy_wait: BusyWait,
    }

    impl Default for Config {
        fn default() -> Self { Config { busy_wait: BusyWait::Unbounded } }
    }

    impl Config {
        pub fn busy_wait(mut self, busy_wait: BusyWait) -> Self {
            self.busy_wait = busy_wait;
            self
        }
    }
}

/// Absolute address in the MCU memory map.
#[derive(Copy, Clone, Debug, PartialOrd, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address(pub u32);

impl Address {
    /// Whether a double word can be programmed at this address.
    pub const fn is_aligned(self) -> bool {
        memory::align_down(self.0 as usize, DOUBLE_WORD) == self.0 as usize
    }
}

impl Add<usize> for Address {
    type Output = Self;
    fn add(self, rhs: usize) -> Address { Address(self.0 + rhs as u32) }
}

/// Smallest programmable unit (a double word).
pub const DOUBLE_WORD: usize = 8;
pub const PAGE_SIZE: usize = 2048;
pub const PAGE_COUNT: usize = 64;
pub const BASE_ADDRESS: Address = Address(0x0800_0000);
pub const FLASH_SIZE: usize = PAGE_SIZE * PAGE_COUNT;

/// Erasable page, identified by its number in the control register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Page {
    number: u8,
    start: Address,
}

/// Maps a sector index to its physical page number and address.
pub struct MemoryMap {
    pages: [Page; PAGE_COUNT],
}

pub static MEMORY_MAP: MemoryMap = MemoryMap::new();

// Compile time check that the memory map above is correct.
const_assert!(MemoryMap::new().is_sound());

impl MemoryMap {
    const fn new() -> Self {
        let mut pages = [Page { number: 0, start: BASE_ADDRESS }; PAGE_COUNT];
        let mut index = 0usize;
        while index < PAGE_COUNT {
            pages[index] = Page {
                number: index as u8,
                start: Address(BASE_ADDRESS.0 + (index * PAGE_SIZE) as u32),
            };
            index += 1;
        }
        MemoryMap { pages }
    }

    // Verifies that pages are numbered in order, consecutive, and fit the
    // page number field of the control register.
    // NOTE: Some of the control flow here is necessarily awkward,
    // since this is a compile-time function.
    const fn is_sound(&self) -> bool {
        let mut index = 0usize;
        while index < PAGE_COUNT {
            let page = &self.pages[index];
            if page.number as usize != index || (page.number as u32) > (cr::PNB_MASK >> cr::PNB_SHIFT) {
                return false;
            }
            if index > 0 && self.pages[index - 1].start.0 + PAGE_SIZE as u32 != page.start.0 {
                return false;
            }
            index += 1;
        }
        self.pages[0].start.0 == BASE_ADDRESS.0
    }

    /// Page for a sector index, counting from the start of flash.
    pub fn page(&self, index: usize) -> Option<&Page> { self.pages.get(index) }

    /// Page containing an absolute address.
    pub fn page_at(&self, address: Address) -> Option<&Page> {
        self.pages.iter().find(|page| page.contains(address))
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> { self.pages.iter() }
}

impl Region<Address> for MemoryMap {
    fn contains(&self, address: Address) -> bool {
        address >= BASE_ADDRESS && address.0 < BASE_ADDRESS.0 + FLASH_SIZE as u32
    }
}

impl Page {
    pub const fn number(&self) -> u8 { self.number }
    pub const fn start(&self) -> Address { self.start }
    pub const fn size(&self) -> usize { PAGE_SIZE }
}

impl Region<Address> for Page {
    fn contains(&self, address: Address) -> bool {
        address >= self.start && address.0 < self.start.0 + PAGE_SIZE as u32
    }
}

/// Error flags the controller can raise while programming or erasing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProgramFlag {
    /// PROGERR: double word wasn't erased before programming
    Program,
    /// WRPERR: address is write protected
    WriteProtection,
    /// PGAERR: programming address misaligned
    ProgrammingAlignment,
    /// SIZERR: store wasn't word sized
    Size,
    /// PGSERR: programming sequence violated
    ProgrammingSequence,
    /// MISERR: fast programming data miss (row boundary crossed)
    FastProgramMiss,
    /// FASTERR: fast programming error
    FastProgram,
}

impl ProgramFlag {
    /// All flags, in the order they are reported when several are set.
    pub const ALL: [ProgramFlag; 7] = [
        ProgramFlag::Program,
        ProgramFlag::WriteProtection,
        ProgramFlag::ProgrammingAlignment,
        ProgramFlag::Size,
        ProgramFlag::ProgrammingSequence,
        ProgramFlag::FastProgramMiss,
        ProgramFlag::FastProgram,
    ];

    /// Mask covering every program error flag in the status register.
    pub const MASK: u32 = bit(sr::PROGERR)
        | bit(sr::WRPERR)
        | bit(sr::PGAERR)
        | bit(sr::SIZERR)
        | bit(sr::PGSERR)
        | bit(sr::MISERR)
        | bit(sr::FASTERR);

    pub const fn position(self) -> u8 {
        match self {
            ProgramFlag::Program => sr::PROGERR,
            ProgramFlag::WriteProtection => sr::WRPERR,
            ProgramFlag::ProgrammingAlignment => sr::PGAERR,
            ProgramFlag::Size => sr::SIZERR,
            ProgramFlag::ProgrammingSequence => sr::PGSERR,
            ProgramFlag::FastProgramMiss => sr::MISERR,
            ProgramFlag::FastProgram => sr::FASTERR,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ProgramFlag::Program => "PROGERR",
            ProgramFlag::WriteProtection => "WRPERR",
            ProgramFlag::ProgrammingAlignment => "PGAERR",
            ProgramFlag::Size => "SIZERR",
            ProgramFlag::ProgrammingSequence => "PGSERR",
            ProgramFlag::FastProgramMiss => "MISERR",
            ProgramFlag::FastProgram => "FASTERR",
        }
    }

    /// First error flag set in a status register value, if any.
    pub fn from_status(status: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|flag| status.is_set(flag.position()))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    MisalignedAccess,
    AddressOutOfRange,
    Program(ProgramFlag),
    BusyTimeout,
}

impl From<Error> for crate::error::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::MisalignedAccess => crate::error::Error::AlignmentError,
            Error::AddressOutOfRange => crate::error::Error::OutOfBounds,
            Error::Program(flag) => crate::error::Error::ProgramError(flag),
            Error::BusyTimeout => crate::error::Error::BusyTimeout,
        }
    }
}

/// Which caches were running before an operation suspended them. Only
/// those are turned back on afterwards.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheLatches {
    pub instruction: bool,
    pub data: bool,
}

/// Low level driver for the internal flash. Owns the controller, so
/// only one operation can be in flight at any time.
pub struct McuFlash<C: Controller> {
    controller: C,
    config: Config,
}

impl<C: Controller> McuFlash<C> {
    pub fn new(controller: C, config: Config) -> Self { Self { controller, config } }

    pub fn config(&self) -> Config { self.config }

    pub fn controller(&self) -> &C { &self.controller }

    /// Gives the controller back, leaving it locked.
    pub fn release(self) -> C { self.controller }

    /// Erases a whole page, leaving every byte in it at 0xFF.
    pub fn erase_page(&mut self, page: &Page) -> Result<(), Error> {
        let number = page.number;
        let busy_wait = self.config.busy_wait;
        let mut controller = Guard::new(&mut self.controller, begin_operation, end_operation);

        wait_not_busy(&*controller, busy_wait)?;
        check_and_clear_errors(&mut *controller);

        let status = {
            let mut erasing = Guard::new(
                &mut *controller,
                |c| {
                    c.modify_cr(|v| {
                        (v & !cr::PNB_MASK) | (((number as u32) << cr::PNB_SHIFT) & cr::PNB_MASK)
                    })
                },
                |c, ()| c.modify_cr(|v| v & !(bit(cr::PER) | cr::PNB_MASK)),
            );
            erasing.modify_cr(|v| v | bit(cr::PER));
            erasing.modify_cr(|v| v | bit(cr::STRT));
            wait_not_busy(&*erasing, busy_wait)
        };
        status?;
        operation_result(&*controller)
    }

    /// Programs one double word at an aligned address. Programming only
    /// clears bits: any bit already at 0 stays at 0 until its page is erased.
    pub fn program_double_word(&mut self, address: Address, data: u64) -> Result<(), Error> {
        if !address.is_aligned() {
            return Err(Error::MisalignedAccess);
        }
        if !MEMORY_MAP.contains_range(address, DOUBLE_WORD) {
            return Err(Error::AddressOutOfRange);
        }

        let busy_wait = self.config.busy_wait;
        let mut controller = Guard::new(&mut self.controller, begin_operation, end_operation);

        wait_not_busy(&*controller, busy_wait)?;
        check_and_clear_errors(&mut *controller);

        let status = {
            let mut programming = Guard::new(
                &mut *controller,
                |c| c.modify_cr(|v| v | bit(cr::PG)),
                |c, ()| c.modify_cr(|v| v & !bit(cr::PG)),
            );
            programming.store_word(address.0, data as u32);
            // Both halves must reach the controller in order, as two stores.
            programming.instruction_barrier();
            programming.store_word(address.0 + 4, (data >> 32) as u32);
            wait_not_busy(&*programming, busy_wait)
        };
        status?;
        operation_result(&*controller)
    }

    /// Reads an aligned double word.
    pub fn read_double_word(&self, address: Address) -> Result<u64, Error> {
        if !address.is_aligned() {
            return Err(Error::MisalignedAccess);
        }
        let mut bytes = [0u8; DOUBLE_WORD];
        self.read(address, &mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Copies flash contents. No unlocking is needed to read.
    pub fn read(&self, address: Address, bytes: &mut [u8]) -> Result<(), Error> {
        if !MEMORY_MAP.contains_range(address, bytes.len()) {
            return Err(Error::AddressOutOfRange);
        }
        self.controller.read_memory(address.0, bytes);
        Ok(())
    }
}

/// Writes the key sequence, only if the control register is locked (a
/// key write while unlocked is a bus error).
fn unlock<C: Controller>(controller: &mut C) {
    if controller.cr().is_set(cr::LOCK) {
        controller.write_keyr(UNLOCK_KEYS[0]);
        controller.write_keyr(UNLOCK_KEYS[1]);
    }
}

fn lock<C: Controller>(controller: &mut C) { controller.modify_cr(|v| v | bit(cr::LOCK)); }

fn suspend_caches<C: Controller>(controller: &mut C) -> CacheLatches {
    let acr = controller.acr();
    let latches = CacheLatches { instruction: acr.is_set(acr::ICEN), data: acr.is_set(acr::DCEN) };
    if latches.instruction {
        controller.modify_acr(|v| v & !bit(acr::ICEN));
    }
    if latches.data {
        controller.modify_acr(|v| v & !bit(acr::DCEN));
    }
    latches
}

/// Caches are reset before being re-enabled, as their contents may
/// be stale after the flash changed underneath them.
fn restore_caches<C: Controller>(controller: &mut C, latches: CacheLatches) {
    if latches.instruction {
        controller.modify_acr(|v| v | bit(acr::ICRST));
        controller.modify_acr(|v| v & !bit(acr::ICRST));
        controller.modify_acr(|v| v | bit(acr::ICEN));
    }
    if latches.data {
        controller.modify_acr(|v| v | bit(acr::DCRST));
        controller.modify_acr(|v| v & !bit(acr::DCRST));
        controller.modify_acr(|v| v | bit(acr::DCEN));
    }
}

fn begin_operation<C: Controller>(controller: &mut C) -> CacheLatches {
    unlock(controller);
    suspend_caches(controller)
}

fn end_operation<C: Controller>(controller: &mut C, latches: CacheLatches) {
    restore_caches(controller, latches);
    lock(controller);
}

/// Clears error flags left over by a previous operation (otherwise the
/// next one fails with PGSERR). Returns the flags that were cleared.
fn check_and_clear_errors<C: Controller>(controller: &mut C) -> u32 {
    let stale = controller.sr() & ProgramFlag::MASK;
    if stale != 0 {
        log_warn!("Clearing stale flash error flags {:#x}", stale);
        controller.write_sr(stale);
    }
    stale
}

fn poll_not_busy<C: Controller>(controller: &C) -> nb::Result<(), Error> {
    if controller.sr().is_set(sr::BSY) {
        Err(nb::Error::WouldBlock)
    } else {
        Ok(())
    }
}

fn wait_not_busy<C: Controller>(controller: &C, busy_wait: BusyWait) -> Result<(), Error> {
    match busy_wait {
        BusyWait::Unbounded => block!(poll_not_busy(controller)),
        BusyWait::Polls(limit) => {
            for _ in 0..limit.max(1) {
                match poll_not_busy(controller) {
                    Err(nb::Error::WouldBlock) => continue,
                    Err(nb::Error::Other(error)) => return Err(error),
                    Ok(()) => return Ok(()),
                }
            }
            log_error!("Flash controller still busy after {} polls", limit);
            Err(Error::BusyTimeout)
        }
    }
}

/// Error flags are left set; the next operation clears them.
fn operation_result<C: Controller>(controller: &C) -> Result<(), Error> {
    match ProgramFlag::from_status(controller.sr()) {
        Some(flag) => {
            log_error!("Flash operation failed: {}", flag.name());
            Err(Error::Program(flag))
        }
        None => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::doubles::flash::{Event, FakeController};

    fn flash_to_test(controller: FakeController) -> McuFlash<FakeController> {
        McuFlash::new(controller, Config::default().busy_wait(BusyWait::Polls(100)))
    }

    fn address(offset: u32) -> Address { Address(BASE_ADDRESS.0 + offset) }

    #[test]
    fn memory_map_pages_are_consecutive_and_numbered() {
        assert_eq!(MEMORY_MAP.pages().count(), PAGE_COUNT);
        let page = MEMORY_MAP.page(24).unwrap();
        assert_eq!(page.number(), 24);
        assert_eq!(page.start(), Address(0x0800_C000));
        assert_eq!(MEMORY_MAP.page_at(Address(0x0800_C7FF)), Some(page));
        assert_eq!(MEMORY_MAP.page_at(Address(0x0802_0000)), None);
        assert!(MEMORY_MAP.page(PAGE_COUNT).is_none());
    }

    #[test]
    fn program_follows_the_mandated_register_sequence() {
        // Given
        let mut flash = flash_to_test(FakeController::default());

        // When
        flash.program_double_word(address(0x8000), 0x1122_3344_5566_7788).unwrap();

        // Then
        assert_eq!(flash.controller.events, [
            Event::Unlocked,
            Event::InstructionCacheDisabled,
            Event::DataCacheDisabled,
            Event::ProgrammingEnabled,
            Event::Stored { address: 0x0800_8000, word: 0x5566_7788 },
            Event::Barrier,
            Event::Stored { address: 0x0800_8004, word: 0x1122_3344 },
            Event::ProgrammingDisabled,
            Event::InstructionCacheReset,
            Event::InstructionCacheEnabled,
            Event::DataCacheReset,
            Event::DataCacheEnabled,
            Event::Locked,
        ]);
        assert_eq!(flash.read_double_word(address(0x8000)), Ok(0x1122_3344_5566_7788));
    }

    #[test]
    fn erase_selects_the_page_and_clears_selection_afterwards() {
        // Given
        let mut controller = FakeController::default();
        controller.memory[0x8800..0x8808].copy_from_slice(&[0u8; 8]);
        let mut flash = flash_to_test(controller);

        // When
        flash.erase_page(MEMORY_MAP.page(17).unwrap()).unwrap();

        // Then
        assert_eq!(flash.controller.events, [
            Event::Unlocked,
            Event::InstructionCacheDisabled,
            Event::DataCacheDisabled,
            Event::PageSelected(17),
            Event::EraseEnabled,
            Event::EraseStarted(17),
            Event::PageSelected(0),
            Event::EraseDisabled,
            Event::InstructionCacheReset,
            Event::InstructionCacheEnabled,
            Event::DataCacheReset,
            Event::DataCacheEnabled,
            Event::Locked,
        ]);
        assert_eq!(flash.read_double_word(address(0x8800)), Ok(u64::MAX));
    }

    #[test]
    fn only_caches_that_were_running_are_restored() {
        // Given
        let mut flash = flash_to_test(FakeController::default().with_caches(false, true));

        // When
        flash.program_double_word(address(0x8000), 0).unwrap();

        // Then
        let events = &flash.controller.events;
        assert!(!events.contains(&Event::InstructionCacheDisabled));
        assert!(!events.contains(&Event::InstructionCacheEnabled));
        assert!(events.contains(&Event::DataCacheDisabled));
        assert!(events.contains(&Event::DataCacheEnabled));
        assert_eq!(flash.controller.caches(), (false, true));
    }

    #[test]
    fn unlocking_an_unlocked_controller_writes_no_keys() {
        // Given
        let mut controller = FakeController::default();
        unlock(&mut controller);
        controller.events.clear();

        // When
        unlock(&mut controller);

        // Then
        assert!(controller.events.is_empty());
        assert!(!controller.is_locked());
    }

    #[test]
    fn stale_errors_are_cleared_before_operating() {
        // Given
        let mut controller = FakeController::default();
        controller.raise(ProgramFlag::ProgrammingSequence);
        let mut flash = flash_to_test(controller);

        // When
        let result = flash.program_double_word(address(0x8000), 0xAB);

        // Then
        assert_eq!(result, Ok(()));
        assert!(flash.controller.events.contains(&Event::ErrorsCleared(bit(sr::PGSERR))));
    }

    #[test]
    fn controller_errors_fail_the_operation_and_still_lock() {
        // Given
        let mut controller = FakeController::default();
        controller.write_protected_pages.push(16);
        let mut flash = flash_to_test(controller);

        // When
        let result = flash.program_double_word(address(0x8000), 0);

        // Then
        assert_eq!(result, Err(Error::Program(ProgramFlag::WriteProtection)));
        assert!(flash.controller.is_locked());
        assert_eq!(flash.controller.caches(), (true, true));
        assert_eq!(flash.controller.events.last(), Some(&Event::Locked));
        // The flag is left for the next operation's hygiene
        assert!(flash.controller.sr().is_set(sr::WRPERR));
    }

    #[test]
    fn flags_raised_during_an_operation_are_reported_after_the_wait() {
        // Given
        let mut controller = FakeController::default();
        controller.pending_errors = bit(sr::SIZERR);
        let mut flash = flash_to_test(controller);

        // When
        let program = flash.program_double_word(address(0x8000), 0);

        // Then
        assert_eq!(program, Err(Error::Program(ProgramFlag::Size)));
        assert_eq!(flash.read_double_word(address(0x8000)), Ok(u64::MAX));

        // Given
        flash.program_double_word(address(0x8800), 0).unwrap();
        flash.controller.pending_errors = bit(sr::PGSERR);

        // When
        let erase = flash.erase_page(MEMORY_MAP.page(17).unwrap());

        // Then
        assert_eq!(erase, Err(Error::Program(ProgramFlag::ProgrammingSequence)));
        assert_eq!(flash.read_double_word(address(0x8800)), Ok(0));
        assert!(flash.controller.is_locked());
        assert_eq!(flash.controller.caches(), (true, true));
    }

    #[test]
    fn stuck_controller_times_out_and_still_locks() {
        // Given
        let mut controller = FakeController::default();
        controller.stuck_busy = true;
        let mut flash = flash_to_test(controller);

        // When
        let result = flash.erase_page(MEMORY_MAP.page(20).unwrap());

        // Then
        assert_eq!(result, Err(Error::BusyTimeout));
        assert!(flash.controller.is_locked());
        assert_eq!(flash.controller.caches(), (true, true));
        assert_eq!(flash.controller.status_reads(), 100);
    }

    #[test]
    fn unbounded_wait_rides_out_a_slow_controller() {
        // Given
        let mut controller = FakeController::default();
        controller.busy_polls = 1000;
        let mut flash = McuFlash::new(controller, Config::default());

        // When
        let result = flash.program_double_word(address(0x8000), 0);

        // Then
        assert_eq!(result, Ok(()));
        assert!(flash.controller.status_reads() > 1000);
    }

    #[test]
    fn misaligned_or_out_of_range_programs_never_touch_the_controller() {
        // Given
        let mut flash = flash_to_test(FakeController::default());

        // Then
        assert_eq!(flash.program_double_word(address(0x8004), 0), Err(Error::MisalignedAccess));
        assert_eq!(
            flash.program_double_word(Address(0x0802_0000), 0),
            Err(Error::AddressOutOfRange)
        );
        assert!(flash.controller.events.is_empty());
    }

    #[test]
    fn programming_cannot_set_bits_back() {
        // Given
        let mut flash = flash_to_test(FakeController::default());
        flash.program_double_word(address(0x8000), 0xFFFF_FFFF_FFFF_0000).unwrap();

        // When
        flash.program_double_word(address(0x8000), 0xFFFF_FFFF_FFFF_00FF).unwrap();

        // Then
        assert_eq!(flash.read_double_word(address(0x8000)), Ok(0xFFFF_FFFF_FFFF_0000));
    }

    #[test]
    fn status_flags_are_reported_in_priority_order() {
        let status = bit(sr::PGSERR) | bit(sr::WRPERR) | bit(sr::BSY);
        assert_eq!(ProgramFlag::from_status(status), Some(ProgramFlag::WriteProtection));
        assert_eq!(ProgramFlag::from_status(bit(sr::EOP) | bit(sr::OPERR)), None);
        assert_eq!(ProgramFlag::ALL.iter().fold(0, |mask, f| mask | bit(f.position())), ProgramFlag::MASK);
    }

    #[test]
    fn driver_errors_convert_into_flash_map_errors() {
        use crate::error::Error as FlashMapError;
        assert_eq!(FlashMapError::from(Error::BusyTimeout), FlashMapError::BusyTimeout);
        assert_eq!(
            FlashMapError::from(Error::Program(ProgramFlag::Size)),
            FlashMapError::ProgramError(ProgramFlag::Size)
        );
    }
}
