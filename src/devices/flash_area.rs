//! Flash area API, as consumed by the bootloader core.
//!
//! Offsets are relative to the start of an area. Every access is checked
//! against the area bounds before reaching the driver; writes are split
//! into double words (merging with the current contents when a double
//! word is only partially covered) and erases into whole pages.
use crate::{
    devices::flash_map::{self, FlashArea, Sectors, FLASH_BASE_ADDRESS, SECTOR_SIZE},
    drivers::stm32g4::flash::{Address, McuFlash, MEMORY_MAP, DOUBLE_WORD},
    error::Error,
    hal::flash::Controller,
    utilities::{
        bitwise::SliceBitSubset,
        memory::{align_down, align_up},
    },
};
use core::cmp::{max, min};

/// Value of every byte after an erase.
pub const ERASED_VALUE: u8 = 0xFF;

pub struct FlashMap<C: Controller> {
    mcu: McuFlash<C>,
}

impl<C: Controller> FlashMap<C> {
    pub fn new(mcu: McuFlash<C>) -> Self { Self { mcu } }

    pub fn mcu(&self) -> &McuFlash<C> { &self.mcu }

    pub fn release(self) -> McuFlash<C> { self.mcu }

    pub fn open(&self, id: u8) -> Result<&'static FlashArea, Error> { flash_map::open(id) }

    pub fn close(&self, area: &FlashArea) { flash_map::close(area) }

    /// Programming granularity, in bytes.
    pub fn align(&self) -> u8 { DOUBLE_WORD as u8 }

    pub fn erased_value(&self) -> u8 { ERASED_VALUE }

    pub fn get_sectors(&self, area_id: u8) -> Result<Sectors, Error> {
        let area = flash_map::open(area_id)?;
        if !area.is_internal() {
            return Err(Error::UnsupportedDevice);
        }
        Ok(area.sectors())
    }

    pub fn read(&self, area: &FlashArea, offset: u32, bytes: &mut [u8]) -> Result<(), Error> {
        let start = Self::locate(area, offset, bytes.len())?;
        if bytes.is_empty() {
            return Ok(());
        }

        if bytes.len() >= DOUBLE_WORD {
            return Ok(self.mcu.read(start, bytes)?);
        }

        // Short reads go through the double words that cover them.
        let unit_start = align_down(start.0 as usize, DOUBLE_WORD);
        let unit_end = align_up(start.0 as usize + bytes.len(), DOUBLE_WORD);
        let mut scratch = [ERASED_VALUE; 2 * DOUBLE_WORD];
        let scratch = &mut scratch[..unit_end - unit_start];
        self.mcu.read(Address(unit_start as u32), scratch)?;
        let skip = start.0 as usize - unit_start;
        bytes.copy_from_slice(&scratch[skip..skip + bytes.len()]);
        Ok(())
    }

    /// Writes any number of bytes at any offset. Programming can only clear
    /// bits, so writing over data that wasn't erased leaves the AND of old
    /// and new contents.
    pub fn write(&mut self, area: &FlashArea, offset: u32, data: &[u8]) -> Result<(), Error> {
        let start = Self::locate(area, offset, data.len())?.0 as usize;
        if data.is_empty() {
            return Ok(());
        }
        let end = start + data.len();
        log_debug!("Writing {} bytes to area {} at {:#x}", data.len(), area.id(), offset);

        let mut unit = align_down(start, DOUBLE_WORD);
        while unit < end {
            let (first, last) = (max(unit, start), min(unit + DOUBLE_WORD, end));
            let mut bytes = [ERASED_VALUE; DOUBLE_WORD];
            if last - first < DOUBLE_WORD {
                self.mcu.read(Address(unit as u32), &mut bytes)?;
                let existing = bytes;
                bytes[first - unit..last - unit].copy_from_slice(&data[first - start..last - start]);
                if !bytes[..].is_subset_of(&existing[..]) {
                    log_warn!("Merging into programmed double word at {:#x}", unit);
                }
            } else {
                bytes.copy_from_slice(&data[first - start..last - start]);
            }
            self.mcu.program_double_word(Address(unit as u32), u64::from_le_bytes(bytes))?;
            unit += DOUBLE_WORD;
        }
        Ok(())
    }

    /// Erases whole sectors. Both `offset` and `length` must be multiples
    /// of the sector size.
    pub fn erase(&mut self, area: &FlashArea, offset: u32, length: u32) -> Result<(), Error> {
        if offset % SECTOR_SIZE != 0 || length % SECTOR_SIZE != 0 {
            log_error!("Erase of {:#x} bytes at {:#x} isn't sector aligned", length, offset);
            return Err(Error::AlignmentError);
        }
        let start = Self::locate(area, offset, length as usize)?;
        log_info!("Erasing {:#x} bytes of area {} at {:#x}", length, area.id(), offset);

        for sector in 0..(length / SECTOR_SIZE) as usize {
            let page = MEMORY_MAP
                .page_at(start + sector * SECTOR_SIZE as usize)
                .ok_or(Error::OutOfBounds)?;
            self.mcu.erase_page(page)?;
        }
        Ok(())
    }

    /// Absolute address of an area relative range, checking it is
    /// reachable and in bounds.
    fn locate(area: &FlashArea, offset: u32, length: usize) -> Result<Address, Error> {
        if !area.is_internal() {
            log_error!("Flash area {} is on unsupported device {}", area.id(), area.device_id());
            return Err(Error::UnsupportedDevice);
        }
        let in_bounds = (offset as usize).checked_add(length).map_or(false, |end| end <= area.size() as usize);
        if !in_bounds {
            return Err(Error::OutOfBounds);
        }
        Ok(Address(FLASH_BASE_ADDRESS + area.offset() + offset))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        drivers::stm32g4::flash::config::{BusyWait, Config},
        hal::doubles::flash::{Event, FakeController},
    };

    static EXTERNAL_AREA: FlashArea = FlashArea::new(9, 1, 0, 0x1000);

    fn flash_map_to_test() -> FlashMap<FakeController> {
        FlashMap::new(McuFlash::new(
            FakeController::default(),
            Config::default().busy_wait(BusyWait::Polls(100)),
        ))
    }

    #[test]
    fn reads_and_writes_are_bounded_by_the_area() {
        // Given
        let mut flash_map = flash_map_to_test();
        let scratch = flash_map.open(1).unwrap();
        let mut buffer = [0u8; 16];

        // Then
        assert_eq!(flash_map.read(scratch, 0x1000 - 16, &mut buffer), Ok(()));
        assert_eq!(flash_map.read(scratch, 0x1000 - 15, &mut buffer), Err(Error::OutOfBounds));
        assert_eq!(flash_map.read(scratch, u32::MAX, &mut buffer), Err(Error::OutOfBounds));
        assert_eq!(flash_map.write(scratch, 0x1000 - 8, &buffer), Err(Error::OutOfBounds));
        assert_eq!(flash_map.read(scratch, 0x1000, &mut []), Ok(()));
        assert!(flash_map.mcu().controller().events.is_empty());
    }

    #[test]
    fn areas_on_other_devices_are_unsupported() {
        // Given
        let mut flash_map = flash_map_to_test();
        let mut buffer = [0u8; 4];

        // Then
        assert_eq!(flash_map.read(&EXTERNAL_AREA, 0, &mut buffer), Err(Error::UnsupportedDevice));
        assert_eq!(flash_map.write(&EXTERNAL_AREA, 0, &buffer), Err(Error::UnsupportedDevice));
        assert_eq!(flash_map.erase(&EXTERNAL_AREA, 0, 0x800), Err(Error::UnsupportedDevice));
    }

    #[test]
    fn empty_write_never_reaches_the_controller() {
        // Given
        let mut flash_map = flash_map_to_test();
        let primary = flash_map.open(2).unwrap();
        flash_map.write(primary, 0, &[0x00; 8]).unwrap();
        let events_before = flash_map.mcu().controller().events.len();

        // When
        let result = flash_map.write(primary, 5, &[]);

        // Then
        assert_eq!(result, Ok(()));
        assert_eq!(flash_map.mcu().controller().events.len(), events_before);
        assert_eq!(flash_map.write(primary, 49152 + 1, &[]), Err(Error::OutOfBounds));
    }

    #[test]
    fn short_write_merges_into_its_double_word() {
        // Given
        let mut flash_map = flash_map_to_test();
        let primary = flash_map.open(2).unwrap();

        // When
        flash_map.write(primary, 3, &[0x12, 0x34]).unwrap();

        // Then
        let mut unit = [0u8; 8];
        flash_map.read(primary, 0, &mut unit).unwrap();
        assert_eq!(unit, [0xFF, 0xFF, 0xFF, 0x12, 0x34, 0xFF, 0xFF, 0xFF]);
        let mut short = [0u8; 2];
        flash_map.read(primary, 3, &mut short).unwrap();
        assert_eq!(short, [0x12, 0x34]);
    }

    #[test]
    fn unaligned_write_spans_several_double_words() {
        // Given
        let mut flash_map = flash_map_to_test();
        let primary = flash_map.open(2).unwrap();
        let data: Vec<u8> = (0..21).collect();

        // When
        flash_map.write(primary, 5, &data).unwrap();

        // Then
        let stores = flash_map
            .mcu()
            .controller()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Stored { .. }))
            .count();
        assert_eq!(stores, 4 * 2);
        let mut read_back = vec![0u8; 21];
        flash_map.read(primary, 5, &mut read_back).unwrap();
        assert_eq!(read_back, data);
        let mut edges = [0u8; 2];
        flash_map.read(primary, 4, &mut edges[..1]).unwrap();
        flash_map.read(primary, 26, &mut edges[1..]).unwrap();
        assert_eq!(edges, [0xFF, 0xFF]);
    }

    #[test]
    fn short_read_across_a_double_word_boundary() {
        // Given
        let mut flash_map = flash_map_to_test();
        let primary = flash_map.open(2).unwrap();
        flash_map.write(primary, 0, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]).unwrap();

        // When
        let mut bytes = [0u8; 4];
        flash_map.read(primary, 6, &mut bytes).unwrap();

        // Then
        assert_eq!(bytes, [7, 8, 9, 10]);
    }

    #[test]
    fn misaligned_erase_is_rejected_before_touching_hardware() {
        // Given
        let mut flash_map = flash_map_to_test();
        let primary = flash_map.open(2).unwrap();

        // Then
        assert_eq!(flash_map.erase(primary, 0x400, 0x800), Err(Error::AlignmentError));
        assert_eq!(flash_map.erase(primary, 0, 0x801), Err(Error::AlignmentError));
        assert_eq!(flash_map.erase(primary, 0, 0xC800), Err(Error::OutOfBounds));
        assert!(flash_map.mcu().controller().events.is_empty());
    }

    #[test]
    fn erase_visits_every_page_of_the_range() {
        // Given
        let mut flash_map = flash_map_to_test();
        let secondary = flash_map.open(3).unwrap();

        // When
        flash_map.erase(secondary, 0x800, 0x1800).unwrap();

        // Then
        let erased: Vec<_> = flash_map
            .mcu()
            .controller()
            .events
            .iter()
            .filter_map(|e| if let Event::EraseStarted(page) = e { Some(*page) } else { None })
            .collect();
        assert_eq!(erased, [41, 42, 43]);
    }

    #[test]
    fn driver_failures_surface_as_flash_map_errors() {
        // Given
        let mut controller = FakeController::default();
        controller.stuck_busy = true;
        let mut flash_map =
            FlashMap::new(McuFlash::new(controller, Config::default().busy_wait(BusyWait::Polls(5))));
        let primary = flash_map.open(2).unwrap();

        // Then
        assert_eq!(flash_map.write(primary, 0, &[0; 8]), Err(Error::BusyTimeout));
        assert_eq!(flash_map.erase(primary, 0, 0x800), Err(Error::BusyTimeout));
    }

    #[test]
    fn sectors_of_internal_areas_only() {
        // Given
        let flash_map = flash_map_to_test();

        // Then
        assert_eq!(flash_map.get_sectors(0).unwrap().count(), 14);
        assert_eq!(flash_map.get_sectors(7).map(|s| s.count()), Err(Error::NotFound));
        assert_eq!(flash_map.align(), 8);
        assert_eq!(flash_map.erased_value(), 0xFF);
    }
}
