//! Static partition table of the internal flash.
//!
//! The table itself is generated at build time from the flash map
//! configuration (see `partitions.ron`), and validated both by the
//! build script and by the compile time checks below.
use crate::{
    drivers::stm32g4::flash as mcu,
    error::Error,
};
use static_assertions::const_assert;

/// Fixed region of a flash device. Layout compatible with the C
/// `struct flash_area`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashArea {
    id: u8,
    device_id: u8,
    pad16: u16,
    offset: u32,
    size: u32,
}

/// Erasable span of an area, with its offset relative to the area (not
/// the device). Layout compatible with the C `struct flash_sector`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashSector {
    pub offset: u32,
    pub size: u32,
}

include!(concat!(env!("OUT_DIR"), "/partitions.rs"));

pub static FLASH_AREAS: [FlashArea; AREA_COUNT] = AREAS;

// The generated table must describe the flash the driver controls.
const_assert!(FLASH_BASE_ADDRESS == mcu::BASE_ADDRESS.0);
const_assert!(FLASH_SIZE as usize == mcu::FLASH_SIZE);
const_assert!(SECTOR_SIZE as usize == mcu::PAGE_SIZE);
const_assert!(is_sound(&AREAS));

// NOTE: Some of the control flow here is necessarily awkward,
// since this is a compile-time function.
const fn is_sound(areas: &[FlashArea; AREA_COUNT]) -> bool {
    let mut i = 0usize;
    while i < AREA_COUNT {
        let area = &areas[i];
        if area.size == 0 || area.offset % SECTOR_SIZE != 0 || area.size % SECTOR_SIZE != 0 {
            return false;
        }
        if area.offset as u64 + area.size as u64 > FLASH_SIZE as u64 {
            return false;
        }
        let mut j = i + 1;
        while j < AREA_COUNT {
            let other = &areas[j];
            if other.id == area.id {
                return false;
            }
            let disjoint = other.offset >= area.offset + area.size
                || area.offset >= other.offset + other.size;
            if other.device_id == area.device_id && !disjoint {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

impl FlashArea {
    pub(crate) const fn new(id: u8, device_id: u8, offset: u32, size: u32) -> Self {
        Self { id, device_id, pad16: 0, offset, size }
    }

    pub const fn id(&self) -> u8 { self.id }
    pub const fn device_id(&self) -> u8 { self.device_id }
    /// Offset from the start of the device.
    pub const fn offset(&self) -> u32 { self.offset }
    pub const fn size(&self) -> u32 { self.size }

    /// Whether the area lives in the MCU internal flash.
    pub const fn is_internal(&self) -> bool { self.device_id == INTERNAL_FLASH_DEVICE }

    /// Sectors covering the area, in order.
    pub fn sectors(&self) -> Sectors { Sectors { area_size: self.size, next: 0 } }
}

/// Iterator over the sectors of an area.
#[derive(Clone, Debug)]
pub struct Sectors {
    area_size: u32,
    next: u32,
}

impl Iterator for Sectors {
    type Item = FlashSector;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.area_size {
            return None;
        }
        let sector = FlashSector { offset: self.next, size: SECTOR_SIZE };
        self.next += SECTOR_SIZE;
        Some(sector)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = ((self.area_size.saturating_sub(self.next) + SECTOR_SIZE - 1) / SECTOR_SIZE) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Sectors {}

/// Looks up an area by id.
pub fn open(id: u8) -> Result<&'static FlashArea, Error> {
    FLASH_AREAS.iter().find(|area| area.id == id).ok_or_else(|| {
        log_warn!("No flash area with id {}", id);
        Error::NotFound
    })
}

/// Releases an area. Areas are static, so there is nothing to undo.
pub fn close(area: &FlashArea) { log_debug!("Closed flash area {}", area.id); }
