//! Flash map port for the NUCLEO-G431KB board.
use crate::{
    devices::flash_area::FlashMap,
    drivers::stm32g4::flash::{config::Config, McuFlash},
    stm32pac::FLASH,
};

pub type Flash = McuFlash<FLASH>;

/// Builds the flash map over the internal flash peripheral.
pub fn flash_map(flash: FLASH, config: Config) -> FlashMap<FLASH> {
    FlashMap::new(McuFlash::new(flash, config))
}

/// C interface of the flash map, for linking against the bootloader core.
#[cfg(feature = "mcuboot-ffi")]
pub mod ffi {
    use super::*;
    use crate::{
        devices::{
            flash_map::{self, FlashArea, FlashSector},
            slots,
        },
        error::{ReturnCode, FAILURE},
        stm32pac,
    };
    use core::{
        cell::RefCell,
        ffi::{c_char, c_int, c_void, CStr},
    };
    use cortex_m::interrupt::{self, Mutex};

    static FLASH_MAP: Mutex<RefCell<Option<FlashMap<FLASH>>>> = Mutex::new(RefCell::new(None));

    /// Hands the flash peripheral to the C interface. Without it, the
    /// peripheral is taken on first use.
    pub fn install(flash: FLASH, config: Config) {
        interrupt::free(|cs| {
            FLASH_MAP.borrow(cs).replace(Some(flash_map(flash, config)));
        });
    }

    fn with_flash_map<R>(f: impl FnOnce(&mut FlashMap<FLASH>) -> R) -> Option<R> {
        interrupt::free(|cs| {
            let mut cell = FLASH_MAP.borrow(cs).borrow_mut();
            if cell.is_none() {
                *cell = stm32pac::Peripherals::take().map(|p| flash_map(p.FLASH, Config::default()));
            }
            if cell.is_none() {
                log_error!("Flash peripheral unavailable");
            }
            cell.as_mut().map(f)
        })
    }

    #[no_mangle]
    pub unsafe extern "C" fn flash_area_open(id: u8, area: *mut *const FlashArea) -> c_int {
        if area.is_null() {
            return FAILURE;
        }
        match flash_map::open(id) {
            Ok(found) => {
                *area = found;
                0
            }
            Err(_) => FAILURE,
        }
    }

    #[no_mangle]
    pub unsafe extern "C" fn flash_area_close(area: *const FlashArea) {
        if let Some(area) = area.as_ref() {
            flash_map::close(area);
        }
    }

    #[no_mangle]
    pub unsafe extern "C" fn flash_area_read(
        area: *const FlashArea,
        offset: u32,
        destination: *mut c_void,
        length: u32,
    ) -> c_int {
        let area = match area.as_ref() {
            Some(area) => area,
            None => return FAILURE,
        };
        let bytes: &mut [u8] = if length == 0 {
            &mut []
        } else if destination.is_null() {
            return FAILURE;
        } else {
            core::slice::from_raw_parts_mut(destination as *mut u8, length as usize)
        };
        with_flash_map(|map| map.read(area, offset, bytes)).map_or(FAILURE, ReturnCode::return_code)
    }

    #[no_mangle]
    pub unsafe extern "C" fn flash_area_write(
        area: *const FlashArea,
        offset: u32,
        source: *const c_void,
        length: u32,
    ) -> c_int {
        let area = match area.as_ref() {
            Some(area) => area,
            None => return FAILURE,
        };
        let data: &[u8] = if length == 0 {
            &[]
        } else if source.is_null() {
            return FAILURE;
        } else {
            core::slice::from_raw_parts(source as *const u8, length as usize)
        };
        with_flash_map(|map| map.write(area, offset, data)).map_or(FAILURE, ReturnCode::return_code)
    }

    #[no_mangle]
    pub unsafe extern "C" fn flash_area_erase(area: *const FlashArea, offset: u32, length: u32) -> c_int {
        match area.as_ref() {
            Some(area) => with_flash_map(|map| map.erase(area, offset, length))
                .map_or(FAILURE, ReturnCode::return_code),
            None => FAILURE,
        }
    }

    #[no_mangle]
    pub extern "C" fn flash_area_align(_area: *const FlashArea) -> u8 {
        crate::drivers::stm32g4::flash::DOUBLE_WORD as u8
    }

    #[no_mangle]
    pub extern "C" fn flash_area_erased_val(_area: *const FlashArea) -> u8 {
        crate::devices::flash_area::ERASED_VALUE
    }

    /// `count` holds the capacity of `sectors` on entry, and the number of
    /// sectors written on return.
    #[no_mangle]
    pub unsafe extern "C" fn flash_area_get_sectors(
        area_id: c_int,
        count: *mut u32,
        sectors: *mut FlashSector,
    ) -> c_int {
        if count.is_null() || sectors.is_null() {
            return FAILURE;
        }
        let area = match u8::try_from(area_id).ok().map(flash_map::open) {
            Some(Ok(area)) if area.is_internal() => area,
            _ => return FAILURE,
        };
        let capacity = *count as usize;
        if area.sectors().len() > capacity {
            log_error!("Area {} has more sectors than the {} provided", area.id(), capacity);
            return FAILURE;
        }
        let destination = core::slice::from_raw_parts_mut(sectors, capacity);
        let mut written = 0u32;
        for (slot, sector) in destination.iter_mut().zip(area.sectors()) {
            *slot = sector;
            written += 1;
        }
        *count = written;
        0
    }

    #[no_mangle]
    pub extern "C" fn flash_area_id_from_multi_image_slot(image_index: c_int, slot: c_int) -> c_int {
        usize::try_from(image_index)
            .ok()
            .and_then(|image| slots::area_id_from_multi_image_slot(image, slot).ok())
            .map_or(FAILURE, c_int::from)
    }

    #[no_mangle]
    pub extern "C" fn flash_area_id_from_image_slot(slot: c_int) -> c_int {
        flash_area_id_from_multi_image_slot(0, slot)
    }

    #[no_mangle]
    pub extern "C" fn flash_area_id_to_multi_image_slot(image_index: c_int, area_id: c_int) -> c_int {
        let image = usize::try_from(image_index).ok();
        let area_id = u8::try_from(area_id).ok();
        match (image, area_id) {
            (Some(image), Some(area_id)) => slots::slot_from_multi_image_area_id(image, area_id)
                .map_or(FAILURE, c_int::from),
            _ => FAILURE,
        }
    }

    #[no_mangle]
    pub extern "C" fn flash_area_id_to_image_slot(area_id: c_int) -> c_int {
        flash_area_id_to_multi_image_slot(0, area_id)
    }

    /// Called by the bootloader core when one of its assertions fails.
    #[no_mangle]
    pub unsafe extern "C" fn mcuboot_assert_handler(
        file: *const c_char,
        line: c_int,
        func: *const c_char,
    ) -> ! {
        let text = |s: *const c_char| {
            if s.is_null() {
                "?"
            } else {
                CStr::from_ptr(s).to_str().unwrap_or("?")
            }
        };
        log_error!("Assertion failed: file {}, line {}, func {}", text(file), line, text(func));
        cortex_m::asm::udf()
    }
}
