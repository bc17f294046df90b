//! Mapping between logical image slots and partition table areas.
use crate::{
    devices::flash_map::{FLASH_AREA_IMAGE_PRIMARY, FLASH_AREA_IMAGE_SECONDARY, IMAGE_COUNT},
    error::Error,
};
use core::convert::TryFrom;

/// Image slot, numbered as the bootloader core numbers them.
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Slot {
    Primary = 0,
    Secondary = 1,
}

impl TryFrom<i32> for Slot {
    type Error = Error;

    fn try_from(slot: i32) -> Result<Self, Self::Error> {
        match slot {
            0 => Ok(Slot::Primary),
            1 => Ok(Slot::Secondary),
            _ => Err(Error::InvalidSlot),
        }
    }
}

impl From<Slot> for i32 {
    fn from(slot: Slot) -> Self { slot as i32 }
}

impl Slot {
    /// Area holding this slot for a given image.
    pub fn area_id(self, image_index: usize) -> Result<u8, Error> {
        if image_index >= IMAGE_COUNT {
            return Err(Error::InvalidSlot);
        }
        Ok(match self {
            Slot::Primary => FLASH_AREA_IMAGE_PRIMARY[image_index],
            Slot::Secondary => FLASH_AREA_IMAGE_SECONDARY[image_index],
        })
    }
}

pub fn area_id_from_multi_image_slot(image_index: usize, slot: i32) -> Result<u8, Error> {
    log_debug!("Area id for image {} slot {}", image_index, slot);
    Slot::try_from(slot)?.area_id(image_index)
}

pub fn area_id_from_image_slot(slot: i32) -> Result<u8, Error> {
    area_id_from_multi_image_slot(0, slot)
}

/// Inverse of [`area_id_from_multi_image_slot`]. Fails for areas that
/// aren't image slots (bootloader and scratch).
pub fn slot_from_multi_image_area_id(image_index: usize, area_id: u8) -> Result<Slot, Error> {
    [Slot::Primary, Slot::Secondary]
        .iter()
        .copied()
        .find(|slot| slot.area_id(image_index) == Ok(area_id))
        .ok_or_else(|| {
            log_error!("Area {} is not an image slot of image {}", area_id, image_index);
            Error::InvalidSlot
        })
}

pub fn slot_from_area_id(area_id: u8) -> Result<Slot, Error> {
    slot_from_multi_image_area_id(0, area_id)
}
