//! Flash map devices: the partition table, the image slot mapping, and
//! the area API built on top of the internal flash driver. Board
//! specifics are handled in the `ports` module.

pub mod flash_area;
pub mod flash_map;
pub mod slots;
