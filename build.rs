use anyhow::{anyhow, bail, Result};
use serde::Deserialize;
use std::{
    env,
    fs::{self, File},
    io::{BufReader, Read, Write},
    path::{Path, PathBuf},
};

const DEFAULT_CONFIG_FILENAME: &str = "partitions.ron";

#[derive(Deserialize)]
struct Configuration {
    device: Device,
    areas: Vec<Area>,
}

#[derive(Deserialize)]
struct Device {
    id: u8,
    base_address: u32,
    size_kb: u32,
    sector_size: u32,
}

#[derive(Deserialize)]
struct Area {
    name: String,
    id: u8,
    role: Role,
    offset_kb: u32,
    size_kb: u32,
}

#[derive(Deserialize, Clone, Copy, PartialEq)]
enum Role {
    Bootloader,
    Scratch,
    Primary(u8),
    Secondary(u8),
}

impl Area {
    fn offset(&self) -> u32 { self.offset_kb * 1024 }
    fn size(&self) -> u32 { self.size_kb * 1024 }
    fn end(&self) -> u32 { self.offset() + self.size() }
}

fn main() -> Result<()> { process_configuration_file() }

fn process_configuration_file() -> Result<()> {
    println!("cargo:rerun-if-env-changed=FLASH_MAP_CONFIG");

    let filename = match env::var("FLASH_MAP_CONFIG") {
        Ok(filename) if !filename.is_empty() => filename,
        _ => DEFAULT_CONFIG_FILENAME.to_owned(),
    };
    println!("cargo:rerun-if-changed={}", filename);

    let file = File::open(&filename)
        .map_err(|e| anyhow!("Unable to open flash map configuration '{}': {}", filename, e))?;
    let mut buf_reader = BufReader::new(file);
    let mut contents = String::new();
    buf_reader.read_to_string(&mut contents)?;
    let configuration: Configuration = ron::from_str(&contents)?;

    let image_count = validate(&configuration)?;

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    generate_partition_table(&out_dir, &configuration, image_count)?;
    generate_linker_fragment(&out_dir, &configuration)?;
    println!("cargo:rustc-link-search={}", out_dir.display());

    Ok(())
}

/// Checks the partition table invariants, returning the number of images.
fn validate(configuration: &Configuration) -> Result<usize> {
    let device = &configuration.device;
    let areas = &configuration.areas;
    let device_size = device.size_kb * 1024;

    if device.sector_size == 0 || !device.sector_size.is_power_of_two() {
        bail!("Sector size must be a power of two, found {}", device.sector_size);
    }

    for (index, area) in areas.iter().enumerate() {
        if area.name.is_empty()
            || !area.name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        {
            bail!("Area name '{}' must be lowercase alphanumeric", area.name);
        }
        if area.size() == 0 {
            bail!("Area '{}' is empty", area.name);
        }
        if area.offset() % device.sector_size != 0 || area.size() % device.sector_size != 0 {
            bail!(
                "Area '{}' (offset 0x{:x}, size 0x{:x}) is not aligned to 0x{:x} byte sectors",
                area.name,
                area.offset(),
                area.size(),
                device.sector_size
            );
        }
        if area.end() > device_size {
            bail!("Area '{}' ends at 0x{:x}, past the end of flash", area.name, area.end());
        }
        for other in &areas[..index] {
            if other.id == area.id {
                bail!("Areas '{}' and '{}' share id {}", other.name, area.name, area.id);
            }
            if other.name == area.name {
                bail!("Area name '{}' is used twice", area.name);
            }
            if area.offset() < other.end() && other.offset() < area.end() {
                bail!("Areas '{}' and '{}' overlap", other.name, area.name);
            }
        }
    }

    let count_role = |role: Role| areas.iter().filter(|a| a.role == role).count();
    if count_role(Role::Bootloader) != 1 {
        bail!("Exactly one bootloader area is required");
    }
    if count_role(Role::Scratch) != 1 {
        bail!("Exactly one scratch area is required");
    }

    let image_count = areas
        .iter()
        .filter_map(|a| match a.role {
            Role::Primary(image) | Role::Secondary(image) => Some(image as usize + 1),
            _ => None,
        })
        .max()
        .ok_or_else(|| anyhow!("At least one image slot pair is required"))?;

    for image in 0..image_count as u8 {
        if count_role(Role::Primary(image)) != 1 || count_role(Role::Secondary(image)) != 1 {
            bail!("Image {} needs exactly one primary and one secondary slot", image);
        }
    }

    Ok(image_count)
}

fn area_id(configuration: &Configuration, role: Role) -> u8 {
    configuration.areas.iter().find(|a| a.role == role).map(|a| a.id).unwrap()
}

/// Generates `partitions.rs`, included by the partition table module.
fn generate_partition_table(
    out_dir: &Path,
    configuration: &Configuration,
    image_count: usize,
) -> Result<()> {
    let device = &configuration.device;
    let mut file = File::create(out_dir.join("partitions.rs"))?;

    let slot_ids = |primary: bool| -> String {
        (0..image_count as u8)
            .map(|image| {
                let role = if primary { Role::Primary(image) } else { Role::Secondary(image) };
                area_id(configuration, role).to_string()
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    writeln!(file, "// Generated by build.rs from the flash map configuration. Do not edit.")?;
    writeln!(file)?;
    writeln!(file, "/// Device id of the MCU internal flash.")?;
    writeln!(file, "pub const INTERNAL_FLASH_DEVICE: u8 = {};", device.id)?;
    writeln!(file, "/// Absolute address where the internal flash is mapped.")?;
    writeln!(file, "pub const FLASH_BASE_ADDRESS: u32 = 0x{:08X};", device.base_address)?;
    writeln!(file, "pub const FLASH_SIZE: u32 = 0x{:X};", device.size_kb * 1024)?;
    writeln!(file, "/// Smallest erasable span of the internal flash.")?;
    writeln!(file, "pub const SECTOR_SIZE: u32 = 0x{:X};", device.sector_size)?;
    writeln!(file)?;
    writeln!(
        file,
        "pub const FLASH_AREA_BOOTLOADER: u8 = {};",
        area_id(configuration, Role::Bootloader)
    )?;
    writeln!(
        file,
        "pub const FLASH_AREA_IMAGE_SCRATCH: u8 = {};",
        area_id(configuration, Role::Scratch)
    )?;
    writeln!(file, "pub const IMAGE_COUNT: usize = {};", image_count)?;
    writeln!(
        file,
        "pub const FLASH_AREA_IMAGE_PRIMARY: [u8; IMAGE_COUNT] = [{}];",
        slot_ids(true)
    )?;
    writeln!(
        file,
        "pub const FLASH_AREA_IMAGE_SECONDARY: [u8; IMAGE_COUNT] = [{}];",
        slot_ids(false)
    )?;
    writeln!(file)?;
    writeln!(file, "pub const AREA_COUNT: usize = {};", configuration.areas.len())?;
    writeln!(file, "const AREAS: [FlashArea; AREA_COUNT] = [")?;
    for area in &configuration.areas {
        writeln!(
            file,
            "    // {}\n    FlashArea::new({}, INTERNAL_FLASH_DEVICE, 0x{:X}, 0x{:X}),",
            area.name,
            area.id,
            area.offset(),
            area.size()
        )?;
    }
    writeln!(file, "];")?;

    Ok(())
}

/// Generates `flash_map.x`, a linker script fragment exposing the start and
/// size of every area so the bootloader's own memory layout can refer to (and
/// be checked against) the same table.
fn generate_linker_fragment(out_dir: &Path, configuration: &Configuration) -> Result<()> {
    let base = configuration.device.base_address;
    let mut contents = String::from("/* Generated by build.rs from the flash map configuration. */\n");
    for area in &configuration.areas {
        contents.push_str(&format!(
            "__flash_area_{name}_start = 0x{start:08X};\n__flash_area_{name}_size = 0x{size:X};\n",
            name = area.name,
            start = base + area.offset(),
            size = area.size(),
        ));
    }
    fs::write(out_dir.join("flash_map.x"), contents)?;
    Ok(())
}
