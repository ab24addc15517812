//! The per-device record a debug session keeps for one attached part.

use std::fmt;
use std::ops::Range;

use crate::commands::CommandSet;

/// Identifies the driver responsible for a flash region.
///
/// Regions carry this tag so callers can dispatch by value instead of
/// comparing handler identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionDriver {
    /// The STM32F2/F4/F7 sector-erase driver of this crate.
    Stm32F4,
}

/// Word width used per programming transfer.
///
/// Selectable per silicon errata: x8 works at any supply voltage, x32 needs
/// VDD above 2.7 V but programs four times faster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parallelism {
    /// Byte-wide programming transfers.
    #[default]
    X8,
    /// Word-wide programming transfers.
    X32,
}

impl fmt::Display for Parallelism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parallelism::X8 => f.write_str("x8"),
            Parallelism::X32 => f.write_str("x32"),
        }
    }
}

/// A contiguous range of flash with uniform handlers and block accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashRegion {
    /// First address of the region.
    pub start: u32,
    /// Length in bytes.
    pub length: u32,
    /// Erase granularity within this region, in bytes.
    pub block_size: u32,
    /// Hardware sector number of the first block.
    pub base_sector: u8,
    /// Required write alignment, in bytes.
    pub align: u32,
    /// Value a fully erased byte reads back as.
    pub erased_byte: u8,
    /// True if this range is a secondary window onto cells already described
    /// by another region.
    pub is_alias: bool,
    /// Driver responsible for erase and write on this region.
    pub driver: RegionDriver,
    /// Programming transfer width. A session-wide setting, stored per region.
    pub parallelism: Parallelism,
}

impl FlashRegion {
    /// The address range covered by this region.
    pub fn address_range(&self) -> Range<u32> {
        self.start..self.start + self.length
    }

    /// True if `address` falls inside this region.
    pub fn contains(&self, address: u32) -> bool {
        self.address_range().contains(&address)
    }

    /// Hardware sector number the given address falls into.
    pub fn sector_index(&self, address: u32) -> u8 {
        self.base_sector + ((address - self.start) / self.block_size) as u8
    }
}

/// A contiguous range of RAM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamRegion {
    /// First address of the region.
    pub start: u32,
    /// Length in bytes.
    pub length: u32,
}

impl RamRegion {
    /// The address range covered by this region.
    pub fn address_range(&self) -> Range<u32> {
        self.start..self.start + self.length
    }
}

/// Inventory of one attached device, owned by the debug session.
///
/// Probing appends regions and commands exactly once; entries are never
/// removed for the life of the record.
#[derive(Debug, Default)]
pub struct Target {
    /// Identification code of the part, set once probing succeeds.
    pub idcode: u16,
    /// Human readable driver label.
    pub driver: &'static str,
    flash: Vec<FlashRegion>,
    ram: Vec<RamRegion>,
    commands: Vec<CommandSet>,
}

impl Target {
    /// An empty record, ready for probing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a flash region.
    pub fn add_flash_region(&mut self, region: FlashRegion) {
        tracing::debug!(
            "flash region {:#010x}..{:#010x}, block {:#x}, base sector {}",
            region.start,
            region.start + region.length,
            region.block_size,
            region.base_sector,
        );
        self.flash.push(region);
    }

    /// Append a RAM region.
    pub fn add_ram_region(&mut self, region: RamRegion) {
        self.ram.push(region);
    }

    /// Register a command table under its family label.
    pub fn add_commands(&mut self, set: CommandSet) {
        self.commands.push(set);
    }

    /// All flash regions, in registration order.
    pub fn flash_regions(&self) -> &[FlashRegion] {
        &self.flash
    }

    /// Mutable access to the flash regions, for per-region settings.
    pub fn flash_regions_mut(&mut self) -> &mut [FlashRegion] {
        &mut self.flash
    }

    /// All RAM regions, in registration order.
    pub fn ram_regions(&self) -> &[RamRegion] {
        &self.ram
    }

    /// All registered command tables.
    pub fn command_sets(&self) -> &[CommandSet] {
        &self.commands
    }

    /// The flash region containing `address`, if any.
    pub fn flash_region_at(&self, address: u32) -> Option<&FlashRegion> {
        self.flash.iter().find(|region| region.contains(address))
    }
}
