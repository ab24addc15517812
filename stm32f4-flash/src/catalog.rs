//! Device identification and memory map construction.
//!
//! Probing reads the 12 bit identification code from DBGMCU_IDCODE and, on a
//! match, describes the part's flash banks, RAMs and monitor commands on the
//! device record. Families are composed out of named capability blocks so
//! the table stays order independent.

use crate::commands;
use crate::error::ProbeError;
use crate::memory::FlashProbe;
use crate::target::{FlashRegion, Parallelism, RamRegion, RegionDriver, Target};

const DBGMCU_IDCODE: u32 = 0xE004_2000;
const CPUID: u32 = 0xE000_ED00;

/// Identification codes, DBGMCU_IDCODE[11:0].
pub mod id {
    /// STM32F205/F207/F215/F217.
    pub const STM32F20X: u16 = 0x411;
    /// STM32F405/F407/F415/F417.
    pub const STM32F40X: u16 = 0x413;
    /// STM32F427/F437.
    pub const STM32F42X: u16 = 0x419;
    /// STM32F446.
    pub const STM32F446: u16 = 0x421;
    /// STM32F401 B/C.
    pub const STM32F401C: u16 = 0x423;
    /// STM32F411.
    pub const STM32F411: u16 = 0x431;
    /// STM32F401 D/E.
    pub const STM32F401E: u16 = 0x433;
    /// STM32F469/F479.
    pub const STM32F46X: u16 = 0x434;
    /// STM32F412.
    pub const STM32F412: u16 = 0x441;
    /// STM32F74x.
    pub const STM32F74X: u16 = 0x449;
    /// STM32F76x/F77x.
    pub const STM32F76X: u16 = 0x451;
    /// STM32F72x/F73x.
    pub const STM32F72X: u16 = 0x452;
    /// STM32F410.
    pub const STM32F410: u16 = 0x458;
    /// STM32F413.
    pub const STM32F413: u16 = 0x463;
}

const DRIVER_F2: &str = "STM32F2xx";
const DRIVER_F4: &str = "STM32F4xx";
const DRIVER_F7: &str = "STM32F7xx";

/// Identify the attached device and populate `target`.
///
/// Returns `Ok(false)` with the record untouched when the identification
/// code matches no supported part, so the session can try another backend.
/// On success the record's idcode, driver label, memory regions and command
/// table are set, exactly once.
pub fn probe(probe: &mut dyn FlashProbe, target: &mut Target) -> Result<bool, ProbeError> {
    let mut idcode = (probe.read_word_32(DBGMCU_IDCODE)? & 0xFFF) as u16;
    let mut f2 = false;

    if idcode == id::STM32F20X {
        // F405 revision A parts report the F205 code (and a wrong revision);
        // the CPUID part number tells the two lines apart. See the F40x/F41x
        // errata sheet.
        let cpuid = probe.read_word_32(CPUID)?;
        if cpuid & 0xFFF0 == 0xC240 {
            idcode = id::STM32F40X;
        } else {
            f2 = true;
        }
    }

    match idcode {
        id::STM32F20X | id::STM32F40X => describe_f40x(target, f2),
        id::STM32F42X | id::STM32F46X => describe_f42x(target),
        id::STM32F446 | id::STM32F401C | id::STM32F411 | id::STM32F401E | id::STM32F412 => {
            describe_f4_single_bank(target)
        }
        id::STM32F413 => describe_f413(target),
        id::STM32F74X => describe_f74x(target),
        id::STM32F76X => describe_f76x(target),
        id::STM32F72X => describe_f72x(target),
        _ => {
            tracing::debug!("no device matches identification code {idcode:#05x}");
            return Ok(false);
        }
    }

    target.idcode = idcode;
    tracing::debug!("probed {} (idcode {idcode:#05x})", target.driver);
    Ok(true)
}

fn add_flash(target: &mut Target, start: u32, length: u32, block_size: u32, base_sector: u8) {
    target.add_flash_region(FlashRegion {
        start,
        length,
        block_size,
        base_sector,
        align: 4,
        erased_byte: 0xFF,
        is_alias: false,
        driver: RegionDriver::Stm32F4,
        parallelism: Parallelism::default(),
    });
}

fn add_flash_alias(target: &mut Target, start: u32, length: u32, block_size: u32, base_sector: u8) {
    target.add_flash_region(FlashRegion {
        start,
        length,
        block_size,
        base_sector,
        align: 4,
        erased_byte: 0xFF,
        is_alias: true,
        driver: RegionDriver::Stm32F4,
        parallelism: Parallelism::default(),
    });
}

/// Bank 1 as every F2/F4 part maps it: four 16 KiB sectors, one 64 KiB
/// sector, then 128 KiB sectors filling `large_group_len` bytes.
fn add_bank1(target: &mut Target, large_group_len: u32) {
    add_flash(target, 0x0800_0000, 0x1_0000, 0x4000, 0);
    add_flash(target, 0x0801_0000, 0x1_0000, 0x1_0000, 4);
    add_flash(target, 0x0802_0000, large_group_len, 0x2_0000, 5);
}

/// Second bank of the 2 MiB parts, repeating the bank 1 sector grouping.
fn add_bank2(target: &mut Target) {
    add_flash(target, 0x0810_0000, 0x1_0000, 0x4000, 12);
    add_flash(target, 0x0811_0000, 0x1_0000, 0x1_0000, 16);
    add_flash(target, 0x0812_0000, 0xE_0000, 0x2_0000, 17);
}

/// Core-coupled data RAM of the F4 line.
fn add_ccm_ram(target: &mut Target) {
    target.add_ram_region(RamRegion {
        start: 0x1000_0000,
        length: 0x1_0000,
    });
}

fn add_sram(target: &mut Target, length: u32) {
    target.add_ram_region(RamRegion {
        start: 0x2000_0000,
        length,
    });
}

/// F74x/F76x flash through the AXIM port.
fn add_f7_axim_bank(target: &mut Target, large_group_len: u32) {
    add_flash(target, 0x0800_0000, 0x2_0000, 0x8000, 0);
    add_flash(target, 0x0802_0000, 0x2_0000, 0x2_0000, 4);
    add_flash(target, 0x0804_0000, large_group_len, 0x4_0000, 5);
}

/// The same cells windowed through ITCM for zero wait-state fetches.
fn add_f7_itcm_alias(target: &mut Target, large_group_len: u32) {
    add_flash_alias(target, 0x0020_0000, 0x2_0000, 0x8000, 0);
    add_flash_alias(target, 0x0022_0000, 0x2_0000, 0x2_0000, 4);
    add_flash_alias(target, 0x0024_0000, large_group_len, 0x4_0000, 5);
}

fn describe_f40x(target: &mut Target, f2: bool) {
    // The F2 line has no core-coupled RAM.
    if !f2 {
        add_ccm_ram(target);
    }
    add_sram(target, 0x4_0000);
    add_bank1(target, 0xE_0000);
    target.driver = if f2 { DRIVER_F2 } else { DRIVER_F4 };
    target.add_commands(commands::command_set(if f2 { "STM32F2" } else { "STM32F4" }));
}

fn describe_f42x(target: &mut Target) {
    add_bank1(target, 0xE_0000);
    add_bank2(target);
    add_ccm_ram(target);
    add_sram(target, 0x4_0000);
    target.driver = DRIVER_F4;
    target.add_commands(commands::command_set("STM32F4"));
}

fn describe_f4_single_bank(target: &mut Target) {
    add_sram(target, 0x4_0000);
    add_bank1(target, 0xE_0000);
    target.driver = DRIVER_F4;
    target.add_commands(commands::command_set("STM32F4"));
}

fn describe_f413(target: &mut Target) {
    add_sram(target, 0x5_0000);
    add_bank1(target, 0x16_0000);
    target.driver = DRIVER_F4;
    target.add_commands(commands::command_set("STM32F413"));
}

fn describe_f74x(target: &mut Target) {
    target.add_ram_region(RamRegion {
        start: 0x0000_0000,
        length: 0x4000,
    });
    add_sram(target, 0x5_0000);
    add_f7_axim_bank(target, 0xC_0000);
    add_f7_itcm_alias(target, 0xC_0000);
    target.driver = DRIVER_F7;
    target.add_commands(commands::command_set("STM32F74x"));
}

fn describe_f76x(target: &mut Target) {
    target.add_ram_region(RamRegion {
        start: 0x0000_0000,
        length: 0x4000,
    });
    add_sram(target, 0x8_0000);
    add_f7_axim_bank(target, 0x1C_0000);
    add_f7_itcm_alias(target, 0x1C_0000);
    target.driver = DRIVER_F7;
    target.add_commands(commands::command_set("STM32F76x"));
}

fn describe_f72x(target: &mut Target) {
    target.add_ram_region(RamRegion {
        start: 0x0000_0000,
        length: 0x2000,
    });
    add_sram(target, 0x4_0000);
    add_flash(target, 0x0800_0000, 0x1_0000, 0x4000, 0);
    add_flash(target, 0x0801_0000, 0x1_0000, 0x1_0000, 4);
    add_flash(target, 0x0802_0000, 0x6_0000, 0x2_0000, 3);
    target.driver = DRIVER_F7;
    target.add_commands(commands::command_set("STM32F72x"));
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test::FakeProbe;

    const ALL_IDCODES: &[u16] = &[
        id::STM32F20X,
        id::STM32F40X,
        id::STM32F42X,
        id::STM32F446,
        id::STM32F401C,
        id::STM32F411,
        id::STM32F401E,
        id::STM32F46X,
        id::STM32F412,
        id::STM32F74X,
        id::STM32F76X,
        id::STM32F72X,
        id::STM32F413,
    ];

    // CPUID of a Cortex-M3, so 0x411 stays on the F2-class path.
    const CORTEX_M3_CPUID: u32 = 0x412F_C230;

    fn probed(idcode: u16) -> Target {
        let mut probe = FakeProbe::new();
        // Only the low 12 bits carry the code.
        probe.set_word(DBGMCU_IDCODE, 0xFFFF_F000 | u32::from(idcode));
        probe.set_word(CPUID, CORTEX_M3_CPUID);

        let mut target = Target::new();
        assert!(super::probe(&mut probe, &mut target).unwrap());
        target
    }

    fn flash_at(target: &Target, start: u32) -> &FlashRegion {
        target
            .flash_regions()
            .iter()
            .find(|region| region.start == start)
            .unwrap_or_else(|| panic!("no flash region starts at {start:#010x}"))
    }

    #[test]
    fn f42x_registers_both_banks_and_ccm() {
        let target = probed(id::STM32F42X);

        assert_eq!(target.idcode, id::STM32F42X);
        assert_eq!(target.driver, "STM32F4xx");

        for (start, length, block_size, base_sector) in [
            (0x0800_0000, 0x1_0000, 0x4000, 0),
            (0x0801_0000, 0x1_0000, 0x1_0000, 4),
            (0x0802_0000, 0xE_0000, 0x2_0000, 5),
            (0x0810_0000, 0x1_0000, 0x4000, 12),
            (0x0811_0000, 0x1_0000, 0x1_0000, 16),
            (0x0812_0000, 0xE_0000, 0x2_0000, 17),
        ] {
            let region = flash_at(&target, start);
            assert_eq!(region.length, length);
            assert_eq!(region.block_size, block_size);
            assert_eq!(region.base_sector, base_sector);
        }

        assert!(target
            .ram_regions()
            .iter()
            .any(|ram| ram.start == 0x1000_0000 && ram.length == 0x1_0000));
        assert!(target
            .ram_regions()
            .iter()
            .any(|ram| ram.start == 0x2000_0000 && ram.length == 0x4_0000));
        assert_eq!(target.command_sets()[0].label, "STM32F4");
    }

    #[test]
    fn unknown_code_leaves_record_untouched() {
        let mut probe = FakeProbe::new();
        probe.set_word(DBGMCU_IDCODE, 0x7A3);

        let mut target = Target::new();
        assert!(!super::probe(&mut probe, &mut target).unwrap());

        assert_eq!(target.idcode, 0);
        assert_eq!(target.driver, "");
        assert!(target.flash_regions().is_empty());
        assert!(target.ram_regions().is_empty());
        assert!(target.command_sets().is_empty());
    }

    #[test]
    fn f405_revision_a_reports_f205_code() {
        let mut probe = FakeProbe::new();
        probe.set_word(DBGMCU_IDCODE, u32::from(id::STM32F20X));
        // Cortex-M4 part number, so this is really an F405.
        probe.set_word(CPUID, 0x410F_C241);

        let mut target = Target::new();
        assert!(super::probe(&mut probe, &mut target).unwrap());

        assert_eq!(target.idcode, id::STM32F40X);
        assert_eq!(target.driver, "STM32F4xx");
        assert!(target.ram_regions().iter().any(|ram| ram.start == 0x1000_0000));
    }

    #[test]
    fn f205_is_tagged_as_f2_class() {
        let target = probed(id::STM32F20X);

        assert_eq!(target.idcode, id::STM32F20X);
        assert_eq!(target.driver, "STM32F2xx");
        assert_eq!(target.command_sets()[0].label, "STM32F2");
        // No core-coupled RAM on the F2 line.
        assert!(target.ram_regions().iter().all(|ram| ram.start != 0x1000_0000));
    }

    #[test]
    fn every_variant_has_disjoint_regions() {
        for &idcode in ALL_IDCODES {
            let target = probed(idcode);
            let regions = target.flash_regions();
            assert!(!regions.is_empty());

            for (i, a) in regions.iter().enumerate() {
                assert_eq!(a.align, 4);
                assert_eq!(a.erased_byte, 0xFF);
                assert_eq!(a.driver, RegionDriver::Stm32F4);
                assert_eq!(a.parallelism, Parallelism::X8);
                for b in &regions[i + 1..] {
                    let disjoint = a.start + a.length <= b.start || b.start + b.length <= a.start;
                    assert!(
                        disjoint,
                        "idcode {idcode:#05x}: {:#010x?} overlaps {:#010x?}",
                        a.address_range(),
                        b.address_range(),
                    );
                }
            }
        }
    }

    #[test]
    fn flash_totals_match_the_datasheets() {
        let totals = [
            (id::STM32F40X, 0x10_0000),
            (id::STM32F42X, 0x20_0000),
            (id::STM32F413, 0x18_0000),
            (id::STM32F74X, 0x10_0000),
            (id::STM32F76X, 0x20_0000),
            (id::STM32F72X, 0x8_0000),
        ];

        for (idcode, expected) in totals {
            let target = probed(idcode);
            let total: u32 = target
                .flash_regions()
                .iter()
                .filter(|region| !region.is_alias)
                .map(|region| region.length)
                .sum();
            assert_eq!(total, expected, "idcode {idcode:#05x}");
        }
    }

    #[test]
    fn f74x_itcm_windows_mirror_the_axim_bank() {
        let target = probed(id::STM32F74X);

        for (axim, itcm) in [
            (0x0800_0000, 0x0020_0000),
            (0x0802_0000, 0x0022_0000),
            (0x0804_0000, 0x0024_0000),
        ] {
            let primary = flash_at(&target, axim);
            let alias = flash_at(&target, itcm);
            assert!(!primary.is_alias);
            assert!(alias.is_alias);
            assert_eq!(alias.length, primary.length);
            assert_eq!(alias.block_size, primary.block_size);
            assert_eq!(alias.base_sector, primary.base_sector);
        }

        assert!(target
            .ram_regions()
            .iter()
            .any(|ram| ram.start == 0 && ram.length == 0x4000));
    }
}
