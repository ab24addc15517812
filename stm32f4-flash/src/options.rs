//! Option byte handling: reserved-bit masks, factory defaults, and the
//! sequencing around FLASH_OPTCR.
//!
//! Option contents are never cached. A mass erase or a failed programming
//! run can change the stored words behind our back, so every report re-reads
//! the hardware and masks the raw words before they reach the user.

use crate::catalog::id;
use crate::error::{FlashError, ProbeError};
use crate::flash::FlashController;
use crate::memory::MemoryInterface;
use crate::registers::OptionControl;

/// Option words a variant can expose: OPTCR, OPTCR1, OPTCR2.
pub const MAX_OPTION_WORDS: usize = 3;

/// Option-byte source addresses in system memory.
const F4_OPT_BASE: u32 = 0x1FFF_C000;
const F7_OPT_BASE: u32 = 0x1FFF_0000;

/// Number of option words a variant exposes.
pub fn word_count(idcode: u16) -> usize {
    match idcode {
        id::STM32F72X => 3,
        id::STM32F42X | id::STM32F46X | id::STM32F74X | id::STM32F76X => 2,
        _ => 1,
    }
}

/// Force every reserved bit of `values` to its required state.
///
/// Applied identically on the report and the write path, so reserved bits
/// can never be driven to a state the hardware forbids. Returns `false` for
/// devices whose layout is unknown; nothing may be written in that case.
///
/// Masks follow the reference manuals, cross-checked against known-good
/// parts; documented defaults that proved wrong (F412, F413 and F76x OPTCR)
/// are not trusted here.
pub fn mask(idcode: u16, values: &mut [u32; MAX_OPTION_WORDS]) -> bool {
    match idcode {
        id::STM32F20X | id::STM32F40X => values[0] &= !0xF000_0010,
        id::STM32F42X | id::STM32F46X => {
            values[0] &= !0x3000_0000;
            values[1] &= 0x0FFF_0000;
        }
        id::STM32F401C => values[0] &= !0x7FC0_0010,
        id::STM32F446 | id::STM32F411 | id::STM32F401E => values[0] &= !0x7F00_0010,
        id::STM32F410 => values[0] &= !0x7FE0_0010,
        id::STM32F412 => values[0] &= !0x7000_0010,
        id::STM32F413 => values[0] &= !0x0000_0010,
        id::STM32F72X => {
            values[2] &= !0x8000_00FF;
            values[0] &= !0x3F00_0000;
        }
        id::STM32F74X => values[0] &= !0x3F00_0000,
        id::STM32F76X => {}
        _ => return false,
    }
    true
}

/// Factory default option words and their count for a variant.
pub fn defaults(idcode: u16) -> ([u32; MAX_OPTION_WORDS], usize) {
    match idcode {
        id::STM32F42X | id::STM32F46X => ([0x0FFF_AAED, 0x0FFF_0000, 0], 2),
        id::STM32F72X => ([0xC0FF_AAFD, 0x0040_0080, 0], 3),
        id::STM32F74X => ([0xC0FF_AAFD, 0x0040_0080, 0], 2),
        id::STM32F76X => ([0xFFFF_AAFD, 0x0040_0080, 0], 2),
        id::STM32F413 => ([0x7FFF_AAED, 0, 0], 1),
        _ => ([0x0FFF_AAED, 0, 0], 1),
    }
}

/// Program `count` option words.
///
/// Auxiliary words go out before OPTCR: committing OPTCR with the start bit
/// is what triggers the programming operation, so everything else has to be
/// in place by then. The keyhole is re-locked afterwards.
pub fn write(
    ctl: &mut FlashController<'_>,
    idcode: u16,
    values: &[u32; MAX_OPTION_WORDS],
    count: usize,
) -> Result<(), FlashError> {
    tracing::debug!("writing {count} option word(s) on {idcode:#05x}");

    ctl.unlock_options()?;

    let has_optcr1 = matches!(
        idcode,
        id::STM32F42X | id::STM32F46X | id::STM32F72X | id::STM32F74X | id::STM32F76X
    );
    if has_optcr1 && count > 1 {
        ctl.probe
            .write_word_32(OptionControl::ADDRESS + 4, values[1])?;
    }
    if idcode == id::STM32F72X && count > 2 {
        ctl.probe
            .write_word_32(OptionControl::ADDRESS + 8, values[2])?;
    }

    let mut optcr = OptionControl(values[0]);
    optcr.write(&mut *ctl.probe)?;
    optcr.set_optstrt(true);
    optcr.write(&mut *ctl.probe)?;

    ctl.wait_while_busy()?;

    let mut lock = OptionControl(0);
    lock.set_optlock(true);
    lock.write(&mut *ctl.probe)?;
    Ok(())
}

/// Rewrite the option bytes with the variant's factory defaults.
pub fn write_defaults(ctl: &mut FlashController<'_>, idcode: u16) -> Result<(), FlashError> {
    let (values, count) = defaults(idcode);
    write(ctl, idcode, &values, count)
}

/// Read the option words back from system memory, masked for display.
pub fn read(
    probe: &mut (impl MemoryInterface + ?Sized),
    idcode: u16,
) -> Result<([u32; MAX_OPTION_WORDS], usize), ProbeError> {
    let count = word_count(idcode);
    let base = match idcode {
        id::STM32F72X | id::STM32F74X | id::STM32F76X => F7_OPT_BASE,
        _ => F4_OPT_BASE,
    };

    // Each reported word is split over two 16 bit halves in system memory,
    // upper half first.
    let mut values = [0u32; MAX_OPTION_WORDS];
    values[0] = (probe.read_word_32(base + 8)? & 0xFFFF) << 16;
    values[0] |= probe.read_word_32(base)? & 0xFFFF;
    if count > 1 {
        if base == F4_OPT_BASE {
            // OPTCR1 of the 2 MiB F4 parts lives in the previous 64 KiB
            // block and carries a single half.
            values[1] = probe.read_word_32(base + 8 - 0x1_0000)? & 0xFFFF;
        } else {
            values[1] = (probe.read_word_32(base + 0x18)? & 0xFFFF) << 16;
            values[1] |= probe.read_word_32(base + 0x10)? & 0xFFFF;
        }
    }
    if count > 2 {
        values[2] = (probe.read_word_32(base + 0x28)? & 0xFFFF) << 16;
        values[2] |= probe.read_word_32(base + 0x20)? & 0xFFFF;
    }

    mask(idcode, &mut values);
    Ok((values, count))
}
