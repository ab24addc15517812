//! The flash program and erase controller (FPEC) register block.
//!
//! Layout per "PM0081: STM32F40xxx and STM32F41xxx Flash programming manual";
//! the F2 and F7 lines keep the same block at the same base address.

use bitfield::bitfield;

use crate::error::ProbeError;
use crate::memory::MemoryInterface;

/// Base address of the FPEC register block.
const FPEC: u32 = 0x4002_3C00;

/// Flash key register, gates write access to [`Control`].
pub const KEYR: u32 = FPEC + 0x04;
/// Option key register, gates write access to [`OptionControl`].
pub const OPTKEYR: u32 = FPEC + 0x08;

pub const KEY1: u32 = 0x4567_0123;
pub const KEY2: u32 = 0xCDEF_89AB;
pub const OPTKEY1: u32 = 0x0819_2A3B;
pub const OPTKEY2: u32 = 0x4C5D_6E7F;

bitfield! {
    /// The flash control register (FLASH_CR).
    pub struct Control(u32);
    impl Debug;

    pub pg, set_pg: 0;
    pub ser, set_ser: 1;
    pub mer, set_mer: 2;
    pub u8, snb, set_snb: 7, 3;
    pub u8, psize, set_psize: 9, 8;
    pub strt, set_strt: 16;
    pub eopie, set_eopie: 24;
    pub errie, set_errie: 25;
    pub lock, set_lock: 31;
}

impl Control {
    pub(crate) const ADDRESS: u32 = FPEC + 0x10;

    /// Read the control register from the target.
    pub fn read(probe: &mut (impl MemoryInterface + ?Sized)) -> Result<Self, ProbeError> {
        Ok(Self(probe.read_word_32(Self::ADDRESS)?))
    }

    /// Write the control register to the target.
    pub fn write(&self, probe: &mut (impl MemoryInterface + ?Sized)) -> Result<(), ProbeError> {
        probe.write_word_32(Self::ADDRESS, self.0)
    }
}

bitfield! {
    /// The flash status register (FLASH_SR).
    pub struct Status(u32);
    impl Debug;

    pub eop, _: 0;
    pub operr, _: 1;
    pub wrperr, _: 4;
    pub pgaerr, _: 5;
    pub pgperr, _: 6;
    pub pgserr, _: 7;
    pub bsy, _: 16;
}

impl Status {
    pub(crate) const ADDRESS: u32 = FPEC + 0x0C;

    /// Every error flag: OPERR, WRPERR, PGAERR, PGPERR and PGSERR.
    pub const ERROR_MASK: u32 = 0xF2;

    /// Read the status register from the target.
    pub fn read(probe: &mut (impl MemoryInterface + ?Sized)) -> Result<Self, ProbeError> {
        Ok(Self(probe.read_word_32(Self::ADDRESS)?))
    }

    /// True if any error flag is latched.
    pub fn any_error(&self) -> bool {
        self.0 & Self::ERROR_MASK != 0
    }
}

bitfield! {
    /// The option control register (FLASH_OPTCR).
    ///
    /// The 2 MiB F4 parts and the F7 line add OPTCR1/OPTCR2 directly behind
    /// it; those carry plain data words and are written raw.
    pub struct OptionControl(u32);
    impl Debug;

    pub optlock, set_optlock: 0;
    pub optstrt, set_optstrt: 1;
}

impl OptionControl {
    pub(crate) const ADDRESS: u32 = FPEC + 0x14;

    /// Write the option control register to the target.
    pub fn write(&self, probe: &mut (impl MemoryInterface + ?Sized)) -> Result<(), ProbeError> {
        probe.write_word_32(Self::ADDRESS, self.0)
    }
}
