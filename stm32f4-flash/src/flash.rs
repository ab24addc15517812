//! Sector erase, mass erase and the shared unlock and poll discipline.

use std::io::Write;

use crate::error::FlashError;
use crate::memory::FlashProbe;
use crate::registers::{self, Control, Status};
use crate::target::FlashRegion;

/// Drives the flash controller for one operation at a time.
///
/// Holds the probe for the duration of a call sequence. The caller
/// serializes all operations against a device; there is no locking here.
pub struct FlashController<'probe> {
    pub(crate) probe: &'probe mut dyn FlashProbe,
    poll_limit: Option<usize>,
}

impl<'probe> FlashController<'probe> {
    /// A controller spinning on the busy flag for as long as the hardware
    /// keeps it set.
    pub fn new(probe: &'probe mut dyn FlashProbe) -> Self {
        Self {
            probe,
            poll_limit: None,
        }
    }

    /// Bound every busy-poll loop to `polls` iterations.
    ///
    /// The hardware bounds each operation on a healthy link, so the default
    /// is an unbounded spin. A bound turns a hung busy flag into
    /// [`FlashError::BusyTimeout`] instead of spinning forever.
    pub fn with_poll_limit(mut self, polls: usize) -> Self {
        self.poll_limit = Some(polls);
        self
    }

    /// Enable write access to the control register if it is locked.
    fn unlock(&mut self) -> Result<(), FlashError> {
        if Control::read(&mut *self.probe)?.lock() {
            self.probe.write_word_32(registers::KEYR, registers::KEY1)?;
            self.probe.write_word_32(registers::KEYR, registers::KEY2)?;
        }
        Ok(())
    }

    /// Spin until the busy flag clears, running `tick` after every busy poll.
    ///
    /// A link failure aborts immediately; retrying is the caller's business.
    fn wait_while_busy_with(
        &mut self,
        mut tick: impl FnMut() -> Result<(), FlashError>,
    ) -> Result<Status, FlashError> {
        let mut polls = 0;
        loop {
            let status = Status::read(&mut *self.probe)?;
            if !status.bsy() {
                return Ok(status);
            }
            tick()?;
            polls += 1;
            if self.poll_limit.is_some_and(|limit| polls >= limit) {
                return Err(FlashError::BusyTimeout { polls });
            }
        }
    }

    pub(crate) fn wait_while_busy(&mut self) -> Result<Status, FlashError> {
        self.wait_while_busy_with(|| Ok(()))
    }

    /// Open the option-byte keyhole and wait for the controller to go idle.
    pub(crate) fn unlock_options(&mut self) -> Result<(), FlashError> {
        self.probe
            .write_word_32(registers::OPTKEYR, registers::OPTKEY1)?;
        self.probe
            .write_word_32(registers::OPTKEYR, registers::OPTKEY2)?;
        self.wait_while_busy()?;
        Ok(())
    }

    /// Erase `len` bytes of `region` starting at `addr`.
    ///
    /// `addr` must be block aligned and `len` a multiple of the region's
    /// block size: a trailing remainder smaller than one block is left
    /// unerased.
    pub fn erase(
        &mut self,
        region: &FlashRegion,
        addr: u32,
        mut len: u32,
    ) -> Result<(), FlashError> {
        // Erase selects by sector number, so alias addresses need no
        // translation here.
        let mut sector = region.sector_index(addr);

        tracing::debug!("erasing {len:#x} bytes at {addr:#010x}, starting with sector {sector}");

        self.unlock()?;

        while len != 0 {
            let mut cr = Control(0);
            cr.set_eopie(true);
            cr.set_errie(true);
            cr.set_ser(true);
            cr.set_snb(sector);
            cr.write(&mut *self.probe)?;
            cr.set_strt(true);
            cr.write(&mut *self.probe)?;

            self.wait_while_busy()?;

            if len < region.block_size {
                break;
            }
            len -= region.block_size;
            sector += 1;
        }

        // Error flags latch in the status register; check once more even
        // though busy cleared normally.
        let status = Status::read(&mut *self.probe)?;
        if status.any_error() {
            tracing::warn!("sector erase failed, FLASH_SR = {:#010x}", status.0);
            return Err(FlashError::Controller { status: status.0 });
        }
        Ok(())
    }

    /// Erase the entire flash array, reporting progress on `out`.
    ///
    /// Mass erase takes several seconds on large parts; a rotating glyph on
    /// the console shows the session is still alive.
    pub fn mass_erase(&mut self, out: &mut dyn Write) -> Result<(), FlashError> {
        const SPINNER: &[u8] = b"|/-\\";

        write!(out, "Erasing flash... This may take a few seconds.  ")?;
        self.unlock()?;

        let mut cr = Control(0);
        cr.set_mer(true);
        cr.write(&mut *self.probe)?;
        cr.set_strt(true);
        cr.write(&mut *self.probe)?;

        let mut spin = 0usize;
        let result = self.wait_while_busy_with(|| {
            let glyph = SPINNER[spin % SPINNER.len()] as char;
            spin += 1;
            write!(out, "\x08{glyph}")?;
            Ok(())
        });
        writeln!(out)?;
        result?;

        let status = Status::read(&mut *self.probe)?;
        if status.any_error() || !status.eop() {
            tracing::warn!("mass erase failed, FLASH_SR = {:#010x}", status.0);
            return Err(FlashError::Controller { status: status.0 });
        }
        Ok(())
    }
}
