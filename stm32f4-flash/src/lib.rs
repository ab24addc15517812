//! # STM32F2/F4/F7 flash support for SWD debug probes
//!
//! The device-specific backend a debug session plugs in for STM32F2, F4 and
//! F7 parts: it identifies the silicon from its identification code,
//! describes the part's flash banks and RAMs on the device record, erases by
//! sector, programs through a RAM-resident write stub, and manages the
//! non-volatile option bytes.
//!
//! The debug transport stays outside: anything that can read and write
//! target memory and run an uploaded routine ([`FlashProbe`]) drives this
//! backend.
//!
//! ```no_run
//! use stm32f4_flash::{probe, FlashController, FlashError, FlashProbe, Target};
//!
//! fn erase_first_sector(link: &mut dyn FlashProbe) -> Result<(), FlashError> {
//!     let mut target = Target::new();
//!     if !probe(link, &mut target)? {
//!         // Not an STM32F2/F4/F7; let another backend have a look.
//!         return Ok(());
//!     }
//!
//!     let region = target.flash_regions()[0].clone();
//!     FlashController::new(link).erase(&region, region.start, region.block_size)?;
//!     stm32f4_flash::write(link, &region, region.start, &[0xAA; 256])?;
//!     Ok(())
//! }
//! ```

mod catalog;
mod commands;
mod error;
mod flash;
mod memory;
pub mod options;
pub mod registers;
mod stub;
mod stubs;
mod target;

pub use crate::catalog::{id, probe};
pub use crate::commands::{Command, CommandHandler, CommandSet, Session};
pub use crate::error::{FlashError, ProbeError};
pub use crate::flash::FlashController;
pub use crate::memory::{FlashProbe, MemoryInterface, StubExecutor};
pub use crate::stub::write;
pub use crate::target::{FlashRegion, Parallelism, RamRegion, RegionDriver, Target};
