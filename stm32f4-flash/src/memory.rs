//! Interfaces this backend consumes from the debug session.

use crate::error::ProbeError;

/// Word-granular and bulk access to target memory.
///
/// Implemented by the debug transport. Every access reports link failures as
/// [`ProbeError`]; the backend treats any failure as fatal for the operation
/// in progress and never retries.
pub trait MemoryInterface {
    /// Read a 32 bit word at `address`.
    ///
    /// The address has to be a multiple of 4.
    fn read_word_32(&mut self, address: u32) -> Result<u32, ProbeError>;

    /// Write a 32 bit word to `address`.
    ///
    /// The address has to be a multiple of 4.
    fn write_word_32(&mut self, address: u32, data: u32) -> Result<(), ProbeError>;

    /// Write a block of 8 bit words to `address`.
    fn write_8(&mut self, address: u32, data: &[u8]) -> Result<(), ProbeError>;
}

/// Remote execution of a routine previously uploaded into target RAM.
pub trait StubExecutor {
    /// Run the routine at `entry` with the four argument registers loaded
    /// from `args`, blocking until it halts, and return its exit status.
    fn run_stub(&mut self, entry: u32, args: [u32; 4]) -> Result<u32, ProbeError>;
}

/// The combined probe interface the backend operates on.
pub trait FlashProbe: MemoryInterface + StubExecutor {}

impl<T: MemoryInterface + StubExecutor> FlashProbe for T {}
