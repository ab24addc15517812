use thiserror::Error;

/// Errors reported by the debug link itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The probe stopped responding or a wire transaction failed.
    #[error("communication with the debug probe failed")]
    Connection,
    /// The target refused the memory access.
    #[error("target memory access at {address:#010x} faulted")]
    MemoryFault {
        /// Address of the faulted access.
        address: u32,
    },
}

/// Errors produced by the flash backend.
#[derive(Debug, Error)]
pub enum FlashError {
    /// The debug link failed mid-sequence.
    ///
    /// The operation is aborted immediately and never retried at this layer;
    /// flash or option state may be left partially modified.
    #[error("debug link failure during a flash operation")]
    Probe(#[from] ProbeError),
    /// The controller latched error flags even though busy cleared normally.
    #[error("flash controller reported errors, FLASH_SR = {status:#010x}")]
    Controller {
        /// Raw FLASH_SR contents at the time of the check.
        status: u32,
    },
    /// The RAM-resident write stub exited with a nonzero status.
    #[error("flash write stub exited with status {status:#x}")]
    Stub {
        /// The stub's exit status (its view of the FLASH_SR error flags).
        status: u32,
    },
    /// A configured poll bound elapsed while the busy flag was still set.
    #[error("flash controller still busy after {polls} polls")]
    BusyTimeout {
        /// Number of status polls performed before giving up.
        polls: usize,
    },
    /// The session console went away.
    #[error("could not write to the session console")]
    Console(#[from] std::io::Error),
}
