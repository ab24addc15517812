//! Bulk programming through a RAM-resident write stub.

use static_assertions::const_assert;

use crate::error::FlashError;
use crate::memory::FlashProbe;
use crate::stubs;
use crate::target::{FlashRegion, Parallelism};

/// Scratch RAM used for remote execution, present on every supported part.
const SRAM_BASE: u32 = 0x2000_0000;
/// Payload staging area, directly behind the stub.
const STUB_BUFFER_BASE: u32 = SRAM_BASE + 0x40;

/// ITCM flash window of the F7 line.
const ITCM_BASE: u32 = 0x0020_0000;
/// Primary-bus flash window.
const AXIM_BASE: u32 = 0x0800_0000;

const_assert!(stubs::WRITE_X8.len() * 2 <= (STUB_BUFFER_BASE - SRAM_BASE) as usize);
const_assert!(stubs::WRITE_X32.len() * 2 <= (STUB_BUFFER_BASE - SRAM_BASE) as usize);

/// Map an ITCM alias address onto the primary-bus window.
///
/// Both windows expose the same physical cells; programming always goes
/// through the primary bus.
pub(crate) fn canonical_address(dest: u32) -> u32 {
    if (ITCM_BASE..AXIM_BASE).contains(&dest) {
        AXIM_BASE + (dest - ITCM_BASE)
    } else {
        dest
    }
}

/// Program `data` at `dest` with the stub matching the region's parallelism.
///
/// The caller keeps each call within the scratch buffer capacity and aligned
/// to the region; there is no chunking at this layer. Blocks until the stub
/// halts; a nonzero exit status is reported as [`FlashError::Stub`].
pub fn write(
    probe: &mut dyn FlashProbe,
    region: &FlashRegion,
    dest: u32,
    data: &[u8],
) -> Result<(), FlashError> {
    let dest = canonical_address(dest);

    let stub = match region.parallelism {
        Parallelism::X8 => stubs::WRITE_X8,
        Parallelism::X32 => stubs::WRITE_X32,
    };

    tracing::debug!(
        "writing {} bytes to {dest:#010x} ({})",
        data.len(),
        region.parallelism,
    );

    probe.write_8(SRAM_BASE, &halfwords_to_bytes(stub))?;
    probe.write_8(STUB_BUFFER_BASE, data)?;

    let status = probe.run_stub(SRAM_BASE, [dest, STUB_BUFFER_BASE, data.len() as u32, 0])?;
    if status != 0 {
        return Err(FlashError::Stub { status });
    }
    Ok(())
}

fn halfwords_to_bytes(halfwords: &[u16]) -> Vec<u8> {
    halfwords
        .iter()
        .flat_map(|halfword| halfword.to_le_bytes())
        .collect()
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::target::RegionDriver;
    use crate::test::FakeProbe;

    fn region(parallelism: Parallelism) -> FlashRegion {
        FlashRegion {
            start: 0x0800_0000,
            length: 0x1_0000,
            block_size: 0x4000,
            base_sector: 0,
            align: 4,
            erased_byte: 0xFF,
            is_alias: false,
            driver: RegionDriver::Stm32F4,
            parallelism,
        }
    }

    #[test]
    fn itcm_destinations_are_rebased_onto_the_primary_bus() {
        assert_eq!(canonical_address(0x0020_0000), 0x0800_0000);
        assert_eq!(canonical_address(0x0024_0000), 0x0804_0000);
        // Addresses already on the primary bus pass through unchanged.
        assert_eq!(canonical_address(0x0800_0000), 0x0800_0000);
        assert_eq!(canonical_address(0x0812_0000), 0x0812_0000);
    }

    #[test]
    fn write_uploads_stub_and_payload_then_runs_the_stub() {
        let mut probe = FakeProbe::new();
        let payload = [0xAA, 0xBB, 0xCC, 0xDD];

        write(&mut probe, &region(Parallelism::X8), 0x0801_0000, &payload).unwrap();

        assert_eq!(probe.bulk_writes.len(), 2);
        assert_eq!(probe.bulk_writes[0].0, SRAM_BASE);
        assert_eq!(
            probe.bulk_writes[0].1,
            halfwords_to_bytes(stubs::WRITE_X8)
        );
        assert_eq!(
            probe.bulk_writes[1],
            (STUB_BUFFER_BASE, payload.to_vec())
        );
        assert_eq!(
            probe.stub_runs,
            vec![(SRAM_BASE, [0x0801_0000, STUB_BUFFER_BASE, 4, 0])],
        );
    }

    #[test]
    fn write_selects_the_stub_by_parallelism() {
        let mut probe = FakeProbe::new();

        write(&mut probe, &region(Parallelism::X32), 0x0800_0000, &[0; 8]).unwrap();

        assert_eq!(
            probe.bulk_writes[0].1,
            halfwords_to_bytes(stubs::WRITE_X32)
        );
    }

    #[test]
    fn write_rebases_itcm_destinations_before_running() {
        let mut probe = FakeProbe::new();

        write(&mut probe, &region(Parallelism::X8), 0x0022_0000, &[0; 4]).unwrap();

        assert_eq!(probe.stub_runs[0].1[0], 0x0802_0000);
    }

    #[test]
    fn a_nonzero_stub_status_is_a_write_failure() {
        let mut probe = FakeProbe::new();
        probe.script_stub_result(Ok(0x10));

        let result = write(&mut probe, &region(Parallelism::X8), 0x0800_0000, &[0; 4]);

        assert!(matches!(result, Err(FlashError::Stub { status: 0x10 })));
    }
}
