//! Descriptor ring invariants over contiguous, fragmented and
//! scatter-gathered buffers.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]

use platform::mocks::FragmentedBuffer;
use platform::{BufferGeometry, ContiguousBuffer, DmaAddr, ScatterGatherBuffer, Segment};
use proptest::prelude::*;
use zx_i2s::bdl::{build, DescriptorTable, MAX_ENTRIES};
use zx_i2s::Error;

const BASE: DmaAddr = DmaAddr::new(0x4_0000_0000);

/// Checks every ring invariant for a successful build.
fn assert_ring(table: &DescriptorTable, buffer_bytes: u32, period_bytes: u32, ioc: bool) {
    assert!(table.len() <= MAX_ENTRIES);
    assert_eq!(table.periods() as u32, buffer_bytes / period_bytes);
    assert_eq!(table.buffer_bytes(), buffer_bytes);
    assert_eq!(
        table.entries().iter().map(|e| u64::from(e.len)).sum::<u64>(),
        u64::from(buffer_bytes)
    );
    for group in table.period_groups() {
        assert!(!group.is_empty());
        assert_eq!(group.iter().map(|e| e.len).sum::<u32>(), period_bytes);
        let (last, rest) = group.split_last().unwrap();
        assert_eq!(last.ioc, ioc);
        assert!(rest.iter().all(|e| !e.ioc));
    }
    assert_eq!(
        usize::from(table.last_valid_index().unwrap()) + 1,
        table.len()
    );
}

#[test]
fn scenario_64k_buffer_16k_periods() {
    let buf = ContiguousBuffer::new(BASE, 65_536);
    let table = build(&buf, 16_384, true).unwrap();
    assert_eq!(table.period_groups().count(), 4);
    assert_ring(&table, 65_536, 16_384, true);
}

#[test]
fn chunks_follow_the_geometry() {
    // Two physically separate halves; the middle period straddles the gap.
    let mut sg = ScatterGatherBuffer::<4>::new();
    sg.push(Segment::new(BASE, 6144)).unwrap();
    sg.push(Segment::new(DmaAddr::new(0x5_0000_0000), 6144)).unwrap();
    let table = build(&sg, 4096, true).unwrap();

    let lens: Vec<u32> = table.entries().iter().map(|e| e.len).collect();
    assert_eq!(lens, [4096, 2048, 2048, 4096]);
    assert_eq!(table.entries()[2].addr, DmaAddr::new(0x5_0000_0000));
    assert!(!table.entries()[1].ioc);
    assert!(table.entries()[2].ioc);
    assert_ring(&table, 12_288, 4096, true);
}

#[test]
fn fragment_limit_counts_descriptors_not_periods() {
    // 8 periods of 8 pages each = 64 descriptors: fine.
    let buf = FragmentedBuffer::new(BASE, 512, 32_768);
    assert_eq!(build(&buf, 4096, true).unwrap().len(), 64);

    // 2 periods of 160 pages each = 320 descriptors: too many.
    let buf = FragmentedBuffer::new(BASE, 128, 40_960);
    assert_eq!(
        build(&buf, 20_480, true).unwrap_err(),
        Error::TooManyFragments { buffer_bytes: 40_960, max: 256 }
    );
}

#[test]
fn failed_rebuild_discards_the_previous_ring() {
    let mut table = DescriptorTable::new();
    let good = ContiguousBuffer::new(BASE, 8192);
    table.build_into(&good, 8192, 4096, true).unwrap();
    assert_eq!(table.len(), 2);

    let bad = FragmentedBuffer::new(BASE, 16, 8192);
    assert!(table.build_into(&bad, 8192, 4096, true).is_err());
    assert!(table.is_empty());
    assert_eq!(table.period_groups().count(), 0);
}

/// A geometry that loses track of its memory half way through.
struct Truncated(usize);

impl BufferGeometry for Truncated {
    fn len(&self) -> usize {
        self.0 * 2
    }
    fn chunk(&self, offset: usize, max: usize) -> Option<Segment> {
        (offset < self.0).then(|| Segment::new(BASE, (self.0 - offset).min(max)))
    }
}

#[test]
fn geometry_holes_are_invalid_layouts() {
    assert!(matches!(
        build(&Truncated(4096), 4096, true),
        Err(Error::InvalidLayout { .. })
    ));
}

proptest! {
    /// Contiguous buffers: one descriptor per period, all invariants hold.
    #[test]
    fn contiguous_rings(period_kib in 1u32..=16, periods in 1u32..=16, ioc in any::<bool>()) {
        let period = period_kib * 1024;
        let buffer = period * periods;
        let buf = ContiguousBuffer::new(BASE, buffer as usize);
        let table = build(&buf, period, ioc).unwrap();
        prop_assert_eq!(table.len(), periods as usize);
        assert_ring(&table, buffer, period, ioc);
    }

    /// Fragmented buffers either satisfy every invariant or fail cleanly
    /// exactly when the descriptor count would pass the limit.
    #[test]
    fn fragmented_rings(
        page_shift in 6u32..=12,
        period_words in 16usize..=4096,
        periods in 1usize..=16,
    ) {
        let page = 1usize << page_shift;
        // Periods need not be page multiples, so a period may start or end
        // inside a page and split it across two descriptors.
        let period = period_words * 4;
        let buffer = period * periods;
        let buf = FragmentedBuffer::new(BASE, page, buffer);

        let needed: usize = (0..periods)
            .map(|k| ((k + 1) * period - 1) / page - (k * period) / page + 1)
            .sum();
        let mut table = DescriptorTable::new();
        let result = table.build_into(&buf, buffer as u32, period as u32, true);
        if needed > MAX_ENTRIES {
            prop_assert_eq!(
                result,
                Err(Error::TooManyFragments { buffer_bytes: buffer as u32, max: MAX_ENTRIES })
            );
            prop_assert!(table.is_empty());
        } else {
            prop_assert!(result.is_ok());
            prop_assert_eq!(table.len(), needed);
            assert_ring(&table, buffer as u32, period as u32, true);
        }
    }

    /// Layouts that are not a whole number of periods are always rejected.
    #[test]
    fn uneven_layouts_rejected(period in 1u32..=65_536, extra in 1u32..=1023) {
        let buffer = period * 2 + (extra % period.max(2)).max(1);
        prop_assume!(buffer % period != 0);
        let buf = ContiguousBuffer::new(BASE, buffer as usize);
        let result = build(&buf, period, true);
        let rejected = matches!(result, Err(Error::InvalidLayout { .. }));
        prop_assert!(rejected, "expected InvalidLayout, got {:?}", result);
    }
}
