//! Buffer descriptor list (BDL) builder.
//!
//! The DMA engine walks a ring of up to 256 descriptors, each naming one
//! physically contiguous chunk of the client buffer. A period may span
//! several descriptors when the buffer is scatter-gathered; only the last
//! descriptor of a period requests an interrupt, so the client is notified
//! once per period regardless of fragmentation.
//!
//! # Hardware layout
//!
//! ```text
//! offset  word
//! 0x0     address[31:0]
//! 0x4     address[63:32]
//! 0x8     length in bytes
//! 0xC     flags (bit 0 = IOC)
//! ```
//!
//! The table is built into a fixed-capacity [`heapless::Vec`] that lives in
//! the stream and is overwritten on every prepare.

use heapless::Vec;
use platform::{BufferGeometry, DmaAddr, DmaRegion};

use crate::error::{Error, Result};

/// Descriptors the ring can hold.
pub const MAX_ENTRIES: usize = 256;
/// Bytes per descriptor in hardware memory.
pub const ENTRY_BYTES: usize = 16;
/// Bytes a full descriptor table occupies.
pub const TABLE_BYTES: usize = MAX_ENTRIES * ENTRY_BYTES;

/// IOC flag in the descriptor's fourth word.
const FLAG_IOC: u32 = 1 << 0;

/// One descriptor: a physically contiguous chunk of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BdlEntry {
    /// Bus address of the chunk.
    pub addr: DmaAddr,
    /// Chunk length in bytes.
    pub len: u32,
    /// Raise an interrupt when the DMA finishes this chunk.
    pub ioc: bool,
}

impl BdlEntry {
    /// The four little-endian words the controller fetches.
    pub const fn to_words(&self) -> [u32; 4] {
        let flags = if self.ioc { FLAG_IOC } else { 0 };
        [self.addr.lower(), self.addr.upper(), self.len, flags]
    }
}

/// A descriptor ring over one client buffer.
#[derive(Debug, Clone, Default)]
pub struct DescriptorTable {
    entries: Vec<BdlEntry, MAX_ENTRIES>,
    /// Index one past the last entry of each period.
    period_ends: Vec<u16, MAX_ENTRIES>,
    buffer_bytes: u32,
    period_bytes: u32,
}

impl DescriptorTable {
    /// An empty table.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            period_ends: Vec::new(),
            buffer_bytes: 0,
            period_bytes: 0,
        }
    }

    /// Rebuild the ring for the first `buffer_bytes` of `geometry`.
    ///
    /// Walks the buffer in `period_bytes` strides. Each stride becomes one or
    /// more descriptors, one per contiguous chunk the geometry reports, and
    /// the last descriptor of a stride carries IOC when `ioc` is set.
    ///
    /// On error the table is left empty.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLayout`] for a zero period or buffer, a buffer that
    ///   is not a whole number of periods or is larger than `geometry`, or a
    ///   geometry that reports no chunk inside its extent
    /// - [`Error::TooManyFragments`] when more than [`MAX_ENTRIES`]
    ///   descriptors would be needed
    pub fn build_into<G: BufferGeometry + ?Sized>(
        &mut self,
        geometry: &G,
        buffer_bytes: u32,
        period_bytes: u32,
        ioc: bool,
    ) -> Result<()> {
        self.clear();
        let result = self.fill(geometry, buffer_bytes, period_bytes, ioc);
        if result.is_err() {
            self.clear();
        }
        result
    }

    fn fill<G: BufferGeometry + ?Sized>(
        &mut self,
        geometry: &G,
        buffer_bytes: u32,
        period_bytes: u32,
        ioc: bool,
    ) -> Result<()> {
        let invalid = Error::InvalidLayout { buffer_bytes, period_bytes };
        let too_many = Error::TooManyFragments { buffer_bytes, max: MAX_ENTRIES };

        let periods = buffer_bytes.checked_div(period_bytes).ok_or(invalid)?;
        if periods == 0 || buffer_bytes.checked_rem(period_bytes) != Some(0) {
            return Err(invalid);
        }
        let buffer_len = usize::try_from(buffer_bytes).map_err(|_| invalid)?;
        if buffer_len > geometry.len() {
            return Err(invalid);
        }
        let period_len = usize::try_from(period_bytes).map_err(|_| invalid)?;

        let mut offset = 0usize;
        for _ in 0..periods {
            let mut remaining = period_len;
            while remaining > 0 {
                let chunk = geometry
                    .chunk(offset, remaining)
                    .filter(|seg| seg.len > 0)
                    .ok_or(invalid)?;
                let take = chunk.len.min(remaining);
                remaining = remaining.saturating_sub(take);
                let entry = BdlEntry {
                    addr: chunk.addr,
                    len: u32::try_from(take).map_err(|_| invalid)?,
                    ioc: ioc && remaining == 0,
                };
                self.entries.push(entry).map_err(|_| too_many)?;
                offset = offset.checked_add(take).ok_or(invalid)?;
            }
            let end = u16::try_from(self.entries.len()).map_err(|_| too_many)?;
            self.period_ends.push(end).map_err(|_| too_many)?;
        }

        self.buffer_bytes = buffer_bytes;
        self.period_bytes = period_bytes;
        Ok(())
    }

    /// Drop every descriptor.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.period_ends.clear();
        self.buffer_bytes = 0;
        self.period_bytes = 0;
    }

    /// Descriptors in ring order.
    pub fn entries(&self) -> &[BdlEntry] {
        &self.entries
    }

    /// Number of descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no descriptors.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of periods in the ring.
    pub fn periods(&self) -> usize {
        self.period_ends.len()
    }

    /// Buffer size the table was built for.
    pub const fn buffer_bytes(&self) -> u32 {
        self.buffer_bytes
    }

    /// Period size the table was built for.
    pub const fn period_bytes(&self) -> u32 {
        self.period_bytes
    }

    /// Value for the last-valid-index register, `len - 1`.
    pub fn last_valid_index(&self) -> Option<u8> {
        self.entries
            .len()
            .checked_sub(1)
            .and_then(|last| u8::try_from(last).ok())
    }

    /// Descriptor groups, one slice per period.
    pub fn period_groups(&self) -> impl Iterator<Item = &[BdlEntry]> + '_ {
        let starts = core::iter::once(0).chain(self.period_ends.iter().copied());
        starts
            .zip(self.period_ends.iter().copied())
            .filter_map(|(start, end)| self.entries.get(usize::from(start)..usize::from(end)))
    }

    /// Serialise the ring into hardware memory, starting at offset 0.
    ///
    /// # Errors
    ///
    /// [`Error::DescriptorRegionTooSmall`] when `region` cannot hold every
    /// descriptor; [`Error::Dma`] if a word write fails.
    pub fn write_to<R: DmaRegion + ?Sized>(&self, region: &mut R) -> Result<()> {
        let needed = self.entries.len().saturating_mul(ENTRY_BYTES);
        if region.len() < needed {
            return Err(Error::DescriptorRegionTooSmall {
                len: region.len(),
                needed,
            });
        }
        for (entry, base) in self.entries.iter().zip((0..).step_by(ENTRY_BYTES)) {
            for (word, at) in entry.to_words().into_iter().zip((base..).step_by(4)) {
                region.write_u32(at, word)?;
            }
        }
        Ok(())
    }
}

/// Build a ring over the whole of `geometry`.
///
/// # Errors
///
/// As [`DescriptorTable::build_into`]; a geometry longer than `u32::MAX`
/// bytes is an [`Error::InvalidLayout`].
pub fn build<G: BufferGeometry + ?Sized>(
    geometry: &G,
    period_bytes: u32,
    interrupt_every_period: bool,
) -> Result<DescriptorTable> {
    let buffer_bytes = u32::try_from(geometry.len())
        .map_err(|_| Error::InvalidLayout { buffer_bytes: u32::MAX, period_bytes })?;
    let mut table = DescriptorTable::new();
    table.build_into(geometry, buffer_bytes, period_bytes, interrupt_every_period)?;
    Ok(table)
}
