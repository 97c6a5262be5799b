//! DMA addressing, buffer geometry and hardware-visible memory regions.
//!
//! Two kinds of memory cross the CPU/device boundary:
//!
//! | Kind | Owner | Written by | Trait |
//! |------|-------|------------|-------|
//! | Audio buffer | client | CPU (playback) / device (capture) | [`BufferGeometry`] |
//! | Descriptor table | engine | CPU, read by device | [`DmaRegion`] |
//! | Position buffer | engine | device, read by CPU | [`DmaRegion`] |
//!
//! The audio buffer is only ever described (physical address + length of
//! each contiguous run); the engine never touches its samples. Descriptor
//! tables and the position buffer are small coherent regions the engine
//! reads and writes with volatile little-endian word accesses.

use thiserror_no_std::Error;

/// Errors raised by DMA memory helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// A word access fell outside the region.
    #[error("access at offset {offset} is outside a {len}-byte region")]
    OutOfBounds {
        /// Byte offset of the access.
        offset: usize,
        /// Region length in bytes.
        len: usize,
    },
    /// A scatter-gather list ran out of segment slots.
    #[error("scatter-gather list is full")]
    TooManySegments,
    /// A segment had zero length or its end overflowed the address space.
    #[error("invalid segment")]
    InvalidSegment,
}

/// A device-visible (bus) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct DmaAddr(u64);

impl DmaAddr {
    /// Wrap a raw bus address.
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Raw 64-bit bus address.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Lower 32 bits, as programmed into a `*LBASE` register.
    #[allow(clippy::cast_possible_truncation)] // Intentional: low half of the address
    pub const fn lower(self) -> u32 {
        self.0 as u32
    }

    /// Upper 32 bits, as programmed into a `*UBASE` register.
    #[allow(clippy::cast_possible_truncation)] // Intentional: high half after shift
    pub const fn upper(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Address `bytes` past this one, or `None` on overflow.
    pub fn offset(self, bytes: usize) -> Option<Self> {
        let bytes = u64::try_from(bytes).ok()?;
        self.0.checked_add(bytes).map(Self)
    }
}

/// One physically contiguous run of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    /// Bus address of the first byte.
    pub addr: DmaAddr,
    /// Length in bytes.
    pub len: usize,
}

impl Segment {
    /// Create a segment.
    pub const fn new(addr: DmaAddr, len: usize) -> Self {
        Self { addr, len }
    }

    /// Bus address one past the last byte, or `None` on overflow.
    pub fn end(&self) -> Option<DmaAddr> {
        self.addr.offset(self.len)
    }
}

/// Physical layout of a client audio buffer.
///
/// Buffers may be physically fragmented (page lists from an IOMMU-less
/// allocator). The descriptor builder asks for the largest contiguous chunk
/// at a byte offset and emits one descriptor per chunk.
pub trait BufferGeometry {
    /// Total buffer length in bytes.
    fn len(&self) -> usize;

    /// Whether the buffer is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The largest physically contiguous run starting at byte `offset`,
    /// capped at `max` bytes.
    ///
    /// Returns `None` when `offset` is past the end of the buffer or `max`
    /// is zero.
    fn chunk(&self, offset: usize, max: usize) -> Option<Segment>;
}

impl<T: BufferGeometry + ?Sized> BufferGeometry for &T {
    fn len(&self) -> usize {
        (**self).len()
    }
    fn chunk(&self, offset: usize, max: usize) -> Option<Segment> {
        (**self).chunk(offset, max)
    }
}

/// A physically contiguous buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContiguousBuffer {
    base: DmaAddr,
    len: usize,
}

impl ContiguousBuffer {
    /// Describe `len` bytes starting at bus address `base`.
    pub const fn new(base: DmaAddr, len: usize) -> Self {
        Self { base, len }
    }

    /// Bus address of the first byte.
    pub const fn base(&self) -> DmaAddr {
        self.base
    }
}

impl BufferGeometry for ContiguousBuffer {
    fn len(&self) -> usize {
        self.len
    }

    fn chunk(&self, offset: usize, max: usize) -> Option<Segment> {
        let remaining = self.len.checked_sub(offset).filter(|r| *r > 0)?;
        let len = remaining.min(max);
        if len == 0 {
            return None;
        }
        Some(Segment::new(self.base.offset(offset)?, len))
    }
}

/// A scatter-gather buffer built from up to `N` segments.
///
/// Segments are laid out back to back in buffer-offset order. Segments that
/// happen to be physically adjacent are reported as a single chunk.
#[derive(Debug, Clone, Default)]
pub struct ScatterGatherBuffer<const N: usize> {
    segments: heapless::Vec<Segment, N>,
    len: usize,
}

impl<const N: usize> ScatterGatherBuffer<N> {
    /// Create an empty list.
    pub const fn new() -> Self {
        Self {
            segments: heapless::Vec::new(),
            len: 0,
        }
    }

    /// Append a segment at the current end of the buffer.
    pub fn push(&mut self, segment: Segment) -> Result<(), DmaError> {
        if segment.len == 0 || segment.end().is_none() {
            return Err(DmaError::InvalidSegment);
        }
        let len = self
            .len
            .checked_add(segment.len)
            .ok_or(DmaError::InvalidSegment)?;
        self.segments
            .push(segment)
            .map_err(|_| DmaError::TooManySegments)?;
        self.len = len;
        Ok(())
    }

    /// Segments in buffer order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl<const N: usize> BufferGeometry for ScatterGatherBuffer<N> {
    fn len(&self) -> usize {
        self.len
    }

    #[allow(clippy::arithmetic_side_effects)] // Safety: seg_start + seg.len <= self.len (checked in push); skip < seg.len
    fn chunk(&self, offset: usize, max: usize) -> Option<Segment> {
        if max == 0 || offset >= self.len {
            return None;
        }
        let mut seg_start = 0usize;
        let mut iter = self.segments.iter();
        // Find the segment containing `offset`.
        let (first, skip) = loop {
            let seg = iter.next()?;
            if offset < seg_start + seg.len {
                break (seg, offset - seg_start);
            }
            seg_start += seg.len;
        };
        let addr = first.addr.offset(skip)?;
        let mut len = first.len - skip;
        let mut end = first.end()?;
        // Merge physically adjacent successors.
        for seg in iter {
            if len >= max || seg.addr != end {
                break;
            }
            len += seg.len;
            end = seg.end()?;
        }
        Some(Segment::new(addr, len.min(max)))
    }
}

/// Hardware-visible memory accessed with little-endian 32-bit words.
pub trait DmaRegion {
    /// Bus address of the first byte, as programmed into the device.
    fn bus_addr(&self) -> DmaAddr;

    /// Region length in bytes.
    fn len(&self) -> usize;

    /// Whether the region is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Store a little-endian word at byte `offset`.
    fn write_u32(&mut self, offset: usize, value: u32) -> Result<(), DmaError>;

    /// Load a little-endian word from byte `offset`.
    fn read_u32(&self, offset: usize) -> Result<u32, DmaError>;

    /// Store a single byte at `offset`.
    fn write_u8(&mut self, offset: usize, value: u8) -> Result<(), DmaError>;

    /// Zero the whole region: whole words first, then any trailing bytes.
    fn clear(&mut self) -> Result<(), DmaError> {
        let len = self.len();
        let words = len & !3;
        for offset in (0..words).step_by(4) {
            self.write_u32(offset, 0)?;
        }
        for offset in words..len {
            self.write_u8(offset, 0)?;
        }
        Ok(())
    }
}

/// A fixed-size DMA region backed by an in-place array.
///
/// Place it in a statically mapped, non-cacheable section and pass the bus
/// address the platform assigns to that section. Aligned to 128 bytes, which
/// satisfies the descriptor-table base alignment.
#[repr(C, align(128))]
pub struct StaticDmaRegion<const N: usize> {
    data: [u8; N],
    bus: DmaAddr,
}

impl<const N: usize> core::fmt::Debug for StaticDmaRegion<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StaticDmaRegion")
            .field("bus", &self.bus)
            .field("len", &N)
            .finish_non_exhaustive()
    }
}

impl<const N: usize> StaticDmaRegion<N> {
    /// Create a zeroed region the device sees at `bus`.
    pub const fn new(bus: DmaAddr) -> Self {
        Self { data: [0; N], bus }
    }

    fn word_range(offset: usize) -> Result<core::ops::Range<usize>, DmaError> {
        let end = offset
            .checked_add(4)
            .filter(|end| *end <= N)
            .ok_or(DmaError::OutOfBounds { offset, len: N })?;
        Ok(offset..end)
    }
}

impl<const N: usize> DmaRegion for StaticDmaRegion<N> {
    fn bus_addr(&self) -> DmaAddr {
        self.bus
    }

    fn len(&self) -> usize {
        N
    }

    fn write_u32(&mut self, offset: usize, value: u32) -> Result<(), DmaError> {
        let range = Self::word_range(offset)?;
        let bytes = value.to_le_bytes();
        for (slot, byte) in self
            .data
            .get_mut(range)
            .ok_or(DmaError::OutOfBounds { offset, len: N })?
            .iter_mut()
            .zip(bytes)
        {
            // SAFETY: `slot` is a valid, exclusive reference into `data`.
            // Volatile keeps the store from being elided; the device reads
            // this memory behind the compiler's back.
            unsafe { core::ptr::write_volatile(slot, byte) };
        }
        Ok(())
    }

    fn write_u8(&mut self, offset: usize, value: u8) -> Result<(), DmaError> {
        let slot = self
            .data
            .get_mut(offset)
            .ok_or(DmaError::OutOfBounds { offset, len: N })?;
        // SAFETY: `slot` is a valid, exclusive reference into `data`.
        unsafe { core::ptr::write_volatile(slot, value) };
        Ok(())
    }

    fn read_u32(&self, offset: usize) -> Result<u32, DmaError> {
        let range = Self::word_range(offset)?;
        let mut bytes = [0u8; 4];
        for (out, slot) in bytes.iter_mut().zip(
            self.data
                .get(range)
                .ok_or(DmaError::OutOfBounds { offset, len: N })?,
        ) {
            // SAFETY: `slot` is a valid reference into `data`. Volatile
            // because the device updates this memory asynchronously.
            *out = unsafe { core::ptr::read_volatile(slot) };
        }
        Ok(u32::from_le_bytes(bytes))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn addr_halves() {
        let addr = DmaAddr::new(0x0000_0001_8000_1000);
        assert_eq!(addr.lower(), 0x8000_1000);
        assert_eq!(addr.upper(), 0x1);
    }

    #[test]
    fn addr_offset_overflow_is_none() {
        assert_eq!(DmaAddr::new(u64::MAX).offset(1), None);
    }

    #[test]
    fn contiguous_chunk_is_capped() {
        let buf = ContiguousBuffer::new(DmaAddr::new(0x1000), 4096);
        let seg = buf.chunk(1024, 100).unwrap();
        assert_eq!(seg, Segment::new(DmaAddr::new(0x1400), 100));
        assert_eq!(buf.chunk(4000, 4096).unwrap().len, 96);
        assert_eq!(buf.chunk(4096, 1), None);
        assert_eq!(buf.chunk(0, 0), None);
    }

    #[test]
    fn sg_chunk_stops_at_discontinuity() {
        let mut sg = ScatterGatherBuffer::<4>::new();
        sg.push(Segment::new(DmaAddr::new(0x10_000), 0x1000)).unwrap();
        sg.push(Segment::new(DmaAddr::new(0x30_000), 0x1000)).unwrap();
        let seg = sg.chunk(0x800, usize::MAX).unwrap();
        assert_eq!(seg, Segment::new(DmaAddr::new(0x10_800), 0x800));
        let seg = sg.chunk(0x1000, usize::MAX).unwrap();
        assert_eq!(seg, Segment::new(DmaAddr::new(0x30_000), 0x1000));
    }

    #[test]
    fn sg_chunk_merges_adjacent_segments() {
        let mut sg = ScatterGatherBuffer::<4>::new();
        sg.push(Segment::new(DmaAddr::new(0x10_000), 0x1000)).unwrap();
        sg.push(Segment::new(DmaAddr::new(0x11_000), 0x1000)).unwrap();
        sg.push(Segment::new(DmaAddr::new(0x40_000), 0x1000)).unwrap();
        assert_eq!(sg.chunk(0, usize::MAX).unwrap().len, 0x2000);
        assert_eq!(sg.chunk(0, 0x1800).unwrap().len, 0x1800);
    }

    #[test]
    fn sg_rejects_overflowing_list() {
        let mut sg = ScatterGatherBuffer::<1>::new();
        sg.push(Segment::new(DmaAddr::new(0), 16)).unwrap();
        assert_eq!(
            sg.push(Segment::new(DmaAddr::new(64), 16)),
            Err(DmaError::TooManySegments)
        );
        assert_eq!(sg.len(), 16);
    }

    #[test]
    fn sg_rejects_empty_segment() {
        let mut sg = ScatterGatherBuffer::<2>::new();
        assert_eq!(
            sg.push(Segment::new(DmaAddr::new(0), 0)),
            Err(DmaError::InvalidSegment)
        );
    }

    #[test]
    fn region_words_are_little_endian() {
        let mut region = StaticDmaRegion::<16>::new(DmaAddr::new(0x2000));
        region.write_u32(4, 0xAABB_CCDD).unwrap();
        assert_eq!(region.read_u32(4).unwrap(), 0xAABB_CCDD);
        assert_eq!(region.read_u32(0).unwrap(), 0);
        assert_eq!(
            region.write_u32(13, 1),
            Err(DmaError::OutOfBounds { offset: 13, len: 16 })
        );
    }

    #[test]
    fn region_clear_zeroes_everything() {
        let mut region = StaticDmaRegion::<8>::new(DmaAddr::new(0));
        region.write_u32(0, u32::MAX).unwrap();
        region.write_u32(4, u32::MAX).unwrap();
        region.clear().unwrap();
        assert_eq!(region.read_u32(0).unwrap(), 0);
        assert_eq!(region.read_u32(4).unwrap(), 0);
    }

    #[test]
    fn region_clear_reaches_the_tail() {
        let mut region = StaticDmaRegion::<6>::new(DmaAddr::new(0));
        region.write_u32(0, u32::MAX).unwrap();
        region.write_u8(4, 0xAA).unwrap();
        region.write_u8(5, 0xBB).unwrap();
        region.clear().unwrap();
        assert_eq!(region.data, [0; 6]);
    }

    #[test]
    fn region_byte_store_is_bounded() {
        let mut region = StaticDmaRegion::<6>::new(DmaAddr::new(0));
        region.write_u8(5, 1).unwrap();
        assert_eq!(
            region.write_u8(6, 1),
            Err(DmaError::OutOfBounds { offset: 6, len: 6 })
        );
    }

    #[test]
    fn region_is_128_byte_aligned() {
        assert_eq!(core::mem::align_of::<StaticDmaRegion<16>>(), 128);
    }
}
