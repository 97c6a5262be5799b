//! Mock implementations for testing
//!
//! This module provides host-side stand-ins for the controller so the engine
//! can be exercised without hardware:
//!
//! - [`MockRegisters`]: a byte-addressed register file that records every
//!   write, with optional write-1-to-clear status registers
//! - [`SharedRegisters`]: a clonable handle to one [`MockRegisters`], so a
//!   test can keep inspecting registers it has handed to a device
//! - [`MockRegion`]: a clonable, heap-backed [`DmaRegion`] the test can write
//!   into the way the controller would
//! - [`FragmentedBuffer`]: a buffer whose pages are never physically adjacent

#![cfg(any(test, feature = "std"))]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

use crate::dma::{BufferGeometry, DmaAddr, DmaError, DmaRegion, Segment};
use crate::mmio::RegisterIo;

/// Width of a recorded register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// 8-bit access.
    Byte,
    /// 16-bit access.
    Half,
    /// 32-bit access.
    Word,
}

impl Width {
    fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
        }
    }
}

/// One recorded register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegWrite {
    /// Byte offset written.
    pub offset: u16,
    /// Access width.
    pub width: Width,
    /// Value written (zero-extended).
    pub value: u32,
}

/// Register file of `SIZE` bytes with a write trace.
///
/// Byte offsets registered with [`with_w1c`](Self::with_w1c) behave like
/// hardware status registers: writing a 1 bit clears it, writing 0 leaves it.
/// [`raise`](Self::raise) sets status bits the way the device would.
#[derive(Debug, Clone)]
pub struct MockRegisters<const SIZE: usize = 512> {
    mem: [u8; SIZE],
    w1c: Vec<u16>,
    trace: Vec<RegWrite>,
}

impl<const SIZE: usize> Default for MockRegisters<SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SIZE: usize> MockRegisters<SIZE> {
    /// Create a zeroed register file.
    pub fn new() -> Self {
        Self {
            mem: [0; SIZE],
            w1c: Vec::new(),
            trace: Vec::new(),
        }
    }

    /// Mark byte `offsets` as write-1-to-clear.
    #[must_use]
    pub fn with_w1c(mut self, offsets: &[u16]) -> Self {
        self.w1c.extend_from_slice(offsets);
        self
    }

    /// Set bits in a register without recording a write (device-side update).
    pub fn raise(&mut self, offset: u16, bits: u8) {
        if let Some(byte) = self.mem.get_mut(usize::from(offset)) {
            *byte |= bits;
        }
    }

    /// Current value of a byte register, without recording anything.
    pub fn peek8(&self, offset: u16) -> u8 {
        self.mem.get(usize::from(offset)).copied().unwrap_or(0)
    }

    /// Current value of a 32-bit register, without recording anything.
    pub fn peek32(&self, offset: u16) -> u32 {
        let mut bytes = [0u8; 4];
        for (i, out) in bytes.iter_mut().enumerate() {
            *out = self.peek8(offset.wrapping_add(i as u16));
        }
        u32::from_le_bytes(bytes)
    }

    /// Overwrite a byte register without recording a write.
    pub fn poke8(&mut self, offset: u16, value: u8) {
        if let Some(byte) = self.mem.get_mut(usize::from(offset)) {
            *byte = value;
        }
    }

    /// All writes recorded so far, oldest first.
    pub fn trace(&self) -> &[RegWrite] {
        &self.trace
    }

    /// Writes recorded to one offset, oldest first.
    pub fn writes_to(&self, offset: u16) -> impl Iterator<Item = &RegWrite> + '_ {
        self.trace.iter().filter(move |w| w.offset == offset)
    }

    /// Forget recorded writes; register contents are kept.
    pub fn clear_trace(&mut self) {
        self.trace.clear();
    }

    /// Take the recorded writes, leaving the trace empty.
    pub fn take_trace(&mut self) -> Vec<RegWrite> {
        core::mem::take(&mut self.trace)
    }

    fn load(&self, offset: u16, width: Width) -> u32 {
        let mut bytes = [0u8; 4];
        for (i, out) in bytes.iter_mut().take(width.bytes()).enumerate() {
            *out = self.peek8(offset.wrapping_add(i as u16));
        }
        u32::from_le_bytes(bytes)
    }

    fn store(&mut self, offset: u16, width: Width, value: u32) {
        self.trace.push(RegWrite {
            offset,
            width,
            value,
        });
        for (i, byte) in value.to_le_bytes().iter().take(width.bytes()).enumerate() {
            let at = offset.wrapping_add(i as u16);
            let w1c = self.w1c.contains(&at);
            if let Some(slot) = self.mem.get_mut(usize::from(at)) {
                if w1c {
                    *slot &= !*byte;
                } else {
                    *slot = *byte;
                }
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)] // load() zero-extends from the access width
impl<const SIZE: usize> RegisterIo for MockRegisters<SIZE> {
    fn read8(&mut self, offset: u16) -> u8 {
        self.load(offset, Width::Byte) as u8
    }
    fn read16(&mut self, offset: u16) -> u16 {
        self.load(offset, Width::Half) as u16
    }
    fn read32(&mut self, offset: u16) -> u32 {
        self.load(offset, Width::Word)
    }
    fn write8(&mut self, offset: u16, value: u8) {
        self.store(offset, Width::Byte, u32::from(value));
    }
    fn write16(&mut self, offset: u16, value: u16) {
        self.store(offset, Width::Half, u32::from(value));
    }
    fn write32(&mut self, offset: u16, value: u32) {
        self.store(offset, Width::Word, value);
    }
}

/// Clonable handle to a shared [`MockRegisters`].
///
/// Every clone sees the same register file and trace.
#[derive(Debug, Clone, Default)]
pub struct SharedRegisters<const SIZE: usize = 512>(Arc<Mutex<MockRegisters<SIZE>>>);

impl<const SIZE: usize> SharedRegisters<SIZE> {
    /// Share `regs`.
    pub fn new(regs: MockRegisters<SIZE>) -> Self {
        Self(Arc::new(Mutex::new(regs)))
    }

    /// Lock the register file for inspection or device-side updates.
    pub fn lock(&self) -> MutexGuard<'_, MockRegisters<SIZE>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<const SIZE: usize> RegisterIo for SharedRegisters<SIZE> {
    fn read8(&mut self, offset: u16) -> u8 {
        self.lock().read8(offset)
    }
    fn read16(&mut self, offset: u16) -> u16 {
        self.lock().read16(offset)
    }
    fn read32(&mut self, offset: u16) -> u32 {
        self.lock().read32(offset)
    }
    fn write8(&mut self, offset: u16, value: u8) {
        self.lock().write8(offset, value);
    }
    fn write16(&mut self, offset: u16, value: u16) {
        self.lock().write16(offset, value);
    }
    fn write32(&mut self, offset: u16, value: u32) {
        self.lock().write32(offset, value);
    }
}

/// Heap-backed DMA region; clones share the same bytes.
#[derive(Debug, Clone)]
pub struct MockRegion {
    bus: DmaAddr,
    data: Arc<Mutex<Vec<u8>>>,
}

impl MockRegion {
    /// A zeroed region of `len` bytes the device sees at `bus`.
    pub fn new(bus: DmaAddr, len: usize) -> Self {
        Self {
            bus,
            data: Arc::new(Mutex::new(std::vec![0; len])),
        }
    }

    fn bytes(&self) -> MutexGuard<'_, Vec<u8>> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DmaRegion for MockRegion {
    fn bus_addr(&self) -> DmaAddr {
        self.bus
    }

    fn len(&self) -> usize {
        self.bytes().len()
    }

    fn write_u32(&mut self, offset: usize, value: u32) -> Result<(), DmaError> {
        let mut bytes = self.bytes();
        let len = bytes.len();
        let word = offset
            .checked_add(4)
            .and_then(|end| bytes.get_mut(offset..end))
            .ok_or(DmaError::OutOfBounds { offset, len })?;
        word.copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_u8(&mut self, offset: usize, value: u8) -> Result<(), DmaError> {
        let mut bytes = self.bytes();
        let len = bytes.len();
        let slot = bytes
            .get_mut(offset)
            .ok_or(DmaError::OutOfBounds { offset, len })?;
        *slot = value;
        Ok(())
    }

    fn read_u32(&self, offset: usize) -> Result<u32, DmaError> {
        let bytes = self.bytes();
        let mut word = [0u8; 4];
        let src = offset
            .checked_add(4)
            .and_then(|end| bytes.get(offset..end))
            .ok_or(DmaError::OutOfBounds { offset, len: bytes.len() })?;
        word.copy_from_slice(src);
        Ok(u32::from_le_bytes(word))
    }
}

/// A buffer of fixed-size pages, none of which are physically adjacent.
///
/// Page `n` lives at `base + n * stride`; with `stride > page` every page is
/// its own descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentedBuffer {
    base: DmaAddr,
    page: usize,
    stride: usize,
    len: usize,
}

impl FragmentedBuffer {
    /// `len` bytes split into `page`-byte pages spaced `2 * page` apart.
    pub fn new(base: DmaAddr, page: usize, len: usize) -> Self {
        Self {
            base,
            page,
            stride: page.saturating_mul(2),
            len,
        }
    }
}

impl BufferGeometry for FragmentedBuffer {
    fn len(&self) -> usize {
        self.len
    }

    #[allow(clippy::arithmetic_side_effects)] // page > 0 checked; offset < len
    fn chunk(&self, offset: usize, max: usize) -> Option<Segment> {
        if self.page == 0 || max == 0 || offset >= self.len {
            return None;
        }
        let index = offset / self.page;
        let within = offset % self.page;
        let addr = self
            .base
            .offset(index.checked_mul(self.stride)?)?
            .offset(within)?;
        let len = (self.page - within).min(self.len - offset).min(max);
        Some(Segment::new(addr, len))
    }
}
