//! Memory-mapped register access.
//!
//! The controller exposes one 512-byte register window (PCI BAR 0). Registers
//! are addressed by byte offset and accessed at their natural width; several
//! 32-bit registers are also written one byte lane at a time so that a field
//! can be updated without disturbing a neighbouring field that hardware owns.

use core::ptr::NonNull;

use thiserror_no_std::Error;

/// Register access at fixed byte offsets inside the controller window.
///
/// Reads take `&mut self` so that test doubles can record them; real MMIO
/// does not care.
pub trait RegisterIo {
    /// Read an 8-bit register.
    fn read8(&mut self, offset: u16) -> u8;
    /// Read a 16-bit register.
    fn read16(&mut self, offset: u16) -> u16;
    /// Read a 32-bit register.
    fn read32(&mut self, offset: u16) -> u32;
    /// Write an 8-bit register.
    fn write8(&mut self, offset: u16, value: u8);
    /// Write a 16-bit register.
    fn write16(&mut self, offset: u16, value: u16);
    /// Write a 32-bit register.
    fn write32(&mut self, offset: u16, value: u32);

    /// Read-modify-write an 8-bit register: clear `clear`, then set `set`.
    ///
    /// Always performs exactly one read and one write, even when the value
    /// does not change, so write traces stay deterministic.
    fn modify8(&mut self, offset: u16, clear: u8, set: u8) {
        let value = self.read8(offset);
        self.write8(offset, (value & !clear) | set);
    }

    /// Read-modify-write a 32-bit register: clear `clear`, then set `set`.
    fn modify32(&mut self, offset: u16, clear: u32, set: u32) {
        let value = self.read32(offset);
        self.write32(offset, (value & !clear) | set);
    }
}

impl<T: RegisterIo + ?Sized> RegisterIo for &mut T {
    fn read8(&mut self, offset: u16) -> u8 {
        (**self).read8(offset)
    }
    fn read16(&mut self, offset: u16) -> u16 {
        (**self).read16(offset)
    }
    fn read32(&mut self, offset: u16) -> u32 {
        (**self).read32(offset)
    }
    fn write8(&mut self, offset: u16, value: u8) {
        (**self).write8(offset, value);
    }
    fn write16(&mut self, offset: u16, value: u16) {
        (**self).write16(offset, value);
    }
    fn write32(&mut self, offset: u16, value: u32) {
        (**self).write32(offset, value);
    }
}

/// Errors raised while mapping the register window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MmioError {
    /// The mapped window is smaller than the register block requires.
    #[error("register window of {len} bytes is smaller than the required {required}")]
    WindowTooSmall {
        /// Length that was mapped.
        len: usize,
        /// Length the register block needs.
        required: usize,
    },
}

/// Volatile accessor over a mapped register window.
///
/// Accesses outside the window read as zero and writes are dropped; offsets
/// are compile-time constants in the engine, so this only guards against a
/// window that was mapped short.
pub struct MmioRegisters {
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: the window is device memory, not Rust-owned data. Moving the handle
// to another context (e.g. into the interrupt-shared device state) does not
// create aliasing beyond what the caller of `new` already accepted.
unsafe impl Send for MmioRegisters {}

impl MmioRegisters {
    /// Wrap a mapped register window of `len` bytes starting at `base`.
    ///
    /// `required` is the highest byte the caller will touch (exclusive).
    ///
    /// # Safety
    ///
    /// `base..base + len` must be a live, uncached device mapping for as long
    /// as the returned value exists, and no other code may access it
    /// concurrently except through this value.
    pub unsafe fn new(base: NonNull<u8>, len: usize, required: usize) -> Result<Self, MmioError> {
        if len < required {
            return Err(MmioError::WindowTooSmall { len, required });
        }
        Ok(Self { base, len })
    }

    /// Length of the mapped window in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapped window is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn ptr<T>(&self, offset: u16) -> Option<*mut T> {
        let start = usize::from(offset);
        let end = start.checked_add(core::mem::size_of::<T>())?;
        if end > self.len {
            return None;
        }
        // SAFETY: start + size_of::<T>() <= len, so the pointer stays inside
        // the mapping established in `new`.
        Some(unsafe { self.base.as_ptr().add(start) }.cast::<T>())
    }

    fn read<T: Default>(&self, offset: u16) -> T {
        match self.ptr::<T>(offset) {
            // SAFETY: in-bounds per `ptr`; register offsets are naturally
            // aligned for their width.
            Some(p) => unsafe { p.read_volatile() },
            None => T::default(),
        }
    }

    fn write<T>(&self, offset: u16, value: T) {
        if let Some(p) = self.ptr::<T>(offset) {
            // SAFETY: in-bounds per `ptr`; register offsets are naturally
            // aligned for their width.
            unsafe { p.write_volatile(value) }
        }
    }
}

impl RegisterIo for MmioRegisters {
    fn read8(&mut self, offset: u16) -> u8 {
        self.read(offset)
    }
    fn read16(&mut self, offset: u16) -> u16 {
        u16::from_le(self.read(offset))
    }
    fn read32(&mut self, offset: u16) -> u32 {
        u32::from_le(self.read(offset))
    }
    fn write8(&mut self, offset: u16, value: u8) {
        self.write(offset, value);
    }
    fn write16(&mut self, offset: u16, value: u16) {
        self.write(offset, value.to_le());
    }
    fn write32(&mut self, offset: u16, value: u32) {
        self.write(offset, value.to_le());
    }
}
