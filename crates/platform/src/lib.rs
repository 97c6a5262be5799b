//! Hardware abstraction layer for the `zx-i2s` audio engine
//!
//! This crate provides the trait seams between the engine and the machine it
//! runs on, so the register protocol can be developed and tested without the
//! controller present.
//!
//! # Architecture Layers
//!
//! ```text
//! Client / framework glue (PCM session, PCI binding)
//!         ↓
//! zx-i2s engine (clock, descriptor ring, streams, interrupt dispatch)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! MMIO window + DMA-coherent memory
//! ```
//!
//! # Abstractions
//!
//! - [`RegisterIo`] - byte/half-word/word register access at fixed offsets
//! - [`BufferGeometry`] - physical layout of a client audio buffer
//! - [`DmaRegion`] - hardware-visible memory written by the CPU (descriptor
//!   tables) or by the device (position buffer)
//!
//! # Features
//!
//! - `std`: host-side [`mocks`] (register file with write trace)
//! - `defmt`: `defmt::Format` derives on all public types
//!
//! # Example
//!
//! ```
//! use platform::{BufferGeometry, ContiguousBuffer, DmaAddr};
//!
//! let buf = ContiguousBuffer::new(DmaAddr::new(0x8000_0000), 4096);
//! let chunk = buf.chunk(1024, 8192).unwrap();
//! assert_eq!(chunk.len, 3072);
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors; callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod dma;
pub mod mmio;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

pub use dma::{
    BufferGeometry, ContiguousBuffer, DmaAddr, DmaError, DmaRegion, ScatterGatherBuffer,
    Segment, StaticDmaRegion,
};
pub use mmio::{MmioError, MmioRegisters, RegisterIo};
