//! Interrupt-driven DMA streaming engine for the Zhaoxin I2S controller
//!
//! The engine sits between a PCM client and the controller's register
//! window. It negotiates formats into clock-divider settings, builds the
//! descriptor ring the DMA walks over the client buffer, sequences the
//! start/stop register protocol per direction and services the shared
//! interrupt line.
//!
//! # Architecture
//!
//! ```text
//! Client (PCM session)
//!     │ negotiate / prepare_stream / start / stop      ▲ on_period_elapsed
//!     ▼                                                │ on_stream_error
//! Device ── lock ──┬── Stream (Playback) ── DescriptorTable
//!                  ├── Stream (Capture)  ── DescriptorTable
//!                  └── RegisterIo + position buffer
//!     ▲
//!     │ handle_interrupt()
//! Interrupt line
//! ```
//!
//! - [`clock`]: banded divider table lookup
//! - [`format`]: sample format → slot class, container width, pad bits
//! - [`bdl`]: descriptor ring builder
//! - [`stream`]: per-direction register protocol
//! - [`device`]: device context, locking and interrupt dispatch
//!
//! Nothing in the engine allocates. Descriptor tables and the position
//! buffer are supplied once at attach and overwritten on every prepare.
//!
//! # Features
//!
//! - `defmt`: log through `defmt` and derive `defmt::Format` on public types
//! - `tracing`: log through `tracing` (host builds)
//! - `std`: host-side mocks from `platform`
//!
//! # Example
//!
//! ```
//! use platform::mocks::{MockRegion, MockRegisters};
//! use platform::{ContiguousBuffer, DmaAddr};
//! use zx_i2s::{Device, Direction, EngineConfig, Resources, SampleFormat, StreamState};
//!
//! let resources = Resources {
//!     registers: MockRegisters::<512>::new(),
//!     playback_bdl: MockRegion::new(DmaAddr::new(0x1000_0000), zx_i2s::bdl::TABLE_BYTES),
//!     capture_bdl: MockRegion::new(DmaAddr::new(0x1000_1000), zx_i2s::bdl::TABLE_BYTES),
//!     position: MockRegion::new(DmaAddr::new(0x1000_2000), 16),
//! };
//! let device = Device::new(resources, EngineConfig::new(), ()).unwrap();
//!
//! device.negotiate(Direction::Playback, SampleFormat::S16Le, 48_000, 2).unwrap();
//! let buffer = ContiguousBuffer::new(DmaAddr::new(0x2000_0000), 65_536);
//! device.prepare_stream(Direction::Playback, &buffer, 65_536, 16_384).unwrap();
//! device.start(Direction::Playback);
//! assert_eq!(device.state(Direction::Playback), StreamState::Running);
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub(crate) mod logging;

pub mod bdl;
pub mod clock;
pub mod config;
pub mod device;
pub mod error;
pub mod format;
pub mod irq;
pub mod regs;
pub mod stream;

pub use bdl::{BdlEntry, DescriptorTable};
pub use clock::{resolve, ClockProfile, PllSource, WordClockClass};
pub use config::{ClockRole, EngineConfig, HwCaps};
pub use device::{Device, Resources};
pub use error::{Error, HardwareError, Result};
pub use format::{negotiate, FrameLayout, NegotiatedFormat, SampleFormat};
pub use irq::{ClientHandle, EventSink, IrqReturn, IrqStatus};
pub use stream::{Direction, PerDirection, Stream, StreamState};
