//! Error taxonomy.
//!
//! [`Error`] is returned synchronously from negotiation and prepare and is
//! never retried internally. [`HardwareError`] is discovered by the
//! interrupt dispatcher, reported through
//! [`EventSink::on_stream_error`](crate::EventSink::on_stream_error) and
//! latched on the stream until the next successful prepare.

use platform::DmaError;
use thiserror_no_std::Error;

use crate::clock::WordClockClass;
use crate::stream::Direction;

/// Synchronous engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// No divider entry exists for this word-clock class and rate, or the
    /// rate is outside the direction's range.
    #[error("no clock divider for {rate} Hz in the {class:?} band")]
    UnsupportedRate {
        /// Word-clock class that was searched.
        class: WordClockClass,
        /// Requested sample rate in Hz.
        rate: u32,
    },
    /// The sample format or channel count cannot be carried by this direction.
    #[error("format not supported for {direction:?}")]
    UnsupportedFormat {
        /// Direction the format was requested for.
        direction: Direction,
    },
    /// Buffer and period sizes do not describe a valid ring.
    #[error("invalid layout: buffer {buffer_bytes} bytes, period {period_bytes} bytes")]
    InvalidLayout {
        /// Requested buffer size in bytes.
        buffer_bytes: u32,
        /// Requested period size in bytes.
        period_bytes: u32,
    },
    /// The buffer's physical layout needs more descriptors than the ring holds.
    #[error("buffer of {buffer_bytes} bytes needs more than {max} descriptors")]
    TooManyFragments {
        /// Requested buffer size in bytes.
        buffer_bytes: u32,
        /// Ring capacity.
        max: usize,
    },
    /// The descriptor-table region cannot hold the built ring.
    #[error("descriptor region of {len} bytes cannot hold {needed} bytes")]
    DescriptorRegionTooSmall {
        /// Region length in bytes.
        len: usize,
        /// Bytes the table needs.
        needed: usize,
    },
    /// A DMA region access failed.
    #[error("DMA region access failed")]
    Dma(#[from] DmaError),
}

/// Faults reported by the controller in a stream status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HardwareError {
    /// Descriptor fetch or bus error; the DMA engine aborted.
    #[error("DMA abort")]
    Abort,
    /// Capture FIFO overflowed before DMA drained it.
    #[error("capture overrun")]
    Overrun,
    /// Playback FIFO ran dry before DMA refilled it.
    #[error("playback underrun")]
    Underrun,
}

impl HardwareError {
    /// The XRUN flavour a direction reports: playback underruns, capture overruns.
    pub const fn xrun(direction: Direction) -> Self {
        match direction {
            Direction::Playback => Self::Underrun,
            Direction::Capture => Self::Overrun,
        }
    }
}

/// Engine result alias.
pub type Result<T> = core::result::Result<T, Error>;
