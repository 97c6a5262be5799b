//! Format negotiation.
//!
//! Maps a client sample format, rate and channel count onto the controller's
//! slot width (word-clock class), FIFO container width and pad-bit count, and
//! resolves the clock dividers for the result.
//!
//! | sample width | word-clock class | packed bits |
//! |--------------|------------------|-------------|
//! | 8            | 16               | 8           |
//! | 16           | 16               | 16          |
//! | 20, 24       | 24               | 32          |
//! | 32           | 32               | 32          |

use crate::clock::{self, ClockProfile, WordClockClass};
use crate::config::HwCaps;
use crate::error::{Error, Result};
use crate::stream::Direction;

/// PCM sample formats the FIFO can unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleFormat {
    /// Signed 8-bit.
    S8,
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit little-endian.
    S16Le,
    /// Signed 16-bit big-endian.
    S16Be,
    /// Unsigned 16-bit little-endian.
    U16Le,
    /// Signed 20-bit in a 32-bit little-endian container.
    S20Le,
    /// Signed 24-bit in a 32-bit little-endian container.
    S24Le,
    /// Signed 32-bit little-endian.
    S32Le,
    /// Signed 32-bit big-endian.
    S32Be,
}

impl SampleFormat {
    /// Significant bits per sample.
    pub const fn width(self) -> u8 {
        match self {
            Self::S8 | Self::U8 => 8,
            Self::S16Le | Self::S16Be | Self::U16Le => 16,
            Self::S20Le => 20,
            Self::S24Le => 24,
            Self::S32Le | Self::S32Be => 32,
        }
    }

    /// Whether samples are two's complement.
    pub const fn is_signed(self) -> bool {
        !matches!(self, Self::U8 | Self::U16Le)
    }

    /// Whether samples are stored most significant byte first.
    pub const fn is_big_endian(self) -> bool {
        matches!(self, Self::S16Be | Self::S32Be)
    }
}

/// Slot class and container width for a sample width.
const fn packing(width: u8) -> Option<(WordClockClass, u8)> {
    match width {
        8 => Some((WordClockClass::Bits16, 8)),
        16 => Some((WordClockClass::Bits16, 16)),
        20 | 24 => Some((WordClockClass::Bits24, 32)),
        32 => Some((WordClockClass::Bits32, 32)),
        _ => None,
    }
}

/// FIFO and interface fields programmed by `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameLayout {
    /// Pad bits between the sample and the end of its slot.
    pub pad_bits: u8,
    /// FIFO pop-length code.
    pub pop_len: u8,
    /// Channel count (playback FIFO field).
    pub channels: u8,
    /// Set the FIFO sign-exchange bit.
    pub sign_exchange: bool,
    /// Set the FIFO endian-exchange bit.
    pub endian_exchange: bool,
}

impl FrameLayout {
    /// Layout used when a stream is started without a negotiated format:
    /// signed 16-bit little-endian stereo.
    pub const fn fallback(direction: Direction) -> Self {
        Self {
            pad_bits: 0,
            pop_len: pop_len(direction, 16),
            channels: 2,
            sign_exchange: true,
            endian_exchange: false,
        }
    }
}

/// Pop-length code for a container width.
///
/// Playback counts 16-bit units (8-bit → 0, 16-bit → 1, 32-bit → 2);
/// capture uses 2 for 16-bit and 0 for 32-bit containers.
const fn pop_len(direction: Direction, packed_bits: u8) -> u8 {
    match (direction, packed_bits) {
        (Direction::Playback, 16) => 1,
        (Direction::Playback, 32) => 2,
        (Direction::Capture, 16) => 2,
        _ => 0,
    }
}

/// Result of a successful negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NegotiatedFormat {
    /// Direction negotiated for.
    pub direction: Direction,
    /// Client sample format.
    pub format: SampleFormat,
    /// Channel count.
    pub channels: u8,
    /// I2S slot width.
    pub class: WordClockClass,
    /// FIFO container width in bits (8, 16 or 32).
    pub packed_bits: u8,
    /// Slot bits beyond the sample width.
    pub pad_bits: u8,
    /// Resolved dividers.
    pub clock: ClockProfile,
}

impl NegotiatedFormat {
    /// Sample rate in Hz.
    pub const fn rate(&self) -> u32 {
        self.clock.rate
    }

    /// Bytes per frame in the client buffer.
    pub fn frame_bytes(&self) -> u32 {
        u32::from(self.packed_bits / 8).saturating_mul(u32::from(self.channels))
    }

    /// FIFO and interface fields for `start()`.
    pub const fn layout(&self) -> FrameLayout {
        FrameLayout {
            pad_bits: self.pad_bits,
            pop_len: pop_len(self.direction, self.packed_bits),
            channels: self.channels,
            sign_exchange: self.format.is_signed(),
            endian_exchange: self.format.is_big_endian(),
        }
    }
}

/// Negotiate `format` at `rate` with `channels` channels for `direction`.
///
/// # Errors
///
/// - [`Error::UnsupportedFormat`] for a channel count outside the
///   direction's range, or a container width capture cannot carry
/// - [`Error::UnsupportedRate`] for a rate outside the direction's range or
///   absent from the clock table
pub fn negotiate(
    direction: Direction,
    format: SampleFormat,
    rate: u32,
    channels: u8,
) -> Result<NegotiatedFormat> {
    let caps = HwCaps::of(direction);
    if !caps.supports_channels(channels) {
        return Err(Error::UnsupportedFormat { direction });
    }

    let width = format.width();
    let (class, packed_bits) = packing(width).ok_or(Error::UnsupportedFormat { direction })?;
    if direction == Direction::Capture && !matches!(packed_bits, 16 | 32) {
        return Err(Error::UnsupportedFormat { direction });
    }
    if !caps.supports_rate(rate) {
        return Err(Error::UnsupportedRate { class, rate });
    }

    let clock = clock::resolve(class, rate)?;
    let pad_bits = class
        .bits()
        .checked_sub(width)
        .ok_or(Error::UnsupportedFormat { direction })?;

    Ok(NegotiatedFormat {
        direction,
        format,
        channels,
        class,
        packed_bits,
        pad_bits,
        clock,
    })
}
