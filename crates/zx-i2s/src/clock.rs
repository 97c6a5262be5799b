//! Clock/PLL resolver.
//!
//! The controller derives MCLK from one of two PLL sources and divides it down
//! to BCLK and LRCK. The divider settings depend on the word-clock class (the
//! I2S slot width) and the sample rate, and are taken from a fixed table
//! partitioned into three contiguous bands:
//!
//! | Band | Class  | Frame  | Entries |
//! |------|--------|--------|---------|
//! | 0    | 24-bit | 48-bit | 13      |
//! | 1    | 16-bit | 32-bit | 14      |
//! | 2    | 32-bit | 64-bit | 14      |
//!
//! Within a band the first entry whose rate matches wins.
//!
//! # Register placement
//!
//! - divider byte → DAC interface config bits 15:8 ([`DAC_IF_DIV`](crate::regs::DAC_IF_DIV))
//! - MDIV nibble → DAC interface config bits 19:16 ([`DAC_IF_CTL`](crate::regs::DAC_IF_CTL) low nibble)
//! - PLL source → common control bit 0 ([`COMSET_SEL_PLLEA`](crate::regs::COMSET_SEL_PLLEA))

use core::ops::Range;

use crate::error::{Error, Result};

/// I2S slot width used to select a divider band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WordClockClass {
    /// 16-bit slots (32-bit frame).
    Bits16,
    /// 24-bit slots (48-bit frame).
    Bits24,
    /// 32-bit slots (64-bit frame).
    Bits32,
}

impl WordClockClass {
    /// All classes in band order.
    pub const ALL: [Self; 3] = [Self::Bits24, Self::Bits16, Self::Bits32];

    /// Class for a slot width in bits.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            16 => Some(Self::Bits16),
            24 => Some(Self::Bits24),
            32 => Some(Self::Bits32),
            _ => None,
        }
    }

    /// Slot width in bits.
    pub const fn bits(self) -> u8 {
        match self {
            Self::Bits16 => 16,
            Self::Bits24 => 24,
            Self::Bits32 => 32,
        }
    }

    const fn band(self) -> Range<usize> {
        match self {
            Self::Bits24 => 0..13,
            Self::Bits16 => 13..27,
            Self::Bits32 => 27..41,
        }
    }
}

/// PLL feeding MCLK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PllSource {
    /// 33.868 MHz, for the 44.1 kHz family.
    Audio44k1,
    /// 36.864 MHz, for the 48 kHz family.
    Audio48k,
}

impl PllSource {
    /// Value of the PLL-source bit in common control.
    pub const fn bit(self) -> u8 {
        match self {
            Self::Audio44k1 => 0,
            Self::Audio48k => 1,
        }
    }
}

/// Resolved divider settings for one class and rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockProfile {
    /// Band the profile came from.
    pub class: WordClockClass,
    /// Sample rate in Hz.
    pub rate: u32,
    /// LRCK divider in bits 1:0, BCLK divider in bits 6:4.
    pub divider: u8,
    /// MCLK divider nibble.
    pub mdiv: u8,
    /// PLL source.
    pub pll: PllSource,
}

impl ClockProfile {
    /// LRCK divider field, bits 1:0 of the divider byte.
    pub const fn lrck_div(&self) -> u8 {
        self.divider & 0x03
    }

    /// BCLK divider field, bits 6:4 of the divider byte.
    pub const fn bclk_div(&self) -> u8 {
        self.divider.wrapping_shr(4) & 0x07
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    rate: u32,
    divider: u8,
    mdiv: u8,
    pll: PllSource,
}

const fn div(lrck: u8, bclk: u8) -> u8 {
    lrck | bclk.wrapping_shl(4)
}

const fn e48(rate: u32, divider: u8, mdiv: u8) -> Entry {
    Entry { rate, divider, mdiv, pll: PllSource::Audio48k }
}

const fn e44(rate: u32, divider: u8, mdiv: u8) -> Entry {
    Entry { rate, divider, mdiv, pll: PllSource::Audio44k1 }
}

#[rustfmt::skip]
static TABLE: [Entry; 41] = [
    // ── Band 0: 24-bit class ──
    e48(192_000, div(2, 0), 0x1),
    e48( 96_000, div(2, 2), 0x0),
    e48( 48_000, div(2, 1), 0x2),
    e48( 32_000, div(2, 5), 0x2),
    e48( 24_000, div(2, 2), 0x2),
    e48( 16_000, div(2, 2), 0xA),
    e48(  8_000, div(2, 2), 0xB),
    e48(  6_000, div(2, 2), 0x4),
    e44(176_400, div(2, 0), 0x1),
    e44( 88_200, div(2, 2), 0x0),
    e44( 44_100, div(2, 1), 0x2),
    e44( 22_050, div(2, 2), 0x2),
    e44( 11_025, div(2, 2), 0x3),
    // ── Band 1: 16-bit class ──
    e48(192_000, div(1, 4), 0x1),
    e48(144_000, div(1, 2), 0x0),
    e48( 96_000, div(1, 5), 0x1),
    e48( 48_000, 0x15,      0x2),
    e48( 32_000, div(1, 5), 0xA),
    e48( 24_000, div(1, 2), 0xA),
    e48( 16_000, div(1, 5), 0xB),
    e48(  8_000, div(1, 6), 0xB),
    e48(  6_000, div(1, 2), 0xC),
    e44(176_400, div(1, 4), 0x1),
    e44( 88_200, div(1, 5), 0x1),
    e44( 44_100, div(1, 5), 0x2),
    e44( 22_050, div(1, 2), 0xA),
    e44( 11_025, div(1, 2), 0xB),
    // ── Band 2: 32-bit class ──
    e48(192_000, div(0, 4), 0x0),
    e48(144_000, div(0, 0), 0x1),
    e48( 96_000, div(0, 4), 0x1),
    e48( 48_000, div(0, 5), 0x1),
    e48( 32_000, div(0, 5), 0x9),
    e48( 24_000, div(0, 5), 0x2),
    e48( 16_000, div(0, 5), 0xA),
    e48(  8_000, div(0, 5), 0xB),
    e48(  6_000, div(0, 2), 0xB),
    e44(176_400, div(0, 4), 0x0),
    e44( 88_200, div(0, 4), 0x1),
    e44( 44_100, div(0, 5), 0x1),
    e44( 22_050, div(0, 5), 0x2),
    e44( 11_025, div(0, 2), 0xA),
];

fn band(class: WordClockClass) -> &'static [Entry] {
    TABLE.get(class.band()).unwrap_or(&[])
}

/// Look up the divider settings for `class` at `rate`.
///
/// # Errors
///
/// [`Error::UnsupportedRate`] when the class's band has no entry for `rate`.
pub fn resolve(class: WordClockClass, rate: u32) -> Result<ClockProfile> {
    band(class)
        .iter()
        .find(|entry| entry.rate == rate)
        .map(|entry| ClockProfile {
            class,
            rate,
            divider: entry.divider,
            mdiv: entry.mdiv,
            pll: entry.pll,
        })
        .ok_or(Error::UnsupportedRate { class, rate })
}

/// Rates listed for `class`, in table order.
pub fn rates(class: WordClockClass) -> impl Iterator<Item = u32> {
    band(class).iter().map(|entry| entry.rate)
}
