//! Zhaoxin I2S controller register map.
//!
//! All offsets are byte offsets into the controller's MMIO window. Fields
//! that the engine updates independently live in their own byte lane, and
//! those lanes are addressed directly (e.g. [`DAC_IF_DIV`] for the divider
//! byte of the DAC interface-config word).

use crate::stream::Direction;

/// Minimum MMIO window the engine touches.
pub const WINDOW_LEN: usize = 0x120;

// ── Common control (0x00) ───────────────────────────────────────────────────

/// Common control register.
pub const COMSET: u16 = 0x00;
/// Stop playback DMA at the stop-buffer index.
pub const COMSET_STOP_DAC_BUF: u8 = 1 << 5;
/// Stop capture DMA at the stop-buffer index.
pub const COMSET_STOP_ADC_BUF: u8 = 1 << 4;
/// Keep MCLK running while both directions are idle.
pub const COMSET_MCLK_ALWAYS: u8 = 1 << 3;
/// Raise an interrupt on slave-mode WS loss.
pub const COMSET_EN_SLV_WS_INT: u8 = 1 << 2;
/// Controller is clock slave (BCLK/WS driven by the codec).
pub const COMSET_SLV_MODE: u8 = 1 << 1;
/// PLL source select: 0 = 33.868 MHz (44.1 kHz family), 1 = 36.864 MHz (48 kHz family).
pub const COMSET_SEL_PLLEA: u8 = 1 << 0;

// ── Module reset (0x02) ─────────────────────────────────────────────────────

/// Module reset register. A set bit holds the module in reset.
pub const MODRST: u16 = 0x02;
/// Capture module reset.
pub const MODRST_ADC: u8 = 1 << 1;
/// Playback module reset.
pub const MODRST_DAC: u8 = 1 << 0;

// ── Interrupt control (0x08) ────────────────────────────────────────────────

/// Global interrupt control register.
pub const INTCTRL: u16 = 0x08;
/// Playback interrupts reach the line.
pub const INTCTRL_OUT: u8 = 1 << 1;
/// Capture interrupts reach the line.
pub const INTCTRL_IN: u8 = 1 << 0;

// ── DMA position buffer (0x10/0x14) ─────────────────────────────────────────

/// Position buffer base, lower 32 bits.
pub const DPLBASE: u16 = 0x10;
/// Position buffer base, upper 32 bits.
pub const DPUBASE: u16 = 0x14;
/// Position buffer write-back enable, in [`DPLBASE`].
pub const DPLBASE_EN: u32 = 1 << 0;

/// Position buffer size in bytes.
pub const POSITION_BUFFER_LEN: usize = 16;

// ── DAC interface config (0x40..0x43) ───────────────────────────────────────

/// DAC interface config, byte 0: pad bits 4:0.
pub const DAC_IF_PAD: u16 = 0x40;
/// DAC interface config, byte 1: LRCK divider 1:0, BCLK divider 6:4.
pub const DAC_IF_DIV: u16 = 0x41;
/// DAC interface config, byte 2: MDIV 3:0, left-high 4, edge 5, start 6.
pub const DAC_IF_CTL: u16 = 0x42;
/// Pad-bit field mask in [`DAC_IF_PAD`].
pub const DAC_IF_PAD_MASK: u8 = 0x1F;
/// MDIV field mask in [`DAC_IF_CTL`].
pub const DAC_IF_MDIV_MASK: u8 = 0x0F;
/// Left channel while WS is high.
pub const DAC_IF_LEFT_HIGH: u8 = 1 << 4;
/// Drive data on the BCLK falling edge.
pub const DAC_IF_EDGE: u8 = 1 << 5;
/// Playback start enable.
pub const DAC_IF_START: u8 = 1 << 6;

// ── DAC FIFO config (0x50) ──────────────────────────────────────────────────

/// DAC FIFO config register.
pub const DACFIFOCFG: u16 = 0x50;
/// Byte-swap samples on the way out.
pub const DACFIFO_ENDIAN: u8 = 1 << 7;
/// Flip the sample sign bit on the way out.
pub const DACFIFO_SIGN: u8 = 1 << 6;
/// Pop length field, bits 5:4.
pub const DACFIFO_POP_MASK: u8 = 0x3 << 4;
/// Channel count field, bits 1:0.
pub const DACFIFO_CHN_MASK: u8 = 0x3;
/// Pop length shift.
pub const DACFIFO_POP_SHIFT: u8 = 4;

// ── ADC interface config (0x80) ─────────────────────────────────────────────

/// ADC interface config register.
pub const ADCIFCFG: u16 = 0x80;
/// Sample on the BCLK falling edge.
pub const ADCIF_NEG_EDGE: u8 = 1 << 7;
/// Left channel while WS is low.
pub const ADCIF_LEFT_LOW: u8 = 1 << 6;
/// Pad-bit field mask.
pub const ADCIF_PAD_MASK: u8 = 0x1F;

// ── ADC FIFO config (0x8C) ──────────────────────────────────────────────────

/// ADC FIFO config register.
pub const ADCFIFOCFG: u16 = 0x8C;
/// Capture start enable.
pub const ADCFIFO_START: u8 = 1 << 2;
/// Pop length field, bits 1:0.
pub const ADCFIFO_POP_MASK: u8 = 0x3;

// ── Stream descriptor blocks (0x100 capture, 0x110 playback) ────────────────

/// DMA abort (descriptor fetch or bus error).
pub const SD_ABORT: u8 = 1 << 2;
/// FIFO overrun (capture) or underrun (playback).
pub const SD_XRUN: u8 = 1 << 1;
/// Interrupt on completion of a descriptor with IOC set.
pub const SD_IOC: u8 = 1 << 0;
/// Every stream status bit.
pub const SD_ALL: u8 = SD_ABORT | SD_XRUN | SD_IOC;

/// Registers and bits that differ between the two directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRegs {
    /// Stream interrupt enable.
    pub int_enable: u16,
    /// Stream interrupt status (write 1 to clear).
    pub int_status: u16,
    /// Last valid descriptor index.
    pub lvi: u16,
    /// Descriptor index the DMA halts after when stop-on-buffer is on.
    pub stop_buf: u16,
    /// Descriptor table base, lower 32 bits.
    pub bdl_lower: u16,
    /// Descriptor table base, upper 32 bits.
    pub bdl_upper: u16,
    /// Direction's bit in [`MODRST`].
    pub reset_bit: u8,
    /// Direction's bit in [`INTCTRL`].
    pub intctrl_bit: u8,
    /// Direction's stop-on-buffer bit in [`COMSET`].
    pub stop_buf_bit: u8,
    /// Byte offset of the direction's slot in the position buffer.
    pub position_slot: usize,
}

const PLAYBACK: StreamRegs = StreamRegs {
    int_enable: 0x110,
    int_status: 0x111,
    lvi: 0x112,
    stop_buf: 0x113,
    bdl_lower: 0x118,
    bdl_upper: 0x11C,
    reset_bit: MODRST_DAC,
    intctrl_bit: INTCTRL_OUT,
    stop_buf_bit: COMSET_STOP_DAC_BUF,
    position_slot: 0,
};

const CAPTURE: StreamRegs = StreamRegs {
    int_enable: 0x100,
    int_status: 0x101,
    lvi: 0x102,
    stop_buf: 0x103,
    bdl_lower: 0x108,
    bdl_upper: 0x10C,
    reset_bit: MODRST_ADC,
    intctrl_bit: INTCTRL_IN,
    stop_buf_bit: COMSET_STOP_ADC_BUF,
    position_slot: 8,
};

impl StreamRegs {
    /// Register set for `direction`.
    pub const fn of(direction: Direction) -> &'static Self {
        match direction {
            Direction::Playback => &PLAYBACK,
            Direction::Capture => &CAPTURE,
        }
    }
}
