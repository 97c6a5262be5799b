//! Engine configuration and hardware capabilities.
//!
//! [`EngineConfig`] holds the board-level policy chosen at attach time (clock
//! role, MCLK behaviour, stop-on-buffer, period interrupts). [`HwCaps`] holds
//! what the controller can carry in each direction and is fixed per
//! hardware generation.
//!
//! # Capability summary
//!
//! | Direction | Rates (Hz)    | Channels | Containers      | FIFO |
//! |-----------|---------------|----------|-----------------|------|
//! | Playback  | 8000..=96000  | 1..=2    | 8/16/32 bit     | 32 B |
//! | Capture   | 8000..=48000  | 2        | 16/32 bit       | 32 B |

use crate::stream::Direction;

/// Which side drives BCLK and WS on the I2S link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockRole {
    /// Controller drives BCLK/WS (codec is bit- and frame-clock slave).
    #[default]
    Master,
    /// Codec drives BCLK/WS.
    Slave,
}

/// Board-level engine policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    /// I2S clock role.
    pub clock_role: ClockRole,
    /// Keep MCLK running while no stream is active (codecs that lose lock
    /// without it need this).
    pub mclk_always: bool,
    /// Halt playback DMA at the last descriptor instead of wrapping.
    pub playback_stop_on_buffer: bool,
    /// Halt capture DMA at the last descriptor instead of wrapping.
    pub capture_stop_on_buffer: bool,
    /// Set IOC on the last descriptor of every period.
    pub interrupt_every_period: bool,
    /// Upper bound on a prepared buffer, in bytes. Can only lower the
    /// direction's [`HwCaps::max_buffer_bytes`]; `None` keeps it.
    pub max_buffer_bytes: Option<u32>,
}

impl EngineConfig {
    /// Master mode, MCLK always on, free-running ring, period interrupts.
    pub const fn new() -> Self {
        Self {
            clock_role: ClockRole::Master,
            mclk_always: true,
            playback_stop_on_buffer: false,
            capture_stop_on_buffer: false,
            interrupt_every_period: true,
            max_buffer_bytes: None,
        }
    }

    /// Same configuration with a different clock role.
    #[must_use]
    pub const fn with_clock_role(mut self, role: ClockRole) -> Self {
        self.clock_role = role;
        self
    }

    /// Same configuration with a buffer size cap.
    #[must_use]
    pub const fn with_max_buffer_bytes(mut self, bytes: u32) -> Self {
        self.max_buffer_bytes = Some(bytes);
        self
    }

    /// Largest buffer `direction` may prepare.
    pub const fn buffer_limit(&self, direction: Direction) -> u32 {
        let hw = HwCaps::of(direction).max_buffer_bytes;
        match self.max_buffer_bytes {
            Some(max) if max < hw => max,
            _ => hw,
        }
    }

    /// Stop-on-buffer policy for `direction`.
    pub const fn stop_on_buffer(&self, direction: Direction) -> bool {
        match direction {
            Direction::Playback => self.playback_stop_on_buffer,
            Direction::Capture => self.capture_stop_on_buffer,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// What the controller can carry in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HwCaps {
    /// Lowest supported sample rate in Hz.
    pub rate_min: u32,
    /// Highest supported sample rate in Hz.
    pub rate_max: u32,
    /// Fewest channels.
    pub channels_min: u8,
    /// Most channels.
    pub channels_max: u8,
    /// Transmit/receive FIFO depth in bytes; also the smallest period.
    pub fifo_bytes: u32,
    /// Largest buffer the DMA engine accepts.
    pub max_buffer_bytes: u32,
}

impl HwCaps {
    /// Playback path capabilities.
    pub const PLAYBACK: Self = Self {
        rate_min: 8_000,
        rate_max: 96_000,
        channels_min: 1,
        channels_max: 2,
        fifo_bytes: 32,
        max_buffer_bytes: 64 * 1024,
    };

    /// Capture path capabilities.
    pub const CAPTURE: Self = Self {
        rate_min: 8_000,
        rate_max: 48_000,
        channels_min: 2,
        channels_max: 2,
        fifo_bytes: 32,
        max_buffer_bytes: 64 * 1024,
    };

    /// Capabilities of `direction`.
    pub const fn of(direction: Direction) -> &'static Self {
        match direction {
            Direction::Playback => &Self::PLAYBACK,
            Direction::Capture => &Self::CAPTURE,
        }
    }

    /// Whether `rate` is inside this direction's range.
    pub const fn supports_rate(&self, rate: u32) -> bool {
        rate >= self.rate_min && rate <= self.rate_max
    }

    /// Whether `channels` is inside this direction's range.
    pub const fn supports_channels(&self, channels: u8) -> bool {
        channels >= self.channels_min && channels <= self.channels_max
    }
}
