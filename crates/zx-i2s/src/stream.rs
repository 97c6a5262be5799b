//! Per-direction stream controller.
//!
//! ## State machine
//!
//! ```text
//! [Idle] --prepare()--> [Configured] --start()--> [Running]
//!                        ^    |                       |
//!                        |    +--prepare()--+         |
//!                        +-------stop()---------------+
//! [Configured] --release()--> [Idle]
//! ```
//!
//! A `Stream` holds no lock of its own. Every method that touches registers
//! takes the register interface by `&mut`, and the device calls them with its
//! lock held.
//!
//! ## Start sequence
//!
//! The FIFO latches its framing when the start bit goes high, so the start
//! bit is always the last write:
//!
//! 1. module reset asserted, then deasserted
//! 2. endian/sign exchange set to the negotiated baseline (playback only)
//! 3. pop length and channel count
//! 4. WS/clock-edge polarity and pad bits
//! 5. start enable

use core::ops::{Index, IndexMut};

use platform::{BufferGeometry, DmaAddr, DmaRegion, RegisterIo};

use crate::bdl::{DescriptorTable, TABLE_BYTES};
use crate::config::{ClockRole, EngineConfig, HwCaps};
use crate::error::{Error, HardwareError, Result};
use crate::format::{FrameLayout, NegotiatedFormat};
use crate::irq::{ClientHandle, IrqStatus};
use crate::logging::{debug, trace, warning};
use crate::regs::{self, StreamRegs};

/// Transfer direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Memory to codec (DAC path).
    Playback,
    /// Codec to memory (ADC path).
    Capture,
}

impl Direction {
    /// Both directions in dispatch order.
    pub const ALL: [Self; 2] = [Self::Playback, Self::Capture];
}

/// One value per direction, indexed by [`Direction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerDirection<T>([T; 2]);

impl<T> PerDirection<T> {
    /// Build from a playback and a capture value.
    pub const fn new(playback: T, capture: T) -> Self {
        Self([playback, capture])
    }

    /// Consume into `(playback, capture)`.
    pub fn into_parts(self) -> (T, T) {
        let [playback, capture] = self.0;
        (playback, capture)
    }
}

impl<T> Index<Direction> for PerDirection<T> {
    type Output = T;

    fn index(&self, direction: Direction) -> &T {
        match direction {
            Direction::Playback => &self.0[0],
            Direction::Capture => &self.0[1],
        }
    }
}

impl<T> IndexMut<Direction> for PerDirection<T> {
    fn index_mut(&mut self, direction: Direction) -> &mut T {
        match direction {
            Direction::Playback => &mut self.0[0],
            Direction::Capture => &mut self.0[1],
        }
    }
}

/// Stream lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamState {
    /// No descriptor ring.
    #[default]
    Idle,
    /// Ring and DMA bases programmed; transfer stopped.
    Configured,
    /// Transfer running.
    Running,
}

/// What the dispatcher saw on one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Serviced {
    pub status: IrqStatus,
    pub running: bool,
    pub client: Option<ClientHandle>,
}

/// Controller for one direction.
///
/// Owns the descriptor table, the hardware region it is serialised into and
/// the negotiated format. The region is supplied once and overwritten on
/// every prepare.
#[derive(Debug)]
pub struct Stream<M> {
    direction: Direction,
    regs: &'static StreamRegs,
    state: StreamState,
    table: DescriptorTable,
    region: M,
    format: Option<NegotiatedFormat>,
    fault: Option<HardwareError>,
    client: Option<ClientHandle>,
}

impl<M: DmaRegion> Stream<M> {
    /// Create an idle stream whose descriptors live in `region`.
    ///
    /// # Errors
    ///
    /// [`Error::DescriptorRegionTooSmall`] if `region` cannot hold a full
    /// 256-entry ring.
    pub fn new(direction: Direction, region: M) -> Result<Self> {
        if region.len() < TABLE_BYTES {
            return Err(Error::DescriptorRegionTooSmall {
                len: region.len(),
                needed: TABLE_BYTES,
            });
        }
        Ok(Self {
            direction,
            regs: StreamRegs::of(direction),
            state: StreamState::Idle,
            table: DescriptorTable::new(),
            region,
            format: None,
            fault: None,
            client: None,
        })
    }

    /// Direction this stream serves.
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> StreamState {
        self.state
    }

    /// Whether the transfer is running.
    pub fn is_running(&self) -> bool {
        self.state == StreamState::Running
    }

    /// Hardware fault latched since the last successful prepare.
    pub const fn fault(&self) -> Option<HardwareError> {
        self.fault
    }

    /// The descriptor ring last built by prepare.
    pub const fn table(&self) -> &DescriptorTable {
        &self.table
    }

    /// Format stored by the last negotiation.
    pub const fn format(&self) -> Option<&NegotiatedFormat> {
        self.format.as_ref()
    }

    /// Client token passed to event callbacks.
    pub const fn client(&self) -> Option<ClientHandle> {
        self.client
    }

    /// Replace the client token.
    pub fn set_client(&mut self, client: Option<ClientHandle>) {
        self.client = client;
    }

    /// Program the clock dividers and common control for `format` and keep
    /// the format for the next start.
    pub fn configure<R: RegisterIo + ?Sized>(
        &mut self,
        io: &mut R,
        config: &EngineConfig,
        format: NegotiatedFormat,
    ) {
        let clock = format.clock;
        io.write8(regs::DAC_IF_DIV, clock.divider);
        io.modify8(regs::DAC_IF_CTL, regs::DAC_IF_MDIV_MASK, clock.mdiv & regs::DAC_IF_MDIV_MASK);

        let mut comset = clock.pll.bit();
        if config.mclk_always {
            comset |= regs::COMSET_MCLK_ALWAYS;
        }
        if config.clock_role == ClockRole::Slave {
            comset |= regs::COMSET_SLV_MODE;
        }
        if config.stop_on_buffer(self.direction) {
            comset |= self.regs.stop_buf_bit;
        }
        io.modify8(
            regs::COMSET,
            regs::COMSET_SEL_PLLEA
                | regs::COMSET_MCLK_ALWAYS
                | regs::COMSET_SLV_MODE
                | self.regs.stop_buf_bit,
            comset,
        );

        debug!(
            "{:?}: {} Hz, divider {}, mdiv {}, pll {}",
            self.direction,
            clock.rate,
            clock.divider,
            clock.mdiv,
            clock.pll.bit()
        );
        self.format = Some(format);
    }

    /// Build the ring over `geometry` and program the DMA bases.
    ///
    /// A running stream is stopped first. On success the latched fault is
    /// cleared and the direction's interrupts are enabled. On failure the
    /// stream is left idle with an empty ring.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidLayout`] for a layout the ring cannot describe, a
    ///   buffer above [`EngineConfig::buffer_limit`] or a period shorter
    ///   than the FIFO
    /// - [`Error::TooManyFragments`] when the buffer needs more than 256
    ///   descriptors
    /// - [`Error::Dma`] if the descriptor region rejects a write
    pub fn prepare<R, G>(
        &mut self,
        io: &mut R,
        config: &EngineConfig,
        position_base: DmaAddr,
        geometry: &G,
        buffer_bytes: u32,
        period_bytes: u32,
    ) -> Result<()>
    where
        R: RegisterIo + ?Sized,
        G: BufferGeometry + ?Sized,
    {
        if self.is_running() {
            self.stop(io);
        }

        if let Err(err) = self.build(config, geometry, buffer_bytes, period_bytes) {
            warning!("{:?}: prepare failed: {:?}", self.direction, err);
            self.table.clear();
            self.state = StreamState::Idle;
            return Err(err);
        }
        let Some(lvi) = self.table.last_valid_index() else {
            self.state = StreamState::Idle;
            return Err(Error::InvalidLayout { buffer_bytes, period_bytes });
        };

        self.fault = None;

        let bdl = self.region.bus_addr();
        io.write32(self.regs.bdl_lower, bdl.lower());
        io.write32(self.regs.bdl_upper, bdl.upper());
        io.write8(self.regs.lvi, lvi);
        if config.stop_on_buffer(self.direction) {
            io.write8(self.regs.stop_buf, lvi);
        }
        io.write32(regs::DPLBASE, position_base.lower() | regs::DPLBASE_EN);
        io.write32(regs::DPUBASE, position_base.upper());

        // Stale status from a previous run must not reach the new client.
        io.write8(self.regs.int_status, regs::SD_ALL);
        io.write8(self.regs.int_enable, regs::SD_ALL);
        io.modify8(regs::INTCTRL, 0, self.regs.intctrl_bit);

        debug!(
            "{:?}: prepared {} bytes, {} periods, {} descriptors",
            self.direction,
            buffer_bytes,
            self.table.periods(),
            self.table.len()
        );
        self.state = StreamState::Configured;
        Ok(())
    }

    fn build<G: BufferGeometry + ?Sized>(
        &mut self,
        config: &EngineConfig,
        geometry: &G,
        buffer_bytes: u32,
        period_bytes: u32,
    ) -> Result<()> {
        let caps = HwCaps::of(self.direction);
        if buffer_bytes > config.buffer_limit(self.direction) || period_bytes < caps.fifo_bytes {
            return Err(Error::InvalidLayout { buffer_bytes, period_bytes });
        }
        self.table
            .build_into(geometry, buffer_bytes, period_bytes, config.interrupt_every_period)?;
        self.table.write_to(&mut self.region)
    }

    /// Run the start sequence; the start bit is written last.
    ///
    /// Callers start only configured streams. Starting from any other state
    /// is logged and carried out anyway.
    pub fn start<R: RegisterIo + ?Sized>(&mut self, io: &mut R) {
        if self.state != StreamState::Configured {
            warning!("{:?}: start from {:?}", self.direction, self.state);
        }
        let layout = self
            .format
            .map_or(FrameLayout::fallback(self.direction), |f| f.layout());

        io.modify8(regs::MODRST, 0, self.regs.reset_bit);
        io.modify8(regs::MODRST, self.regs.reset_bit, 0);

        match self.direction {
            Direction::Playback => start_playback(io, &layout),
            Direction::Capture => start_capture(io, &layout),
        }

        trace!("{:?}: started", self.direction);
        self.state = StreamState::Running;
    }

    /// Clear the start bit, then put the module back into reset.
    ///
    /// Performs the same two writes whatever the current state. A configured
    /// or running stream ends up configured; an idle one stays idle.
    pub fn stop<R: RegisterIo + ?Sized>(&mut self, io: &mut R) {
        match self.direction {
            Direction::Playback => io.modify8(regs::DAC_IF_CTL, regs::DAC_IF_START, 0),
            Direction::Capture => io.modify8(regs::ADCFIFOCFG, regs::ADCFIFO_START, 0),
        }
        io.modify8(regs::MODRST, 0, self.regs.reset_bit);

        if self.state == StreamState::Running {
            trace!("{:?}: stopped", self.direction);
            self.state = StreamState::Configured;
        }
    }

    /// Stop, mask the direction's interrupts and drop the ring.
    pub fn release<R: RegisterIo + ?Sized>(&mut self, io: &mut R) {
        self.stop(io);
        io.write8(self.regs.int_enable, 0);
        io.modify8(regs::INTCTRL, self.regs.intctrl_bit, 0);
        self.table.clear();
        self.state = StreamState::Idle;
        debug!("{:?}: released", self.direction);
    }

    /// Byte offset the DMA has reached, modulo the buffer size.
    ///
    /// Read from the position buffer the controller writes back. An idle
    /// stream reports 0.
    pub fn position<P: DmaRegion + ?Sized>(&self, position: &P) -> u32 {
        let raw = position.read_u32(self.regs.position_slot).unwrap_or(0);
        raw.checked_rem(self.table.buffer_bytes()).unwrap_or(0)
    }

    /// Read and acknowledge this direction's status, latching any fault.
    ///
    /// Returns `None` when no status bit was set.
    pub(crate) fn service<R: RegisterIo + ?Sized>(&mut self, io: &mut R) -> Option<Serviced> {
        let bits = io.read8(self.regs.int_status) & regs::SD_ALL;
        if bits == 0 {
            return None;
        }
        io.write8(self.regs.int_status, bits);

        let status = IrqStatus::from_bits(bits);
        if let Some(err) = status.errors(self.direction).next() {
            if self.fault.is_none() {
                self.fault = Some(err);
            }
        }
        Some(Serviced {
            status,
            running: self.is_running(),
            client: self.client,
        })
    }

    /// Give back the descriptor region.
    pub fn into_region(self) -> M {
        self.region
    }
}

fn start_playback<R: RegisterIo + ?Sized>(io: &mut R, layout: &FrameLayout) {
    let mut exchange = 0;
    if layout.endian_exchange {
        exchange |= regs::DACFIFO_ENDIAN;
    }
    if layout.sign_exchange {
        exchange |= regs::DACFIFO_SIGN;
    }
    io.modify8(regs::DACFIFOCFG, regs::DACFIFO_ENDIAN | regs::DACFIFO_SIGN, exchange);

    let fields = (layout.pop_len.wrapping_shl(regs::DACFIFO_POP_SHIFT.into())
        & regs::DACFIFO_POP_MASK)
        | (layout.channels & regs::DACFIFO_CHN_MASK);
    io.modify8(
        regs::DACFIFOCFG,
        regs::DACFIFO_POP_MASK | regs::DACFIFO_CHN_MASK,
        fields,
    );

    io.modify8(regs::DAC_IF_CTL, regs::DAC_IF_EDGE | regs::DAC_IF_LEFT_HIGH, 0);
    io.modify8(
        regs::DAC_IF_PAD,
        regs::DAC_IF_PAD_MASK,
        layout.pad_bits & regs::DAC_IF_PAD_MASK,
    );

    io.modify8(regs::DAC_IF_CTL, 0, regs::DAC_IF_START);
}

fn start_capture<R: RegisterIo + ?Sized>(io: &mut R, layout: &FrameLayout) {
    io.modify8(
        regs::ADCFIFOCFG,
        regs::ADCFIFO_POP_MASK,
        layout.pop_len & regs::ADCFIFO_POP_MASK,
    );
    io.modify8(
        regs::ADCIFCFG,
        regs::ADCIF_NEG_EDGE | regs::ADCIF_LEFT_LOW | regs::ADCIF_PAD_MASK,
        regs::ADCIF_NEG_EDGE | regs::ADCIF_LEFT_LOW | (layout.pad_bits & regs::ADCIF_PAD_MASK),
    );

    io.modify8(regs::ADCFIFOCFG, 0, regs::ADCFIFO_START);
}
