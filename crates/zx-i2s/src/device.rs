//! Device context: the controller, its two streams and the interrupt path.
//!
//! # Locking
//!
//! One [`blocking_mutex::Mutex`] guards the register interface, the position
//! buffer and both streams. Every operation takes it once, performs one
//! direction's register transaction and releases it. The interrupt
//! dispatcher releases it before calling the [`EventSink`], so callbacks may
//! call straight back into the device.
//!
//! ```text
//! handle_interrupt()
//!   for Playback, Capture:
//!     lock { read status, write-1-to-clear, latch fault, snapshot running }
//!     on_period_elapsed / on_stream_error        <- lock not held
//! ```
//!
//! [`CriticalSectionRawMutex`] makes the lock safe to take from both thread
//! and interrupt context on a single core.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{self, raw::CriticalSectionRawMutex};
use platform::{BufferGeometry, DmaRegion, RegisterIo};

use crate::config::{ClockRole, EngineConfig};
use crate::error::{HardwareError, Result};
use crate::format::{self, NegotiatedFormat, SampleFormat};
use crate::irq::{ClientHandle, EventSink, IrqReturn};
use crate::logging::{debug, info, trace, warning};
use crate::regs::{self, StreamRegs};
use crate::stream::{Direction, PerDirection, Stream, StreamState};

/// Hardware resources a device is attached to.
///
/// Handed over at [`Device::new`] and returned by [`Device::detach`].
#[derive(Debug)]
pub struct Resources<R, M, P> {
    /// Controller register window.
    pub registers: R,
    /// Playback descriptor table (at least 4 KiB).
    pub playback_bdl: M,
    /// Capture descriptor table (at least 4 KiB).
    pub capture_bdl: M,
    /// Position write-back buffer (at least 16 bytes).
    pub position: P,
}

#[derive(Debug)]
struct Inner<R, M, P> {
    io: R,
    position: P,
    streams: PerDirection<Stream<M>>,
    config: EngineConfig,
}

/// One attached controller.
///
/// All methods take `&self`; share the device between the control path and
/// the interrupt handler by reference (typically from a `static`).
pub struct Device<R, M, P, S> {
    inner: blocking_mutex::Mutex<CriticalSectionRawMutex, RefCell<Inner<R, M, P>>>,
    sink: S,
}

impl<R, M, P, S> Device<R, M, P, S>
where
    R: RegisterIo,
    M: DmaRegion,
    P: DmaRegion,
    S: EventSink,
{
    /// Attach to a controller.
    ///
    /// Both modules are held in reset, every interrupt source is masked and
    /// acknowledged, and common control is set to the configured clock role
    /// and MCLK policy.
    ///
    /// # Errors
    ///
    /// - [`Error::DescriptorRegionTooSmall`](crate::Error::DescriptorRegionTooSmall)
    ///   if a descriptor region is under 4 KiB
    /// - [`Error::Dma`](crate::Error::Dma) if the position buffer is under
    ///   16 bytes
    pub fn new(resources: Resources<R, M, P>, config: EngineConfig, sink: S) -> Result<Self> {
        let Resources {
            registers: mut io,
            playback_bdl,
            capture_bdl,
            mut position,
        } = resources;

        position.clear()?;
        for direction in Direction::ALL {
            position.read_u32(StreamRegs::of(direction).position_slot)?;
        }
        let streams = PerDirection::new(
            Stream::new(Direction::Playback, playback_bdl)?,
            Stream::new(Direction::Capture, capture_bdl)?,
        );

        let mut comset = 0;
        if config.mclk_always {
            comset |= regs::COMSET_MCLK_ALWAYS;
        }
        if config.clock_role == ClockRole::Slave {
            comset |= regs::COMSET_SLV_MODE;
        }
        io.write8(regs::COMSET, comset);
        io.write8(regs::MODRST, regs::MODRST_DAC | regs::MODRST_ADC);
        io.write8(regs::INTCTRL, 0);
        for direction in Direction::ALL {
            let sregs = StreamRegs::of(direction);
            io.write8(sregs.int_enable, 0);
            io.write8(sregs.int_status, regs::SD_ALL);
        }

        info!("attached, {:?} clock role", config.clock_role);
        Ok(Self {
            inner: blocking_mutex::Mutex::new(RefCell::new(Inner {
                io,
                position,
                streams,
                config,
            })),
            sink,
        })
    }

    fn with<T>(&self, f: impl FnOnce(&mut Inner<R, M, P>) -> T) -> T {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    /// Configuration the device was attached with.
    pub fn config(&self) -> EngineConfig {
        self.with(|inner| inner.config)
    }

    /// Negotiate a format for `direction` and program its clock.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedFormat`](crate::Error::UnsupportedFormat) or
    /// [`Error::UnsupportedRate`](crate::Error::UnsupportedRate); no register
    /// is touched on error.
    pub fn negotiate(
        &self,
        direction: Direction,
        format: SampleFormat,
        rate: u32,
        channels: u8,
    ) -> Result<NegotiatedFormat> {
        let negotiated = format::negotiate(direction, format, rate, channels)?;
        self.with(|inner| {
            let Inner { io, streams, config, .. } = inner;
            streams[direction].configure(io, config, negotiated);
        });
        Ok(negotiated)
    }

    /// Build `direction`'s descriptor ring over `geometry` and program it.
    ///
    /// On success the direction's position slot is reset to 0; a rejected
    /// layout leaves it alone.
    ///
    /// # Errors
    ///
    /// See [`Stream::prepare`].
    pub fn prepare_stream<G: BufferGeometry + ?Sized>(
        &self,
        direction: Direction,
        geometry: &G,
        buffer_bytes: u32,
        period_bytes: u32,
    ) -> Result<()> {
        self.with(|inner| {
            let Inner { io, position, streams, config } = inner;
            streams[direction].prepare(
                io,
                config,
                position.bus_addr(),
                geometry,
                buffer_bytes,
                period_bytes,
            )?;
            position.write_u32(StreamRegs::of(direction).position_slot, 0)?;
            Ok(())
        })
    }

    /// Start `direction`. The stream must be prepared.
    pub fn start(&self, direction: Direction) {
        self.with(|inner| {
            let Inner { io, streams, .. } = inner;
            streams[direction].start(io);
        });
    }

    /// Stop `direction`. Safe to call any number of times.
    pub fn stop(&self, direction: Direction) {
        self.with(|inner| {
            let Inner { io, streams, .. } = inner;
            streams[direction].stop(io);
        });
    }

    /// Stop `direction`, mask its interrupts and drop its ring.
    pub fn release(&self, direction: Direction) {
        self.with(|inner| {
            let Inner { io, streams, .. } = inner;
            streams[direction].release(io);
        });
    }

    /// Byte offset the DMA has reached in `direction`'s buffer.
    pub fn current_position(&self, direction: Direction) -> u32 {
        self.with(|inner| inner.streams[direction].position(&inner.position))
    }

    /// Lifecycle state of `direction`.
    pub fn state(&self, direction: Direction) -> StreamState {
        self.with(|inner| inner.streams[direction].state())
    }

    /// Fault latched on `direction` since its last successful prepare.
    pub fn fault(&self, direction: Direction) -> Option<HardwareError> {
        self.with(|inner| inner.streams[direction].fault())
    }

    /// Format last negotiated for `direction`.
    pub fn format(&self, direction: Direction) -> Option<NegotiatedFormat> {
        self.with(|inner| inner.streams[direction].format().copied())
    }

    /// Descriptors in `direction`'s current ring.
    pub fn descriptor_count(&self, direction: Direction) -> usize {
        self.with(|inner| inner.streams[direction].table().len())
    }

    /// Bind a client token to `direction`; it is passed to every callback.
    pub fn set_client(&self, direction: Direction, client: Option<ClientHandle>) {
        self.with(|inner| inner.streams[direction].set_client(client));
    }

    /// Service the shared interrupt line.
    ///
    /// Both directions are checked on every call, playback first, because
    /// the controller may coalesce both into one assertion.
    pub fn handle_interrupt(&self) -> IrqReturn {
        let mut ret = IrqReturn::None;
        for direction in Direction::ALL {
            let seen = self.with(|inner| {
                let Inner { io, streams, .. } = inner;
                streams[direction].service(io)
            });
            let Some(seen) = seen else {
                continue;
            };
            ret = IrqReturn::Handled;
            trace!("{:?}: status {}", direction, seen.status.bits());

            if seen.status.ioc && seen.running {
                self.sink.on_period_elapsed(direction, seen.client);
            }
            for error in seen.status.errors(direction) {
                warning!("{:?}: {:?}", direction, error);
                self.sink.on_stream_error(direction, error, seen.client);
            }
        }
        ret
    }

    /// Detach from the controller, giving back its resources and the sink.
    ///
    /// Both streams are released and the interrupt line is masked.
    pub fn detach(self) -> (Resources<R, M, P>, S) {
        let Inner {
            mut io,
            position,
            mut streams,
            ..
        } = self.inner.into_inner().into_inner();
        for direction in Direction::ALL {
            streams[direction].release(&mut io);
        }
        io.write8(regs::INTCTRL, 0);
        debug!("detached");

        let (playback, capture) = streams.into_parts();
        let resources = Resources {
            registers: io,
            playback_bdl: playback.into_region(),
            capture_bdl: capture.into_region(),
            position,
        };
        (resources, self.sink)
    }
}
