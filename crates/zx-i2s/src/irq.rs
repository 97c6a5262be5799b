//! Interrupt status decoding and client event delivery.

use crate::error::HardwareError;
use crate::regs;
use crate::stream::Direction;

/// Opaque token identifying the client session bound to a stream.
///
/// The engine never interprets it; it is handed back in every callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClientHandle(usize);

impl ClientHandle {
    /// Wrap a client-chosen value.
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// The wrapped value.
    pub const fn get(self) -> usize {
        self.0
    }
}

/// Decoded stream status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqStatus {
    /// DMA aborted.
    pub abort: bool,
    /// FIFO overrun or underrun.
    pub xrun: bool,
    /// A descriptor with IOC completed.
    pub ioc: bool,
}

impl IrqStatus {
    /// Decode a raw status byte; unknown bits are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Self {
            abort: bits & regs::SD_ABORT != 0,
            xrun: bits & regs::SD_XRUN != 0,
            ioc: bits & regs::SD_IOC != 0,
        }
    }

    /// Encode back to the register layout.
    pub const fn bits(self) -> u8 {
        let mut bits = 0;
        if self.abort {
            bits |= regs::SD_ABORT;
        }
        if self.xrun {
            bits |= regs::SD_XRUN;
        }
        if self.ioc {
            bits |= regs::SD_IOC;
        }
        bits
    }

    /// Whether no bit is set.
    pub const fn is_empty(self) -> bool {
        !(self.abort || self.xrun || self.ioc)
    }

    /// Faults carried by this status for `direction`, abort first.
    pub fn errors(self, direction: Direction) -> impl Iterator<Item = HardwareError> {
        let abort = self.abort.then_some(HardwareError::Abort);
        let xrun = self.xrun.then_some(HardwareError::xrun(direction));
        abort.into_iter().chain(xrun)
    }
}

/// Whether a dispatch found work on the shared line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqReturn {
    /// No stream status bit was set; the interrupt belongs to someone else.
    None,
    /// At least one status bit was observed and acknowledged.
    Handled,
}

/// Receiver for stream events.
///
/// Called from interrupt context with the device lock released, so
/// implementations may call back into the device (for example to stop a
/// stream after an error). They must not block.
pub trait EventSink {
    /// A period finished on a running stream.
    fn on_period_elapsed(&self, direction: Direction, client: Option<ClientHandle>);

    /// The controller reported a fault. The stream keeps its state; stopping
    /// or re-preparing is up to the client.
    fn on_stream_error(
        &self,
        direction: Direction,
        error: HardwareError,
        client: Option<ClientHandle>,
    );
}

/// Discards every event.
impl EventSink for () {
    fn on_period_elapsed(&self, _: Direction, _: Option<ClientHandle>) {}
    fn on_stream_error(&self, _: Direction, _: HardwareError, _: Option<ClientHandle>) {}
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn on_period_elapsed(&self, direction: Direction, client: Option<ClientHandle>) {
        (**self).on_period_elapsed(direction, client);
    }
    fn on_stream_error(
        &self,
        direction: Direction,
        error: HardwareError,
        client: Option<ClientHandle>,
    ) {
        (**self).on_stream_error(direction, error, client);
    }
}
