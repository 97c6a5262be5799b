//! Shared rig for the device-level integration tests.

#![allow(dead_code, clippy::unwrap_used, clippy::new_without_default)]

use std::sync::Mutex;

use platform::mocks::{MockRegion, MockRegisters, SharedRegisters};
use platform::{ContiguousBuffer, DmaAddr};
use zx_i2s::bdl::TABLE_BYTES;
use zx_i2s::{
    ClientHandle, Device, Direction, EngineConfig, EventSink, HardwareError, Resources,
};

/// Stream status registers, as the hardware treats them.
pub const PLAYBACK_STATUS: u16 = 0x111;
pub const CAPTURE_STATUS: u16 = 0x101;

pub const BUFFER: u32 = 65_536;
pub const PERIOD: u32 = 16_384;

/// One callback as the client saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Period(Direction, Option<ClientHandle>),
    Error(Direction, HardwareError, Option<ClientHandle>),
}

/// Records every callback in delivery order.
#[derive(Debug, Default)]
pub struct Recorder(Mutex<Vec<Event>>);

impl Recorder {
    pub fn take(&self) -> Vec<Event> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

impl EventSink for Recorder {
    fn on_period_elapsed(&self, direction: Direction, client: Option<ClientHandle>) {
        self.0.lock().unwrap().push(Event::Period(direction, client));
    }

    fn on_stream_error(
        &self,
        direction: Direction,
        error: HardwareError,
        client: Option<ClientHandle>,
    ) {
        self.0.lock().unwrap().push(Event::Error(direction, error, client));
    }
}

/// Host-side view of the hardware a test device is attached to.
#[derive(Debug, Clone)]
pub struct Hardware {
    pub regs: SharedRegisters,
    pub position: MockRegion,
    pub playback_bdl: MockRegion,
    pub capture_bdl: MockRegion,
}

impl Hardware {
    pub fn new() -> Self {
        Self {
            regs: SharedRegisters::new(
                MockRegisters::new().with_w1c(&[PLAYBACK_STATUS, CAPTURE_STATUS]),
            ),
            position: MockRegion::new(DmaAddr::new(0x3_0000), 16),
            playback_bdl: MockRegion::new(DmaAddr::new(0x1_0000), TABLE_BYTES),
            capture_bdl: MockRegion::new(DmaAddr::new(0x2_0000), TABLE_BYTES),
        }
    }

    pub fn resources(&self) -> Resources<SharedRegisters, MockRegion, MockRegion> {
        Resources {
            registers: self.regs.clone(),
            playback_bdl: self.playback_bdl.clone(),
            capture_bdl: self.capture_bdl.clone(),
            position: self.position.clone(),
        }
    }

    pub fn attach<S: EventSink>(
        &self,
        config: EngineConfig,
        sink: S,
    ) -> Device<SharedRegisters, MockRegion, MockRegion, S> {
        Device::new(self.resources(), config, sink).unwrap()
    }

    /// Device-side status update, as if the controller raised it.
    pub fn raise(&self, direction: Direction, bits: u8) {
        let offset = match direction {
            Direction::Playback => PLAYBACK_STATUS,
            Direction::Capture => CAPTURE_STATUS,
        };
        self.regs.lock().raise(offset, bits);
    }

    pub fn status(&self, direction: Direction) -> u8 {
        let offset = match direction {
            Direction::Playback => PLAYBACK_STATUS,
            Direction::Capture => CAPTURE_STATUS,
        };
        self.regs.lock().peek8(offset)
    }
}

/// Negotiate, prepare and start `direction` with a 64 KiB / 16 KiB ring.
pub fn run<S: EventSink>(
    device: &Device<SharedRegisters, MockRegion, MockRegion, S>,
    direction: Direction,
) {
    device
        .negotiate(direction, zx_i2s::SampleFormat::S16Le, 48_000, 2)
        .unwrap();
    let buffer = ContiguousBuffer::new(DmaAddr::new(0x8000_0000), BUFFER as usize);
    device
        .prepare_stream(direction, &buffer, BUFFER, PERIOD)
        .unwrap();
    device.start(direction);
}
