//! Shared-line interrupt dispatch: ordering, acknowledgement, fault latching
//! and callbacks that re-enter the device.

#![allow(clippy::unwrap_used)]

mod common;

use std::sync::OnceLock;

use common::{run, Event, Hardware, Recorder, BUFFER, PERIOD};
use platform::mocks::{MockRegion, SharedRegisters};
use platform::{ContiguousBuffer, DmaAddr};
use zx_i2s::{
    regs, ClientHandle, Device, Direction, EngineConfig, EventSink, HardwareError, IrqReturn,
    StreamState,
};

#[test]
fn idle_line_is_not_ours() {
    let hw = Hardware::new();
    let recorder = Recorder::default();
    let device = hw.attach(EngineConfig::new(), &recorder);
    run(&device, Direction::Playback);
    hw.regs.lock().clear_trace();

    assert_eq!(device.handle_interrupt(), IrqReturn::None);
    assert!(recorder.take().is_empty());
    assert!(hw.regs.lock().trace().is_empty());
}

#[test]
fn coalesced_completion_and_overrun() {
    let hw = Hardware::new();
    let recorder = Recorder::default();
    let device = hw.attach(EngineConfig::new(), &recorder);
    run(&device, Direction::Playback);
    run(&device, Direction::Capture);

    hw.raise(Direction::Playback, regs::SD_IOC);
    hw.raise(Direction::Capture, regs::SD_XRUN);
    assert_eq!(device.handle_interrupt(), IrqReturn::Handled);

    assert_eq!(
        recorder.take(),
        [
            Event::Period(Direction::Playback, None),
            Event::Error(Direction::Capture, HardwareError::Overrun, None),
        ]
    );
    assert_eq!(hw.status(Direction::Playback), 0);
    assert_eq!(hw.status(Direction::Capture), 0);
    assert_eq!(device.fault(Direction::Playback), None);
    assert_eq!(device.fault(Direction::Capture), Some(HardwareError::Overrun));
}

#[test]
fn one_status_carries_completion_then_errors() {
    let hw = Hardware::new();
    let recorder = Recorder::default();
    let device = hw.attach(EngineConfig::new(), &recorder);
    run(&device, Direction::Playback);

    hw.raise(Direction::Playback, regs::SD_ALL);
    device.handle_interrupt();
    assert_eq!(
        recorder.take(),
        [
            Event::Period(Direction::Playback, None),
            Event::Error(Direction::Playback, HardwareError::Abort, None),
            Event::Error(Direction::Playback, HardwareError::Underrun, None),
        ]
    );
    assert_eq!(device.fault(Direction::Playback), Some(HardwareError::Abort));
}

#[test]
fn stray_completion_after_stop_is_cleared_silently() {
    let hw = Hardware::new();
    let recorder = Recorder::default();
    let device = hw.attach(EngineConfig::new(), &recorder);
    run(&device, Direction::Capture);
    device.stop(Direction::Capture);

    hw.raise(Direction::Capture, regs::SD_IOC);
    assert_eq!(device.handle_interrupt(), IrqReturn::Handled);
    assert!(recorder.take().is_empty());
    assert_eq!(hw.status(Direction::Capture), 0);

    // Acknowledged: the next dispatch finds nothing.
    assert_eq!(device.handle_interrupt(), IrqReturn::None);
}

#[test]
fn first_fault_is_latched_until_prepare() {
    let hw = Hardware::new();
    let recorder = Recorder::default();
    let device = hw.attach(EngineConfig::new(), &recorder);
    run(&device, Direction::Playback);

    hw.raise(Direction::Playback, regs::SD_XRUN);
    device.handle_interrupt();
    hw.raise(Direction::Playback, regs::SD_ABORT);
    device.handle_interrupt();
    assert_eq!(recorder.take().len(), 2);
    assert_eq!(device.fault(Direction::Playback), Some(HardwareError::Underrun));

    // The stream keeps running; recovery is the client's call.
    assert_eq!(device.state(Direction::Playback), StreamState::Running);

    let buffer = ContiguousBuffer::new(DmaAddr::new(0x8000_0000), BUFFER as usize);
    device
        .prepare_stream(Direction::Playback, &buffer, BUFFER, PERIOD)
        .unwrap();
    assert_eq!(device.fault(Direction::Playback), None);
}

#[test]
fn prepare_discards_stale_status() {
    let hw = Hardware::new();
    let recorder = Recorder::default();
    let device = hw.attach(EngineConfig::new(), &recorder);
    run(&device, Direction::Playback);
    device.stop(Direction::Playback);

    hw.raise(Direction::Playback, regs::SD_IOC | regs::SD_XRUN);
    let buffer = ContiguousBuffer::new(DmaAddr::new(0x8000_0000), BUFFER as usize);
    device
        .prepare_stream(Direction::Playback, &buffer, BUFFER, PERIOD)
        .unwrap();
    device.start(Direction::Playback);

    assert_eq!(device.handle_interrupt(), IrqReturn::None);
    assert!(recorder.take().is_empty());
}

#[test]
fn client_handle_reaches_every_callback() {
    let hw = Hardware::new();
    let recorder = Recorder::default();
    let device = hw.attach(EngineConfig::new(), &recorder);
    let client = Some(ClientHandle::new(0xC0FFEE));
    device.set_client(Direction::Capture, client);
    run(&device, Direction::Capture);

    hw.raise(Direction::Capture, regs::SD_IOC | regs::SD_ABORT);
    device.handle_interrupt();
    assert_eq!(
        recorder.take(),
        [
            Event::Period(Direction::Capture, client),
            Event::Error(Direction::Capture, HardwareError::Abort, client),
        ]
    );

    device.set_client(Direction::Capture, None);
    hw.raise(Direction::Capture, regs::SD_IOC);
    device.handle_interrupt();
    assert_eq!(recorder.take(), [Event::Period(Direction::Capture, None)]);
}

type StaticDevice = Device<SharedRegisters, MockRegion, MockRegion, StopOnError>;

static DEVICE: OnceLock<StaticDevice> = OnceLock::new();

/// Stops the failing stream from inside the callback.
struct StopOnError;

impl EventSink for StopOnError {
    fn on_period_elapsed(&self, _: Direction, _: Option<ClientHandle>) {}

    fn on_stream_error(&self, direction: Direction, _: HardwareError, _: Option<ClientHandle>) {
        if let Some(device) = DEVICE.get() {
            device.stop(direction);
        }
    }
}

#[test]
fn callbacks_may_stop_the_stream() {
    let hw = Hardware::new();
    let device = DEVICE.get_or_init(|| hw.attach(EngineConfig::new(), StopOnError));
    run(device, Direction::Playback);
    run(device, Direction::Capture);

    hw.raise(Direction::Playback, regs::SD_XRUN);
    hw.raise(Direction::Capture, regs::SD_IOC);
    assert_eq!(device.handle_interrupt(), IrqReturn::Handled);

    assert_eq!(device.state(Direction::Playback), StreamState::Configured);
    assert_eq!(device.state(Direction::Capture), StreamState::Running);
    assert_eq!(hw.status(Direction::Capture), 0);
    let r = hw.regs.lock();
    assert_eq!(r.peek8(regs::DAC_IF_CTL) & regs::DAC_IF_START, 0);
    assert_ne!(r.peek8(regs::MODRST) & regs::MODRST_DAC, 0);
}
