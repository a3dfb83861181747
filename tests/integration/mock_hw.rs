//! Mock hardware adapters for integration tests.
//!
//! Records every driver and port call so tests can assert on the full
//! command history without touching real GPIO/PWM/RMT registers.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;

use pardalote::app::ports::{
    PinMode, PinPort, PixelStrip, PulseRange, ReturnChannel, SchedulerPort, ServoDriver,
    StripFactory, Unit,
};
use pardalote::app::service::Dispatcher;
use pardalote::config::ExtensionConfig;
use pardalote::protocol::{Param, Pin};

// ── Pixel strips ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum StripCall {
    Begin,
    Clear,
    Show,
    SetPixel { index: u16, color: u32 },
    Fill { color: u32, first: u16, count: u16 },
    Brightness(u8),
}

pub struct MockStrip {
    pub pin: Pin,
    pub pixel_count: u16,
    pub kind: u16,
    pub calls: Vec<StripCall>,
    live: Rc<Cell<usize>>,
}

impl Drop for MockStrip {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

impl PixelStrip for MockStrip {
    fn begin(&mut self) {
        self.calls.push(StripCall::Begin);
    }

    fn clear(&mut self) {
        self.calls.push(StripCall::Clear);
    }

    fn show(&mut self) {
        self.calls.push(StripCall::Show);
    }

    fn set_pixel_color(&mut self, index: u16, color: u32) {
        self.calls.push(StripCall::SetPixel { index, color });
    }

    fn fill(&mut self, color: u32, first: u16, count: u16) {
        self.calls.push(StripCall::Fill {
            color,
            first,
            count,
        });
    }

    fn set_brightness(&mut self, value: u8) {
        self.calls.push(StripCall::Brightness(value));
    }
}

/// Counts live handles so tests can prove re-init never leaks.
pub struct MockStripFactory {
    live: Rc<Cell<usize>>,
    /// Peak number of simultaneously live handles.
    peak: Rc<Cell<usize>>,
    /// Strip ids for which `create` fails.
    pub refuse: Vec<usize>,
}

#[allow(dead_code)]
impl MockStripFactory {
    pub fn new() -> Self {
        Self {
            live: Rc::new(Cell::new(0)),
            peak: Rc::new(Cell::new(0)),
            refuse: Vec::new(),
        }
    }

    pub fn live_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.live)
    }

    pub fn peak_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.peak)
    }
}

impl StripFactory for MockStripFactory {
    type Strip = MockStrip;

    fn create(&mut self, strip_id: usize, pin: Pin, pixel_count: u16, kind: u16) -> Option<MockStrip> {
        if self.refuse.contains(&strip_id) {
            return None;
        }
        self.live.set(self.live.get() + 1);
        self.peak.set(self.peak.get().max(self.live.get()));
        Some(MockStrip {
            pin,
            pixel_count,
            kind,
            calls: Vec::new(),
            live: Rc::clone(&self.live),
        })
    }
}

// ── Servos ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ServoCall {
    Attach { pin: Pin, range: Option<PulseRange> },
    Detach,
    Write(i32),
    WriteMicroseconds(i32),
}

pub struct MockServo {
    pub calls: Vec<ServoCall>,
    /// Hardware reads through `&self`, so they are counted in a `Cell`.
    pub reads: Cell<usize>,
    pub angle: i32,
    pub attached: bool,
    pub refuse_attach: bool,
}

impl MockServo {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            reads: Cell::new(0),
            angle: 90,
            attached: false,
            refuse_attach: false,
        }
    }
}

impl ServoDriver for MockServo {
    fn attach(&mut self, pin: Pin, range: Option<PulseRange>) -> bool {
        self.calls.push(ServoCall::Attach { pin, range });
        if self.refuse_attach {
            return false;
        }
        self.attached = true;
        true
    }

    fn detach(&mut self) {
        self.calls.push(ServoCall::Detach);
        self.attached = false;
    }

    fn write(&mut self, angle: i32) {
        self.calls.push(ServoCall::Write(angle));
        self.angle = angle;
    }

    fn write_microseconds(&mut self, us: i32) {
        self.calls.push(ServoCall::WriteMicroseconds(us));
    }

    fn read(&self) -> i32 {
        self.reads.set(self.reads.get() + 1);
        self.angle
    }

    fn attached(&self) -> bool {
        self.reads.set(self.reads.get() + 1);
        self.attached
    }
}

// ── Raw pins ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PinOp {
    Mode(Pin, PinMode),
    Write(Pin, PinState),
    DelayUs(u32),
    PulseIn { pin: Pin, level: PinState, timeout_us: u32 },
}

/// Scripted pin port: each `pulse_in` pops the next queued result
/// (`None` once the script runs out).
pub struct MockPins {
    pub ops: Vec<PinOp>,
    pub pulses: VecDeque<Option<u32>>,
}

#[allow(dead_code)]
impl MockPins {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            pulses: VecDeque::new(),
        }
    }

    pub fn with_pulses(pulses: impl IntoIterator<Item = Option<u32>>) -> Self {
        Self {
            ops: Vec::new(),
            pulses: pulses.into_iter().collect(),
        }
    }

    pub fn pulse_in_calls(&self) -> Vec<&PinOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, PinOp::PulseIn { .. }))
            .collect()
    }
}

impl PinPort for MockPins {
    fn set_mode(&mut self, pin: Pin, mode: PinMode) {
        self.ops.push(PinOp::Mode(pin, mode));
    }

    fn write(&mut self, pin: Pin, level: PinState) {
        self.ops.push(PinOp::Write(pin, level));
    }

    fn pulse_in(&mut self, pin: Pin, level: PinState, timeout_us: u32) -> Option<u32> {
        self.ops.push(PinOp::PulseIn {
            pin,
            level,
            timeout_us,
        });
        self.pulses.pop_front().flatten()
    }
}

impl DelayNs for MockPins {
    fn delay_ns(&mut self, ns: u32) {
        self.ops.push(PinOp::DelayUs(ns / 1000));
    }

    fn delay_us(&mut self, us: u32) {
        self.ops.push(PinOp::DelayUs(us));
    }
}

// ── Host side ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockReports {
    pub values: Vec<(i32, Param, f32)>,
}

#[allow(dead_code)]
impl MockReports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<(i32, Param, f32)> {
        self.values.last().copied()
    }
}

impl ReturnChannel for MockReports {
    fn report_value(&mut self, report_id: i32, action: Param, value: f32) {
        self.values.push((report_id, action, value));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchedCall {
    Register { report_id: i32, action: Param, interval_ms: u32, unit: Unit },
    Unregister(i32),
}

#[derive(Debug, Default)]
pub struct MockScheduler {
    pub calls: Vec<SchedCall>,
}

impl MockScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchedulerPort for MockScheduler {
    fn register_periodic(&mut self, report_id: i32, action: Param, interval_ms: u32, unit: Unit) {
        self.calls.push(SchedCall::Register {
            report_id,
            action,
            interval_ms,
            unit,
        });
    }

    fn unregister_periodic(&mut self, report_id: i32) {
        self.calls.push(SchedCall::Unregister(report_id));
    }
}

// ── Fixture ───────────────────────────────────────────────────

/// Dispatcher plus every mock port it talks to.
pub struct Rig {
    pub dispatcher: Dispatcher<MockStripFactory, MockServo>,
    pub pins: MockPins,
    pub reports: MockReports,
    pub sched: MockScheduler,
    pub live_strips: Rc<Cell<usize>>,
    pub peak_strips: Rc<Cell<usize>>,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self::with_factory(MockStripFactory::new())
    }

    pub fn with_factory(factory: MockStripFactory) -> Self {
        let live_strips = factory.live_counter();
        let peak_strips = factory.peak_counter();
        Self {
            dispatcher: Dispatcher::new(&ExtensionConfig::default(), factory, |_| MockServo::new()),
            pins: MockPins::new(),
            reports: MockReports::new(),
            sched: MockScheduler::new(),
            live_strips,
            peak_strips,
        }
    }

    pub fn send(&mut self, device: Param, action: Param, params: &[Param]) -> pardalote::error::Result<()> {
        self.dispatcher.dispatch(
            device,
            action,
            params,
            &mut self.pins,
            &mut self.reports,
            &mut self.sched,
        )
    }

    pub fn strip(&self, id: usize) -> &MockStrip {
        self.dispatcher.neopixel().strip(id).expect("strip initialised")
    }

    pub fn servo(&self, id: usize) -> &MockServo {
        self.dispatcher.servo().driver(id).expect("servo slot")
    }

    pub fn servo_mut(&mut self, id: usize) -> &mut MockServo {
        self.dispatcher.servo_mut().driver_mut(id).expect("servo slot")
    }
}
