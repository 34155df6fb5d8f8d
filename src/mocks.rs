use crate::can::{ErrorHandler, HighPriorityHandler, RxHandler};
use crate::config::{OperationMode, RxQueue};
use crate::frame::Frame;
use crate::message::{RxElement, TxElement};
use crate::peripheral::Peripheral;
use crate::registers::{
    GlobalFilterReg, HighPriorityStatusReg, InterruptFlags, NominalBitTimingReg, StandardFilterElement,
};
use crate::status::{HighPriorityStatus, Status};
use alloc::vec::Vec;
use core::cell::RefCell;
use embedded_hal::delay::DelayNs;
use embedded_time::clock::Error;
use embedded_time::duration::Duration;
use embedded_time::fixed_point::FixedPoint;
use embedded_time::fraction::Fraction;
use embedded_time::timer::param::{Armed, OneShot};
use embedded_time::{Clock, Instant, Timer};
use mockall::mock;
use std::sync::Mutex;

#[derive(Debug, PartialEq, Eq)]
pub struct TestClock {
    pub next_instants: RefCell<Vec<u64>>,
}

impl TestClock {
    pub fn new(next_instants: Vec<u64>) -> Self {
        Self {
            next_instants: RefCell::new(next_instants),
        }
    }
}

impl Clock for TestClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, Error> {
        if self.next_instants.borrow().len() == 0 {
            return Err(Error::Unspecified);
        }

        Ok(Instant::new(self.next_instants.borrow_mut().remove(0)))
    }

    fn new_timer<Dur>(&self, duration: Dur) -> Timer<OneShot, Armed, Self, Dur>
    where
        Dur: Duration + FixedPoint,
    {
        Timer::new(self, duration)
    }
}

mock! {
    pub Fdcan {}

    impl Peripheral for Fdcan {
        fn reset(&self) -> Result<(), Status>;
        fn write_bit_timing(&self, timing: NominalBitTimingReg) -> Result<(), Status>;
        fn write_operation(&self, mode: OperationMode, auto_retransmission: bool) -> Result<(), Status>;
        fn write_global_filter(&self, filter: GlobalFilterReg) -> Result<(), Status>;
        fn write_filter(&self, slot: u8, element: StandardFilterElement) -> Result<(), Status>;
        fn write_interrupts(&self, line0: InterruptFlags, line1: InterruptFlags) -> Result<(), Status>;
        fn start(&self) -> Result<(), Status>;
        fn stop(&self) -> Result<(), Status>;
        fn pending_interrupts(&self) -> InterruptFlags;
        fn clear_interrupts(&self, flags: InterruptFlags) -> Result<(), Status>;
        fn rx_fill_level(&self, queue: RxQueue) -> u8;
        fn read_rx(&self, queue: RxQueue) -> Result<RxElement, Status>;
        fn write_tx(&self, element: &TxElement) -> Result<(), Status>;
        fn high_priority_status(&self) -> HighPriorityStatusReg;
    }
}

mock! {
    pub Delay {}

    impl DelayNs for Delay {
        fn delay_ns(&mut self, ns: u32);
        fn delay_us(&mut self, us: u32);
        fn delay_ms(&mut self, ms: u32);
    }
}

impl MockFdcan {
    /// Accepts the register writes of the given number of `Controller::init` calls
    pub fn expect_configuration(&mut self, times: usize) {
        self.expect_reset().times(times).returning(|| Ok(()));
        self.expect_write_bit_timing().times(times).returning(|_| Ok(()));
        self.expect_write_operation().times(times).returning(|_, _| Ok(()));
        self.expect_write_global_filter().times(times).returning(|_| Ok(()));
        self.expect_write_interrupts().times(times).returning(|_, _| Ok(()));
    }

    pub fn expect_start_once(&mut self) {
        self.expect_start().times(1).returning(|| Ok(()));
    }
}

/// Records every callback invocation
#[derive(Default)]
pub struct RecordingHandler {
    pub frames: Mutex<Vec<(RxQueue, Frame)>>,
    pub errors: Mutex<Vec<InterruptFlags>>,
    pub high_priority: Mutex<Vec<HighPriorityStatus>>,
}

impl RecordingHandler {
    pub fn frames(&self) -> Vec<(RxQueue, Frame)> {
        self.frames.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<InterruptFlags> {
        self.errors.lock().unwrap().clone()
    }

    pub fn high_priority(&self) -> Vec<HighPriorityStatus> {
        self.high_priority.lock().unwrap().clone()
    }
}

impl RxHandler for RecordingHandler {
    fn on_frame(&self, queue: RxQueue, frame: &Frame) {
        self.frames.lock().unwrap().push((queue, *frame));
    }
}

impl ErrorHandler for RecordingHandler {
    fn on_error(&self, reasons: InterruptFlags) {
        self.errors.lock().unwrap().push(reasons);
    }
}

impl HighPriorityHandler for RecordingHandler {
    fn on_high_priority(&self, status: &HighPriorityStatus) {
        self.high_priority.lock().unwrap().push(*status);
    }
}
