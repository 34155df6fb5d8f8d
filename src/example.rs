//! # Software FDCAN model for doc examples and tests
//!
//! [ExamplePeripheral] implements [Peripheral] in memory: protected registers only accept writes in
//! initialization mode, acceptance filtering follows the written filter elements and global filter, and the RX
//! and TX FIFOs hold three elements each like on STM32G4 devices. In loopback mode transmitted frames are received
//! immediately; otherwise they stay queued until [ExamplePeripheral::transmit_next] takes them off the "bus".
use crate::config::{OperationMode, RxQueue, FILTER_CAPACITY};
use crate::filter::Filter;
use crate::frame::Frame;
use crate::message::{RxElement, TxElement};
use crate::peripheral::Peripheral;
use crate::registers::{
    GlobalFilterReg, HighPriorityStatusReg, InterruptFlags, NominalBitTimingReg, StandardFilterElement,
};
use crate::status::Status;
use core::cell::{Cell, RefCell};
use critical_section::Mutex;
use embedded_time::clock::Error;
use embedded_time::duration::{Duration, Fraction};
use embedded_time::fixed_point::FixedPoint;
use embedded_time::timer::param::{Armed, OneShot};
use embedded_time::{Clock, Instant, Timer};
use heapless::Deque;

/// Elements per RX FIFO
pub const RX_FIFO_DEPTH: usize = 3;

/// Elements of the TX FIFO
pub const TX_FIFO_DEPTH: usize = 3;

#[derive(Debug)]
struct State {
    /// CCCR.INIT
    initializing: bool,
    mode: OperationMode,
    auto_retransmission: bool,
    bit_timing: NominalBitTimingReg,
    global_filter: GlobalFilterReg,
    filters: [StandardFilterElement; FILTER_CAPACITY],
    line0: InterruptFlags,
    line1: InterruptFlags,
    raised: InterruptFlags,
    rx: [Deque<RxElement, RX_FIFO_DEPTH>; 2],
    tx: Deque<TxElement, TX_FIFO_DEPTH>,
    high_priority: HighPriorityStatusReg,
    timestamp: u16,
}

impl Default for State {
    fn default() -> Self {
        Self {
            initializing: true,
            mode: OperationMode::Normal,
            auto_retransmission: true,
            bit_timing: NominalBitTimingReg::new(),
            global_filter: GlobalFilterReg::new(),
            filters: [StandardFilterElement::new(); FILTER_CAPACITY],
            line0: InterruptFlags::new(),
            line1: InterruptFlags::new(),
            raised: InterruptFlags::new(),
            rx: [Deque::new(), Deque::new()],
            tx: Deque::new(),
            high_priority: HighPriorityStatusReg::new(),
            timestamp: 0,
        }
    }
}

impl State {
    fn protected(&self) -> Result<(), Status> {
        match self.initializing {
            true => Ok(()),
            false => Err(Status::Error),
        }
    }

    fn raise(&mut self, flags: InterruptFlags) {
        self.raised = self.raised.union(flags);
    }

    /// Acceptance filtering and storage, returns the FIFO the frame was stored in
    fn accept(&mut self, frame: &Frame) -> Option<RxQueue> {
        let elements = (self.global_filter.lss() as usize).min(FILTER_CAPACITY);

        let matching = self.filters[..elements]
            .iter()
            .enumerate()
            .filter_map(|(slot, element)| Filter::from_element(*element).map(|filter| (slot as u8, filter)))
            .find(|(_, filter)| filter.matches(frame.raw_id()));

        let (queue, filter_index, high_priority) = match matching {
            Some((slot, filter)) => (filter.action.queue()?, Some(slot), filter.action.is_high_priority()),
            None => match self.global_filter.anfs() {
                0b00 => (RxQueue::Fifo0, None, false),
                0b01 => (RxQueue::Fifo1, None, false),
                _ => return None,
            },
        };

        self.timestamp = self.timestamp.wrapping_add(1);
        let element = RxElement::from_frame(frame, filter_index, self.timestamp);

        let fifo = &mut self.rx[queue.index()];
        if fifo.push_back(element).is_err() {
            // Blocking mode, the new message is lost
            let lost = match queue {
                RxQueue::Fifo0 => InterruptFlags::new().with_rf0l(true),
                RxQueue::Fifo1 => InterruptFlags::new().with_rf1l(true),
            };
            self.raise(lost);

            if high_priority {
                self.high_priority = HighPriorityStatusReg::new()
                    .with_fidx(filter_index.unwrap_or(0))
                    .with_msi(0b01);
                self.raise(InterruptFlags::new().with_hpm(true));
            }

            return None;
        }

        let buffer_index = (fifo.len() - 1) as u8;
        let full = fifo.is_full();

        self.raise(InterruptFlags::rx_new_message(queue));
        if full {
            let full = match queue {
                RxQueue::Fifo0 => InterruptFlags::new().with_rf0f(true),
                RxQueue::Fifo1 => InterruptFlags::new().with_rf1f(true),
            };
            self.raise(full);
        }

        if high_priority {
            let storage = match queue {
                RxQueue::Fifo0 => 0b10,
                RxQueue::Fifo1 => 0b11,
            };

            self.high_priority = HighPriorityStatusReg::new()
                .with_fidx(filter_index.unwrap_or(0))
                .with_msi(storage)
                .with_bidx(buffer_index);
            self.raise(InterruptFlags::new().with_hpm(true));
        }

        Some(queue)
    }
}

/// In-memory FDCAN instance
pub struct ExamplePeripheral {
    state: Mutex<RefCell<State>>,
}

impl Default for ExamplePeripheral {
    fn default() -> Self {
        Self::new()
    }
}

impl ExamplePeripheral {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State::default())),
        }
    }

    /// Frame sent by another node, returns the FIFO it was stored in
    ///
    /// Ignored while in initialization mode.
    pub fn receive_from_bus(&self, frame: &Frame) -> Option<RxQueue> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.initializing {
                return None;
            }

            state.accept(frame)
        })
    }

    /// Oldest queued transmission, as seen by the other nodes
    pub fn transmit_next(&self) -> Option<Frame> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.initializing {
                return None;
            }

            let element = state.tx.pop_front()?;
            state.raise(InterruptFlags::new().with_tc(true));
            Some(element.to_frame())
        })
    }

    /// Elements waiting in the TX FIFO
    pub fn tx_pending(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).tx.len())
    }

    /// Raises interrupt flags, e.g. to simulate bus error status changes
    pub fn raise_interrupts(&self, flags: InterruptFlags) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).raise(flags));
    }

    pub fn is_initializing(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).initializing)
    }

    pub fn bit_timing(&self) -> NominalBitTimingReg {
        critical_section::with(|cs| self.state.borrow_ref(cs).bit_timing)
    }

    pub fn global_filter(&self) -> GlobalFilterReg {
        critical_section::with(|cs| self.state.borrow_ref(cs).global_filter)
    }

    /// Filter element of the given slot, `None` if the slot does not exist
    pub fn filter_element(&self, slot: u8) -> Option<StandardFilterElement> {
        critical_section::with(|cs| self.state.borrow_ref(cs).filters.get(slot as usize).copied())
    }

    /// Enabled interrupt sources of line 0 and line 1
    pub fn interrupt_lines(&self) -> (InterruptFlags, InterruptFlags) {
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            (state.line0, state.line1)
        })
    }

    pub fn operation(&self) -> (OperationMode, bool) {
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            (state.mode, state.auto_retransmission)
        })
    }
}

impl Peripheral for ExamplePeripheral {
    fn reset(&self) -> Result<(), Status> {
        critical_section::with(|cs| *self.state.borrow_ref_mut(cs) = State::default());
        Ok(())
    }

    fn write_bit_timing(&self, timing: NominalBitTimingReg) -> Result<(), Status> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.protected()?;
            state.bit_timing = timing;
            Ok(())
        })
    }

    fn write_operation(&self, mode: OperationMode, auto_retransmission: bool) -> Result<(), Status> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.protected()?;
            state.mode = mode;
            state.auto_retransmission = auto_retransmission;
            Ok(())
        })
    }

    fn write_global_filter(&self, filter: GlobalFilterReg) -> Result<(), Status> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.protected()?;
            state.global_filter = filter;
            Ok(())
        })
    }

    fn write_filter(&self, slot: u8, element: StandardFilterElement) -> Result<(), Status> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.protected()?;

            let target = state.filters.get_mut(slot as usize).ok_or(Status::Error)?;
            *target = element;
            Ok(())
        })
    }

    fn write_interrupts(&self, line0: InterruptFlags, line1: InterruptFlags) -> Result<(), Status> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.line0 = line0;
            state.line1 = line1;
            Ok(())
        })
    }

    fn start(&self) -> Result<(), Status> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).initializing = false);
        Ok(())
    }

    fn stop(&self) -> Result<(), Status> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.initializing = true;
            state.tx.clear();
        });
        Ok(())
    }

    fn pending_interrupts(&self) -> InterruptFlags {
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            state.raised.intersection(state.line0.union(state.line1))
        })
    }

    fn clear_interrupts(&self, flags: InterruptFlags) -> Result<(), Status> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.raised = state.raised.without(flags);
            Ok(())
        })
    }

    fn rx_fill_level(&self, queue: RxQueue) -> u8 {
        critical_section::with(|cs| self.state.borrow_ref(cs).rx[queue.index()].len() as u8)
    }

    fn read_rx(&self, queue: RxQueue) -> Result<RxElement, Status> {
        critical_section::with(|cs| {
            self.state.borrow_ref_mut(cs).rx[queue.index()]
                .pop_front()
                .ok_or(Status::Error)
        })
    }

    fn write_tx(&self, element: &TxElement) -> Result<(), Status> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.initializing {
                return Err(Status::Error);
            }

            if state.mode.is_loopback() {
                state.raise(InterruptFlags::new().with_tc(true));
                state.accept(&element.to_frame());
                return Ok(());
            }

            state.tx.push_back(*element).map_err(|_| Status::Busy)
        })
    }

    fn high_priority_status(&self) -> HighPriorityStatusReg {
        critical_section::with(|cs| self.state.borrow_ref(cs).high_priority)
    }
}

/// Clock advancing by a fixed number of microseconds on every reading
#[derive(Debug)]
pub struct ExampleClock {
    now: Cell<u64>,
    step: u64,
}

impl ExampleClock {
    pub fn new(step_us: u64) -> Self {
        Self {
            now: Cell::new(0),
            step: step_us,
        }
    }
}

impl Default for ExampleClock {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Clock for ExampleClock {
    type T = u64;
    const SCALING_FACTOR: Fraction = Fraction::new(1, 1_000_000);

    fn try_now(&self) -> Result<Instant<Self>, Error> {
        let now = self.now.get();
        self.now.set(now + self.step);

        Ok(Instant::new(now))
    }

    fn new_timer<Dur: Duration + FixedPoint>(&self, duration: Dur) -> Timer<OneShot, Armed, Self, Dur> {
        Timer::new(self, duration)
    }
}
