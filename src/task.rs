//!# Receive and transmit tasks
//! Bodies of the two scheduled tasks around a controller, plus their priorities. The receive task drains the
//! [RxChannel] filled by the interrupt dispatcher and must preempt the transmit and housekeeping tasks, so the
//! channel rarely saturates.
//!
//! ```
//!# use fdcan_classic::can::Controller;
//!# use futures_executor::block_on;
//!# use fdcan_classic::channel::{OverflowPolicy, RxChannel, RX_CHANNEL_DEPTH};
//!# use fdcan_classic::config::{Configuration, OperationMode};
//!# use fdcan_classic::example::ExamplePeripheral;
//!# use fdcan_classic::frame::Frame;
//!# use fdcan_classic::registry::Instance;
//!# use fdcan_classic::task::{bring_up, RxTask, TaskLayout};
//! let channel: RxChannel<RX_CHANNEL_DEPTH> = RxChannel::new(OverflowPolicy::DropNewest);
//! let controller = Controller::new(Instance::Fdcan1, ExamplePeripheral::new());
//!
//! TaskLayout::default().ensure_valid();
//!
//! let config = Configuration {
//!     mode: OperationMode::InternalLoopback,
//!     ..Configuration::default()
//! };
//! bring_up(&controller, &config, &[], &channel).unwrap();
//!
//! controller.send(0x42, &[1, 2, 3]).unwrap();
//! controller.on_interrupt().unwrap();
//!
//! let mut received = None;
//! let mut rx_task = RxTask::new(&channel, |frame: Frame| received = Some(frame));
//! block_on(rx_task.run_once());
//! drop(rx_task);
//!
//! assert_eq!(Some(0x42), received.map(|frame| frame.raw_id()));
//! ```
use crate::can::{CanError, Controller, Transmitter};
use crate::channel::RxChannel;
use crate::config::{Configuration, RxQueue};
use crate::filter::Filter;
use crate::frame::Frame;
use crate::peripheral::Peripheral;
use crate::status::fatal;
use embedded_hal::delay::DelayNs;
use log::{debug, warn};

pub const HEARTBEAT_ID: u16 = 0x123;

pub const HEARTBEAT_PAYLOAD: [u8; 8] = [0xDE, 0xAD, 0xBE, 0xEF, 0x11, 0x22, 0x33, 0x44];

pub const HEARTBEAT_PERIOD_MS: u32 = 900;

/// Fixed task priority relative to the idle task, higher preempts lower
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub u8);

impl Priority {
    pub const IDLE: Priority = Priority(0);

    pub const fn above_idle(levels: u8) -> Self {
        Priority(Self::IDLE.0 + levels)
    }
}

/// Static parameters of a task
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskConfig {
    pub name: &'static str,
    pub priority: Priority,
    /// Stack size in words
    pub stack_words: usize,
}

pub const RX_TASK: TaskConfig = TaskConfig {
    name: "CanRxTask",
    priority: Priority::above_idle(2),
    stack_words: 256,
};

pub const TX_TASK: TaskConfig = TaskConfig {
    name: "CanTxTask",
    priority: Priority::above_idle(1),
    stack_words: 256,
};

pub const HOUSEKEEPING_TASK: TaskConfig = TaskConfig {
    name: "BlinkTask",
    priority: Priority::above_idle(1),
    stack_words: 256,
};

/// Tasks created at start-up
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskLayout {
    pub rx: TaskConfig,
    pub tx: TaskConfig,
    pub housekeeping: TaskConfig,
}

impl Default for TaskLayout {
    fn default() -> Self {
        Self {
            rx: RX_TASK,
            tx: TX_TASK,
            housekeeping: HOUSEKEEPING_TASK,
        }
    }
}

impl TaskLayout {
    /// True if the receive task preempts both other tasks and every task has a stack
    pub fn validate(&self) -> bool {
        self.rx.priority > self.tx.priority
            && self.rx.priority > self.housekeeping.priority
            && [self.rx, self.tx, self.housekeeping]
                .iter()
                .all(|task| task.stack_words > 0)
    }

    /// Halts if the layout is invalid
    pub fn ensure_valid(&self) {
        if !self.validate() {
            fatal("Receive task must preempt transmit and housekeeping tasks");
        }
    }
}

/// Application processing of received frames, runs in task context
pub trait FrameProcessor {
    fn process(&mut self, frame: Frame);
}

impl<F: FnMut(Frame)> FrameProcessor for F {
    fn process(&mut self, frame: Frame) {
        self(frame)
    }
}

/// Consumer of the receive channel, suspended while the channel is empty
pub struct RxTask<'c, const N: usize, F: FrameProcessor> {
    channel: &'c RxChannel<N>,
    processor: F,
}

impl<'c, const N: usize, F: FrameProcessor> RxTask<'c, N, F> {
    pub fn new(channel: &'c RxChannel<N>, processor: F) -> Self {
        Self { channel, processor }
    }

    /// Waits for the next frame and processes it
    pub async fn run_once(&mut self) {
        let frame = self.channel.receive().await;
        self.processor.process(frame);
    }

    pub async fn run(mut self) -> ! {
        loop {
            self.run_once().await;
        }
    }
}

/// Producer of frames for the transmit task, `None` skips a period
pub trait FrameSource {
    fn next_frame(&mut self) -> Option<Frame>;
}

impl<F: FnMut() -> Option<Frame>> FrameSource for F {
    fn next_frame(&mut self) -> Option<Frame> {
        self()
    }
}

/// Same frame every period
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Heartbeat {
    id: u16,
    payload: [u8; 8],
}

impl Heartbeat {
    pub fn new(id: u16, payload: [u8; 8]) -> Self {
        Self { id, payload }
    }
}

impl Default for Heartbeat {
    fn default() -> Self {
        Self::new(HEARTBEAT_ID, HEARTBEAT_PAYLOAD)
    }
}

impl FrameSource for Heartbeat {
    fn next_frame(&mut self) -> Option<Frame> {
        Frame::new(self.id, &self.payload).ok()
    }
}

/// Periodic sender
pub struct TxTask<'c, 'a, P: Peripheral, D: DelayNs, S: FrameSource> {
    transmitter: Transmitter<'c, 'a, P>,
    delay: D,
    source: S,
    period_ms: u32,
    failed: u32,
}

impl<'c, 'a, P: Peripheral, D: DelayNs, S: FrameSource> TxTask<'c, 'a, P, D, S> {
    pub fn new(transmitter: Transmitter<'c, 'a, P>, delay: D, source: S, period_ms: u32) -> Self {
        Self {
            transmitter,
            delay,
            source,
            period_ms,
            failed: 0,
        }
    }

    /// Sends the next frame, if any, and sleeps for one period
    ///
    /// A failed send is logged and the frame skipped, the error is returned for inspection only.
    pub fn run_once(&mut self) -> Result<(), CanError> {
        let result = match self.source.next_frame() {
            Some(frame) => self.transmitter.transmit(&frame),
            None => Ok(()),
        };

        if let Err(error) = result {
            self.failed = self.failed.wrapping_add(1);
            warn!("{:?}: dropped TX frame: {error:?}", self.transmitter.instance());
        }

        self.delay.delay_ms(self.period_ms);
        result
    }

    pub fn run(mut self) -> ! {
        loop {
            let _ = self.run_once();
        }
    }

    /// Frames that could not be queued
    pub fn failed(&self) -> u32 {
        self.failed
    }
}

/// Brings a controller up for interrupt driven reception into the channel
///
/// Configures the controller, adds the filters in order, registers the channel as receive callback of every FIFO
/// with an enabled new message interrupt and starts the controller.
pub fn bring_up<'a, P: Peripheral, const N: usize>(
    controller: &Controller<'a, P>,
    config: &Configuration,
    filters: &[Filter],
    channel: &'a RxChannel<N>,
) -> Result<(), CanError> {
    controller.init(config)?;

    for filter in filters {
        controller.add_filter_rule(*filter)?;
    }

    for queue in [RxQueue::Fifo0, RxQueue::Fifo1] {
        if config.interrupts.enables(queue) {
            controller.register_rx_callback(queue, channel);
        }
    }
    controller.start()?;

    debug!("{:?}: up with {} filters", controller.instance(), filters.len());
    Ok(())
}
