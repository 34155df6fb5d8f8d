//!# Interrupt to task hand-off
//! [RxChannel] is a bounded FIFO of frames filled from interrupt context and drained by a receive task.
//! The producer side never blocks: when the channel is full the configured [OverflowPolicy] decides which frame
//! is dropped, and the drop is counted.
//!
//! The consumer suspends in [RxChannel::receive] until the interrupt enqueues a frame and wakes it. Targets
//! without an executor poll with [RxChannel::try_receive] or [RxChannel::receive_timeout].
//!
//! ```
//!# use fdcan_classic::channel::{OverflowPolicy, RxChannel};
//!# use fdcan_classic::frame::Frame;
//!# use futures_executor::block_on;
//! let channel: RxChannel<2> = RxChannel::new(OverflowPolicy::DropNewest);
//!
//! channel.try_send(Frame::new(0x1, &[1]).unwrap()).unwrap();
//! channel.try_send(Frame::new(0x2, &[2]).unwrap()).unwrap();
//! assert!(channel.try_send(Frame::new(0x3, &[3]).unwrap()).is_err());
//!
//! assert_eq!(1, channel.dropped());
//! assert_eq!(0x1, block_on(channel.receive()).raw_id());
//! assert_eq!(0x2, block_on(channel.receive()).raw_id());
//! assert!(channel.try_receive().is_none());
//! ```
use crate::can::{CanError, RxHandler};
use crate::config::RxQueue;
use crate::frame::Frame;
use core::cell::{Cell, RefCell};
use core::future::poll_fn;
use core::task::{Context, Poll};
use critical_section::Mutex;
use embassy_sync::waitqueue::WakerRegistration;
use embedded_time::duration::Milliseconds;
use embedded_time::Clock;
use heapless::Deque;

/// Channel depth of the receive path
pub const RX_CHANNEL_DEPTH: usize = 10;

/// Frame dropped when sending to a full channel
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Keep the buffered frames and reject the new one
    #[default]
    DropNewest,
    /// Evict the oldest buffered frame to make room for the new one
    DropOldest,
}

struct State<const N: usize> {
    frames: Deque<Frame, N>,
    /// Task suspended in receive
    consumer: WakerRegistration,
}

pub struct RxChannel<const N: usize> {
    state: Mutex<RefCell<State<N>>>,
    dropped: Mutex<Cell<u32>>,
    policy: OverflowPolicy,
}

impl<const N: usize> Default for RxChannel<N> {
    fn default() -> Self {
        Self::new(OverflowPolicy::default())
    }
}

impl<const N: usize> RxChannel<N> {
    pub const fn new(policy: OverflowPolicy) -> Self {
        Self {
            state: Mutex::new(RefCell::new(State {
                frames: Deque::new(),
                consumer: WakerRegistration::new(),
            })),
            dropped: Mutex::new(Cell::new(0)),
            policy,
        }
    }

    /// Enqueues without blocking and wakes the consumer, safe to call from interrupt context
    ///
    /// On a full channel the dropped frame is returned: the new one for [OverflowPolicy::DropNewest], the evicted
    /// oldest one for [OverflowPolicy::DropOldest].
    pub fn try_send(&self, frame: Frame) -> Result<(), Frame> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.consumer.wake();

            let frame = match state.frames.push_back(frame) {
                Ok(()) => return Ok(()),
                Err(frame) => frame,
            };

            let dropped = self.dropped.borrow(cs);
            dropped.set(dropped.get().wrapping_add(1));

            match self.policy {
                OverflowPolicy::DropNewest => Err(frame),
                OverflowPolicy::DropOldest => match state.frames.pop_front() {
                    Some(oldest) => {
                        // Room was just made
                        let _ = state.frames.push_back(frame);
                        Err(oldest)
                    }
                    None => Err(frame),
                },
            }
        })
    }

    /// Oldest frame, if any
    pub fn try_receive(&self) -> Option<Frame> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).frames.pop_front())
    }

    /// Oldest frame, or registers the task for wake-up by the next [Self::try_send]
    pub fn poll_receive(&self, cx: &mut Context<'_>) -> Poll<Frame> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);

            match state.frames.pop_front() {
                Some(frame) => Poll::Ready(frame),
                None => {
                    state.consumer.register(cx.waker());
                    Poll::Pending
                }
            }
        })
    }

    /// Suspends the calling task until a frame is available
    pub async fn receive(&self) -> Frame {
        poll_fn(|cx| self.poll_receive(cx)).await
    }

    /// Spins until a frame is available or the timeout expired, for targets without an executor
    pub fn receive_timeout<CLK: Clock>(&self, timeout: Milliseconds<u32>, clock: &CLK) -> Result<Frame, CanError> {
        let deadline = clock.try_now()?.checked_add(timeout).ok_or(CanError::ClockError)?;

        loop {
            if let Some(frame) = self.try_receive() {
                return Ok(frame);
            }

            if clock.try_now()? > deadline {
                return Err(CanError::Timeout);
            }
        }
    }

    pub fn len(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).frames.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Frames dropped because the channel was full, wraps around
    pub fn dropped(&self) -> u32 {
        critical_section::with(|cs| self.dropped.borrow(cs).get())
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }
}

impl<const N: usize> RxHandler for RxChannel<N> {
    fn on_frame(&self, _queue: RxQueue, frame: &Frame) {
        // Counted in dropped()
        let _ = self.try_send(*frame);
    }
}
