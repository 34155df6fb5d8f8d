//!# FDCAN controller
//! Lifecycle, configuration and the send/receive path of one FDCAN instance.
//!
//! The controller only needs `&self` for every operation, so it can live in a `static` shared by tasks and the
//! interrupt vector. Mutable state is kept behind [critical_section::Mutex].
//!
//!```
//!# use fdcan_classic::can::Controller;
//!# use fdcan_classic::config::{Configuration, OperationMode, RxQueue};
//!# use fdcan_classic::example::ExamplePeripheral;
//!# use fdcan_classic::filter::{FilterAction, FilterKind};
//!# use fdcan_classic::frame::Frame;
//!# use fdcan_classic::registry::Instance;
//!#
//! let handler = |_queue: RxQueue, frame: &Frame| {
//!     assert_eq!(0x123, frame.raw_id());
//!     assert_eq!(&[0xDE, 0xAD, 0xBE, 0xEF], frame.data());
//! };
//!
//! let controller = Controller::new(Instance::Fdcan1, ExamplePeripheral::new());
//!
//! let config = Configuration {
//!     mode: OperationMode::InternalLoopback,
//!     ..Configuration::default()
//! };
//!
//! controller.init(&config).unwrap();
//! controller.add_filter(FilterKind::Range, FilterAction::ToFifo0, 0x100, 0x1FF).unwrap();
//! controller.register_rx_callback(RxQueue::Fifo0, &handler);
//! controller.start().unwrap();
//!
//! controller.send(0x123, &[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
//!
//! // Called by the FDCAN interrupt vector
//! controller.on_interrupt().unwrap();
//!```

use crate::config::{Configuration, RxInterrupts, RxQueue};
use crate::filter::{Filter, FilterAction, FilterKind, FilterTable};
use crate::frame::Frame;
use crate::message::TxElement;
use crate::peripheral::Peripheral;
use crate::registers::InterruptFlags;
use crate::registry::Instance;
use crate::status::{ControllerState, HighPriorityStatus, Status};
use core::cell::{Cell, RefCell};
use critical_section::Mutex;
use embedded_time::duration::Milliseconds;
use embedded_time::Clock;
use log::debug;

/// Possible errors of controller operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CanError {
    /// Instance number does not name a controller of this device or board
    UnknownInstance,
    /// Operation requires a configured controller
    NotInitialized,
    /// Operation requires a running controller
    NotStarted,
    /// Registry slot of the instance is already populated
    AlreadyInitialized,
    /// Operation not allowed while the controller is running
    AlreadyStarted,
    /// Identifier exceeds the standard 11-bit range
    InvalidIdentifier(u16),
    /// Payload longer than 8 bytes
    InvalidLength(usize),
    /// Bit timing outside of the NBTP register limits
    InvalidBitTiming,
    /// Range filter with a lower bound above the upper bound
    InvalidFilterRange { low: u16, high: u16 },
    /// All standard filter elements are in use
    FilterCapacityExhausted,
    /// FIFO is drained by the interrupt dispatcher and may not be polled
    InterruptDriven(RxQueue),
    /// TX FIFO full
    Busy,
    /// No frame received within the given timeout
    Timeout,
    /// Internal clock error
    ClockError,
    /// Peripheral rejected the operation
    Hardware(Status),
}

impl CanError {
    /// Coarse status code of this error
    pub fn status(&self) -> Status {
        match self {
            CanError::Busy => Status::Busy,
            CanError::Timeout => Status::Timeout,
            CanError::Hardware(status) => *status,
            _ => Status::Error,
        }
    }
}

impl From<Status> for CanError {
    fn from(status: Status) -> Self {
        match status {
            Status::Busy => CanError::Busy,
            Status::Timeout => CanError::Timeout,
            other => CanError::Hardware(other),
        }
    }
}

impl From<embedded_time::clock::Error> for CanError {
    fn from(_error: embedded_time::clock::Error) -> Self {
        CanError::ClockError
    }
}

impl embedded_can::Error for CanError {
    fn kind(&self) -> embedded_can::ErrorKind {
        embedded_can::ErrorKind::Other
    }
}

/// Receive callback, invoked from interrupt context for every frame read from a FIFO
pub trait RxHandler: Sync {
    fn on_frame(&self, queue: RxQueue, frame: &Frame);
}

/// Error callback, invoked from interrupt context with the raised bus-off/warning/passive flags
pub trait ErrorHandler: Sync {
    fn on_error(&self, reasons: InterruptFlags);
}

/// High priority message callback, invoked from interrupt context
pub trait HighPriorityHandler: Sync {
    fn on_high_priority(&self, status: &HighPriorityStatus);
}

impl<F: Fn(RxQueue, &Frame) + Sync> RxHandler for F {
    fn on_frame(&self, queue: RxQueue, frame: &Frame) {
        self(queue, frame)
    }
}

impl<F: Fn(InterruptFlags) + Sync> ErrorHandler for F {
    fn on_error(&self, reasons: InterruptFlags) {
        self(reasons)
    }
}

impl<F: Fn(&HighPriorityStatus) + Sync> HighPriorityHandler for F {
    fn on_high_priority(&self, status: &HighPriorityStatus) {
        self(status)
    }
}

/// Registered callbacks, copied out of the critical section before invocation
#[derive(Copy, Clone)]
pub(crate) struct Callbacks<'a> {
    pub(crate) rx: [Option<&'a dyn RxHandler>; 2],
    pub(crate) error: Option<&'a dyn ErrorHandler>,
    pub(crate) high_priority: Option<&'a dyn HighPriorityHandler>,
}

impl Callbacks<'_> {
    const fn empty() -> Self {
        Self {
            rx: [None, None],
            error: None,
            high_priority: None,
        }
    }
}

/// Controller of one FDCAN instance
pub struct Controller<'a, P: Peripheral> {
    instance: Instance,

    /// Register access
    peripheral: P,

    state: Mutex<Cell<ControllerState>>,

    /// Filter rules in slot order
    filters: Mutex<RefCell<FilterTable>>,

    callbacks: Mutex<Cell<Callbacks<'a>>>,

    /// New message interrupts enabled by the last successful init
    rx_interrupts: Mutex<Cell<RxInterrupts>>,
}

impl<'a, P: Peripheral> Controller<'a, P> {
    pub const fn new(instance: Instance, peripheral: P) -> Self {
        Self {
            instance,
            peripheral,
            state: Mutex::new(Cell::new(ControllerState::Uninitialized)),
            filters: Mutex::new(RefCell::new(FilterTable::new())),
            callbacks: Mutex::new(Cell::new(Callbacks::empty())),
            rx_interrupts: Mutex::new(Cell::new(RxInterrupts::None)),
        }
    }

    /// Resets the peripheral and applies the configuration, discarding any previous configuration and filters
    ///
    /// Must not be called while running, [Self::stop] the controller first. If the peripheral rejects any step
    /// the controller is left uninitialized.
    pub fn init(&self, config: &Configuration) -> Result<(), CanError> {
        if self.state() == ControllerState::Running {
            return Err(CanError::AlreadyStarted);
        }

        if !config.bit_timing.is_valid() {
            debug!("{:?}: rejected bit timing {:?}", self.instance, config.bit_timing);
            return Err(CanError::InvalidBitTiming);
        }

        self.set_state(ControllerState::Uninitialized);
        critical_section::with(|cs| {
            self.filters.borrow_ref_mut(cs).clear();
            self.rx_interrupts.borrow(cs).set(RxInterrupts::None);
        });

        if let Err(status) = self.configure(config) {
            debug!("{:?}: configuration failed with {status:?}", self.instance);
            return Err(status.into());
        }

        critical_section::with(|cs| {
            self.rx_interrupts.borrow(cs).set(config.interrupts);
            self.state.borrow(cs).set(ControllerState::Configured);
        });
        debug!("{:?}: configured {config:?}", self.instance);

        Ok(())
    }

    fn configure(&self, config: &Configuration) -> Result<(), Status> {
        self.peripheral.reset()?;
        self.peripheral.write_bit_timing(config.bit_timing.as_register())?;
        self.peripheral.write_operation(config.mode, config.auto_retransmission)?;
        self.peripheral.write_global_filter(config.as_global_filter())?;

        // RX on line 0, bus error status on line 1
        self.peripheral
            .write_interrupts(config.interrupts.as_flags(), InterruptFlags::error_status())
    }

    /// Adds a filter rule and returns the assigned slot
    pub fn add_filter(&self, kind: FilterKind, action: FilterAction, id1: u16, id2: u16) -> Result<u8, CanError> {
        self.add_filter_rule(Filter::new(kind, action, id1, id2)?)
    }

    /// Writes the rule to the next free filter slot, only allowed in configured state
    pub fn add_filter_rule(&self, filter: Filter) -> Result<u8, CanError> {
        match self.state() {
            ControllerState::Uninitialized => return Err(CanError::NotInitialized),
            ControllerState::Running => return Err(CanError::AlreadyStarted),
            ControllerState::Configured => {}
        }

        let slot = critical_section::with(|cs| self.filters.borrow_ref(cs).next_slot())
            .ok_or(CanError::FilterCapacityExhausted)?;

        self.peripheral.write_filter(slot, filter.as_element())?;
        critical_section::with(|cs| self.filters.borrow_ref_mut(cs).push(filter))?;

        debug!("{:?}: filter slot {slot} set to {filter:?}", self.instance);
        Ok(slot)
    }

    /// Joins bus communication, does nothing if already running
    pub fn start(&self) -> Result<(), CanError> {
        match self.state() {
            ControllerState::Uninitialized => Err(CanError::NotInitialized),
            ControllerState::Running => Ok(()),
            ControllerState::Configured => {
                self.peripheral.start()?;
                self.set_state(ControllerState::Running);

                debug!("{:?}: started", self.instance);
                Ok(())
            }
        }
    }

    /// Puts the peripheral back into initialization mode and releases filters and callbacks
    pub fn stop(&self) -> Result<(), CanError> {
        if self.state() != ControllerState::Uninitialized {
            self.peripheral.stop()?;
        }

        critical_section::with(|cs| {
            self.state.borrow(cs).set(ControllerState::Uninitialized);
            self.filters.borrow_ref_mut(cs).clear();
            self.callbacks.borrow(cs).set(Callbacks::empty());
            self.rx_interrupts.borrow(cs).set(RxInterrupts::None);
        });

        debug!("{:?}: stopped", self.instance);
        Ok(())
    }

    /// Queues a data frame for transmission
    pub fn send(&self, id: u16, data: &[u8]) -> Result<(), CanError> {
        self.ensure_running()?;
        self.write_frame(&Frame::new(id, data)?)
    }

    /// Queues an already built frame for transmission
    pub fn transmit(&self, frame: &Frame) -> Result<(), CanError> {
        self.ensure_running()?;
        self.write_frame(frame)
    }

    fn write_frame(&self, frame: &Frame) -> Result<(), CanError> {
        self.peripheral.write_tx(&TxElement::from_frame(frame))?;
        Ok(())
    }

    /// Waits for a frame in the given FIFO and hands it to the registered callback
    ///
    /// Busy-waits on the FIFO fill level, `None` waits forever. A FIFO whose new message interrupt is enabled
    /// belongs to the interrupt dispatcher and is rejected with [CanError::InterruptDriven].
    pub fn poll_receive<CLK: Clock>(
        &self,
        queue: RxQueue,
        timeout: Option<Milliseconds<u32>>,
        clock: &CLK,
    ) -> Result<(), CanError> {
        self.ensure_running()?;

        if self.rx_interrupts().enables(queue) {
            return Err(CanError::InterruptDriven(queue));
        }

        let deadline = match timeout {
            Some(timeout) => Some(clock.try_now()?.checked_add(timeout).ok_or(CanError::ClockError)?),
            None => None,
        };

        while self.peripheral.rx_fill_level(queue) == 0 {
            if let Some(deadline) = deadline {
                if clock.try_now()? > deadline {
                    debug!("{:?}: no frame in {queue:?} within timeout", self.instance);
                    return Err(CanError::Timeout);
                }
            }
        }

        self.deliver(queue)
    }

    pub fn register_rx_callback(&self, queue: RxQueue, handler: &'a dyn RxHandler) {
        self.update_callbacks(|callbacks| callbacks.rx[queue.index()] = Some(handler));
    }

    pub fn unregister_rx_callback(&self, queue: RxQueue) {
        self.update_callbacks(|callbacks| callbacks.rx[queue.index()] = None);
    }

    pub fn register_error_callback(&self, handler: &'a dyn ErrorHandler) {
        self.update_callbacks(|callbacks| callbacks.error = Some(handler));
    }

    pub fn unregister_error_callback(&self) {
        self.update_callbacks(|callbacks| callbacks.error = None);
    }

    pub fn register_hp_callback(&self, handler: &'a dyn HighPriorityHandler) {
        self.update_callbacks(|callbacks| callbacks.high_priority = Some(handler));
    }

    pub fn unregister_hp_callback(&self) {
        self.update_callbacks(|callbacks| callbacks.high_priority = None);
    }

    fn update_callbacks(&self, update: impl FnOnce(&mut Callbacks<'a>)) {
        critical_section::with(|cs| {
            let cell = self.callbacks.borrow(cs);
            let mut callbacks = cell.get();
            update(&mut callbacks);
            cell.set(callbacks);
        });
    }

    /// Handle which may only send frames
    pub fn transmitter(&self) -> Transmitter<'_, 'a, P> {
        Transmitter { controller: self }
    }

    pub fn state(&self) -> ControllerState {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    /// Number of filter slots in use
    pub fn filter_count(&self) -> usize {
        critical_section::with(|cs| self.filters.borrow_ref(cs).len())
    }

    /// New message interrupts enabled by the last successful init
    pub fn rx_interrupts(&self) -> RxInterrupts {
        critical_section::with(|cs| self.rx_interrupts.borrow(cs).get())
    }

    /// Snapshot of the filter rules in slot order
    pub fn filters(&self) -> FilterTable {
        critical_section::with(|cs| self.filters.borrow_ref(cs).clone())
    }

    fn set_state(&self, state: ControllerState) {
        critical_section::with(|cs| self.state.borrow(cs).set(state));
    }

    pub(crate) fn ensure_running(&self) -> Result<(), CanError> {
        match self.state() {
            ControllerState::Running => Ok(()),
            _ => Err(CanError::NotStarted),
        }
    }

    pub(crate) fn peripheral(&self) -> &P {
        &self.peripheral
    }

    pub(crate) fn callbacks(&self) -> Callbacks<'a> {
        critical_section::with(|cs| self.callbacks.borrow(cs).get())
    }
}

/// Send-only access to a controller, e.g. for a transmit task
pub struct Transmitter<'c, 'a, P: Peripheral> {
    controller: &'c Controller<'a, P>,
}

impl<P: Peripheral> Clone for Transmitter<'_, '_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: Peripheral> Copy for Transmitter<'_, '_, P> {}

impl<P: Peripheral> Transmitter<'_, '_, P> {
    pub fn send(&self, id: u16, data: &[u8]) -> Result<(), CanError> {
        self.controller.send(id, data)
    }

    pub fn transmit(&self, frame: &Frame) -> Result<(), CanError> {
        self.controller.transmit(frame)
    }

    pub fn instance(&self) -> Instance {
        self.controller.instance()
    }
}
