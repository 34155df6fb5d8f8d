//!# Interrupt dispatching
//! Entry points called from FDCAN interrupt context. Nothing here waits, allocates or logs.
//!
//! Both interrupt lines of an instance may be bound to [Controller::on_interrupt]: line 0 carries the RX and
//! high priority message sources, line 1 the bus error status sources.
use crate::can::{CanError, Controller};
use crate::config::RxQueue;
use crate::peripheral::Peripheral;
use crate::registers::InterruptFlags;
use crate::status::HighPriorityStatus;

impl<P: Peripheral> Controller<'_, P> {
    /// Reads and clears the pending interrupt flags, then dispatches them
    ///
    /// Flags are cleared even if the controller is not running.
    pub fn on_interrupt(&self) -> Result<(), CanError> {
        let pending = self.peripheral().pending_interrupts();
        if pending.is_empty() {
            return Ok(());
        }

        self.peripheral().clear_interrupts(pending)?;
        self.dispatch(pending)
    }

    /// Handles the given interrupt reasons
    ///
    /// A new message reason reads exactly one frame from the FIFO, which is dropped if no receive callback is
    /// registered. Error status reasons are passed to the error callback, or silently discarded.
    pub fn dispatch(&self, reasons: InterruptFlags) -> Result<(), CanError> {
        self.ensure_running()?;

        let mut result = Ok(());

        for queue in [RxQueue::Fifo0, RxQueue::Fifo1] {
            if reasons.rx_pending(queue) {
                if let Err(error) = self.deliver(queue) {
                    result = Err(error);
                }
            }
        }

        let callbacks = self.callbacks();

        if reasons.hpm() {
            let status = HighPriorityStatus::from_register(self.peripheral().high_priority_status());

            if let Some(handler) = callbacks.high_priority {
                handler.on_high_priority(&status);
            }
        }

        let errors = reasons.intersection(InterruptFlags::error_status());
        if !errors.is_empty() {
            if let Some(handler) = callbacks.error {
                handler.on_error(errors);
            }
        }

        result
    }

    /// Consumes one element of the FIFO and passes the frame to the receive callback
    pub(crate) fn deliver(&self, queue: RxQueue) -> Result<(), CanError> {
        let frame = self.peripheral().read_rx(queue)?.to_frame();

        if let Some(handler) = self.callbacks().rx[queue.index()] {
            handler.on_frame(queue, &frame);
        }

        Ok(())
    }
}
