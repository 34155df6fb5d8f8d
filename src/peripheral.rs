//!# Hardware seam
//! Register level access to one FDCAN instance. A firmware binding implements [Peripheral] on top of the PAC
//! register block and message RAM; [crate::example::ExamplePeripheral] is a software model of the same contract.
//!
//! Every method takes `&self`: the controller is shared between task and interrupt context, so implementations
//! use interior mutability (volatile register access on hardware).
use crate::config::{OperationMode, RxQueue};
use crate::message::{RxElement, TxElement};
use crate::registers::{
    GlobalFilterReg, HighPriorityStatusReg, InterruptFlags, NominalBitTimingReg, StandardFilterElement,
};
use crate::status::Status;

pub trait Peripheral {
    /// Resets the instance and leaves it in initialization mode with configuration change enabled
    fn reset(&self) -> Result<(), Status>;

    /// Writes NBTP, only accepted in initialization mode
    fn write_bit_timing(&self, timing: NominalBitTimingReg) -> Result<(), Status>;

    /// Selects classic frame format, the test/loopback mode and automatic retransmission
    fn write_operation(&self, mode: OperationMode, auto_retransmission: bool) -> Result<(), Status>;

    /// Writes RXGFC, only accepted in initialization mode
    fn write_global_filter(&self, filter: GlobalFilterReg) -> Result<(), Status>;

    /// Writes the standard filter element at the given slot of message RAM
    fn write_filter(&self, slot: u8, element: StandardFilterElement) -> Result<(), Status>;

    /// Enables the given sources, routing `line0` to interrupt line 0 and `line1` to interrupt line 1
    fn write_interrupts(&self, line0: InterruptFlags, line1: InterruptFlags) -> Result<(), Status>;

    /// Leaves initialization mode and joins bus communication
    fn start(&self) -> Result<(), Status>;

    /// Enters initialization mode, pending transmissions are aborted
    fn stop(&self) -> Result<(), Status>;

    /// Raised and enabled interrupt flags (IR & IE)
    fn pending_interrupts(&self) -> InterruptFlags;

    /// Clears the given interrupt flags
    fn clear_interrupts(&self, flags: InterruptFlags) -> Result<(), Status>;

    /// Number of elements stored in the given RX FIFO
    fn rx_fill_level(&self, queue: RxQueue) -> u8;

    /// Reads and acknowledges the oldest element of the given RX FIFO, [Status::Error] if the FIFO is empty
    fn read_rx(&self, queue: RxQueue) -> Result<RxElement, Status>;

    /// Adds the element to the TX FIFO and requests transmission, [Status::Busy] if the FIFO is full
    fn write_tx(&self, element: &TxElement) -> Result<(), Status>;

    /// Reads HPMS
    fn high_priority_status(&self) -> HighPriorityStatusReg;
}
