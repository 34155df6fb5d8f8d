#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

//! # Driver for the FDCAN peripheral in classic CAN mode
//!
//! Crate currently offer the following features:
//! * Classic CAN 2.0 frames with standard (11-bit) identifiers
//! * Bit timing configuration and calculation
//! * Range, dual-id and mask acceptance filters routing to both RX FIFOs
//! * Interrupt dispatching to registered receive, error and high priority callbacks
//! * Bounded, interrupt safe hand-off of received frames to a receive task
//! * no_std support
//!
//! Register access is abstracted by the [peripheral::Peripheral] trait. [example::ExamplePeripheral] is a software
//! model of the peripheral used by the examples below.
//!
//!## CAN Tx/Rx example
//!
//!```
//!use fdcan_classic::can::Controller;
//!use fdcan_classic::channel::{OverflowPolicy, RxChannel, RX_CHANNEL_DEPTH};
//!use fdcan_classic::config::*;
//!use fdcan_classic::example::{ExampleClock, ExamplePeripheral};
//!use fdcan_classic::filter::{Filter, FilterAction};
//!use fdcan_classic::registry::{ControllerRegistry, Instance};
//!use fdcan_classic::task::bring_up;
//!use embedded_time::duration::Milliseconds;
//!
//!// Filled by the FDCAN1 interrupt, drained by the receive task
//!let channel: RxChannel<RX_CHANNEL_DEPTH> = RxChannel::new(OverflowPolicy::DropNewest);
//!
//!let mut registry = ControllerRegistry::new();
//!registry.register(Controller::new(Instance::Fdcan1, ExamplePeripheral::new())).unwrap();
//!let controller = registry.get(Instance::Fdcan1).unwrap();
//!
//!let config = Configuration {
//!    bit_timing: BitTiming {
//!        prescaler: 4,
//!        seg1: 8,
//!        seg2: 1,
//!        sync_jump_width: 1,
//!    },
//!    default_action: DefaultAction::Reject,
//!    interrupts: RxInterrupts::Fifo0,
//!    mode: OperationMode::InternalLoopback,
//!    auto_retransmission: true,
//!};
//!let filters = [Filter::range(0x100, 0x1FF, FilterAction::ToFifo0).unwrap()];
//!bring_up(controller, &config, &filters, &channel).unwrap();
//!
//!// Transmit CAN message
//!controller.send(0x123, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
//!
//!// FDCAN1 interrupt vector
//!registry.on_interrupt(Instance::Fdcan1).unwrap();
//!
//!// Receive task
//!let frame = channel.receive_timeout(Milliseconds(10), &ExampleClock::default()).unwrap();
//!assert_eq!(0x123, frame.raw_id());
//!assert_eq!(&[1, 2, 3, 4, 5, 6, 7, 8], frame.data());
//!```

pub mod can;
pub mod channel;
pub mod config;
mod dispatch;
pub mod driver;
pub mod filter;
pub mod frame;
pub mod message;
pub mod peripheral;
pub mod registers;
pub mod registry;
pub mod status;
pub mod task;

pub mod example;
#[cfg(test)]
extern crate alloc;
#[cfg(test)]
pub(crate) mod mocks;
#[cfg(test)]
mod tests;
