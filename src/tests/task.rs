use crate::can::{CanError, Controller};
use crate::channel::{OverflowPolicy, RxChannel, RX_CHANNEL_DEPTH};
use crate::config::{Configuration, DefaultAction, OperationMode, RxInterrupts};
use crate::example::ExamplePeripheral;
use crate::filter::{Filter, FilterAction};
use crate::frame::Frame;
use crate::message::DLC;
use crate::mocks::{MockDelay, MockFdcan};
use crate::registry::Instance;
use crate::status::{ControllerState, Status};
use crate::task::*;
use alloc::vec;
use alloc::vec::Vec;
use futures_executor::block_on;
use mockall::predicate::eq;
use mockall::Sequence;

fn running_controller<'a>(mut device: MockFdcan) -> Controller<'a, MockFdcan> {
    device.expect_configuration(1);
    device.expect_start_once();

    let controller = Controller::new(Instance::Fdcan2, device);
    controller.init(&Configuration::default()).unwrap();
    controller.start().unwrap();
    controller
}

fn delay_once() -> MockDelay {
    let mut delay = MockDelay::new();
    delay
        .expect_delay_ms()
        .with(eq(HEARTBEAT_PERIOD_MS))
        .times(1)
        .return_const(());
    delay
}

#[test]
fn test_default_layout() {
    let layout = TaskLayout::default();

    assert!(layout.validate());
    assert!(layout.rx.priority > layout.tx.priority);
    assert!(layout.rx.priority > layout.housekeeping.priority);
    assert_eq!(Priority(2), layout.rx.priority);
    assert_eq!("CanRxTask", layout.rx.name);
    assert_eq!("CanTxTask", layout.tx.name);
    assert_eq!(256, layout.tx.stack_words);

    layout.ensure_valid();
}

#[test]
fn test_layout_rx_not_preempting() {
    let layout = TaskLayout {
        rx: TaskConfig {
            priority: Priority::above_idle(1),
            ..RX_TASK
        },
        ..TaskLayout::default()
    };

    assert!(!layout.validate());
}

#[test]
fn test_layout_without_stack() {
    let layout = TaskLayout {
        housekeeping: TaskConfig {
            stack_words: 0,
            ..HOUSEKEEPING_TASK
        },
        ..TaskLayout::default()
    };

    assert!(!layout.validate());
}

#[test]
#[should_panic(expected = "Receive task must preempt transmit and housekeeping tasks")]
fn test_layout_invalid_halts() {
    let layout = TaskLayout {
        tx: TaskConfig {
            priority: Priority::above_idle(5),
            ..TX_TASK
        },
        ..TaskLayout::default()
    };

    layout.ensure_valid();
}

#[test]
fn test_rx_task_processes_in_order() {
    let channel: RxChannel<RX_CHANNEL_DEPTH> = RxChannel::default();
    channel.try_send(Frame::new(0x1, &[1]).unwrap()).unwrap();
    channel.try_send(Frame::new(0x2, &[2]).unwrap()).unwrap();

    let mut processed = Vec::new();
    let mut task = RxTask::new(&channel, |frame: Frame| processed.push(frame.raw_id()));
    block_on(task.run_once());
    block_on(task.run_once());
    drop(task);

    assert_eq!(vec![0x1, 0x2], processed);
    assert!(channel.is_empty());
}

#[test]
fn test_heartbeat_frame() {
    let frame = Heartbeat::default().next_frame().unwrap();

    assert_eq!(0x123, frame.raw_id());
    assert_eq!(&[0xDE, 0xAD, 0xBE, 0xEF, 0x11, 0x22, 0x33, 0x44], frame.data());
}

#[test]
fn test_heartbeat_invalid_id_skipped() {
    assert_eq!(None, Heartbeat::new(0x800, HEARTBEAT_PAYLOAD).next_frame());
}

#[test]
fn test_tx_task_sends_heartbeat() {
    let mut device = MockFdcan::new();
    device.expect_write_tx().times(1).returning(|element| {
        assert_eq!(0x123, element.header.standard_identifier());
        assert_eq!(DLC::Eight, element.header.data_length_code());
        assert_eq!(element.to_frame().data(), &HEARTBEAT_PAYLOAD);
        Ok(())
    });

    let controller = running_controller(device);
    let mut task = TxTask::new(controller.transmitter(), delay_once(), Heartbeat::default(), HEARTBEAT_PERIOD_MS);

    task.run_once().unwrap();
    assert_eq!(0, task.failed());
}

#[test]
fn test_tx_task_skips_failed_frame() {
    let mut device = MockFdcan::new();
    device.expect_write_tx().times(1).returning(|_| Err(Status::Busy));

    let controller = running_controller(device);
    let mut task = TxTask::new(controller.transmitter(), delay_once(), Heartbeat::default(), HEARTBEAT_PERIOD_MS);

    // Still sleeps for the period
    assert_eq!(Err(CanError::Busy), task.run_once());
    assert_eq!(1, task.failed());
}

#[test]
fn test_tx_task_not_running() {
    let mut device = MockFdcan::new();
    device.expect_configuration(1);

    let controller = Controller::new(Instance::Fdcan2, device);
    controller.init(&Configuration::default()).unwrap();

    let mut task = TxTask::new(controller.transmitter(), delay_once(), Heartbeat::default(), HEARTBEAT_PERIOD_MS);

    assert_eq!(Err(CanError::NotStarted), task.run_once());
    assert_eq!(1, task.failed());
}

#[test]
fn test_tx_task_empty_source() {
    let controller = running_controller(MockFdcan::new());

    let mut sequence = 0u8;
    let source = || {
        sequence += 1;
        match sequence % 2 {
            0 => Frame::new(0x200, &[sequence]).ok(),
            _ => None,
        }
    };

    let mut delay = MockDelay::new();
    delay.expect_delay_ms().with(eq(10)).times(1).return_const(());

    let mut task = TxTask::new(controller.transmitter(), delay, source, 10);
    task.run_once().unwrap();
    assert_eq!(0, task.failed());
}

#[test]
fn test_tx_task_sequence() {
    let mut device = MockFdcan::new();
    let mut seq = Sequence::new();

    device
        .expect_write_tx()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    device
        .expect_write_tx()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(Status::Busy));
    device
        .expect_write_tx()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));

    let mut delay = MockDelay::new();
    delay
        .expect_delay_ms()
        .with(eq(HEARTBEAT_PERIOD_MS))
        .times(3)
        .return_const(());

    let controller = running_controller(device);
    let mut task = TxTask::new(controller.transmitter(), delay, Heartbeat::default(), HEARTBEAT_PERIOD_MS);

    assert_eq!(Ok(()), task.run_once());
    assert_eq!(Err(CanError::Busy), task.run_once());
    assert_eq!(Ok(()), task.run_once());
    assert_eq!(1, task.failed());
}

#[test]
fn test_bring_up() {
    let channel: RxChannel<RX_CHANNEL_DEPTH> = RxChannel::new(OverflowPolicy::DropNewest);
    let controller = Controller::new(Instance::Fdcan1, ExamplePeripheral::new());

    let config = Configuration {
        mode: OperationMode::InternalLoopback,
        default_action: DefaultAction::Reject,
        ..Configuration::default()
    };
    let filters = [
        Filter::range(0x100, 0x1FF, FilterAction::ToFifo0).unwrap(),
        Filter::dual(0x300, 0x301, FilterAction::ToFifo0).unwrap(),
    ];

    bring_up(&controller, &config, &filters, &channel).unwrap();

    assert_eq!(ControllerState::Running, controller.state());
    assert_eq!(2, controller.filter_count());
    assert_eq!(Some(filters[1].as_element()), controller.peripheral().filter_element(1));

    controller.send(0x101, &[1]).unwrap();
    controller.on_interrupt().unwrap();
    controller.send(0x250, &[2]).unwrap();
    controller.on_interrupt().unwrap();
    controller.send(0x301, &[3]).unwrap();
    controller.on_interrupt().unwrap();

    assert_eq!(Some(Frame::new(0x101, &[1]).unwrap()), channel.try_receive());
    assert_eq!(Some(Frame::new(0x301, &[3]).unwrap()), channel.try_receive());
    assert_eq!(None, channel.try_receive());
}

#[test]
fn test_bring_up_invalid_timing() {
    let channel: RxChannel<RX_CHANNEL_DEPTH> = RxChannel::default();
    let controller = Controller::new(Instance::Fdcan1, MockFdcan::new());

    let mut config = Configuration::default();
    config.bit_timing.seg1 = 0;

    assert_eq!(
        Err(CanError::InvalidBitTiming),
        bring_up(&controller, &config, &[], &channel)
    );
    assert_eq!(ControllerState::Uninitialized, controller.state());
}

#[test]
fn test_bring_up_filter_failure() {
    let channel: RxChannel<RX_CHANNEL_DEPTH> = RxChannel::default();

    let mut device = MockFdcan::new();
    device.expect_configuration(1);
    device.expect_write_filter().times(1).returning(|_, _| Err(Status::Error));

    let controller = Controller::new(Instance::Fdcan1, device);
    let filters = [Filter::dual(0x1, 0x2, FilterAction::ToFifo1).unwrap()];

    // Not started
    assert_eq!(
        Err(CanError::Hardware(Status::Error)),
        bring_up(&controller, &Configuration::default(), &filters, &channel)
    );
    assert_eq!(ControllerState::Configured, controller.state());
}

#[test]
fn test_bring_up_fifo1() {
    let channel: RxChannel<RX_CHANNEL_DEPTH> = RxChannel::default();
    let controller = Controller::new(Instance::Fdcan1, ExamplePeripheral::new());

    let config = Configuration {
        mode: OperationMode::InternalLoopback,
        default_action: DefaultAction::Reject,
        interrupts: RxInterrupts::Fifo1,
        ..Configuration::default()
    };
    let filters = [Filter::range(0x100, 0x1FF, FilterAction::ToFifo1).unwrap()];

    bring_up(&controller, &config, &filters, &channel).unwrap();

    controller.send(0x123, &[4, 5]).unwrap();
    controller.on_interrupt().unwrap();

    assert_eq!(1, channel.len());
    assert_eq!(Some(Frame::new(0x123, &[4, 5]).unwrap()), channel.try_receive());
}

#[test]
fn test_bring_up_both_fifos() {
    let channel: RxChannel<RX_CHANNEL_DEPTH> = RxChannel::default();
    let controller = Controller::new(Instance::Fdcan1, ExamplePeripheral::new());

    let config = Configuration {
        mode: OperationMode::InternalLoopback,
        default_action: DefaultAction::Reject,
        interrupts: RxInterrupts::All,
        ..Configuration::default()
    };
    let filters = [
        Filter::dual(0x10, 0x10, FilterAction::ToFifo0).unwrap(),
        Filter::dual(0x20, 0x20, FilterAction::ToFifo1).unwrap(),
    ];

    bring_up(&controller, &config, &filters, &channel).unwrap();

    controller.send(0x20, &[2]).unwrap();
    controller.on_interrupt().unwrap();
    controller.send(0x10, &[1]).unwrap();
    controller.on_interrupt().unwrap();

    assert_eq!(Some(Frame::new(0x20, &[2]).unwrap()), channel.try_receive());
    assert_eq!(Some(Frame::new(0x10, &[1]).unwrap()), channel.try_receive());
    assert!(channel.is_empty());
}

#[test]
fn test_bring_up_without_rx_interrupts() {
    let channel: RxChannel<RX_CHANNEL_DEPTH> = RxChannel::default();
    let controller = Controller::new(Instance::Fdcan1, ExamplePeripheral::new());

    let config = Configuration {
        mode: OperationMode::InternalLoopback,
        interrupts: RxInterrupts::None,
        ..Configuration::default()
    };
    bring_up(&controller, &config, &[], &channel).unwrap();

    // Channel is only fed by the interrupt dispatcher
    assert!(controller.callbacks().rx.iter().all(Option::is_none));
}
