use crate::config::*;
use crate::registers::InterruptFlags;

#[test]
fn test_default_configuration() {
    let config = Configuration::default();

    assert_eq!(
        BitTiming {
            prescaler: 4,
            seg1: 8,
            seg2: 1,
            sync_jump_width: 1
        },
        config.bit_timing
    );
    assert_eq!(DefaultAction::AcceptFifo0, config.default_action);
    assert_eq!(RxInterrupts::Fifo0, config.interrupts);
    assert_eq!(OperationMode::Normal, config.mode);
    assert!(config.auto_retransmission);
}

#[test]
fn test_bit_timing_as_register() {
    let register = BitTiming::default().as_register();

    assert_eq!(3, register.nbrp());
    assert_eq!(7, register.ntseg1());
    assert_eq!(0, register.ntseg2());
    assert_eq!(0, register.nsjw());

    let register = BitTiming {
        prescaler: 512,
        seg1: 256,
        seg2: 128,
        sync_jump_width: 128,
    }
    .as_register();

    assert_eq!(511, register.nbrp());
    assert_eq!(255, register.ntseg1());
    assert_eq!(127, register.ntseg2());
    assert_eq!(127, register.nsjw());
}

#[test]
fn test_bit_timing_validation() {
    assert!(BitTiming::default().is_valid());

    let valid = BitTiming::default();
    assert!(!BitTiming { prescaler: 0, ..valid }.is_valid());
    assert!(!BitTiming { prescaler: 513, ..valid }.is_valid());
    assert!(!BitTiming { seg1: 0, ..valid }.is_valid());
    assert!(!BitTiming { seg1: 257, ..valid }.is_valid());
    assert!(!BitTiming { seg2: 0, ..valid }.is_valid());
    assert!(!BitTiming { seg2: 129, ..valid }.is_valid());
    assert!(!BitTiming {
        sync_jump_width: 0,
        ..valid
    }
    .is_valid());

    // SJW above seg2
    assert!(!BitTiming {
        sync_jump_width: 2,
        ..valid
    }
    .is_valid());
    assert!(BitTiming {
        seg2: 2,
        sync_jump_width: 2,
        ..valid
    }
    .is_valid());
}

#[test]
fn test_bit_timing_derived_values() {
    let timing = BitTiming::default();

    assert_eq!(10, timing.total_quanta());
    assert_eq!(Some(500_000), timing.bit_rate(20_000_000));
    assert_eq!(900, timing.sample_point_permille());
}

#[test]
fn test_bit_rate_of_invalid_timing() {
    let timing = BitTiming {
        prescaler: 0,
        ..BitTiming::default()
    };
    assert_eq!(None, timing.bit_rate(20_000_000));

    let timing = BitTiming {
        sync_jump_width: 2,
        seg2: 1,
        ..BitTiming::default()
    };
    assert_eq!(None, timing.bit_rate(20_000_000));
}

#[test]
fn test_bit_timing_calculate() {
    assert_eq!(
        Some(BitTiming {
            prescaler: 5,
            seg1: 6,
            seg2: 1,
            sync_jump_width: 1
        }),
        BitTiming::calculate(20_000_000, Bitrate::Kbps500)
    );

    let timing = BitTiming::calculate(80_000_000, Bitrate::Mbps1).unwrap();
    assert_eq!(
        BitTiming {
            prescaler: 5,
            seg1: 13,
            seg2: 2,
            sync_jump_width: 2
        },
        timing
    );
    assert_eq!(Some(1_000_000), timing.bit_rate(80_000_000));
    assert_eq!(875, timing.sample_point_permille());
}

#[test]
fn test_bit_timing_calculate_all_bitrates_valid() {
    for bitrate in [Bitrate::Kbps125, Bitrate::Kbps250, Bitrate::Kbps500, Bitrate::Mbps1] {
        let timing = BitTiming::calculate(40_000_000, bitrate).unwrap();

        assert!(timing.is_valid());
        assert_eq!(Some(bitrate as u32), timing.bit_rate(40_000_000));
        assert!((8..=25).contains(&timing.total_quanta()));
    }
}

#[test]
fn test_bit_timing_calculate_impossible() {
    assert_eq!(None, BitTiming::calculate(1_000_000, Bitrate::Kbps500));
    assert_eq!(None, BitTiming::calculate(1_000_000, Bitrate::Mbps1));
}

#[test]
fn test_global_filter() {
    let register = Configuration::default().as_global_filter();

    assert_eq!(28, register.lss());
    assert_eq!(0, register.lse());
    assert_eq!(0b00, register.anfs());
    assert_eq!(0b00, register.anfe());
    assert!(register.rrfs());
    assert!(register.rrfe());

    let register = Configuration {
        default_action: DefaultAction::Reject,
        ..Configuration::default()
    }
    .as_global_filter();

    assert_eq!(0b10, register.anfs());
    assert_eq!(0b10, register.anfe());

    let register = Configuration {
        default_action: DefaultAction::AcceptFifo1,
        ..Configuration::default()
    }
    .as_global_filter();

    assert_eq!(0b01, register.anfs());
}

#[test]
fn test_rx_interrupts_as_flags() {
    assert_eq!(InterruptFlags::new(), RxInterrupts::None.as_flags());

    let fifo0 = RxInterrupts::Fifo0.as_flags();
    assert!(fifo0.rf0n());
    assert!(!fifo0.rf1n());
    assert!(fifo0.hpm());

    let fifo1 = RxInterrupts::Fifo1.as_flags();
    assert!(!fifo1.rf0n());
    assert!(fifo1.rf1n());
    assert!(fifo1.hpm());

    let all = RxInterrupts::All.as_flags();
    assert!(all.rf0n());
    assert!(all.rf1n());
    assert!(all.hpm());
}

#[test]
fn test_rx_interrupts_enables() {
    assert!(!RxInterrupts::None.enables(RxQueue::Fifo0));
    assert!(!RxInterrupts::None.enables(RxQueue::Fifo1));
    assert!(RxInterrupts::Fifo0.enables(RxQueue::Fifo0));
    assert!(!RxInterrupts::Fifo0.enables(RxQueue::Fifo1));
    assert!(!RxInterrupts::Fifo1.enables(RxQueue::Fifo0));
    assert!(RxInterrupts::Fifo1.enables(RxQueue::Fifo1));
    assert!(RxInterrupts::All.enables(RxQueue::Fifo0));
    assert!(RxInterrupts::All.enables(RxQueue::Fifo1));
}

#[test]
fn test_operation_mode_is_loopback() {
    assert!(!OperationMode::Normal.is_loopback());
    assert!(OperationMode::InternalLoopback.is_loopback());
    assert!(OperationMode::ExternalLoopback.is_loopback());
}
