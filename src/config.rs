//!# Controller configuration
//!
//! Everything [crate::can::Controller::init] writes to the peripheral. Bit timing values are supplied by the
//! caller; [BitTiming::calculate] is available for configuration tools that start from a target bitrate.
//!
//! ```
//!# use fdcan_classic::config::*;
//! let timing = BitTiming::calculate(20_000_000, Bitrate::Kbps500).unwrap();
//! assert_eq!(Some(500_000), timing.bit_rate(20_000_000));
//! assert_eq!(875, timing.sample_point_permille());
//! ```
use crate::registers::{GlobalFilterReg, InterruptFlags, NominalBitTimingReg};
use serde::{Deserialize, Serialize};

/// Number of standard filter elements reserved in message RAM
pub const FILTER_CAPACITY: usize = 28;

/// Sample point [BitTiming::calculate] aims for, in permille of the bit time
const TARGET_SAMPLE_POINT: u32 = 875;

/// Hardware receive FIFO
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RxQueue {
    Fifo0 = 0,
    Fifo1 = 1,
}

impl RxQueue {
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// Handling of frames not matching any filter element
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DefaultAction {
    /// Accept non-matching frames into FIFO 0
    #[default]
    AcceptFifo0 = 0b00,
    /// Accept non-matching frames into FIFO 1
    AcceptFifo1 = 0b01,
    /// Reject non-matching frames
    Reject = 0b10,
}

/// Receive interrupts to enable
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RxInterrupts {
    /// Reception by polling only
    None,
    /// FIFO 0 new message
    #[default]
    Fifo0,
    /// FIFO 1 new message
    Fifo1,
    /// FIFO 0 and FIFO 1 new message
    All,
}

impl RxInterrupts {
    /// True if the new message interrupt of the FIFO is requested
    pub fn enables(&self, queue: RxQueue) -> bool {
        matches!(
            (self, queue),
            (RxInterrupts::All, _) | (RxInterrupts::Fifo0, RxQueue::Fifo0) | (RxInterrupts::Fifo1, RxQueue::Fifo1)
        )
    }

    /// Interrupt line 0 sources: requested FIFOs, plus high priority message if any FIFO is requested
    pub(crate) fn as_flags(&self) -> InterruptFlags {
        let (fifo0, fifo1) = match self {
            RxInterrupts::None => (false, false),
            RxInterrupts::Fifo0 => (true, false),
            RxInterrupts::Fifo1 => (false, true),
            RxInterrupts::All => (true, true),
        };

        InterruptFlags::new()
            .with_rf0n(fifo0)
            .with_rf1n(fifo1)
            .with_hpm(fifo0 || fifo1)
    }
}

/// Bus participation mode requested on start
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OperationMode {
    /// Regular bus operation
    #[default]
    Normal,
    /// TX looped back internally, TX pin held recessive
    InternalLoopback,
    /// TX looped back internally and driven on the TX pin
    ExternalLoopback,
}

impl OperationMode {
    pub fn is_loopback(&self) -> bool {
        !matches!(self, OperationMode::Normal)
    }
}

/// Commonly used nominal bitrates
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bitrate {
    Kbps125 = 125_000,
    Kbps250 = 250_000,
    Kbps500 = 500_000,
    Mbps1 = 1_000_000,
}

/// Nominal bit timing in time quanta
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitTiming {
    /// Kernel clock divider producing one time quantum, 1 to 512
    pub prescaler: u16,
    /// Time quanta before the sample point (propagation + phase 1), 1 to 256
    pub seg1: u16,
    /// Time quanta after the sample point, 1 to 128
    pub seg2: u8,
    /// Resynchronization jump width, 1 to 128 and at most `seg2`
    pub sync_jump_width: u8,
}

impl Default for BitTiming {
    fn default() -> Self {
        // 20 MHz kernel clock, 500 kbit/s
        Self {
            prescaler: 4,
            seg1: 8,
            seg2: 1,
            sync_jump_width: 1,
        }
    }
}

impl BitTiming {
    /// Derives a timing with 8 to 25 time quanta per bit and the sample point closest to 87.5 %
    ///
    /// Returns `None` if the kernel clock can not be divided down to the bitrate exactly.
    pub fn calculate(clock_hz: u32, bitrate: Bitrate) -> Option<Self> {
        let bitrate = bitrate as u32;
        let mut best: Option<(u32, Self)> = None;

        for prescaler in 1..=512u32 {
            let divisor = prescaler * bitrate;
            if divisor > clock_hz {
                break;
            }

            if clock_hz % divisor != 0 {
                continue;
            }

            let quanta = clock_hz / divisor;
            if !(8..=25).contains(&quanta) {
                continue;
            }

            let seg2 = ((quanta + 4) / 8).max(1);
            let seg1 = quanta - 1 - seg2;
            let timing = Self {
                prescaler: prescaler as u16,
                seg1: seg1 as u16,
                seg2: seg2 as u8,
                sync_jump_width: seg2.min(4) as u8,
            };

            let deviation = timing.sample_point_permille().abs_diff(TARGET_SAMPLE_POINT);
            if best.map_or(true, |(best_deviation, _)| deviation < best_deviation) {
                best = Some((deviation, timing));
            }
        }

        best.map(|(_, timing)| timing)
    }

    /// Time quanta per bit, including the synchronization segment
    pub fn total_quanta(&self) -> u32 {
        1 + self.seg1 as u32 + self.seg2 as u32
    }

    /// Resulting bitrate in bit/s, `None` unless [Self::is_valid]
    pub fn bit_rate(&self, clock_hz: u32) -> Option<u32> {
        if !self.is_valid() {
            return None;
        }

        Some(clock_hz / (self.prescaler as u32 * self.total_quanta()))
    }

    /// Sample point position in permille of the bit time
    pub fn sample_point_permille(&self) -> u32 {
        1000 * (1 + self.seg1 as u32) / self.total_quanta()
    }

    /// True if all values fit the NBTP register limits
    pub fn is_valid(&self) -> bool {
        (1..=512).contains(&self.prescaler)
            && (1..=256).contains(&self.seg1)
            && (1..=128).contains(&self.seg2)
            && (1..=128).contains(&self.sync_jump_width)
            && self.sync_jump_width <= self.seg2
    }

    /// Encodes the timing to register value, expects [Self::is_valid]
    pub(crate) fn as_register(&self) -> NominalBitTimingReg {
        NominalBitTimingReg::new()
            .with_nsjw(self.sync_jump_width - 1)
            .with_nbrp(self.prescaler - 1)
            .with_ntseg1((self.seg1 - 1) as u8)
            .with_ntseg2(self.seg2 - 1)
    }
}

/// Entire configuration applied by [crate::can::Controller::init]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub bit_timing: BitTiming,
    pub default_action: DefaultAction,
    pub interrupts: RxInterrupts,
    pub mode: OperationMode,
    /// Retransmit frames that lost arbitration or were disturbed by errors
    pub auto_retransmission: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            bit_timing: BitTiming::default(),
            default_action: DefaultAction::default(),
            interrupts: RxInterrupts::default(),
            mode: OperationMode::default(),
            auto_retransmission: true,
        }
    }
}

impl Configuration {
    /// Global filter register: non-matching frames follow the default action, remote frames are rejected
    pub(crate) fn as_global_filter(&self) -> GlobalFilterReg {
        GlobalFilterReg::new()
            .with_lss(FILTER_CAPACITY as u8)
            .with_lse(0)
            .with_anfs(self.default_action as u8)
            .with_anfe(self.default_action as u8)
            .with_rrfs(true)
            .with_rrfe(true)
    }
}
