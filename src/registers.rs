#![allow(unused_braces)]
use crate::config::RxQueue;
use modular_bitfield_msb::prelude::*;

#[bitfield]
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
/// Nominal bit timing and prescaler register (NBTP), all fields hold `value - 1`
pub struct NominalBitTimingReg {
    /// Nominal (re)synchronization jump width
    pub nsjw: B7,
    /// Bit rate prescaler
    pub nbrp: B9,
    /// Time segment before sample point
    pub ntseg1: B8,
    #[skip]
    __: B1,
    /// Time segment after sample point
    pub ntseg2: B7,
}

#[bitfield]
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
/// Global filter configuration register (RXGFC)
pub struct GlobalFilterReg {
    #[skip]
    __: B4,
    /// Number of extended filter elements in the list
    pub lse: B4,
    #[skip]
    __: B3,
    /// Number of standard filter elements in the list
    pub lss: B5,
    #[skip]
    __: B6,
    /// FIFO 0 overwrite mode
    pub f0om: bool,
    /// FIFO 1 overwrite mode
    pub f1om: bool,
    #[skip]
    __: B2,
    /// Accept non-matching standard frames
    pub anfs: B2,
    /// Accept non-matching extended frames
    pub anfe: B2,
    /// Reject all standard remote frames
    pub rrfs: bool,
    /// Reject all extended remote frames
    pub rrfe: bool,
}

#[bitfield]
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
/// Standard message ID filter element in message RAM
pub struct StandardFilterElement {
    /// Filter type
    pub sft: B2,
    /// Filter element configuration
    pub sfec: B3,
    /// First ID of the filter element
    pub sfid1: B11,
    #[skip]
    __: B5,
    /// Second ID of the filter element
    pub sfid2: B11,
}

#[bitfield]
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
/// Interrupt register layout shared by IR, IE and ILS
pub struct InterruptFlags {
    #[skip]
    __: B8,
    /// Access to reserved address
    pub ara: bool,
    /// Protocol error in data phase
    pub ped: bool,
    /// Protocol error in arbitration phase
    pub pea: bool,
    /// Watchdog interrupt
    pub wdi: bool,
    /// Bus-off status changed
    pub bo: bool,
    /// Error warning status changed
    pub ew: bool,
    /// Error passive status changed
    pub ep: bool,
    /// Error logging overflow
    pub elo: bool,
    /// Timeout occurred
    pub too: bool,
    /// Message RAM access failure
    pub mraf: bool,
    /// Timestamp wraparound
    pub tsw: bool,
    /// TX event FIFO element lost
    pub tefl: bool,
    /// TX event FIFO full
    pub teff: bool,
    /// TX event FIFO new entry
    pub tefn: bool,
    /// TX FIFO empty
    pub tfe: bool,
    /// Transmission cancellation finished
    pub tcf: bool,
    /// Transmission completed
    pub tc: bool,
    /// High priority message
    pub hpm: bool,
    /// RX FIFO 1 message lost
    pub rf1l: bool,
    /// RX FIFO 1 full
    pub rf1f: bool,
    /// RX FIFO 1 new message
    pub rf1n: bool,
    /// RX FIFO 0 message lost
    pub rf0l: bool,
    /// RX FIFO 0 full
    pub rf0f: bool,
    /// RX FIFO 0 new message
    pub rf0n: bool,
}

impl InterruptFlags {
    /// New message flag of the given RX FIFO
    pub fn rx_new_message(queue: RxQueue) -> Self {
        match queue {
            RxQueue::Fifo0 => Self::new().with_rf0n(true),
            RxQueue::Fifo1 => Self::new().with_rf1n(true),
        }
    }

    /// Bus-off, error warning and error passive
    pub fn error_status() -> Self {
        Self::new().with_bo(true).with_ew(true).with_ep(true)
    }

    pub fn union(self, other: Self) -> Self {
        Self::from(u32::from(self) | u32::from(other))
    }

    pub fn intersection(self, other: Self) -> Self {
        Self::from(u32::from(self) & u32::from(other))
    }

    pub fn without(self, other: Self) -> Self {
        Self::from(u32::from(self) & !u32::from(other))
    }

    pub fn is_empty(self) -> bool {
        u32::from(self) == 0
    }

    /// True if the new message flag of the given RX FIFO is set
    pub fn rx_pending(self, queue: RxQueue) -> bool {
        match queue {
            RxQueue::Fifo0 => self.rf0n(),
            RxQueue::Fifo1 => self.rf1n(),
        }
    }
}

#[bitfield]
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
/// High priority message status register (HPMS)
pub struct HighPriorityStatusReg {
    #[skip]
    __: B16,
    /// Filter list, set for the extended filter list
    pub flst: bool,
    #[skip]
    __: B2,
    /// Filter index
    pub fidx: B5,
    /// Message storage indicator
    pub msi: B2,
    #[skip]
    __: B3,
    /// Buffer index
    pub bidx: B3,
}
