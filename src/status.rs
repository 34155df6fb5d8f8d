use crate::registers::HighPriorityStatusReg;
use log::error;

/// Coarse failure code of a peripheral operation
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Operation failed
    Error = 0x01,
    /// Peripheral resource unavailable, e.g. TX FIFO full
    Busy = 0x02,
    /// Bounded wait exceeded
    Timeout = 0x03,
}

/// Lifecycle state of a controller
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// Hardware not configured, callbacks released
    #[default]
    Uninitialized,
    /// Bit timing, global filter and interrupts written, filters may be added
    Configured,
    /// Taking part in bus communication
    Running,
}

/// Where the hardware stored a high priority message
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HighPriorityStorage {
    /// No FIFO selected by the matching filter
    NoFifo,
    /// FIFO message lost
    FifoOverrun,
    /// Message stored in RX FIFO 0
    Fifo0,
    /// Message stored in RX FIFO 1
    Fifo1,
}

impl HighPriorityStorage {
    pub(crate) fn from_register(msi: u8) -> Self {
        match msi & 0b11 {
            0b00 => Self::NoFifo,
            0b01 => Self::FifoOverrun,
            0b10 => Self::Fifo0,
            _ => Self::Fifo1,
        }
    }
}

/// High priority message status handed to the high priority callback
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HighPriorityStatus {
    /// Index of the filter element that flagged the message
    pub filter_index: u8,
    /// True if the flagging filter is an extended filter
    pub extended_filter: bool,
    /// FIFO the message went to
    pub storage: HighPriorityStorage,
    /// Index of the message inside its FIFO
    pub buffer_index: u8,
}

impl HighPriorityStatus {
    pub(crate) fn from_register(register: HighPriorityStatusReg) -> Self {
        Self {
            filter_index: register.fidx(),
            extended_filter: register.flst(),
            storage: HighPriorityStorage::from_register(register.msi()),
            buffer_index: register.bidx(),
        }
    }
}

/// Halts on an unrecoverable invariant violation
///
/// Firmware builds link a halting panic handler, so execution stops deterministically here.
pub fn fatal(reason: &str) -> ! {
    error!("Fatal: {reason}");
    panic!("{}", reason)
}
