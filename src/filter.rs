//!# Acceptance filters
//! A [Filter] routes standard identifiers to one of the two RX FIFOs or rejects them. The FDCAN message RAM
//! holds [FILTER_CAPACITY] standard filter elements, the element with the lowest slot index that matches decides.
//! Frames matching no element follow the global [crate::config::DefaultAction].
//!
//! ```
//!# use fdcan_classic::filter::{Filter, FilterAction, FilterTable};
//! let mut table = FilterTable::new();
//!
//! // 0x100..=0x1FF to FIFO 0
//! table.push(Filter::range(0x100, 0x1FF, FilterAction::ToFifo0).unwrap()).unwrap();
//! // 0x2X0 to FIFO 1
//! table.push(Filter::mask(0x200, 0x70F, FilterAction::ToFifo1).unwrap()).unwrap();
//!
//! assert_eq!(Some(0), table.route(0x180).map(|(slot, _)| slot));
//! assert_eq!(Some(1), table.route(0x2A0).map(|(slot, _)| slot));
//! assert!(table.route(0x2A1).is_none());
//! ```
use crate::can::CanError;
use crate::config::{RxQueue, FILTER_CAPACITY};
use crate::message::STANDARD_IDENTIFIER_MASK;
use crate::registers::StandardFilterElement;
use heapless::Vec;
use serde::{Deserialize, Serialize};

/// Standard filter type (SFT)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterKind {
    /// Matches `id1 <= id <= id2`
    Range = 0b00,
    /// Matches `id == id1 || id == id2`
    Dual = 0b01,
    /// Matches `id & id2 == id1 & id2`, `id2` being the mask
    Mask = 0b10,
}

/// Standard filter element configuration (SFEC)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterAction {
    ToFifo0 = 0b001,
    ToFifo1 = 0b010,
    Reject = 0b011,
    /// Store in FIFO 0 and raise the high priority message interrupt
    ToFifo0HighPriority = 0b101,
    /// Store in FIFO 1 and raise the high priority message interrupt
    ToFifo1HighPriority = 0b110,
}

impl FilterAction {
    /// Target FIFO of accepted frames, `None` for [FilterAction::Reject]
    pub fn queue(&self) -> Option<RxQueue> {
        match self {
            FilterAction::ToFifo0 | FilterAction::ToFifo0HighPriority => Some(RxQueue::Fifo0),
            FilterAction::ToFifo1 | FilterAction::ToFifo1HighPriority => Some(RxQueue::Fifo1),
            FilterAction::Reject => None,
        }
    }

    pub fn is_high_priority(&self) -> bool {
        matches!(self, FilterAction::ToFifo0HighPriority | FilterAction::ToFifo1HighPriority)
    }

    fn from_register(sfec: u8) -> Option<Self> {
        match sfec {
            0b001 => Some(FilterAction::ToFifo0),
            0b010 => Some(FilterAction::ToFifo1),
            0b011 => Some(FilterAction::Reject),
            0b101 => Some(FilterAction::ToFifo0HighPriority),
            0b110 => Some(FilterAction::ToFifo1HighPriority),
            _ => None,
        }
    }
}

/// Standard identifier filter rule
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub kind: FilterKind,
    pub action: FilterAction,
    pub id1: u16,
    pub id2: u16,
}

impl Filter {
    /// Validates both identifiers and, for [FilterKind::Range], the bound order
    pub fn new(kind: FilterKind, action: FilterAction, id1: u16, id2: u16) -> Result<Self, CanError> {
        for id in [id1, id2] {
            if id > STANDARD_IDENTIFIER_MASK {
                return Err(CanError::InvalidIdentifier(id));
            }
        }

        if kind == FilterKind::Range && id1 > id2 {
            return Err(CanError::InvalidFilterRange { low: id1, high: id2 });
        }

        Ok(Self { kind, action, id1, id2 })
    }

    pub fn range(low: u16, high: u16, action: FilterAction) -> Result<Self, CanError> {
        Self::new(FilterKind::Range, action, low, high)
    }

    pub fn dual(first: u16, second: u16, action: FilterAction) -> Result<Self, CanError> {
        Self::new(FilterKind::Dual, action, first, second)
    }

    pub fn mask(id: u16, mask: u16, action: FilterAction) -> Result<Self, CanError> {
        Self::new(FilterKind::Mask, action, id, mask)
    }

    /// True if the standard identifier matches this rule, independent of the action
    pub fn matches(&self, id: u16) -> bool {
        match self.kind {
            FilterKind::Range => self.id1 <= id && id <= self.id2,
            FilterKind::Dual => id == self.id1 || id == self.id2,
            FilterKind::Mask => id & self.id2 == self.id1 & self.id2,
        }
    }

    pub(crate) fn as_element(&self) -> StandardFilterElement {
        StandardFilterElement::new()
            .with_sft(self.kind as u8)
            .with_sfec(self.action as u8)
            .with_sfid1(self.id1)
            .with_sfid2(self.id2)
    }

    /// Decodes a message RAM element, `None` for disabled elements and configurations not storing frames
    pub fn from_element(element: StandardFilterElement) -> Option<Self> {
        let kind = match element.sft() {
            0b00 => FilterKind::Range,
            0b01 => FilterKind::Dual,
            0b10 => FilterKind::Mask,
            _ => return None,
        };

        Some(Self {
            kind,
            action: FilterAction::from_register(element.sfec())?,
            id1: element.sfid1(),
            id2: element.sfid2(),
        })
    }
}

/// Ordered filter rules of one controller, the position in the table is the hardware slot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterTable {
    filters: Vec<Filter, FILTER_CAPACITY>,
}

impl FilterTable {
    pub const fn new() -> Self {
        Self { filters: Vec::new() }
    }

    /// Appends the rule and returns its slot, the table is left untouched when full
    pub fn push(&mut self, filter: Filter) -> Result<u8, CanError> {
        let slot = self.filters.len() as u8;
        self.filters
            .push(filter)
            .map_err(|_| CanError::FilterCapacityExhausted)?;

        Ok(slot)
    }

    /// Slot the next rule would be assigned, `None` if the table is full
    pub fn next_slot(&self) -> Option<u8> {
        if self.filters.is_full() {
            return None;
        }

        Some(self.filters.len() as u8)
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn as_slice(&self) -> &[Filter] {
        &self.filters
    }

    /// First rule matching the identifier together with its slot
    pub fn route(&self, id: u16) -> Option<(u8, &Filter)> {
        self.filters
            .iter()
            .enumerate()
            .find(|(_, filter)| filter.matches(id))
            .map(|(slot, filter)| (slot as u8, filter))
    }
}
