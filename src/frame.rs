//!# Classic CAN frame
//! Standard (11-bit) identifier, up to 8 data bytes, data frames only.
//!
//! ```
//!# use fdcan_classic::frame::Frame;
//! let frame = Frame::new(0x123, &[0xDE, 0xAD]).unwrap();
//! assert_eq!(0x123, frame.raw_id());
//! assert_eq!(&[0xDE, 0xAD], frame.data());
//! ```
use crate::can::CanError;
use crate::message::MAX_PAYLOAD_CAN_2_0;
use embedded_can::{Id, StandardId};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Frame {
    id: StandardId,
    len: u8,
    data: [u8; MAX_PAYLOAD_CAN_2_0],
}

impl Frame {
    /// Creates a data frame, fails on identifiers above 0x7FF or more than 8 bytes
    pub fn new(id: u16, data: &[u8]) -> Result<Self, CanError> {
        let id = StandardId::new(id).ok_or(CanError::InvalidIdentifier(id))?;

        Self::with_id(id, data).ok_or(CanError::InvalidLength(data.len()))
    }

    fn with_id(id: StandardId, data: &[u8]) -> Option<Self> {
        if data.len() > MAX_PAYLOAD_CAN_2_0 {
            return None;
        }

        let mut frame = Self {
            id,
            len: data.len() as u8,
            data: [0; MAX_PAYLOAD_CAN_2_0],
        };
        frame.data[..data.len()].copy_from_slice(data);
        Some(frame)
    }

    /// Builds a frame from a raw payload buffer, bytes past `len` are zeroed
    pub(crate) fn from_raw(id: StandardId, len: u8, payload: &[u8; MAX_PAYLOAD_CAN_2_0]) -> Self {
        let len = len.min(MAX_PAYLOAD_CAN_2_0 as u8);
        let mut data = [0; MAX_PAYLOAD_CAN_2_0];
        data[..len as usize].copy_from_slice(&payload[..len as usize]);

        Self { id, len, data }
    }

    pub fn id(&self) -> StandardId {
        self.id
    }

    pub fn raw_id(&self) -> u16 {
        self.id.as_raw()
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Meaningful payload bytes
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Full payload buffer as stored in message RAM
    pub(crate) fn payload(&self) -> &[u8; MAX_PAYLOAD_CAN_2_0] {
        &self.data
    }
}

impl embedded_can::Frame for Frame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Standard(id) => Self::with_id(id, data),
            Id::Extended(_) => None,
        }
    }

    /// Remote frames are always rejected by this driver
    fn new_remote(_id: impl Into<Id>, _dlc: usize) -> Option<Self> {
        None
    }

    fn is_extended(&self) -> bool {
        false
    }

    fn is_remote_frame(&self) -> bool {
        false
    }

    fn id(&self) -> Id {
        Id::Standard(self.id)
    }

    fn dlc(&self) -> usize {
        self.len as usize
    }

    fn data(&self) -> &[u8] {
        Frame::data(self)
    }
}
