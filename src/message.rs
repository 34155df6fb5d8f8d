//!# Message RAM elements
//! RX FIFO and TX FIFO elements as laid out in FDCAN message RAM: two header words followed by the payload words.
//! Only classic frames with standard identifiers are produced; received elements with a DLC above 8 are
//! truncated to 8 bytes.
//!
//! ```
//!# use fdcan_classic::frame::Frame;
//!# use fdcan_classic::message::{TxElement, DLC};
//! let frame = Frame::new(0x123, &[1, 2, 3]).unwrap();
//! let element = TxElement::from_frame(&frame);
//!
//! assert_eq!(0x123, element.header.standard_identifier());
//! assert_eq!(DLC::Three, element.header.data_length_code());
//! assert_eq!(frame, element.to_frame());
//! ```

use crate::frame::Frame;
use byteorder::{ByteOrder, LittleEndian};
use embedded_can::StandardId;
use modular_bitfield_msb::prelude::*;

pub const STANDARD_IDENTIFIER_MASK: u16 = 0x7FF;

pub const MAX_PAYLOAD_CAN_2_0: usize = 8;

/// Data length code
#[derive(BitfieldSpecifier, Debug, Eq, PartialEq, Ord, PartialOrd, Copy, Clone)]
#[allow(clippy::upper_case_acronyms)]
#[bits = 4]
pub enum DLC {
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Twelve,
    Sixteen,
    Twenty,
    TwentyFour,
    ThirtyTwo,
    FortyEight,
    SixtyFour,
}

impl DLC {
    /// Data length code of a classic payload, lengths above 8 are capped
    pub fn from_length(value: usize) -> Self {
        match value {
            0 => Self::Zero,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            4 => Self::Four,
            5 => Self::Five,
            6 => Self::Six,
            7 => Self::Seven,
            _ => Self::Eight,
        }
    }

    /// Payload length of a classic frame, codes above 8 mean 8 bytes
    pub fn classic_length(&self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::Two => 2,
            Self::Three => 3,
            Self::Four => 4,
            Self::Five => 5,
            Self::Six => 6,
            Self::Seven => 7,
            _ => 8,
        }
    }
}

/// Transmit element header (T0, T1)
#[bitfield(bits = 64)]
#[derive(BitfieldSpecifier, Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct TxHeader {
    // T0
    /// Error state indicator, recessive when set
    pub error_state_indicator: bool,
    /// Extended identifier flag
    pub extended_identifier_flag: bool,
    /// Remote transmission request
    pub remote_transmission_request: bool,
    /// Standard identifier
    pub standard_identifier: B11,
    /// Lower 18 bits of an extended identifier, unused for standard frames
    pub extended_identifier: B18,
    // T1
    /// Marker copied into the TX event FIFO
    pub message_marker: B8,
    /// Store TX events
    pub event_fifo_control: bool,
    #[skip]
    __: B1,
    /// FD format
    pub fd_frame: bool,
    /// Bit rate switching
    pub bit_rate_switch: bool,
    /// Data length code
    pub data_length_code: DLC,
    #[skip]
    __: B16,
}

/// Receive element header (R0, R1)
#[bitfield(bits = 64)]
#[derive(BitfieldSpecifier, Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct RxHeader {
    // R0
    /// Error state indicator of the transmitter
    pub error_state_indicator: bool,
    /// Extended identifier flag
    pub extended_identifier_flag: bool,
    /// Remote transmission request
    pub remote_transmission_request: bool,
    /// Standard identifier
    pub standard_identifier: B11,
    /// Lower 18 bits of an extended identifier
    pub extended_identifier: B18,
    // R1
    /// Set if the frame matched no filter and was accepted by the global filter
    pub accepted_non_matching: bool,
    /// Index of the matching filter element
    pub filter_index: B7,
    #[skip]
    __: B2,
    /// FD format
    pub fd_frame: bool,
    /// Bit rate switching
    pub bit_rate_switch: bool,
    /// Data length code
    pub data_length_code: DLC,
    /// RX timestamp
    pub timestamp: B16,
}

/// Element read from an RX FIFO
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct RxElement {
    pub header: RxHeader,
    pub data: [u32; 2],
}

impl RxElement {
    /// Element as stored by the acceptance filtering for the given frame
    pub fn from_frame(frame: &Frame, filter_index: Option<u8>, timestamp: u16) -> Self {
        let header = RxHeader::new()
            .with_standard_identifier(frame.raw_id())
            .with_data_length_code(DLC::from_length(frame.len()))
            .with_accepted_non_matching(filter_index.is_none())
            .with_filter_index(filter_index.unwrap_or(0) & 0x7F)
            .with_timestamp(timestamp);

        Self {
            header,
            data: payload_to_words(frame.payload()),
        }
    }

    /// Translates the element to a frame, the payload length is taken from the DLC and capped at 8
    pub fn to_frame(&self) -> Frame {
        let id = self.header.standard_identifier() & STANDARD_IDENTIFIER_MASK;
        // Masked to 11 bits above
        let id = StandardId::new(id).unwrap_or(StandardId::ZERO);

        Frame::from_raw(
            id,
            self.header.data_length_code().classic_length(),
            &words_to_payload(&self.data),
        )
    }
}

/// Element written to the TX FIFO
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct TxElement {
    pub header: TxHeader,
    pub data: [u32; 2],
}

impl TxElement {
    /// Classic data frame, no TX event, error active
    pub fn from_frame(frame: &Frame) -> Self {
        let header = TxHeader::new()
            .with_standard_identifier(frame.raw_id())
            .with_data_length_code(DLC::from_length(frame.len()));

        Self {
            header,
            data: payload_to_words(frame.payload()),
        }
    }

    pub fn to_frame(&self) -> Frame {
        let id = self.header.standard_identifier() & STANDARD_IDENTIFIER_MASK;
        let id = StandardId::new(id).unwrap_or(StandardId::ZERO);

        Frame::from_raw(
            id,
            self.header.data_length_code().classic_length(),
            &words_to_payload(&self.data),
        )
    }
}

/// Packs payload bytes into message RAM words, byte 0 is the LSB of word 0
fn payload_to_words(payload: &[u8; MAX_PAYLOAD_CAN_2_0]) -> [u32; 2] {
    let mut words = [0u32; 2];
    LittleEndian::read_u32_into(payload, &mut words);
    words
}

fn words_to_payload(words: &[u32; 2]) -> [u8; MAX_PAYLOAD_CAN_2_0] {
    let mut payload = [0u8; MAX_PAYLOAD_CAN_2_0];
    LittleEndian::write_u32_into(words, &mut payload);
    payload
}
