//! AIS message decoding
//!
//! The first six bits of a decoded payload carry the message type
//! (1..=63). Each supported type has a decoder that reads its fields from
//! fixed bit offsets; the registry here dispatches between them.
//!
//! Supported: types 1/2/3 (Class A position report) and type 5 (static
//! and voyage data). Types 4, 18, 19 and 24 slot into the same dispatch
//! when needed.

pub mod position;
pub mod static_voyage;

use ais_types::Mmsi;

pub use crate::message::{
    position::PositionReport,
    static_voyage::StaticAndVoyage,
};
use crate::bits::BitBuffer;

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("no decoder registered for message type {message_type}")]
    Unsupported { message_type: u8 },
    #[error("payload too short to decode the MMSI")]
    Truncated,
}

/// A decoded AIS message.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    PositionReport(PositionReport),
    StaticAndVoyage(StaticAndVoyage),
}

impl Message {
    pub fn decode(bits: &BitBuffer) -> Result<Self, MessageError> {
        let message_type = bits.uint(0, 6).map_err(|_| MessageError::Truncated)? as u8;

        match message_type {
            1..=3 => {
                Ok(Self::PositionReport(PositionReport::decode(
                    bits,
                    message_type,
                )?))
            }
            5 => Ok(Self::StaticAndVoyage(StaticAndVoyage::decode(bits)?)),
            _ => Err(MessageError::Unsupported { message_type }),
        }
    }

    pub fn message_type(&self) -> u8 {
        match self {
            Message::PositionReport(position) => position.message_type,
            Message::StaticAndVoyage(_) => 5,
        }
    }

    pub fn mmsi(&self) -> Mmsi {
        match self {
            Message::PositionReport(position) => position.mmsi,
            Message::StaticAndVoyage(voyage) => voyage.mmsi,
        }
    }
}
