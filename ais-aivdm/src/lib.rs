//! AIVDM/AIVDO sentence decoding
//!
//! Decodes the NMEA 0183 sentence form in which AIS (Automatic
//! Identification System) messages are delivered by VHF receivers and
//! online feeds, into typed per-vessel records keyed by MMSI.
//!
//! The pipeline, leaves first: [`sentence`] frames and validates one line
//! of text, [`reassembly`] joins multi-fragment groups, [`armor`] unpacks
//! the 6-bit ASCII payload into a [`bits::BitBuffer`], [`message`]
//! dispatches on the leading 6-bit message type, and [`record`] merges the
//! decoded fields with the envelope metadata. [`Decoder`] ties the stages
//! together and keeps per-failure-kind counters.
//!
//! - [AIVDM/AIVDO protocol decoding][1]
//! - ITU-R M.1371 (message bit layouts)
//!
//! [1]: https://gpsd.gitlab.io/gpsd/AIVDM.html

use std::time::Duration;

pub mod armor;
pub mod bits;
pub mod decoder;
pub mod message;
pub mod reassembly;
pub mod record;
pub mod sentence;

pub use crate::{
    decoder::{
        Decoder,
        DecoderStats,
    },
    record::VesselRecord,
    sentence::Sentence,
};

#[derive(Debug, thiserror::Error)]
#[error("aivdm decode error")]
pub enum DecodeError {
    Sentence(#[from] crate::sentence::SentenceError),
    Reassembly(#[from] crate::reassembly::ReassemblyError),
    Armor(#[from] crate::armor::ArmorError),
    Message(#[from] crate::message::MessageError),
    Bits(#[from] crate::bits::OutOfRange),
}

/// Decoder tuning knobs.
///
/// There are no global defaults; a config is handed to every
/// [`Decoder`]/[`reassembly::Reassembler`] at construction.
#[derive(Clone, Copy, Debug)]
pub struct DecoderConfig {
    /// Age after which a partial fragment group is dropped.
    pub reassembly_timeout: Duration,

    /// Upper bound on simultaneously pending fragment groups. The oldest
    /// entry is evicted when a new group would exceed it.
    pub max_pending_groups: usize,

    /// Upper bound on armored payload length, in characters, applied after
    /// reassembly.
    pub max_payload_chars: usize,

    /// How long a shared reassembly table lock may be waited for before
    /// the operation is abandoned with a potential-deadlock diagnostic.
    pub lock_timeout: Duration,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            reassembly_timeout: Duration::from_secs(60),
            max_pending_groups: 1024,
            max_payload_chars: 256,
            lock_timeout: Duration::from_secs(5),
        }
    }
}
