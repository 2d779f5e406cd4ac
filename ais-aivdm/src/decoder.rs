//! Pipeline facade
//!
//! [`Decoder`] feeds one line of text at a time through framing,
//! reassembly, armor decoding and message dispatch, and assembles the
//! output record. Every failure is scoped to its sentence: the error is
//! counted, logged, and the next line decodes as if nothing happened.

use std::time::Instant;

use serde::Serialize;

use crate::{
    DecodeError,
    DecoderConfig,
    armor::{
        self,
        ArmorError,
    },
    message::{
        Message,
        MessageError,
    },
    reassembly::{
        Reassembler,
        ReassemblyError,
        SharedReassembler,
    },
    record::VesselRecord,
    sentence::{
        Sentence,
        SentenceError,
    },
};

/// Per-failure-kind counters, the pipeline's observer surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DecoderStats {
    pub lines: u64,
    pub records: u64,
    pub not_ais_sentence: u64,
    pub checksum_mismatch: u64,
    pub bad_field_count: u64,
    pub bad_tag: u64,
    pub bad_fragment: u64,
    pub bad_fill_bits: u64,
    pub empty_payload: u64,
    pub bad_armor_char: u64,
    pub payload_too_long: u64,
    pub missing_group_id: u64,
    pub reassembly_timeout: u64,
    pub unsupported_message_type: u64,
    pub truncated_payload: u64,
    pub out_of_range: u64,
    pub lock_timeout: u64,
}

impl DecoderStats {
    fn observe(&mut self, error: &DecodeError) {
        match error {
            DecodeError::Sentence(SentenceError::NotAisSentence) => self.not_ais_sentence += 1,
            DecodeError::Sentence(SentenceError::ChecksumMismatch { .. }) => {
                self.checksum_mismatch += 1
            }
            DecodeError::Sentence(SentenceError::BadFieldCount { .. }) => {
                self.bad_field_count += 1
            }
            DecodeError::Sentence(SentenceError::BadTag { .. }) => self.bad_tag += 1,
            DecodeError::Sentence(SentenceError::BadFragment { .. }) => self.bad_fragment += 1,
            DecodeError::Sentence(SentenceError::BadFillBits { .. })
            | DecodeError::Reassembly(ReassemblyError::FillBitsBeforeTerminal { .. }) => {
                self.bad_fill_bits += 1
            }
            DecodeError::Sentence(SentenceError::EmptyPayload) => self.empty_payload += 1,
            DecodeError::Armor(ArmorError::BadArmorChar { .. }) => self.bad_armor_char += 1,
            DecodeError::Armor(ArmorError::PayloadTooLong { .. }) => self.payload_too_long += 1,
            DecodeError::Reassembly(ReassemblyError::MissingGroupId) => {
                self.missing_group_id += 1
            }
            DecodeError::Reassembly(ReassemblyError::LockTimeout { .. }) => {
                self.lock_timeout += 1
            }
            DecodeError::Message(MessageError::Unsupported { .. }) => {
                self.unsupported_message_type += 1
            }
            DecodeError::Message(MessageError::Truncated) => self.truncated_payload += 1,
            DecodeError::Bits(_) => self.out_of_range += 1,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} lines, {} records, {} checksum failures, {} unsupported types, {} timed-out groups",
            self.lines,
            self.records,
            self.checksum_mismatch,
            self.unsupported_message_type,
            self.reassembly_timeout,
        )
    }
}

enum Reassembly {
    Local(Reassembler),
    Shared(SharedReassembler),
}

/// Stateful sentence-stream decoder.
///
/// One decoder per feed. Feeds that should reassemble fragment groups
/// across each other share a [`SharedReassembler`] via
/// [`Decoder::with_shared`].
pub struct Decoder {
    config: DecoderConfig,
    reassembly: Reassembly,
    stats: DecoderStats,
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            reassembly: Reassembly::Local(Reassembler::new(&config)),
            stats: DecoderStats::default(),
            config,
        }
    }

    pub fn with_shared(config: DecoderConfig, shared: SharedReassembler) -> Self {
        Self {
            reassembly: Reassembly::Shared(shared),
            stats: DecoderStats::default(),
            config,
        }
    }

    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Decodes one line. `Ok(None)` means the line was consumed without
    /// completing a record (a fragment was buffered). Errors cover the
    /// current line only; the decoder stays usable.
    pub fn push_line(&mut self, line: &str) -> Result<Option<VesselRecord>, DecodeError> {
        match self.decode_line(line) {
            Ok(record) => Ok(record),
            Err(error) => {
                self.stats.observe(&error);
                tracing::debug!(%error, line, "sentence rejected");
                Err(error)
            }
        }
    }

    /// Drops timed-out partial fragment groups. Called internally on each
    /// line; call it directly on idle feeds to bound pending-group age
    /// without traffic.
    pub fn expire_pending(&mut self) -> Result<usize, DecodeError> {
        self.expire_pending_at(Instant::now())
    }

    fn expire_pending_at(&mut self, now: Instant) -> Result<usize, DecodeError> {
        let expired = match &mut self.reassembly {
            Reassembly::Local(reassembler) => reassembler.expire_at(now),
            Reassembly::Shared(shared) => shared.expire()?,
        };
        if expired > 0 {
            self.stats.reassembly_timeout += expired as u64;
            tracing::debug!(expired, "dropped timed-out fragment groups");
        }
        Ok(expired)
    }

    /// Discards pending partial groups, e.g. when this feed is cancelled.
    pub fn clear_pending(&mut self) -> Result<(), DecodeError> {
        match &mut self.reassembly {
            Reassembly::Local(reassembler) => reassembler.clear(),
            Reassembly::Shared(shared) => shared.clear()?,
        }
        Ok(())
    }

    fn decode_line(&mut self, line: &str) -> Result<Option<VesselRecord>, DecodeError> {
        self.stats.lines += 1;

        let sentence = line.trim_end_matches(['\r', '\n']).parse::<Sentence>()?;

        self.expire_pending_at(Instant::now())?;
        let reassembled = match &mut self.reassembly {
            Reassembly::Local(reassembler) => reassembler.push(sentence)?,
            Reassembly::Shared(shared) => shared.push(sentence)?,
        };
        let Some(sentence) = reassembled else {
            return Ok(None);
        };

        let bits = armor::decode_payload(
            &sentence.payload,
            sentence.fill_bits,
            self.config.max_payload_chars,
        )?;
        let message = Message::decode(&bits)?;

        let record = VesselRecord::assemble(&sentence, &message);
        self.stats.records += 1;
        Ok(Some(record))
    }
}
