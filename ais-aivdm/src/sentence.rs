//! NMEA sentence framing
//!
//! An AIS sentence looks like
//!
//! ```plain
//! !AIVDM,<frag_count>,<frag_no>,<group_id>,<channel>,<payload>,<fill>*<XX>
//! ```
//!
//! where `<XX>` is the XOR of all bytes strictly between `!` and `*`,
//! written as two hex digits. The framer validates the envelope and splits
//! it into a [`Sentence`]; it does not look inside the armored payload.

use std::str::FromStr;

use ais_types::Channel;
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, thiserror::Error)]
pub enum SentenceError {
    #[error("not an AIS sentence")]
    NotAisSentence,
    #[error("checksum mismatch: expected {expected:02X}, computed {computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },
    #[error("expected 6 or 7 fields, got {count}")]
    BadFieldCount { count: usize },
    #[error("invalid sentence tag: {value}")]
    BadTag { value: String },
    #[error("invalid fragment numbering: {value}")]
    BadFragment { value: String },
    #[error("invalid fill bits: {value}")]
    BadFillBits { value: String },
    #[error("empty armored payload")]
    EmptyPayload,
}

/// NMEA talker/type tag of an AIS sentence.
///
/// `AIVDM` carries messages received from other stations, `AIVDO` the own
/// ship's. Both are decoded identically; the tag is preserved in the
/// output record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tag {
    Aivdm,
    Aivdo,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aivdm => "AIVDM",
            Self::Aivdo => "AIVDO",
        }
    }
}

/// A framed AIVDM/AIVDO sentence envelope.
///
/// The payload is still armored; [`crate::armor::decode_payload`] unpacks
/// it. Multi-fragment envelopes (`fragment_count > 1`) carry a slice of a
/// larger message and must pass through
/// [`crate::reassembly::Reassembler`] first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentence {
    pub tag: Tag,
    pub fragment_count: u8,
    pub fragment_number: u8,
    /// Sequential group id tying the fragments of one message together.
    pub message_id: Option<String>,
    pub channel: Option<Channel>,
    /// Armored payload, ASCII `0`..`W` and `` ` ``..`w`.
    pub payload: String,
    pub fill_bits: u8,
}

impl Sentence {
    pub fn is_multi_fragment(&self) -> bool {
        self.fragment_count > 1
    }

    pub fn is_terminal_fragment(&self) -> bool {
        self.fragment_number == self.fragment_count
    }
}

/// XOR of all bytes of the sentence body (the part between `!` and `*`).
pub fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, byte| acc ^ byte)
}

impl FromStr for Sentence {
    type Err = SentenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.starts_with('!') {
            return Err(SentenceError::NotAisSentence);
        }

        let star = s.rfind('*').ok_or(SentenceError::NotAisSentence)?;
        if star <= 1 {
            return Err(SentenceError::NotAisSentence);
        }

        let declared = &s[star + 1..];
        if declared.len() != 2 || !declared.bytes().all(|byte| byte.is_ascii_hexdigit()) {
            return Err(SentenceError::NotAisSentence);
        }
        let expected =
            u8::from_str_radix(declared, 16).map_err(|_| SentenceError::NotAisSentence)?;

        let body = &s[1..star];
        let computed = nmea_checksum(body);
        if computed != expected {
            return Err(SentenceError::ChecksumMismatch { expected, computed });
        }

        let fields = body.split(',').collect::<Vec<&str>>();
        if fields.len() < 6 || fields.len() > 7 {
            return Err(SentenceError::BadFieldCount {
                count: fields.len(),
            });
        }

        let tag = match fields[0] {
            "AIVDM" => Tag::Aivdm,
            "AIVDO" => Tag::Aivdo,
            _ => {
                return Err(SentenceError::BadTag {
                    value: fields[0].to_owned(),
                });
            }
        };

        let bad_fragment = |value: &str| {
            SentenceError::BadFragment {
                value: value.to_owned(),
            }
        };
        let fragment_count = fields[1]
            .parse::<u8>()
            .ok()
            .filter(|count| (1..=9).contains(count))
            .ok_or_else(|| bad_fragment(fields[1]))?;
        let fragment_number = fields[2]
            .parse::<u8>()
            .ok()
            .filter(|number| (1..=fragment_count).contains(number))
            .ok_or_else(|| bad_fragment(fields[2]))?;

        let message_id = (!fields[3].is_empty()).then(|| fields[3].to_owned());

        let channel = if fields[4].is_empty() {
            None
        }
        else {
            Some(
                fields[4]
                    .parse::<Channel>()
                    .map_err(|_| SentenceError::NotAisSentence)?,
            )
        };

        if fields[5].is_empty() {
            return Err(SentenceError::EmptyPayload);
        }
        let payload = fields[5].to_owned();

        let fill_bits = match fields.get(6) {
            None | Some(&"") => 0,
            Some(field) => {
                match field.as_bytes() {
                    [digit @ b'0'..=b'5'] => digit - b'0',
                    _ => {
                        return Err(SentenceError::BadFillBits {
                            value: (*field).to_owned(),
                        });
                    }
                }
            }
        };

        Ok(Self {
            tag,
            fragment_count,
            fragment_number,
            message_id,
            channel,
            payload,
            fill_bits,
        })
    }
}

#[cfg(test)]
mod tests {
    use ais_types::Channel;

    use crate::sentence::{
        Sentence,
        SentenceError,
        Tag,
        nmea_checksum,
    };

    const POSITION_REPORT: &str = "!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*24";

    #[test]
    fn it_frames_a_position_report() {
        let sentence = POSITION_REPORT.parse::<Sentence>().unwrap();
        assert_eq!(sentence.tag, Tag::Aivdm);
        assert_eq!(sentence.fragment_count, 1);
        assert_eq!(sentence.fragment_number, 1);
        assert_eq!(sentence.message_id, None);
        assert_eq!(sentence.channel, Some(Channel::A));
        assert_eq!(sentence.payload, "13u?etPv2;0n:dDPwUM1U1Cb069D");
        assert_eq!(sentence.fill_bits, 0);
    }

    #[test]
    fn it_accepts_lowercase_checksums() {
        let sentence = "!AIVDM,1,1,,B,177KQJ5000G?tO`K>RA1wUbN0TKH,0*5c"
            .parse::<Sentence>()
            .unwrap();
        assert_eq!(sentence.channel, Some(Channel::B));
    }

    #[test]
    fn it_rejects_corrupted_checksums() {
        let corrupted = POSITION_REPORT.replace("*24", "*25");
        match corrupted.parse::<Sentence>() {
            Err(SentenceError::ChecksumMismatch { expected, computed }) => {
                assert_eq!(expected, 0x25);
                assert_eq!(computed, 0x24);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn it_rejects_any_flipped_body_byte() {
        // flipping a single bit anywhere between `!` and `*` must break
        // the checksum
        let bytes = POSITION_REPORT.as_bytes();
        let star = POSITION_REPORT.rfind('*').unwrap();
        for index in 1..star {
            let mut corrupted = bytes.to_vec();
            corrupted[index] ^= 0x01;
            let Ok(corrupted) = String::from_utf8(corrupted) else {
                continue;
            };
            assert!(
                matches!(
                    corrupted.parse::<Sentence>(),
                    Err(SentenceError::ChecksumMismatch { .. })
                ),
                "flip at {index} was not caught: {corrupted}"
            );
        }
    }

    #[test]
    fn it_rejects_foreign_sentences() {
        assert!(matches!(
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47"
                .parse::<Sentence>(),
            Err(SentenceError::NotAisSentence)
        ));
        assert!(matches!(
            "!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0".parse::<Sentence>(),
            Err(SentenceError::NotAisSentence)
        ));
    }

    #[test]
    fn it_rejects_wrong_tags() {
        let body = "BSVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0";
        let sentence = format!("!{body}*{:02X}", nmea_checksum(body));
        assert!(matches!(
            sentence.parse::<Sentence>(),
            Err(SentenceError::BadTag { value }) if value == "BSVDM"
        ));
    }

    #[test]
    fn it_rejects_bad_field_counts() {
        let body = "AIVDM,1,1,,A";
        let sentence = format!("!{body}*{:02X}", nmea_checksum(body));
        assert!(matches!(
            sentence.parse::<Sentence>(),
            Err(SentenceError::BadFieldCount { count: 5 })
        ));
    }

    #[test]
    fn it_rejects_bad_fragment_numbering() {
        for body in [
            "AIVDM,0,1,,A,13u?etPv,0",
            "AIVDM,2,3,7,A,13u?etPv,0",
            "AIVDM,x,1,,A,13u?etPv,0",
        ] {
            let sentence = format!("!{body}*{:02X}", nmea_checksum(body));
            assert!(
                matches!(
                    sentence.parse::<Sentence>(),
                    Err(SentenceError::BadFragment { .. })
                ),
                "accepted: {sentence}"
            );
        }
    }

    #[test]
    fn it_rejects_bad_fill_bits() {
        for fill in ["6", "12", "x"] {
            let body = format!("AIVDM,1,1,,A,13u?etPv,{fill}");
            let sentence = format!("!{body}*{:02X}", nmea_checksum(&body));
            assert!(matches!(
                sentence.parse::<Sentence>(),
                Err(SentenceError::BadFillBits { .. })
            ));
        }
    }

    #[test]
    fn it_defaults_missing_fill_bits_to_zero() {
        for body in ["AIVDM,1,1,,A,13u?etPv", "AIVDM,1,1,,A,13u?etPv,"] {
            let sentence = format!("!{body}*{:02X}", nmea_checksum(body));
            assert_eq!(sentence.parse::<Sentence>().unwrap().fill_bits, 0);
        }
    }

    #[test]
    fn it_rejects_empty_payloads() {
        let body = "AIVDM,1,1,,A,,0";
        let sentence = format!("!{body}*{:02X}", nmea_checksum(body));
        assert!(matches!(
            sentence.parse::<Sentence>(),
            Err(SentenceError::EmptyPayload)
        ));
    }

    #[test]
    fn it_preserves_own_ship_tags() {
        let body = "AIVDO,1,1,,,13u?etPv2;0n:dDPwUM1U1Cb069D,0";
        let sentence = format!("!{body}*{:02X}", nmea_checksum(body))
            .parse::<Sentence>()
            .unwrap();
        assert_eq!(sentence.tag, Tag::Aivdo);
        assert_eq!(sentence.channel, None);
    }
}
