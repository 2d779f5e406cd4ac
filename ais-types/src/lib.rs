//! Shared vocabulary types for AIS ingestion.

use std::{
    fmt::{
        Debug,
        Display,
    },
    str::FromStr,
};

use serde::{
    Deserialize,
    Deserializer,
    Serialize,
    Serializer,
    de,
};

/// Maritime Mobile Service Identity
///
/// A 9 decimal digit identity assigned to a station, carried as a 30 bit
/// unsigned field on the wire.
///
/// <https://en.wikipedia.org/wiki/Maritime_Mobile_Service_Identity>
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mmsi(u32);

impl Mmsi {
    /// Largest value representable in the 30 bit wire field.
    pub const MAX: u32 = (1 << 30) - 1;

    pub const fn from_u32_unchecked(value: u32) -> Self {
        Self(value)
    }

    pub const fn from_u32(value: u32) -> Option<Self> {
        if value <= Self::MAX {
            Some(Self(value))
        }
        else {
            None
        }
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl Display for Mmsi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:09}", self.0)
    }
}

impl Debug for Mmsi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mmsi({:09})", self.0)
    }
}

impl FromStr for Mmsi {
    type Err = MmsiFromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || {
            MmsiFromStrError {
                input: s.to_owned(),
            }
        };
        if s.is_empty() || !s.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(err());
        }
        let value = s.parse::<u32>().map_err(|_| err())?;
        Self::from_u32(value).ok_or_else(err)
    }
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("invalid MMSI: {input}")]
pub struct MmsiFromStrError {
    pub input: String,
}

impl Serialize for Mmsi {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for Mmsi {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        Self::from_u32(value)
            .ok_or_else(|| de::Error::custom(format_args!("MMSI out of range: {value}")))
    }
}

impl From<Mmsi> for u32 {
    fn from(value: Mmsi) -> Self {
        value.as_u32()
    }
}

/// VHF channel designator of a received sentence.
///
/// AIS 1 (`A`, 161.975 MHz) and AIS 2 (`B`, 162.025 MHz) are the assigned
/// simplex channels. Some receivers emit other designators (e.g. `1`/`2`);
/// those are preserved rather than rejected.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    A,
    B,
    Other(char),
}

impl Channel {
    pub fn from_char(c: char) -> Self {
        match c {
            'A' => Self::A,
            'B' => Self::B,
            _ => Self::Other(c),
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::Other(c) => *c,
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Channel({})", self.as_char())
    }
}

impl FromStr for Channel {
    type Err = ChannelFromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || {
            ChannelFromStrError {
                input: s.to_owned(),
            }
        };
        let mut chars = s.chars();
        let c = chars.next().ok_or_else(err)?;
        if chars.next().is_some() {
            return Err(err());
        }
        Ok(Self::from_char(c))
    }
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("invalid channel designator: {input}")]
pub struct ChannelFromStrError {
    pub input: String,
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.as_char())
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
