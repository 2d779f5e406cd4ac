//! Static and voyage related data (message type 5)

use ais_types::Mmsi;

use crate::{
    bits::BitBuffer,
    message::MessageError,
};

/// Decoded static-and-voyage message.
///
/// Fields past the MMSI are `None` when the payload was truncated before
/// them. String fields are trimmed of their `@`/space padding; a fully
/// padded field trims to the empty string.
#[derive(Clone, Debug, PartialEq)]
pub struct StaticAndVoyage {
    pub repeat_indicator: u8,
    pub mmsi: Mmsi,
    pub ais_version: Option<u8>,
    /// IMO ship identification number; 0 = not available.
    pub imo_number: Option<u32>,
    pub callsign: Option<String>,
    pub vessel_name: Option<String>,
    pub ship_type: Option<u8>,
    /// Distances from the position reference to the hull, in metres.
    pub dim_to_bow: Option<u16>,
    pub dim_to_stern: Option<u16>,
    pub dim_to_port: Option<u8>,
    pub dim_to_starboard: Option<u8>,
    pub epfd_fix_type: Option<u8>,
    /// ETA month 1..=12; 0 = not available.
    pub eta_month: Option<u8>,
    /// ETA day 1..=31; 0 = not available.
    pub eta_day: Option<u8>,
    /// ETA hour 0..=23; 24 = not available.
    pub eta_hour: Option<u8>,
    /// ETA minute 0..=59; 60 = not available.
    pub eta_minute: Option<u8>,
    /// Maximum present static draught in metres (wire value ÷ 10).
    pub draught: Option<f64>,
    pub destination: Option<String>,
    pub dte: Option<u8>,
}

impl StaticAndVoyage {
    pub(crate) fn decode(bits: &BitBuffer) -> Result<Self, MessageError> {
        let repeat_indicator =
            bits.uint(6, 2).map_err(|_| MessageError::Truncated)? as u8;
        let mmsi = Mmsi::from_u32_unchecked(
            bits.uint(8, 30).map_err(|_| MessageError::Truncated)? as u32,
        );

        Ok(Self {
            repeat_indicator,
            mmsi,
            ais_version: bits.uint(38, 2).ok().map(|v| v as u8),
            imo_number: bits.uint(40, 30).ok().map(|v| v as u32),
            callsign: bits.str6(70, 7).ok(),
            vessel_name: bits.str6(112, 20).ok(),
            ship_type: bits.uint(232, 8).ok().map(|v| v as u8),
            dim_to_bow: bits.uint(240, 9).ok().map(|v| v as u16),
            dim_to_stern: bits.uint(249, 9).ok().map(|v| v as u16),
            dim_to_port: bits.uint(258, 6).ok().map(|v| v as u8),
            dim_to_starboard: bits.uint(264, 6).ok().map(|v| v as u8),
            epfd_fix_type: bits.uint(270, 4).ok().map(|v| v as u8),
            eta_month: bits.uint(274, 4).ok().map(|v| v as u8),
            eta_day: bits.uint(278, 5).ok().map(|v| v as u8),
            eta_hour: bits.uint(283, 5).ok().map(|v| v as u8),
            eta_minute: bits.uint(288, 6).ok().map(|v| v as u8),
            draught: bits.uint(294, 8).ok().map(|v| v as f64 / 10.0),
            destination: bits.str6(302, 20).ok(),
            dte: bits.uint(422, 1).ok().map(|v| v as u8),
        })
    }

    /// The ETA formatted `MM-DD HH:MM UTC`, or `N/A` when any component
    /// carries its not-available encoding. `None` when the payload was
    /// truncated before the ETA fields.
    pub fn eta_str(&self) -> Option<String> {
        let month = self.eta_month?;
        let day = self.eta_day?;
        let hour = self.eta_hour?;
        let minute = self.eta_minute?;

        let valid = (1..=12).contains(&month)
            && (1..=31).contains(&day)
            && hour <= 23
            && minute <= 59;
        if valid {
            Some(format!("{month:02}-{day:02} {hour:02}:{minute:02} UTC"))
        }
        else {
            Some("N/A".to_owned())
        }
    }

    /// IMO number, if transmitted and not the 0 "not available" encoding.
    pub fn imo(&self) -> Option<u32> {
        self.imo_number.filter(|imo| *imo != 0)
    }
}
