//! Class A position report (message types 1, 2 and 3)
//!
//! Types 2 (assigned schedule) and 3 (response to interrogation) share
//! the type 1 layout; the type distinction is kept on the struct.

use ais_types::Mmsi;

use crate::{
    bits::BitBuffer,
    message::MessageError,
};

/// Decoded Class A position report.
///
/// Fields past the MMSI are `None` when the payload was truncated before
/// them. Scaled fields keep their sentinel encodings (speed 102.3,
/// course 360.0, longitude 181°, latitude 91°, heading 511, rate of turn
/// −128 all mean "not available"); the accessor methods filter them.
#[derive(Clone, Debug, PartialEq)]
pub struct PositionReport {
    pub message_type: u8,
    pub repeat_indicator: u8,
    pub mmsi: Mmsi,
    pub nav_status: Option<u8>,
    /// Raw rate-of-turn field; −128 = not available.
    pub rate_of_turn: Option<i8>,
    /// Speed over ground in knots (wire value ÷ 10).
    pub speed_over_ground: Option<f64>,
    pub position_accuracy: Option<u8>,
    /// Longitude in decimal degrees (wire 1/10000 min ÷ 600000).
    pub longitude: Option<f64>,
    /// Latitude in decimal degrees.
    pub latitude: Option<f64>,
    /// Course over ground in degrees (wire value ÷ 10).
    pub course_over_ground: Option<f64>,
    pub true_heading: Option<u16>,
    /// UTC second of the position fix; 60..=63 are special encodings.
    pub utc_second: Option<u8>,
    pub maneuver_indicator: Option<u8>,
    pub raim_flag: Option<u8>,
    pub radio_status: Option<u32>,
}

impl PositionReport {
    pub(crate) fn decode(bits: &BitBuffer, message_type: u8) -> Result<Self, MessageError> {
        let repeat_indicator =
            bits.uint(6, 2).map_err(|_| MessageError::Truncated)? as u8;
        let mmsi = Mmsi::from_u32_unchecked(
            bits.uint(8, 30).map_err(|_| MessageError::Truncated)? as u32,
        );

        Ok(Self {
            message_type,
            repeat_indicator,
            mmsi,
            nav_status: bits.uint(38, 4).ok().map(|v| v as u8),
            rate_of_turn: bits.int(42, 8).ok().map(|v| v as i8),
            speed_over_ground: bits.uint(50, 10).ok().map(|v| v as f64 / 10.0),
            position_accuracy: bits.uint(60, 1).ok().map(|v| v as u8),
            longitude: bits.int(61, 28).ok().map(|v| v as f64 / 600000.0),
            latitude: bits.int(89, 27).ok().map(|v| v as f64 / 600000.0),
            course_over_ground: bits.uint(116, 12).ok().map(|v| v as f64 / 10.0),
            true_heading: bits.uint(128, 9).ok().map(|v| v as u16),
            utc_second: bits.uint(137, 6).ok().map(|v| v as u8),
            maneuver_indicator: bits.uint(143, 2).ok().map(|v| v as u8),
            raim_flag: bits.uint(148, 1).ok().map(|v| v as u8),
            radio_status: bits.uint(149, 19).ok().map(|v| v as u32),
        })
    }

    /// Longitude/latitude in decimal degrees, if transmitted and not the
    /// 181°/91° "not available" encodings.
    pub fn position(&self) -> Option<(f64, f64)> {
        let latitude = self.latitude.filter(|lat| *lat != 91.0)?;
        let longitude = self.longitude.filter(|lon| *lon != 181.0)?;
        Some((latitude, longitude))
    }

    /// Speed over ground in knots, if available.
    pub fn speed_knots(&self) -> Option<f64> {
        self.speed_over_ground.filter(|sog| *sog != 102.3)
    }

    /// Course over ground in degrees, if available.
    pub fn course(&self) -> Option<f64> {
        self.course_over_ground.filter(|cog| *cog != 360.0)
    }

    /// True heading in degrees 0..=359, if available.
    pub fn heading(&self) -> Option<u16> {
        self.true_heading.filter(|heading| *heading != 511)
    }
}
