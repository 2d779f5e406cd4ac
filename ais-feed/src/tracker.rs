//! Per-vessel state tracking
//!
//! Records from the decoder are merged into one long-lived entry per
//! MMSI, so a position report and a later static-and-voyage message end
//! up on the same vessel. Entries also carry a synthetic MAC identity for
//! consumers that key devices by MAC address.

use std::{
    collections::{
        HashMap,
        hash_map,
    },
    fmt::{
        Debug,
        Display,
    },
};

use ais_aivdm::VesselRecord;
use ais_types::Mmsi;
use chrono::{
    DateTime,
    TimeDelta,
    Utc,
};
use serde::Serialize;

/// Locally administered MAC identity derived from an MMSI.
///
/// `02:41:49` (locally-administered bit, `A`, `I`) followed by the lowest
/// three bytes of the MMSI integer, most significant first. The two high
/// bits of the 30-bit MMSI do not participate.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub fn from_mmsi(mmsi: Mmsi) -> Self {
        let value = mmsi.as_u32();
        Self([
            0x02,
            0x41,
            0x49,
            (value >> 16) as u8,
            (value >> 8) as u8,
            value as u8,
        ])
    }
}

impl Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl Debug for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MacAddr({self})")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Timestamped<T> {
    pub last_update: DateTime<Utc>,
    pub value: T,
}

impl<T> Timestamped<T> {
    fn update(&mut self, time: DateTime<Utc>, value: T) {
        self.last_update = time;
        self.value = value;
    }
}

fn merge<T>(slot: &mut Option<Timestamped<T>>, time: DateTime<Utc>, value: Option<T>) {
    if let Some(value) = value {
        match slot {
            Some(timestamped) => timestamped.update(time, value),
            None => {
                *slot = Some(Timestamped {
                    last_update: time,
                    value,
                })
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Aggregated state of one vessel.
#[derive(Clone, Debug, Serialize)]
pub struct VesselState {
    pub mmsi: Mmsi,
    pub mac: MacAddr,
    pub last_seen: DateTime<Utc>,

    pub vessel_name: Option<Timestamped<String>>,
    pub callsign: Option<Timestamped<String>>,
    pub imo_number: Option<Timestamped<u32>>,
    pub ship_type: Option<Timestamped<u8>>,
    pub nav_status: Option<Timestamped<u8>>,
    pub destination: Option<Timestamped<String>>,
    pub eta: Option<Timestamped<String>>,

    pub position: Option<Timestamped<Position>>,
    /// in kt
    pub speed_over_ground: Option<Timestamped<f64>>,
    /// in degrees, clockwise from north
    pub course_over_ground: Option<Timestamped<f64>>,
    pub true_heading: Option<Timestamped<u16>>,
    /// in m
    pub draught: Option<Timestamped<f64>>,
}

impl VesselState {
    fn new(mmsi: Mmsi, time: DateTime<Utc>) -> Self {
        Self {
            mmsi,
            mac: MacAddr::from_mmsi(mmsi),
            last_seen: time,
            vessel_name: None,
            callsign: None,
            imo_number: None,
            ship_type: None,
            nav_status: None,
            destination: None,
            eta: None,
            position: None,
            speed_over_ground: None,
            course_over_ground: None,
            true_heading: None,
            draught: None,
        }
    }

    fn merge_record(&mut self, record: &VesselRecord, time: DateTime<Utc>) {
        self.last_seen = time;

        merge(
            &mut self.vessel_name,
            time,
            record.vessel_name.clone().filter(|name| !name.is_empty()),
        );
        merge(
            &mut self.callsign,
            time,
            record.callsign.clone().filter(|callsign| !callsign.is_empty()),
        );
        merge(
            &mut self.imo_number,
            time,
            record.imo_number.filter(|imo| *imo != 0),
        );
        merge(&mut self.ship_type, time, record.ship_type);
        merge(&mut self.nav_status, time, record.nav_status);
        merge(
            &mut self.destination,
            time,
            record
                .destination
                .clone()
                .filter(|destination| !destination.is_empty()),
        );
        merge(&mut self.eta, time, record.eta_str.clone());

        let position = match (record.lat, record.lon) {
            (Some(latitude), Some(longitude)) if latitude != 91.0 && longitude != 181.0 => {
                Some(Position {
                    latitude,
                    longitude,
                })
            }
            _ => None,
        };
        merge(&mut self.position, time, position);
        merge(
            &mut self.speed_over_ground,
            time,
            record.sog.filter(|sog| *sog != 102.3),
        );
        merge(
            &mut self.course_over_ground,
            time,
            record.cog.filter(|cog| *cog != 360.0),
        );
        merge(
            &mut self.true_heading,
            time,
            record.true_heading.filter(|heading| *heading != 511),
        );
        merge(&mut self.draught, time, record.draught);
    }

    /// `EVER DIADEM (351759000)` when the name is known, the bare MMSI
    /// otherwise.
    pub fn display_name(&self) -> String {
        match &self.vessel_name {
            Some(name) => format!("{} ({})", name.value, self.mmsi),
            None => self.mmsi.to_string(),
        }
    }
}

pub struct VesselUpdate<'a> {
    pub state: &'a VesselState,
    pub is_new: bool,
}

/// Vessel state keyed by MMSI.
#[derive(Debug, Default)]
pub struct VesselTracker {
    vessels: HashMap<Mmsi, VesselState>,
}

impl VesselTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    pub fn get(&self, mmsi: Mmsi) -> Option<&VesselState> {
        self.vessels.get(&mmsi)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VesselState> {
        self.vessels.values()
    }

    pub fn update(&mut self, record: &VesselRecord, time: DateTime<Utc>) -> VesselUpdate<'_> {
        let (state, is_new) = match self.vessels.entry(record.mmsi) {
            hash_map::Entry::Occupied(occupied) => (occupied.into_mut(), false),
            hash_map::Entry::Vacant(vacant) => {
                (vacant.insert(VesselState::new(record.mmsi, time)), true)
            }
        };
        state.merge_record(record, time);

        VesselUpdate { state, is_new }
    }

    /// Drops vessels not seen for `max_age`; returns how many were
    /// dropped.
    pub fn expire(&mut self, now: DateTime<Utc>, max_age: TimeDelta) -> usize {
        let before = self.vessels.len();
        self.vessels
            .retain(|_, state| now - state.last_seen <= max_age);
        before - self.vessels.len()
    }

    pub fn summary(&self) -> String {
        let with_position = self
            .vessels
            .values()
            .filter(|state| state.position.is_some())
            .count();
        let named = self
            .vessels
            .values()
            .filter(|state| state.vessel_name.is_some())
            .count();
        format!(
            "{} vessels, {} with position, {} named",
            self.vessels.len(),
            with_position,
            named,
        )
    }
}
