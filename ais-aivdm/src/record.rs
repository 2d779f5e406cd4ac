//! Output record assembly
//!
//! The pipeline's output is a flat, self-contained record per decoded
//! message: the message fields under their stable key names plus the
//! envelope metadata of the sentence that carried them. Absent fields are
//! omitted from the serialized form.

use ais_types::{
    Channel,
    Mmsi,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    message::Message,
    sentence::{
        Sentence,
        Tag,
    },
};

/// One decoded vessel observation.
///
/// Records are value objects: assembled once, then only read. `mmsi` is
/// the raw unsigned identity; consumers wanting the 9-digit form use its
/// `Display` impl.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VesselRecord {
    pub message_type: u8,
    pub mmsi: Mmsi,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_indicator: Option<u8>,

    // position report fields (types 1/2/3)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nav_status: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rot: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sog: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos_accuracy: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cog: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_heading: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maneuver_indicator: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raim_flag: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radio_status: Option<u32>,

    // static and voyage fields (type 5)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ais_version: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imo_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vessel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_type: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dim_to_bow: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dim_to_stern: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dim_to_port: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dim_to_starboard: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epfd_fix_type: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_month: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_day: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_hour: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_minute: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_str: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draught: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dte: Option<u8>,

    // envelope metadata
    pub nmea_talker_id_type: Tag,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<Channel>,
    pub fragment_count: u8,
    pub fragment_number: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub raw_nmea_payload: String,
    pub num_fill_bits: u8,
}

impl VesselRecord {
    fn from_envelope(message_type: u8, mmsi: Mmsi, sentence: &Sentence) -> Self {
        Self {
            message_type,
            mmsi,
            repeat_indicator: None,
            nav_status: None,
            rot: None,
            sog: None,
            pos_accuracy: None,
            lon: None,
            lat: None,
            cog: None,
            true_heading: None,
            timestamp: None,
            maneuver_indicator: None,
            raim_flag: None,
            radio_status: None,
            ais_version: None,
            imo_number: None,
            callsign: None,
            vessel_name: None,
            ship_type: None,
            dim_to_bow: None,
            dim_to_stern: None,
            dim_to_port: None,
            dim_to_starboard: None,
            epfd_fix_type: None,
            eta_month: None,
            eta_day: None,
            eta_hour: None,
            eta_minute: None,
            eta_str: None,
            draught: None,
            destination: None,
            dte: None,
            nmea_talker_id_type: sentence.tag,
            channel: sentence.channel,
            fragment_count: sentence.fragment_count,
            fragment_number: sentence.fragment_number,
            message_id: sentence.message_id.clone(),
            raw_nmea_payload: sentence.payload.clone(),
            num_fill_bits: sentence.fill_bits,
        }
    }

    /// Merges a decoded message with the envelope it arrived in.
    pub fn assemble(sentence: &Sentence, message: &Message) -> Self {
        let mut record =
            Self::from_envelope(message.message_type(), message.mmsi(), sentence);

        match message {
            Message::PositionReport(position) => {
                record.repeat_indicator = Some(position.repeat_indicator);
                record.nav_status = position.nav_status;
                record.rot = position.rate_of_turn;
                record.sog = position.speed_over_ground;
                record.pos_accuracy = position.position_accuracy;
                record.lon = position.longitude;
                record.lat = position.latitude;
                record.cog = position.course_over_ground;
                record.true_heading = position.true_heading;
                record.timestamp = position.utc_second;
                record.maneuver_indicator = position.maneuver_indicator;
                record.raim_flag = position.raim_flag;
                record.radio_status = position.radio_status;
            }
            Message::StaticAndVoyage(voyage) => {
                record.repeat_indicator = Some(voyage.repeat_indicator);
                record.ais_version = voyage.ais_version;
                record.imo_number = voyage.imo_number;
                record.callsign = voyage.callsign.clone();
                record.vessel_name = voyage.vessel_name.clone();
                record.ship_type = voyage.ship_type;
                record.dim_to_bow = voyage.dim_to_bow;
                record.dim_to_stern = voyage.dim_to_stern;
                record.dim_to_port = voyage.dim_to_port;
                record.dim_to_starboard = voyage.dim_to_starboard;
                record.epfd_fix_type = voyage.epfd_fix_type;
                record.eta_month = voyage.eta_month;
                record.eta_day = voyage.eta_day;
                record.eta_hour = voyage.eta_hour;
                record.eta_minute = voyage.eta_minute;
                record.eta_str = voyage.eta_str();
                record.draught = voyage.draught;
                record.destination = voyage.destination.clone();
                record.dte = voyage.dte;
            }
        }

        record
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        armor::decode_payload,
        message::Message,
        record::VesselRecord,
        sentence::Sentence,
    };

    fn record_for(line: &str) -> VesselRecord {
        let sentence = line.parse::<Sentence>().unwrap();
        let bits = decode_payload(&sentence.payload, sentence.fill_bits, 256).unwrap();
        let message = Message::decode(&bits).unwrap();
        VesselRecord::assemble(&sentence, &message)
    }

    #[test]
    fn it_merges_envelope_metadata() {
        let record = record_for("!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*24");
        assert_eq!(record.message_type, 1);
        assert_eq!(record.mmsi.as_u32(), 265547250);
        assert_eq!(record.fragment_count, 1);
        assert_eq!(record.fragment_number, 1);
        assert_eq!(record.message_id, None);
        assert_eq!(record.raw_nmea_payload, "13u?etPv2;0n:dDPwUM1U1Cb069D");
        assert_eq!(record.num_fill_bits, 0);
    }

    #[test]
    fn it_serializes_under_the_stable_keys_and_omits_absent_fields() {
        let record = record_for("!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*24");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["message_type"], 1);
        assert_eq!(json["mmsi"], 265547250);
        assert_eq!(json["nav_status"], 0);
        assert_eq!(json["true_heading"], 41);
        assert_eq!(json["timestamp"], 53);
        assert_eq!(json["nmea_talker_id_type"], "AIVDM");
        assert_eq!(json["channel"], "A");
        assert_eq!(json["raw_nmea_payload"], "13u?etPv2;0n:dDPwUM1U1Cb069D");
        assert_eq!(json["num_fill_bits"], 0);

        // type 5 fields don't leak into a position report
        let object = json.as_object().unwrap();
        assert!(!object.contains_key("vessel_name"));
        assert!(!object.contains_key("eta_str"));
        assert!(!object.contains_key("destination"));
    }

    #[test]
    fn it_round_trips_through_json() {
        let record = record_for("!AIVDM,1,1,,A,13u?etPv2;0n:dDPwUM1U1Cb069D,0*24");
        let json = serde_json::to_string(&record).unwrap();
        let back = serde_json::from_str::<VesselRecord>(&json).unwrap();
        assert_eq!(back, record);
    }
}
