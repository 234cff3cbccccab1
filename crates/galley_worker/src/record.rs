//! Flight rows produced by the worker.
//!
//! Canonical wire names are `j_class` / `y_class`. Older worker builds write
//! `jc` / `yc`; those are accepted on read and never written.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightRecord {
    #[serde(rename = "num_vol")]
    pub flight_number: String,
    #[serde(rename = "depart")]
    pub origin: String,
    #[serde(rename = "arrivee")]
    pub destination: String,
    #[serde(rename = "imma")]
    pub tail_number: String,
    /// Scheduled departure, local time, as written by the worker.
    #[serde(rename = "sd_loc")]
    pub origin_status_location: String,
    /// Scheduled arrival, local time, as written by the worker.
    #[serde(rename = "sa_loc")]
    pub destination_status_location: String,
    #[serde(rename = "j_class", alias = "jc")]
    pub business_seat_count: u32,
    #[serde(rename = "y_class", alias = "yc")]
    pub economy_seat_count: u32,
}

/// Column headers in display order, using the wire names.
pub const FLIGHT_RECORD_COLUMNS: [&str; 8] = [
    "num_vol", "depart", "arrivee", "imma", "sd_loc", "sa_loc", "j_class", "y_class",
];

impl FlightRecord {
    /// Cell values in the order of [`FLIGHT_RECORD_COLUMNS`].
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.flight_number.clone(),
            self.origin.clone(),
            self.destination.clone(),
            self.tail_number.clone(),
            self.origin_status_location.clone(),
            self.destination_status_location.clone(),
            self.business_seat_count.to_string(),
            self.economy_seat_count.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_canonical_names() {
        let json = r#"{"num_vol":"AF1","depart":"CDG","arrivee":"LHR","imma":"F-GKXA",
            "sd_loc":"2025-01-01T08:00:00","sa_loc":"2025-01-01T09:10:00","j_class":1,"y_class":2}"#;
        let record: FlightRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.flight_number, "AF1");
        assert_eq!(record.tail_number, "F-GKXA");
        assert_eq!(record.business_seat_count, 1);
        assert_eq!(record.economy_seat_count, 2);
    }

    #[test]
    fn test_reads_legacy_seat_aliases_and_writes_canonical() {
        let json = r#"{"num_vol":"AF2","depart":"CDG","arrivee":"NCE","imma":"A320",
            "sd_loc":"A","sa_loc":"B","jc":4,"yc":120}"#;
        let record: FlightRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.business_seat_count, 4);
        assert_eq!(record.economy_seat_count, 120);

        let written = serde_json::to_value(&record).unwrap();
        assert_eq!(written["j_class"], 4);
        assert_eq!(written["y_class"], 120);
        assert!(written.get("jc").is_none());
    }

    #[test]
    fn test_missing_seat_field_is_rejected() {
        let json = r#"{"num_vol":"AF3","depart":"CDG","arrivee":"NCE","imma":"A320",
            "sd_loc":"A","sa_loc":"B","j_class":4}"#;
        assert!(serde_json::from_str::<FlightRecord>(json).is_err());
    }

    #[test]
    fn test_cells_follow_column_order() {
        let record = FlightRecord {
            flight_number: "AF1".into(),
            origin: "CDG".into(),
            destination: "LHR".into(),
            tail_number: "A320".into(),
            origin_status_location: "A".into(),
            destination_status_location: "B".into(),
            business_seat_count: 1,
            economy_seat_count: 2,
        };
        let cells = record.cells();
        assert_eq!(cells.len(), FLIGHT_RECORD_COLUMNS.len());
        assert_eq!(cells[0], "AF1");
        assert_eq!(cells[7], "2");
    }
}
