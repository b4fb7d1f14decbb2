//! Core data structures and types for trip analytics.
//!
//! Defines the source schemas, canonical column names, rideshare companies
//! and cleaning statistics used throughout the library.

use crate::constants::{OTHER_COMPANY, PROVIDER_CODES};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical column names shared by both source types after normalization
pub mod columns {
    pub const PICKUP_DATETIME: &str = "pickup_datetime";
    pub const DROPOFF_DATETIME: &str = "dropoff_datetime";
    pub const PU_LOCATION_ID: &str = "pu_location_id";
    pub const DO_LOCATION_ID: &str = "do_location_id";
    pub const TRIP_DISTANCE: &str = "trip_distance";
    pub const TRIP_TIME_SECONDS: &str = "trip_time_seconds";
    pub const PASSENGER_COUNT: &str = "passenger_count";
    pub const FARE_AMOUNT: &str = "fare_amount";
    pub const TIP_AMOUNT: &str = "tip_amount";
    pub const TOLLS_AMOUNT: &str = "tolls_amount";
    pub const LICENSE_NUM: &str = "license_num";

    // Derived
    pub const PICKUP_HOUR: &str = "pickup_hour";
    pub const DAY_OF_WEEK: &str = "day_of_week";
    pub const PICKUP_DATE: &str = "pickup_date";
    pub const IS_WEEKEND: &str = "is_weekend";
    pub const IS_RUSH_HOUR: &str = "is_rush_hour";
    pub const IS_NIGHT: &str = "is_night";
    pub const TRIP_DURATION_MINUTES: &str = "trip_duration_minutes";
    pub const AVG_SPEED_MPH: &str = "avg_speed_mph";
    pub const TIP_PERCENTAGE: &str = "tip_percentage";
    pub const TOTAL_FARE: &str = "total_fare";
    pub const COMPANY: &str = "company";

    // Zone enrichment
    pub const LOCATION_ID: &str = "location_id";
    pub const PU_BOROUGH: &str = "pu_borough";
    pub const PU_ZONE: &str = "pu_zone";

    // Demand buckets
    pub const TRIP_COUNT: &str = "trip_count";
}

/// Raw-to-canonical column mapping entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub raw: &'static str,
    pub canonical: &'static str,
    pub required: bool,
}

const fn required(raw: &'static str, canonical: &'static str) -> ColumnMapping {
    ColumnMapping {
        raw,
        canonical,
        required: true,
    }
}

const fn optional(raw: &'static str, canonical: &'static str) -> ColumnMapping {
    ColumnMapping {
        raw,
        canonical,
        required: false,
    }
}

const TAXI_COLUMNS: &[ColumnMapping] = &[
    required("tpep_pickup_datetime", columns::PICKUP_DATETIME),
    required("tpep_dropoff_datetime", columns::DROPOFF_DATETIME),
    required("PULocationID", columns::PU_LOCATION_ID),
    required("DOLocationID", columns::DO_LOCATION_ID),
    required("trip_distance", columns::TRIP_DISTANCE),
    required("passenger_count", columns::PASSENGER_COUNT),
    required("fare_amount", columns::FARE_AMOUNT),
    required("tip_amount", columns::TIP_AMOUNT),
    optional("tolls_amount", columns::TOLLS_AMOUNT),
];

const RIDESHARE_COLUMNS: &[ColumnMapping] = &[
    required("hvfhs_license_num", columns::LICENSE_NUM),
    required("pickup_datetime", columns::PICKUP_DATETIME),
    required("dropoff_datetime", columns::DROPOFF_DATETIME),
    required("PULocationID", columns::PU_LOCATION_ID),
    required("DOLocationID", columns::DO_LOCATION_ID),
    required("trip_miles", columns::TRIP_DISTANCE),
    required("trip_time", columns::TRIP_TIME_SECONDS),
];

/// Zone lookup columns (raw name, canonical name)
pub const ZONE_COLUMNS: &[(&str, &str)] = &[
    ("LocationID", columns::LOCATION_ID),
    ("Borough", columns::PU_BOROUGH),
    ("Zone", columns::PU_ZONE),
];

/// Trip source types, each with its own raw schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSchema {
    Taxi,
    Rideshare,
}

impl SourceSchema {
    /// Short name used in logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            SourceSchema::Taxi => "taxi",
            SourceSchema::Rideshare => "rideshare",
        }
    }

    /// Raw-to-canonical column mapping for this source type
    pub fn column_mapping(&self) -> &'static [ColumnMapping] {
        match self {
            SourceSchema::Taxi => TAXI_COLUMNS,
            SourceSchema::Rideshare => RIDESHARE_COLUMNS,
        }
    }

    /// Raw columns that must be present for this source type
    pub fn required_columns(&self) -> Vec<&'static str> {
        self.column_mapping()
            .iter()
            .filter(|mapping| mapping.required)
            .map(|mapping| mapping.raw)
            .collect()
    }

    /// Canonical columns that must be non-null for a record to survive cleaning
    pub fn required_canonical(&self) -> Vec<&'static str> {
        self.column_mapping()
            .iter()
            .filter(|mapping| mapping.required)
            .map(|mapping| mapping.canonical)
            .collect()
    }

    /// Whether records of this type carry fare/tip/toll amounts
    pub fn has_fares(&self) -> bool {
        matches!(self, SourceSchema::Taxi)
    }
}

impl fmt::Display for SourceSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map a high-volume for-hire license number to its company name
///
/// Unknown or missing codes map to "Other".
pub fn company_for_license(license: Option<&str>) -> &'static str {
    license
        .and_then(|code| {
            PROVIDER_CODES
                .iter()
                .find(|(known, _)| *known == code)
                .map(|(_, company)| *company)
        })
        .unwrap_or(OTHER_COMPANY)
}

/// Row counts before and after cleaning one source batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub source: SourceSchema,
    pub input_rows: usize,
    pub retained_rows: usize,
    pub dropped_rows: usize,
}

impl CleaningStats {
    pub fn new(source: SourceSchema, input_rows: usize, retained_rows: usize) -> Self {
        Self {
            source,
            input_rows,
            retained_rows,
            dropped_rows: input_rows.saturating_sub(retained_rows),
        }
    }

    /// Percentage of input rows retained, 0 for an empty batch
    pub fn retention_pct(&self) -> f64 {
        if self.input_rows == 0 {
            0.0
        } else {
            self.retained_rows as f64 / self.input_rows as f64 * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_mapping() {
        assert_eq!(company_for_license(Some("HV0003")), "Uber");
        assert_eq!(company_for_license(Some("HV0005")), "Lyft");
        assert_eq!(company_for_license(Some("HV0004")), "Via");
        assert_eq!(company_for_license(Some("HV0002")), "Juno");
        assert_eq!(company_for_license(Some("HV9999")), "Other");
        assert_eq!(company_for_license(None), "Other");
    }

    #[test]
    fn test_required_columns_per_source() {
        let taxi = SourceSchema::Taxi.required_columns();
        assert!(taxi.contains(&"fare_amount"));
        assert!(!taxi.contains(&"tolls_amount"));

        let rideshare = SourceSchema::Rideshare.required_columns();
        assert!(rideshare.contains(&"trip_time"));
        assert!(!rideshare.contains(&"fare_amount"));
    }

    #[test]
    fn test_cleaning_stats() {
        let stats = CleaningStats::new(SourceSchema::Taxi, 200, 150);
        assert_eq!(stats.dropped_rows, 50);
        assert!((stats.retention_pct() - 75.0).abs() < 1e-9);

        let empty = CleaningStats::new(SourceSchema::Rideshare, 0, 0);
        assert_eq!(empty.retention_pct(), 0.0);
    }
}
