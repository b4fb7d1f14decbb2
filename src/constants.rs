//! Application constants for the trip analytics pipeline
//!
//! Hour classifications, segment definitions, provider codes, filter thresholds,
//! sample caps and model defaults used throughout the crate.

// =============================================================================
// Time Classification
// =============================================================================

/// Pickup hours treated as rush hour
pub const RUSH_HOURS: &[i32] = &[7, 8, 9, 17, 18, 19];

/// Pickup hours treated as night
pub const NIGHT_HOURS: &[i32] = &[22, 23, 0, 1, 2, 3, 4];

/// Day-of-week indices (0 = Monday) that count as weekend
pub const WEEKEND_DAYS: &[i32] = &[5, 6];

/// Day names in reporting order, indexed by day-of-week
pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const HOURS_PER_DAY: i32 = 24;

// =============================================================================
// Segments
// =============================================================================

/// Zone ids whose pickups or drop-offs count as airport trips
pub const AIRPORT_ZONES: &[i64] = &[1, 132, 138];

/// Minimum trips for a (borough, zone) pair to be ranked by profitability
pub const MIN_ZONE_TRIPS: u32 = 50;

/// Number of (borough, zone) pairs kept in the profitability ranking
pub const TOP_PROFITABLE_ZONES: usize = 20;

/// Number of (borough, zone) pairs kept in the nightlife ranking
pub const TOP_NIGHTLIFE_ZONES: usize = 15;

// =============================================================================
// Rideshare Providers
// =============================================================================

/// High-volume for-hire license numbers and their company names
pub const PROVIDER_CODES: &[(&str, &str)] = &[
    ("HV0003", "Uber"),
    ("HV0005", "Lyft"),
    ("HV0004", "Via"),
    ("HV0002", "Juno"),
];

/// Company name for unrecognized or missing provider codes
pub const OTHER_COMPANY: &str = "Other";

// =============================================================================
// Cleaning Thresholds
// =============================================================================

/// Bounds applied to taxi records in the main analysis run
pub mod taxi_filters {
    pub const MAX_FARE: f64 = 500.0;
    pub const MAX_DISTANCE: f64 = 100.0;
    pub const MAX_PASSENGERS: i64 = 6;
    pub const MIN_DURATION_MINUTES: f64 = 1.0;
    pub const MAX_DURATION_MINUTES: f64 = 180.0;
    pub const MAX_SPEED_MPH: f64 = 60.0;
}

/// Tighter bounds applied before fitting the duration model
pub mod duration_filters {
    pub const MAX_FARE: f64 = 200.0;
    pub const MAX_DISTANCE: f64 = 50.0;
    pub const MIN_DURATION_MINUTES: f64 = 1.0;
    pub const MAX_DURATION_MINUTES: f64 = 120.0;
}

// =============================================================================
// Sampling and Training
// =============================================================================

/// Seed shared by every sampling and split operation
pub const DEFAULT_SEED: u64 = 42;

/// Cap on raw records per source in the main run
pub const DEFAULT_SOURCE_SAMPLE: usize = 500_000;

/// Cap on raw taxi records loaded for the duration model
pub const DEFAULT_DURATION_SAMPLE: usize = 300_000;

/// Cap on tipped taxi records used for the tip model
pub const DEFAULT_TIP_SAMPLE: usize = 50_000;

/// Fraction of rows held out for evaluation
pub const TEST_FRACTION: f64 = 0.2;

/// Decimal places used when rounding metrics into the result document
pub mod precision {
    pub const MINUTES: i32 = 2;
    pub const PERCENT: i32 = 2;
    pub const TRIP_COUNT: i32 = 0;
    pub const R2: i32 = 3;
    pub const IMPORTANCE: i32 = 3;
    pub const MONEY: i32 = 2;
    pub const SHARE: i32 = 1;
    pub const DISTANCE: i32 = 2;
    pub const SPEED: i32 = 2;
}

// =============================================================================
// Output
// =============================================================================

pub const DEFAULT_RESULTS_FILE: &str = "analysis_results.json";
pub const DEFAULT_MODELS_DIR: &str = "models";
