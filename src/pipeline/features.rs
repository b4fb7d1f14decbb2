//! Derived trip attributes.
//!
//! Time-of-day flags, duration/speed, tip percentage, total fare, rideshare
//! company and origin-zone enrichment. Every derivation is a pure column
//! expression over one record, so row order never matters.

use crate::constants::{NIGHT_HOURS, RUSH_HOURS, WEEKEND_DAYS};
use crate::error::Result;
use crate::models::{columns, company_for_license};
use polars::prelude::*;

const MICROS_PER_MINUTE: f64 = 60_000_000.0;

/// True when `column` equals any of `values`
fn in_set(column: &str, values: &[i32]) -> Expr {
    values
        .iter()
        .fold(lit(false), |acc, v| acc.or(col(column).eq(lit(*v))))
}

/// Minutes between pickup and drop-off
pub fn duration_from_timestamps() -> Expr {
    (col(columns::DROPOFF_DATETIME).cast(DataType::Int64)
        - col(columns::PICKUP_DATETIME).cast(DataType::Int64))
    .cast(DataType::Float64)
        / lit(MICROS_PER_MINUTE)
}

/// Minutes from the rideshare `trip_time` seconds
pub fn duration_from_seconds() -> Expr {
    col(columns::TRIP_TIME_SECONDS).cast(DataType::Float64) / lit(60.0)
}

/// distance / (duration in hours); only meaningful for positive durations
pub fn average_speed() -> Expr {
    col(columns::TRIP_DISTANCE) / (col(columns::TRIP_DURATION_MINUTES) / lit(60.0))
}

/// Add pickup hour, day-of-week (0 = Monday), date and the weekend/rush/night flags
pub fn with_time_features(lf: LazyFrame) -> LazyFrame {
    lf.with_columns([
        col(columns::PICKUP_DATETIME)
            .dt()
            .hour()
            .cast(DataType::Int32)
            .alias(columns::PICKUP_HOUR),
        (col(columns::PICKUP_DATETIME)
            .dt()
            .weekday()
            .cast(DataType::Int32)
            - lit(1))
        .alias(columns::DAY_OF_WEEK),
        col(columns::PICKUP_DATETIME)
            .dt()
            .date()
            .alias(columns::PICKUP_DATE),
    ])
    .with_columns([
        in_set(columns::DAY_OF_WEEK, WEEKEND_DAYS).alias(columns::IS_WEEKEND),
        in_set(columns::PICKUP_HOUR, RUSH_HOURS).alias(columns::IS_RUSH_HOUR),
        in_set(columns::PICKUP_HOUR, NIGHT_HOURS).alias(columns::IS_NIGHT),
    ])
}

/// tip / fare * 100, clamped to [0, 100]; 0 when the fare is not positive
pub fn tip_percentage() -> Expr {
    let raw = col(columns::TIP_AMOUNT) / col(columns::FARE_AMOUNT) * lit(100.0);
    when(col(columns::FARE_AMOUNT).lt_eq(lit(0.0)))
        .then(lit(0.0))
        .when(raw.clone().lt(lit(0.0)))
        .then(lit(0.0))
        .when(raw.clone().gt(lit(100.0)))
        .then(lit(100.0))
        .otherwise(raw)
}

/// fare + tip + tolls, with a missing toll counted as 0
pub fn total_fare() -> Expr {
    col(columns::FARE_AMOUNT)
        + col(columns::TIP_AMOUNT)
        + col(columns::TOLLS_AMOUNT).fill_null(lit(0.0))
}

/// Time features plus tip percentage and total fare for cleaned taxi records
///
/// Duration and speed are added by the cleaner, which filters on them.
pub fn derive_taxi(lf: LazyFrame) -> LazyFrame {
    with_time_features(lf).with_columns([
        tip_percentage().alias(columns::TIP_PERCENTAGE),
        total_fare().alias(columns::TOTAL_FARE),
    ])
}

/// Time features, duration in minutes, speed and company for rideshare records
pub fn derive_rideshare(df: DataFrame) -> Result<DataFrame> {
    let mut out = with_time_features(df.lazy())
        .with_column(duration_from_seconds().alias(columns::TRIP_DURATION_MINUTES))
        .with_column(average_speed().alias(columns::AVG_SPEED_MPH))
        .collect()?;

    let companies: Vec<&str> = out
        .column(columns::LICENSE_NUM)?
        .str()?
        .into_iter()
        .map(company_for_license)
        .collect();
    out.with_column(Series::new(columns::COMPANY.into(), companies))?;
    Ok(out)
}

/// Origin-side left join with the zone lookup
///
/// Unmatched zone ids keep their record with a null borough and zone.
pub fn join_zones(lf: LazyFrame, zones: LazyFrame) -> LazyFrame {
    lf.left_join(
        zones,
        col(columns::PU_LOCATION_ID),
        col(columns::LOCATION_ID),
    )
}
