//! Record cleaning per source type
//!
//! Cleaning validates the raw batch against its source schema, drops records
//! with missing required fields and applies the row-level filters in order:
//! raw-field bounds first, then duration once it exists, then speed.

use super::features;
use crate::config::TaxiFilterPolicy;
use crate::error::Result;
use crate::models::{CleaningStats, SourceSchema, columns};
use crate::schema;
use polars::prelude::*;
use tracing::info;

/// Conjunction of "not null" over the required canonical columns
///
/// A missing provider code is not a defect; it is reported as "Other".
/// Columns in `unchecked` are not tested either.
fn required_present(source: SourceSchema, unchecked: &[&str]) -> Expr {
    source
        .required_canonical()
        .into_iter()
        .filter(|name| *name != columns::LICENSE_NUM && !unchecked.contains(name))
        .fold(lit(true), |acc, name| acc.and(col(name).is_not_null()))
}

fn open_interval(column: &str, low: f64, high: f64) -> Expr {
    col(column).gt(lit(low)).and(col(column).lt(lit(high)))
}

/// Filters on raw taxi fields, before anything is derived
fn raw_taxi_filter(policy: &TaxiFilterPolicy) -> Expr {
    let mut predicate = open_interval(columns::FARE_AMOUNT, 0.0, policy.max_fare).and(
        open_interval(columns::TRIP_DISTANCE, 0.0, policy.max_distance),
    );

    if let Some(max) = policy.max_passengers {
        predicate = predicate.and(
            col(columns::PASSENGER_COUNT)
                .gt(lit(0.0))
                .and(col(columns::PASSENGER_COUNT).lt_eq(lit(max as f64))),
        );
    }
    if policy.require_non_negative_tip {
        predicate = predicate.and(col(columns::TIP_AMOUNT).gt_eq(lit(0.0)));
    }
    predicate
}

/// Clean a raw taxi batch
///
/// Returns the surviving records in canonical form with
/// `trip_duration_minutes` and `avg_speed_mph` added.
pub fn clean_taxi(raw: DataFrame, policy: &TaxiFilterPolicy) -> Result<(DataFrame, CleaningStats)> {
    let input_rows = raw.height();
    let source = SourceSchema::Taxi;

    let unchecked = policy.unchecked_columns();

    let mut lf = schema::normalize_relaxed(raw, source, &unchecked)?
        .filter(required_present(source, &unchecked))
        .filter(raw_taxi_filter(policy))
        .with_column(features::duration_from_timestamps().alias(columns::TRIP_DURATION_MINUTES))
        .filter(open_interval(
            columns::TRIP_DURATION_MINUTES,
            policy.min_duration_minutes,
            policy.max_duration_minutes,
        ))
        .with_column(features::average_speed().alias(columns::AVG_SPEED_MPH));

    if let Some(max_speed) = policy.max_speed_mph {
        lf = lf.filter(open_interval(columns::AVG_SPEED_MPH, 0.0, max_speed));
    }

    let cleaned = lf.collect()?;
    let stats = CleaningStats::new(source, input_rows, cleaned.height());
    info!(
        "Cleaned {} records: {} of {} retained ({:.1}%)",
        source,
        stats.retained_rows,
        stats.input_rows,
        stats.retention_pct()
    );
    Ok((cleaned, stats))
}

/// Clean a raw rideshare batch: positive distance and positive trip time
pub fn clean_rideshare(raw: DataFrame) -> Result<(DataFrame, CleaningStats)> {
    let input_rows = raw.height();
    let source = SourceSchema::Rideshare;

    let cleaned = schema::normalize(raw, source)?
        .filter(required_present(source, &[]))
        .filter(
            col(columns::TRIP_DISTANCE)
                .gt(lit(0.0))
                .and(col(columns::TRIP_TIME_SECONDS).gt(lit(0.0))),
        )
        .collect()?;

    let stats = CleaningStats::new(source, input_rows, cleaned.height());
    info!(
        "Cleaned {} records: {} of {} retained ({:.1}%)",
        source,
        stats.retained_rows,
        stats.input_rows,
        stats.retention_pct()
    );
    Ok((cleaned, stats))
}
