//! Schema validation and normalization for trip sources.
//!
//! Checks that a raw batch carries the required columns for its declared
//! source type and projects it onto the canonical column names and dtypes
//! shared by the rest of the pipeline.

use crate::error::{AnalyticsError, Result};
use crate::models::{SourceSchema, ZONE_COLUMNS, columns};
use polars::prelude::*;
use tracing::debug;

/// Label used for zone lookup schema errors
pub const ZONE_SOURCE: &str = "zone lookup";

/// Datetime representation used for all pickup/drop-off columns
pub fn canonical_datetime() -> DataType {
    DataType::Datetime(TimeUnit::Microseconds, None)
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Verify that every required raw column for `source` is present
///
/// A missing column is fatal for that source; it is never treated as a
/// per-record problem.
pub fn validate_columns(df: &DataFrame, source: SourceSchema) -> Result<()> {
    validate_columns_except(df, source, &[])
}

/// Like [`validate_columns`], but the canonical columns in `relaxed` may be absent
pub fn validate_columns_except(
    df: &DataFrame,
    source: SourceSchema,
    relaxed: &[&str],
) -> Result<()> {
    let required: Vec<&str> = source
        .column_mapping()
        .iter()
        .filter(|mapping| mapping.required && !relaxed.contains(&mapping.canonical))
        .map(|mapping| mapping.raw)
        .collect();

    let missing: Vec<String> = required
        .iter()
        .filter(|name| !has_column(df, name))
        .map(|name| name.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(AnalyticsError::Schema {
            source_type: source.name().to_string(),
            missing,
        });
    }

    debug!("{} batch has all {} required columns", source, required.len());
    Ok(())
}

/// Target dtype for a canonical column
fn canonical_dtype(canonical: &str) -> DataType {
    match canonical {
        columns::PICKUP_DATETIME | columns::DROPOFF_DATETIME => canonical_datetime(),
        columns::PU_LOCATION_ID | columns::DO_LOCATION_ID => DataType::Int64,
        columns::LICENSE_NUM => DataType::String,
        _ => DataType::Float64,
    }
}

/// Validate and project a raw batch onto canonical names and dtypes
///
/// Optional columns that are absent are filled with zero (only tolls for
/// taxi). Columns outside the mapping are dropped.
pub fn normalize(df: DataFrame, source: SourceSchema) -> Result<LazyFrame> {
    normalize_relaxed(df, source, &[])
}

/// Normalize a batch where the canonical columns in `relaxed` are not required
///
/// An absent relaxed column is filled with nulls, not zero: its values are
/// unknown rather than empty.
pub fn normalize_relaxed(
    df: DataFrame,
    source: SourceSchema,
    relaxed: &[&str],
) -> Result<LazyFrame> {
    validate_columns_except(&df, source, relaxed)?;

    let projection: Vec<Expr> = source
        .column_mapping()
        .iter()
        .map(|mapping| {
            let dtype = canonical_dtype(mapping.canonical);
            if has_column(&df, mapping.raw) {
                col(mapping.raw).cast(dtype).alias(mapping.canonical)
            } else if mapping.required {
                lit(NULL).cast(dtype).alias(mapping.canonical)
            } else {
                lit(0.0).cast(dtype).alias(mapping.canonical)
            }
        })
        .collect();

    Ok(df.lazy().select(projection))
}

/// Validate and project the zone lookup table
pub fn normalize_zones(df: DataFrame) -> Result<LazyFrame> {
    let missing: Vec<String> = ZONE_COLUMNS
        .iter()
        .filter(|(raw, _)| !has_column(&df, raw))
        .map(|(raw, _)| raw.to_string())
        .collect();

    if !missing.is_empty() {
        return Err(AnalyticsError::Schema {
            source_type: ZONE_SOURCE.to_string(),
            missing,
        });
    }

    Ok(df.lazy().select([
        col("LocationID")
            .cast(DataType::Int64)
            .alias(columns::LOCATION_ID),
        col("Borough").cast(DataType::String).alias(columns::PU_BOROUGH),
        col("Zone").cast(DataType::String).alias(columns::PU_ZONE),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fare_is_schema_error() {
        let df = df!(
            "tpep_pickup_datetime" => [0i64],
            "tpep_dropoff_datetime" => [60_000_000i64],
            "PULocationID" => [1i64],
            "DOLocationID" => [2i64],
            "trip_distance" => [1.0],
            "passenger_count" => [1.0],
            "tip_amount" => [1.0]
        )
        .unwrap();

        let err = validate_columns(&df, SourceSchema::Taxi).unwrap_err();
        match err {
            AnalyticsError::Schema {
                source_type,
                missing,
            } => {
                assert_eq!(source_type, "taxi");
                assert_eq!(missing, vec!["fare_amount".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unrelated_batch_reports_every_column() {
        let df = df!("foo" => [1i64], "bar" => ["x"]).unwrap();
        let err = validate_columns(&df, SourceSchema::Rideshare).unwrap_err();
        match err {
            AnalyticsError::Schema { missing, .. } => {
                assert_eq!(missing.len(), SourceSchema::Rideshare.required_columns().len());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_normalize_fills_missing_tolls() {
        let df = df!(
            "tpep_pickup_datetime" => [0i64],
            "tpep_dropoff_datetime" => [600_000_000i64],
            "PULocationID" => [1i32],
            "DOLocationID" => [2i32],
            "trip_distance" => [1.5],
            "passenger_count" => [1i64],
            "fare_amount" => [10.0],
            "tip_amount" => [2.0],
            "VendorID" => [1i64]
        )
        .unwrap();

        let out = normalize(df, SourceSchema::Taxi).unwrap().collect().unwrap();
        assert_eq!(out.width(), SourceSchema::Taxi.column_mapping().len());
        let tolls = out.column(columns::TOLLS_AMOUNT).unwrap().f64().unwrap();
        assert_eq!(tolls.get(0), Some(0.0));
        assert!(!has_column(&out, "VendorID"));
        assert_eq!(
            out.column(columns::PU_LOCATION_ID).unwrap().dtype(),
            &DataType::Int64
        );
    }

    #[test]
    fn test_relaxed_tip_column_is_filled_with_nulls() {
        let df = df!(
            "tpep_pickup_datetime" => [0i64, 0],
            "tpep_dropoff_datetime" => [600_000_000i64, 900_000_000],
            "PULocationID" => [1i64, 2],
            "DOLocationID" => [2i64, 1],
            "trip_distance" => [1.5, 2.5],
            "passenger_count" => [1.0, 2.0],
            "fare_amount" => [10.0, 14.0]
        )
        .unwrap();

        assert!(validate_columns(&df, SourceSchema::Taxi).is_err());

        let out = normalize_relaxed(df, SourceSchema::Taxi, &[columns::TIP_AMOUNT])
            .unwrap()
            .collect()
            .unwrap();
        let tip = out.column(columns::TIP_AMOUNT).unwrap();
        assert_eq!(tip.dtype(), &DataType::Float64);
        assert_eq!(tip.null_count(), 2);
        let tolls = out.column(columns::TOLLS_AMOUNT).unwrap().f64().unwrap();
        assert_eq!(tolls.get(1), Some(0.0));
    }

    #[test]
    fn test_zone_lookup_requires_borough() {
        let df = df!("LocationID" => [1i64], "Zone" => ["Newark Airport"]).unwrap();
        let err = normalize_zones(df).err().unwrap();
        assert!(err.to_string().contains("Borough"));
    }
}
