//! Record cleaning and feature derivation

use super::fixtures::*;
use crate::config::TaxiFilterPolicy;
use crate::error::AnalyticsError;
use crate::models::columns;
use crate::pipeline::aggregate::{counts_by_hour, f64_values, str_values};
use crate::pipeline::cleaner::{clean_rideshare, clean_taxi};
use crate::pipeline::{features, prepare_taxi};
use polars::prelude::*;

fn values(df: &DataFrame, name: &str) -> Vec<f64> {
    f64_values(df, name).unwrap().into_iter().flatten().collect()
}

#[test]
fn test_four_trip_scenario() {
    // Wednesday 13:00, not rush, not weekend
    let trips: Vec<TaxiTrip> = [(10.0, 5), (20.0, 10), (30.0, 15), (40.0, 20)]
        .into_iter()
        .map(|(fare, minutes)| TaxiTrip::new(at(3, 13, 0), minutes, 1.0, fare))
        .collect();

    let df = taxi_frame(&trips);
    assert_eq!(df.height(), 4);
    assert_eq!(counts_by_hour(&df).unwrap()[13], 4);

    let fares = values(&df, columns::FARE_AMOUNT);
    assert_eq!(fares.iter().sum::<f64>() / fares.len() as f64, 25.0);

    let mut durations = values(&df, columns::TRIP_DURATION_MINUTES);
    durations.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(durations, vec![5.0, 10.0, 15.0, 20.0]);
}

#[test]
fn test_standard_policy_drops_each_violation() {
    let base = || TaxiTrip::new(at(2, 10, 0), 20, 3.0, 15.0);
    let trips = vec![
        base(),
        base().tip(2.0),
        TaxiTrip::new(at(2, 10, 0), 20, 3.0, 0.0),    // fare not positive
        TaxiTrip::new(at(2, 10, 0), 20, 3.0, 600.0),  // fare too high
        TaxiTrip::new(at(2, 10, 0), 20, 0.0, 15.0),   // no distance
        TaxiTrip::new(at(2, 10, 0), 90, 120.0, 15.0), // distance too long
        base().passengers(0.0),
        base().passengers(7.0),
        base().tip(-1.0),
        TaxiTrip::new(at(2, 10, 0), 1, 0.2, 15.0),   // one minute is not > 1
        TaxiTrip::new(at(2, 10, 0), 200, 3.0, 15.0), // too long
        TaxiTrip::new(at(2, 10, 0), 60, 90.0, 15.0), // 90 mph
    ];

    let (df, stats) = clean_taxi(raw_taxi(&trips), &TaxiFilterPolicy::standard()).unwrap();
    assert_eq!(df.height(), 2);
    assert_eq!(stats.input_rows, 12);
    assert_eq!(stats.retained_rows, 2);
    assert_eq!(stats.dropped_rows, 10);

    for duration in values(&df, columns::TRIP_DURATION_MINUTES) {
        assert!(duration > 1.0 && duration < 180.0);
    }
    for speed in values(&df, columns::AVG_SPEED_MPH) {
        assert!(speed > 0.0 && speed < 60.0);
    }
}

#[test]
fn test_duration_policy_skips_passenger_and_speed_filters() {
    let trips = vec![
        TaxiTrip::new(at(2, 10, 0), 30, 40.0, 150.0).passengers(7.0), // 80 mph
        TaxiTrip::new(at(2, 10, 0), 150, 10.0, 50.0),                  // over 120 minutes
        TaxiTrip::new(at(2, 10, 0), 30, 5.0, 250.0),                   // fare over 200
    ];

    let (standard, _) = clean_taxi(raw_taxi(&trips), &TaxiFilterPolicy::standard()).unwrap();
    let mut fares = values(&standard, columns::FARE_AMOUNT);
    fares.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(fares, vec![50.0, 250.0]);

    let (duration, _) = clean_taxi(raw_taxi(&trips), &TaxiFilterPolicy::duration_model()).unwrap();
    assert_eq!(duration.height(), 1);
    assert_eq!(values(&duration, columns::FARE_AMOUNT), vec![150.0]);
}

#[test]
fn test_duration_policy_keeps_null_passenger_counts() {
    let trips: Vec<TaxiTrip> = (0..10)
        .map(|i| TaxiTrip::new(at(2, 8 + i, 0), 15 + i as i64, 3.0, 15.0))
        .collect();
    let mut raw = raw_taxi(&trips);
    raw.with_column(Series::new("passenger_count".into(), vec![None::<f64>; 10]))
        .unwrap();

    let (duration, stats) = clean_taxi(raw.clone(), &TaxiFilterPolicy::duration_model()).unwrap();
    assert_eq!(duration.height(), 10);
    assert_eq!(stats.dropped_rows, 0);

    let (standard, _) = clean_taxi(raw, &TaxiFilterPolicy::standard()).unwrap();
    assert_eq!(standard.height(), 0);
}

#[test]
fn test_duration_policy_accepts_batch_without_tips() {
    let trips = vec![
        TaxiTrip::new(at(2, 10, 0), 20, 3.0, 15.0),
        TaxiTrip::new(at(2, 11, 0), 25, 4.0, 18.0),
    ];
    let raw = raw_taxi(&trips).drop("tip_amount").unwrap();

    let (df, _) = clean_taxi(raw.clone(), &TaxiFilterPolicy::duration_model()).unwrap();
    assert_eq!(df.height(), 2);
    assert_eq!(df.column(columns::TIP_AMOUNT).unwrap().null_count(), 2);
    let derived = features::derive_taxi(df.lazy()).collect().unwrap();
    assert_eq!(derived.height(), 2);

    match clean_taxi(raw, &TaxiFilterPolicy::standard()).unwrap_err() {
        AnalyticsError::Schema { missing, .. } => {
            assert_eq!(missing, vec!["tip_amount".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_required_value_drops_record() {
    let trips = vec![
        TaxiTrip::new(at(2, 10, 0), 20, 3.0, 15.0),
        TaxiTrip::new(at(2, 11, 0), 20, 3.0, 15.0),
    ];
    let mut raw = raw_taxi(&trips);
    raw.with_column(Series::new("fare_amount".into(), [Some(15.0), None]))
        .unwrap();

    let (df, stats) = clean_taxi(raw, &TaxiFilterPolicy::standard()).unwrap();
    assert_eq!(df.height(), 1);
    assert_eq!(stats.dropped_rows, 1);
}

#[test]
fn test_missing_fare_column_is_schema_error() {
    let raw = raw_taxi(&[TaxiTrip::new(at(2, 10, 0), 20, 3.0, 15.0)])
        .drop("fare_amount")
        .unwrap();

    match clean_taxi(raw, &TaxiFilterPolicy::standard()).unwrap_err() {
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
fn test_tip_percentage_bounded_after_cleaning() {
    let trips = vec![
        TaxiTrip::new(at(4, 9, 0), 20, 3.0, 10.0).tip(25.0),
        TaxiTrip::new(at(4, 9, 0), 20, 3.0, 20.0).tip(3.0),
        TaxiTrip::new(at(4, 9, 0), 20, 3.0, 20.0),
    ];
    let df = taxi_frame(&trips);
    let pct = values(&df, columns::TIP_PERCENTAGE);
    assert_eq!(pct.len(), 3);
    assert!(pct.iter().all(|p| (0.0..=100.0).contains(p)));
    assert!(pct.contains(&100.0));
    assert!(pct.contains(&15.0));
}

#[test]
fn test_sampling_precedes_cleaning() {
    let trips: Vec<TaxiTrip> = (0..40)
        .map(|i| TaxiTrip::new(at(2, (i % 24) as u32, 0), 20, 3.0, 15.0))
        .collect();
    let (df, quality) =
        prepare_taxi(raw_taxi(&trips), &TaxiFilterPolicy::standard(), Some(10), 42).unwrap();

    assert_eq!(quality.raw_rows, 40);
    assert_eq!(quality.cleaning.input_rows, 10);
    assert_eq!(df.height(), 10);
}

#[test]
fn test_rideshare_cleaning_and_companies() {
    let trips = vec![
        RideTrip::new(Some("HV0003"), at(5, 8, 0), 900.0, 3.0),
        RideTrip::new(Some("HV0005"), at(5, 8, 0), 600.0, 2.0),
        RideTrip::new(Some("HV9999"), at(5, 9, 0), 600.0, 2.0),
        RideTrip::new(None, at(5, 9, 0), 600.0, 2.0),
        RideTrip::new(Some("HV0003"), at(5, 9, 0), 0.0, 2.0),
        RideTrip::new(Some("HV0003"), at(5, 9, 0), 600.0, 0.0),
    ];

    let (cleaned, stats) = clean_rideshare(raw_rideshare(&trips)).unwrap();
    assert_eq!(stats.retained_rows, 4);

    let derived = features::derive_rideshare(cleaned).unwrap();
    let companies: Vec<String> = str_values(&derived, columns::COMPANY)
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    assert_eq!(companies, vec!["Uber", "Lyft", "Other", "Other"]);

    let minutes = values(&derived, columns::TRIP_DURATION_MINUTES);
    assert_eq!(minutes, vec![15.0, 10.0, 10.0, 10.0]);
}

#[test]
fn test_rideshare_schema_error_names_source() {
    let raw = raw_taxi(&[TaxiTrip::new(at(2, 10, 0), 20, 3.0, 15.0)]);
    match clean_rideshare(raw).unwrap_err() {
        AnalyticsError::Schema {
            source_type,
            missing,
        } => {
            assert_eq!(source_type, "rideshare");
            assert!(missing.contains(&"trip_miles".to_string()));
            assert!(missing.contains(&"hvfhs_license_num".to_string()));
        }
        other => panic!("unexpected error: {other}"),
    }
}
