//! Airport and nightlife segment analyses over cleaned taxi records.

use super::aggregate::{
    f64_values, filtered, grouped, i32_values, mean_of, str_values, u64_values,
};
use crate::constants::{AIRPORT_ZONES, TOP_NIGHTLIFE_ZONES, precision};
use crate::error::Result;
use crate::models::columns;
use crate::results::{
    AirportAnalysis, NightlifeAnalysis, SegmentHour, WeekendSplit, ZoneCount, round_to, share_pct,
};
use polars::prelude::*;
use std::collections::BTreeMap;

/// Pickup or drop-off in one of the airport zones
pub fn airport_predicate() -> Expr {
    AIRPORT_ZONES.iter().fold(lit(false), |acc, zone| {
        acc.or(col(columns::PU_LOCATION_ID).eq(lit(*zone)))
            .or(col(columns::DO_LOCATION_ID).eq(lit(*zone)))
    })
}

pub fn airport_analysis(taxi: &DataFrame) -> Result<AirportAnalysis> {
    let trips = filtered(taxi, airport_predicate())?;

    let g = grouped(
        &trips,
        &[columns::PICKUP_HOUR],
        vec![
            len().alias(columns::TRIP_COUNT),
            col(columns::FARE_AMOUNT).mean().alias("avg_fare"),
            col(columns::TIP_PERCENTAGE).mean().alias("avg_tip"),
        ],
    )?;
    let mut hourly_demand: Vec<SegmentHour> = i32_values(&g, columns::PICKUP_HOUR)?
        .into_iter()
        .zip(u64_values(&g, columns::TRIP_COUNT)?)
        .zip(f64_values(&g, "avg_fare")?.into_iter().zip(f64_values(&g, "avg_tip")?))
        .filter_map(|((hour, count), (fare, tip))| {
            Some(SegmentHour {
                hour: hour?,
                trip_count: count.unwrap_or(0),
                avg_fare: round_to(fare.unwrap_or(0.0), precision::MONEY),
                avg_tip: round_to(tip.unwrap_or(0.0), precision::PERCENT),
            })
        })
        .collect();
    hourly_demand.sort_by_key(|h| h.hour);

    Ok(AirportAnalysis {
        total_trips: trips.height() as u64,
        pct_of_total: round_to(
            share_pct(trips.height() as f64, taxi.height() as f64),
            precision::PERCENT,
        ),
        avg_fare: round_to(mean_of(&trips, columns::FARE_AMOUNT)?, precision::MONEY),
        avg_tip_pct: round_to(mean_of(&trips, columns::TIP_PERCENTAGE)?, precision::PERCENT),
        hourly_demand,
    })
}

pub fn nightlife_analysis(taxi: &DataFrame) -> Result<NightlifeAnalysis> {
    let night = filtered(taxi, col(columns::IS_NIGHT))?;

    let g = grouped(&night, &[columns::PICKUP_HOUR], vec![len().alias(columns::TRIP_COUNT)])?;
    let hourly_distribution: BTreeMap<i32, u64> = i32_values(&g, columns::PICKUP_HOUR)?
        .into_iter()
        .zip(u64_values(&g, columns::TRIP_COUNT)?)
        .filter_map(|(hour, count)| Some((hour?, count.unwrap_or(0))))
        .collect();

    let g = grouped(
        &night,
        &[columns::PU_BOROUGH, columns::PU_ZONE],
        vec![len().alias(columns::TRIP_COUNT)],
    )?;
    let mut top_nightlife_zones: Vec<ZoneCount> = str_values(&g, columns::PU_BOROUGH)?
        .into_iter()
        .zip(str_values(&g, columns::PU_ZONE)?)
        .zip(u64_values(&g, columns::TRIP_COUNT)?)
        .filter_map(|((borough, zone), trips)| {
            Some(ZoneCount {
                borough: borough?,
                zone: zone?,
                trips: trips.unwrap_or(0),
            })
        })
        .collect();
    top_nightlife_zones.sort_by(|a, b| {
        b.trips
            .cmp(&a.trips)
            .then_with(|| a.borough.cmp(&b.borough))
            .then_with(|| a.zone.cmp(&b.zone))
    });
    top_nightlife_zones.truncate(TOP_NIGHTLIFE_ZONES);

    let weekend = filtered(&night, col(columns::IS_WEEKEND))?;
    let weekday = filtered(&night, col(columns::IS_WEEKEND).not())?;

    Ok(NightlifeAnalysis {
        total_night_trips: night.height() as u64,
        pct_of_total: round_to(
            share_pct(night.height() as f64, taxi.height() as f64),
            precision::PERCENT,
        ),
        avg_fare: round_to(mean_of(&night, columns::FARE_AMOUNT)?, precision::MONEY),
        avg_tip_pct: round_to(mean_of(&night, columns::TIP_PERCENTAGE)?, precision::PERCENT),
        top_nightlife_zones,
        weekend_vs_weekday: WeekendSplit {
            weekend_trips: weekend.height() as u64,
            weekday_trips: weekday.height() as u64,
            weekend_avg_fare: round_to(mean_of(&weekend, columns::FARE_AMOUNT)?, precision::MONEY),
            weekday_avg_fare: round_to(mean_of(&weekday, columns::FARE_AMOUNT)?, precision::MONEY),
        },
        hourly_distribution,
    })
}
