//! Grouped descriptive summaries over cleaned, enriched records.
//!
//! Grouping is done lazily in polars; the grouped frames are then read back
//! into the document types, where missing keys are zero-filled and every
//! list is put in key order. Rounding happens here, when values enter the
//! document.

use crate::constants::{
    DAY_NAMES, HOURS_PER_DAY, MIN_ZONE_TRIPS, TOP_PROFITABLE_ZONES, precision,
};
use crate::error::Result;
use crate::models::columns;
use crate::results::{
    BoroughAnalysis, BoroughCount, CompanyShare, CongestionAnalysis, DailyDemand, DayCount,
    DayValue, HourCount, HourValue, HourlyDemand, HourlyFare, HourlyShare, HourlySpeed,
    MarketShare, OverallShare, ProfitableLocations, RideshareSummary, SummaryStats, TaxiBorough,
    TaxiSummary, ZoneProfit, round_to, share_pct,
};
use polars::prelude::*;
use std::collections::BTreeMap;

pub(crate) const HOURS: usize = HOURS_PER_DAY as usize;

// =============================================================================
// Column Access
// =============================================================================

pub(crate) fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

pub(crate) fn i32_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i32>>> {
    let column = df.column(name)?.cast(&DataType::Int32)?;
    Ok(column.i32()?.into_iter().collect())
}

pub(crate) fn u64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<u64>>> {
    let column = df.column(name)?.cast(&DataType::UInt64)?;
    Ok(column.u64()?.into_iter().collect())
}

pub(crate) fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Mean of a column, 0 for an empty or all-null column
pub(crate) fn mean_of(df: &DataFrame, name: &str) -> Result<f64> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.mean().unwrap_or(0.0))
}

pub(crate) fn sum_of(df: &DataFrame, name: &str) -> Result<f64> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.sum().unwrap_or(0.0))
}

pub(crate) fn grouped(df: &DataFrame, keys: &[&str], aggs: Vec<Expr>) -> Result<DataFrame> {
    let keys: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
    Ok(df.clone().lazy().group_by(keys).agg(aggs).collect()?)
}

pub(crate) fn filtered(df: &DataFrame, predicate: Expr) -> Result<DataFrame> {
    Ok(df.clone().lazy().filter(predicate).collect()?)
}

/// Trip counts per pickup hour, zero-filled to 24 entries
pub fn counts_by_hour(df: &DataFrame) -> Result<[u64; HOURS]> {
    let g = grouped(df, &[columns::PICKUP_HOUR], vec![len().alias(columns::TRIP_COUNT)])?;
    let mut counts = [0u64; HOURS];
    for (hour, n) in i32_values(&g, columns::PICKUP_HOUR)?
        .into_iter()
        .zip(u64_values(&g, columns::TRIP_COUNT)?)
    {
        if let (Some(h), Some(n)) = (hour, n) {
            if let Some(slot) = usize::try_from(h).ok().and_then(|h| counts.get_mut(h)) {
                *slot = n;
            }
        }
    }
    Ok(counts)
}

/// Trip counts per day of week (0 = Monday), zero-filled to 7 entries
pub fn counts_by_day(df: &DataFrame) -> Result<[u64; 7]> {
    let g = grouped(df, &[columns::DAY_OF_WEEK], vec![len().alias(columns::TRIP_COUNT)])?;
    let mut counts = [0u64; 7];
    for (day, n) in i32_values(&g, columns::DAY_OF_WEEK)?
        .into_iter()
        .zip(u64_values(&g, columns::TRIP_COUNT)?)
    {
        if let (Some(d), Some(n)) = (day, n) {
            if let Some(slot) = usize::try_from(d).ok().and_then(|d| counts.get_mut(d)) {
                *slot = n;
            }
        }
    }
    Ok(counts)
}

/// Mean of `value` per integer key, for keys that occur
pub(crate) fn means_by(df: &DataFrame, key: &str, value: &str) -> Result<BTreeMap<i32, f64>> {
    let g = grouped(df, &[key], vec![col(value).mean().alias(value)])?;
    Ok(i32_values(&g, key)?
        .into_iter()
        .zip(f64_values(&g, value)?)
        .filter_map(|(k, v)| Some((k?, v.unwrap_or(0.0))))
        .collect())
}

// =============================================================================
// Sections
// =============================================================================

pub fn summary_stats(taxi: &DataFrame, rideshare: &DataFrame) -> Result<SummaryStats> {
    let companies = str_values(rideshare, columns::COMPANY)?;
    let company_trips =
        |name: &str| companies.iter().filter(|c| c.as_deref() == Some(name)).count();

    Ok(SummaryStats {
        yellow_taxi: TaxiSummary {
            total_trips: taxi.height(),
            avg_fare: round_to(mean_of(taxi, columns::FARE_AMOUNT)?, precision::MONEY),
            avg_distance: round_to(mean_of(taxi, columns::TRIP_DISTANCE)?, precision::DISTANCE),
            avg_duration: round_to(
                mean_of(taxi, columns::TRIP_DURATION_MINUTES)?,
                precision::MINUTES,
            ),
            avg_tip_pct: round_to(mean_of(taxi, columns::TIP_PERCENTAGE)?, precision::PERCENT),
            total_revenue: round_to(sum_of(taxi, columns::TOTAL_FARE)?, precision::MONEY),
        },
        fhv: RideshareSummary {
            total_trips: rideshare.height(),
            uber_trips: company_trips("Uber"),
            lyft_trips: company_trips("Lyft"),
            avg_distance: round_to(mean_of(rideshare, columns::TRIP_DISTANCE)?, precision::DISTANCE),
            avg_duration: round_to(
                mean_of(rideshare, columns::TRIP_DURATION_MINUTES)?,
                precision::MINUTES,
            ),
        },
    })
}

fn hour_counts(counts: &[u64; HOURS]) -> Vec<HourCount> {
    counts
        .iter()
        .enumerate()
        .map(|(hour, &trips)| HourCount {
            hour: hour as i32,
            trips,
        })
        .collect()
}

fn day_counts(counts: &[u64; 7]) -> Vec<DayCount> {
    DAY_NAMES
        .iter()
        .zip(counts)
        .map(|(name, &trips)| DayCount {
            day_name: name.to_string(),
            trips,
        })
        .collect()
}

pub fn hourly_demand(taxi_hours: &[u64; HOURS], rideshare_hours: &[u64; HOURS]) -> HourlyDemand {
    HourlyDemand {
        yellow_taxi: hour_counts(taxi_hours),
        fhv: hour_counts(rideshare_hours),
    }
}

pub fn daily_demand(taxi: &DataFrame, rideshare: &DataFrame) -> Result<DailyDemand> {
    Ok(DailyDemand {
        yellow_taxi: day_counts(&counts_by_day(taxi)?),
        fhv: day_counts(&counts_by_day(rideshare)?),
    })
}

/// Per-borough summaries; records without a borough are left out
pub fn borough_analysis(taxi: &DataFrame, rideshare: &DataFrame) -> Result<BoroughAnalysis> {
    let g = grouped(
        taxi,
        &[columns::PU_BOROUGH],
        vec![
            len().alias("trips"),
            col(columns::FARE_AMOUNT).mean().alias("avg_fare"),
            col(columns::FARE_AMOUNT).sum().alias("total_revenue"),
            col(columns::TIP_PERCENTAGE).mean().alias("avg_tip_pct"),
            col(columns::TRIP_DISTANCE).mean().alias("avg_distance"),
        ],
    )?;

    let boroughs = str_values(&g, columns::PU_BOROUGH)?;
    let trips = u64_values(&g, "trips")?;
    let avg_fare = f64_values(&g, "avg_fare")?;
    let revenue = f64_values(&g, "total_revenue")?;
    let tip = f64_values(&g, "avg_tip_pct")?;
    let distance = f64_values(&g, "avg_distance")?;

    let mut yellow_taxi: Vec<TaxiBorough> = (0..g.height())
        .filter_map(|i| {
            Some(TaxiBorough {
                borough: boroughs[i].clone()?,
                trips: trips[i].unwrap_or(0),
                avg_fare: round_to(avg_fare[i].unwrap_or(0.0), precision::MONEY),
                total_revenue: round_to(revenue[i].unwrap_or(0.0), precision::MONEY),
                avg_tip_pct: round_to(tip[i].unwrap_or(0.0), precision::PERCENT),
                avg_distance: round_to(distance[i].unwrap_or(0.0), precision::DISTANCE),
            })
        })
        .collect();
    yellow_taxi.sort_by(|a, b| a.borough.cmp(&b.borough));

    let g = grouped(rideshare, &[columns::PU_BOROUGH], vec![len().alias("trips")])?;
    let mut fhv: Vec<BoroughCount> = str_values(&g, columns::PU_BOROUGH)?
        .into_iter()
        .zip(u64_values(&g, "trips")?)
        .filter_map(|(borough, trips)| {
            Some(BoroughCount {
                borough: borough?,
                trips: trips.unwrap_or(0),
            })
        })
        .collect();
    fhv.sort_by(|a, b| a.borough.cmp(&b.borough));

    Ok(BoroughAnalysis { yellow_taxi, fhv })
}

/// Highest-fare pickup zones with enough trips, plus fare and tip by hour
pub fn profitable_locations(taxi: &DataFrame) -> Result<ProfitableLocations> {
    let g = grouped(
        taxi,
        &[columns::PU_BOROUGH, columns::PU_ZONE],
        vec![
            col(columns::TOTAL_FARE).mean().alias("avg_fare"),
            col(columns::TOTAL_FARE).sum().alias("total_revenue"),
            len().alias(columns::TRIP_COUNT),
            col(columns::TIP_PERCENTAGE).mean().alias("avg_tip_pct"),
            col(columns::TRIP_DISTANCE).mean().alias("avg_distance"),
        ],
    )?;

    let boroughs = str_values(&g, columns::PU_BOROUGH)?;
    let zones = str_values(&g, columns::PU_ZONE)?;
    let avg_fare = f64_values(&g, "avg_fare")?;
    let revenue = f64_values(&g, "total_revenue")?;
    let counts = u64_values(&g, columns::TRIP_COUNT)?;
    let tip = f64_values(&g, "avg_tip_pct")?;
    let distance = f64_values(&g, "avg_distance")?;

    let mut top_zones: Vec<ZoneProfit> = (0..g.height())
        .filter(|&i| counts[i].unwrap_or(0) >= u64::from(MIN_ZONE_TRIPS))
        .filter_map(|i| {
            Some(ZoneProfit {
                borough: boroughs[i].clone()?,
                zone: zones[i].clone()?,
                avg_fare: avg_fare[i].unwrap_or(0.0),
                total_revenue: revenue[i].unwrap_or(0.0),
                trip_count: counts[i].unwrap_or(0),
                avg_tip_pct: tip[i].unwrap_or(0.0),
                avg_distance: distance[i].unwrap_or(0.0),
            })
        })
        .collect();

    top_zones.sort_by(|a, b| {
        b.avg_fare
            .total_cmp(&a.avg_fare)
            .then_with(|| a.borough.cmp(&b.borough))
            .then_with(|| a.zone.cmp(&b.zone))
    });
    top_zones.truncate(TOP_PROFITABLE_ZONES);
    for zone in &mut top_zones {
        zone.avg_fare = round_to(zone.avg_fare, precision::MONEY);
        zone.total_revenue = round_to(zone.total_revenue, precision::MONEY);
        zone.avg_tip_pct = round_to(zone.avg_tip_pct, precision::PERCENT);
        zone.avg_distance = round_to(zone.avg_distance, precision::DISTANCE);
    }

    let fares = means_by(taxi, columns::PICKUP_HOUR, columns::TOTAL_FARE)?;
    let tips = means_by(taxi, columns::PICKUP_HOUR, columns::TIP_PERCENTAGE)?;
    let profitable_hours = fares
        .into_iter()
        .map(|(hour, fare)| HourlyFare {
            hour,
            avg_total_fare: round_to(fare, precision::MONEY),
            avg_tip_pct: round_to(tips.get(&hour).copied().unwrap_or(0.0), precision::PERCENT),
        })
        .collect();

    Ok(ProfitableLocations {
        top_zones,
        profitable_hours,
    })
}

/// Taxi vs rideshare shares per hour and overall, plus rideshare company shares
pub fn market_share(
    taxi_hours: &[u64; HOURS],
    rideshare_hours: &[u64; HOURS],
    taxi_total: usize,
    rideshare: &DataFrame,
) -> Result<MarketShare> {
    let hourly = (0..HOURS)
        .map(|hour| {
            let yellow = taxi_hours[hour];
            let fhv = rideshare_hours[hour];
            let total = (yellow + fhv) as f64;
            HourlyShare {
                hour: hour as i32,
                yellow_taxi: yellow,
                fhv,
                yellow_pct: round_to(share_pct(yellow as f64, total), precision::SHARE),
                fhv_pct: round_to(share_pct(fhv as f64, total), precision::SHARE),
            }
        })
        .collect();

    let rideshare_total = rideshare.height();
    let all = (taxi_total + rideshare_total) as f64;
    let overall = OverallShare {
        yellow_taxi_pct: round_to(share_pct(taxi_total as f64, all), precision::SHARE),
        fhv_pct: round_to(share_pct(rideshare_total as f64, all), precision::SHARE),
    };

    let mut per_company: BTreeMap<String, u64> = BTreeMap::new();
    for company in str_values(rideshare, columns::COMPANY)?.into_iter().flatten() {
        *per_company.entry(company).or_default() += 1;
    }
    let mut company_share: Vec<CompanyShare> = per_company
        .into_iter()
        .map(|(company, trips)| CompanyShare {
            pct: round_to(
                share_pct(trips as f64, rideshare_total as f64),
                precision::SHARE,
            ),
            company,
            trips,
        })
        .collect();
    company_share.sort_by(|a, b| b.trips.cmp(&a.trips).then_with(|| a.company.cmp(&b.company)));

    Ok(MarketShare {
        hourly,
        overall,
        company_share,
    })
}

/// Mean tip percentage per pickup hour (hours with trips) and per weekday (all 7)
pub fn tip_by_hour_and_day(taxi: &DataFrame) -> Result<(Vec<HourValue>, Vec<DayValue>)> {
    let by_hour = means_by(taxi, columns::PICKUP_HOUR, columns::TIP_PERCENTAGE)?
        .into_iter()
        .map(|(hour, value)| HourValue {
            hour,
            value: round_to(value, precision::PERCENT),
        })
        .collect();

    let days = means_by(taxi, columns::DAY_OF_WEEK, columns::TIP_PERCENTAGE)?;
    let by_day = DAY_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| DayValue {
            day_name: name.to_string(),
            value: round_to(
                days.get(&(i as i32)).copied().unwrap_or(0.0),
                precision::PERCENT,
            ),
        })
        .collect();

    Ok((by_hour, by_day))
}

/// Duration, distance and speed by pickup hour, and rush vs off-peak speed
pub fn congestion_analysis(taxi: &DataFrame) -> Result<CongestionAnalysis> {
    let g = grouped(
        taxi,
        &[columns::PICKUP_HOUR],
        vec![
            col(columns::TRIP_DURATION_MINUTES).mean().alias("avg_duration"),
            col(columns::TRIP_DISTANCE).mean().alias("avg_distance"),
        ],
    )?;

    let mut hourly_speed: Vec<HourlySpeed> = i32_values(&g, columns::PICKUP_HOUR)?
        .into_iter()
        .zip(f64_values(&g, "avg_duration")?)
        .zip(f64_values(&g, "avg_distance")?)
        .filter_map(|((hour, duration), distance)| {
            // Speed is derived from the published (rounded) means
            let duration = round_to(duration.unwrap_or(0.0), precision::MINUTES);
            let distance = round_to(distance.unwrap_or(0.0), precision::DISTANCE);
            let speed = if duration > 0.0 {
                distance / (duration / 60.0)
            } else {
                0.0
            };
            Some(HourlySpeed {
                hour: hour?,
                avg_duration: duration,
                avg_distance: distance,
                avg_speed_mph: round_to(speed, precision::SPEED),
            })
        })
        .collect();
    hourly_speed.sort_by_key(|h| h.hour);

    let rush = filtered(taxi, col(columns::IS_RUSH_HOUR))?;
    let off_peak = filtered(taxi, col(columns::IS_RUSH_HOUR).not())?;

    Ok(CongestionAnalysis {
        hourly_speed,
        rush_hour_avg_speed: round_to(mean_of(&rush, columns::AVG_SPEED_MPH)?, precision::SPEED),
        off_peak_avg_speed: round_to(mean_of(&off_peak, columns::AVG_SPEED_MPH)?, precision::SPEED),
    })
}
