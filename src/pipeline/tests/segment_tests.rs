use super::fixtures::*;
use crate::pipeline::segments::{airport_analysis, nightlife_analysis};

#[test]
fn test_airport_trips_by_either_end() {
    let taxi = with_zones(taxi_frame(&[
        TaxiTrip::new(at(2, 6, 0), 40, 15.0, 70.0).zones(132, 100).tip(14.0),
        TaxiTrip::new(at(2, 6, 30), 40, 15.0, 50.0).zones(100, 1),
        TaxiTrip::new(at(2, 12, 0), 20, 3.0, 15.0),
        TaxiTrip::new(at(2, 13, 0), 20, 3.0, 15.0),
    ]));

    let airport = airport_analysis(&taxi).unwrap();
    assert_eq!(airport.total_trips, 2);
    assert_eq!(airport.pct_of_total, 50.0);
    assert_eq!(airport.avg_fare, 60.0);
    assert_eq!(airport.avg_tip_pct, 10.0);

    assert_eq!(airport.hourly_demand.len(), 1);
    assert_eq!(airport.hourly_demand[0].hour, 6);
    assert_eq!(airport.hourly_demand[0].trip_count, 2);
}

#[test]
fn test_no_airport_trips() {
    let taxi = with_zones(taxi_frame(&[TaxiTrip::new(at(2, 12, 0), 20, 3.0, 15.0)]));
    let airport = airport_analysis(&taxi).unwrap();
    assert_eq!(airport.total_trips, 0);
    assert_eq!(airport.pct_of_total, 0.0);
    assert_eq!(airport.avg_fare, 0.0);
    assert!(airport.hourly_demand.is_empty());
}

#[test]
fn test_nightlife_without_weekend_trips() {
    // Tuesday night and early Wednesday
    let taxi = with_zones(taxi_frame(&[
        TaxiTrip::new(at(2, 23, 0), 20, 3.0, 20.0),
        TaxiTrip::new(at(3, 1, 0), 20, 3.0, 30.0),
        TaxiTrip::new(at(3, 1, 30), 20, 3.0, 10.0).zones(200, 100),
        TaxiTrip::new(at(3, 12, 0), 20, 3.0, 15.0),
    ]));

    let night = nightlife_analysis(&taxi).unwrap();
    assert_eq!(night.total_night_trips, 3);
    assert_eq!(night.pct_of_total, 75.0);
    assert_eq!(night.avg_fare, 20.0);

    assert_eq!(night.weekend_vs_weekday.weekend_trips, 0);
    assert_eq!(night.weekend_vs_weekday.weekday_trips, 3);
    assert_eq!(night.weekend_vs_weekday.weekend_avg_fare, 0.0);
    assert_eq!(night.weekend_vs_weekday.weekday_avg_fare, 20.0);

    assert_eq!(night.hourly_distribution.get(&23), Some(&1));
    assert_eq!(night.hourly_distribution.get(&1), Some(&2));
    assert_eq!(night.hourly_distribution.get(&12), None);

    assert_eq!(night.top_nightlife_zones[0].zone, "Midtown");
    assert_eq!(night.top_nightlife_zones[0].trips, 2);
    assert_eq!(night.top_nightlife_zones[1].zone, "Park Slope");
}

#[test]
fn test_weekend_night_split() {
    // Saturday 6 January
    let taxi = with_zones(taxi_frame(&[
        TaxiTrip::new(at(6, 22, 0), 20, 3.0, 40.0),
        TaxiTrip::new(at(3, 22, 0), 20, 3.0, 20.0),
    ]));

    let split = nightlife_analysis(&taxi).unwrap().weekend_vs_weekday;
    assert_eq!((split.weekend_trips, split.weekday_trips), (1, 1));
    assert_eq!(split.weekend_avg_fare, 40.0);
    assert_eq!(split.weekday_avg_fare, 20.0);
}

#[test]
fn test_nightlife_keeps_top_fifteen_zones() {
    // Zone i has i night trips, 17 zones in all
    let trips: Vec<TaxiTrip> = (1..=17i64)
        .flat_map(|zone| {
            (0..zone).map(move |i| {
                TaxiTrip::new(at(2, 23, (i % 60) as u32), 20, 3.0, 15.0).zones(zone, 1)
            })
        })
        .collect();
    let taxi = with_zone_table(taxi_frame(&trips), numbered_zones(17));

    let zones = nightlife_analysis(&taxi).unwrap().top_nightlife_zones;
    assert_eq!(zones.len(), 15);
    assert_eq!(zones[0].zone, "Zone 17");
    assert_eq!(zones[0].trips, 17);
    assert_eq!(zones[14].zone, "Zone 03");
    assert_eq!(zones[14].trips, 3);
    for pair in zones.windows(2) {
        assert!(pair[0].trips > pair[1].trips);
    }
}
