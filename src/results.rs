//! Result document produced by analysis runs.
//!
//! Every section is an explicit field. Components return their own section
//! values and the pipeline assembles them; a later run (for example the
//! duration model run) merges its sections into a previously saved document
//! without erasing the sections it did not produce.

use crate::models::{CleaningStats, SourceSchema};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Round to a fixed number of decimals; non-finite values become 0
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `part / whole * 100`, or 0 when `whole` is zero
pub fn share_pct(part: f64, whole: f64) -> f64 {
    if whole == 0.0 { 0.0 } else { part / whole * 100.0 }
}

// =============================================================================
// Document
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_stats: Option<SummaryStats>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly_demand: Option<HourlyDemand>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_demand: Option<DailyDemand>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub borough_analysis: Option<BoroughAnalysis>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_share: Option<MarketShare>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profitable_locations: Option<ProfitableLocations>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_analysis: Option<TipAnalysis>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airport_analysis: Option<AirportAnalysis>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nightlife_analysis: Option<NightlifeAnalysis>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub congestion_analysis: Option<CongestionAnalysis>,

    #[serde(default, skip_serializing_if = "DataQuality::is_empty")]
    pub data_quality: DataQuality,

    #[serde(default)]
    pub ml_results: MlResults,
}

macro_rules! take_if_some {
    ($target:expr, $source:expr, $($field:ident),+ $(,)?) => {
        $(
            if $source.$field.is_some() {
                $target.$field = $source.$field;
            }
        )+
    };
}

impl AnalysisResults {
    /// Merge a fragment into this document
    ///
    /// Sections present in `other` replace the existing ones; model outcomes
    /// and data-quality runs merge per entry, so nothing produced by an
    /// earlier run is lost unless `other` carries a replacement.
    pub fn merge(&mut self, other: AnalysisResults) {
        take_if_some!(
            self,
            other,
            generated_at,
            summary_stats,
            hourly_demand,
            daily_demand,
            borough_analysis,
            market_share,
            profitable_locations,
            tip_analysis,
            airport_analysis,
            nightlife_analysis,
            congestion_analysis,
        );
        self.data_quality.runs.extend(other.data_quality.runs);
        self.ml_results.merge(other.ml_results);
    }

    /// Names of the sections carried by this document
    pub fn section_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let sections: [(&str, bool); 11] = [
            ("summary_stats", self.summary_stats.is_some()),
            ("hourly_demand", self.hourly_demand.is_some()),
            ("daily_demand", self.daily_demand.is_some()),
            ("borough_analysis", self.borough_analysis.is_some()),
            ("market_share", self.market_share.is_some()),
            ("profitable_locations", self.profitable_locations.is_some()),
            ("tip_analysis", self.tip_analysis.is_some()),
            ("airport_analysis", self.airport_analysis.is_some()),
            ("nightlife_analysis", self.nightlife_analysis.is_some()),
            ("congestion_analysis", self.congestion_analysis.is_some()),
            ("data_quality", !self.data_quality.is_empty()),
        ];
        for (name, present) in sections {
            if present {
                names.push(name.to_string());
            }
        }
        if let Some(outcome) = &self.ml_results.duration_prediction {
            names.push(format!("ml_results.duration_prediction ({})", outcome.status()));
        }
        if let Some(outcome) = &self.ml_results.demand_prediction {
            names.push(format!("ml_results.demand_prediction ({})", outcome.status()));
        }
        names
    }
}

// =============================================================================
// Model Results
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Held-out error metrics and importance ranking for one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub mae: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rmse: Option<f64>,
    pub r2_score: f64,
    pub feature_importance: Vec<FeatureImportance>,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Outcome of one model's train/evaluate cycle
///
/// A skipped model carries the reason instead of zero-filled metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelOutcome {
    Trained(PerformanceRecord),
    Skipped { reason: String },
}

impl ModelOutcome {
    pub fn performance(&self) -> Option<&PerformanceRecord> {
        match self {
            ModelOutcome::Trained(record) => Some(record),
            ModelOutcome::Skipped { .. } => None,
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self, ModelOutcome::Trained(_))
    }

    pub fn status(&self) -> &'static str {
        match self {
            ModelOutcome::Trained(_) => "trained",
            ModelOutcome::Skipped { .. } => "skipped",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MlResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_prediction: Option<ModelOutcome>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demand_prediction: Option<ModelOutcome>,
}

impl MlResults {
    pub fn merge(&mut self, other: MlResults) {
        take_if_some!(self, other, duration_prediction, demand_prediction);
    }
}

// =============================================================================
// Descriptive Sections
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxiSummary {
    pub total_trips: usize,
    pub avg_fare: f64,
    pub avg_distance: f64,
    pub avg_duration: f64,
    pub avg_tip_pct: f64,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideshareSummary {
    pub total_trips: usize,
    pub uber_trips: usize,
    pub lyft_trips: usize,
    pub avg_distance: f64,
    pub avg_duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub yellow_taxi: TaxiSummary,
    pub fhv: RideshareSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourCount {
    pub hour: i32,
    pub trips: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyDemand {
    pub yellow_taxi: Vec<HourCount>,
    pub fhv: Vec<HourCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayCount {
    pub day_name: String,
    pub trips: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDemand {
    pub yellow_taxi: Vec<DayCount>,
    pub fhv: Vec<DayCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxiBorough {
    pub borough: String,
    pub trips: u64,
    pub avg_fare: f64,
    pub total_revenue: f64,
    pub avg_tip_pct: f64,
    pub avg_distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoroughCount {
    pub borough: String,
    pub trips: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoroughAnalysis {
    pub yellow_taxi: Vec<TaxiBorough>,
    pub fhv: Vec<BoroughCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyShare {
    pub hour: i32,
    pub yellow_taxi: u64,
    pub fhv: u64,
    pub yellow_pct: f64,
    pub fhv_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallShare {
    pub yellow_taxi_pct: f64,
    pub fhv_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyShare {
    pub company: String,
    pub trips: u64,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketShare {
    pub hourly: Vec<HourlyShare>,
    pub overall: OverallShare,
    pub company_share: Vec<CompanyShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneProfit {
    pub borough: String,
    pub zone: String,
    pub avg_fare: f64,
    pub total_revenue: f64,
    pub trip_count: u64,
    pub avg_tip_pct: f64,
    pub avg_distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyFare {
    pub hour: i32,
    pub avg_total_fare: f64,
    pub avg_tip_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitableLocations {
    pub top_zones: Vec<ZoneProfit>,
    pub profitable_hours: Vec<HourlyFare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourValue {
    pub hour: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayValue {
    pub day_name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TipAnalysis {
    pub model_performance: ModelOutcome,
    pub avg_tip_by_hour: Vec<HourValue>,
    pub avg_tip_by_day: Vec<DayValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentHour {
    pub hour: i32,
    pub trip_count: u64,
    pub avg_fare: f64,
    pub avg_tip: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirportAnalysis {
    pub total_trips: u64,
    pub pct_of_total: f64,
    pub avg_fare: f64,
    pub avg_tip_pct: f64,
    pub hourly_demand: Vec<SegmentHour>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneCount {
    pub borough: String,
    pub zone: String,
    pub trips: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekendSplit {
    pub weekend_trips: u64,
    pub weekday_trips: u64,
    pub weekend_avg_fare: f64,
    pub weekday_avg_fare: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NightlifeAnalysis {
    pub total_night_trips: u64,
    pub pct_of_total: f64,
    pub avg_fare: f64,
    pub avg_tip_pct: f64,
    pub top_nightlife_zones: Vec<ZoneCount>,
    pub weekend_vs_weekday: WeekendSplit,
    pub hourly_distribution: BTreeMap<i32, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySpeed {
    pub hour: i32,
    pub avg_duration: f64,
    pub avg_distance: f64,
    pub avg_speed_mph: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CongestionAnalysis {
    pub hourly_speed: Vec<HourlySpeed>,
    pub rush_hour_avg_speed: f64,
    pub off_peak_avg_speed: f64,
}

// =============================================================================
// Data Quality
// =============================================================================

/// Row counts for one source within one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceQuality {
    /// Rows supplied by the data source before sampling
    pub raw_rows: usize,
    #[serde(flatten)]
    pub cleaning: CleaningStats,
}

impl SourceQuality {
    pub fn source(&self) -> SourceSchema {
        self.cleaning.source
    }
}

/// Cleaning counters keyed by run name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    #[serde(flatten)]
    pub runs: BTreeMap<String, Vec<SourceQuality>>,
}

impl DataQuality {
    pub fn for_run(run: &str, sources: Vec<SourceQuality>) -> Self {
        let mut runs = BTreeMap::new();
        runs.insert(run.to_string(), sources);
        Self { runs }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn performance(mae: f64) -> PerformanceRecord {
        PerformanceRecord {
            mae,
            rmse: None,
            r2_score: 0.5,
            feature_importance: vec![FeatureImportance {
                feature: "pickup_hour".to_string(),
                importance: 1.0,
            }],
            train_rows: 80,
            test_rows: 20,
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(25.004, 2), 25.0);
        assert_eq!(round_to(0.12345, 3), 0.123);
        assert_eq!(round_to(1234.6, 0), 1235.0);
        assert_eq!(round_to(f64::NAN, 2), 0.0);
    }

    #[test]
    fn test_share_pct_zero_denominator() {
        assert_eq!(share_pct(5.0, 0.0), 0.0);
        assert_eq!(share_pct(1.0, 4.0), 25.0);
    }

    #[test]
    fn test_merge_keeps_prior_sections() {
        let mut existing = AnalysisResults {
            hourly_demand: Some(HourlyDemand {
                yellow_taxi: vec![HourCount { hour: 0, trips: 3 }],
                fhv: vec![],
            }),
            ml_results: MlResults {
                duration_prediction: None,
                demand_prediction: Some(ModelOutcome::Trained(performance(12.0))),
            },
            ..Default::default()
        };

        let fragment = AnalysisResults {
            congestion_analysis: Some(CongestionAnalysis {
                hourly_speed: vec![],
                rush_hour_avg_speed: 9.5,
                off_peak_avg_speed: 12.25,
            }),
            ml_results: MlResults {
                duration_prediction: Some(ModelOutcome::Trained(performance(3.1))),
                demand_prediction: None,
            },
            ..Default::default()
        };

        existing.merge(fragment);

        assert!(existing.hourly_demand.is_some());
        assert!(existing.congestion_analysis.is_some());
        assert_eq!(
            existing
                .ml_results
                .demand_prediction
                .as_ref()
                .and_then(|o| o.performance())
                .map(|p| p.mae),
            Some(12.0)
        );
        assert!(existing.ml_results.duration_prediction.is_some());
    }

    #[test]
    fn test_skipped_outcome_serializes_reason() {
        let outcome = ModelOutcome::Skipped {
            reason: "3 rows".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "3 rows");
        assert!(json.get("mae").is_none());

        let trained = serde_json::to_value(ModelOutcome::Trained(performance(1.5))).unwrap();
        assert_eq!(trained["status"], "trained");
        assert_eq!(trained["mae"], 1.5);
        assert!(trained.get("rmse").is_none());
    }

    #[test]
    fn test_document_round_trips_through_json() {
        let mut nightlife_hours = BTreeMap::new();
        nightlife_hours.insert(23, 4);
        let doc = AnalysisResults {
            nightlife_analysis: Some(NightlifeAnalysis {
                total_night_trips: 4,
                pct_of_total: 40.0,
                avg_fare: 20.0,
                avg_tip_pct: 10.0,
                top_nightlife_zones: vec![],
                weekend_vs_weekday: WeekendSplit {
                    weekend_trips: 0,
                    weekday_trips: 4,
                    weekend_avg_fare: 0.0,
                    weekday_avg_fare: 20.0,
                },
                hourly_distribution: nightlife_hours,
            }),
            data_quality: DataQuality::for_run(
                "analysis",
                vec![SourceQuality {
                    raw_rows: 10,
                    cleaning: CleaningStats::new(SourceSchema::Taxi, 10, 8),
                }],
            ),
            ..Default::default()
        };

        let text = serde_json::to_string(&doc).unwrap();
        let back: AnalysisResults = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }
}
