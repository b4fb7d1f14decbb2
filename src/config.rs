//! Configuration management and validation.
//!
//! Provides the pipeline configuration (input/output locations, sampling
//! caps, seed), the row-level taxi filter policy and per-model ensemble
//! parameters, with defaults matching the reference analysis runs.

use crate::constants::{
    DEFAULT_DURATION_SAMPLE, DEFAULT_MODELS_DIR, DEFAULT_RESULTS_FILE, DEFAULT_SEED,
    DEFAULT_SOURCE_SAMPLE, DEFAULT_TIP_SAMPLE, duration_filters, taxi_filters,
};
use crate::error::{AnalyticsError, Result};
use crate::ml::forest::ForestConfig;
use crate::models::columns;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Row-level filter policy for taxi records
///
/// Bounds are exclusive unless noted. `None` disables a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxiFilterPolicy {
    /// Upper bound on fare_amount (lower bound is always 0, exclusive)
    pub max_fare: f64,

    /// Upper bound on trip_distance (lower bound is always 0, exclusive)
    pub max_distance: f64,

    /// Inclusive upper bound on passenger_count; `None` skips the passenger filter
    pub max_passengers: Option<i64>,

    /// Drop records with a negative tip
    pub require_non_negative_tip: bool,

    /// Duration bounds in minutes
    pub min_duration_minutes: f64,
    pub max_duration_minutes: f64,

    /// Upper bound on average speed; `None` skips the speed filter
    pub max_speed_mph: Option<f64>,
}

impl Default for TaxiFilterPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl TaxiFilterPolicy {
    /// Policy used by the main analysis run
    pub fn standard() -> Self {
        Self {
            max_fare: taxi_filters::MAX_FARE,
            max_distance: taxi_filters::MAX_DISTANCE,
            max_passengers: Some(taxi_filters::MAX_PASSENGERS),
            require_non_negative_tip: true,
            min_duration_minutes: taxi_filters::MIN_DURATION_MINUTES,
            max_duration_minutes: taxi_filters::MAX_DURATION_MINUTES,
            max_speed_mph: Some(taxi_filters::MAX_SPEED_MPH),
        }
    }

    /// Policy used before fitting the duration model
    pub fn duration_model() -> Self {
        Self {
            max_fare: duration_filters::MAX_FARE,
            max_distance: duration_filters::MAX_DISTANCE,
            max_passengers: None,
            require_non_negative_tip: false,
            min_duration_minutes: duration_filters::MIN_DURATION_MINUTES,
            max_duration_minutes: duration_filters::MAX_DURATION_MINUTES,
            max_speed_mph: None,
        }
    }

    /// Canonical taxi columns this policy never filters on
    ///
    /// They may be absent from the batch or null in a record without the
    /// record being dropped.
    pub fn unchecked_columns(&self) -> Vec<&'static str> {
        let mut unchecked = Vec::new();
        if self.max_passengers.is_none() {
            unchecked.push(columns::PASSENGER_COUNT);
        }
        if !self.require_non_negative_tip {
            unchecked.push(columns::TIP_AMOUNT);
        }
        unchecked
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_fare <= 0.0 || self.max_distance <= 0.0 {
            return Err(AnalyticsError::configuration(
                "fare and distance bounds must be positive",
            ));
        }
        if self.min_duration_minutes >= self.max_duration_minutes {
            return Err(AnalyticsError::configuration(format!(
                "duration bounds are empty: ({}, {})",
                self.min_duration_minutes, self.max_duration_minutes
            )));
        }
        if matches!(self.max_passengers, Some(max) if max <= 0) {
            return Err(AnalyticsError::configuration(
                "max_passengers must be at least 1",
            ));
        }
        if matches!(self.max_speed_mph, Some(max) if max <= 0.0) {
            return Err(AnalyticsError::configuration("max_speed_mph must be positive"));
        }
        Ok(())
    }
}

/// Ensemble parameters for each model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Each tree draws at most 100,000 rows by default; `max_samples: null` lifts the cap
    pub duration: ForestConfig,
    pub tip: ForestConfig,
    pub demand: ForestConfig,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            duration: ForestConfig {
                n_trees: 100,
                max_depth: 8,
                max_samples: Some(100_000),
                ..Default::default()
            },
            tip: ForestConfig {
                n_trees: 50,
                max_depth: 5,
                ..Default::default()
            },
            demand: ForestConfig {
                n_trees: 50,
                max_depth: 8,
                ..Default::default()
            },
        }
    }
}

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Taxi trip batch (parquet or csv)
    pub taxi_path: Option<PathBuf>,

    /// Rideshare trip batch (parquet or csv)
    pub rideshare_path: Option<PathBuf>,

    /// Zone lookup table (csv or parquet)
    pub zones_path: Option<PathBuf>,

    /// Result document location
    pub results_path: PathBuf,

    /// Directory for serialized model artifacts
    pub models_dir: PathBuf,

    /// Seed for every sampling and split operation
    pub seed: u64,

    /// Cap on raw records per source in the main run (`None` = all)
    pub source_sample: Option<usize>,

    /// Cap on raw taxi records for the duration model
    pub duration_sample: usize,

    /// Cap on tipped records for the tip model
    pub tip_sample: usize,

    /// Filter policy for the main analysis run
    pub taxi_policy: TaxiFilterPolicy,

    /// Filter policy for the duration model run
    pub duration_policy: TaxiFilterPolicy,

    /// Ensemble parameters per model
    pub models: ModelParams,

    /// Show stage progress spinner
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            taxi_path: None,
            rideshare_path: None,
            zones_path: None,
            results_path: PathBuf::from(DEFAULT_RESULTS_FILE),
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            seed: DEFAULT_SEED,
            source_sample: Some(DEFAULT_SOURCE_SAMPLE),
            duration_sample: DEFAULT_DURATION_SAMPLE,
            tip_sample: DEFAULT_TIP_SAMPLE,
            taxi_policy: TaxiFilterPolicy::standard(),
            duration_policy: TaxiFilterPolicy::duration_model(),
            models: ModelParams::default(),
            show_progress: true,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file; missing fields take defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AnalyticsError::configuration(format!(
                "cannot read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_source_sample(mut self, cap: Option<usize>) -> Self {
        self.source_sample = cap;
        self
    }

    pub fn with_tip_sample(mut self, cap: usize) -> Self {
        self.tip_sample = cap;
        self
    }

    pub fn with_duration_sample(mut self, cap: usize) -> Self {
        self.duration_sample = cap;
        self
    }

    pub fn with_results_path(mut self, path: PathBuf) -> Self {
        self.results_path = path;
        self
    }

    pub fn with_models_dir(mut self, dir: PathBuf) -> Self {
        self.models_dir = dir;
        self
    }

    pub fn with_model_params(mut self, params: ModelParams) -> Self {
        self.models = params;
        self
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.source_sample == Some(0) || self.duration_sample == 0 || self.tip_sample == 0 {
            return Err(AnalyticsError::configuration(
                "sample caps must be greater than zero",
            ));
        }
        self.taxi_policy.validate()?;
        self.duration_policy.validate()?;
        for (name, forest) in [
            ("duration", &self.models.duration),
            ("tip", &self.models.tip),
            ("demand", &self.models.demand),
        ] {
            if forest.n_trees == 0 || forest.max_depth == 0 {
                return Err(AnalyticsError::configuration(format!(
                    "{name} model needs at least one tree of depth >= 1"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seed, 42);
        assert_eq!(config.tip_sample, 50_000);
        assert_eq!(config.duration_sample, 300_000);
    }

    #[test]
    fn test_duration_policy_skips_passenger_and_speed() {
        let policy = TaxiFilterPolicy::duration_model();
        assert!(policy.max_passengers.is_none());
        assert!(policy.max_speed_mph.is_none());
        assert_eq!(policy.max_duration_minutes, 120.0);
    }

    #[test]
    fn test_unchecked_columns_follow_policy() {
        assert!(TaxiFilterPolicy::standard().unchecked_columns().is_empty());
        assert_eq!(
            TaxiFilterPolicy::duration_model().unchecked_columns(),
            vec![columns::PASSENGER_COUNT, columns::TIP_AMOUNT]
        );
    }

    #[test]
    fn test_invalid_duration_bounds() {
        let policy = TaxiFilterPolicy {
            min_duration_minutes: 10.0,
            max_duration_minutes: 5.0,
            ..TaxiFilterPolicy::standard()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_zero_sample_cap_rejected() {
        let config = PipelineConfig::default().with_tip_sample(0);
        assert!(matches!(
            config.validate(),
            Err(AnalyticsError::Configuration { .. })
        ));
    }

    #[test]
    fn test_partial_json_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"seed": 7, "tip_sample": 1000}"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.tip_sample, 1000);
        assert_eq!(config.duration_sample, 300_000);
    }

    #[test]
    fn test_duration_forest_row_cap_can_be_lifted() {
        assert_eq!(ModelParams::default().duration.max_samples, Some(100_000));
        assert_eq!(ModelParams::default().tip.max_samples, None);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"models": {"duration": {"max_samples": null}}}"#).unwrap();

        let config = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.models.duration.max_samples, None);
        assert_eq!(config.models.tip.n_trees, 50);
    }
}
