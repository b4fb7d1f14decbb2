//! Train/evaluate protocol shared by the duration, tip and demand models
//!
//! Every model follows the same steps: drop incomplete rows, split 80/20
//! with a seeded generator, fit a random forest on the train part, score
//! the held-out part and rank the forest's feature importances.

use super::dataset::{FeatureMatrix, split_sizes, train_test_split};
use super::forest::{ForestConfig, RandomForest};
use super::metrics::{mean_absolute_error, r2_score, root_mean_squared_error};
use crate::constants::{TEST_FRACTION, precision};
use crate::error::{AnalyticsError, Result};
use crate::models::columns;
use crate::results::{FeatureImportance, ModelOutcome, PerformanceRecord, round_to};
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Fixed description of one model: its ordered features and target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub features: &'static [&'static str],
    pub target: &'static str,
    /// Decimals used for MAE (and RMSE when reported)
    pub mae_decimals: i32,
    pub report_rmse: bool,
}

impl ModelSpec {
    pub fn duration() -> Self {
        Self {
            name: "duration_model",
            features: &[
                columns::TRIP_DISTANCE,
                columns::PICKUP_HOUR,
                columns::DAY_OF_WEEK,
                columns::IS_WEEKEND,
                columns::IS_RUSH_HOUR,
                columns::PU_LOCATION_ID,
                columns::DO_LOCATION_ID,
            ],
            target: columns::TRIP_DURATION_MINUTES,
            mae_decimals: precision::MINUTES,
            report_rmse: true,
        }
    }

    pub fn tip() -> Self {
        Self {
            name: "tip_model",
            features: &[
                columns::TRIP_DISTANCE,
                columns::FARE_AMOUNT,
                columns::PICKUP_HOUR,
                columns::DAY_OF_WEEK,
                columns::IS_WEEKEND,
                columns::IS_RUSH_HOUR,
                columns::IS_NIGHT,
                columns::PASSENGER_COUNT,
            ],
            target: columns::TIP_PERCENTAGE,
            mae_decimals: precision::PERCENT,
            report_rmse: false,
        }
    }

    pub fn demand() -> Self {
        Self {
            name: "demand_model",
            features: &[
                columns::PICKUP_HOUR,
                columns::DAY_OF_WEEK,
                columns::IS_WEEKEND,
                columns::IS_RUSH_HOUR,
            ],
            target: columns::TRIP_COUNT,
            mae_decimals: precision::TRIP_COUNT,
            report_rmse: false,
        }
    }

    /// Extract this model's feature matrix from a frame
    pub fn matrix(&self, df: &DataFrame) -> Result<FeatureMatrix> {
        FeatureMatrix::from_frame(df, self.features, self.target)
    }
}

/// A fitted model bound to its ordered feature names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub feature_names: Vec<String>,
    pub target: String,
    pub trained_at: DateTime<Utc>,
    pub model: RandomForest,
}

impl ModelArtifact {
    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        self.model.predict(rows)
    }
}

#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub artifact: ModelArtifact,
    pub performance: PerformanceRecord,
}

/// Split, fit and score one model
///
/// Fails with `InsufficientData` when either partition would be empty; that
/// error is local to this model.
pub fn train_and_evaluate(
    spec: &ModelSpec,
    matrix: &FeatureMatrix,
    params: &ForestConfig,
    seed: u64,
) -> Result<TrainedModel> {
    let rows = matrix.n_samples();
    let (train_rows, test_rows) = split_sizes(rows, TEST_FRACTION);
    if train_rows == 0 || test_rows == 0 {
        return Err(AnalyticsError::InsufficientData {
            model: spec.name.to_string(),
            rows,
            train_rows,
            test_rows,
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let split = train_test_split(matrix, TEST_FRACTION, &mut rng);

    info!(
        "Training {} on {} rows ({} held out)",
        spec.name, train_rows, test_rows
    );

    let mut forest = RandomForest::new(ForestConfig {
        seed,
        ..params.clone()
    });
    forest.fit(&split.train);

    let predicted = forest.predict(&split.test.rows);
    let actual = &split.test.target;

    let mae = mean_absolute_error(actual, &predicted);
    let r2 = r2_score(actual, &predicted);
    let rmse = spec
        .report_rmse
        .then(|| round_to(root_mean_squared_error(actual, &predicted), spec.mae_decimals));

    let feature_importance = forest
        .feature_importance_ranking()
        .into_iter()
        .map(|(feature, importance)| FeatureImportance {
            feature,
            importance: round_to(importance, precision::IMPORTANCE),
        })
        .collect();

    let performance = PerformanceRecord {
        mae: round_to(mae, spec.mae_decimals),
        rmse,
        r2_score: round_to(r2, precision::R2),
        feature_importance,
        train_rows,
        test_rows,
    };

    info!(
        "{}: MAE {:.3}, R² {:.3}",
        spec.name, performance.mae, performance.r2_score
    );

    Ok(TrainedModel {
        artifact: ModelArtifact {
            name: spec.name.to_string(),
            feature_names: matrix.feature_names.clone(),
            target: spec.target.to_string(),
            trained_at: Utc::now(),
            model: forest,
        },
        performance,
    })
}

/// Turn a training result into a document outcome
///
/// Insufficient data becomes a skipped outcome with the reason; any other
/// error is propagated.
pub fn outcome_of(result: Result<TrainedModel>) -> Result<(ModelOutcome, Option<ModelArtifact>)> {
    match result {
        Ok(trained) => Ok((
            ModelOutcome::Trained(trained.performance),
            Some(trained.artifact),
        )),
        Err(e) if e.is_model_local() => {
            warn!("Skipping model: {}", e);
            Ok((ModelOutcome::Skipped { reason: e.to_string() }, None))
        }
        Err(e) => Err(e),
    }
}
