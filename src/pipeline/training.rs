//! Model inputs and training runs for the duration, tip and demand models

use super::sampling::sample_rows;
use crate::error::Result;
use crate::ml::forest::ForestConfig;
use crate::ml::trainer::{ModelArtifact, ModelSpec, outcome_of, train_and_evaluate};
use crate::models::columns;
use crate::results::ModelOutcome;
use polars::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Outcome plus the artifact to persist, if the model trained
pub type ModelRun = (ModelOutcome, Option<ModelArtifact>);

fn complete_rows(spec: &ModelSpec) -> Expr {
    spec.features
        .iter()
        .chain(std::iter::once(&spec.target))
        .fold(lit(true), |acc, name| acc.and(col(*name).is_not_null()))
}

/// Tipped records with complete tip features, sampled to at most `cap` rows
pub fn tip_training_frame(taxi: &DataFrame, cap: usize, seed: u64) -> Result<DataFrame> {
    let spec = ModelSpec::tip();
    let tipped = taxi
        .clone()
        .lazy()
        .filter(complete_rows(&spec))
        .filter(col(columns::TIP_PERCENTAGE).gt(lit(0.0)))
        .collect()?;
    debug!("{} tipped records eligible for the tip model", tipped.height());

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    sample_rows(tipped, Some(cap), &mut rng)
}

/// Trip counts per (pickup date, hour) bucket, ordered by date then hour
///
/// Weekend and rush flags come from the first record in each bucket and
/// day-of-week is recomputed from the date.
pub fn demand_buckets(taxi: &DataFrame) -> Result<DataFrame> {
    Ok(taxi
        .clone()
        .lazy()
        .group_by([col(columns::PICKUP_DATE), col(columns::PICKUP_HOUR)])
        .agg([
            len().alias(columns::TRIP_COUNT),
            col(columns::IS_WEEKEND).first(),
            col(columns::IS_RUSH_HOUR).first(),
        ])
        .with_column(
            (col(columns::PICKUP_DATE).dt().weekday().cast(DataType::Int32) - lit(1))
                .alias(columns::DAY_OF_WEEK),
        )
        .sort_by_exprs(
            [col(columns::PICKUP_DATE), col(columns::PICKUP_HOUR)],
            SortMultipleOptions::default(),
        )
        .collect()?)
}

fn run(spec: ModelSpec, frame: &DataFrame, params: &ForestConfig, seed: u64) -> Result<ModelRun> {
    let matrix = spec.matrix(frame)?;
    outcome_of(train_and_evaluate(&spec, &matrix, params, seed))
}

pub fn train_tip(taxi: &DataFrame, cap: usize, params: &ForestConfig, seed: u64) -> Result<ModelRun> {
    let frame = tip_training_frame(taxi, cap, seed)?;
    run(ModelSpec::tip(), &frame, params, seed)
}

pub fn train_demand(taxi: &DataFrame, params: &ForestConfig, seed: u64) -> Result<ModelRun> {
    let buckets = demand_buckets(taxi)?;
    debug!("{} (date, hour) demand buckets", buckets.height());
    run(ModelSpec::demand(), &buckets, params, seed)
}

/// Train the duration model on records cleaned with the duration policy
pub fn train_duration(taxi: &DataFrame, params: &ForestConfig, seed: u64) -> Result<ModelRun> {
    run(ModelSpec::duration(), taxi, params, seed)
}
