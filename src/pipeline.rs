//! Batch analytics pipeline.
//!
//! Orchestrates a run end to end: load raw batches from the data source,
//! sample, clean and derive features, then aggregate and train models on the
//! resulting frames, and finally merge the produced sections into the stored
//! result document and persist model artifacts.
//!
//! CPU-bound stages run on the blocking pool. Aggregation and the tip/demand
//! models only share immutable frames and run concurrently.

pub mod aggregate;
pub mod cleaner;
pub mod features;
pub mod sampling;
pub mod segments;
pub mod training;

#[cfg(test)]
mod tests;

use crate::config::{PipelineConfig, TaxiFilterPolicy};
use crate::error::{AnalyticsError, Result};
use crate::ml::trainer::ModelArtifact;
use crate::results::{
    AnalysisResults, DataQuality, DayValue, HourValue, MlResults, SourceQuality, TipAnalysis,
};
use crate::schema;
use crate::source::{DataSource, FileDataSource};
use crate::store::{JsonModelStore, JsonResultsStore, ModelStore, ResultsStore, merge_into_store};
use chrono::Utc;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Run name recorded in `data_quality` for the main analysis
pub const ANALYSIS_RUN: &str = "analysis";

/// Run name recorded in `data_quality` for the duration model run
pub const DURATION_RUN: &str = "duration_model";

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run: &'static str,
    /// Sections this run contributed
    pub sections: Vec<String>,
    /// The stored document after merging
    pub document: AnalysisResults,
    pub saved_models: Vec<PathBuf>,
    pub results_path: PathBuf,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Print a human-readable summary to stdout
    pub fn print(&self) {
        println!("\n{}", format!("Run '{}' complete", self.run).bright_green().bold());
        println!(
            "  {} {:.1}s",
            "Time elapsed:".bright_cyan(),
            self.elapsed.as_secs_f64()
        );
        println!(
            "  {} {}",
            "Results:".bright_cyan(),
            self.results_path.display().to_string().bright_white()
        );

        for quality in self
            .document
            .data_quality
            .runs
            .get(self.run)
            .into_iter()
            .flatten()
        {
            println!(
                "  {} {} raw, {} sampled, {} retained ({:.1}%)",
                format!("{} records:", quality.source()).bright_cyan(),
                quality.raw_rows,
                quality.cleaning.input_rows,
                quality.cleaning.retained_rows.to_string().bright_white().bold(),
                quality.cleaning.retention_pct()
            );
        }

        let ml = &self.document.ml_results;
        let tip = self.document.tip_analysis.as_ref().map(|t| &t.model_performance);
        for (name, outcome) in [
            ("duration", ml.duration_prediction.as_ref()),
            ("tip", tip),
            ("demand", ml.demand_prediction.as_ref()),
        ] {
            let Some(outcome) = outcome else { continue };
            match outcome.performance() {
                Some(p) => println!(
                    "  {} MAE {}, R² {}",
                    format!("{name} model:").bright_cyan(),
                    p.mae.to_string().bright_white(),
                    p.r2_score.to_string().bright_white()
                ),
                None => println!(
                    "  {} {}",
                    format!("{name} model:").bright_cyan(),
                    "skipped".bright_yellow()
                ),
            }
        }

        for path in &self.saved_models {
            println!(
                "  {} {}",
                "Model saved:".bright_cyan(),
                path.display().to_string().bright_white()
            );
        }
    }
}

/// Descriptive sections produced alongside model training in the main run
struct Descriptive {
    sections: AnalysisResults,
    tip_by_hour: Vec<HourValue>,
    tip_by_day: Vec<DayValue>,
}

/// Main entry point for analysis runs
pub struct AnalyticsPipeline {
    config: PipelineConfig,
    source: Arc<dyn DataSource>,
    results_store: Arc<dyn ResultsStore>,
    model_store: Arc<dyn ModelStore>,
}

impl AnalyticsPipeline {
    pub fn new(
        config: PipelineConfig,
        source: Arc<dyn DataSource>,
        results_store: Arc<dyn ResultsStore>,
        model_store: Arc<dyn ModelStore>,
    ) -> Self {
        Self {
            config,
            source,
            results_store,
            model_store,
        }
    }

    /// Pipeline backed by the files and output locations named in `config`
    pub fn from_config(config: PipelineConfig) -> Self {
        let source = Arc::new(FileDataSource::from_config(&config));
        let results_store = Arc::new(JsonResultsStore::new(config.results_path.clone()));
        let model_store = Arc::new(JsonModelStore::new(config.models_dir.clone()));
        Self::new(config, source, results_store, model_store)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Main analysis run: descriptive sections plus the tip and demand models
    pub async fn run_analysis(&self) -> Result<RunSummary> {
        let start = Instant::now();
        self.config.validate()?;
        info!("Starting analysis run (seed {})", self.config.seed);

        let pb = self.spinner("Loading and cleaning taxi trips...");
        let (taxi, taxi_quality) = {
            let source = Arc::clone(&self.source);
            let policy = self.config.taxi_policy.clone();
            let cap = self.config.source_sample;
            let seed = self.config.seed;
            blocking("taxi preparation", move || {
                prepare_taxi(source.taxi_trips()?, &policy, cap, seed)
            })
            .await?
        };
        pb.finish_with_message(format!("{} taxi records ready", taxi.height()));

        let pb = self.spinner("Loading and cleaning rideshare trips...");
        let (rideshare, rideshare_quality) = {
            let source = Arc::clone(&self.source);
            let cap = self.config.source_sample;
            let seed = self.config.seed;
            blocking("rideshare preparation", move || {
                prepare_rideshare(source.rideshare_trips()?, cap, seed)
            })
            .await?
        };
        pb.finish_with_message(format!("{} rideshare records ready", rideshare.height()));

        let zones = {
            let source = Arc::clone(&self.source);
            blocking("zone lookup", move || {
                Ok(schema::normalize_zones(source.zones()?)?.collect()?)
            })
            .await?
        };
        debug!("{} zones in lookup", zones.height());

        let pb = self.spinner("Aggregating and training tip/demand models...");
        let seed = self.config.seed;

        let tip_handle: JoinHandle<Result<training::ModelRun>> = {
            let taxi = taxi.clone();
            let params = self.config.models.tip.clone();
            let cap = self.config.tip_sample;
            task::spawn_blocking(move || training::train_tip(&taxi, cap, &params, seed))
        };
        let demand_handle: JoinHandle<Result<training::ModelRun>> = {
            let taxi = taxi.clone();
            let params = self.config.models.demand.clone();
            task::spawn_blocking(move || training::train_demand(&taxi, &params, seed))
        };
        let describe_handle: JoinHandle<Result<Descriptive>> =
            task::spawn_blocking(move || describe(taxi, rideshare, zones));

        let ((tip_outcome, tip_artifact), (demand_outcome, demand_artifact), descriptive) = tokio::try_join!(
            joined("tip model", tip_handle),
            joined("demand model", demand_handle),
            joined("aggregation", describe_handle),
        )?;
        pb.finish_with_message("Aggregation and training complete");

        let mut fragment = descriptive.sections;
        fragment.generated_at = Some(Utc::now());
        fragment.tip_analysis = Some(TipAnalysis {
            model_performance: tip_outcome,
            avg_tip_by_hour: descriptive.tip_by_hour,
            avg_tip_by_day: descriptive.tip_by_day,
        });
        fragment.ml_results = MlResults {
            duration_prediction: None,
            demand_prediction: Some(demand_outcome),
        };
        fragment.data_quality =
            DataQuality::for_run(ANALYSIS_RUN, vec![taxi_quality, rideshare_quality]);

        self.finish(ANALYSIS_RUN, fragment, [tip_artifact, demand_artifact], start)
    }

    /// Duration model run: trains the duration model and adds congestion analysis
    ///
    /// Its sections are merged into the stored document; sections from the
    /// main run are kept.
    pub async fn run_duration_model(&self) -> Result<RunSummary> {
        let start = Instant::now();
        self.config.validate()?;
        info!("Starting duration model run (seed {})", self.config.seed);

        let pb = self.spinner("Loading and cleaning taxi trips for the duration model...");
        let (taxi, quality) = {
            let source = Arc::clone(&self.source);
            let policy = self.config.duration_policy.clone();
            let cap = Some(self.config.duration_sample);
            let seed = self.config.seed;
            blocking("duration preparation", move || {
                prepare_taxi(source.taxi_trips()?, &policy, cap, seed)
            })
            .await?
        };
        pb.finish_with_message(format!("{} taxi records ready", taxi.height()));

        let pb = self.spinner("Training duration model...");
        let seed = self.config.seed;
        let train_handle = {
            let taxi = taxi.clone();
            let params = self.config.models.duration.clone();
            task::spawn_blocking(move || training::train_duration(&taxi, &params, seed))
        };
        let congestion_handle =
            task::spawn_blocking(move || aggregate::congestion_analysis(&taxi));

        let ((outcome, artifact), congestion) = tokio::try_join!(
            joined("duration model", train_handle),
            joined("congestion analysis", congestion_handle),
        )?;
        pb.finish_with_message("Duration model complete");

        let fragment = AnalysisResults {
            generated_at: Some(Utc::now()),
            congestion_analysis: Some(congestion),
            data_quality: DataQuality::for_run(DURATION_RUN, vec![quality]),
            ml_results: MlResults {
                duration_prediction: Some(outcome),
                demand_prediction: None,
            },
            ..Default::default()
        };

        self.finish(DURATION_RUN, fragment, [artifact], start)
    }

    /// Save every artifact, attempting all of them even after a failure
    ///
    /// The error names each model that could not be saved.
    fn save_models<const N: usize>(
        &self,
        artifacts: [Option<ModelArtifact>; N],
    ) -> Result<Vec<PathBuf>> {
        let mut saved = Vec::new();
        let mut failures = Vec::new();
        for artifact in artifacts.iter().flatten() {
            match self.model_store.save(artifact) {
                Ok(path) => saved.push(path),
                Err(e) => {
                    warn!("Could not save model '{}': {}", artifact.name, e);
                    failures.push((artifact.name.clone(), e));
                }
            }
        }

        let unsaved: Vec<String> = failures.iter().map(|(name, _)| name.clone()).collect();
        match failures.into_iter().next() {
            None => Ok(saved),
            Some((_, AnalyticsError::Persistence { target, reason, .. })) => {
                Err(AnalyticsError::Persistence {
                    target,
                    reason,
                    unsaved_sections: unsaved,
                })
            }
            Some((_, other)) => Err(AnalyticsError::Persistence {
                target: self.config.models_dir.clone(),
                reason: other.to_string(),
                unsaved_sections: unsaved,
            }),
        }
    }

    /// Merge the run's sections into the stored document, then save its models
    ///
    /// The document is written before any artifact, so a model store failure
    /// never discards computed sections.
    fn finish<const N: usize>(
        &self,
        run: &'static str,
        fragment: AnalysisResults,
        artifacts: [Option<ModelArtifact>; N],
        start: Instant,
    ) -> Result<RunSummary> {
        let sections = fragment.section_names();
        let document = merge_into_store(self.results_store.as_ref(), fragment)?;
        info!("Run '{}' merged sections: {}", run, sections.join(", "));

        let saved_models = self.save_models(artifacts)?;

        Ok(RunSummary {
            run,
            sections,
            document,
            saved_models,
            results_path: self.results_store.location(),
            elapsed: start.elapsed(),
        })
    }
}

/// Run a CPU-bound stage on the blocking pool
async fn blocking<T, F>(stage: &str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    joined(stage, task::spawn_blocking(f)).await
}

async fn joined<T>(stage: &str, handle: JoinHandle<Result<T>>) -> Result<T> {
    handle
        .await
        .map_err(|e| AnalyticsError::stage_failed(stage, e.to_string()))?
}

/// Sample, clean and derive one taxi batch; the raw batch is dropped here
pub fn prepare_taxi(
    raw: DataFrame,
    policy: &TaxiFilterPolicy,
    cap: Option<usize>,
    seed: u64,
) -> Result<(DataFrame, SourceQuality)> {
    let raw_rows = raw.height();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let sampled = sampling::sample_rows(raw, cap, &mut rng)?;
    let (cleaned, cleaning) = cleaner::clean_taxi(sampled, policy)?;
    let derived = features::derive_taxi(cleaned.lazy()).collect()?;
    Ok((derived, SourceQuality { raw_rows, cleaning }))
}

/// Sample, clean and derive one rideshare batch
pub fn prepare_rideshare(
    raw: DataFrame,
    cap: Option<usize>,
    seed: u64,
) -> Result<(DataFrame, SourceQuality)> {
    let raw_rows = raw.height();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let sampled = sampling::sample_rows(raw, cap, &mut rng)?;
    let (cleaned, cleaning) = cleaner::clean_rideshare(sampled)?;
    let derived = features::derive_rideshare(cleaned)?;
    Ok((derived, SourceQuality { raw_rows, cleaning }))
}

/// Every descriptive section of the main run, computed on zone-enriched frames
fn describe(taxi: DataFrame, rideshare: DataFrame, zones: DataFrame) -> Result<Descriptive> {
    let taxi = features::join_zones(taxi.lazy(), zones.clone().lazy()).collect()?;
    let rideshare = features::join_zones(rideshare.lazy(), zones.lazy()).collect()?;

    let taxi_hours = aggregate::counts_by_hour(&taxi)?;
    let rideshare_hours = aggregate::counts_by_hour(&rideshare)?;
    let (tip_by_hour, tip_by_day) = aggregate::tip_by_hour_and_day(&taxi)?;

    let sections = AnalysisResults {
        summary_stats: Some(aggregate::summary_stats(&taxi, &rideshare)?),
        hourly_demand: Some(aggregate::hourly_demand(&taxi_hours, &rideshare_hours)),
        daily_demand: Some(aggregate::daily_demand(&taxi, &rideshare)?),
        borough_analysis: Some(aggregate::borough_analysis(&taxi, &rideshare)?),
        market_share: Some(aggregate::market_share(
            &taxi_hours,
            &rideshare_hours,
            taxi.height(),
            &rideshare,
        )?),
        profitable_locations: Some(aggregate::profitable_locations(&taxi)?),
        airport_analysis: Some(segments::airport_analysis(&taxi)?),
        nightlife_analysis: Some(segments::nightlife_analysis(&taxi)?),
        ..Default::default()
    };

    Ok(Descriptive {
        sections,
        tip_by_hour,
        tip_by_day,
    })
}
