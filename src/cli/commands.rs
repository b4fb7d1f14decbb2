//! Command implementations for the analytics CLI
//!
//! Sets up logging, layers the configuration (defaults, optional JSON file,
//! command-line overrides) and dispatches to the pipeline run.

use crate::cli::args::{Args, Commands, RunArgs};
use crate::config::PipelineConfig;
use crate::error::AnalyticsError;
use crate::pipeline::{AnalyticsPipeline, RunSummary};
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Main command runner
///
/// 1. Validate arguments and set up logging
/// 2. Build the pipeline configuration
/// 3. Run the selected pipeline and print its summary
pub async fn run(args: Args) -> Result<RunSummary> {
    let command = args
        .command
        .ok_or_else(|| AnalyticsError::configuration("No command given"))?;
    let run_args = command.run_args();

    run_args.validate().context("Invalid arguments")?;
    setup_logging(run_args);

    let config = build_config(run_args)?;
    info!(
        "Running '{}' with results at {}",
        command.name(),
        config.results_path.display()
    );

    let show_summary = config.show_progress;
    let pipeline = AnalyticsPipeline::from_config(config);
    let summary = match command {
        Commands::Analyze(_) => pipeline.run_analysis().await.context("Analysis run failed")?,
        Commands::Duration(_) => pipeline
            .run_duration_model()
            .await
            .context("Duration model run failed")?,
    };

    if show_summary {
        summary.print();
    }
    Ok(summary)
}

/// Set up structured logging
///
/// `RUST_LOG` overrides the level derived from `-v`/`-q`.
pub fn setup_logging(args: &RunArgs) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mobility_analytics={}", log_level)));

    let initialized = if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if initialized.is_ok() {
        debug!("Logging initialized at level: {}", log_level);
    }
}

/// Layer configuration: defaults, then the JSON file, then flags
pub fn build_config(args: &RunArgs) -> Result<PipelineConfig> {
    let mut config = match &args.config_file {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(path) = &args.taxi_path {
        config.taxi_path = Some(path.clone());
    }
    if let Some(path) = &args.rideshare_path {
        config.rideshare_path = Some(path.clone());
    }
    if let Some(path) = &args.zones_path {
        config.zones_path = Some(path.clone());
    }
    if args.results_path.is_some() || args.config_file.is_none() {
        config.results_path = args.results_path_or_default();
    }
    if args.models_dir.is_some() || args.config_file.is_none() {
        config.models_dir = args.models_dir_or_default();
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    if args.no_sample {
        config = config.with_source_sample(None);
    } else if let Some(cap) = args.sample {
        config = config.with_source_sample(Some(cap));
    }
    if let Some(cap) = args.tip_sample {
        config = config.with_tip_sample(cap);
    }
    if let Some(cap) = args.duration_sample {
        config = config.with_duration_sample(cap);
    }
    if !args.show_progress() {
        config = config.without_progress();
    }

    config.validate().context("Invalid configuration")?;
    debug!("Effective configuration: {:?}", config);
    Ok(config)
}
