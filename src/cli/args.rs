//! Command-line argument definitions for the trip analytics pipeline
//!
//! Two subcommands share one set of source and output options: `analyze`
//! runs the full descriptive analysis with the tip and demand models, and
//! `duration` trains the duration model and merges it into an existing
//! result document.

use crate::constants::{DEFAULT_MODELS_DIR, DEFAULT_RESULTS_FILE};
use crate::error::{AnalyticsError, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the trip analytics pipeline
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mobility_analytics",
    version,
    about = "Clean, aggregate and model taxi and rideshare trip batches",
    long_about = "Loads a yellow-taxi batch, a high-volume rideshare batch and a zone lookup, \
                  cleans and enriches the trips, computes demand, market share, profitability \
                  and segment aggregates, trains random-forest models for trip duration, tip \
                  percentage and hourly demand, and writes everything to a JSON result document."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Full analysis with the tip and demand models
    Analyze(RunArgs),
    /// Train the duration model and merge it into the result document
    Duration(RunArgs),
}

impl Commands {
    pub fn run_args(&self) -> &RunArgs {
        match self {
            Commands::Analyze(args) | Commands::Duration(args) => args,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Commands::Analyze(_) => "analyze",
            Commands::Duration(_) => "duration",
        }
    }
}

/// Options shared by both runs
#[derive(Debug, Clone, ClapArgs)]
pub struct RunArgs {
    /// Yellow-taxi trip batch (.parquet or .csv)
    #[arg(long = "taxi", value_name = "FILE")]
    pub taxi_path: Option<PathBuf>,

    /// High-volume rideshare trip batch (.parquet or .csv)
    #[arg(long = "rideshare", value_name = "FILE")]
    pub rideshare_path: Option<PathBuf>,

    /// Taxi zone lookup table (.csv or .parquet)
    #[arg(long = "zones", value_name = "FILE")]
    pub zones_path: Option<PathBuf>,

    /// Result document to create or merge into
    #[arg(
        short = 'o',
        long = "results",
        value_name = "FILE",
        help = "Result document path [default: analysis_results.json]"
    )]
    pub results_path: Option<PathBuf>,

    /// Directory for serialized models
    #[arg(
        long = "models-dir",
        value_name = "DIR",
        help = "Directory for serialized models [default: models]"
    )]
    pub models_dir: Option<PathBuf>,

    /// JSON configuration file
    ///
    /// Fields left out take their defaults; command-line options override
    /// values from the file.
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Seed for sampling and train/test splits
    #[arg(long = "seed", value_name = "SEED")]
    pub seed: Option<u64>,

    /// Cap on raw records per source in the analysis run
    #[arg(long = "sample", value_name = "ROWS", conflicts_with = "no_sample")]
    pub sample: Option<usize>,

    /// Use every raw record in the analysis run
    #[arg(long = "no-sample")]
    pub no_sample: bool,

    /// Cap on tipped records used for the tip model
    #[arg(long = "tip-sample", value_name = "ROWS")]
    pub tip_sample: Option<usize>,

    /// Cap on raw taxi records used for the duration model
    #[arg(long = "duration-sample", value_name = "ROWS")]
    pub duration_sample: Option<usize>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors; hides the progress spinner and summary
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl RunArgs {
    /// Check that explicitly named files exist
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("taxi batch", &self.taxi_path),
            ("rideshare batch", &self.rideshare_path),
            ("zone lookup", &self.zones_path),
            ("config file", &self.config_file),
        ];
        for (what, path) in named {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(AnalyticsError::configuration(format!(
                        "{} does not exist: {}",
                        what,
                        path.display()
                    )));
                }
            }
        }

        if [self.sample, self.tip_sample, self.duration_sample].contains(&Some(0)) {
            return Err(AnalyticsError::configuration(
                "Sample caps must be greater than 0",
            ));
        }

        Ok(())
    }

    pub fn results_path_or_default(&self) -> PathBuf {
        self.results_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_FILE))
    }

    pub fn models_dir_or_default(&self) -> PathBuf {
        self.models_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR))
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}
