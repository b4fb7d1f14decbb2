//! Raw record providers.
//!
//! A `DataSource` hands the pipeline fully materialized raw batches; the
//! pipeline never sees file paths. `FileDataSource` reads parquet or CSV by
//! extension, `FrameDataSource` serves frames already in memory.

use crate::config::PipelineConfig;
use crate::error::{AnalyticsError, Result};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Provider of raw taxi, rideshare and zone batches
pub trait DataSource: Send + Sync {
    fn taxi_trips(&self) -> Result<DataFrame>;
    fn rideshare_trips(&self) -> Result<DataFrame>;
    fn zones(&self) -> Result<DataFrame>;
}

/// Read a parquet or CSV file into a frame, choosing the reader by extension
pub fn read_frame(path: &Path) -> Result<DataFrame> {
    if !path.exists() {
        return Err(AnalyticsError::configuration(format!(
            "input file not found: {}",
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let df = match extension.as_deref() {
        Some("parquet") => LazyFrame::scan_parquet(path, ScanArgsParquet::default())?.collect()?,
        Some("csv") => CsvReadOptions::default()
            .with_has_header(true)
            .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?,
        _ => {
            return Err(AnalyticsError::configuration(format!(
                "unsupported input format for {} (expected .parquet or .csv)",
                path.display()
            )));
        }
    };

    info!("Loaded {} rows from {}", df.height(), path.display());
    Ok(df)
}

/// Batches read from parquet/CSV files
#[derive(Debug, Clone, Default)]
pub struct FileDataSource {
    taxi_path: Option<PathBuf>,
    rideshare_path: Option<PathBuf>,
    zones_path: Option<PathBuf>,
}

impl FileDataSource {
    pub fn new(
        taxi_path: Option<PathBuf>,
        rideshare_path: Option<PathBuf>,
        zones_path: Option<PathBuf>,
    ) -> Self {
        Self {
            taxi_path,
            rideshare_path,
            zones_path,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.taxi_path.clone(),
            config.rideshare_path.clone(),
            config.zones_path.clone(),
        )
    }

    fn read(path: &Option<PathBuf>, what: &str) -> Result<DataFrame> {
        let path = path.as_deref().ok_or_else(|| {
            AnalyticsError::configuration(format!("no {what} input path configured"))
        })?;
        debug!("Reading {} batch from {}", what, path.display());
        read_frame(path)
    }
}

impl DataSource for FileDataSource {
    fn taxi_trips(&self) -> Result<DataFrame> {
        Self::read(&self.taxi_path, "taxi")
    }

    fn rideshare_trips(&self) -> Result<DataFrame> {
        Self::read(&self.rideshare_path, "rideshare")
    }

    fn zones(&self) -> Result<DataFrame> {
        Self::read(&self.zones_path, "zone lookup")
    }
}

/// Batches held in memory
#[derive(Debug, Clone, Default)]
pub struct FrameDataSource {
    taxi: Option<DataFrame>,
    rideshare: Option<DataFrame>,
    zones: Option<DataFrame>,
}

impl FrameDataSource {
    pub fn new(taxi: DataFrame, rideshare: DataFrame, zones: DataFrame) -> Self {
        Self {
            taxi: Some(taxi),
            rideshare: Some(rideshare),
            zones: Some(zones),
        }
    }

    /// Source for the duration run, which only needs taxi records
    pub fn taxi_only(taxi: DataFrame) -> Self {
        Self {
            taxi: Some(taxi),
            ..Default::default()
        }
    }

    fn get(frame: &Option<DataFrame>, what: &str) -> Result<DataFrame> {
        frame
            .clone()
            .ok_or_else(|| AnalyticsError::configuration(format!("no {what} frame supplied")))
    }
}

impl DataSource for FrameDataSource {
    fn taxi_trips(&self) -> Result<DataFrame> {
        Self::get(&self.taxi, "taxi")
    }

    fn rideshare_trips(&self) -> Result<DataFrame> {
        Self::get(&self.rideshare, "rideshare")
    }

    fn zones(&self) -> Result<DataFrame> {
        Self::get(&self.zones, "zone lookup")
    }
}
