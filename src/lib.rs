//! Mobility Analytics Library
//!
//! Batch analytics over one month of taxi and rideshare trip records.
//!
//! This library provides tools for:
//! - Validating and cleaning raw taxi and rideshare batches
//! - Deriving time, tip, fare, duration and speed features
//! - Aggregating demand, market share, profitability and trip segments
//! - Training random-forest models for trip duration, tip percentage and demand
//! - Merging everything into a persistent JSON result document

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod ml;
pub mod models;
pub mod pipeline;
pub mod results;
pub mod schema;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use config::{ModelParams, PipelineConfig, TaxiFilterPolicy};
pub use error::{AnalyticsError, Result};
pub use ml::{ForestConfig, ModelArtifact, RandomForest};
pub use pipeline::{AnalyticsPipeline, RunSummary};
pub use results::{AnalysisResults, ModelOutcome, PerformanceRecord};
pub use source::{DataSource, FileDataSource, FrameDataSource};
pub use store::{JsonModelStore, JsonResultsStore, ModelStore, ResultsStore};
