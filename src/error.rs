//! Error handling for trip analytics operations.
//!
//! Provides error types with enough context to identify the failing stage,
//! source type or model: schema violations, insufficient training data,
//! persistence failures and wrapped I/O / Polars / JSON errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema error for {source_type} data: missing required columns [{}]", missing.join(", "))]
    Schema {
        source_type: String,
        missing: Vec<String>,
    },

    #[error(
        "Insufficient data for model '{model}': {rows} rows gives {train_rows} train / {test_rows} test rows"
    )]
    InsufficientData {
        model: String,
        rows: usize,
        train_rows: usize,
        test_rows: usize,
    },

    #[error("Failed to persist to {target}: {reason} (unsaved: {})", unsaved_sections.join(", "))]
    Persistence {
        target: PathBuf,
        reason: String,
        unsaved_sections: Vec<String>,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Stage '{stage}' failed: {reason}")]
    StageFailed { stage: String, reason: String },

    #[error("Run interrupted: {reason}")]
    Interrupted { reason: String },
}

impl AnalyticsError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a stage failure error
    pub fn stage_failed(stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StageFailed {
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Create an interrupted error
    pub fn interrupted(reason: impl Into<String>) -> Self {
        Self::Interrupted {
            reason: reason.into(),
        }
    }

    /// True for errors that only invalidate a single model, not the run
    pub fn is_model_local(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
