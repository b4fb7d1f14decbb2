//! Persistence for the result document and trained model artifacts.
//!
//! Both stores write pretty JSON. A write goes to a sibling temporary file
//! first and is renamed into place, so a failed save leaves the previous
//! document intact. Failures are reported as `Persistence` errors naming the
//! target and what was not saved.

use crate::error::{AnalyticsError, Result};
use crate::ml::trainer::ModelArtifact;
use crate::results::AnalysisResults;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Storage for the JSON result document
pub trait ResultsStore: Send + Sync {
    /// Load the stored document, `None` if nothing has been saved yet
    fn load(&self) -> Result<Option<AnalysisResults>>;

    fn save(&self, results: &AnalysisResults) -> Result<()>;

    /// Where the document lives, for messages
    fn location(&self) -> PathBuf;
}

/// Storage for trained model artifacts
pub trait ModelStore: Send + Sync {
    /// Persist an artifact and return where it was written
    fn save(&self, artifact: &ModelArtifact) -> Result<PathBuf>;
}

/// Load the stored document, merge `fragment` into it and save the result
///
/// Sections carried by the fragment replace stored ones; everything else
/// the stored document holds is kept.
pub fn merge_into_store(
    store: &dyn ResultsStore,
    fragment: AnalysisResults,
) -> Result<AnalysisResults> {
    let mut document = match store.load()? {
        Some(existing) => {
            debug!(
                "Merging into existing document with sections: {:?}",
                existing.section_names()
            );
            existing
        }
        None => AnalysisResults::default(),
    };
    document.merge(fragment);
    store.save(&document)?;
    Ok(document)
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)
}

/// Result document stored as one pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct JsonResultsStore {
    path: PathBuf,
}

impl JsonResultsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultsStore for JsonResultsStore {
    fn load(&self) -> Result<Option<AnalysisResults>> {
        if !self.path.exists() {
            debug!("No result document at {}", self.path.display());
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)?;
        let document: AnalysisResults = serde_json::from_str(&contents)?;
        Ok(Some(document))
    }

    fn save(&self, results: &AnalysisResults) -> Result<()> {
        write_json_atomic(&self.path, results).map_err(|e| AnalyticsError::Persistence {
            target: self.path.clone(),
            reason: e.to_string(),
            unsaved_sections: results.section_names(),
        })?;
        info!("Results saved to {}", self.path.display());
        Ok(())
    }

    fn location(&self) -> PathBuf {
        self.path.clone()
    }
}

/// Model artifacts stored as `<dir>/<model name>.json`
#[derive(Debug, Clone)]
pub struct JsonModelStore {
    dir: PathBuf,
}

impl JsonModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Read back a previously saved artifact
    pub fn load(&self, name: &str) -> Result<ModelArtifact> {
        let contents = fs::read_to_string(self.artifact_path(name))?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl ModelStore for JsonModelStore {
    fn save(&self, artifact: &ModelArtifact) -> Result<PathBuf> {
        let path = self.artifact_path(&artifact.name);
        write_json_atomic(&path, artifact).map_err(|e| AnalyticsError::Persistence {
            target: path.clone(),
            reason: e.to_string(),
            unsaved_sections: vec![artifact.name.clone()],
        })?;
        info!("Model '{}' saved to {}", artifact.name, path.display());
        Ok(path)
    }
}
