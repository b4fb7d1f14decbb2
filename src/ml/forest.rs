//! Random forest regressor
//!
//! Trees are fitted in parallel, each from its own seeded generator, and
//! collected in tree order, so the fitted forest depends only on the data
//! and the configured seed.

use super::dataset::FeatureMatrix;
use super::tree::{RegressionTree, TreeConfig};
use crate::constants::DEFAULT_SEED;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Random forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Max features per split (all features if None)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Cap on rows drawn per tree (all rows if None)
    pub max_samples: Option<usize>,
    /// Random seed
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 8,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            max_samples: None,
            seed: DEFAULT_SEED,
        }
    }
}

/// Random forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    feature_names: Vec<String>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_names: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    /// Train the forest
    pub fn fit(&mut self, data: &FeatureMatrix) {
        self.feature_names = data.feature_names.clone();
        let n_features = data.n_features();
        let n = data.n_samples();

        if n == 0 {
            self.trees.clear();
            self.feature_importances = vec![0.0; n_features];
            return;
        }

        let sample_size = self.config.max_samples.map_or(n, |cap| cap.clamp(1, n));
        debug!(
            "Fitting {} trees on {} rows ({} per tree, {} features)",
            self.config.n_trees, n, sample_size, n_features
        );

        let config = &self.config;
        let trees: Vec<RegressionTree> = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed.wrapping_add(i as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let indices: Vec<usize> = if config.bootstrap {
                    (0..sample_size).map(|_| rng.gen_range(0..n)).collect()
                } else if sample_size < n {
                    index::sample(&mut rng, n, sample_size).into_vec()
                } else {
                    (0..n).collect()
                };

                let mut tree = RegressionTree::new(TreeConfig {
                    max_depth: config.max_depth,
                    min_samples_split: config.min_samples_split,
                    min_samples_leaf: config.min_samples_leaf,
                    max_features: config.max_features,
                    seed,
                });
                tree.fit(&data.rows, &data.target, &indices);
                tree
            })
            .collect();

        self.trees = trees;

        // Aggregate feature importances
        self.feature_importances = vec![0.0; n_features];
        for tree in &self.trees {
            for (i, &imp) in tree.feature_importances().iter().enumerate() {
                self.feature_importances[i] += imp;
            }
        }

        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    /// Predict for a single sample
    pub fn predict_one(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|t| t.predict_one(features)).sum();
        total / self.trees.len() as f64
    }

    /// Predict for multiple samples
    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.par_iter().map(|row| self.predict_one(row)).collect()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Feature names with importances, highest first (ties keep feature order)
    pub fn feature_importance_ranking(&self) -> Vec<(String, f64)> {
        let mut ranking: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.feature_importances.iter().copied())
            .collect();
        ranking.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranking
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
