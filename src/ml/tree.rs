//! CART regression tree
//!
//! Splits minimize the summed squared error of the children. Candidate
//! thresholds are midpoints between consecutive distinct feature values,
//! found with a single sorted sweep per feature.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Regression tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth of tree
    pub max_depth: usize,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Maximum features to consider for split (None = all)
    pub max_features: Option<usize>,
    /// Random seed for feature sub-sampling
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 8,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Regression tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    feature_importances: Vec<f64>,
}

impl RegressionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            feature_importances: Vec::new(),
        }
    }

    /// Fit on the rows selected by `indices` (duplicates allowed for bootstrap samples)
    pub fn fit(&mut self, rows: &[Vec<f64>], target: &[f64], indices: &[usize]) {
        let n_features = rows.first().map(|r| r.len()).unwrap_or(0);
        self.feature_importances = vec![0.0; n_features];

        if indices.is_empty() {
            self.root = None;
            return;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let root = self.build(rows, target, indices, 0, &mut rng);
        self.root = Some(root);

        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    fn build(
        &mut self,
        rows: &[Vec<f64>],
        target: &[f64],
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let (sum, sum_sq) = indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
            (s + target[i], sq + target[i] * target[i])
        });
        let mean = sum / n as f64;
        let sse = sum_sq - sum * sum / n as f64;

        if depth >= self.config.max_depth || n < self.config.min_samples_split || sse <= 1e-10 {
            return TreeNode::Leaf {
                value: mean,
                n_samples: n,
            };
        }

        let Some(split) = self.find_best_split(rows, target, indices, sum, sum_sq, rng) else {
            return TreeNode::Leaf {
                value: mean,
                n_samples: n,
            };
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| rows[i][split.feature] <= split.threshold);

        self.feature_importances[split.feature] += split.gain;

        let left = self.build(rows, target, &left_idx, depth + 1, rng);
        let right = self.build(rows, target, &right_idx, depth + 1, rng);

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn find_best_split(
        &self,
        rows: &[Vec<f64>],
        target: &[f64],
        indices: &[usize],
        total_sum: f64,
        total_sq: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let n_features = rows[indices[0]].len();
        let max_features = self
            .config
            .max_features
            .unwrap_or(n_features)
            .clamp(1, n_features.max(1));

        let mut feature_indices: Vec<usize> = (0..n_features).collect();
        feature_indices.shuffle(rng);
        feature_indices.truncate(max_features);

        let parent_sse = total_sq - total_sum * total_sum / n as f64;
        let min_leaf = self.config.min_samples_leaf.max(1);
        let mut best: Option<BestSplit> = None;
        let mut ordered: Vec<(f64, f64)> = Vec::with_capacity(n);

        for &feature in &feature_indices {
            ordered.clear();
            ordered.extend(indices.iter().map(|&i| (rows[i][feature], target[i])));
            ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 0..n - 1 {
                let (value, y) = ordered[k];
                left_sum += y;
                left_sq += y * y;

                let next_value = ordered[k + 1].0;
                if value == next_value {
                    continue;
                }

                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = left_sq - left_sum * left_sum / n_left as f64;
                let right_sse = right_sq - right_sum * right_sum / n_right as f64;
                let gain = parent_sse - left_sse - right_sse;

                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (value + next_value) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Predict for a single sample
    pub fn predict_one(&self, features: &[f64]) -> f64 {
        let mut node = match &self.root {
            Some(root) => root,
            None => return 0.0,
        };

        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }

    /// Normalized impurity-decrease importance per feature
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Number of split levels (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map(node_depth).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut rows = Vec::new();
        let mut target = Vec::new();
        for i in 0..100 {
            let x = i as f64;
            let noise = (i % 3) as f64;
            rows.push(vec![x, noise]);
            target.push(if x < 50.0 { 10.0 } else { 30.0 });
        }
        (rows, target)
    }

    #[test]
    fn test_tree_learns_step_function() {
        let (rows, target) = step_data();
        let indices: Vec<usize> = (0..rows.len()).collect();
        let mut tree = RegressionTree::new(TreeConfig::default());
        tree.fit(&rows, &target, &indices);

        assert_eq!(tree.predict_one(&[10.0, 0.0]), 10.0);
        assert_eq!(tree.predict_one(&[80.0, 2.0]), 30.0);
        assert!(tree.feature_importances()[0] > 0.99);
    }

    #[test]
    fn test_max_depth_respected() {
        let (rows, target) = step_data();
        let indices: Vec<usize> = (0..rows.len()).collect();
        let mut tree = RegressionTree::new(TreeConfig {
            max_depth: 1,
            ..Default::default()
        });
        tree.fit(&rows, &target, &indices);

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_one(&[0.0, 0.0]), 10.0);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let target = vec![5.0, 5.0, 5.0];
        let mut tree = RegressionTree::new(TreeConfig::default());
        tree.fit(&rows, &target, &[0, 1, 2]);

        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict_one(&[100.0]), 5.0);
        assert_eq!(tree.feature_importances(), &[0.0]);
    }

    #[test]
    fn test_unfitted_tree_predicts_zero() {
        let tree = RegressionTree::new(TreeConfig::default());
        assert_eq!(tree.predict_one(&[1.0]), 0.0);
    }
}
