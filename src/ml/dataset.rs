//! Feature matrices and the train/test split

use crate::error::Result;
use polars::prelude::*;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Row-major feature matrix with a target vector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub target: Vec<f64>,
}

impl FeatureMatrix {
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            rows: Vec::new(),
            target: Vec::new(),
        }
    }

    /// Build a matrix from frame columns, dropping rows with any missing value
    ///
    /// Every feature and the target are cast to Float64 (booleans become 0/1).
    pub fn from_frame(df: &DataFrame, features: &[&str], target: &str) -> Result<Self> {
        let feature_columns = features
            .iter()
            .map(|name| float_values(df, name))
            .collect::<Result<Vec<_>>>()?;
        let target_values = float_values(df, target)?;

        let mut matrix = Self::new(features.iter().map(|s| s.to_string()).collect());
        let mut dropped = 0usize;

        for (row_idx, y) in target_values.iter().enumerate() {
            let row: Option<Vec<f64>> = feature_columns
                .iter()
                .map(|column| column[row_idx].filter(|v| v.is_finite()))
                .collect();

            match (row, y.filter(|v| v.is_finite())) {
                (Some(row), Some(y)) => matrix.push(row, y),
                _ => dropped += 1,
            }
        }

        debug!(
            "Feature matrix for '{}': {} rows kept, {} dropped for missing values",
            target,
            matrix.n_samples(),
            dropped
        );
        Ok(matrix)
    }

    pub fn push(&mut self, row: Vec<f64>, target: f64) {
        self.rows.push(row);
        self.target.push(target);
    }

    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy the given rows into a new matrix
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            target: indices.iter().map(|&i| self.target[i]).collect(),
        }
    }
}

fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

/// Partition sizes for `n` rows: test = floor(n * fraction), train = rest
pub fn split_sizes(n: usize, test_fraction: f64) -> (usize, usize) {
    let test = (n as f64 * test_fraction).floor() as usize;
    (n - test.min(n), test.min(n))
}

/// Train/test partition of a feature matrix
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: FeatureMatrix,
    pub test: FeatureMatrix,
    pub test_indices: Vec<usize>,
}

/// Shuffle row indices with `rng` and hold out the first `floor(n * fraction)`
///
/// Identical input and generator state always produce the identical split.
pub fn train_test_split<R: Rng + ?Sized>(
    matrix: &FeatureMatrix,
    test_fraction: f64,
    rng: &mut R,
) -> TrainTestSplit {
    let n = matrix.n_samples();
    let (_, n_test) = split_sizes(n, test_fraction);

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    let test_indices = indices[..n_test].to_vec();
    let train_indices = &indices[n_test..];

    TrainTestSplit {
        train: matrix.subset(train_indices),
        test: matrix.subset(&test_indices),
        test_indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sequential_matrix(n: usize) -> FeatureMatrix {
        let mut matrix = FeatureMatrix::new(vec!["x".to_string()]);
        for i in 0..n {
            matrix.push(vec![i as f64], i as f64 * 2.0);
        }
        matrix
    }

    #[test]
    fn test_split_sizes_floor_test_partition() {
        assert_eq!(split_sizes(3, 0.2), (3, 0));
        assert_eq!(split_sizes(5, 0.2), (4, 1));
        assert_eq!(split_sizes(100, 0.2), (80, 20));
        assert_eq!(split_sizes(0, 0.2), (0, 0));
    }

    #[test]
    fn test_split_is_reproducible() {
        let matrix = sequential_matrix(50);
        let first = train_test_split(&matrix, 0.2, &mut ChaCha8Rng::seed_from_u64(42));
        let second = train_test_split(&matrix, 0.2, &mut ChaCha8Rng::seed_from_u64(42));

        assert_eq!(first.test_indices, second.test_indices);
        assert_eq!(first.train.target, second.train.target);
        assert_eq!(first.test.n_samples(), 10);
        assert_eq!(first.train.n_samples(), 40);
    }

    #[test]
    fn test_split_partitions_are_disjoint() {
        let matrix = sequential_matrix(20);
        let split = train_test_split(&matrix, 0.2, &mut ChaCha8Rng::seed_from_u64(1));

        let mut seen: Vec<f64> = split
            .train
            .rows
            .iter()
            .chain(split.test.rows.iter())
            .map(|row| row[0])
            .collect();
        seen.sort_by(|a, b| a.total_cmp(b));
        let expected: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_from_frame_drops_missing_rows() {
        let df = df!(
            "a" => [Some(1.0), None, Some(3.0)],
            "flag" => [true, false, false],
            "y" => [Some(10.0), Some(20.0), None]
        )
        .unwrap();

        let matrix = FeatureMatrix::from_frame(&df, &["a", "flag"], "y").unwrap();
        assert_eq!(matrix.n_samples(), 1);
        assert_eq!(matrix.rows[0], vec![1.0, 1.0]);
        assert_eq!(matrix.target, vec![10.0]);
    }
}
