//! Tree-ensemble regression and the shared train/evaluate protocol.

pub mod dataset;
pub mod forest;
pub mod metrics;
pub mod trainer;
pub mod tree;

pub use dataset::{FeatureMatrix, TrainTestSplit, split_sizes, train_test_split};
pub use forest::{ForestConfig, RandomForest};
pub use trainer::{ModelArtifact, ModelSpec, TrainedModel, outcome_of, train_and_evaluate};
