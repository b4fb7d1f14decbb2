//! Tests for cleaning, aggregation, segments and model inputs
//!
//! Fixtures build raw batches in the source schemas with `df!`, so every
//! test goes through schema normalization like real input does.

pub mod cleaning_tests;
pub mod segment_tests;
