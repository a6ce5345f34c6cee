//! Synthetic data generation module
//!
//! Class-imbalance correction for the training split:
//! - SMOTE (Synthetic Minority Over-sampling Technique)

mod smote;

pub use smote::SMOTE;

use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    /// Original rows followed by synthetic rows
    pub x: Array2<f64>,
    /// Labels aligned with `x`
    pub y: Array1<i64>,
    /// Number of synthetic samples generated per class, in class order
    pub n_synthetic: Vec<(i64, usize)>,
}

/// Class distribution, ordered by label
pub fn class_counts(y: &Array1<i64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Row indices for each class, ordered by label
pub fn class_indices(y: &Array1<i64>) -> BTreeMap<i64, Vec<usize>> {
    let mut indices = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_insert_with(Vec::new).push(i);
    }
    indices
}
