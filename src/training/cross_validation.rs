//! Stratified k-fold cross-validation

use super::classifier::{Classifier, ProbabilisticClassifier};
use super::config::TrainingConfig;
use super::metrics::accuracy;
use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::debug;

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Per-fold accuracies plus their summary
#[derive(Debug, Clone)]
pub struct CVScores {
    pub fold_scores: Vec<f64>,
    pub mean: f64,
    pub std: f64,
}

impl CVScores {
    fn from_scores(fold_scores: Vec<f64>) -> Self {
        let n = fold_scores.len().max(1) as f64;
        let mean = fold_scores.iter().sum::<f64>() / n;
        let var = fold_scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            fold_scores,
            mean,
            std: var.sqrt(),
        }
    }
}

/// Stratified k-fold splitter: every fold keeps the class proportions
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    n_splits: usize,
    seed: u64,
}

impl StratifiedKFold {
    /// Create a new splitter
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits, seed: 42 }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Number of folds actually usable for `y`: the requested count, capped
    /// at the smallest class size
    pub fn effective_splits(&self, y: &Array1<f64>) -> usize {
        let smallest = class_indices(y).values().map(Vec::len).min().unwrap_or(0);
        self.n_splits.min(smallest)
    }

    /// Generate train/test splits
    pub fn split(&self, y: &Array1<f64>) -> Result<Vec<CVSplit>> {
        let n_splits = self.effective_splits(y);
        if n_splits < 2 {
            return Err(RiskError::InsufficientData(format!(
                "Stratified CV needs at least 2 rows per class, requested {} folds",
                self.n_splits
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];

        // Deal each class round-robin so fold sizes differ by at most one per class
        for (_, mut indices) in class_indices(y) {
            indices.shuffle(&mut rng);
            for (i, idx) in indices.into_iter().enumerate() {
                folds[i % n_splits].push(idx);
            }
        }

        Ok((0..n_splits)
            .map(|fold_idx| CVSplit {
                test_indices: folds[fold_idx].clone(),
                train_indices: folds
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != fold_idx)
                    .flat_map(|(_, f)| f.iter().copied())
                    .collect(),
                fold_idx,
            })
            .collect())
    }
}

/// Row indices per class (0 or 1), ordered by class
pub(crate) fn class_indices(y: &Array1<f64>) -> BTreeMap<u8, Vec<usize>> {
    let mut map: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (idx, &val) in y.iter().enumerate() {
        map.entry(u8::from(val > 0.5)).or_default().push(idx);
    }
    map
}

/// Fit a fresh classifier per fold and score accuracy on the held-out fold.
///
/// Returns `None` when the data cannot support two folds.
pub fn cross_validate(
    config: &TrainingConfig,
    x: &Array2<f64>,
    y: &Array1<f64>,
    sample_weight: &Array1<f64>,
) -> Result<Option<CVScores>> {
    let splitter = StratifiedKFold::new(config.cv_folds).with_random_state(config.seed);
    if config.cv_folds < 2 || splitter.effective_splits(y) < 2 {
        return Ok(None);
    }

    let splits = splitter.split(y)?;
    let mut scores = Vec::with_capacity(splits.len());

    for split in &splits {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let w_train = sample_weight.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);
        let y_test = y.select(Axis(0), &split.test_indices);

        let mut model = Classifier::from_config(config);
        model.fit(&x_train, &y_train, &w_train)?;
        let proba = model.predict_proba(&x_test)?;
        let score = accuracy(&y_test, &proba);

        debug!(fold = split.fold_idx, accuracy = score, "CV fold scored");
        scores.push(score);
    }

    Ok(Some(CVScores::from_scores(scores)))
}
