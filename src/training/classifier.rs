//! Common interface over the two supported classifiers

use super::config::{Algorithm, TrainingConfig};
use super::logistic::LogisticRegression;
use super::random_forest::{MaxFeatures, RandomForest};
use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// A binary classifier producing positive-class probabilities
pub trait ProbabilisticClassifier: Send + Sync {
    /// Fit on labels in {0, 1} with per-sample weights
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, sample_weight: &Array1<f64>) -> Result<()>;

    /// Probability of the positive class per row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Global importances summing to 1, once fitted
    fn feature_importances(&self) -> Option<Array1<f64>>;

    /// Hard labels at `threshold`
    fn predict(&self, x: &Array2<f64>, threshold: f64) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p >= threshold { 1.0 } else { 0.0 }))
    }
}

/// Fitted or unfitted classifier of either algorithm
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
}

impl Classifier {
    /// Unfitted classifier configured from `config`
    pub fn from_config(config: &TrainingConfig) -> Self {
        match config.algorithm {
            Algorithm::RandomForest => Classifier::RandomForest(
                RandomForest::new(config.n_estimators)
                    .with_max_depth(config.max_depth)
                    .with_min_samples_split(config.min_samples_split)
                    .with_min_samples_leaf(config.min_samples_leaf)
                    .with_max_features(MaxFeatures::Sqrt)
                    .with_random_state(config.seed),
            ),
            Algorithm::LogisticRegression => Classifier::LogisticRegression(
                LogisticRegression::new()
                    .with_alpha(config.l2_alpha)
                    .with_max_iter(config.max_iter)
                    .with_learning_rate(config.learning_rate)
                    .with_tol(config.tol),
            ),
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Classifier::RandomForest(_) => Algorithm::RandomForest,
            Classifier::LogisticRegression(_) => Algorithm::LogisticRegression,
        }
    }
}

impl ProbabilisticClassifier for Classifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, sample_weight: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::RandomForest(m) => m.fit(x, y, sample_weight).map(|_| ()),
            Classifier::LogisticRegression(m) => m.fit(x, y, sample_weight).map(|_| ()),
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Classifier::RandomForest(m) => m.predict_proba(x),
            Classifier::LogisticRegression(m) => m.predict_proba(x),
        }
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        match self {
            Classifier::RandomForest(m) => m.feature_importances().cloned(),
            Classifier::LogisticRegression(m) => m.feature_importances(),
        }
    }
}

/// Balanced class weights: `n / (2 * n_class)` for each row's class
pub fn balanced_weights(y: &Array1<f64>) -> Array1<f64> {
    let n = y.len() as f64;
    let n_pos = y.iter().filter(|&&v| v > 0.5).count() as f64;
    let n_neg = n - n_pos;
    let w_pos = if n_pos > 0.0 { n / (2.0 * n_pos) } else { 0.0 };
    let w_neg = if n_neg > 0.0 { n / (2.0 * n_neg) } else { 0.0 };
    y.mapv(|v| if v > 0.5 { w_pos } else { w_neg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_balanced_weights() {
        let y = array![0.0, 0.0, 0.0, 1.0];
        let w = balanced_weights(&y);
        assert!((w[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((w[3] - 2.0).abs() < 1e-12);
        // Each class carries half of the total weight
        assert!((w.sum() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_from_config_selects_algorithm() {
        let rf = Classifier::from_config(&TrainingConfig::new(Algorithm::RandomForest));
        let lr = Classifier::from_config(&TrainingConfig::new(Algorithm::LogisticRegression));
        assert_eq!(rf.algorithm(), Algorithm::RandomForest);
        assert_eq!(lr.algorithm(), Algorithm::LogisticRegression);
    }

    #[test]
    fn test_predict_thresholds_probabilities() {
        let x = array![[-3.0], [-2.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut model = Classifier::from_config(&TrainingConfig::new(Algorithm::LogisticRegression));
        model.fit(&x, &y, &balanced_weights(&y)).unwrap();
        assert_eq!(model.predict(&x, 0.5).unwrap(), y);
    }
}
