//! Training configuration

use crate::error::RiskError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classifier family to train
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Bagged decision trees
    #[default]
    RandomForest,
    /// L2-regularized logistic regression
    LogisticRegression,
}

impl Algorithm {
    /// Stable identifier used in file names and API payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RandomForest => "random_forest",
            Algorithm::LogisticRegression => "logistic_regression",
        }
    }

    pub fn all() -> [Algorithm; 2] {
        [Algorithm::RandomForest, Algorithm::LogisticRegression]
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "random_forest" | "rf" => Ok(Algorithm::RandomForest),
            "logistic_regression" | "logistic" | "lr" => Ok(Algorithm::LogisticRegression),
            other => Err(RiskError::InvalidParameter {
                name: "model_type".to_string(),
                value: other.to_string(),
                reason: "expected random_forest or logistic_regression".to_string(),
            }),
        }
    }
}

/// Configuration for model training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Classifier to fit
    pub algorithm: Algorithm,

    /// Fraction of each class held out for validation
    pub validation_split: f64,

    /// Number of cross-validation folds (below 2 = no CV)
    pub cv_folds: usize,

    /// Random seed for split, SMOTE, bootstrap and CV shuffling
    pub seed: u64,

    /// Neighbors used by SMOTE
    pub k_neighbors: usize,

    // Tree-specific parameters
    /// Number of trees
    pub n_estimators: usize,

    /// Maximum depth of trees
    pub max_depth: Option<usize>,

    /// Minimum samples to split a node
    pub min_samples_split: usize,

    /// Minimum samples per leaf
    pub min_samples_leaf: usize,

    // Logistic regression parameters
    /// Gradient descent step
    pub learning_rate: f64,

    /// L2 regularization strength
    pub l2_alpha: f64,

    /// Maximum gradient descent iterations
    pub max_iter: usize,

    /// Gradient norm at which descent stops
    pub tol: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::RandomForest,
            validation_split: 0.2,
            cv_folds: 5,
            seed: 42,
            k_neighbors: 5,
            n_estimators: 100,
            max_depth: Some(10),
            min_samples_split: 2,
            min_samples_leaf: 1,
            learning_rate: 0.1,
            l2_alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
        }
    }
}

impl TrainingConfig {
    pub fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_validation_split(mut self, split: f64) -> Self {
        self.validation_split = split;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Reject values the trainer cannot work with
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |name: &str, value: String, reason: &str| RiskError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        };

        if !(self.validation_split > 0.0 && self.validation_split < 1.0) {
            return Err(invalid(
                "validation_split",
                self.validation_split.to_string(),
                "must be strictly between 0 and 1",
            ));
        }
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", "0".to_string(), "must be at least 1"));
        }
        if self.k_neighbors == 0 {
            return Err(invalid("k_neighbors", "0".to_string(), "must be at least 1"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(invalid(
                "learning_rate",
                self.learning_rate.to_string(),
                "must be a positive number",
            ));
        }
        if self.l2_alpha < 0.0 {
            return Err(invalid("l2_alpha", self.l2_alpha.to_string(), "must not be negative"));
        }
        Ok(())
    }
}
