//! Model training module
//!
//! Fits one of two binary classifiers on labeled feature vectors:
//! - Random Forest of weighted Gini trees (bootstrap, sqrt feature sampling)
//! - L2-regularized logistic regression with class weights
//!
//! The [`Trainer`] performs the stratified split, scaling, SMOTE
//! oversampling, validation metrics and cross-validation, and returns an
//! immutable [`TrainedModel`].

mod classifier;
mod config;
mod model;
mod trainer;
pub mod cross_validation;
pub mod decision_tree;
pub mod logistic;
pub mod metrics;
pub mod random_forest;

pub use classifier::{balanced_weights, Classifier, ProbabilisticClassifier};
pub use config::{Algorithm, TrainingConfig};
pub use cross_validation::{cross_validate, CVScores, CVSplit, StratifiedKFold};
pub use decision_tree::{DecisionTree, TreeNode};
pub use logistic::LogisticRegression;
pub use metrics::{ModelMetrics, DECISION_THRESHOLD};
pub use model::{FeatureImportance, TrainedModel, TrainingMetadata};
pub use random_forest::{MaxFeatures, RandomForest};
pub use trainer::{RawLabel, Trainer, TrainingExample, TrainingOutcome};
