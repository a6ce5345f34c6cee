//! Training pipeline: split, scale, oversample, fit, evaluate

use super::classifier::{balanced_weights, Classifier, ProbabilisticClassifier};
use super::config::TrainingConfig;
use super::cross_validation::{class_indices, cross_validate};
use super::metrics::{ModelMetrics, DECISION_THRESHOLD};
use super::model::{FeatureImportance, TrainedModel, TrainingMetadata};
use crate::error::{Result, RiskError};
use crate::features::{FeatureSchema, StudentFeatures};
use crate::preprocessing::{CategoricalEncoder, Preprocessor, StandardScaler};
use crate::synthetic::SMOTE;
use chrono::Utc;
use ndarray::{Array1, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Minimum rows per class before training is attempted
const MIN_CLASS_ROWS: usize = 2;

/// Dropout label as it arrives from callers: a boolean, a number or text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLabel {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl RawLabel {
    /// 1 for dropped out, 0 for retained
    pub fn to_class(&self) -> Result<u8> {
        match self {
            RawLabel::Flag(b) => Ok(u8::from(*b)),
            RawLabel::Number(n) if *n == 0.0 => Ok(0),
            RawLabel::Number(n) if *n == 1.0 => Ok(1),
            RawLabel::Number(n) => Err(RiskError::InvalidLabel(n.to_string())),
            RawLabel::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(1),
                "false" | "no" | "0" => Ok(0),
                _ => Err(RiskError::InvalidLabel(s.clone())),
            },
        }
    }
}

impl From<bool> for RawLabel {
    fn from(value: bool) -> Self {
        RawLabel::Flag(value)
    }
}

impl From<&str> for RawLabel {
    fn from(value: &str) -> Self {
        RawLabel::Text(value.to_string())
    }
}

/// One labeled feature vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub features: StudentFeatures,
    pub dropped_out: RawLabel,
}

impl TrainingExample {
    pub fn new(features: StudentFeatures, dropped_out: impl Into<RawLabel>) -> Self {
        Self {
            features,
            dropped_out: dropped_out.into(),
        }
    }

    /// Parsed label
    pub fn label(&self) -> Result<u8> {
        self.dropped_out.to_class()
    }
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub model: TrainedModel,
    pub metrics: ModelMetrics,
}

/// Fits a [`TrainedModel`] from labeled examples. Never persists anything.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
    encoder: CategoricalEncoder,
}

impl Trainer {
    pub fn new(config: TrainingConfig) -> Self {
        Self {
            config,
            encoder: CategoricalEncoder::default(),
        }
    }

    /// Encoder recorded into the model; it must be the one that produced
    /// the examples' categorical columns
    pub fn with_encoder(mut self, encoder: CategoricalEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Run the full pipeline on `examples`
    pub fn train(&self, examples: &[TrainingExample]) -> Result<TrainingOutcome> {
        self.config.validate()?;
        let start = Instant::now();
        let seed = self.config.seed;

        let first = examples
            .first()
            .ok_or_else(|| RiskError::InsufficientData("training set is empty".to_string()))?;
        let schema = FeatureSchema::new(first.features.names().to_vec());

        let labels = examples
            .iter()
            .map(|e| e.label().map(f64::from))
            .collect::<Result<Array1<f64>>>()?;

        let n_pos = labels.iter().filter(|&&v| v > 0.5).count();
        let n_neg = labels.len() - n_pos;
        if n_pos < MIN_CLASS_ROWS || n_neg < MIN_CLASS_ROWS {
            return Err(RiskError::InsufficientData(format!(
                "need at least {} examples of each class, got {} dropped out and {} retained",
                MIN_CLASS_ROWS, n_pos, n_neg
            )));
        }

        let rows: Vec<&StudentFeatures> = examples.iter().map(|e| &e.features).collect();
        let x = Preprocessor::to_matrix(&rows, &schema)?;
        if let Some(pos) = x.iter().position(|v| !v.is_finite()) {
            let (row, col) = (pos / schema.len(), pos % schema.len());
            return Err(RiskError::ValidationError(format!(
                "feature '{}' of example {} is not finite",
                schema.names()[col],
                row
            )));
        }

        info!(
            algorithm = %self.config.algorithm,
            samples = labels.len(),
            dropped_out = n_pos,
            seed,
            "Training started"
        );

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let (train_idx, val_idx) = stratified_split(&labels, self.config.validation_split, &mut rng);
        debug!(train = train_idx.len(), validation = val_idx.len(), "Stratified split");

        let x_train = x.select(Axis(0), &train_idx);
        let y_train = labels.select(Axis(0), &train_idx);
        let x_val = x.select(Axis(0), &val_idx);
        let y_val = labels.select(Axis(0), &val_idx);

        let scaler = StandardScaler::fit(&x_train)?;
        let xs_train = scaler.transform(&x_train)?;
        let xs_val = scaler.transform(&x_val)?;

        let resampled = SMOTE::new()
            .with_k_neighbors(self.config.k_neighbors)
            .with_seed(seed)
            .fit_resample(&xs_train, &y_train.mapv(|v| v as i64))?;
        let synthetic_samples: usize = resampled.n_synthetic.iter().map(|(_, n)| n).sum();
        debug!(synthetic = synthetic_samples, balanced = resampled.y.len(), "SMOTE oversampling");

        let x_bal = resampled.x;
        let y_bal = resampled.y.mapv(|v| v as f64);
        let weights = balanced_weights(&y_bal);

        let mut classifier = Classifier::from_config(&self.config);
        classifier.fit(&x_bal, &y_bal, &weights)?;

        let proba = classifier.predict_proba(&xs_val)?;
        let mut metrics = ModelMetrics::compute_classification(&y_val, &proba, DECISION_THRESHOLD);

        match cross_validate(&self.config, &x_bal, &y_bal, &weights)? {
            Some(cv) => metrics = metrics.with_cross_validation(cv.mean, cv.std),
            None => warn!(folds = self.config.cv_folds, "Cross-validation skipped"),
        }

        let importances = classifier
            .feature_importances()
            .ok_or(RiskError::ModelNotTrained)?;
        let feature_importances = schema
            .names()
            .iter()
            .zip(importances.iter())
            .map(|(name, &importance)| FeatureImportance {
                feature: name.clone(),
                importance,
            })
            .collect();

        let training_time_secs = start.elapsed().as_secs_f64();
        let metadata = TrainingMetadata {
            model_id: Uuid::new_v4(),
            algorithm: self.config.algorithm,
            trained_at: Utc::now(),
            training_samples: train_idx.len(),
            validation_samples: val_idx.len(),
            synthetic_samples,
            feature_count: schema.len(),
            features: schema.names().to_vec(),
            seed,
            training_time_secs,
            metrics: metrics.clone(),
            feature_importances,
        };

        info!(
            algorithm = %self.config.algorithm,
            accuracy = metrics.accuracy,
            f1 = metrics.f1_score,
            elapsed_secs = training_time_secs,
            "Training finished"
        );

        let model = TrainedModel::new(classifier, scaler, schema, self.encoder.clone(), metadata);
        Ok(TrainingOutcome { model, metrics })
    }
}

/// Per-class shuffle and holdout. Every class keeps at least one row on
/// each side; both index lists come back sorted.
fn stratified_split(y: &Array1<f64>, validation_split: f64, rng: &mut ChaCha8Rng) -> (Vec<usize>, Vec<usize>) {
    let mut train = Vec::new();
    let mut val = Vec::new();

    for (_, mut rows) in class_indices(y) {
        rows.shuffle(rng);
        let n = rows.len();
        let n_val = ((n as f64 * validation_split).round() as usize).clamp(1, n.saturating_sub(1).max(1));
        val.extend_from_slice(&rows[..n_val]);
        train.extend_from_slice(&rows[n_val..]);
    }

    train.sort_unstable();
    val.sort_unstable();
    (train, val)
}
