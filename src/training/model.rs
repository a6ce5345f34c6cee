//! The fitted, immutable model artifact

use super::classifier::{Classifier, ProbabilisticClassifier};
use super::config::Algorithm;
use super::metrics::{ModelMetrics, DECISION_THRESHOLD};
use super::trainer::TrainingExample;
use crate::error::{Result, RiskError};
use crate::features::{FeatureExtractor, FeatureSchema, MissingAttendancePolicy, StudentFeatures};
use crate::preprocessing::{CategoricalEncoder, Preprocessor, ScalerParams};
use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global importance of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Facts recorded about a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetadata {
    pub model_id: Uuid,
    pub algorithm: Algorithm,
    pub trained_at: DateTime<Utc>,
    /// Rows in the training split before oversampling
    pub training_samples: usize,
    pub validation_samples: usize,
    /// Rows added by SMOTE
    pub synthetic_samples: usize,
    pub feature_count: usize,
    pub features: Vec<String>,
    pub seed: u64,
    pub training_time_secs: f64,
    pub metrics: ModelMetrics,
    /// In schema order, summing to 1
    pub feature_importances: Vec<FeatureImportance>,
}

/// Everything needed to score a student: classifier, scaler, schema and
/// categorical encoder, plus the training metadata.
///
/// Built only by [`super::Trainer`] or by loading a saved artifact, and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    classifier: Classifier,
    scaler: ScalerParams,
    schema: FeatureSchema,
    encoder: CategoricalEncoder,
    metadata: TrainingMetadata,
}

impl TrainedModel {
    pub(crate) fn new(
        classifier: Classifier,
        scaler: ScalerParams,
        schema: FeatureSchema,
        encoder: CategoricalEncoder,
        metadata: TrainingMetadata,
    ) -> Self {
        Self {
            classifier,
            scaler,
            schema,
            encoder,
            metadata,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.metadata.algorithm
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn scaler(&self) -> &ScalerParams {
        &self.scaler
    }

    pub fn encoder(&self) -> &CategoricalEncoder {
        &self.encoder
    }

    pub fn metadata(&self) -> &TrainingMetadata {
        &self.metadata
    }

    pub fn metrics(&self) -> &ModelMetrics {
        &self.metadata.metrics
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn feature_importances(&self) -> &[FeatureImportance] {
        &self.metadata.feature_importances
    }

    /// Importance of a named feature
    pub fn importance_of(&self, feature: &str) -> Option<f64> {
        self.metadata
            .feature_importances
            .iter()
            .find(|fi| fi.feature == feature)
            .map(|fi| fi.importance)
    }

    /// Extractor that encodes categoricals exactly as at training time
    pub fn feature_extractor(&self, missing_attendance: MissingAttendancePolicy) -> FeatureExtractor {
        FeatureExtractor::new(self.encoder.clone()).with_missing_attendance(missing_attendance)
    }

    /// Dropout probability for one feature vector
    pub fn score(&self, features: &StudentFeatures) -> Result<f64> {
        let row = Preprocessor::transform(features, &self.scaler, &self.schema)?;
        let x = row.insert_axis(ndarray::Axis(0));
        let proba = self.classifier.predict_proba(&x)?;
        proba.first().copied().ok_or(RiskError::ModelNotTrained)
    }

    /// Dropout probabilities for already standardized rows
    pub fn predict_proba_scaled(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.classifier.predict_proba(x)
    }

    /// Score labeled examples the model has not seen
    pub fn evaluate(&self, examples: &[TrainingExample]) -> Result<ModelMetrics> {
        if examples.is_empty() {
            return Err(RiskError::InsufficientData(
                "evaluation set is empty".to_string(),
            ));
        }

        let rows: Vec<&StudentFeatures> = examples.iter().map(|e| &e.features).collect();
        let x = Preprocessor::to_matrix(&rows, &self.schema)?;
        let xs = self.scaler.transform(&x)?;
        let y = examples
            .iter()
            .map(|e| e.label().map(f64::from))
            .collect::<Result<Array1<f64>>>()?;

        let proba = self.classifier.predict_proba(&xs)?;
        Ok(ModelMetrics::compute_classification(&y, &proba, DECISION_THRESHOLD))
    }
}
