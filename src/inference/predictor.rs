//! Scoring students against a trained model

use super::config::PredictorConfig;
use crate::error::{ErrorKind, Result, RiskError};
use crate::features::StudentFeatures;
use crate::training::{Algorithm, TrainedModel, DECISION_THRESHOLD};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Lower bound of the Medium band
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.33;
/// Lower bound of the High band
pub const HIGH_RISK_THRESHOLD: f64 = 0.67;

/// Discrete risk band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// `< 0.33` Low, `[0.33, 0.67)` Medium, `>= 0.67` High
    pub fn from_score(score: f64) -> Self {
        if score < MEDIUM_RISK_THRESHOLD {
            RiskLevel::Low
        } else if score < HIGH_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    /// Distance from `score` to the nearest edge of its band, scaled by the
    /// largest distance possible inside the band
    pub fn confidence(score: f64) -> f64 {
        let raw = match Self::from_score(score) {
            RiskLevel::Low => (MEDIUM_RISK_THRESHOLD - score) / MEDIUM_RISK_THRESHOLD,
            RiskLevel::Medium => {
                let half_width = (HIGH_RISK_THRESHOLD - MEDIUM_RISK_THRESHOLD) / 2.0;
                (score - MEDIUM_RISK_THRESHOLD).min(HIGH_RISK_THRESHOLD - score) / half_width
            }
            RiskLevel::High => (score - HIGH_RISK_THRESHOLD) / (1.0 - HIGH_RISK_THRESHOLD),
        };
        raw.clamp(0.0, 1.0)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(s)
    }
}

/// A feature's share in one prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributingFactor {
    pub feature: String,
    /// Raw (unscaled) value
    pub value: f64,
    /// Global importance from training
    pub importance: f64,
    /// Importance times the value's z-score against the training data
    pub contribution: f64,
}

/// Risk assessment for one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub dropout_prediction: bool,
    /// Highest absolute contribution first
    pub contributing_factors: Vec<ContributingFactor>,
    pub algorithm: Algorithm,
}

/// One item of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRequest {
    pub student_id: String,
    pub features: StudentFeatures,
}

impl ScoringRequest {
    pub fn new(student_id: impl Into<String>, features: StudentFeatures) -> Self {
        Self {
            student_id: student_id.into(),
            features,
        }
    }
}

/// Result for one batch item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    Scored {
        student_id: String,
        prediction: Prediction,
    },
    Failed {
        student_id: String,
        kind: ErrorKind,
        message: String,
    },
}

impl BatchOutcome {
    pub fn failed(student_id: impl Into<String>, err: &RiskError) -> Self {
        BatchOutcome::Failed {
            student_id: student_id.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn student_id(&self) -> &str {
        match self {
            BatchOutcome::Scored { student_id, .. } | BatchOutcome::Failed { student_id, .. } => {
                student_id
            }
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, BatchOutcome::Scored { .. })
    }

    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            BatchOutcome::Scored { prediction, .. } => Some(prediction),
            BatchOutcome::Failed { .. } => None,
        }
    }
}

/// Applies a [`TrainedModel`] to feature vectors. Holds no model state, so
/// one predictor can serve any number of models.
#[derive(Debug, Clone, Default)]
pub struct Predictor {
    config: PredictorConfig,
}

impl Predictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    /// Score a single student
    pub fn predict_one(&self, features: &StudentFeatures, model: &TrainedModel) -> Result<Prediction> {
        let risk_score = model.score(features)?.clamp(0.0, 1.0);

        Ok(Prediction {
            risk_score,
            risk_level: RiskLevel::from_score(risk_score),
            confidence: RiskLevel::confidence(risk_score),
            dropout_prediction: risk_score >= DECISION_THRESHOLD,
            contributing_factors: self.contributing_factors(features, model),
            algorithm: model.algorithm(),
        })
    }

    /// Score every request, preserving input order. A failing item becomes
    /// [`BatchOutcome::Failed`] without affecting the others.
    pub fn predict_batch(&self, requests: &[ScoringRequest], model: &TrainedModel) -> Vec<BatchOutcome> {
        let score = |req: &ScoringRequest| match self.predict_one(&req.features, model) {
            Ok(prediction) => BatchOutcome::Scored {
                student_id: req.student_id.clone(),
                prediction,
            },
            Err(err) => {
                warn!(student_id = %req.student_id, error = %err, "Batch item failed");
                BatchOutcome::failed(req.student_id.clone(), &err)
            }
        };

        let outcomes: Vec<BatchOutcome> = if requests.len() < self.config.parallel_threshold {
            requests.iter().map(&score).collect()
        } else {
            let run = || -> Vec<BatchOutcome> { requests.par_iter().map(&score).collect() };
            match self.thread_pool() {
                Some(pool) => pool.install(run),
                None => run(),
            }
        };

        let scored = outcomes.iter().filter(|o| o.is_scored()).count();
        info!(
            total = outcomes.len(),
            scored,
            failed = outcomes.len() - scored,
            "Batch scored"
        );
        outcomes
    }

    fn thread_pool(&self) -> Option<rayon::ThreadPool> {
        let n_workers = self.config.n_workers?;
        match rayon::ThreadPoolBuilder::new().num_threads(n_workers).build() {
            Ok(pool) => Some(pool),
            Err(err) => {
                warn!(n_workers, error = %err, "Thread pool unavailable, using global pool");
                None
            }
        }
    }

    /// Rank features by |importance × z-score|; ties keep schema order.
    /// Called after the schema has been validated.
    fn contributing_factors(&self, features: &StudentFeatures, model: &TrainedModel) -> Vec<ContributingFactor> {
        let importances = model.feature_importances();
        let scaler = model.scaler();

        let mut factors: Vec<ContributingFactor> = features
            .iter()
            .zip(importances.iter())
            .enumerate()
            .map(|(idx, ((name, value), fi))| ContributingFactor {
                feature: name.to_string(),
                value,
                importance: fi.importance,
                contribution: fi.importance * scaler.z_score(idx, value),
            })
            .collect();

        factors.sort_by(|a, b| {
            b.contribution
                .abs()
                .partial_cmp(&a.contribution.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        factors.truncate(self.config.top_factors);
        factors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.329999), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.33), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.669999), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.67), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(1.0), RiskLevel::High);
    }

    #[test]
    fn test_confidence_peaks_and_edges() {
        assert!((RiskLevel::confidence(0.0) - 1.0).abs() < 1e-9);
        assert!((RiskLevel::confidence(0.5) - 1.0).abs() < 1e-9);
        assert!((RiskLevel::confidence(1.0) - 1.0).abs() < 1e-9);
        assert!(RiskLevel::confidence(0.33) < 1e-9);
        assert!(RiskLevel::confidence(0.67) < 1e-9);
    }

    #[test]
    fn test_confidence_in_unit_interval() {
        for i in 0..=100 {
            let c = RiskLevel::confidence(i as f64 / 100.0);
            assert!((0.0..=1.0).contains(&c));
        }
    }

    #[test]
    fn test_failed_outcome_carries_kind() {
        let err = RiskError::schema("14 features", "13 features");
        let outcome = BatchOutcome::failed("s-1", &err);
        assert_eq!(outcome.student_id(), "s-1");
        assert!(!outcome.is_scored());
        match outcome {
            BatchOutcome::Failed { kind, .. } => assert_eq!(kind, ErrorKind::SchemaMismatch),
            BatchOutcome::Scored { .. } => panic!("expected failure"),
        }
    }
}
