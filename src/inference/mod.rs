//! Inference module
//!
//! Turns feature vectors into dropout-risk predictions:
//! - Probability of dropout from the trained classifier
//! - Low / Medium / High banding with a band-relative confidence
//! - Top contributing factors (global importance × z-score)
//! - Batch scoring in parallel via rayon with per-item failures

mod config;
mod predictor;

pub use config::PredictorConfig;
pub use predictor::{
    BatchOutcome, ContributingFactor, Prediction, Predictor, RiskLevel, ScoringRequest,
    HIGH_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD,
};
