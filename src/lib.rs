//! Dropout Risk - student dropout prediction pipeline
//!
//! This crate turns raw student records into fixed feature vectors, trains
//! class-balanced classifiers on them and scores students with explainable
//! risk assessments.
//!
//! # Modules
//!
//! ## Data
//! - [`features`] - Student records, the canonical feature schema and extraction
//! - [`preprocessing`] - Categorical encoding and standard scaling
//! - [`synthetic`] - SMOTE oversampling of the minority class
//!
//! ## Models
//! - [`training`] - Random forest and logistic regression, metrics, cross-validation
//! - [`inference`] - Risk scores, bands, confidence and contributing factors
//! - [`export`] - Checksummed model artifacts and the current-model store
//!
//! ## Services
//! - [`service`] - In-process API over student and prediction storage
//! - [`config`] - Pipeline configuration from env and files
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Data
pub mod features;
pub mod preprocessing;
pub mod synthetic;

// Models
pub mod training;
pub mod inference;
pub mod export;

// Services
pub mod service;
pub mod cli;

pub use error::{Result, RiskError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ErrorKind, Result, RiskError};

    // Configuration
    pub use crate::config::PipelineConfig;

    // Features
    pub use crate::features::{
        FeatureExtractor, FeatureSchema, MissingAttendancePolicy, StudentFeatures, StudentHistory,
        StudentRecord, FEATURE_NAMES,
    };

    // Training
    pub use crate::training::{
        Algorithm, ModelMetrics, RawLabel, TrainedModel, Trainer, TrainingConfig, TrainingExample,
    };

    // Inference
    pub use crate::inference::{BatchOutcome, Prediction, Predictor, RiskLevel, ScoringRequest};

    // Export
    pub use crate::export::{ModelStore, SerializationFormat};

    // Service
    pub use crate::service::{
        DropoutService, InMemoryPredictionSink, InMemoryStudentRepository, LabeledStudent,
        PredictionSink, StudentRepository, TrainingRequest,
    };
}
