//! Pipeline configuration

use crate::error::Result;
use crate::export::SerializationFormat;
use crate::features::MissingAttendancePolicy;
use crate::inference::PredictorConfig;
use crate::training::TrainingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Top-level configuration shared by the service and the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding saved model artifacts
    pub model_dir: PathBuf,

    /// Artifact encoding
    pub format: SerializationFormat,

    /// Attendance assumed for students with no attendance data
    pub missing_attendance: MissingAttendancePolicy,

    pub training: TrainingConfig,

    pub predictor: PredictorConfig,
}

impl Default for PipelineConfig {
    /// Reads `MODEL_PATH`, `MODEL_FORMAT` and `MISSING_ATTENDANCE_RATE`
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl PipelineConfig {
    /// Build defaults from an environment-like lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let format = match lookup("MODEL_FORMAT") {
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                warn!(value = %raw, error = %err, "Ignoring MODEL_FORMAT");
                SerializationFormat::default()
            }),
            None => SerializationFormat::default(),
        };

        let missing_attendance = lookup("MISSING_ATTENDANCE_RATE")
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|rate| (0.0..=1.0).contains(rate))
            .map(MissingAttendancePolicy::Assume)
            .unwrap_or_default();

        Self {
            model_dir: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./models")),
            format,
            missing_attendance,
            training: TrainingConfig::default(),
            predictor: PredictorConfig::default(),
        }
    }

    /// Load from a JSON file; absent fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    pub fn with_format(mut self, format: SerializationFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_missing_attendance(mut self, policy: MissingAttendancePolicy) -> Self {
        self.missing_attendance = policy;
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn with_predictor(mut self, predictor: PredictorConfig) -> Self {
        self.predictor = predictor;
        self
    }
}
