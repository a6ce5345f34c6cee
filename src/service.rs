//! In-process API used by the outer web layer and the CLI
//!
//! [`DropoutService`] wires the pipeline together: it pulls student data
//! through a [`StudentRepository`], trains and scores with the shared
//! [`ModelStore`], and writes predictions back through a [`PredictionSink`].

use crate::config::PipelineConfig;
use crate::error::{Result, RiskError};
use crate::export::ModelStore;
use crate::features::{FeatureExtractor, StudentFeatures, StudentHistory, StudentRecord};
use crate::inference::{BatchOutcome, Prediction, Predictor, ScoringRequest};
use crate::preprocessing::CategoricalEncoder;
use crate::training::{
    Algorithm, FeatureImportance, ModelMetrics, RawLabel, TrainedModel, Trainer, TrainingExample,
    TrainingMetadata,
};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// A student's snapshot together with their history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub record: StudentRecord,
    #[serde(default)]
    pub history: StudentHistory,
}

/// Read access to student data
pub trait StudentRepository: Send + Sync {
    /// `Ok(None)` when the student does not exist
    fn fetch_student(&self, student_id: &str) -> Result<Option<StudentProfile>>;
}

/// What gets persisted for each saved prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub student_id: String,
    pub model_id: Uuid,
    pub prediction: Prediction,
    pub created_at: DateTime<Utc>,
}

/// Write access for predictions; returns the stored prediction's id
pub trait PredictionSink: Send + Sync {
    fn record(&self, record: PredictionRecord) -> Result<String>;
}

impl<T: StudentRepository + ?Sized> StudentRepository for Arc<T> {
    fn fetch_student(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        (**self).fetch_student(student_id)
    }
}

impl<T: PredictionSink + ?Sized> PredictionSink for Arc<T> {
    fn record(&self, record: PredictionRecord) -> Result<String> {
        (**self).record(record)
    }
}

/// Student data held in memory, keyed by student id
#[derive(Debug, Default)]
pub struct InMemoryStudentRepository {
    students: RwLock<BTreeMap<String, StudentProfile>>,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of `{ "record": {...}, "history": {...} }`
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let profiles: Vec<StudentProfile> = serde_json::from_str(&content)?;
        let repo = Self::new();
        for profile in profiles {
            repo.insert(profile);
        }
        Ok(repo)
    }

    pub fn insert(&self, profile: StudentProfile) {
        self.students
            .write()
            .insert(profile.record.student_id.clone(), profile);
    }

    pub fn with_student(self, record: StudentRecord, history: StudentHistory) -> Self {
        self.insert(StudentProfile { record, history });
        self
    }

    /// Known ids in sorted order
    pub fn student_ids(&self) -> Vec<String> {
        self.students.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.students.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.read().is_empty()
    }
}

impl StudentRepository for InMemoryStudentRepository {
    fn fetch_student(&self, student_id: &str) -> Result<Option<StudentProfile>> {
        Ok(self.students.read().get(student_id).cloned())
    }
}

/// Predictions kept in memory with generated uuid ids
#[derive(Debug, Default)]
pub struct InMemoryPredictionSink {
    records: Mutex<Vec<(String, PredictionRecord)>>,
}

impl InMemoryPredictionSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored `(prediction_id, record)` pairs in insertion order
    pub fn records(&self) -> Vec<(String, PredictionRecord)> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl PredictionSink for InMemoryPredictionSink {
    fn record(&self, record: PredictionRecord) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.records.lock().push((id.clone(), record));
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

fn default_true() -> bool {
    true
}

/// Raw student data with its dropout outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledStudent {
    pub record: StudentRecord,
    #[serde(default)]
    pub history: StudentHistory,
    pub dropout: RawLabel,
}

impl LabeledStudent {
    pub fn new(record: StudentRecord, history: StudentHistory, dropout: impl Into<RawLabel>) -> Self {
        Self {
            record,
            history,
            dropout: dropout.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub training_data: Vec<LabeledStudent>,
    #[serde(default)]
    pub model_type: Algorithm,
    #[serde(default = "default_true")]
    pub save_model: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl TrainingRequest {
    pub fn new(training_data: Vec<LabeledStudent>) -> Self {
        Self {
            training_data,
            model_type: Algorithm::default(),
            save_model: true,
            seed: None,
        }
    }

    pub fn with_model_type(mut self, model_type: Algorithm) -> Self {
        self.model_type = model_type;
        self
    }

    pub fn with_save_model(mut self, save: bool) -> Self {
        self.save_model = save;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResponse {
    pub model_type: Algorithm,
    pub model_id: Uuid,
    pub metrics: ModelMetrics,
    pub model_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentPrediction {
    pub student_id: String,
    pub prediction: Prediction,
    pub prediction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionRequest {
    pub student_ids: Vec<String>,
    #[serde(default = "default_true")]
    pub save_predictions: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPrediction {
    pub student_id: String,
    pub prediction_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    /// One outcome per requested id, in request order
    pub predictions: Vec<BatchOutcome>,
    pub saved: Vec<SavedPrediction>,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelStatus {
    Trained,
    NotTrained,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub status: ModelStatus,
    pub metadata: Option<TrainingMetadata>,
    pub feature_importances: Vec<FeatureImportance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model_type: Algorithm,
    pub metrics: ModelMetrics,
    pub test_samples: usize,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Training, scoring and model introspection over injected collaborators
pub struct DropoutService<R, S> {
    config: PipelineConfig,
    store: ModelStore,
    predictor: Predictor,
    repository: R,
    sink: S,
}

impl<R: StudentRepository, S: PredictionSink> DropoutService<R, S> {
    pub fn new(config: PipelineConfig, repository: R, sink: S) -> Self {
        let store = ModelStore::new(config.model_dir.clone()).with_format(config.format);
        let predictor = Predictor::new(config.predictor.clone());
        Self {
            config,
            store,
            predictor,
            repository,
            sink,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Install the saved model for `algorithm`, if one is on disk
    pub fn load_existing(&self, algorithm: Algorithm) -> Result<bool> {
        Ok(self.store.load_existing(algorithm)?.is_some())
    }

    fn current_model(&self) -> Result<Arc<TrainedModel>> {
        self.store.current().ok_or(RiskError::ModelNotTrained)
    }

    fn training_extractor(&self) -> FeatureExtractor {
        FeatureExtractor::new(CategoricalEncoder::default())
            .with_missing_attendance(self.config.missing_attendance)
    }

    fn features_for(&self, student_id: &str, extractor: &FeatureExtractor) -> Result<StudentFeatures> {
        let profile = self
            .repository
            .fetch_student(student_id)?
            .ok_or_else(|| RiskError::StudentNotFound(student_id.to_string()))?;
        Ok(extractor.extract(&profile.record, &profile.history))
    }

    /// Extract features from raw students, then train. The new model
    /// always becomes current; it is also saved when requested.
    pub fn train(&self, request: TrainingRequest) -> Result<TrainingResponse> {
        let extractor = self.training_extractor();
        let examples: Vec<TrainingExample> = request
            .training_data
            .iter()
            .map(|s| TrainingExample {
                features: extractor.extract(&s.record, &s.history),
                dropped_out: s.dropout.clone(),
            })
            .collect();

        self.train_examples(&examples, request.model_type, request.save_model, request.seed)
    }

    /// Train on feature vectors that were extracted with the default encoder
    pub fn train_examples(
        &self,
        examples: &[TrainingExample],
        model_type: Algorithm,
        save_model: bool,
        seed: Option<u64>,
    ) -> Result<TrainingResponse> {
        let mut config = self.config.training.clone().with_algorithm(model_type);
        if let Some(seed) = seed {
            config = config.with_seed(seed);
        }

        let outcome = Trainer::new(config)
            .with_encoder(self.training_extractor().encoder().clone())
            .train(examples)?;

        let model_path = if save_model {
            Some(self.store.save(&outcome.model)?.display().to_string())
        } else {
            None
        };

        let model_id = outcome.model.metadata().model_id;
        self.store.replace(outcome.model);

        Ok(TrainingResponse {
            model_type,
            model_id,
            metrics: outcome.metrics,
            model_path,
        })
    }

    fn save_prediction(&self, student_id: &str, model: &TrainedModel, prediction: &Prediction) -> Result<String> {
        self.sink.record(PredictionRecord {
            student_id: student_id.to_string(),
            model_id: model.metadata().model_id,
            prediction: prediction.clone(),
            created_at: Utc::now(),
        })
    }

    /// Score one student from the repository
    pub fn predict_student(&self, student_id: &str, save_prediction: bool) -> Result<StudentPrediction> {
        let model = self.current_model()?;
        let extractor = model.feature_extractor(self.config.missing_attendance);
        let features = self.features_for(student_id, &extractor)?;
        let prediction = self.predictor.predict_one(&features, &model)?;

        let prediction_id = if save_prediction {
            Some(self.save_prediction(student_id, &model, &prediction)?)
        } else {
            None
        };

        info!(
            student_id,
            risk_level = %prediction.risk_level,
            risk_score = prediction.risk_score,
            "Student scored"
        );

        Ok(StudentPrediction {
            student_id: student_id.to_string(),
            prediction,
            prediction_id,
        })
    }

    /// Score many students. Unknown ids and scoring errors become per-item
    /// failures; only a missing model fails the whole call.
    pub fn predict_batch(&self, request: &BatchPredictionRequest) -> Result<BatchPredictionResponse> {
        let model = self.current_model()?;
        let extractor = model.feature_extractor(self.config.missing_attendance);

        let mut slots: Vec<Option<BatchOutcome>> = vec![None; request.student_ids.len()];
        let mut requests = Vec::new();
        let mut positions = Vec::new();

        for (pos, student_id) in request.student_ids.iter().enumerate() {
            match self.features_for(student_id, &extractor) {
                Ok(features) => {
                    requests.push(ScoringRequest::new(student_id.clone(), features));
                    positions.push(pos);
                }
                Err(err) => {
                    warn!(student_id = %student_id, error = %err, "Batch item failed");
                    slots[pos] = Some(BatchOutcome::failed(student_id.clone(), &err));
                }
            }
        }

        let scored = self.predictor.predict_batch(&requests, &model);
        for (pos, outcome) in positions.into_iter().zip(scored) {
            slots[pos] = Some(outcome);
        }
        let mut predictions: Vec<BatchOutcome> = slots.into_iter().flatten().collect();

        let mut saved = Vec::new();
        if request.save_predictions {
            for outcome in predictions.iter_mut() {
                let (student_id, result) = match outcome {
                    BatchOutcome::Scored {
                        student_id,
                        prediction,
                    } => (
                        student_id.clone(),
                        self.save_prediction(student_id, &model, prediction),
                    ),
                    BatchOutcome::Failed { .. } => continue,
                };
                match result {
                    Ok(prediction_id) => saved.push(SavedPrediction {
                        student_id,
                        prediction_id,
                    }),
                    Err(err) => {
                        warn!(student_id = %student_id, error = %err, "Saving prediction failed");
                        *outcome = BatchOutcome::failed(student_id, &err);
                    }
                }
            }
        }

        let successful = predictions.iter().filter(|o| o.is_scored()).count();
        let summary = BatchSummary {
            total: predictions.len(),
            successful,
            failed: predictions.len() - successful,
        };
        info!(
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            "Batch prediction finished"
        );

        Ok(BatchPredictionResponse {
            predictions,
            saved,
            summary,
        })
    }

    pub fn model_info(&self) -> ModelInfo {
        match self.store.current() {
            Some(model) => ModelInfo {
                status: ModelStatus::Trained,
                metadata: Some(model.metadata().clone()),
                feature_importances: model.feature_importances().to_vec(),
            },
            None => ModelInfo {
                status: ModelStatus::NotTrained,
                metadata: None,
                feature_importances: Vec::new(),
            },
        }
    }

    /// Score the current model on labeled students it was not trained on
    pub fn evaluate(&self, test_data: &[LabeledStudent]) -> Result<EvaluationReport> {
        let model = self.current_model()?;
        let extractor = model.feature_extractor(self.config.missing_attendance);
        let examples: Vec<TrainingExample> = test_data
            .iter()
            .map(|s| TrainingExample {
                features: extractor.extract(&s.record, &s.history),
                dropped_out: s.dropout.clone(),
            })
            .collect();

        let metrics = model.evaluate(&examples)?;
        info!(
            samples = examples.len(),
            accuracy = metrics.accuracy,
            "Evaluation finished"
        );

        Ok(EvaluationReport {
            model_type: model.algorithm(),
            metrics,
            test_samples: examples.len(),
        })
    }
}
