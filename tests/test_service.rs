//! Integration tests: the in-process service API

mod common;

use dropout_risk::config::PipelineConfig;
use dropout_risk::error::{ErrorKind, Result};
use dropout_risk::features::MissingAttendancePolicy;
use dropout_risk::inference::{BatchOutcome, RiskLevel};
use dropout_risk::service::{
    BatchPredictionRequest, DropoutService, InMemoryPredictionSink, InMemoryStudentRepository,
    ModelStatus, PredictionRecord, PredictionSink, TrainingRequest,
};
use dropout_risk::training::{Algorithm, RawLabel, TrainingConfig};
use dropout_risk::RiskError;
use std::sync::Arc;

fn config(dir: &std::path::Path) -> PipelineConfig {
    PipelineConfig::from_lookup(|_| None)
        .with_model_dir(dir)
        .with_training(TrainingConfig::default().with_n_estimators(20))
}

fn repository() -> InMemoryStudentRepository {
    let repo = InMemoryStudentRepository::new();
    for profile in common::profiles(10, 300) {
        repo.insert(profile);
    }
    let (record, history) = common::at_risk("risky");
    let (good, good_history) = common::thriving("steady");
    repo.with_student(record, history).with_student(good, good_history)
}

type Service = DropoutService<InMemoryStudentRepository, Arc<InMemoryPredictionSink>>;

fn service(dir: &std::path::Path) -> (Service, Arc<InMemoryPredictionSink>) {
    let sink = Arc::new(InMemoryPredictionSink::new());
    (DropoutService::new(config(dir), repository(), Arc::clone(&sink)), sink)
}

fn train(service: &Service, save: bool) {
    let request = TrainingRequest::new(common::cohort(100, 8))
        .with_save_model(save)
        .with_seed(42);
    service.train(request).unwrap();
}

// ============================================================================
// Training
// ============================================================================

#[test]
fn test_train_saves_and_installs_model() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service(dir.path());

    let response = service
        .train(TrainingRequest::new(common::cohort(100, 8)).with_seed(42))
        .unwrap();

    assert_eq!(response.model_type, Algorithm::RandomForest);
    assert!(response.metrics.accuracy > 0.5);
    let path = response.model_path.unwrap();
    assert!(std::path::Path::new(&path).exists());
    assert_eq!(service.model_info().metadata.unwrap().model_id, response.model_id);
}

#[test]
fn test_train_without_save() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service(dir.path());
    let response = service
        .train(
            TrainingRequest::new(common::cohort(60, 2))
                .with_model_type(Algorithm::LogisticRegression)
                .with_save_model(false),
        )
        .unwrap();
    assert!(response.model_path.is_none());
    assert!(!service.store().path_for(Algorithm::LogisticRegression).exists());
    assert_eq!(service.model_info().status, ModelStatus::Trained);
}

#[test]
fn test_train_rejects_bad_label() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service(dir.path());
    let mut data = common::cohort(40, 3);
    data[5].dropout = RawLabel::from("maybe");

    let err = service.train(TrainingRequest::new(data)).unwrap_err();
    assert!(matches!(err, RiskError::InvalidLabel(_)));
    assert_eq!(service.model_info().status, ModelStatus::NotTrained);
}

#[test]
fn test_training_request_json_defaults() {
    let json = serde_json::json!({
        "training_data": [{
            "record": { "student_id": "a", "gpa": 2.0 },
            "dropout": "yes"
        }]
    });
    let request: TrainingRequest = serde_json::from_value(json).unwrap();
    assert_eq!(request.model_type, Algorithm::RandomForest);
    assert!(request.save_model);
    assert!(request.seed.is_none());
    assert_eq!(request.training_data[0].dropout.to_class().unwrap(), 1);
}

// ============================================================================
// Prediction
// ============================================================================

#[test]
fn test_predict_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service(dir.path());
    let err = service.predict_student("risky", false).unwrap_err();
    assert!(matches!(err, RiskError::ModelNotTrained));

    let batch = BatchPredictionRequest {
        student_ids: vec!["risky".to_string()],
        save_predictions: false,
    };
    assert!(matches!(service.predict_batch(&batch), Err(RiskError::ModelNotTrained)));
}

#[test]
fn test_predict_student_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let (service, sink) = service(dir.path());
    train(&service, false);

    let result = service.predict_student("risky", true).unwrap();
    assert_eq!(result.prediction.risk_level, RiskLevel::High);
    let id = result.prediction_id.unwrap();

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, id);
    assert_eq!(records[0].1.student_id, "risky");
    assert_eq!(records[0].1.prediction, result.prediction);

    let unsaved = service.predict_student("steady", false).unwrap();
    assert!(unsaved.prediction_id.is_none());
    assert_eq!(unsaved.prediction.risk_level, RiskLevel::Low);
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_predict_unknown_student() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service(dir.path());
    train(&service, false);
    let err = service.predict_student("nobody", true).unwrap_err();
    assert!(matches!(err, RiskError::StudentNotFound(ref id) if id == "nobody"));
}

#[test]
fn test_batch_summary_and_order() {
    let dir = tempfile::tempdir().unwrap();
    let (service, sink) = service(dir.path());
    train(&service, false);

    let ids: Vec<String> = ["risky", "ghost", "steady", "s-0003"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let response = service
        .predict_batch(&BatchPredictionRequest {
            student_ids: ids.clone(),
            save_predictions: true,
        })
        .unwrap();

    let returned: Vec<&str> = response.predictions.iter().map(|o| o.student_id()).collect();
    assert_eq!(returned, ids.iter().map(String::as_str).collect::<Vec<_>>());
    assert_eq!(response.summary.total, 4);
    assert_eq!(response.summary.successful, 3);
    assert_eq!(response.summary.failed, 1);
    assert_eq!(response.saved.len(), 3);
    assert_eq!(sink.len(), 3);

    match &response.predictions[1] {
        BatchOutcome::Failed { kind, .. } => assert_eq!(*kind, ErrorKind::StudentNotFound),
        BatchOutcome::Scored { .. } => panic!("unknown student was scored"),
    }
}

struct FailingSink;

impl PredictionSink for FailingSink {
    fn record(&self, _record: PredictionRecord) -> Result<String> {
        Err(RiskError::ValidationError("storage offline".to_string()))
    }
}

#[test]
fn test_sink_failure_becomes_item_failure() {
    let dir = tempfile::tempdir().unwrap();
    let service = DropoutService::new(config(dir.path()), repository(), FailingSink);
    service
        .train(TrainingRequest::new(common::cohort(60, 8)).with_save_model(false))
        .unwrap();

    let response = service
        .predict_batch(&BatchPredictionRequest {
            student_ids: vec!["risky".to_string(), "steady".to_string()],
            save_predictions: true,
        })
        .unwrap();
    assert_eq!(response.summary.failed, 2);
    assert!(response.saved.is_empty());

    assert!(service.predict_student("risky", true).is_err());
    assert!(service.predict_student("risky", false).is_ok());
}

// ============================================================================
// Introspection, evaluation and reload
// ============================================================================

#[test]
fn test_model_info_states() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service(dir.path());

    let info = service.model_info();
    assert_eq!(info.status, ModelStatus::NotTrained);
    assert!(info.metadata.is_none());
    assert!(info.feature_importances.is_empty());
    assert_eq!(serde_json::to_value(info.status).unwrap(), "not_trained");

    train(&service, false);
    let info = service.model_info();
    assert_eq!(info.status, ModelStatus::Trained);
    assert_eq!(info.feature_importances.len(), 14);
}

#[test]
fn test_evaluate_on_holdout() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = service(dir.path());
    assert!(matches!(service.evaluate(&common::cohort(20, 1)), Err(RiskError::ModelNotTrained)));

    train(&service, false);
    let report = service.evaluate(&common::cohort(50, 12345)).unwrap();
    assert_eq!(report.test_samples, 50);
    assert_eq!(report.model_type, Algorithm::RandomForest);
    assert!(report.metrics.accuracy > 0.5);
}

#[test]
fn test_fresh_service_loads_saved_model() {
    let dir = tempfile::tempdir().unwrap();
    let (first, _) = service(dir.path());
    train(&first, true);
    let expected = first.predict_student("risky", false).unwrap().prediction;

    let (second, _) = service(dir.path());
    assert!(!second.load_existing(Algorithm::LogisticRegression).unwrap());
    assert!(second.load_existing(Algorithm::RandomForest).unwrap());
    assert_eq!(second.predict_student("risky", false).unwrap().prediction, expected);
}

#[test]
fn test_missing_attendance_policy_applies() {
    let dir = tempfile::tempdir().unwrap();
    let sink = InMemoryPredictionSink::new();
    let config = config(dir.path()).with_missing_attendance(MissingAttendancePolicy::Assume(0.9));
    let repo = InMemoryStudentRepository::new().with_student(
        dropout_risk::features::StudentRecord::new("no-attendance").with_gpa(3.5),
        Default::default(),
    );
    let service = DropoutService::new(config, repo, sink);
    service
        .train(TrainingRequest::new(common::cohort(60, 8)).with_save_model(false))
        .unwrap();

    let p = service.predict_student("no-attendance", false).unwrap().prediction;
    assert!((0.0..=1.0).contains(&p.risk_score));
}
