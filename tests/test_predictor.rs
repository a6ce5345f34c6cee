//! Integration tests: single and batch scoring

mod common;

use dropout_risk::error::ErrorKind;
use dropout_risk::features::{FeatureExtractor, StudentFeatures, FEATURE_NAMES};
use dropout_risk::inference::{BatchOutcome, Predictor, PredictorConfig, RiskLevel, ScoringRequest};
use dropout_risk::preprocessing::CategoricalEncoder;
use dropout_risk::training::{Algorithm, TrainedModel, Trainer, TrainingConfig, TrainingExample};

fn model() -> TrainedModel {
    let extractor = FeatureExtractor::new(CategoricalEncoder::default());
    let data: Vec<TrainingExample> = common::cohort(80, 4)
        .into_iter()
        .map(|s| TrainingExample::new(extractor.extract(&s.record, &s.history), s.dropout))
        .collect();
    Trainer::new(TrainingConfig::new(Algorithm::LogisticRegression).with_seed(1))
        .train(&data)
        .unwrap()
        .model
}

fn requests(n: usize) -> Vec<ScoringRequest> {
    let extractor = FeatureExtractor::new(CategoricalEncoder::default());
    common::cohort(n, 77)
        .into_iter()
        .map(|s| ScoringRequest::new(s.record.student_id.clone(), extractor.extract(&s.record, &s.history)))
        .collect()
}

fn truncated(features: &StudentFeatures) -> StudentFeatures {
    features.clone().without(FEATURE_NAMES[13])
}

#[test]
fn test_prediction_fields_consistent() {
    let model = model();
    let predictor = Predictor::default();
    for req in requests(20) {
        let p = predictor.predict_one(&req.features, &model).unwrap();
        assert!((0.0..=1.0).contains(&p.risk_score));
        assert!((0.0..=1.0).contains(&p.confidence));
        assert_eq!(p.risk_level, RiskLevel::from_score(p.risk_score));
        assert_eq!(p.dropout_prediction, p.risk_score >= 0.5);
        assert_eq!(p.algorithm, Algorithm::LogisticRegression);
    }
}

#[test]
fn test_contributing_factors_ranked_and_capped() {
    let model = model();
    let req = &requests(1)[0];

    let p = Predictor::default().predict_one(&req.features, &model).unwrap();
    assert_eq!(p.contributing_factors.len(), 5);
    for pair in p.contributing_factors.windows(2) {
        assert!(pair[0].contribution.abs() >= pair[1].contribution.abs());
    }
    for factor in &p.contributing_factors {
        assert_eq!(req.features.get(&factor.feature), Some(factor.value));
        assert_eq!(model.importance_of(&factor.feature), Some(factor.importance));
    }

    let wide = Predictor::new(PredictorConfig::new().with_top_factors(50))
        .predict_one(&req.features, &model)
        .unwrap();
    assert_eq!(wide.contributing_factors.len(), FEATURE_NAMES.len());
}

#[test]
fn test_batch_partial_failure_keeps_order() {
    let model = model();
    let mut batch = requests(6);
    batch[2].features = truncated(&batch[2].features);
    batch[4].features = truncated(&batch[4].features);

    let outcomes = Predictor::default().predict_batch(&batch, &model);

    assert_eq!(outcomes.len(), 6);
    for (req, outcome) in batch.iter().zip(&outcomes) {
        assert_eq!(outcome.student_id(), req.student_id);
    }
    assert_eq!(outcomes.iter().filter(|o| o.is_scored()).count(), 4);
    match &outcomes[2] {
        BatchOutcome::Failed { kind, .. } => assert_eq!(*kind, ErrorKind::SchemaMismatch),
        BatchOutcome::Scored { .. } => panic!("truncated vector was scored"),
    }
}

#[test]
fn test_parallel_batch_matches_sequential() {
    let model = model();
    let batch = requests(40);

    let sequential = Predictor::new(PredictorConfig::new().with_parallel_threshold(usize::MAX))
        .predict_batch(&batch, &model);
    let parallel = Predictor::new(
        PredictorConfig::new()
            .with_parallel_threshold(1)
            .with_n_workers(2),
    )
    .predict_batch(&batch, &model);

    assert_eq!(sequential, parallel);
}

#[test]
fn test_empty_batch() {
    let model = model();
    assert!(Predictor::default().predict_batch(&[], &model).is_empty());
}

#[test]
fn test_outcome_json_is_tagged() {
    let model = model();
    let mut batch = requests(2);
    batch[1].features = truncated(&batch[1].features);
    let outcomes = Predictor::default().predict_batch(&batch, &model);

    let json = serde_json::to_value(&outcomes).unwrap();
    assert_eq!(json[0]["status"], "scored");
    assert_eq!(json[1]["status"], "failed");
    assert_eq!(json[1]["kind"], "schema_mismatch");
}

#[test]
fn test_request_with_unequal_feature_lists_is_rejected() {
    // One value short of the 14 names
    let json = serde_json::json!({
        "student_id": "s-1",
        "features": { "names": FEATURE_NAMES, "values": vec![0.5; 13] },
    });
    assert!(serde_json::from_value::<ScoringRequest>(json).is_err());

    let json = serde_json::json!({
        "student_id": "s-2",
        "features": { "names": FEATURE_NAMES, "values": vec![0.5; 14] },
    });
    let request: ScoringRequest = serde_json::from_value(json).unwrap();
    assert!(Predictor::default().predict_one(&request.features, &model()).is_ok());
}
