use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dropout_risk::features::{StudentFeatures, N_FEATURES};
use dropout_risk::inference::{Predictor, ScoringRequest};
use dropout_risk::training::{Algorithm, TrainedModel, Trainer, TrainingConfig, TrainingExample};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

fn random_features(rng: &mut ChaCha8Rng, dropout: bool) -> StudentFeatures {
    let mut values = [0.0; N_FEATURES];
    for v in values.iter_mut() {
        *v = rng.gen::<f64>();
    }
    // gpa and attendance carry the signal
    values[0] = if dropout { rng.gen_range(1.0..2.3) } else { rng.gen_range(2.6..4.0) };
    values[3] = if dropout { rng.gen_range(0.4..0.7) } else { rng.gen_range(0.8..1.0) };
    StudentFeatures::canonical(values)
}

fn create_training_data(n_rows: usize) -> Vec<TrainingExample> {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    (0..n_rows)
        .map(|i| {
            let dropout = i % 10 < 3;
            TrainingExample::new(random_features(&mut rng, dropout), dropout)
        })
        .collect()
}

fn train(algorithm: Algorithm) -> TrainedModel {
    let config = TrainingConfig::new(algorithm).with_n_estimators(50);
    Trainer::new(config)
        .train(&create_training_data(500))
        .expect("training benchmark model")
        .model
}

fn bench_predict_one(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict_one");
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let features = random_features(&mut rng, true);
    let predictor = Predictor::default();

    for algorithm in Algorithm::all() {
        let model = train(algorithm);
        group.bench_function(algorithm.as_str(), |b| {
            b.iter(|| predictor.predict_one(black_box(&features), &model))
        });
    }

    group.finish();
}

fn bench_predict_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("predict_batch");
    let model = train(Algorithm::RandomForest);
    let predictor = Predictor::default();
    let mut rng = ChaCha8Rng::seed_from_u64(11);

    for n in [10usize, 100, 1000].iter() {
        let requests: Vec<ScoringRequest> = (0..*n)
            .map(|i| ScoringRequest::new(format!("s-{}", i), random_features(&mut rng, i % 3 == 0)))
            .collect();

        group.bench_with_input(BenchmarkId::new("random_forest", n), &requests, |b, requests| {
            b.iter(|| predictor.predict_batch(black_box(requests), &model))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_predict_one, bench_predict_batch);
criterion_main!(benches);
