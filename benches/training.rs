use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use churn_predictor::dataset::{synthetic, ChurnDataset};
use churn_predictor::features::CustomerFeatures;
use churn_predictor::predictor::{ChurnPredictor, PredictorConfig};

fn churn_dataset(n_customers: usize) -> ChurnDataset {
    let df = synthetic::generate(n_customers, 42).unwrap();
    ChurnDataset::from_dataframe(&df).unwrap()
}

fn bench_training(c: &mut Criterion) {
    let mut group = c.benchmark_group("training");
    group.sample_size(10); // Fewer samples for training benchmarks

    for n_customers in [500, 2000, 5000].iter() {
        let dataset = churn_dataset(*n_customers);

        group.bench_with_input(
            BenchmarkId::new("fit", n_customers),
            &dataset,
            |b, dataset| {
                b.iter(|| {
                    let mut predictor = ChurnPredictor::new(PredictorConfig::default());
                    predictor.train(black_box(dataset)).unwrap()
                })
            },
        );
    }

    group.finish();
}

fn bench_prediction(c: &mut Criterion) {
    let mut group = c.benchmark_group("prediction");

    // Train model once
    let dataset = churn_dataset(2000);
    let mut predictor = ChurnPredictor::new(PredictorConfig::default());
    predictor.train(&dataset).unwrap();

    let customer = CustomerFeatures {
        engagement_momentum: -30.0,
        behavioral_drift: 50.0,
        silence_index: 9.0,
        response_degradation: 120.0,
        session_decay_rate: 35.0,
        consistency_score: 40.0,
    };

    group.bench_function("single_customer", |b| {
        b.iter(|| predictor.predict(black_box(&customer)).unwrap())
    });

    for limit in [50, 500].iter() {
        group.bench_with_input(BenchmarkId::new("analyze", limit), limit, |b, &limit| {
            b.iter(|| predictor.analyze(black_box(&dataset), limit).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_training, bench_prediction);
criterion_main!(benches);
