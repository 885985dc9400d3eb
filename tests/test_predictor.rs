//! Integration test: churn pipeline from CSV to risk assessment

use churn_predictor::dataset::{synthetic, ChurnDataset};
use churn_predictor::prelude::*;
use churn_predictor::training::ClassWeight;
use polars::prelude::{NamedFrom, Series};

fn write_dataset(dir: &std::path::Path, rows: usize) -> std::path::PathBuf {
    let path = dir.join("customer_churn_data.csv");
    let mut df = synthetic::generate(rows, 42).unwrap();
    synthetic::write_csv(&mut df, &path).unwrap();
    path
}

fn small_config() -> PredictorConfig {
    PredictorConfig {
        n_estimators: 25,
        ..Default::default()
    }
}

#[test]
fn test_train_from_csv_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = write_dataset(dir.path(), 400);
    let model_path = dir.path().join("churn_model.json");

    let mut predictor = ChurnPredictor::new(small_config());
    let summary = predictor.train_from_csv(&data_path).unwrap();
    assert_eq!(summary.n_train + summary.n_test, 400);
    assert!((79..=81).contains(&summary.n_test), "n_test = {}", summary.n_test);
    assert!(summary.test_metrics.f1_score > 0.6, "f1 = {}", summary.test_metrics.f1_score);
    predictor.save(&model_path).unwrap();

    let mut reloaded = ChurnPredictor::default();
    assert!(reloaded.load(&model_path).unwrap());
    assert_eq!(reloaded.model().unwrap().summary(), &summary);

    let dataset = ChurnDataset::from_csv(&data_path).unwrap();
    assert_eq!(
        predictor.analyze(&dataset, 20).unwrap(),
        reloaded.analyze(&dataset, 20).unwrap()
    );
}

#[test]
fn test_training_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = write_dataset(dir.path(), 250);
    let dataset = ChurnDataset::from_csv(&data_path).unwrap();

    let mut a = ChurnPredictor::new(small_config());
    let mut b = ChurnPredictor::new(small_config());
    let summary_a = a.train(&dataset).unwrap();
    let summary_b = b.train(&dataset).unwrap();

    assert_eq!(summary_a.train_accuracy, summary_b.train_accuracy);
    assert_eq!(summary_a.test_accuracy, summary_b.test_accuracy);

    let customer = dataset.customer(3).unwrap();
    assert_eq!(a.predict(&customer).unwrap(), b.predict(&customer).unwrap());
}

#[test]
fn test_importances_drive_factor_order() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = ChurnDataset::from_csv(write_dataset(dir.path(), 300)).unwrap();

    let mut predictor = ChurnPredictor::new(small_config());
    predictor.train(&dataset).unwrap();

    let importances = predictor.model().unwrap().importances();
    assert_eq!(importances.len(), 6);
    assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);

    let customer = CustomerFeatures {
        engagement_momentum: -40.0,
        behavioral_drift: 60.0,
        silence_index: 14.0,
        response_degradation: 170.0,
        session_decay_rate: 45.0,
        consistency_score: 30.0,
    };
    let assessment = predictor.predict(&customer).unwrap();

    let mut expected: Vec<(Feature, f64)> = Feature::ALL
        .iter()
        .map(|&f| (f, (importances[f.index()] * 10_000.0).round()))
        .collect();
    expected.sort_by(|a, b| b.1.total_cmp(&a.1));
    let expected_titles: Vec<String> = expected.iter().take(3).map(|(f, _)| f.title()).collect();
    let titles: Vec<String> = assessment.risk_factors.iter().map(|f| f.feature.clone()).collect();
    assert_eq!(titles, expected_titles);
}

#[test]
fn test_uniform_weights_still_train() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = ChurnDataset::from_csv(write_dataset(dir.path(), 200)).unwrap();

    let config = PredictorConfig {
        class_weight: ClassWeight::Uniform,
        max_depth: None,
        ..small_config()
    };
    let mut predictor = ChurnPredictor::new(config);
    let summary = predictor.train(&dataset).unwrap();
    assert!(summary.train_accuracy >= summary.test_accuracy - 5.0);
}

#[test]
fn test_dataset_without_labels_cannot_train() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unlabelled.csv");

    let mut df = synthetic::generate(40, 1).unwrap().drop("churn").unwrap();
    synthetic::write_csv(&mut df, &path).unwrap();

    let dataset = ChurnDataset::from_csv(&path).unwrap();
    let result = ChurnPredictor::new(small_config()).train(&dataset);
    assert!(matches!(result, Err(ChurnError::FeatureNotFound(col)) if col == "churn"));
}

#[test]
fn test_non_numeric_feature_column_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.csv");

    let mut df = synthetic::generate(10, 1).unwrap();
    let bad: Vec<&str> = (0..10).map(|i| if i == 4 { "n/a" } else { "1.5" }).collect();
    df.with_column(Series::new("silence_index".into(), bad)).unwrap();
    synthetic::write_csv(&mut df, &path).unwrap();

    assert!(matches!(ChurnDataset::from_csv(&path), Err(ChurnError::DataError(_))));
}
