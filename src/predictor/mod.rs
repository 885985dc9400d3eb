//! Churn prediction service core
//!
//! [`ChurnPredictor`] owns the training recipe and the trained
//! [`ChurnModel`]. It turns a [`CustomerFeatures`] into a
//! [`ChurnAssessment`]: a probability, a risk bucket, the features that
//! pushed the customer over their thresholds, and a recommended action.

mod model;
pub mod risk;

pub use model::{ChurnModel, TrainingSummary};
pub use risk::{RiskCategory, RiskFactor};

use crate::dataset::ChurnDataset;
use crate::error::{ChurnError, Result};
use crate::features::{feature_names, CustomerFeatures};
use crate::preprocessing::{train_test_split, StandardScaler};
use crate::training::{ClassWeight, ModelMetrics, RandomForest};
use ndarray::{Array1, Array2};
use risk::{recommendation, risk_factors, round2, MAX_REPORTED_FACTORS};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Hyperparameters of the churn model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub class_weight: ClassWeight,
    pub random_state: u64,
    /// Fraction of customers held out for evaluation
    pub test_size: f64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(10),
            min_samples_split: 5,
            class_weight: ClassWeight::Balanced,
            random_state: 42,
            test_size: 0.2,
        }
    }
}

/// Prediction for one customer, as returned by `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnAssessment {
    /// P(churn) in percent
    pub churn_probability: f64,
    /// Predicted class, 1 = churn
    pub prediction: u8,
    pub risk_category: RiskCategory,
    pub risk_color: String,
    /// At most three triggered factors, most important first
    pub risk_factors: Vec<RiskFactor>,
    pub recommendation: String,
}

/// One row of `GET /analyze_dataset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPrediction {
    pub customer_id: String,
    /// P(churn) in percent
    pub churn_probability: f64,
    pub risk_category: RiskCategory,
    pub actual_churn: i64,
}

/// Trains, persists and serves the churn model
#[derive(Debug, Clone, Default)]
pub struct ChurnPredictor {
    config: PredictorConfig,
    model: Option<ChurnModel>,
}

impl ChurnPredictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self { config, model: None }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&ChurnModel> {
        self.model.as_ref()
    }

    /// Replace the in-memory model
    pub fn set_model(&mut self, model: ChurnModel) {
        self.model = Some(model);
    }

    /// Load a dataset from CSV and train on it
    pub fn train_from_csv(&mut self, path: impl AsRef<Path>) -> Result<TrainingSummary> {
        let dataset = ChurnDataset::from_csv(path)?;
        self.train(&dataset)
    }

    /// Fit the scaler and forest on a stratified split of `dataset`
    pub fn train(&mut self, dataset: &ChurnDataset) -> Result<TrainingSummary> {
        let model = self.fit_model(dataset)?;
        let summary = model.summary().clone();
        self.model = Some(model);
        Ok(summary)
    }

    /// Build a model without touching the one currently served
    pub fn fit_model(&self, dataset: &ChurnDataset) -> Result<ChurnModel> {
        let start = Instant::now();
        let labels = dataset.labels()?;
        validate_labels(labels)?;

        let split = train_test_split(
            dataset.features(),
            labels,
            self.config.test_size,
            self.config.random_state,
        )?;

        let mut scaler = StandardScaler::new();
        let x_train = scaler.fit_transform(&split.x_train)?;
        let x_test = scaler.transform(&split.x_test)?;

        let mut forest = RandomForest::new(self.config.n_estimators)
            .with_min_samples_split(self.config.min_samples_split)
            .with_class_weight(self.config.class_weight)
            .with_random_state(self.config.random_state);
        if let Some(depth) = self.config.max_depth {
            forest = forest.with_max_depth(depth);
        }
        forest.fit(&x_train, &split.y_train)?;

        let train_accuracy = forest.score(&x_train, &split.y_train)?;
        let test_predictions = forest.predict(&x_test)?;
        let test_metrics = ModelMetrics::compute_classification(&split.y_test, &test_predictions);

        let summary = TrainingSummary {
            train_accuracy: round2(train_accuracy * 100.0),
            test_accuracy: round2(test_metrics.accuracy * 100.0),
            features: feature_names(),
            test_metrics,
            n_train: split.x_train.nrows(),
            n_test: split.x_test.nrows(),
            trained_at: chrono::Utc::now(),
        };

        info!(
            n_train = summary.n_train,
            n_test = summary.n_test,
            n_trees = forest.n_trees(),
            train_accuracy = summary.train_accuracy,
            test_accuracy = summary.test_accuracy,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Churn model trained"
        );

        Ok(ChurnModel {
            forest,
            scaler,
            feature_names: feature_names(),
            summary,
        })
    }

    /// Persist the trained model
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let model = self.model.as_ref().ok_or(ChurnError::ModelNotFitted)?;
        model.save(path)
    }

    /// Load a saved model. Returns `Ok(false)` when no model file exists.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(false);
        }
        self.model = Some(ChurnModel::load(path)?);
        info!(path = %path.display(), "Loaded churn model");
        Ok(true)
    }

    /// Assess one customer
    pub fn predict(&self, customer: &CustomerFeatures) -> Result<ChurnAssessment> {
        let model = self.model.as_ref().ok_or(ChurnError::ModelNotFitted)?;
        customer.validate()?;

        let x = Array2::from_shape_vec((1, crate::features::FEATURE_COUNT), customer.to_vec())
            .map_err(|e| ChurnError::ShapeError {
                expected: "one row of features".to_string(),
                actual: e.to_string(),
            })?;
        let score = model
            .score(&x)?
            .into_iter()
            .next()
            .ok_or_else(|| ChurnError::ValidationError("No prediction produced".to_string()))?;

        let risk_category = RiskCategory::from_probability(score.probability);
        let mut factors = risk_factors(customer, &model.importances());
        let recommendation = recommendation(risk_category, &factors);
        factors.truncate(MAX_REPORTED_FACTORS);

        Ok(ChurnAssessment {
            churn_probability: round2(score.probability * 100.0),
            prediction: score.prediction,
            risk_category,
            risk_color: risk_category.color().to_string(),
            risk_factors: factors,
            recommendation,
        })
    }

    /// Score the first `limit` customers of a labelled dataset
    pub fn analyze(&self, dataset: &ChurnDataset, limit: usize) -> Result<Vec<BatchPrediction>> {
        let model = self.model.as_ref().ok_or(ChurnError::ModelNotFitted)?;
        let head = dataset.head(limit);
        let labels = head.labels()?;

        if head.is_empty() {
            return Ok(Vec::new());
        }

        let scores = model.score(head.features())?;

        Ok(head
            .customer_ids()
            .iter()
            .zip(scores)
            .zip(labels.iter())
            .map(|((customer_id, score), &actual)| BatchPrediction {
                customer_id: customer_id.clone(),
                churn_probability: round2(score.probability * 100.0),
                risk_category: RiskCategory::from_probability(score.probability),
                actual_churn: actual.round() as i64,
            })
            .collect())
    }
}

/// Labels must be 0/1 with both outcomes present
fn validate_labels(labels: &Array1<f64>) -> Result<()> {
    if let Some(bad) = labels.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(ChurnError::ValidationError(format!(
            "Churn labels must be 0 or 1, found {}",
            bad
        )));
    }

    let churned = labels.iter().filter(|&&v| v == 1.0).count();
    if churned == 0 || churned == labels.len() {
        return Err(ChurnError::ValidationError(
            "Training data must contain both churned and retained customers".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::synthetic;
    use polars::prelude::{NamedFrom, Series};

    fn quick_config() -> PredictorConfig {
        PredictorConfig {
            n_estimators: 15,
            ..Default::default()
        }
    }

    fn trained_predictor() -> ChurnPredictor {
        let dataset = ChurnDataset::from_dataframe(&synthetic::generate(300, 42).unwrap()).unwrap();
        let mut predictor = ChurnPredictor::new(quick_config());
        predictor.train(&dataset).unwrap();
        predictor
    }

    fn at_risk_customer() -> CustomerFeatures {
        CustomerFeatures {
            engagement_momentum: -45.0,
            behavioral_drift: 65.0,
            silence_index: 15.0,
            response_degradation: 180.0,
            session_decay_rate: 50.0,
            consistency_score: 25.0,
        }
    }

    fn engaged_customer() -> CustomerFeatures {
        CustomerFeatures {
            engagement_momentum: 12.0,
            behavioral_drift: 6.0,
            silence_index: 1.0,
            response_degradation: 15.0,
            session_decay_rate: 3.0,
            consistency_score: 93.0,
        }
    }

    #[test]
    fn test_train_summary() {
        let dataset = ChurnDataset::from_dataframe(&synthetic::generate(300, 42).unwrap()).unwrap();
        let mut predictor = ChurnPredictor::new(quick_config());
        let summary = predictor.train(&dataset).unwrap();

        assert!(predictor.is_trained());
        assert_eq!(summary.features, feature_names());
        assert_eq!(summary.n_train + summary.n_test, 300);
        assert!(summary.train_accuracy > 80.0, "train accuracy {}", summary.train_accuracy);
        assert!(summary.test_accuracy > 70.0, "test accuracy {}", summary.test_accuracy);
        assert!(summary.test_accuracy <= 100.0);
    }

    #[test]
    fn test_predict_high_risk() {
        let predictor = trained_predictor();
        let assessment = predictor.predict(&at_risk_customer()).unwrap();

        assert_eq!(assessment.risk_category, RiskCategory::High);
        assert_eq!(assessment.risk_color, "#ef4444");
        assert_eq!(assessment.prediction, 1);
        assert!(assessment.churn_probability >= 60.0);
        assert_eq!(assessment.risk_factors.len(), 3);
        assert!(assessment.recommendation.starts_with("URGENT"));

        let importances: Vec<f64> = assessment.risk_factors.iter().map(|f| f.importance).collect();
        assert!(importances.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_predict_low_risk() {
        let predictor = trained_predictor();
        let assessment = predictor.predict(&engaged_customer()).unwrap();

        assert_eq!(assessment.risk_category, RiskCategory::Low);
        assert_eq!(assessment.prediction, 0);
        assert!(assessment.risk_factors.is_empty());
        assert_eq!(
            assessment.recommendation,
            "Customer is engaged. Continue standard engagement practices."
        );
    }

    #[test]
    fn test_predict_untrained() {
        let predictor = ChurnPredictor::default();
        assert!(matches!(
            predictor.predict(&engaged_customer()),
            Err(ChurnError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_predict_rejects_non_finite() {
        let predictor = trained_predictor();
        let mut customer = engaged_customer();
        customer.behavioral_drift = f64::INFINITY;
        assert!(matches!(predictor.predict(&customer), Err(ChurnError::InvalidInput(_))));
    }

    #[test]
    fn test_analyze() {
        let dataset = ChurnDataset::from_dataframe(&synthetic::generate(300, 42).unwrap()).unwrap();
        let predictor = trained_predictor();

        let rows = predictor.analyze(&dataset, 50).unwrap();
        assert_eq!(rows.len(), 50);
        assert_eq!(rows[0].customer_id, "CUST_0001");
        assert!(rows.iter().all(|r| r.actual_churn == 0 || r.actual_churn == 1));
        assert!(rows.iter().all(|r| (0.0..=100.0).contains(&r.churn_probability)));

        let agree = rows
            .iter()
            .filter(|r| (r.risk_category == RiskCategory::High) == (r.actual_churn == 1))
            .count();
        assert!(agree >= 30, "only {} of 50 rows agree", agree);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("churn_model.json");

        let predictor = trained_predictor();
        predictor.save(&path).unwrap();

        let mut restored = ChurnPredictor::new(quick_config());
        assert!(restored.load(&path).unwrap());

        let customer = at_risk_customer();
        assert_eq!(
            predictor.predict(&customer).unwrap(),
            restored.predict(&customer).unwrap()
        );
    }

    #[test]
    fn test_load_missing_file() {
        let mut predictor = ChurnPredictor::default();
        assert!(!predictor.load("/nonexistent/churn_model.json").unwrap());
        assert!(!predictor.is_trained());
    }

    #[test]
    fn test_save_untrained() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = ChurnPredictor::default();
        assert!(predictor.save(dir.path().join("m.json")).is_err());
    }

    #[test]
    fn test_rejects_single_class() {
        let mut df = synthetic::generate(30, 1).unwrap();
        df.with_column(Series::new("churn".into(), vec![0i32; 30]))
            .unwrap();
        let dataset = ChurnDataset::from_dataframe(&df).unwrap();

        let result = ChurnPredictor::default().train(&dataset);
        assert!(matches!(result, Err(ChurnError::ValidationError(_))));
    }
}
