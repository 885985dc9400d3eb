//! Trained churn model artifact

use crate::error::{ChurnError, Result};
use crate::features::feature_names;
use crate::preprocessing::StandardScaler;
use crate::training::decision_tree::argmax;
use crate::training::{ModelMetrics, RandomForest};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Outcome of a training run, as returned by `POST /train`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    /// Accuracy on the training split, in percent
    pub train_accuracy: f64,
    /// Accuracy on the held-out split, in percent
    pub test_accuracy: f64,
    pub features: Vec<String>,
    pub test_metrics: ModelMetrics,
    pub n_train: usize,
    pub n_test: usize,
    pub trained_at: DateTime<Utc>,
}

/// Everything needed to score a customer: scaler, forest and provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnModel {
    pub(crate) forest: RandomForest,
    pub(crate) scaler: StandardScaler,
    pub(crate) feature_names: Vec<String>,
    pub(crate) summary: TrainingSummary,
}

/// Per-row scoring output
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Score {
    /// P(churn) in [0, 1]
    pub probability: f64,
    /// Predicted class, 0 or 1
    pub prediction: u8,
}

impl ChurnModel {
    pub fn summary(&self) -> &TrainingSummary {
        &self.summary
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    /// Feature importances in canonical feature order
    pub fn importances(&self) -> Vec<f64> {
        self.forest
            .feature_importances()
            .map(|imp| imp.to_vec())
            .unwrap_or_else(|| vec![0.0; self.feature_names.len()])
    }

    /// Score raw (unscaled) feature rows
    pub(crate) fn score(&self, x: &Array2<f64>) -> Result<Vec<Score>> {
        let scaled = self.scaler.transform(x)?;
        let proba = self.forest.predict_proba(&scaled)?;
        let classes = self.forest.classes();
        let churn_idx = classes.iter().position(|&c| c == 1.0);

        Ok(proba
            .rows()
            .into_iter()
            .map(|row| Score {
                probability: churn_idx.map_or(0.0, |j| row[j]),
                prediction: (classes[argmax(row)] == 1.0) as u8,
            })
            .collect())
    }

    /// Write the model as pretty JSON
    ///
    /// The file is written next to `path` and renamed into place, so a
    /// reader never sees a half-written model.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };

        let json = serde_json::to_string_pretty(self)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Read a model written by [`save`](Self::save)
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&json)?;

        if model.feature_names != feature_names() {
            return Err(ChurnError::ValidationError(format!(
                "Saved model expects features {:?}",
                model.feature_names
            )));
        }
        if model.forest.n_features() != model.feature_names.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", model.feature_names.len()),
                actual: format!("{} features in forest", model.forest.n_features()),
            });
        }

        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{synthetic, ChurnDataset};
    use crate::predictor::{ChurnPredictor, PredictorConfig};

    fn trained_model() -> ChurnModel {
        let dataset = ChurnDataset::from_dataframe(&synthetic::generate(200, 7).unwrap()).unwrap();
        let mut predictor = ChurnPredictor::new(PredictorConfig {
            n_estimators: 8,
            ..Default::default()
        });
        predictor.train(&dataset).unwrap();
        predictor.model().unwrap().clone()
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churn_model.json");
        std::fs::write(&path, "{ not a model").unwrap();

        let model = trained_model();
        model.save(&path).unwrap();

        let loaded = ChurnModel::load(&path).unwrap();
        assert_eq!(loaded.summary(), model.summary());
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_concurrent_saves_leave_valid_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("churn_model.json");
        let model = trained_model();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..5 {
                        model.save(&path).unwrap();
                        ChurnModel::load(&path).unwrap();
                    }
                });
            }
        });

        let loaded = ChurnModel::load(&path).unwrap();
        assert_eq!(loaded.summary(), model.summary());
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1, "temporary files left behind");
    }

    #[test]
    fn test_load_rejects_forest_width_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churn_model.json");
        trained_model().save(&path).unwrap();

        let mut json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        json["forest"]["n_features"] = serde_json::json!(4);
        std::fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(ChurnModel::load(&path), Err(ChurnError::ShapeError { .. })));
    }
}
