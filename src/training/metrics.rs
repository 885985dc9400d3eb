//! Classification metrics

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Fraction of predictions matching the true label
pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| (*t - *p).abs() < 0.5)
        .count();
    correct as f64 / y_true.len() as f64
}

/// Metrics for a binary classifier, positive class = 1
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Number of evaluated samples
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Compute classification metrics
    pub fn compute_classification(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let (tp, fp, _tn, fn_) = Self::confusion_counts(y_true, y_pred);

        let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
        let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy: accuracy(y_true, y_pred),
            precision,
            recall,
            f1_score,
            n_samples: y_true.len(),
        }
    }

    /// (true positives, false positives, true negatives, false negatives)
    pub fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
        let mut counts = (0, 0, 0, 0);
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t >= 0.5, p >= 0.5) {
                (true, true) => counts.0 += 1,
                (false, true) => counts.1 += 1,
                (false, false) => counts.2 += 1,
                (true, false) => counts.3 += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accuracy() {
        let y_true = array![0.0, 1.0, 1.0, 0.0];
        let y_pred = array![0.0, 1.0, 0.0, 0.0];
        assert_eq!(accuracy(&y_true, &y_pred), 0.75);
        assert_eq!(accuracy(&Array1::zeros(0), &Array1::zeros(0)), 0.0);
    }

    #[test]
    fn test_classification_metrics() {
        let y_true = array![1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let y_pred = array![1.0, 1.0, 0.0, 1.0, 0.0, 0.0];

        let metrics = ModelMetrics::compute_classification(&y_true, &y_pred);
        assert_eq!(ModelMetrics::confusion_counts(&y_true, &y_pred), (2, 1, 2, 1));
        assert!((metrics.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((metrics.recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((metrics.f1_score - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(metrics.n_samples, 6);
    }

    #[test]
    fn test_no_positive_predictions() {
        let metrics = ModelMetrics::compute_classification(&array![1.0, 0.0], &array![0.0, 0.0]);
        assert_eq!(metrics.precision, 0.0);
        assert_eq!(metrics.f1_score, 0.0);
    }
}
