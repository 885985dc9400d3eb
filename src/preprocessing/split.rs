//! Stratified train/test splitting

use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;

/// Output of [`train_test_split`]
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

/// Split `x`/`y` into train and test sets, preserving class proportions.
///
/// Each class contributes `round(count * test_size)` samples to the test set,
/// clamped so that both sides keep at least one sample of every class.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    if x.nrows() != y.len() {
        return Err(ChurnError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }

    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ChurnError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be strictly between 0 and 1".to_string(),
        });
    }

    // Group indices by class label (BTreeMap keeps class order deterministic)
    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        class_indices.entry(label.round() as i64).or_default().push(i);
    }

    if let Some((label, indices)) = class_indices.iter().find(|(_, idx)| idx.len() < 2) {
        return Err(ChurnError::ValidationError(format!(
            "The least populated class in y ({}) has only {} member, which is too few. \
             The minimum number of members in any class cannot be less than 2.",
            label,
            indices.len()
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices = Vec::with_capacity(x.nrows());
    let mut test_indices = Vec::new();

    for indices in class_indices.values_mut() {
        indices.shuffle(&mut rng);
        let n_test = ((indices.len() as f64) * test_size).round() as usize;
        let n_test = n_test.clamp(1, indices.len() - 1);
        test_indices.extend_from_slice(&indices[..n_test]);
        train_indices.extend_from_slice(&indices[n_test..]);
    }

    train_indices.shuffle(&mut rng);
    test_indices.shuffle(&mut rng);

    Ok(TrainTestSplit {
        x_train: x.select(Axis(0), &train_indices),
        x_test: x.select(Axis(0), &test_indices),
        y_train: y.select(Axis(0), &train_indices),
        y_test: y.select(Axis(0), &test_indices),
    })
}
