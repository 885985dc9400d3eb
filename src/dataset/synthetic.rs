//! Synthetic customer generation
//!
//! Each customer gets a latent disengagement score in [0, 1). Every feature
//! drifts with that score plus uniform noise, and the churn label is the
//! noisy score crossing 0.6, so the features are informative but not perfect.

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fs::File;
use std::path::Path;
use tracing::info;

fn jitter(rng: &mut ChaCha8Rng, scale: f64) -> f64 {
    rng.gen_range(-scale..scale)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Generate `n_customers` synthetic customers with ids `CUST_0001`, ...
pub fn generate(n_customers: usize, seed: u64) -> Result<DataFrame> {
    if n_customers == 0 {
        return Err(ChurnError::InvalidParameter {
            name: "n_customers".to_string(),
            value: "0".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut ids = Vec::with_capacity(n_customers);
    let mut engagement_momentum = Vec::with_capacity(n_customers);
    let mut behavioral_drift = Vec::with_capacity(n_customers);
    let mut silence_index = Vec::with_capacity(n_customers);
    let mut response_degradation = Vec::with_capacity(n_customers);
    let mut session_decay_rate = Vec::with_capacity(n_customers);
    let mut consistency_score = Vec::with_capacity(n_customers);
    let mut churn = Vec::with_capacity(n_customers);

    for i in 0..n_customers {
        let d: f64 = rng.gen();

        ids.push(format!("CUST_{:04}", i + 1));
        engagement_momentum.push(round2(15.0 - 60.0 * d + jitter(&mut rng, 8.0)));
        behavioral_drift.push(round2((5.0 + 60.0 * d + jitter(&mut rng, 8.0)).max(0.0)));
        silence_index.push(round2((1.0 + 14.0 * d + jitter(&mut rng, 2.0)).max(0.0)));
        response_degradation.push(round2((10.0 + 170.0 * d + jitter(&mut rng, 20.0)).max(0.0)));
        session_decay_rate.push(round2((2.0 + 50.0 * d + jitter(&mut rng, 6.0)).max(0.0)));
        consistency_score.push(round2((95.0 - 70.0 * d + jitter(&mut rng, 8.0)).clamp(0.0, 100.0)));
        churn.push(i32::from(d + jitter(&mut rng, 0.15) > 0.6));
    }

    let df = df!(
        "customer_id" => ids,
        "engagement_momentum" => engagement_momentum,
        "behavioral_drift" => behavioral_drift,
        "silence_index" => silence_index,
        "response_degradation" => response_degradation,
        "session_decay_rate" => session_decay_rate,
        "consistency_score" => consistency_score,
        "churn" => churn
    )?;

    Ok(df)
}

/// Write a DataFrame as CSV with a header row, creating parent directories
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;

    info!(path = %path.display(), rows = df.height(), "Wrote dataset");
    Ok(())
}
