//! Customer dataset loading
//!
//! The churn dataset is a CSV with one row per customer: an optional
//! `customer_id`, the six behavioral feature columns, and a `churn` label
//! (1 = churned) used for training and batch analysis.

pub mod synthetic;

use crate::error::{ChurnError, Result};
use crate::features::{CustomerFeatures, Feature, FEATURE_COUNT};
use ndarray::{s, Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Label column
pub const TARGET_COLUMN: &str = "churn";
/// Identifier column
pub const ID_COLUMN: &str = "customer_id";

/// Customers, their feature matrix and (optionally) their churn labels
#[derive(Debug, Clone)]
pub struct ChurnDataset {
    customer_ids: Vec<String>,
    features: Array2<f64>,
    churn: Option<Array1<f64>>,
}

impl ChurnDataset {
    pub fn new(
        customer_ids: Vec<String>,
        features: Array2<f64>,
        churn: Option<Array1<f64>>,
    ) -> Result<Self> {
        let n = features.nrows();

        if features.ncols() != FEATURE_COUNT {
            return Err(ChurnError::ShapeError {
                expected: format!("{} feature columns", FEATURE_COUNT),
                actual: format!("{} feature columns", features.ncols()),
            });
        }

        if customer_ids.len() != n || churn.as_ref().map_or(false, |c| c.len() != n) {
            return Err(ChurnError::ShapeError {
                expected: format!("{} rows everywhere", n),
                actual: format!(
                    "{} ids, {} labels",
                    customer_ids.len(),
                    churn.as_ref().map_or(0, |c| c.len())
                ),
            });
        }

        Ok(Self { customer_ids, features, churn })
    }

    /// Load a dataset from a CSV file with a header row
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ChurnError::DatasetNotFound(path.display().to_string()));
        }

        let file = File::open(path)?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .into_reader_with_file_handle(file)
            .finish()?;

        debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded dataset");
        Self::from_dataframe(&df)
    }

    /// Extract the churn columns from a DataFrame
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let n_rows = df.height();

        let col_data: Vec<Vec<f64>> = Feature::ALL
            .iter()
            .map(|feature| numeric_column(df, feature.name()))
            .collect::<Result<_>>()?;
        let features = Array2::from_shape_fn((n_rows, FEATURE_COUNT), |(r, c)| col_data[c][r]);

        let churn = if df.column(TARGET_COLUMN).is_ok() {
            Some(Array1::from_vec(numeric_column(df, TARGET_COLUMN)?))
        } else {
            None
        };

        let customer_ids = if df.column(ID_COLUMN).is_ok() {
            string_column(df, ID_COLUMN)?
        } else {
            (1..=n_rows).map(|i| i.to_string()).collect()
        };

        Self::new(customer_ids, features, churn)
    }

    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn customer_ids(&self) -> &[String] {
        &self.customer_ids
    }

    pub fn churn(&self) -> Option<&Array1<f64>> {
        self.churn.as_ref()
    }

    /// Churn labels, required for training and analysis
    pub fn labels(&self) -> Result<&Array1<f64>> {
        self.churn
            .as_ref()
            .ok_or_else(|| ChurnError::FeatureNotFound(TARGET_COLUMN.to_string()))
    }

    /// Feature values of row `i`
    pub fn customer(&self, i: usize) -> Result<CustomerFeatures> {
        if i >= self.len() {
            return Err(ChurnError::InvalidInput(format!(
                "Row {} out of range for {} customers",
                i,
                self.len()
            )));
        }
        CustomerFeatures::from_slice(&self.features.row(i).to_vec())
    }

    /// First `n` rows (all rows if fewer)
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            customer_ids: self.customer_ids[..n].to_vec(),
            features: self.features.slice(s![..n, ..]).to_owned(),
            churn: self.churn.as_ref().map(|c| c.slice(s![..n]).to_owned()),
        }
    }
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| ChurnError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::Float64)?;
    let values = series.f64()?;

    let missing = values.null_count();
    if missing > 0 {
        return Err(ChurnError::DataError(format!(
            "Column '{}' has {} missing or non-numeric values",
            name, missing
        )));
    }

    let values: Vec<f64> = values.into_no_null_iter().collect();
    if let Some(row) = values.iter().position(|v| !v.is_finite()) {
        return Err(ChurnError::DataError(format!(
            "Column '{}' has a non-finite value ({}) in row {}",
            name,
            values[row],
            row + 1
        )));
    }

    Ok(values)
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .map_err(|_| ChurnError::FeatureNotFound(name.to_string()))?;
    let series = column.as_materialized_series().cast(&DataType::String)?;

    Ok(series
        .str()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.map_or_else(|| (i + 1).to_string(), str::to_string))
        .collect())
}
