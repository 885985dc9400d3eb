//! Silent Churn Predictor - customer churn scoring service
//!
//! Predicts which customers are quietly disengaging from six behavioral
//! signals, explains the prediction with the signals that crossed their risk
//! thresholds, and recommends a retention action.
//!
//! # Modules
//!
//! ## Core ML Modules
//! - [`features`] - The six behavioral features and their risk thresholds
//! - [`preprocessing`] - Standard scaling and stratified train/test split
//! - [`training`] - Decision tree and random forest classifiers, metrics
//!
//! ## Data
//! - [`dataset`] - CSV loading and synthetic customer generation
//!
//! ## Services
//! - [`predictor`] - Training, persistence, prediction and risk assessment
//! - [`server`] - HTTP server with the web UI and JSON API
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod features;
pub mod preprocessing;
pub mod training;

// Data
pub mod dataset;

// Services
pub mod predictor;
pub mod server;
pub mod cli;

pub use error::{ChurnError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::dataset::ChurnDataset;
    pub use crate::error::{ChurnError, Result};
    pub use crate::features::{CustomerFeatures, Feature};
    pub use crate::predictor::{
        BatchPrediction, ChurnAssessment, ChurnPredictor, PredictorConfig, RiskCategory,
    };
    pub use crate::preprocessing::StandardScaler;
    pub use crate::training::{DecisionTree, RandomForest};
}
