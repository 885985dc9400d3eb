//! Data preprocessing module
//!
//! - Feature standardization ([`StandardScaler`])
//! - Stratified train/test splitting ([`train_test_split`])

mod scaler;
mod split;

pub use scaler::StandardScaler;
pub use split::{train_test_split, TrainTestSplit};
