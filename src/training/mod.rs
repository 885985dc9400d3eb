//! Model training module
//!
//! Tree-based classification used by the churn model:
//! - [`DecisionTree`] with Gini/entropy criteria and weighted samples
//! - [`RandomForest`] bagging ensemble with optional balanced class weights
//! - [`ModelMetrics`] for held-out evaluation

pub mod decision_tree;
pub mod metrics;
pub mod random_forest;

pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use metrics::{accuracy, ModelMetrics};
pub use random_forest::{ClassWeight, MaxFeatures, RandomForest};
