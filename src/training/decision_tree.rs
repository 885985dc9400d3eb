//! Decision tree classifier
//!
//! CART-style binary tree over weighted samples. Leaves keep the weighted
//! class distribution of the samples that reached them, so a forest can
//! average probabilities instead of counting hard votes.

use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with the class probability distribution
    Leaf {
        distribution: Vec<f64>,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity
    #[default]
    Gini,
    /// Shannon entropy (bits)
    Entropy,
}

impl Criterion {
    /// Impurity of a node given its weighted class counts
    fn impurity(self, counts: &[f64], total: f64) -> f64 {
        if total <= 0.0 {
            return 0.0;
        }
        match self {
            Criterion::Gini => {
                1.0 - counts.iter().map(|&c| (c / total).powi(2)).sum::<f64>()
            }
            Criterion::Entropy => -counts
                .iter()
                .filter(|&&c| c > 0.0)
                .map(|&c| {
                    let p = c / total;
                    p * p.log2()
                })
                .sum::<f64>(),
        }
    }
}

/// Best split found for one node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    /// Sum of weight * impurity over both children
    child_impurity: f64,
}

/// Per-fit scratch state shared by the recursive builder
struct BuildContext<'a> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    weights: &'a [f64],
    n_classes: usize,
    max_features: usize,
    rng: ChaCha8Rng,
    importances: Vec<f64>,
}

impl BuildContext<'_> {
    fn class_weights(&self, indices: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[self.y[i]] += self.weights[i];
        }
        counts
    }

    /// Candidate features for one node, in ascending order
    fn draw_features(&mut self) -> Vec<usize> {
        let n_features = self.x.ncols();
        if self.max_features >= n_features {
            return (0..n_features).collect();
        }
        let mut features =
            rand::seq::index::sample(&mut self.rng, n_features, self.max_features).into_vec();
        features.sort_unstable();
        features
    }
}

/// Decision tree classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Number of features drawn at each split (all when `None`)
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for feature sampling
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Class labels, index-aligned with leaf distributions
    classes: Vec<f64>,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            classes: Vec::new(),
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree with uniform sample weights
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let classes = unique_classes(y);
        let encoded = encode_labels(y, &classes);
        let weights = vec![1.0; y.len()];
        self.fit_encoded(x, &encoded, &weights, &classes)?;
        Ok(self)
    }

    /// Fit on class indices into `classes` with per-sample weights
    pub(crate) fn fit_encoded(
        &mut self,
        x: &Array2<f64>,
        y: &[usize],
        weights: &[f64],
        classes: &[f64],
    ) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() || n_samples != weights.len() {
            return Err(ChurnError::ShapeError {
                expected: format!("y and weights length = {}", n_samples),
                actual: format!("y length = {}, weights length = {}", y.len(), weights.len()),
            });
        }

        if n_samples == 0 || classes.is_empty() {
            return Err(ChurnError::ValidationError(
                "Cannot fit a tree on an empty dataset".to_string(),
            ));
        }

        if let Some(&bad) = y.iter().find(|&&c| c >= classes.len()) {
            return Err(ChurnError::ValidationError(format!(
                "Class index {} out of range for {} classes",
                bad,
                classes.len()
            )));
        }

        self.n_features = n_features;
        self.classes = classes.to_vec();

        let mut ctx = BuildContext {
            x,
            y,
            weights,
            n_classes: classes.len(),
            max_features: self.max_features.unwrap_or(n_features).min(n_features),
            rng: ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0)),
            importances: vec![0.0; n_features],
        };

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_node(&mut ctx, indices, 0));

        // Normalize feature importances
        let mut importances = ctx.importances;
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(())
    }

    fn build_node(&self, ctx: &mut BuildContext<'_>, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n_samples = indices.len();
        let counts = ctx.class_weights(&indices);
        let weight: f64 = counts.iter().sum();
        let impurity = self.criterion.impurity(&counts, weight);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || impurity <= 1e-12;

        if should_stop {
            return Self::leaf(counts, weight, n_samples);
        }

        let Some(split) = self.find_best_split(ctx, &indices, weight * impurity) else {
            return Self::leaf(counts, weight, n_samples);
        };

        ctx.importances[split.feature_idx] += weight * impurity - split.child_impurity;

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| ctx.x[[i, split.feature_idx]] <= split.threshold);

        let left = Box::new(self.build_node(ctx, left_indices, depth + 1));
        let right = Box::new(self.build_node(ctx, right_indices, depth + 1));

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
            impurity,
        }
    }

    fn leaf(counts: Vec<f64>, weight: f64, n_samples: usize) -> TreeNode {
        let n_classes = counts.len();
        let distribution = if weight > 0.0 {
            counts.into_iter().map(|c| c / weight).collect()
        } else {
            vec![1.0 / n_classes as f64; n_classes]
        };
        TreeNode::Leaf { distribution, n_samples }
    }

    fn find_best_split(
        &self,
        ctx: &mut BuildContext<'_>,
        indices: &[usize],
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let features = ctx.draw_features();
        let ctx = &*ctx;

        // Each feature independently finds its best threshold
        let candidates: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature_idx| self.best_split_for_feature(ctx, indices, feature_idx))
            .collect();

        // Sequential pick keeps ties on the lowest feature index
        let best = candidates.into_iter().flatten().fold(None, |best: Option<SplitCandidate>, c| {
            match best {
                Some(b) if b.child_impurity <= c.child_impurity => Some(b),
                _ => Some(c),
            }
        })?;

        if parent_impurity - best.child_impurity > 1e-12 {
            Some(best)
        } else {
            None
        }
    }

    /// Sweep the sorted feature values once, moving samples left to right
    fn best_split_for_feature(
        &self,
        ctx: &BuildContext<'_>,
        indices: &[usize],
        feature_idx: usize,
    ) -> Option<SplitCandidate> {
        let x = ctx.x;
        let n = indices.len();

        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| {
            x[[a, feature_idx]]
                .partial_cmp(&x[[b, feature_idx]])
                .unwrap_or(Ordering::Equal)
        });

        let mut left = vec![0.0; ctx.n_classes];
        let mut right = ctx.class_weights(indices);
        let total_weight: f64 = right.iter().sum();
        let mut left_weight = 0.0;
        let mut best: Option<SplitCandidate> = None;

        for pos in 0..n.saturating_sub(1) {
            let i = order[pos];
            let wi = ctx.weights[i];
            left[ctx.y[i]] += wi;
            right[ctx.y[i]] -= wi;
            left_weight += wi;

            let value = x[[i, feature_idx]];
            let next = x[[order[pos + 1], feature_idx]];
            if next <= value {
                continue;
            }

            let n_left = pos + 1;
            if n_left < self.min_samples_leaf || n - n_left < self.min_samples_leaf {
                continue;
            }

            let right_weight = total_weight - left_weight;
            let child_impurity = left_weight * self.criterion.impurity(&left, left_weight)
                + right_weight * self.criterion.impurity(&right, right_weight);

            if best.map_or(true, |b| child_impurity < b.child_impurity) {
                let mid = (value + next) / 2.0;
                let threshold = if mid >= next { value } else { mid };
                best = Some(SplitCandidate {
                    feature_idx,
                    threshold,
                    child_impurity,
                });
            }
        }

        best
    }

    /// Class probabilities for each row, columns aligned with [`classes`](Self::classes)
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let root = self.root.as_ref().ok_or(ChurnError::ModelNotFitted)?;
        self.check_features(x)?;

        let n_classes = self.classes.len();
        let mut proba = Array2::zeros((x.nrows(), n_classes));
        for (i, row) in x.rows().into_iter().enumerate() {
            let distribution = Self::leaf_distribution(root, row);
            for (j, &p) in distribution.iter().enumerate() {
                proba[[i, j]] = p;
            }
        }
        Ok(proba)
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| self.classes[argmax(row)])
            .collect())
    }

    fn leaf_distribution<'a>(mut node: &'a TreeNode, sample: ArrayView1<'_, f64>) -> &'a [f64] {
        loop {
            match node {
                TreeNode::Leaf { distribution, .. } => return distribution,
                TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                    node = if sample[*feature_idx] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }

    fn check_features(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.n_features {
            return Err(ChurnError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Get tree depth (a single leaf has depth 0)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => count(left) + count(right),
            }
        }
        self.root.as_ref().map_or(0, count)
    }
}

/// Sorted distinct labels
pub(crate) fn unique_classes(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = y.iter().copied().collect();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup();
    classes
}

/// Map each label to its index in `classes`
pub(crate) fn encode_labels(y: &Array1<f64>, classes: &[f64]) -> Vec<usize> {
    y.iter()
        .map(|v| classes.iter().position(|c| c == v).unwrap_or_default())
        .collect()
}

/// Index of the largest value, first one on ties
pub(crate) fn argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (j, &p) in row.iter().enumerate() {
        if p > row[best] {
            best = j;
        }
    }
    best
}
