//! Weighted binary decision tree (Gini impurity)

use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2};
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Minimum impurity decrease accepted as a real split
const MIN_GAIN: f64 = 1e-12;

/// Decision tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with the weighted positive-class fraction
    Leaf { proba: f64, n_samples: usize },
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

/// Weighted class totals for a node: [negative, positive]
#[derive(Debug, Clone, Copy, Default)]
struct ClassWeights([f64; 2]);

impl ClassWeights {
    fn add(&mut self, label: f64, weight: f64) {
        self.0[usize::from(label > 0.5)] += weight;
    }

    fn sub(&mut self, label: f64, weight: f64) {
        self.0[usize::from(label > 0.5)] -= weight;
    }

    fn total(&self) -> f64 {
        self.0[0] + self.0[1]
    }

    fn gini(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        let p0 = self.0[0] / total;
        let p1 = self.0[1] / total;
        1.0 - p0 * p0 - p1 * p1
    }

    fn proba(&self) -> f64 {
        let total = self.total();
        if total <= 0.0 {
            0.5
        } else {
            self.0[1] / total
        }
    }

    fn is_pure(&self) -> bool {
        self.0[0] <= 0.0 || self.0[1] <= 0.0
    }
}

/// Decision tree classifier for labels in {0, 1}
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
    /// Features drawn per split (all when `None`)
    pub max_features: Option<usize>,
    /// Number of features
    n_features: usize,
    /// Normalized mean decrease in impurity
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
            n_features: 0,
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
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
        self
    }

    /// Fit the tree. `rng` drives per-split feature subsampling.
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: &Array1<f64>,
        rng: &mut ChaCha8Rng,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() || n_samples != sample_weight.len() {
            return Err(RiskError::schema(
                format!("{} labels and weights", n_samples),
                format!("{} labels, {} weights", y.len(), sample_weight.len()),
            ));
        }

        if n_samples < self.min_samples_split {
            return Err(RiskError::InsufficientData(format!(
                "Need at least {} samples, got {}",
                self.min_samples_split, n_samples
            )));
        }

        self.n_features = n_features;
        let mut importances = vec![0.0; n_features];

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, sample_weight, &indices, 0, &mut importances, rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn node_weights(y: &Array1<f64>, w: &Array1<f64>, indices: &[usize]) -> ClassWeights {
        let mut cw = ClassWeights::default();
        for &i in indices {
            cw.add(y[i], w[i]);
        }
        cw
    }

    #[allow(clippy::too_many_arguments)]
    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        w: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let weights = Self::node_weights(y, w, indices);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || weights.is_pure();

        if should_stop {
            return TreeNode::Leaf {
                proba: weights.proba(),
                n_samples,
            };
        }

        // Fall back to the undrawn features when the subset has no valid split
        let candidates = self.draw_features(x.ncols(), rng);
        let best = self
            .find_best_split(x, y, w, indices, &candidates, weights)
            .or_else(|| {
                let rest: Vec<usize> = (0..x.ncols()).filter(|f| !candidates.contains(f)).collect();
                self.find_best_split(x, y, w, indices, &rest, weights)
            });
        let Some((feature_idx, threshold, gain)) = best else {
            return TreeNode::Leaf {
                proba: weights.proba(),
                n_samples,
            };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, feature_idx]] <= threshold);

        // Mean decrease in impurity, weighted by the node's sample weight
        importances[feature_idx] += weights.total() * gain;

        let left = Box::new(self.build_tree(x, y, w, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, w, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
            impurity: weights.gini(),
        }
    }

    /// Sorted feature subset for one split
    fn draw_features(&self, n_features: usize, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < n_features => {
                let mut picked = index::sample(rng, n_features, k).into_vec();
                picked.sort_unstable();
                picked
            }
            _ => (0..n_features).collect(),
        }
    }

    /// Best (feature, threshold, gain) over the candidate features.
    ///
    /// Each feature is scanned once in sorted order, moving samples from the
    /// right partition to the left and updating class weights incrementally.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        w: &Array1<f64>,
        indices: &[usize],
        candidates: &[usize],
        parent: ClassWeights,
    ) -> Option<(usize, f64, f64)> {
        let parent_impurity = parent.gini();
        let total_weight = parent.total();
        let n = indices.len();

        let feature_results: Vec<Option<(usize, f64, f64)>> = candidates
            .par_iter()
            .map(|&feature_idx| {
                let mut order: Vec<usize> = indices.to_vec();
                order.sort_by(|&a, &b| {
                    x[[a, feature_idx]]
                        .partial_cmp(&x[[b, feature_idx]])
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                let mut left = ClassWeights::default();
                let mut right = parent;
                let mut best: Option<(f64, f64)> = None;

                for pos in 0..n - 1 {
                    let idx = order[pos];
                    left.add(y[idx], w[idx]);
                    right.sub(y[idx], w[idx]);

                    let current = x[[idx, feature_idx]];
                    let next = x[[order[pos + 1], feature_idx]];
                    if next <= current {
                        continue;
                    }

                    let n_left = pos + 1;
                    if n_left < self.min_samples_leaf || n - n_left < self.min_samples_leaf {
                        continue;
                    }

                    let weighted_child = (left.total() * left.gini()
                        + right.total() * right.gini())
                        / total_weight;
                    let gain = parent_impurity - weighted_child;

                    if gain > MIN_GAIN && best.map_or(true, |(g, _)| gain > g) {
                        best = Some((gain, (current + next) / 2.0));
                    }
                }

                best.map(|(gain, threshold)| (feature_idx, threshold, gain))
            })
            .collect();

        // First feature wins ties so results do not depend on scheduling
        feature_results
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<(usize, f64, f64)>, cand| match acc {
                Some(a) if a.2 >= cand.2 => Some(a),
                _ => Some(cand),
            })
    }

    /// Positive-class probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(RiskError::ModelNotTrained)?;
        if x.ncols() != self.n_features {
            return Err(RiskError::schema(
                format!("{} columns", self.n_features),
                format!("{} columns", x.ncols()),
            ));
        }

        Ok(Array1::from_iter(x.rows().into_iter().map(|row| {
            let mut node = root;
            loop {
                match node {
                    TreeNode::Leaf { proba, .. } => break *proba,
                    TreeNode::Split {
                        feature_idx,
                        threshold,
                        left,
                        right,
                        ..
                    } => {
                        node = if row[*feature_idx] <= *threshold {
                            left.as_ref()
                        } else {
                            right.as_ref()
                        };
                    }
                }
            }
        })))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth (a lone leaf has depth 0)
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }
}
