//! Evaluation metrics for the binary dropout classifier

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Default decision threshold on the positive-class probability
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Model evaluation metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy
    pub accuracy: f64,
    /// Precision of the dropout class
    pub precision: f64,
    /// Recall of the dropout class
    pub recall: f64,
    /// F1 score
    pub f1_score: f64,
    /// Area under the ROC curve (undefined when one class is absent)
    pub roc_auc: Option<f64>,
    /// Mean cross-validation accuracy
    pub cv_mean: Option<f64>,
    /// Standard deviation of cross-validation accuracy
    pub cv_std: Option<f64>,
    /// Number of evaluated samples
    pub n_samples: usize,
}

/// Confusion matrix counts for the positive class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t > 0.5, p > 0.5) {
                (true, true) => counts.true_positive += 1,
                (false, true) => counts.false_positive += 1,
                (false, false) => counts.true_negative += 1,
                (true, false) => counts.false_negative += 1,
            }
        }
        counts
    }
}

impl ModelMetrics {
    /// Compute classification metrics from positive-class probabilities
    pub fn compute_classification(y_true: &Array1<f64>, y_prob: &Array1<f64>, threshold: f64) -> Self {
        let n = y_true.len();
        if n == 0 {
            return Self::default();
        }

        let y_pred = y_prob.mapv(|p| if p >= threshold { 1.0 } else { 0.0 });
        let c = ConfusionCounts::from_predictions(y_true, &y_pred);

        let accuracy = (c.true_positive + c.true_negative) as f64 / n as f64;
        let precision = ratio(c.true_positive, c.true_positive + c.false_positive);
        let recall = ratio(c.true_positive, c.true_positive + c.false_negative);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            roc_auc: roc_auc(y_true, y_prob),
            cv_mean: None,
            cv_std: None,
            n_samples: n,
        }
    }

    /// Attach a cross-validation summary
    pub fn with_cross_validation(mut self, mean: f64, std: f64) -> Self {
        self.cv_mean = Some(mean);
        self.cv_std = Some(std);
        self
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

/// Fraction of correct predictions at the default threshold
pub fn accuracy(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_prob.iter())
        .filter(|(&t, &p)| (t > 0.5) == (p >= DECISION_THRESHOLD))
        .count();
    correct as f64 / y_true.len() as f64
}

/// Rank-based ROC AUC (Mann-Whitney U), averaging ranks over ties
pub fn roc_auc(y_true: &Array1<f64>, y_prob: &Array1<f64>) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..y_prob.len()).collect();
    order.sort_by(|&a, &b| {
        y_prob[a]
            .partial_cmp(&y_prob[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_prob[order[j + 1]] == y_prob[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; tied block i..=j shares the mean rank
        let mean_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if y_true[idx] > 0.5 {
                rank_sum_pos += mean_rank;
            }
        }
        i = j + 1;
    }

    let u = rank_sum_pos - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Some(u / (n_pos * n_neg) as f64)
}
