//! SMOTE oversampling

use crate::error::{Result, RiskError};
use crate::synthetic::{class_counts, class_indices, ResampleResult};
use ndarray::{Array1, Array2, ArrayView1};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Ordered float for BinaryHeap-based partial sort
#[derive(Debug, Clone, Copy)]
struct DistIdx(f64, usize);

impl PartialEq for DistIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for DistIdx {}
impl PartialOrd for DistIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .partial_cmp(&other.0)
            .unwrap_or(Ordering::Equal)
            .then(self.1.cmp(&other.1))
    }
}

/// SMOTE (Synthetic Minority Over-sampling Technique).
///
/// Grows every smaller class up to the majority count by interpolating
/// between a class sample and one of its k nearest same-class neighbors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SMOTE {
    /// Number of nearest neighbors
    k_neighbors: usize,
    /// Random seed
    seed: u64,
}

impl Default for SMOTE {
    fn default() -> Self {
        Self::new()
    }
}

impl SMOTE {
    /// Create new SMOTE sampler
    pub fn new() -> Self {
        Self {
            k_neighbors: 5,
            seed: 42,
        }
    }

    /// Set number of neighbors
    pub fn with_k_neighbors(mut self, k: usize) -> Self {
        self.k_neighbors = k.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    fn distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(ai, bi)| (ai - bi).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// k nearest same-class rows of `rows[point]`, excluding the point itself
    fn find_neighbors(x: &Array2<f64>, rows: &[usize], point: usize, k: usize) -> Vec<usize> {
        let mut heap: BinaryHeap<DistIdx> = BinaryHeap::with_capacity(k + 1);
        let origin = x.row(rows[point]);

        for (pos, &row) in rows.iter().enumerate() {
            if pos == point {
                continue;
            }
            let candidate = DistIdx(Self::distance(origin, x.row(row)), pos);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(top) = heap.peek() {
                if candidate < *top {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .map(|DistIdx(_, pos)| pos)
            .collect()
    }

    /// Oversample until every class matches the majority count
    pub fn fit_resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        if x.nrows() != y.len() {
            return Err(RiskError::schema(
                format!("{} labels", x.nrows()),
                format!("{} labels", y.len()),
            ));
        }

        let counts = class_counts(y);
        if counts.len() < 2 {
            return Err(RiskError::InsufficientData(
                "Need at least 2 classes for SMOTE".to_string(),
            ));
        }

        let max_count = counts.values().copied().max().unwrap_or(0);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let n_features = x.ncols();

        let mut synthetic_x: Vec<f64> = Vec::new();
        let mut synthetic_y: Vec<i64> = Vec::new();
        let mut n_synthetic = Vec::new();

        for (class, rows) in class_indices(y) {
            let n_to_generate = max_count - rows.len();
            n_synthetic.push((class, n_to_generate));
            if n_to_generate == 0 {
                continue;
            }

            let k = self.k_neighbors.min(rows.len().saturating_sub(1));
            let neighbors: Vec<Vec<usize>> = (0..rows.len())
                .map(|p| Self::find_neighbors(x, &rows, p, k))
                .collect();

            for _ in 0..n_to_generate {
                let pos = rng.gen_range(0..rows.len());
                let sample = x.row(rows[pos]);

                // A lone sample has no neighbor to interpolate towards
                if neighbors[pos].is_empty() {
                    synthetic_x.extend(sample.iter().copied());
                } else {
                    let nb = neighbors[pos][rng.gen_range(0..neighbors[pos].len())];
                    let neighbor = x.row(rows[nb]);
                    let gap: f64 = rng.gen();
                    synthetic_x.extend(
                        sample
                            .iter()
                            .zip(neighbor.iter())
                            .map(|(&p, &n)| p + gap * (n - p)),
                    );
                }
                synthetic_y.push(class);
            }
        }

        let n_original = x.nrows();
        let n_total = n_original + synthetic_y.len();
        let result_x = Array2::from_shape_fn((n_total, n_features), |(i, j)| {
            if i < n_original {
                x[[i, j]]
            } else {
                synthetic_x[(i - n_original) * n_features + j]
            }
        });

        let mut all_y: Vec<i64> = y.iter().copied().collect();
        all_y.extend_from_slice(&synthetic_y);

        Ok(ResampleResult {
            x: result_x,
            y: Array1::from_vec(all_y),
            n_synthetic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_imbalanced_data() -> (Array2<f64>, Array1<i64>) {
        // 20 majority around (0, 0), 5 minority around (10, 10)
        let mut data = Vec::new();
        let mut labels = Vec::new();

        for i in 0..20 {
            data.push((i % 5) as f64);
            data.push((i / 5) as f64);
            labels.push(0i64);
        }

        for i in 0..5 {
            data.push(10.0 + (i % 3) as f64);
            data.push(10.0 + (i / 3) as f64);
            labels.push(1i64);
        }

        let x = Array2::from_shape_vec((25, 2), data).unwrap();
        (x, Array1::from_vec(labels))
    }

    #[test]
    fn test_smote_balances_classes() {
        let (x, y) = create_imbalanced_data();
        let result = SMOTE::new().with_k_neighbors(3).with_seed(42).fit_resample(&x, &y).unwrap();

        let counts = class_counts(&result.y);
        assert_eq!(counts[&0], 20);
        assert_eq!(counts[&1], 20);
        assert_eq!(result.x.nrows(), 40);
        assert_eq!(result.n_synthetic, vec![(0, 0), (1, 15)]);
    }

    #[test]
    fn test_smote_preserves_original() {
        let (x, y) = create_imbalanced_data();
        let result = SMOTE::new().with_seed(42).fit_resample(&x, &y).unwrap();

        for i in 0..x.nrows() {
            for j in 0..x.ncols() {
                assert_eq!(result.x[[i, j]], x[[i, j]]);
            }
        }
    }

    #[test]
    fn test_synthetic_samples_stay_in_minority_hull() {
        let (x, y) = create_imbalanced_data();
        let result = SMOTE::new().with_seed(7).fit_resample(&x, &y).unwrap();

        for i in x.nrows()..result.x.nrows() {
            assert_eq!(result.y[i], 1);
            assert!(result.x[[i, 0]] >= 10.0 && result.x[[i, 0]] <= 12.0);
            assert!(result.x[[i, 1]] >= 10.0 && result.x[[i, 1]] <= 11.0);
        }
    }

    #[test]
    fn test_same_seed_same_output() {
        let (x, y) = create_imbalanced_data();
        let a = SMOTE::new().with_seed(3).fit_resample(&x, &y).unwrap();
        let b = SMOTE::new().with_seed(3).fit_resample(&x, &y).unwrap();
        assert_eq!(a.x, b.x);
    }

    #[test]
    fn test_single_minority_sample_is_replicated() {
        let x = Array2::from_shape_vec((4, 1), vec![0.0, 1.0, 2.0, 9.0]).unwrap();
        let y = Array1::from_vec(vec![0, 0, 0, 1]);
        let result = SMOTE::new().fit_resample(&x, &y).unwrap();
        assert_eq!(result.x.nrows(), 6);
        assert_eq!(result.x[[4, 0]], 9.0);
        assert_eq!(result.x[[5, 0]], 9.0);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = Array2::zeros((3, 2));
        let y = Array1::from_vec(vec![1, 1, 1]);
        assert!(matches!(
            SMOTE::new().fit_resample(&x, &y),
            Err(RiskError::InsufficientData(_))
        ));
    }
}
