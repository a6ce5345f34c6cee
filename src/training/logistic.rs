//! Logistic regression fitted by gradient descent

use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Binary logistic regression with L2 penalty and per-sample weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Fitted coefficients
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept
    pub intercept: Option<f64>,
    /// Regularization strength (L2)
    pub alpha: f64,
    /// Maximum iterations
    pub max_iter: usize,
    /// Convergence tolerance on the gradient norm
    pub tol: f64,
    /// Learning rate
    pub learning_rate: f64,
    /// Iterations run by the last fit
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    /// Create a new logistic regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: None,
            alpha: 0.01,
            max_iter: 1000,
            tol: 1e-6,
            learning_rate: 0.1,
            n_iter: 0,
        }
    }

    /// Set regularization strength
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set learning rate
    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Numerically stable sigmoid
    fn sigmoid(v: f64) -> f64 {
        if v >= 0.0 {
            1.0 / (1.0 + (-v).exp())
        } else {
            let e = v.exp();
            e / (1.0 + e)
        }
    }

    /// Fit with weighted log-loss gradients
    pub fn fit(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        sample_weight: &Array1<f64>,
    ) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() || n_samples != sample_weight.len() {
            return Err(RiskError::schema(
                format!("{} labels and weights", n_samples),
                format!("{} labels, {} weights", y.len(), sample_weight.len()),
            ));
        }
        let weight_sum = sample_weight.sum();
        if n_samples == 0 || weight_sum <= 0.0 {
            return Err(RiskError::InsufficientData(
                "Logistic regression needs at least one weighted sample".to_string(),
            ));
        }

        let mut weights = Array1::<f64>::zeros(n_features);
        let mut bias = 0.0;

        let lr = self.learning_rate;
        let alpha = self.alpha;
        self.n_iter = self.max_iter;

        for iter in 0..self.max_iter {
            let linear = x.dot(&weights) + bias;
            let predictions = linear.mapv(Self::sigmoid);

            let errors = (&predictions - y) * sample_weight;
            let dw = (x.t().dot(&errors) / weight_sum) + (alpha * &weights);
            let db = errors.sum() / weight_sum;

            let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
            if grad_norm < self.tol {
                self.n_iter = iter;
                break;
            }

            weights = weights - lr * dw;
            bias -= lr * db;
        }

        self.coefficients = Some(weights);
        self.intercept = Some(bias);

        Ok(self)
    }

    /// Positive-class probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coefficients = self.coefficients.as_ref().ok_or(RiskError::ModelNotTrained)?;
        if x.ncols() != coefficients.len() {
            return Err(RiskError::schema(
                format!("{} columns", coefficients.len()),
                format!("{} columns", x.ncols()),
            ));
        }
        let intercept = self.intercept.unwrap_or(0.0);
        Ok((x.dot(coefficients) + intercept).mapv(Self::sigmoid))
    }

    /// Coefficient magnitudes normalized to sum to 1; uniform when all are zero
    pub fn feature_importances(&self) -> Option<Array1<f64>> {
        let coefficients = self.coefficients.as_ref()?;
        let magnitude = coefficients.mapv(f64::abs);
        let total = magnitude.sum();
        if total > 0.0 {
            Some(magnitude / total)
        } else if coefficients.is_empty() {
            Some(magnitude)
        } else {
            Some(Array1::from_elem(coefficients.len(), 1.0 / coefficients.len() as f64))
        }
    }

    /// Iterations run by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}
