//! Standard (z-score) feature scaling

use crate::error::{Result, RiskError};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Fitted per-feature scaling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    /// Training-set mean per feature
    pub mean: Vec<f64>,
    /// Training-set standard deviation per feature (1.0 for constant columns)
    pub scale: Vec<f64>,
}

impl ScalerParams {
    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    /// Standardize one row: (x - mean) / scale
    pub fn transform_row(&self, row: ArrayView1<f64>) -> Result<Array1<f64>> {
        if row.len() != self.n_features() {
            return Err(RiskError::schema(
                format!("{} features", self.n_features()),
                format!("{} features", row.len()),
            ));
        }

        Ok(Array1::from_iter(
            row.iter()
                .zip(self.mean.iter().zip(self.scale.iter()))
                .map(|(&v, (&m, &s))| (v - m) / s),
        ))
    }

    /// Standardize every row of a matrix
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(RiskError::schema(
                format!("{} columns", self.n_features()),
                format!("{} columns", x.ncols()),
            ));
        }

        let mean = Array1::from_vec(self.mean.clone());
        let scale = Array1::from_vec(self.scale.clone());
        Ok((x - &mean.insert_axis(Axis(0))) / &scale.insert_axis(Axis(0)))
    }

    /// Standardized deviation of a single raw value from the training mean
    pub fn z_score(&self, feature_idx: usize, value: f64) -> f64 {
        (value - self.mean[feature_idx]) / self.scale[feature_idx]
    }
}

/// Standard scaler: learns mean and standard deviation at fit time only
#[derive(Debug, Clone, Default)]
pub struct StandardScaler;

impl StandardScaler {
    /// Learn per-column mean and population standard deviation
    pub fn fit(x: &Array2<f64>) -> Result<ScalerParams> {
        if x.nrows() == 0 {
            return Err(RiskError::InsufficientData(
                "cannot fit scaler on zero rows".to_string(),
            ));
        }

        let mean = x
            .mean_axis(Axis(0))
            .ok_or_else(|| RiskError::InsufficientData("empty matrix".to_string()))?;
        let std = x.std_axis(Axis(0), 0.0);

        Ok(ScalerParams {
            mean: mean.to_vec(),
            scale: std
                .iter()
                .map(|&s| if s == 0.0 || !s.is_finite() { 1.0 } else { s })
                .collect(),
        })
    }

    /// Fit and transform in one step
    pub fn fit_transform(x: &Array2<f64>) -> Result<(ScalerParams, Array2<f64>)> {
        let params = Self::fit(x)?;
        let scaled = params.transform(x)?;
        Ok((params, scaled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_standard_scaler() {
        let x = array![[1.0, 10.0], [2.0, 10.0], [3.0, 10.0], [4.0, 10.0], [5.0, 10.0]];
        let (params, scaled) = StandardScaler::fit_transform(&x).unwrap();

        let mean: f64 = scaled.column(0).mean().unwrap();
        assert!(mean.abs() < 1e-10); // Mean should be ~0
        assert!((params.mean[0] - 3.0).abs() < 1e-12);

        // Constant column keeps unit scale
        assert_eq!(params.scale[1], 1.0);
        assert!(scaled.column(1).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_transform_uses_stored_params() {
        let train = array![[0.0], [2.0]];
        let params = StandardScaler::fit(&train).unwrap();
        let other = array![[10.0], [20.0]];
        let scaled = params.transform(&other).unwrap();
        // mean 1, std 1 learned from train, not from `other`
        assert!((scaled[[0, 0]] - 9.0).abs() < 1e-12);
        assert!((scaled[[1, 0]] - 19.0).abs() < 1e-12);
    }

    #[test]
    fn test_row_width_mismatch() {
        let params = StandardScaler::fit(&array![[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let row = array![1.0];
        assert!(matches!(
            params.transform_row(row.view()),
            Err(RiskError::SchemaMismatch { .. })
        ));
    }
}
