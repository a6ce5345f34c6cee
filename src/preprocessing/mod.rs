//! Data preprocessing module
//!
//! Provides the numeric preparation shared by training and inference:
//! - Categorical encoding (financial aid, parent education)
//! - Standard scaling with parameters learned at training time
//! - Schema enforcement between feature vectors and a fitted model

mod encoder;
mod scaler;

pub use encoder::{CategoricalEncoder, NO_AID, UNKNOWN_EDUCATION};
pub use scaler::{ScalerParams, StandardScaler};

use crate::error::{Result, RiskError};
use crate::features::{FeatureSchema, StudentFeatures};
use ndarray::{Array1, Array2};

/// Stateless facade tying schema checks to scaling
pub struct Preprocessor;

impl Preprocessor {
    /// Validate against `schema`, then standardize with the stored parameters.
    ///
    /// Fails with `SchemaMismatch` on any difference in names, order or
    /// length; columns are never realigned.
    pub fn transform(
        features: &StudentFeatures,
        params: &ScalerParams,
        schema: &FeatureSchema,
    ) -> Result<Array1<f64>> {
        schema.validate(features)?;
        if let Some((name, value)) = features.iter().find(|(_, v)| !v.is_finite()) {
            return Err(RiskError::ValidationError(format!(
                "feature '{}' is not finite ({})",
                name, value
            )));
        }

        let row = Array1::from_vec(features.values().to_vec());
        params.transform_row(row.view())
    }

    /// Stack validated feature vectors into a raw (unscaled) matrix
    pub fn to_matrix(rows: &[&StudentFeatures], schema: &FeatureSchema) -> Result<Array2<f64>> {
        let mut data = Vec::with_capacity(rows.len() * schema.len());
        for features in rows {
            schema.validate(features)?;
            data.extend_from_slice(features.values());
        }
        Ok(Array2::from_shape_vec((rows.len(), schema.len()), data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::N_FEATURES;

    fn params() -> ScalerParams {
        ScalerParams {
            mean: vec![1.0; N_FEATURES],
            scale: vec![2.0; N_FEATURES],
        }
    }

    #[test]
    fn test_transform_is_deterministic() {
        let features = StudentFeatures::canonical([3.0; N_FEATURES]);
        let schema = FeatureSchema::canonical();
        let a = Preprocessor::transform(&features, &params(), &schema).unwrap();
        let b = Preprocessor::transform(&features, &params(), &schema).unwrap();
        assert_eq!(a, b);
        assert!((a[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_thirteen_features_is_schema_mismatch() {
        let features = StudentFeatures::canonical([3.0; N_FEATURES]).without("gpa_trend");
        assert_eq!(features.len(), 13);
        let err = Preprocessor::transform(&features, &params(), &FeatureSchema::canonical())
            .unwrap_err();
        assert!(matches!(err, RiskError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut features = StudentFeatures::canonical([3.0; N_FEATURES]);
        features.set("gpa", f64::NAN);
        let err = Preprocessor::transform(&features, &params(), &FeatureSchema::canonical())
            .unwrap_err();
        assert!(matches!(err, RiskError::ValidationError(_)));
    }

    #[test]
    fn test_to_matrix() {
        let a = StudentFeatures::canonical([1.0; N_FEATURES]);
        let b = StudentFeatures::canonical([2.0; N_FEATURES]);
        let m = Preprocessor::to_matrix(&[&a, &b], &FeatureSchema::canonical()).unwrap();
        assert_eq!(m.dim(), (2, N_FEATURES));
        assert_eq!(m[[1, 0]], 2.0);
    }
}
