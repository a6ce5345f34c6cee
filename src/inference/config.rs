//! Predictor configuration

use serde::{Deserialize, Serialize};

/// Configuration for scoring students
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Contributing factors returned per prediction
    pub top_factors: usize,

    /// Number of parallel workers for batch scoring (rayon global pool when unset)
    pub n_workers: Option<usize>,

    /// Batches smaller than this are scored sequentially
    pub parallel_threshold: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            top_factors: 5,
            n_workers: None,
            parallel_threshold: 16,
        }
    }
}

impl PredictorConfig {
    /// Create a new predictor configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the number of contributing factors
    pub fn with_top_factors(mut self, n: usize) -> Self {
        self.top_factors = n;
        self
    }

    /// Builder method to set number of workers
    pub fn with_n_workers(mut self, n: usize) -> Self {
        self.n_workers = Some(n);
        self
    }

    /// Builder method to set the batch size at which scoring goes parallel
    pub fn with_parallel_threshold(mut self, n: usize) -> Self {
        self.parallel_threshold = n;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PredictorConfig::default();
        assert_eq!(config.top_factors, 5);
        assert!(config.n_workers.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PredictorConfig::new().with_top_factors(3).with_n_workers(2);
        assert_eq!(config.top_factors, 3);
        assert_eq!(config.n_workers, Some(2));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: PredictorConfig = serde_json::from_str(r#"{"top_factors": 2}"#).unwrap();
        assert_eq!(config.top_factors, 2);
        assert_eq!(config.parallel_threshold, 16);
    }
}
