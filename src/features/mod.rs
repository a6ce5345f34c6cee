//! Feature engineering module
//!
//! Converts raw student records into the canonical, fixed-order numeric
//! feature vector consumed by training and inference:
//! - Structured student snapshot and history records
//! - Feature extraction with documented defaults for missing data
//! - Feature schema (ordered names) and its enforcement

mod extractor;
mod records;

pub use extractor::{FeatureExtractor, MissingAttendancePolicy};
pub use records::{
    AcademicRecord, AttendanceRecord, AttendanceStatus, BehavioralRecord, StudentHistory,
    StudentRecord,
};

use crate::error::{Result, RiskError};
use serde::{Deserialize, Serialize};

/// Canonical feature names, in model column order
pub const FEATURE_NAMES: [&str; 14] = [
    "gpa",
    "gpa_previous",
    "gpa_trend",
    "attendance_rate",
    "attendance_trend",
    "participation_score",
    "assignment_completion_rate",
    "credits_enrolled",
    "failed_courses_count",
    "disciplinary_incidents_count",
    "financial_aid",
    "parent_education_level",
    "motivation_score",
    "stress_level",
];

/// Number of canonical features
pub const N_FEATURES: usize = FEATURE_NAMES.len();

/// Ordered list of feature names a model was fitted against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// The canonical 14-feature schema
    pub fn canonical() -> Self {
        Self {
            names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Check that `features` carries exactly these columns in this order.
    ///
    /// Never reorders: a permutation of the right names is still a mismatch.
    pub fn validate(&self, features: &StudentFeatures) -> Result<()> {
        if features.names().len() != self.len() || features.values().len() != self.len() {
            return Err(RiskError::schema(
                format!("{} features", self.len()),
                format!(
                    "{} names and {} values",
                    features.names().len(),
                    features.values().len()
                ),
            ));
        }

        for (idx, (expected, actual)) in self.names.iter().zip(features.names()).enumerate() {
            if expected != actual {
                return Err(RiskError::schema(
                    format!("'{}' at position {}", expected, idx),
                    format!("'{}'", actual),
                ));
            }
        }

        Ok(())
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::canonical()
    }
}

/// Named, ordered feature values for one student at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFeatures")]
pub struct StudentFeatures {
    names: Vec<String>,
    values: Vec<f64>,
}

/// Wire form of [`StudentFeatures`], checked before it becomes one
#[derive(Deserialize)]
struct RawFeatures {
    names: Vec<String>,
    values: Vec<f64>,
}

impl TryFrom<RawFeatures> for StudentFeatures {
    type Error = RiskError;

    fn try_from(raw: RawFeatures) -> Result<Self> {
        Self::new(raw.names, raw.values)
    }
}

impl StudentFeatures {
    /// Build from parallel name and value lists of equal length
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if names.len() != values.len() {
            return Err(RiskError::schema(
                format!("{} values", names.len()),
                format!("{} values", values.len()),
            ));
        }
        Ok(Self { names, values })
    }

    /// Build from ordered (name, value) pairs
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let (names, values) = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .unzip();
        Self { names, values }
    }

    /// Build a canonical vector from values in [`FEATURE_NAMES`] order
    pub fn canonical(values: [f64; N_FEATURES]) -> Self {
        Self::from_pairs(FEATURE_NAMES.iter().copied().zip(values))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named feature
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|idx| self.values.get(idx).copied())
    }

    /// Overwrite a named feature, returning false when absent
    pub fn set(&mut self, name: &str, value: f64) -> bool {
        match self
            .names
            .iter()
            .position(|n| n == name)
            .and_then(|idx| self.values.get_mut(idx))
        {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Drop a named feature (mostly useful for building malformed inputs)
    pub fn without(mut self, name: &str) -> Self {
        if let Some(idx) = self.names.iter().position(|n| n == name) {
            self.names.remove(idx);
            self.values.remove(idx);
        }
        self
    }

    /// Iterate (name, value) pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}
