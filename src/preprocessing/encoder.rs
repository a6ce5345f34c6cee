//! Categorical encoding for socioeconomic fields

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Code for an absent or unrecognized parent education level
pub const UNKNOWN_EDUCATION: f64 = 0.0;
/// Code for an absent or unrecognized financial-aid answer
pub const NO_AID: f64 = 0.0;

/// Fixed mapping from raw categories to numeric codes.
///
/// The mapping is chosen once, stored inside the trained model and reused at
/// inference. Values never seen in the mapping land in the fallback bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    financial_aid: BTreeMap<String, f64>,
    parent_education: BTreeMap<String, f64>,
    aid_fallback: f64,
    education_fallback: f64,
}

impl Default for CategoricalEncoder {
    fn default() -> Self {
        let financial_aid = [
            ("yes", 1.0),
            ("y", 1.0),
            ("true", 1.0),
            ("1", 1.0),
            ("aid", 1.0),
            ("recipient", 1.0),
            ("no", 0.0),
            ("n", 0.0),
            ("false", 0.0),
            ("0", 0.0),
            ("none", 0.0),
        ];

        // Ordinal: more formal education maps to a higher code
        let parent_education = [
            ("unknown", UNKNOWN_EDUCATION),
            ("none", 0.0),
            ("primary", 1.0),
            ("elementary", 1.0),
            ("high_school", 2.0),
            ("secondary", 2.0),
            ("some_college", 3.0),
            ("associate", 3.0),
            ("bachelor", 4.0),
            ("bachelors", 4.0),
            ("master", 5.0),
            ("masters", 5.0),
            ("doctorate", 6.0),
            ("phd", 6.0),
        ];

        Self {
            financial_aid: financial_aid
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            parent_education: parent_education
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
            aid_fallback: NO_AID,
            education_fallback: UNKNOWN_EDUCATION,
        }
    }
}

impl CategoricalEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowercase, trim, and fold spaces, dashes and apostrophes into `_`
    fn normalize(raw: &str) -> String {
        let folded: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| *c != '\'')
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        folded.trim_matches('_').to_string()
    }

    /// Encode a financial-aid answer (aid recipient = 1)
    pub fn encode_financial_aid(&self, raw: Option<&str>) -> f64 {
        raw.map(Self::normalize)
            .and_then(|key| self.financial_aid.get(&key).copied())
            .unwrap_or(self.aid_fallback)
    }

    /// Encode a parent education level on the ordinal scale
    pub fn encode_parent_education(&self, raw: Option<&str>) -> f64 {
        raw.map(Self::normalize)
            .and_then(|key| self.parent_education.get(&key).copied())
            .unwrap_or(self.education_fallback)
    }

    /// Whether the education value maps to a known level
    pub fn knows_education(&self, raw: &str) -> bool {
        self.parent_education.contains_key(&Self::normalize(raw))
    }
}
