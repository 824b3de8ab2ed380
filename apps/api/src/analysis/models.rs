use serde::{Deserialize, Serialize};

/// Structured outcome of one resume analysis.
///
/// Either the analytical fields are populated and `error` is `None`, or `error`
/// explains why they are empty. `raw_ai` only accompanies a parse failure.
/// `score` is passed through from the model unchecked; no 0–100 range is enforced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub score: i64,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub missing_qualifications: Vec<String>,
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_ai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResult {
    /// A result with every analytical field at its default and `error` set.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
