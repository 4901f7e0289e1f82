use serde::Deserialize;

use crate::{
    constants::{MAX_EFFICIENCY_SCORE, MAX_LOGIC_SCORE, MAX_REDUNDANCY_SCORE, MAX_STRUCTURE_SCORE},
    core::domain::AiScoringResult,
    scorer::ScorerError,
};

/// The JSON verdict requested from the delegate. All five scores are
/// required; a reply missing any of them is rejected as a whole.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResponse {
    pub score: f64,
    pub logic_score: f64,
    pub redundancy_score: f64,
    pub structure_score: f64,
    pub efficiency_score: f64,
    #[serde(default)]
    pub issues: Option<Vec<String>>,
    #[serde(default)]
    pub suggestions: Option<Vec<String>>,
    #[serde(default)]
    pub detailed_feedback: Option<String>,
}

impl ScoringResponse {
    /// Clamps every score into `[0, ceiling]`; the delegate is not trusted to
    /// respect the rubric.
    pub fn into_result(self, max_total: f64) -> AiScoringResult {
        AiScoringResult {
            is_success: true,
            total_score: clamp(self.score, max_total),
            logic_score: clamp(self.logic_score, MAX_LOGIC_SCORE),
            redundancy_score: clamp(self.redundancy_score, MAX_REDUNDANCY_SCORE),
            structure_score: clamp(self.structure_score, MAX_STRUCTURE_SCORE),
            efficiency_score: clamp(self.efficiency_score, MAX_EFFICIENCY_SCORE),
            issues: self.issues.unwrap_or_default(),
            suggestions: self.suggestions.unwrap_or_default(),
            detailed_feedback: self.detailed_feedback.unwrap_or_default(),
            error_message: None,
        }
    }
}

fn clamp(value: f64, ceiling: f64) -> f64 {
    value.max(0.0).min(ceiling)
}

/// Parses the completion text. Markdown code fences around the object are
/// tolerated, anything else that is not the expected object is an error.
pub fn parse(content: &str) -> Result<ScoringResponse, ScorerError> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    Ok(serde_json::from_str(body.trim())?)
}
