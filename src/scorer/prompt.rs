use crate::{
    constants::{MAX_EFFICIENCY_SCORE, MAX_LOGIC_SCORE, MAX_REDUNDANCY_SCORE, MAX_STRUCTURE_SCORE},
    core::domain::Language,
};

/// Builds the single user message sent to the quality delegate.
pub fn build(
    source: &str,
    actual_output: &str,
    expected_output: &str,
    language: &Language,
    max_score: f64,
) -> String {
    let fence = language.code_fence();

    format!(
        r#"You are an expert {language} code reviewer. Grade the quality of the following {language} program (maximum {max_score} points).

Scoring rubric:
1. Logic and correctness (0-{MAX_LOGIC_SCORE}): is the logic clear and correct?
2. Redundancy (0-{MAX_REDUNDANCY_SCORE}): look for duplicated code, unnecessary variables and redundant logic.
3. Structure and readability (0-{MAX_STRUCTURE_SCORE}): organisation, naming, comments.
4. Efficiency (0-{MAX_EFFICIENCY_SCORE}): algorithmic efficiency and resource usage.

Source code:
```{fence}
{source}
```

Program output:
Actual output:
{actual_output}
Expected output:
{expected_output}

Respond with a single JSON object in exactly this format:
{{
  "score": <total score, 0-{max_score}>,
  "logicScore": <0-{MAX_LOGIC_SCORE}>,
  "redundancyScore": <0-{MAX_REDUNDANCY_SCORE}>,
  "structureScore": <0-{MAX_STRUCTURE_SCORE}>,
  "efficiencyScore": <0-{MAX_EFFICIENCY_SCORE}>,
  "issues": ["issue 1", "issue 2"],
  "suggestions": ["suggestion 1", "suggestion 2"],
  "detailedFeedback": "detailed explanation"
}}

Notes:
- Deduct heavily for serious redundancy or logic problems; severe cases may score 0 or close to 0.
- Point to the concrete location of every issue and give actionable suggestions."#
    )
}
