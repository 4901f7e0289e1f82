use std::time::Duration;

use crate::core::{
    domain::{AiScoringResult, Language, ScoringConfiguration},
    traits::scorer::QualityScorer,
};

#[derive(Debug, Clone)]
pub struct ScorerStub {
    result: AiScoringResult,
    delay: Duration,
}

impl ScorerStub {
    pub fn new(result: AiScoringResult, delay: Duration) -> Self {
        Self { result, delay }
    }
}

#[async_trait::async_trait]
impl QualityScorer for ScorerStub {
    #[tracing::instrument(skip_all)]
    async fn score(
        &self,
        _source: &str,
        _actual_output: &str,
        _expected_output: &str,
        _language: &Language,
        configuration: &ScoringConfiguration,
    ) -> AiScoringResult {
        tokio::time::sleep(self.delay).await;

        let mut result = self.result.clone();
        result.total_score = result.total_score.min(configuration.max_ai_score);
        tracing::debug!("Scoring result: {:?}", result);

        result
    }
}
