use crate::core::domain::{AiScoringResult, Language, ScoringConfiguration};

#[mockall::automock]
#[async_trait::async_trait]
pub trait QualityScorer: std::fmt::Debug + Send + Sync {
    async fn score(
        &self,
        source: &str,
        actual_output: &str,
        expected_output: &str,
        language: &Language,
        configuration: &ScoringConfiguration,
    ) -> AiScoringResult;
}
