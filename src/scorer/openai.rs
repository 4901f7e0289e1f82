use serde::{Deserialize, Serialize};

use crate::{
    config::ScorerSettings,
    core::{
        domain::{AiScoringResult, ApiKey, Language, ScoringConfiguration},
        traits::scorer::QualityScorer,
    },
    scorer::{ScorerError, prompt, response},
};

/// Longest slice of an error body kept in messages.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Quality delegate backed by an OpenAI-compatible chat-completions API.
#[derive(Clone, Debug)]
pub struct OpenAiScorer {
    client: reqwest::Client,
    endpoint: String,
    temperature: f32,
}

impl OpenAiScorer {
    pub fn new(settings: &ScorerSettings) -> Result<Self, ScorerError> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            temperature: settings.temperature,
        })
    }

    async fn complete(&self, prompt: &str, api_key: &ApiKey, model: &str) -> Result<String, ScorerError> {
        let request = ChatCompletionRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key.expose())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(ScorerError::Status { status, body });
        }

        let completion: ChatCompletionResponse = serde_json::from_slice(&response.bytes().await?)?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ScorerError::EmptyCompletion)
    }

    async fn try_score(
        &self,
        source: &str,
        actual_output: &str,
        expected_output: &str,
        language: &Language,
        configuration: &ScoringConfiguration,
    ) -> Result<AiScoringResult, ScorerError> {
        let api_key = configuration
            .ai_api_key
            .as_ref()
            .filter(|key| !key.is_blank())
            .ok_or(ScorerError::MissingApiKey)?;

        let prompt = prompt::build(
            source,
            actual_output,
            expected_output,
            language,
            configuration.max_ai_score,
        );
        let content = self
            .complete(&prompt, api_key, &configuration.ai_model_name)
            .await?;
        tracing::debug!(content_len = content.len(), "Received AI scoring completion");

        Ok(response::parse(&content)?.into_result(configuration.max_ai_score))
    }
}

#[async_trait::async_trait]
impl QualityScorer for OpenAiScorer {
    #[tracing::instrument(skip_all, fields(model = %configuration.ai_model_name))]
    async fn score(
        &self,
        source: &str,
        actual_output: &str,
        expected_output: &str,
        language: &Language,
        configuration: &ScoringConfiguration,
    ) -> AiScoringResult {
        match self
            .try_score(source, actual_output, expected_output, language, configuration)
            .await
        {
            Ok(result) => {
                tracing::debug!(total_score = result.total_score, "AI scoring succeeded");
                result
            }
            Err(e) => {
                tracing::warn!(error = %e, "AI scoring failed");
                AiScoringResult::failure(e.to_string())
            }
        }
    }
}
