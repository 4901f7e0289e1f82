//! External code-quality delegate: an OpenAI-compatible chat-completions
//! endpoint asked for a JSON verdict.

pub mod openai;
pub mod prompt;
pub mod response;

#[derive(Debug, thiserror::Error)]
pub enum ScorerError {
    #[error("AI scoring API key is not configured")]
    MissingApiKey,
    #[error("AI scoring request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("AI scoring endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("AI scoring response contained no completion")]
    EmptyCompletion,
    #[error("failed to parse AI scoring response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}
