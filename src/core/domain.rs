use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_AI_MODEL, DEFAULT_FALLBACK_SCORE_RATIO, DEFAULT_MAX_AI_SCORE};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    #[serde(default)]
    pub source_code: String,
    #[serde(default)]
    pub program_input: String,
    #[serde(default)]
    pub expected_output: String,
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub configuration: ScoringConfiguration,
}

impl SubmissionRequest {
    pub fn new(
        source_code: impl Into<String>,
        program_input: impl Into<String>,
        expected_output: impl Into<String>,
        configuration: ScoringConfiguration,
    ) -> Self {
        Self {
            source_code: source_code.into(),
            program_input: program_input.into(),
            expected_output: expected_output.into(),
            language: Language::default(),
            configuration,
        }
    }

    pub fn with_language(self, language: Language) -> Self {
        Self { language, ..self }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    Rust,
    GnuCpp,
    CSharp,
}

impl Language {
    pub fn source_file_name(&self) -> &'static str {
        match self {
            Language::Rust => "main.rs",
            Language::GnuCpp => "main.cpp",
            Language::CSharp => "main.cs",
        }
    }

    /// Fence tag used when the source is embedded into a prompt.
    pub fn code_fence(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::GnuCpp => "cpp",
            Language::CSharp => "csharp",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Rust => "Rust",
            Language::GnuCpp => "C++",
            Language::CSharp => "C#",
        };
        f.write_str(name)
    }
}

/// Credential for the quality delegate. Never printed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfiguration {
    pub execution_timeout_seconds: u64,
    pub enable_ai_scoring: bool,
    pub ai_api_key: Option<ApiKey>,
    pub ai_model_name: String,
    pub max_ai_score: f64,
    pub ignore_case: bool,
    pub ignore_whitespace: bool,
    /// Share of `max_ai_score` awarded when the quality delegate fails.
    pub fallback_score_ratio: f64,
}

impl Default for ScoringConfiguration {
    fn default() -> Self {
        Self {
            execution_timeout_seconds: 10,
            enable_ai_scoring: true,
            ai_api_key: None,
            ai_model_name: DEFAULT_AI_MODEL.to_string(),
            max_ai_score: DEFAULT_MAX_AI_SCORE,
            ignore_case: true,
            ignore_whitespace: true,
            fallback_score_ratio: DEFAULT_FALLBACK_SCORE_RATIO,
        }
    }
}

impl ScoringConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.execution_timeout_seconds == 0 {
            return Err("execution timeout must be at least one second".to_string());
        }
        if !self.max_ai_score.is_finite() || self.max_ai_score < 0.0 {
            return Err(format!(
                "max AI score must be a non-negative number, got {}",
                self.max_ai_score
            ));
        }
        if !(0.0..=1.0).contains(&self.fallback_score_ratio) {
            return Err(format!(
                "fallback score ratio must be within [0, 1], got {}",
                self.fallback_score_ratio
            ));
        }
        Ok(())
    }

    pub fn fallback_score(&self) -> f64 {
        self.max_ai_score * self.fallback_score_ratio
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: Uuid,
    pub language: Language,
    pub path: PathBuf,
    pub descriptor_path: PathBuf,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilationResult {
    pub is_success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub artifact: Option<Artifact>,
    pub compilation_time_ms: u64,
}

impl CompilationResult {
    /// A failure that is not a diagnostic of the submission itself.
    pub fn fault(msg: impl Into<String>) -> Self {
        Self {
            is_success: false,
            errors: vec![msg.into()],
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub is_success: bool,
    pub output: String,
    pub error_output: String,
    pub exit_code: i32,
    pub execution_time_ms: u64,
    pub is_timeout: bool,
    pub exception_message: Option<String>,
    pub output_truncated: bool,
}

impl ExecutionResult {
    pub fn launch_failure(msg: impl Into<String>) -> Self {
        Self {
            is_success: false,
            exit_code: -1,
            exception_message: Some(msg.into()),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiScoringResult {
    pub is_success: bool,
    pub total_score: f64,
    pub logic_score: f64,
    pub redundancy_score: f64,
    pub structure_score: f64,
    pub efficiency_score: f64,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub detailed_feedback: String,
    pub error_message: Option<String>,
}

impl AiScoringResult {
    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            is_success: false,
            error_message: Some(msg.into()),
            ..Default::default()
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringStage {
    #[default]
    Started,
    Compiling,
    Executing,
    ComparingOutput,
    AiScoring,
    Completed,
}

/// Why a run ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeOutcome {
    #[default]
    Pending,
    Accepted,
    CompileError,
    ExecutionTimeout,
    ExecutionFault,
    OutputMismatch,
    ScorerFallback,
    InternalFault,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub is_success: bool,
    pub stage: ScoringStage,
    pub outcome: GradeOutcome,
    pub compilation_result: CompilationResult,
    pub execution_result: ExecutionResult,
    pub output_matches: bool,
    pub ai_scoring_result: AiScoringResult,
    pub final_score: f64,
    pub total_score: f64,
    pub error_message: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ScoringResult {
    pub fn started(configuration: &ScoringConfiguration) -> Self {
        Self {
            is_success: false,
            stage: ScoringStage::Started,
            outcome: GradeOutcome::Pending,
            compilation_result: CompilationResult::default(),
            execution_result: ExecutionResult::default(),
            output_matches: false,
            ai_scoring_result: AiScoringResult::default(),
            final_score: 0.0,
            total_score: configuration.max_ai_score,
            error_message: None,
            start_time: Utc::now(),
            end_time: None,
        }
    }

    pub fn change_stage(&mut self, stage: ScoringStage) {
        self.stage = stage;
    }

    /// Ends the run normally with a zero score.
    pub fn reject(&mut self, outcome: GradeOutcome, msg: impl Into<String>) {
        self.complete(outcome, 0.0, Some(msg.into()));
    }

    pub fn complete(&mut self, outcome: GradeOutcome, final_score: f64, error: Option<String>) {
        self.is_success = true;
        self.outcome = outcome;
        self.final_score = final_score;
        self.error_message = error;
        self.stage = ScoringStage::Completed;
    }

    pub fn fail_internal(&mut self, msg: impl Into<String>) {
        self.is_success = false;
        self.outcome = GradeOutcome::InternalFault;
        self.final_score = 0.0;
        self.error_message = Some(msg.into());
        self.stage = ScoringStage::Completed;
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }
}
