use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use itertools::Itertools;
use tokio::sync::mpsc::Sender;

use crate::{
    config::GraderSettings,
    constants::RES_TX_ERR,
    core::{
        comparator::outputs_match,
        domain::{ExecutionResult, GradeOutcome, ScoringResult, ScoringStage, SubmissionRequest},
        errors::GradeError,
        scope::ArtifactScope,
        traits::{compiler::Compiler, runner::Runner, scorer::QualityScorer},
    },
    native::{compiler::NativeCompiler, executor::NativeExecutor},
    scorer::{ScorerError, openai::OpenAiScorer},
};

/// Drives one submission through compile, execute, compare and the optional
/// quality review. Always produces a complete `ScoringResult`.
#[derive(Clone, Debug)]
pub struct Grader {
    compiler: Arc<dyn Compiler>,
    runner: Arc<dyn Runner>,
    scorer: Arc<dyn QualityScorer>,
    work_dir: PathBuf,
}

impl Grader {
    pub fn new(
        compiler: Arc<dyn Compiler>,
        runner: Arc<dyn Runner>,
        scorer: Arc<dyn QualityScorer>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            compiler,
            runner,
            scorer,
            work_dir: work_dir.into(),
        }
    }

    /// Native toolchains, plain child processes and the HTTP quality delegate.
    pub fn from_settings(settings: &GraderSettings) -> Result<Self, ScorerError> {
        Ok(Self::new(
            Arc::new(NativeCompiler::from_settings(settings)),
            Arc::new(NativeExecutor::from_settings(settings)),
            Arc::new(OpenAiScorer::new(&settings.scorer)?),
            settings.work_dir.clone(),
        ))
    }

    pub async fn grade(&self, request: &SubmissionRequest) -> ScoringResult {
        self.grade_reporting(request, None).await
    }

    /// Like `grade`, but also sends a snapshot of the result to `progress` on
    /// every stage change and once more when the run is finished.
    #[tracing::instrument(skip_all, fields(language = %request.language))]
    pub async fn grade_reporting(
        &self,
        request: &SubmissionRequest,
        progress: Option<&Sender<ScoringResult>>,
    ) -> ScoringResult {
        let mut result = ScoringResult::started(&request.configuration);

        let run = AssertUnwindSafe(self.run_stages(request, &mut result, progress))
            .catch_unwind()
            .await;

        let fault = match run {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e),
            Err(payload) => Some(GradeError::Panicked {
                msg: panic_message(&*payload),
            }),
        };
        if let Some(e) = fault {
            tracing::error!(error = %e, stage = ?result.stage, "Internal grading fault");
            result.fail_internal(e.to_string());
        }

        result.finish();
        tracing::info!(
            outcome = ?result.outcome,
            final_score = result.final_score,
            "Grading finished"
        );
        report(progress, &result).await;

        result
    }

    async fn run_stages(
        &self,
        request: &SubmissionRequest,
        result: &mut ScoringResult,
        progress: Option<&Sender<ScoringResult>>,
    ) -> Result<(), GradeError> {
        let config = &request.configuration;
        config
            .validate()
            .map_err(|msg| GradeError::InvalidConfiguration { msg })?;

        let scope = ArtifactScope::create(&self.work_dir).await?;

        enter(result, ScoringStage::Compiling, progress).await;
        tracing::debug!("Start compiling");
        result.compilation_result = self
            .compiler
            .compile(&request.source_code, &request.language, &scope)
            .await;
        if !result.compilation_result.is_success {
            tracing::debug!(
                errors = %result.compilation_result.errors.iter().join("; "),
                "Compilation failed"
            );
            result.reject(GradeOutcome::CompileError, "compilation failed");
            return Ok(());
        }
        let artifact = result
            .compilation_result
            .artifact
            .clone()
            .ok_or(GradeError::MissingArtifact)?;

        enter(result, ScoringStage::Executing, progress).await;
        tracing::debug!(artifact = %artifact.id, "Start execution");
        result.execution_result = self
            .runner
            .run(
                &artifact,
                &request.program_input,
                Duration::from_secs(config.execution_timeout_seconds),
            )
            .await;
        if result.execution_result.is_timeout {
            result.reject(
                GradeOutcome::ExecutionTimeout,
                format!(
                    "execution timed out after {}s",
                    config.execution_timeout_seconds
                ),
            );
            return Ok(());
        }
        if !result.execution_result.is_success {
            let msg = execution_failure_message(&result.execution_result);
            result.reject(GradeOutcome::ExecutionFault, msg);
            return Ok(());
        }

        enter(result, ScoringStage::ComparingOutput, progress).await;
        result.output_matches = outputs_match(
            &result.execution_result.output,
            &request.expected_output,
            config.ignore_case,
            config.ignore_whitespace,
        );
        if !result.output_matches {
            result.reject(
                GradeOutcome::OutputMismatch,
                "output does not match expected output",
            );
            return Ok(());
        }

        if !config.enable_ai_scoring {
            result.complete(GradeOutcome::Accepted, config.max_ai_score, None);
            return Ok(());
        }

        enter(result, ScoringStage::AiScoring, progress).await;
        tracing::debug!(model = %config.ai_model_name, "Start quality scoring");
        let ai = self
            .scorer
            .score(
                &request.source_code,
                &result.execution_result.output,
                &request.expected_output,
                &request.language,
                config,
            )
            .await;

        if ai.is_success {
            result.complete(GradeOutcome::Accepted, ai.total_score, None);
        } else {
            let cause = ai.error_message.as_deref().unwrap_or("unknown error");
            tracing::warn!(error = cause, "Quality scoring failed, awarding fallback score");
            result.complete(
                GradeOutcome::ScorerFallback,
                config.fallback_score(),
                Some(format!("quality scoring failed; using fallback score: {}", cause)),
            );
        }
        result.ai_scoring_result = ai;

        Ok(())
    }
}

async fn enter(
    result: &mut ScoringResult,
    stage: ScoringStage,
    progress: Option<&Sender<ScoringResult>>,
) {
    result.change_stage(stage);
    report(progress, result).await;
}

async fn report(progress: Option<&Sender<ScoringResult>>, result: &ScoringResult) {
    if let Some(tx) = progress {
        if tx.send(result.clone()).await.is_err() {
            tracing::warn!("{}", RES_TX_ERR);
        }
    }
}

fn execution_failure_message(execution: &ExecutionResult) -> String {
    match &execution.exception_message {
        Some(msg) => format!("execution failed: {}", msg),
        None => format!("execution failed with exit code {}", execution.exit_code),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
