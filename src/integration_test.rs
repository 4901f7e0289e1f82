use std::sync::Arc;
use std::time::Duration;

use wiremock::{Mock, MockServer, ResponseTemplate, matchers::method};

use crate::config::{GraderSettings, ScorerSettings, ToolchainSettings};
use crate::core::domain::{
    ApiKey, GradeOutcome, ScoringConfiguration, ScoringStage, SubmissionRequest,
};
use crate::core::grader::Grader;
use crate::core::pipeline::grading::grade_batch;
use crate::native::{compiler::NativeCompiler, executor::NativeExecutor};
use crate::scorer::openai::OpenAiScorer;

const HELLO_WORLD: &str = include_str!("../testbins/hello_world/src/main.rs");
const SUM_INPUT: &str = include_str!("../testbins/sum_input/src/main.rs");
const SUM_REPORT: &str = include_str!("../testbins/sum_report/src/main.rs");
const MISSING_SEMICOLON: &str = include_str!("../testbins/missing_semicolon/src/main.rs");
const INFINITE_LOOP: &str = include_str!("../testbins/infinite_loop/src/main.rs");
const SPAWN_CHILDREN: &str = include_str!("../testbins/spawn_children/src/main.rs");
const RUNTIME_PANIC: &str = include_str!("../testbins/runtime_panic/src/main.rs");

const SUM_REPORT_OUTPUT: &str =
    "计算开始\n第一次计算: 15\n计算开始\n第二次计算: 35\n最终结果: 50";

fn native_grader(work_dir: &std::path::Path, scorer: ScorerSettings) -> Grader {
    let toolchains = ToolchainSettings {
        rustc_path: std::env::var("RUSTC_PATH")
            .unwrap_or_else(|_| "rustc".to_string())
            .into(),
        ..Default::default()
    };

    Grader::new(
        Arc::new(NativeCompiler::new(toolchains, Duration::from_secs(120))),
        Arc::new(NativeExecutor::default()),
        Arc::new(OpenAiScorer::new(&scorer).expect("Failed to create scorer")),
        work_dir,
    )
}

fn without_ai() -> ScoringConfiguration {
    ScoringConfiguration {
        enable_ai_scoring: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_hello_world_full_credit() {
    let work_dir = tempfile::tempdir().unwrap();
    let grader = native_grader(work_dir.path(), ScorerSettings::default());

    let request = SubmissionRequest::new(HELLO_WORLD, "", "hello, world!", without_ai());
    let result = grader.grade(&request).await;

    assert!(result.is_success, "{:#?}", result);
    assert_eq!(result.outcome, GradeOutcome::Accepted);
    assert!(result.compilation_result.is_success);
    assert!(result.compilation_result.compilation_time_ms > 0);
    assert_eq!(result.execution_result.output, "Hello, World!\n");
    assert_eq!(result.execution_result.exit_code, 0);
    assert!(result.output_matches);
    assert_eq!(result.final_score, 30.0);
    assert_eq!(std::fs::read_dir(work_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_program_input_is_fed() {
    let work_dir = tempfile::tempdir().unwrap();
    let grader = native_grader(work_dir.path(), ScorerSettings::default());

    let request = SubmissionRequest::new(SUM_INPUT, "1 2 3\n4\n", "10", without_ai());
    let result = grader.grade(&request).await;

    assert_eq!(result.outcome, GradeOutcome::Accepted, "{:#?}", result);
    assert_eq!(result.execution_result.output.trim(), "10");
}

#[tokio::test]
async fn test_multibyte_output_full_credit() {
    let work_dir = tempfile::tempdir().unwrap();
    let grader = native_grader(work_dir.path(), ScorerSettings::default());

    let request = SubmissionRequest::new(SUM_REPORT, "", SUM_REPORT_OUTPUT, without_ai());
    let result = grader.grade(&request).await;

    assert!(result.is_success, "{:#?}", result);
    assert!(result.output_matches);
    assert_eq!(result.execution_result.output.trim_end(), SUM_REPORT_OUTPUT);
    assert_eq!(result.final_score, result.total_score);
}

#[tokio::test]
async fn test_rejected_credential_awards_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401).set_body_string(
                r#"{"error": {"message": "Incorrect API key provided", "code": "invalid_api_key"}}"#,
            ),
        )
        .expect(1)
        .mount(&server)
        .await;

    let work_dir = tempfile::tempdir().unwrap();
    let grader = native_grader(
        work_dir.path(),
        ScorerSettings {
            base_url: server.uri(),
            request_timeout_secs: 10,
            ..Default::default()
        },
    );

    let request = SubmissionRequest::new(
        SUM_REPORT,
        "",
        SUM_REPORT_OUTPUT,
        ScoringConfiguration {
            ai_api_key: Some(ApiKey::new("sk-invalid")),
            ..Default::default()
        },
    );
    let result = grader.grade(&request).await;

    assert!(result.is_success, "{:#?}", result);
    assert_eq!(result.outcome, GradeOutcome::ScorerFallback);
    assert!(result.output_matches);
    assert!((result.final_score - 24.0).abs() < 1e-9);
    assert!(!result.ai_scoring_result.is_success);
    assert!(
        !result
            .ai_scoring_result
            .error_message
            .unwrap_or_default()
            .is_empty()
    );
}

#[tokio::test]
async fn test_compile_error_skips_execution() {
    let work_dir = tempfile::tempdir().unwrap();
    let grader = native_grader(work_dir.path(), ScorerSettings::default());

    let request = SubmissionRequest::new(
        MISSING_SEMICOLON,
        "",
        "42",
        ScoringConfiguration::default(),
    );
    let result = grader.grade(&request).await;

    assert!(result.is_success);
    assert_eq!(result.outcome, GradeOutcome::CompileError);
    assert_eq!(result.stage, ScoringStage::Completed);
    assert!(!result.compilation_result.errors.is_empty());
    assert_eq!(result.final_score, 0.0);
    // Never executed
    assert_eq!(result.execution_result.execution_time_ms, 0);
    assert_eq!(result.execution_result.output, "");
}

#[tokio::test]
async fn test_infinite_loop_times_out() {
    let work_dir = tempfile::tempdir().unwrap();
    let grader = native_grader(work_dir.path(), ScorerSettings::default());

    let request = SubmissionRequest::new(
        INFINITE_LOOP,
        "",
        "",
        ScoringConfiguration {
            execution_timeout_seconds: 1,
            ..without_ai()
        },
    );
    let result = grader.grade(&request).await;

    assert!(result.is_success, "{:#?}", result);
    assert_eq!(result.outcome, GradeOutcome::ExecutionTimeout);
    assert!(result.execution_result.is_timeout);
    assert!(result.execution_result.execution_time_ms >= 1000);
    assert!(result.execution_result.execution_time_ms < 3000);
    assert_eq!(result.final_score, 0.0);
}

fn is_alive(pid: u32) -> bool {
    // A zombie has already lost all of its resources; only its parent's wait
    // is missing.
    match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
        Ok(stat) => stat
            .rsplit_once(')')
            .map(|(_, rest)| !rest.trim_start().starts_with('Z'))
            .unwrap_or(true),
        Err(_) => false,
    }
}

#[tokio::test]
async fn test_timeout_kills_spawned_children() {
    let work_dir = tempfile::tempdir().unwrap();
    let grader = native_grader(work_dir.path(), ScorerSettings::default());

    let request = SubmissionRequest::new(
        SPAWN_CHILDREN,
        "",
        "",
        ScoringConfiguration {
            execution_timeout_seconds: 1,
            ..without_ai()
        },
    );
    let result = grader.grade(&request).await;

    assert_eq!(result.outcome, GradeOutcome::ExecutionTimeout, "{:#?}", result);
    let child_pid: u32 = result
        .execution_result
        .output
        .trim()
        .parse()
        .expect("program should print its child's pid before timing out");

    // Give init a moment to reap the orphan
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!is_alive(child_pid), "child {} survived the run", child_pid);
}

#[tokio::test]
async fn test_runtime_panic_is_execution_fault() {
    let work_dir = tempfile::tempdir().unwrap();
    let grader = native_grader(work_dir.path(), ScorerSettings::default());

    let request = SubmissionRequest::new(RUNTIME_PANIC, "", "partial output", without_ai());
    let result = grader.grade(&request).await;

    assert!(result.is_success);
    assert_eq!(result.outcome, GradeOutcome::ExecutionFault);
    assert_eq!(result.execution_result.exit_code, 101);
    assert!(result.execution_result.error_output.contains("no values to process"));
    assert_eq!(result.execution_result.output, "partial output\n");
    assert!(!result.output_matches);
    assert_eq!(result.final_score, 0.0);
}

#[tokio::test]
async fn test_concurrent_runs_stay_isolated() {
    let work_dir = tempfile::tempdir().unwrap();
    let grader = native_grader(work_dir.path(), ScorerSettings::default());

    let requests = vec![
        SubmissionRequest::new(HELLO_WORLD, "", "Hello, World!", without_ai()),
        SubmissionRequest::new(SUM_INPUT, "40 2", "42", without_ai()),
        SubmissionRequest::new(MISSING_SEMICOLON, "", "42", without_ai()),
        SubmissionRequest::new(SUM_INPUT, "1 1", "3", without_ai()),
    ];
    let results = grade_batch(&grader, &requests).await;

    let outcomes: Vec<_> = results.iter().map(|r| r.outcome).collect();
    assert_eq!(
        outcomes,
        vec![
            GradeOutcome::Accepted,
            GradeOutcome::Accepted,
            GradeOutcome::CompileError,
            GradeOutcome::OutputMismatch,
        ]
    );
    assert_eq!(std::fs::read_dir(work_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_grader_from_settings() {
    let work_dir = tempfile::tempdir().unwrap();
    let mut settings = GraderSettings {
        work_dir: work_dir.path().to_path_buf(),
        ..Default::default()
    };
    settings
        .apply_overrides(|key| match key {
            "RUSTC_PATH" => std::env::var("RUSTC_PATH").ok(),
            _ => None,
        })
        .unwrap();
    let grader = Grader::from_settings(&settings).unwrap();

    let request = SubmissionRequest::new(HELLO_WORLD, "", "Hello, World!", without_ai());
    let result = grader.grade(&request).await;

    assert_eq!(result.outcome, GradeOutcome::Accepted, "{:#?}", result);
}
