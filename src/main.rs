use std::panic;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

use grader::config::GraderSettings;
use grader::core::domain::{ApiKey, ScoringConfiguration, SubmissionRequest};
use grader::core::grader::Grader;
use grader::core::pipeline::grading::grade_batch;

struct Sample {
    name: &'static str,
    source: &'static str,
    input: &'static str,
    expected: &'static str,
}

const SAMPLES: &[Sample] = &[
    Sample {
        name: "hello world",
        source: include_str!("../testbins/hello_world/src/main.rs"),
        input: "",
        expected: "Hello, World!",
    },
    Sample {
        name: "stdin echo",
        source: include_str!("../testbins/echo_stdin/src/main.rs"),
        input: "first line\nsecond line\n",
        expected: "first line\nsecond line",
    },
    Sample {
        name: "compile error",
        source: include_str!("../testbins/missing_semicolon/src/main.rs"),
        input: "",
        expected: "42",
    },
    Sample {
        name: "runtime fault",
        source: include_str!("../testbins/runtime_panic/src/main.rs"),
        input: "",
        expected: "partial output",
    },
    Sample {
        name: "wrong answer",
        source: include_str!("../testbins/sum_input/src/main.rs"),
        input: "2 2",
        expected: "5",
    },
];

#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
    set_panic_hook();

    let config_path = std::env::var_os("GRADER_CONFIG").map(PathBuf::from);
    let settings = GraderSettings::load(config_path.as_deref())?;
    tracing::info!(work_dir = %settings.work_dir.display(), "Settings loaded");

    let api_key = std::env::var("OPENAI_API_KEY").ok().map(ApiKey::new);
    let configuration = ScoringConfiguration {
        enable_ai_scoring: api_key.is_some(),
        ai_api_key: api_key,
        ..Default::default()
    };

    let grader = Grader::from_settings(&settings)?;
    let requests: Vec<_> = SAMPLES
        .iter()
        .map(|sample| {
            SubmissionRequest::new(
                sample.source,
                sample.input,
                sample.expected,
                configuration.clone(),
            )
        })
        .collect();

    let results = grade_batch(&grader, &requests).await;
    for (sample, result) in SAMPLES.iter().zip(&results) {
        tracing::info!(
            sample = sample.name,
            outcome = ?result.outcome,
            final_score = result.final_score,
            "Sample graded"
        );
        println!("== {} ==", sample.name);
        println!("{}", serde_json::to_string_pretty(result)?);
    }

    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
