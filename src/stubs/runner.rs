use std::time::Duration;

use crate::core::{
    domain::{Artifact, ExecutionResult},
    traits::runner::Runner,
};

#[derive(Debug, Clone)]
pub struct RunnerStub {
    result: ExecutionResult,
    delay: Duration,
}

impl RunnerStub {
    pub fn new(result: ExecutionResult, delay: Duration) -> Self {
        Self { result, delay }
    }
}

#[async_trait::async_trait]
impl Runner for RunnerStub {
    #[tracing::instrument(skip(self, stdin))]
    async fn run(&self, artifact: &Artifact, stdin: &str, timeout: Duration) -> ExecutionResult {
        tracing::debug!(stdin_len = stdin.len(), "Start execution");

        if self.delay > timeout {
            tokio::time::sleep(timeout).await;
            return ExecutionResult {
                is_success: false,
                exit_code: -1,
                execution_time_ms: timeout.as_millis() as u64,
                is_timeout: true,
                ..Default::default()
            };
        }

        tokio::time::sleep(self.delay).await;
        tracing::debug!("Execution result: {:?}", self.result);

        self.result.clone()
    }
}
