use std::time::Duration;

use crate::core::domain::{Artifact, ExecutionResult};

#[mockall::automock]
#[async_trait::async_trait]
pub trait Runner: std::fmt::Debug + Send + Sync {
    /// Runs `artifact` with `stdin` as its input. The process and everything
    /// it spawned are gone by the time this returns.
    async fn run(&self, artifact: &Artifact, stdin: &str, timeout: Duration) -> ExecutionResult;
}
