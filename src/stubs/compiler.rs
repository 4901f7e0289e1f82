use std::time::Duration;

use uuid::Uuid;

use crate::core::{
    domain::{Artifact, CompilationResult, Language},
    scope::ArtifactScope,
    traits::compiler::Compiler,
};

#[derive(Debug, Clone)]
pub struct CompilerStub {
    result: CompilationResult,
    delay: Duration,
}

impl CompilerStub {
    /// `result.artifact` is ignored on success; a fresh one inside the run's
    /// scope is reported instead.
    pub fn new(result: CompilationResult, delay: Duration) -> Self {
        Self { result, delay }
    }

    pub fn succeeding(delay: Duration) -> Self {
        Self::new(
            CompilationResult {
                is_success: true,
                ..Default::default()
            },
            delay,
        )
    }
}

#[async_trait::async_trait]
impl Compiler for CompilerStub {
    #[tracing::instrument(skip(self, source, scope))]
    async fn compile(
        &self,
        source: &str,
        language: &Language,
        scope: &ArtifactScope,
    ) -> CompilationResult {
        tracing::debug!(source_len = source.len(), "Start compilation");
        tokio::time::sleep(self.delay).await;

        let mut result = self.result.clone();
        if result.is_success {
            let id = Uuid::new_v4();
            result.artifact = Some(Artifact {
                id,
                language: *language,
                path: scope.dir().join(format!("submission_{}", id.simple())),
                descriptor_path: scope
                    .dir()
                    .join(format!("submission_{}.launch.json", id.simple())),
            });
        }
        result.compilation_time_ms = self.delay.as_millis() as u64;
        tracing::debug!("Compilation result: {:?}", result);

        result
    }
}
