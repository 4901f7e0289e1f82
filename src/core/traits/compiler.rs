use crate::core::{
    domain::{CompilationResult, Language},
    scope::ArtifactScope,
};

#[mockall::automock]
#[async_trait::async_trait]
pub trait Compiler: std::fmt::Debug + Send + Sync {
    /// Builds `source` into an artifact inside `scope`. Ordinary compilation
    /// failures are reported through the returned result, never raised.
    async fn compile(
        &self,
        source: &str,
        language: &Language,
        scope: &ArtifactScope,
    ) -> CompilationResult;
}
