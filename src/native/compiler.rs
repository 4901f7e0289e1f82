use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use itertools::Itertools;
use tokio::{fs, process::Command, time::timeout};
use uuid::Uuid;

use crate::{
    config::{GraderSettings, ToolchainSettings},
    core::{
        domain::{Artifact, CompilationResult, Language},
        scope::ArtifactScope,
        traits::compiler::Compiler,
    },
    native::{
        diagnostics,
        launch::{LaunchDescriptor, LaunchDescriptorError},
        process::{ProcessGroupGuard, isolate_group},
    },
};

/// Build faults that are not the submission's fault.
#[derive(Debug, thiserror::Error)]
enum CompileFault {
    #[error("failed to prepare build directory: {0}")]
    Staging(#[source] std::io::Error),
    #[error("failed to start {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for the compiler: {0}")]
    Wait(#[source] std::io::Error),
    #[error("failed to persist artifact: {0}")]
    Persist(#[source] std::io::Error),
    #[error(transparent)]
    Descriptor(#[from] LaunchDescriptorError),
}

/// Compiles submissions with locally installed toolchains.
#[derive(Clone, Debug)]
pub struct NativeCompiler {
    toolchains: ToolchainSettings,
    timeout: Duration,
}

impl NativeCompiler {
    pub fn new(toolchains: ToolchainSettings, timeout: Duration) -> Self {
        Self {
            toolchains,
            timeout,
        }
    }

    pub fn from_settings(settings: &GraderSettings) -> Self {
        Self::new(settings.toolchains.clone(), settings.compile_timeout())
    }

    fn compiler_path(&self, language: &Language) -> &Path {
        match language {
            Language::Rust => &self.toolchains.rustc_path,
            Language::GnuCpp => &self.toolchains.gnucpp_path,
            Language::CSharp => &self.toolchains.mcs_path,
        }
    }

    /// The fixed flag and reference set of every language.
    fn command(&self, language: &Language, output_file: &str) -> Command {
        let source_file = language.source_file_name();
        let mut cmd = Command::new(self.compiler_path(language));

        match language {
            Language::Rust => {
                cmd.args(["--edition", "2021", "-O", "--crate-type", "bin"])
                    .args(["--crate-name", "submission"])
                    .args(["--error-format", "short", "--color", "never"])
                    .arg("-o")
                    .arg(output_file)
                    .arg(source_file);
            }
            Language::GnuCpp => {
                cmd.args(["-std=c++17", "-O2", "-fdiagnostics-color=never"])
                    .arg("-o")
                    .arg(output_file)
                    .arg(source_file);
            }
            Language::CSharp => {
                cmd.args(["-target:exe", "-optimize+", "-r:System.Core"])
                    .arg(format!("-out:{}", output_file))
                    .arg(source_file);
            }
        }

        cmd
    }

    fn launch_descriptor(&self, language: &Language, artifact_path: &Path) -> LaunchDescriptor {
        match language {
            Language::CSharp => LaunchDescriptor::hosted(&self.toolchains.mono_path, artifact_path),
            Language::Rust | Language::GnuCpp => LaunchDescriptor::native(artifact_path),
        }
    }

    async fn build(
        &self,
        source: &str,
        language: &Language,
        scope: &ArtifactScope,
    ) -> Result<CompilationResult, CompileFault> {
        let staging = scope.unique_path("build");
        fs::create_dir_all(&staging)
            .await
            .map_err(CompileFault::Staging)?;

        let result = self.build_in(&staging, source, language, scope).await;

        // Nothing from a build is kept except the persisted artifact.
        if let Err(e) = fs::remove_dir_all(&staging).await {
            tracing::warn!(staging = %staging.display(), error = %e, "Failed to remove build directory");
        }

        result
    }

    async fn build_in(
        &self,
        staging: &Path,
        source: &str,
        language: &Language,
        scope: &ArtifactScope,
    ) -> Result<CompilationResult, CompileFault> {
        fs::write(staging.join(language.source_file_name()), source)
            .await
            .map_err(CompileFault::Staging)?;

        let output_file = match language {
            Language::CSharp => "program.exe",
            Language::Rust | Language::GnuCpp => "program",
        };

        let mut cmd = self.command(language, output_file);
        cmd.current_dir(staging)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        isolate_group(&mut cmd);

        let child = cmd.spawn().map_err(|source| CompileFault::Spawn {
            program: self.compiler_path(language).to_path_buf(),
            source,
        })?;
        // Compiler drivers fork helpers (cc1plus, ld, ...); they go with it.
        let _group = ProcessGroupGuard::new(child.id());

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => output.map_err(CompileFault::Wait)?,
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "Compilation timed out");
                return Ok(CompilationResult {
                    is_success: false,
                    errors: vec![format!(
                        "compilation timed out after {} ms",
                        self.timeout.as_millis()
                    )],
                    ..Default::default()
                });
            }
        };

        // mcs reports on stdout, rustc and g++ on stderr.
        let report = [&output.stdout, &output.stderr]
            .into_iter()
            .map(|stream| String::from_utf8_lossy(stream))
            .filter(|text| !text.trim().is_empty())
            .join("\n");
        let diagnostics = diagnostics::parse(&report);

        if !output.status.success() {
            let mut errors = diagnostics.errors;
            if errors.is_empty() {
                let raw = report.trim();
                errors.push(if raw.is_empty() {
                    format!("compiler exited with {}", output.status)
                } else {
                    raw.to_string()
                });
            }
            return Ok(CompilationResult {
                is_success: false,
                errors,
                warnings: diagnostics.warnings,
                ..Default::default()
            });
        }

        let built = staging.join(output_file);
        if !fs::try_exists(&built).await.unwrap_or(false) {
            return Ok(CompilationResult {
                is_success: false,
                errors: vec![format!("compiler produced no executable at {}", output_file)],
                warnings: diagnostics.warnings,
                ..Default::default()
            });
        }

        let id = Uuid::new_v4();
        let artifact_path = scope.dir().join(match language {
            Language::CSharp => format!("submission_{}.exe", id.simple()),
            Language::Rust | Language::GnuCpp => format!("submission_{}", id.simple()),
        });
        fs::rename(&built, &artifact_path)
            .await
            .map_err(CompileFault::Persist)?;

        let descriptor_path = scope
            .dir()
            .join(format!("submission_{}.launch.json", id.simple()));
        self.launch_descriptor(language, &artifact_path)
            .save(&descriptor_path)
            .await?;

        Ok(CompilationResult {
            is_success: true,
            errors: Vec::new(),
            warnings: diagnostics.warnings,
            artifact: Some(Artifact {
                id,
                language: *language,
                path: artifact_path,
                descriptor_path,
            }),
            compilation_time_ms: 0,
        })
    }
}

#[async_trait::async_trait]
impl Compiler for NativeCompiler {
    #[tracing::instrument(skip(self, source, scope), fields(scope = %scope.dir().display()))]
    async fn compile(
        &self,
        source: &str,
        language: &Language,
        scope: &ArtifactScope,
    ) -> CompilationResult {
        let start_time = Instant::now();

        tracing::debug!("Start compiling");
        let mut result = match self.build(source, language, scope).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "Compiler fault");
                CompilationResult::fault(format!("compilation fault: {}", e))
            }
        };
        result.compilation_time_ms = start_time.elapsed().as_millis() as u64;
        tracing::debug!(
            is_success = result.is_success,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            compilation_time_ms = result.compilation_time_ms,
            "Compilation finished"
        );

        result
    }
}
