use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::{Child, ChildStdin, Command},
    task::JoinHandle,
};

use crate::{
    config::GraderSettings,
    constants::{CHILD_LOCALE, DEFAULT_MAX_OUTPUT_BYTES},
    core::{
        domain::{Artifact, ExecutionResult},
        traits::runner::Runner,
    },
    native::{
        launch::{LaunchDescriptor, LaunchDescriptorError},
        process::{ProcessGroupGuard, exit_code, isolate_group, kill_tree},
    },
};

/// How long stream readers may take to drain after the process is gone.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
enum ExecutorError {
    #[error(transparent)]
    Descriptor(#[from] LaunchDescriptorError),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait for the process: {0}")]
    Wait(#[source] std::io::Error),
}

/// Terminal state of waiting on a child under a deadline.
#[derive(Debug)]
enum WaitOutcome {
    Completed(ExitStatus),
    TimedOut,
    Faulted(std::io::Error),
}

#[derive(Debug, Default)]
struct CapturedStream {
    bytes: Vec<u8>,
    truncated: bool,
}

impl CapturedStream {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Runs compiled artifacts as plain child processes in their own process
/// group. No namespaces or resource limits, only the wall-clock deadline.
#[derive(Clone, Debug)]
pub struct NativeExecutor {
    max_output_bytes: usize,
}

impl Default for NativeExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_OUTPUT_BYTES)
    }
}

impl NativeExecutor {
    pub fn new(max_output_bytes: usize) -> Self {
        Self { max_output_bytes }
    }

    pub fn from_settings(settings: &GraderSettings) -> Self {
        Self::new(settings.max_output_bytes)
    }

    async fn execute(
        &self,
        artifact: &Artifact,
        stdin: &str,
        timeout: Duration,
    ) -> Result<ExecutionResult, ExecutorError> {
        let descriptor = LaunchDescriptor::load(&artifact.descriptor_path).await?;

        let mut cmd = Command::new(&descriptor.program);
        cmd.args(&descriptor.args)
            .envs(&descriptor.env)
            .env("LANG", CHILD_LOCALE)
            .env("LC_ALL", CHILD_LOCALE)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = artifact.path.parent() {
            cmd.current_dir(dir);
        }
        isolate_group(&mut cmd);

        let mut child = cmd.spawn().map_err(|source| ExecutorError::Spawn {
            program: descriptor.program.display().to_string(),
            source,
        })?;
        let group = ProcessGroupGuard::new(child.id());
        tracing::debug!(pid = ?child.id(), "Process started");

        let stdout = spawn_capture(child.stdout.take(), self.max_output_bytes);
        let stderr = spawn_capture(child.stderr.take(), self.max_output_bytes);
        let feeder = tokio::spawn(feed_stdin(child.stdin.take(), stdin.to_owned()));

        let outcome = wait_with_deadline(&mut child, timeout).await;

        // Whatever happened, nothing of this run may outlive it. The pid is
        // only still known while the leader is unreaped.
        if let Some(pid) = child.id() {
            kill_tree(pid);
        }
        group.kill();
        if !matches!(outcome, WaitOutcome::Completed(_)) {
            if let Err(e) = child.kill().await {
                tracing::debug!(error = %e, "Process already gone");
            }
        }
        feeder.abort();

        let stdout = collect(stdout).await;
        let stderr = collect(stderr).await;
        let output_truncated = stdout.truncated || stderr.truncated;

        match outcome {
            WaitOutcome::Completed(status) => {
                let exit_code = exit_code(status);
                tracing::debug!(exit_code, "Process exited");
                Ok(ExecutionResult {
                    is_success: exit_code == 0,
                    output: stdout.text(),
                    error_output: stderr.text(),
                    exit_code,
                    execution_time_ms: 0,
                    is_timeout: false,
                    exception_message: None,
                    output_truncated,
                })
            }
            WaitOutcome::TimedOut => {
                tracing::info!(timeout = ?timeout, "Process timed out and was killed");
                Ok(ExecutionResult {
                    is_success: false,
                    output: stdout.text(),
                    error_output: stderr.text(),
                    exit_code: -1,
                    execution_time_ms: 0,
                    is_timeout: true,
                    exception_message: None,
                    output_truncated,
                })
            }
            WaitOutcome::Faulted(e) => Err(ExecutorError::Wait(e)),
        }
    }
}

#[async_trait::async_trait]
impl Runner for NativeExecutor {
    #[tracing::instrument(skip(self, stdin), fields(artifact = %artifact.id))]
    async fn run(&self, artifact: &Artifact, stdin: &str, timeout: Duration) -> ExecutionResult {
        let start_time = Instant::now();

        let mut result = match self.execute(artifact, stdin, timeout).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to execute artifact");
                ExecutionResult::launch_failure(e.to_string())
            }
        };
        result.execution_time_ms = start_time.elapsed().as_millis() as u64;

        result
    }
}

async fn wait_with_deadline(child: &mut Child, deadline: Duration) -> WaitOutcome {
    match tokio::time::timeout(deadline, child.wait()).await {
        Ok(Ok(status)) => WaitOutcome::Completed(status),
        Ok(Err(e)) => WaitOutcome::Faulted(e),
        Err(_) => WaitOutcome::TimedOut,
    }
}

/// Writes the whole input and closes the pipe so readers see EOF. A child
/// that exits without reading makes the write fail; that is not an error.
async fn feed_stdin(stdin: Option<ChildStdin>, input: String) {
    let Some(mut stdin) = stdin else {
        return;
    };

    if !input.is_empty() {
        if let Err(e) = stdin.write_all(input.as_bytes()).await {
            tracing::debug!(error = %e, "Child closed stdin early");
            return;
        }
        if let Err(e) = stdin.flush().await {
            tracing::debug!(error = %e, "Failed to flush child stdin");
        }
    }
    drop(stdin);
}

/// Bytes read from one stream so far. Shared with the reader task so a
/// reader that has to be abandoned still yields what it captured.
type SharedCapture = Arc<Mutex<CapturedStream>>;

#[derive(Debug)]
struct Capture {
    handle: JoinHandle<()>,
    buffer: SharedCapture,
}

fn spawn_capture<R>(stream: Option<R>, limit: usize) -> Option<Capture>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream.map(|stream| {
        let buffer = SharedCapture::default();
        let handle = tokio::spawn(capture(stream, limit, buffer.clone()));
        Capture { handle, buffer }
    })
}

/// Reads the stream to EOF, keeping at most `limit` bytes. The rest is
/// drained so the child never blocks on a full pipe.
async fn capture<R>(mut stream: R, limit: usize, buffer: SharedCapture)
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 8192];

    loop {
        match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                let mut captured = lock(&buffer);
                let room = limit.saturating_sub(captured.bytes.len());
                if n > room {
                    captured.truncated = true;
                }
                captured.bytes.extend_from_slice(&buf[..n.min(room)]);
            }
            Err(e) => {
                tracing::debug!(error = %e, "Output stream closed with error");
                break;
            }
        }
    }
}

fn lock(buffer: &SharedCapture) -> std::sync::MutexGuard<'_, CapturedStream> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn collect(capture: Option<Capture>) -> CapturedStream {
    let Some(Capture { mut handle, buffer }) = capture else {
        return CapturedStream::default();
    };

    match tokio::time::timeout(DRAIN_GRACE, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "Output reader failed"),
        Err(_) => {
            // Something outside the run still holds the pipe open.
            handle.abort();
            tracing::warn!("Output reader did not finish after the process exited");
        }
    }

    std::mem::take(&mut *lock(&buffer))
}
