//! Subject process execution with bounded wait and output capture.

use crate::error::{OracleError, Result};
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Grace period for draining pipes after the child has exited or been
/// killed. A killed subject may leave grandchildren holding the write end
/// open; the drain is bounded so the runner itself never hangs.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// One subject invocation: binary, ordered arguments, and a wall-clock bound.
///
/// The timeout is always finite and strictly positive; a request without a
/// real bound is a configuration error, never an infinite wait.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Path to the subject binary.
    pub binary: PathBuf,

    /// Ordered argument strings passed through unchanged.
    pub args: Vec<String>,

    /// Wall-clock bound on the whole invocation.
    pub timeout: Duration,
}

impl RunRequest {
    /// Create a request, rejecting a zero timeout up front.
    pub fn new(binary: PathBuf, args: Vec<String>, timeout: Duration) -> Result<Self> {
        if timeout.is_zero() {
            return Err(OracleError::InvalidRequest(
                "timeout must be strictly positive".to_string(),
            ));
        }
        Ok(Self {
            binary,
            args,
            timeout,
        })
    }
}

/// Captured outcome of a subject invocation.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Exit code (-1 when unavailable, e.g. killed by signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Whether the process was forcibly terminated at the timeout.
    pub timed_out: bool,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// SHA-256 digest of the combined captured output.
    pub output_digest: String,
}

impl RunResult {
    /// Create a result and compute the output digest.
    pub fn new(
        exit_code: i32,
        stdout: String,
        stderr: String,
        timed_out: bool,
        duration_ms: u64,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(stdout.as_bytes());
        hasher.update(stderr.as_bytes());
        let output_digest = hex::encode(hasher.finalize());

        Self {
            exit_code,
            stdout,
            stderr,
            timed_out,
            duration_ms,
            output_digest,
        }
    }

    /// Whether the subject completed normally.
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Incrementally drain a pipe into a shared buffer so partial output
/// survives a forced kill.
fn drain_pipe<R>(mut pipe: R) -> (Arc<Mutex<Vec<u8>>>, JoinHandle<()>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = Arc::new(Mutex::new(Vec::new()));
    let task_buf = buf.clone();
    let task = tokio::spawn(async move {
        let mut chunk = [0u8; 4096];
        loop {
            match pipe.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => task_buf.lock().await.extend_from_slice(&chunk[..n]),
            }
        }
    });
    (buf, task)
}

/// Await a drain task, aborting it once the grace period elapses.
async fn finish_drain(buf: Arc<Mutex<Vec<u8>>>, mut task: JoinHandle<()>) -> Vec<u8> {
    if tokio::time::timeout(PIPE_DRAIN_GRACE, &mut task).await.is_err() {
        // Writer still open (orphaned grandchild); keep what we have.
        task.abort();
    }
    std::mem::take(&mut *buf.lock().await)
}

/// Runs the subject process and returns the complete captured result.
pub struct ProcessRunner;

impl ProcessRunner {
    /// Execute a request to completion or timeout, never leaving the child
    /// running on any exit path.
    ///
    /// A non-zero subject exit is valid data for the predicate engine, not an
    /// error. A missing or non-executable binary is a distinct fatal error.
    /// On timeout the child is killed and whatever output had been buffered
    /// is still returned with `timed_out = true`.
    pub async fn run(request: &RunRequest) -> Result<RunResult> {
        let start = Instant::now();

        let mut child = Command::new(&request.binary)
            .args(&request.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => {
                    OracleError::SubjectUnavailable {
                        path: request.binary.display().to_string(),
                        source: e,
                    }
                }
                _ => OracleError::Io(e),
            })?;

        // Drain both pipes concurrently with the wait so the subject can
        // never block on a full pipe.
        let stdout_pipe = child.stdout.take().ok_or_else(|| {
            OracleError::InvalidRequest("child stdout was not piped".to_string())
        })?;
        let stderr_pipe = child.stderr.take().ok_or_else(|| {
            OracleError::InvalidRequest("child stderr was not piped".to_string())
        })?;

        let (stdout_buf, stdout_task) = drain_pipe(stdout_pipe);
        let (stderr_buf, stderr_task) = drain_pipe(stderr_pipe);

        let status = match tokio::time::timeout(request.timeout, child.wait()).await {
            Ok(status) => Some(status?),
            Err(_) => {
                warn!(
                    binary = %request.binary.display(),
                    timeout_secs = request.timeout.as_secs(),
                    "Subject exceeded timeout, killing"
                );
                // kill() also reaps the child, so nothing is orphaned.
                child.kill().await?;
                None
            }
        };

        let stdout_bytes = finish_drain(stdout_buf, stdout_task).await;
        let stderr_bytes = finish_drain(stderr_buf, stderr_task).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let timed_out = status.is_none();
        let exit_code = status.and_then(|s| s.code()).unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&stdout_bytes).to_string();
        let stderr = String::from_utf8_lossy(&stderr_bytes).to_string();

        debug!(
            binary = %request.binary.display(),
            exit_code,
            timed_out,
            duration_ms,
            "Subject run complete"
        );

        Ok(RunResult::new(
            exit_code,
            stdout,
            stderr,
            timed_out,
            duration_ms,
        ))
    }
}
