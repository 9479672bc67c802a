//! Dynamic-analysis delegation for race and deadlock detection.
//!
//! The detector observes a fundamentally different signal than the text
//! predicates (tool exit code, not log lines), so it lives behind its own
//! pluggable verifier seam and never touches the event extractor.

use crate::error::{OracleError, Result};
use crate::predicate::Verdict;
use crate::runner::{ProcessRunner, RunRequest, RunResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Pluggable external verifier with its own pass/fail contract.
#[async_trait]
pub trait Verifier: Send + Sync {
    /// Verifier name for reporting.
    fn name(&self) -> &str;

    /// Whether the backing tool can be invoked at all.
    async fn is_available(&self) -> bool;

    /// Run the subject under the tool, returning the verdict together with
    /// the captured detector run it was derived from.
    async fn verify(
        &self,
        subject: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<(Verdict, RunResult)>;
}

/// Runs the subject under a dynamic race/deadlock detector and treats the
/// combined invocation's exit code as the verdict.
pub struct RaceAudit {
    /// Tool command prefix; the subject and its arguments are appended.
    tool: Vec<String>,
}

impl RaceAudit {
    /// Exit code the detector is asked to use for detected errors, chosen to
    /// be distinguishable from the subject's own failure exits.
    const ERROR_EXIT_CODE: i32 = 66;

    /// Default detector: helgrind under valgrind.
    pub fn helgrind() -> Self {
        Self {
            tool: vec![
                "valgrind".to_string(),
                "--tool=helgrind".to_string(),
                format!("--error-exitcode={}", Self::ERROR_EXIT_CODE),
            ],
        }
    }

    /// Use a custom detector command prefix.
    pub fn with_tool(tool: Vec<String>) -> Self {
        Self { tool }
    }

    fn tool_binary(&self) -> PathBuf {
        PathBuf::from(self.tool.first().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Verifier for RaceAudit {
    fn name(&self) -> &str {
        "race-audit"
    }

    async fn is_available(&self) -> bool {
        let Ok(request) = RunRequest::new(
            self.tool_binary(),
            vec!["--version".to_string()],
            Duration::from_secs(10),
        ) else {
            return false;
        };
        ProcessRunner::run(&request).await.is_ok()
    }

    async fn verify(
        &self,
        subject: &Path,
        args: &[String],
        timeout: Duration,
    ) -> Result<(Verdict, RunResult)> {
        let mut combined: Vec<String> = self.tool.iter().skip(1).cloned().collect();
        combined.push(subject.display().to_string());
        combined.extend(args.iter().cloned());

        info!(
            tool = %self.tool_binary().display(),
            subject = %subject.display(),
            "Running race audit"
        );

        let request = RunRequest::new(self.tool_binary(), combined, timeout)?;
        let result = ProcessRunner::run(&request).await.map_err(|e| match e {
            // The missing binary here is the detector, not the subject.
            OracleError::SubjectUnavailable { path, .. } => {
                OracleError::ToolUnavailable { tool: path }
            }
            other => other,
        })?;

        let verdict = if result.timed_out {
            Verdict::fail(self.name(), "detector run did not finish within the timeout")
        } else if result.exit_code != 0 {
            Verdict::fail(
                self.name(),
                format!(
                    "detector exited with code {} (stderr tail: {})",
                    result.exit_code,
                    tail(&result.stderr, 200)
                ),
            )
        } else {
            Verdict::pass(self.name(), "detector reported no races or deadlocks")
        };

        Ok((verdict, result))
    }
}

/// Last `n` bytes of a string on a char boundary, for evidence snippets.
fn tail(text: &str, n: usize) -> &str {
    let trimmed = text.trim_end();
    if trimmed.len() <= n {
        return trimmed;
    }
    let mut start = trimmed.len() - n;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    &trimmed[start..]
}
