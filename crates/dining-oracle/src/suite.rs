//! Suite orchestration: catalog → runner → extractor → predicates → report.

use crate::error::{OracleError, Result};
use crate::event::EventExtractor;
use crate::predicate::{PredicateEngine, Verdict};
use crate::race::Verifier;
use crate::report::{ScenarioReport, SuiteReport};
use crate::runner::{ProcessRunner, RunRequest};
use crate::scenario::Scenario;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Timeout for the race-audit invocation; dynamic detectors slow the subject
/// down by an order of magnitude, so this is far above any scenario bound.
const RACE_AUDIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Drives scenarios against the subject binary, one subprocess per scenario.
pub struct Suite;

impl Suite {
    /// Run the given scenarios, up to `jobs` concurrently, and aggregate the
    /// verdicts.
    ///
    /// The subject is probed up front: a missing binary aborts before any
    /// scenario runs. Scenario-level failures, including timeouts, are
    /// isolated so one failing scenario never prevents evaluation of the
    /// rest.
    pub async fn run(subject: &Path, scenarios: Vec<Scenario>, jobs: usize) -> Result<SuiteReport> {
        let start = Instant::now();

        Self::probe_subject(subject).await?;

        let mut report = SuiteReport::new(subject.display().to_string());
        info!(run_id = %report.run_id, subject = %subject.display(), jobs, "Starting oracle suite");

        let extractor = Arc::new(EventExtractor::new());
        let subject = subject.to_path_buf();

        report.scenarios = stream::iter(scenarios.into_iter().map(|scenario| {
            let subject = subject.clone();
            let extractor = extractor.clone();
            async move { Self::run_scenario(&subject, scenario, &extractor).await }
        }))
        .buffered(jobs.max(1))
        .try_collect()
        .await?;

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %report.run_id,
            passed = report.passed_count(),
            failed = report.failed_count(),
            "Oracle suite complete"
        );
        Ok(report)
    }

    /// Run the subject under an external verifier and wrap its verdict as one
    /// more scenario report. No event extraction on this path.
    pub async fn race_audit(
        verifier: &dyn Verifier,
        subject: &Path,
        args: &[String],
    ) -> Result<ScenarioReport> {
        if !verifier.is_available().await {
            return Err(OracleError::ToolUnavailable {
                tool: verifier.name().to_string(),
            });
        }

        let (verdict, result) = verifier.verify(subject, args, RACE_AUDIT_TIMEOUT).await?;
        Ok(ScenarioReport {
            scenario: verifier.name().to_string(),
            verdicts: vec![verdict],
            duration_ms: result.duration_ms,
            output_digest: result.output_digest,
        })
    }

    /// One scenario: spawn, capture, extract, evaluate.
    async fn run_scenario(
        subject: &Path,
        scenario: Scenario,
        extractor: &EventExtractor,
    ) -> Result<ScenarioReport> {
        info!(scenario = %scenario.name, "Executing scenario");

        let request =
            RunRequest::new(subject.to_path_buf(), scenario.args(), scenario.timeout())?;
        let result = match ProcessRunner::run(&request).await {
            Ok(result) => result,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                // Scenario-local execution error: record and move on.
                return Ok(ScenarioReport {
                    scenario: scenario.name.clone(),
                    verdicts: vec![Verdict::fail("execution", e.to_string())],
                    duration_ms: 0,
                    output_digest: String::new(),
                });
            }
        };

        let stdout_events = extractor.extract(&result.stdout);
        let stderr_events = extractor.extract(&result.stderr);
        let verdicts =
            PredicateEngine::evaluate(&scenario, &result, &stdout_events, &stderr_events);

        Ok(ScenarioReport {
            scenario: scenario.name,
            verdicts,
            duration_ms: result.duration_ms,
            output_digest: result.output_digest,
        })
    }

    /// Fail fast, before any scenario, when the subject cannot be invoked.
    async fn probe_subject(subject: &Path) -> Result<()> {
        match tokio::fs::metadata(subject).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(OracleError::SubjectUnavailable {
                path: subject.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            }),
            Err(e) => Err(OracleError::SubjectUnavailable {
                path: subject.display().to_string(),
                source: e,
            }),
        }
    }
}
