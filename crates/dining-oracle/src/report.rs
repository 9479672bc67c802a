//! Verdict aggregation and rendering.

use crate::predicate::{Severity, Verdict};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use uuid::Uuid;

/// Verdicts for one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: String,

    /// Per-predicate verdicts, in evaluation order.
    pub verdicts: Vec<Verdict>,

    /// Subject run duration in milliseconds.
    pub duration_ms: u64,

    /// Digest of the captured output the verdicts were computed from.
    pub output_digest: String,
}

impl ScenarioReport {
    /// A scenario passes when no hard predicate failed. Soft warnings are
    /// surfaced but never gate.
    pub fn passed(&self) -> bool {
        !self.verdicts.iter().any(|v| v.is_hard_fail())
    }

    pub fn soft_warning_count(&self) -> usize {
        self.verdicts
            .iter()
            .filter(|v| v.severity == Severity::SoftWarning)
            .count()
    }
}

/// Aggregate result of a whole suite run.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    /// Suite run identifier.
    pub run_id: Uuid,

    /// When the suite started.
    pub started_at: DateTime<Utc>,

    /// Subject binary under test.
    pub subject: String,

    /// Per-scenario reports, in catalog order.
    pub scenarios: Vec<ScenarioReport>,

    /// Total suite duration in milliseconds.
    pub duration_ms: u64,
}

impl SuiteReport {
    pub fn new(subject: String) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            subject,
            scenarios: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Number of scenarios that passed.
    pub fn passed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.passed()).count()
    }

    /// Number of scenarios that failed.
    pub fn failed_count(&self) -> usize {
        self.scenarios.iter().filter(|s| !s.passed()).count()
    }

    /// Overall success: conjunction of hard predicates across all scenarios.
    pub fn success(&self) -> bool {
        self.failed_count() == 0
    }

    /// One line per predicate outcome per scenario, evidence on failure,
    /// final aggregate pass/fail.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "suite {} against {} ({} scenario(s))",
            self.run_id, self.subject, self.scenarios.len()
        );

        for report in &self.scenarios {
            let status = if report.passed() { "PASS" } else { "FAIL" };
            let _ = writeln!(out, "{status} {} ({} ms)", report.scenario, report.duration_ms);
            for verdict in &report.verdicts {
                let marker = match verdict.severity {
                    Severity::Pass => "ok  ",
                    Severity::SoftWarning => "warn",
                    Severity::HardFail => "FAIL",
                };
                let _ = writeln!(out, "  {marker} {}: {}", verdict.predicate, verdict.evidence);
            }
        }

        let _ = writeln!(
            out,
            "{}: {}/{} scenarios passed in {} ms",
            if self.success() { "PASS" } else { "FAIL" },
            self.passed_count(),
            self.scenarios.len(),
            self.duration_ms
        );
        out
    }

    /// Machine-readable rendering.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
