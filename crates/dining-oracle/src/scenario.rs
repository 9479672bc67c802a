//! Scenario declarations: input configurations plus expected outcome class.
//!
//! Scenarios are immutable data, never code. Each one is evaluated
//! independently; no scenario depends on the outcome of another.

use serde::Serialize;
use std::time::Duration;

/// Margin added on top of the declared run duration so a healthy subject is
/// never failed by its own timeout.
const TIMEOUT_MARGIN_SECS: u64 = 10;

/// Timeout for scenarios that are expected to be rejected immediately.
const REJECTION_TIMEOUT_SECS: u64 = 10;

/// How much liveness a success scenario demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessLevel {
    /// Every declared actor must both start and stop eating.
    PerActor,

    /// Duration ≈ 1: start may race the window's end, so require only the
    /// banner and at least one stop.
    MinimalRun,

    /// Large actor counts: at least one start is enough (sampling, not
    /// exhaustive, verification).
    Sampling,
}

/// Which input field a rejection scenario expects the subject to diagnose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionField {
    /// Unrecognized flag: `Usage:` on stderr.
    UnknownFlag,

    /// `Invalid duration value: <raw>` on stderr.
    Duration,

    /// `Invalid philosopher value: <raw>` on stderr.
    Philosophers,
}

/// Expected outcome class for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "expect", rename_all = "snake_case")]
pub enum Expectation {
    /// Normal completion: exit 0, safety and liveness predicates apply.
    Success { liveness: LivenessLevel },

    /// Invalid invocation: non-zero exit plus the matching stderr diagnostic.
    Rejection { field: RejectionField },

    /// Violation-injection mode: the run must surface a violation marker.
    ViolationSignal,
}

/// One declared input configuration for the subject.
///
/// Argument values are kept as raw strings because rejection scenarios
/// deliberately supply non-numeric or out-of-range text.
#[derive(Debug, Clone, Serialize)]
pub struct Scenario {
    /// Scenario name, unique within the catalog.
    pub name: String,

    /// Raw `--philosophers` argument, if passed.
    pub philosophers: Option<String>,

    /// Raw `--duration` argument, if passed.
    pub duration: Option<String>,

    /// Additional flags passed verbatim.
    pub extra_flags: Vec<String>,

    /// Per-scenario subprocess timeout in seconds.
    pub timeout_secs: u64,

    /// Expected outcome class.
    pub expectation: Expectation,
}

impl Scenario {
    /// A normal completed run.
    pub fn success(
        name: &str,
        philosophers: u32,
        duration_secs: u64,
        liveness: LivenessLevel,
    ) -> Self {
        Self {
            name: name.to_string(),
            philosophers: Some(philosophers.to_string()),
            duration: Some(duration_secs.to_string()),
            extra_flags: Vec::new(),
            timeout_secs: duration_secs + TIMEOUT_MARGIN_SECS,
            expectation: Expectation::Success { liveness },
        }
    }

    /// An invocation the subject must reject with a diagnostic.
    pub fn rejection(
        name: &str,
        philosophers: Option<&str>,
        duration: Option<&str>,
        extra_flags: &[&str],
        field: RejectionField,
    ) -> Self {
        Self {
            name: name.to_string(),
            philosophers: philosophers.map(str::to_string),
            duration: duration.map(str::to_string),
            extra_flags: extra_flags.iter().map(|f| f.to_string()).collect(),
            timeout_secs: REJECTION_TIMEOUT_SECS,
            expectation: Expectation::Rejection { field },
        }
    }

    /// A run with violation injection enabled.
    pub fn violation_injection(name: &str, philosophers: u32, duration_secs: u64) -> Self {
        Self {
            name: name.to_string(),
            philosophers: Some(philosophers.to_string()),
            duration: Some(duration_secs.to_string()),
            extra_flags: vec!["--impose-violation".to_string()],
            timeout_secs: duration_secs + TIMEOUT_MARGIN_SECS,
            expectation: Expectation::ViolationSignal,
        }
    }

    /// Command-line arguments for the subject invocation.
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(p) = &self.philosophers {
            args.push("--philosophers".to_string());
            args.push(p.clone());
        }
        if let Some(d) = &self.duration {
            args.push("--duration".to_string());
            args.push(d.clone());
        }
        args.extend(self.extra_flags.iter().cloned());
        args
    }

    /// The declared actor count, when it parses as a valid count.
    pub fn declared_actors(&self) -> Option<u32> {
        self.philosophers.as_deref().and_then(|p| p.parse().ok())
    }

    /// Subprocess timeout for this scenario.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The declared scenario set exercised by a full suite run.
///
/// Zero and negative actor counts are declared as rejection cases: the
/// subject must diagnose them, not silently substitute a default count.
pub fn catalog() -> Vec<Scenario> {
    vec![
        Scenario::success("normal_run", 5, 5, LivenessLevel::PerActor),
        Scenario::success("extended_run", 10, 10, LivenessLevel::PerActor),
        Scenario::success("short_run", 5, 1, LivenessLevel::MinimalRun),
        Scenario::success("single_philosopher", 1, 5, LivenessLevel::PerActor),
        Scenario::success("moderate_philosophers", 25, 10, LivenessLevel::PerActor),
        Scenario::success("starvation_watch", 5, 15, LivenessLevel::PerActor),
        Scenario::success("scalability", 100, 3, LivenessLevel::Sampling),
        Scenario::rejection(
            "unknown_flag",
            None,
            None,
            &["--frobnicate"],
            RejectionField::UnknownFlag,
        ),
        Scenario::rejection(
            "bad_duration",
            Some("5"),
            Some("abc"),
            &[],
            RejectionField::Duration,
        ),
        Scenario::rejection(
            "bad_philosophers",
            Some("abc"),
            Some("5"),
            &[],
            RejectionField::Philosophers,
        ),
        Scenario::rejection(
            "negative_philosophers",
            Some("-1"),
            Some("5"),
            &[],
            RejectionField::Philosophers,
        ),
        Scenario::rejection(
            "zero_philosophers",
            Some("0"),
            Some("5"),
            &[],
            RejectionField::Philosophers,
        ),
        Scenario::violation_injection("impose_violation", 5, 3),
    ]
}
