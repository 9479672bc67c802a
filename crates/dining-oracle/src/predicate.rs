//! Predicate evaluation over extracted events and exit status.
//!
//! Each predicate is computed independently; a scenario passes when every
//! hard predicate passes. Soft predicates surface risk in the evidence
//! without flipping the verdict.

use crate::event::Event;
use crate::runner::RunResult;
use crate::scenario::{Expectation, LivenessLevel, RejectionField, Scenario};
use serde::Serialize;
use std::collections::BTreeSet;

/// Attempt count above which observed starvation is flagged as livelock risk.
pub const STARVATION_ATTEMPT_LIMIT: u32 = 10;

/// Verdict severity. Soft warnings never gate a suite; hard failures always do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Pass,
    SoftWarning,
    HardFail,
}

/// Outcome of one predicate for one scenario run.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// Predicate name.
    pub predicate: String,

    /// Outcome severity.
    pub severity: Severity,

    /// Human-readable evidence (matched/unmatched counts, offending indices).
    pub evidence: String,
}

impl Verdict {
    pub fn pass(predicate: &str, evidence: impl Into<String>) -> Self {
        Self {
            predicate: predicate.to_string(),
            severity: Severity::Pass,
            evidence: evidence.into(),
        }
    }

    pub fn soft(predicate: &str, evidence: impl Into<String>) -> Self {
        Self {
            predicate: predicate.to_string(),
            severity: Severity::SoftWarning,
            evidence: evidence.into(),
        }
    }

    pub fn fail(predicate: &str, evidence: impl Into<String>) -> Self {
        Self {
            predicate: predicate.to_string(),
            severity: Severity::HardFail,
            evidence: evidence.into(),
        }
    }

    pub fn is_hard_fail(&self) -> bool {
        self.severity == Severity::HardFail
    }
}

/// Evaluates correctness predicates for one scenario run.
///
/// Pure and synchronous: no predicate blocks, and evaluation is bounded by
/// input size.
pub struct PredicateEngine;

impl PredicateEngine {
    /// Evaluate all predicates relevant to the scenario's expectation.
    pub fn evaluate(
        scenario: &Scenario,
        result: &RunResult,
        stdout_events: &[Event],
        stderr_events: &[Event],
    ) -> Vec<Verdict> {
        let mut verdicts = Vec::new();

        if result.timed_out {
            verdicts.push(Verdict::fail(
                "timeout",
                format!(
                    "subject did not exit within {}s; forcibly terminated",
                    scenario.timeout_secs
                ),
            ));
        }

        match &scenario.expectation {
            Expectation::Success { liveness } => {
                verdicts.push(Self::clean_exit(result, stdout_events));
                verdicts.push(Self::safety(stdout_events));
                verdicts.push(Self::liveness(scenario, *liveness, stdout_events));
                verdicts.push(Self::starvation_risk(stdout_events));
                verdicts.push(Self::return_to_thinking(stdout_events));
            }
            Expectation::Rejection { field } => {
                verdicts.push(Self::input_validation(scenario, *field, result, stderr_events));
            }
            Expectation::ViolationSignal => {
                verdicts.push(Self::violation_signal(stdout_events));
            }
        }

        verdicts
    }

    /// Exit code 0 for a completed success run.
    fn clean_exit(result: &RunResult, stdout_events: &[Event]) -> Verdict {
        if result.timed_out {
            return Verdict::fail("clean-exit", "run was forcibly terminated at the timeout");
        }
        if result.exit_code != 0 {
            return Verdict::fail(
                "clean-exit",
                format!("expected exit code 0, got {}", result.exit_code),
            );
        }
        let banner = stdout_events
            .iter()
            .filter(|e| matches!(e, Event::StartupBanner))
            .count();
        Verdict::pass(
            "clean-exit",
            format!("exit code 0, {banner} banner line(s)"),
        )
    }

    /// Zero violation events across the whole run.
    fn safety(stdout_events: &[Event]) -> Verdict {
        let violations = stdout_events
            .iter()
            .filter(|e| matches!(e, Event::Violation))
            .count();
        if violations == 0 {
            Verdict::pass("safety", "no neighbor mutual-exclusion breach observed")
        } else {
            Verdict::fail(
                "safety",
                format!("{violations} violation event(s) observed"),
            )
        }
    }

    /// Forward-progress check, scaled to the scenario's liveness level.
    fn liveness(scenario: &Scenario, level: LivenessLevel, stdout_events: &[Event]) -> Verdict {
        let started: BTreeSet<u32> = stdout_events
            .iter()
            .filter_map(|e| match e {
                Event::StartedEating { actor } => Some(*actor),
                _ => None,
            })
            .collect();
        let stopped: BTreeSet<u32> = stdout_events
            .iter()
            .filter_map(|e| match e {
                Event::StoppedEating { actor } => Some(*actor),
                _ => None,
            })
            .collect();

        match level {
            LivenessLevel::PerActor => {
                let Some(count) = scenario.declared_actors() else {
                    return Verdict::fail(
                        "liveness",
                        "scenario declared no parseable actor count",
                    );
                };
                let missing: Vec<u32> = (0..count)
                    .filter(|i| !started.contains(i) || !stopped.contains(i))
                    .collect();
                if missing.is_empty() {
                    Verdict::pass(
                        "liveness",
                        format!("all {count} actors started and stopped eating"),
                    )
                } else {
                    Verdict::fail(
                        "liveness",
                        format!(
                            "{} of {count} actors never completed an eat cycle: {missing:?}",
                            missing.len()
                        ),
                    )
                }
            }
            LivenessLevel::MinimalRun => {
                let banner = stdout_events.iter().any(|e| matches!(e, Event::StartupBanner));
                if !banner {
                    Verdict::fail("liveness", "startup banner missing")
                } else if stopped.is_empty() {
                    Verdict::fail("liveness", "no actor stopped eating within the window")
                } else {
                    Verdict::pass(
                        "liveness",
                        format!("banner present, {} actor(s) stopped eating", stopped.len()),
                    )
                }
            }
            LivenessLevel::Sampling => {
                if started.is_empty() {
                    Verdict::fail("liveness", "no actor started eating at scale")
                } else {
                    Verdict::pass(
                        "liveness",
                        format!("{} distinct actor(s) started eating", started.len()),
                    )
                }
            }
        }
    }

    /// Soft bounded-starvation check. Recovery via forced-eat is a legitimate
    /// mitigation, so this never fails the run on its own.
    fn starvation_risk(stdout_events: &[Event]) -> Verdict {
        let mut over_limit: Vec<(u32, u32)> = Vec::new();
        let mut reports = 0usize;
        let mut forced = 0usize;
        for event in stdout_events {
            match event {
                Event::Starving { actor, attempts } => {
                    reports += 1;
                    if *attempts > STARVATION_ATTEMPT_LIMIT {
                        over_limit.push((*actor, *attempts));
                    }
                }
                Event::ForcedEat { .. } => forced += 1,
                _ => {}
            }
        }

        if over_limit.is_empty() {
            Verdict::pass(
                "starvation-risk",
                format!(
                    "{reports} starvation report(s), none above {STARVATION_ATTEMPT_LIMIT} attempts"
                ),
            )
        } else {
            Verdict::soft(
                "starvation-risk",
                format!(
                    "livelock risk: actors over {STARVATION_ATTEMPT_LIMIT} attempts: \
                     {over_limit:?} ({forced} forced-eat recoveries)"
                ),
            )
        }
    }

    /// Soft end-of-run check: every actor that ate should eventually report
    /// a thinking transition. The line is optional in the subject contract,
    /// so a subject that never emits it is not penalized.
    fn return_to_thinking(stdout_events: &[Event]) -> Verdict {
        let thinking: BTreeSet<u32> = stdout_events
            .iter()
            .filter_map(|e| match e {
                Event::Thinking { actor } => Some(*actor),
                _ => None,
            })
            .collect();
        if thinking.is_empty() {
            return Verdict::pass(
                "return-to-thinking",
                "subject reports no thinking transitions",
            );
        }

        let ate: BTreeSet<u32> = stdout_events
            .iter()
            .filter_map(|e| match e {
                Event::StartedEating { actor } => Some(*actor),
                _ => None,
            })
            .collect();
        let missing: Vec<u32> = ate.difference(&thinking).copied().collect();
        if missing.is_empty() {
            Verdict::pass(
                "return-to-thinking",
                format!("all {} eating actor(s) returned to thinking", ate.len()),
            )
        } else {
            Verdict::soft(
                "return-to-thinking",
                format!(
                    "{} of {} eating actor(s) never returned to thinking: {missing:?}",
                    missing.len(),
                    ate.len()
                ),
            )
        }
    }

    /// Non-zero exit plus the matching stderr diagnostic, both required.
    fn input_validation(
        scenario: &Scenario,
        field: RejectionField,
        result: &RunResult,
        stderr_events: &[Event],
    ) -> Verdict {
        let mut problems = Vec::new();

        if result.exit_code == 0 {
            problems.push("expected non-zero exit code, got 0".to_string());
        }

        match field {
            RejectionField::UnknownFlag => {
                if !stderr_events.iter().any(|e| matches!(e, Event::UsageError)) {
                    problems.push("no Usage: diagnostic on stderr".to_string());
                }
            }
            RejectionField::Duration | RejectionField::Philosophers => {
                let (want_field, want_raw) = match field {
                    RejectionField::Duration => ("duration", scenario.duration.as_deref()),
                    _ => ("philosophers", scenario.philosophers.as_deref()),
                };
                let matched = stderr_events.iter().any(|e| match e {
                    Event::ValidationError { field, raw } => {
                        field == want_field && Some(raw.as_str()) == want_raw
                    }
                    _ => false,
                });
                if !matched {
                    problems.push(format!(
                        "no Invalid {want_field} value diagnostic naming {want_raw:?} on stderr"
                    ));
                }
            }
        }

        if problems.is_empty() {
            Verdict::pass(
                "input-validation",
                format!("rejected with exit code {} and expected diagnostic", result.exit_code),
            )
        } else {
            Verdict::fail("input-validation", problems.join("; "))
        }
    }

    /// Deliberate violation injection must surface at least one marker.
    fn violation_signal(stdout_events: &[Event]) -> Verdict {
        let violations = stdout_events
            .iter()
            .filter(|e| matches!(e, Event::Violation))
            .count();
        if violations > 0 {
            Verdict::pass(
                "violation-signal",
                format!("{violations} violation marker(s) surfaced as requested"),
            )
        } else {
            Verdict::fail("violation-signal", "no violation marker despite injection")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::{catalog, Scenario};

    fn ok_result(stdout: &str, stderr: &str) -> RunResult {
        RunResult::new(0, stdout.to_string(), stderr.to_string(), false, 100)
    }

    fn events(text: &str) -> Vec<Event> {
        crate::event::EventExtractor::new().extract(text)
    }

    fn full_cycle_output(count: u32) -> String {
        let mut out = String::from("Starting Dining Philosophers simulation\n");
        for i in 0..count {
            out.push_str(&format!(
                "Philosopher {i} starts eating\nPhilosopher {i} stops eating\n"
            ));
        }
        out
    }

    #[test]
    fn test_success_scenario_all_predicates_pass() {
        let scenario = Scenario::success("normal_run", 3, 5, LivenessLevel::PerActor);
        let stdout = full_cycle_output(3);
        let result = ok_result(&stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(&stdout), &[]);
        assert!(verdicts.iter().all(|v| v.severity == Severity::Pass));
    }

    #[test]
    fn test_liveness_fails_on_missing_actor() {
        let scenario = Scenario::success("normal_run", 3, 5, LivenessLevel::PerActor);
        // Actor 2 never eats.
        let stdout = full_cycle_output(2);
        let result = ok_result(&stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(&stdout), &[]);
        let liveness = verdicts.iter().find(|v| v.predicate == "liveness").unwrap();
        assert!(liveness.is_hard_fail());
        assert!(liveness.evidence.contains('2'));
    }

    #[test]
    fn test_safety_fails_on_unexpected_violation() {
        let scenario = Scenario::success("normal_run", 1, 5, LivenessLevel::PerActor);
        let stdout = format!("{}VIOLATION detected\n", full_cycle_output(1));
        let result = ok_result(&stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(&stdout), &[]);
        let safety = verdicts.iter().find(|v| v.predicate == "safety").unwrap();
        assert!(safety.is_hard_fail());
    }

    #[test]
    fn test_minimal_run_accepts_banner_and_stop() {
        let scenario = Scenario::success("short_run", 5, 1, LivenessLevel::MinimalRun);
        let stdout = "Starting Dining Philosophers\nPhilosopher 1 stops eating\n";
        let result = ok_result(stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(stdout), &[]);
        let liveness = verdicts.iter().find(|v| v.predicate == "liveness").unwrap();
        assert_eq!(liveness.severity, Severity::Pass);
    }

    #[test]
    fn test_minimal_run_requires_banner() {
        let scenario = Scenario::success("short_run", 5, 1, LivenessLevel::MinimalRun);
        let stdout = "Philosopher 1 stops eating\n";
        let result = ok_result(stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(stdout), &[]);
        let liveness = verdicts.iter().find(|v| v.predicate == "liveness").unwrap();
        assert!(liveness.is_hard_fail());
    }

    #[test]
    fn test_sampling_liveness_needs_one_start() {
        let scenario = Scenario::success("scalability", 100, 3, LivenessLevel::Sampling);
        let stdout = "Starting Dining Philosophers\nPhilosopher 42 starts eating\n";
        let result = ok_result(stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(stdout), &[]);
        let liveness = verdicts.iter().find(|v| v.predicate == "liveness").unwrap();
        assert_eq!(liveness.severity, Severity::Pass);
    }

    #[test]
    fn test_starvation_above_limit_is_soft_not_hard() {
        let scenario = Scenario::success("starvation_watch", 1, 15, LivenessLevel::PerActor);
        let stdout = format!(
            "{}Philosopher 0 is starving! Attempts: 12\nPhilosopher 0 is being forced to eat\n",
            full_cycle_output(1)
        );
        let result = ok_result(&stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(&stdout), &[]);
        let starvation = verdicts
            .iter()
            .find(|v| v.predicate == "starvation-risk")
            .unwrap();
        assert_eq!(starvation.severity, Severity::SoftWarning);
        assert!(verdicts.iter().all(|v| !v.is_hard_fail()));
    }

    #[test]
    fn test_starvation_below_limit_passes() {
        let scenario = Scenario::success("starvation_watch", 1, 15, LivenessLevel::PerActor);
        let stdout = format!(
            "{}Philosopher 0 is starving! Attempts: 4\n",
            full_cycle_output(1)
        );
        let result = ok_result(&stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(&stdout), &[]);
        let starvation = verdicts
            .iter()
            .find(|v| v.predicate == "starvation-risk")
            .unwrap();
        assert_eq!(starvation.severity, Severity::Pass);
    }

    #[test]
    fn test_return_to_thinking_ignores_silent_subjects() {
        let scenario = Scenario::success("normal_run", 2, 5, LivenessLevel::PerActor);
        let stdout = full_cycle_output(2);
        let result = ok_result(&stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(&stdout), &[]);
        let thinking = verdicts
            .iter()
            .find(|v| v.predicate == "return-to-thinking")
            .unwrap();
        assert_eq!(thinking.severity, Severity::Pass);
    }

    #[test]
    fn test_return_to_thinking_passes_when_all_return() {
        let scenario = Scenario::success("normal_run", 2, 5, LivenessLevel::PerActor);
        let stdout = format!(
            "{}Philosopher 0 thinking\nPhilosopher 1 thinking\n",
            full_cycle_output(2)
        );
        let result = ok_result(&stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(&stdout), &[]);
        let thinking = verdicts
            .iter()
            .find(|v| v.predicate == "return-to-thinking")
            .unwrap();
        assert_eq!(thinking.severity, Severity::Pass);
    }

    #[test]
    fn test_return_to_thinking_warns_without_failing() {
        let scenario = Scenario::success("normal_run", 2, 5, LivenessLevel::PerActor);
        // Actor 1 ate but never reported a thinking transition.
        let stdout = format!("{}Philosopher 0 thinking\n", full_cycle_output(2));
        let result = ok_result(&stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(&stdout), &[]);
        let thinking = verdicts
            .iter()
            .find(|v| v.predicate == "return-to-thinking")
            .unwrap();
        assert_eq!(thinking.severity, Severity::SoftWarning);
        assert!(thinking.evidence.contains('1'));
        assert!(verdicts.iter().all(|v| !v.is_hard_fail()));
    }

    #[test]
    fn test_input_validation_requires_diagnostic_and_exit_code() {
        let scenario = Scenario::rejection(
            "bad_duration",
            Some("5"),
            Some("abc"),
            &[],
            RejectionField::Duration,
        );
        let stderr = "Invalid duration value: abc\n";

        // Both present: pass.
        let result = RunResult::new(1, String::new(), stderr.to_string(), false, 50);
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &[], &events(stderr));
        assert!(verdicts.iter().all(|v| !v.is_hard_fail()));

        // Diagnostic present but exit 0: fail.
        let result = RunResult::new(0, String::new(), stderr.to_string(), false, 50);
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &[], &events(stderr));
        assert!(verdicts.iter().any(|v| v.is_hard_fail()));

        // Non-zero exit but missing diagnostic: fail.
        let result = RunResult::new(1, String::new(), String::new(), false, 50);
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &[], &[]);
        assert!(verdicts.iter().any(|v| v.is_hard_fail()));
    }

    #[test]
    fn test_input_validation_checks_raw_value() {
        let scenario = Scenario::rejection(
            "bad_philosophers",
            Some("abc"),
            Some("5"),
            &[],
            RejectionField::Philosophers,
        );
        // Diagnostic names a different raw value than the one supplied.
        let stderr = "Invalid philosopher value: xyz\n";
        let result = RunResult::new(1, String::new(), stderr.to_string(), false, 50);
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &[], &events(stderr));
        assert!(verdicts.iter().any(|v| v.is_hard_fail()));
    }

    #[test]
    fn test_unknown_flag_requires_usage_line() {
        let scenario = Scenario::rejection(
            "unknown_flag",
            None,
            None,
            &["--frobnicate"],
            RejectionField::UnknownFlag,
        );
        let stderr = "Usage: ./diningPhilosophers [--philosophers N] [--duration SECONDS]\n";
        let result = RunResult::new(1, String::new(), stderr.to_string(), false, 50);
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &[], &events(stderr));
        assert!(verdicts.iter().all(|v| !v.is_hard_fail()));
    }

    #[test]
    fn test_violation_signal_requires_marker() {
        let scenario = Scenario::violation_injection("impose_violation", 5, 3);
        let stdout = "Philosopher 0 starts eating\nviolation imposed between 0 and 1\n";
        let result = ok_result(stdout, "");
        let verdicts = PredicateEngine::evaluate(&scenario, &result, &events(stdout), &[]);
        assert!(verdicts.iter().all(|v| !v.is_hard_fail()));

        let verdicts = PredicateEngine::evaluate(&scenario, &result, &[], &[]);
        assert!(verdicts.iter().any(|v| v.is_hard_fail()));
    }

    #[test]
    fn test_timeout_is_always_a_hard_failure() {
        let scenario = Scenario::success("normal_run", 3, 5, LivenessLevel::PerActor);
        let result = RunResult::new(-1, full_cycle_output(3), String::new(), true, 15000);
        let verdicts =
            PredicateEngine::evaluate(&scenario, &result, &events(&result.stdout), &[]);
        assert!(verdicts
            .iter()
            .any(|v| v.predicate == "timeout" && v.is_hard_fail()));
    }

    #[test]
    fn test_catalog_scenarios_evaluate_without_panicking() {
        let result = ok_result("", "");
        for scenario in catalog() {
            let _ = PredicateEngine::evaluate(&scenario, &result, &[], &[]);
        }
    }
}
