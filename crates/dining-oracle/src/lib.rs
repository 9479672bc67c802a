//! dining-oracle - Black-box correctness oracle for dining-philosophers
//! simulations
//!
//! Launches the subject binary with declared scenarios, captures its output
//! deterministically despite the subject's internal concurrency, and
//! evaluates safety, liveness, and robustness predicates purely from the
//! captured text and the exit status:
//! - Spawns one bounded subprocess per scenario (timeout-driven cancellation)
//! - Extracts typed events from the subject's log lines
//! - Distinguishes hard failures (mutual-exclusion breach, missing
//!   diagnostics) from soft starvation-risk warnings
//! - Optionally delegates race/deadlock detection to an external dynamic
//!   analyzer

pub mod error;
pub mod event;
pub mod predicate;
pub mod race;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod suite;
pub mod telemetry;

// Re-export key types
pub use error::{OracleError, Result};
pub use event::{Event, EventExtractor};
pub use predicate::{PredicateEngine, Severity, Verdict, STARVATION_ATTEMPT_LIMIT};
pub use race::{RaceAudit, Verifier};
pub use report::{ScenarioReport, SuiteReport};
pub use runner::{ProcessRunner, RunRequest, RunResult};
pub use scenario::{catalog, Expectation, LivenessLevel, RejectionField, Scenario};
pub use suite::Suite;
pub use telemetry::init_tracing;
