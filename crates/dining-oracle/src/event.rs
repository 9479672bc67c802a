//! Typed events extracted from subject log lines.
//!
//! The subject's observable contract is a fixed catalog of line templates;
//! each template gets its own compiled recognizer so "what the subject says"
//! stays decoupled from "what it means" in the predicate engine.

use regex::Regex;
use serde::Serialize;

/// One structured fact derived from one line of captured subject output.
///
/// Events are ordered by line order in the captured stream; no wall-clock
/// timestamps are assumed reliable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// `Philosopher {i} starts eating`
    StartedEating { actor: u32 },

    /// `Philosopher {i} stops eating`
    StoppedEating { actor: u32 },

    /// `Philosopher {i} is starving! Attempts: {n}`
    Starving { actor: u32, attempts: u32 },

    /// `Philosopher {i} is being forced to eat`
    ForcedEat { actor: u32 },

    /// `Philosopher {i} thinking`
    Thinking { actor: u32 },

    /// Neighbor mutual-exclusion breach marker.
    Violation,

    /// `Usage:` diagnostic for an unrecognized flag.
    UsageError,

    /// `Invalid {field} value: {raw}` diagnostic.
    ValidationError { field: String, raw: String },

    /// Startup banner line.
    StartupBanner,
}

impl Event {
    /// Actor index carried by this event, when applicable.
    pub fn actor(&self) -> Option<u32> {
        match self {
            Event::StartedEating { actor }
            | Event::StoppedEating { actor }
            | Event::Starving { actor, .. }
            | Event::ForcedEat { actor }
            | Event::Thinking { actor } => Some(*actor),
            _ => None,
        }
    }
}

/// Line recognizers for the subject's output contract, one per event kind.
///
/// Matching is case-insensitive. Extraction is total and pure: a line that
/// matches no recognizer, or whose numeric capture fails to parse, is
/// dropped, never fabricated.
pub struct EventExtractor {
    starts: Regex,
    stops: Regex,
    starving: Regex,
    forced: Regex,
    thinking: Regex,
    banner: Regex,
    usage: Regex,
    bad_duration: Regex,
    bad_philosophers: Regex,
    violation: Regex,
}

impl EventExtractor {
    pub fn new() -> Self {
        // Hard-coded patterns; compilation cannot fail at runtime.
        let compile = |p: &str| Regex::new(p).expect("recognizer pattern compiles");
        Self {
            starts: compile(r"(?i)philosopher\s+(\d+)\s+starts eating"),
            stops: compile(r"(?i)philosopher\s+(\d+)\s+stops eating"),
            starving: compile(r"(?i)philosopher\s+(\d+)\s+is starving!\s*attempts:\s*(\d+)"),
            forced: compile(r"(?i)philosopher\s+(\d+)\s+is being forced to eat"),
            thinking: compile(r"(?i)philosopher\s+(\d+)\s+thinking"),
            banner: compile(r"(?i)starting dining philosophers"),
            usage: compile(r"(?i)usage:"),
            bad_duration: compile(r"(?i)invalid duration value:\s*(\S+)"),
            bad_philosophers: compile(r"(?i)invalid philosopher value:\s*(\S+)"),
            violation: compile(r"(?i)violation"),
        }
    }

    /// Extract the ordered event sequence from one captured stream.
    pub fn extract(&self, text: &str) -> Vec<Event> {
        text.lines().filter_map(|line| self.recognize(line)).collect()
    }

    /// Map one line to at most one event. Recognizers are tried most-specific
    /// first so the bare `violation` substring never shadows a richer match.
    fn recognize(&self, line: &str) -> Option<Event> {
        if let Some(caps) = self.starving.captures(line) {
            let actor = parse_capture(&caps, 1)?;
            let attempts = parse_capture(&caps, 2)?;
            return Some(Event::Starving { actor, attempts });
        }
        if let Some(caps) = self.starts.captures(line) {
            return Some(Event::StartedEating {
                actor: parse_capture(&caps, 1)?,
            });
        }
        if let Some(caps) = self.stops.captures(line) {
            return Some(Event::StoppedEating {
                actor: parse_capture(&caps, 1)?,
            });
        }
        if let Some(caps) = self.forced.captures(line) {
            return Some(Event::ForcedEat {
                actor: parse_capture(&caps, 1)?,
            });
        }
        if let Some(caps) = self.thinking.captures(line) {
            return Some(Event::Thinking {
                actor: parse_capture(&caps, 1)?,
            });
        }
        if self.banner.is_match(line) {
            return Some(Event::StartupBanner);
        }
        if let Some(caps) = self.bad_duration.captures(line) {
            return Some(Event::ValidationError {
                field: "duration".to_string(),
                raw: caps.get(1)?.as_str().to_string(),
            });
        }
        if let Some(caps) = self.bad_philosophers.captures(line) {
            return Some(Event::ValidationError {
                field: "philosophers".to_string(),
                raw: caps.get(1)?.as_str().to_string(),
            });
        }
        if self.usage.is_match(line) {
            return Some(Event::UsageError);
        }
        if self.violation.is_match(line) {
            return Some(Event::Violation);
        }
        None
    }
}

impl Default for EventExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one numeric capture group; overflow or absence skips the line.
fn parse_capture(caps: &regex::Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}
