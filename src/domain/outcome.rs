//! Attempt and run outcome types.
//!
//! An [`AttemptOutcome`] lives for a single attempt; an [`EngineResult`] is
//! produced once per engine run and handed to the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::slot::Confirmation;

/// Outcome of a single acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Slot claimed - backend returned a confirmation
    Success(Confirmation),
    /// Healthy query, nothing matching right now
    NoAvailability,
    /// Retryable failure (backend down, slot taken between list and claim)
    TransientFailure(String),
    /// Retrying cannot help (bad credentials, lockout, malformed request)
    FatalFailure(String),
}

impl AttemptOutcome {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Success(_) => "success",
            AttemptOutcome::NoAvailability => "no_availability",
            AttemptOutcome::TransientFailure(_) => "transient_failure",
            AttemptOutcome::FatalFailure(_) => "fatal_failure",
        }
    }
}

/// Terminal status of an engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Booked,
    TimedOut,
    Aborted,
}

impl std::fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EngineStatus::Booked => "booked",
            EngineStatus::TimedOut => "timed_out",
            EngineStatus::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Structured result of one engine run. Owned by the caller once returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineResult {
    pub status: EngineStatus,
    /// Attempts made, whatever their outcome
    pub attempts_made: u32,
    /// Time spent in the run phase that produced this result
    pub elapsed: Duration,
    /// Present only when booked
    pub confirmation: Option<Confirmation>,
    /// Fatal failure or cancellation reason, verbatim
    pub reason: Option<String>,
}

impl EngineResult {
    pub fn booked(attempts_made: u32, elapsed: Duration, confirmation: Confirmation) -> Self {
        Self {
            status: EngineStatus::Booked,
            attempts_made,
            elapsed,
            confirmation: Some(confirmation),
            reason: None,
        }
    }

    pub fn timed_out(attempts_made: u32, elapsed: Duration) -> Self {
        Self {
            status: EngineStatus::TimedOut,
            attempts_made,
            elapsed,
            confirmation: None,
            reason: None,
        }
    }

    pub fn aborted(attempts_made: u32, elapsed: Duration, reason: impl Into<String>) -> Self {
        Self {
            status: EngineStatus::Aborted,
            attempts_made,
            elapsed,
            confirmation: None,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_outcome_labels() {
        assert_eq!(AttemptOutcome::NoAvailability.label(), "no_availability");
        assert_eq!(AttemptOutcome::TransientFailure("x".into()).label(), "transient_failure");
    }

    #[test]
    fn test_engine_status_serde() {
        assert_eq!(serde_json::to_string(&EngineStatus::TimedOut).unwrap(), "\"timed_out\"");
        let status: EngineStatus = serde_json::from_str("\"booked\"").unwrap();
        assert_eq!(status, EngineStatus::Booked);
        assert_eq!(EngineStatus::Aborted.to_string(), "aborted");
    }

    #[test]
    fn test_engine_result_constructors() {
        let booked = EngineResult::booked(2, Duration::from_secs(3), Confirmation::new("ok"));
        assert_eq!(booked.status, EngineStatus::Booked);
        assert_eq!(booked.confirmation, Some(Confirmation::new("ok")));
        assert!(booked.reason.is_none());

        let timed_out = EngineResult::timed_out(7, Duration::from_secs(60));
        assert_eq!(timed_out.status, EngineStatus::TimedOut);
        assert!(timed_out.confirmation.is_none());

        let aborted = EngineResult::aborted(1, Duration::ZERO, "invalid credentials");
        assert_eq!(aborted.status, EngineStatus::Aborted);
        assert_eq!(aborted.reason.as_deref(), Some("invalid credentials"));
    }
}
