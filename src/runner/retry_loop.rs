//! Fixed-interval retry loop.
//!
//! Repeats acquisition attempts strictly one at a time until a booking, a
//! fatal failure, cancellation or the deadline. The loop is an explicit state
//! machine driven by an injected [`Clock`], so tests run it without real delays.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::attempt::AcquisitionAttempt;
use crate::backend::Backend;
use crate::clock::{Clock, elapsed_between};
use crate::coordination::CancelToken;
use crate::domain::{AttemptOutcome, Confirmation, EngineResult, SlotPreference};

/// Reason recorded when a run is cancelled.
pub const CANCELLED_REASON: &str = "cancelled";

/// Retry loop state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopState {
    /// Between attempts
    Idle,
    /// An attempt is due
    Attempting,
    Succeeded(Confirmation),
    /// Deadline reached without a booking
    Exhausted,
    /// Fatal failure or cancellation
    Aborted(String),
}

/// Drives repeated attempts against one backend.
pub struct RetryLoop<C: Clock> {
    clock: Arc<C>,
    interval: Duration,
    attempt: AcquisitionAttempt,
}

impl<C: Clock> RetryLoop<C> {
    pub fn new(clock: Arc<C>, interval: Duration) -> Self {
        Self {
            clock,
            interval,
            attempt: AcquisitionAttempt::new(),
        }
    }

    /// Attempt until booked, aborted or `deadline` passes.
    ///
    /// Attempts are counted whatever their outcome. Cancellation is honoured
    /// before each attempt and during the pause between attempts; an attempt
    /// already in flight always runs to completion.
    pub async fn run<B>(
        &self,
        backend: &B,
        preference: &SlotPreference,
        deadline: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult
    where
        B: Backend + ?Sized,
    {
        let started = self.clock.now();
        let mut attempts_made: u32 = 0;
        let mut state = LoopState::Idle;

        tracing::info!(
            deadline = %deadline,
            interval_ms = self.interval.as_millis() as u64,
            preference = %preference,
            "Retry loop started"
        );

        let result = loop {
            state = match state {
                LoopState::Idle if cancel.is_cancelled() => {
                    LoopState::Aborted(CANCELLED_REASON.to_string())
                }
                LoopState::Idle => LoopState::Attempting,
                LoopState::Attempting => {
                    attempts_made += 1;
                    let outcome = self.attempt.attempt(backend, preference).await;
                    tracing::debug!(attempt = attempts_made, outcome = outcome.label(), "Attempt finished");
                    self.next_state(outcome, deadline, cancel).await
                }
                LoopState::Succeeded(confirmation) => {
                    break EngineResult::booked(attempts_made, self.elapsed_since(started), confirmation);
                }
                LoopState::Exhausted => {
                    break EngineResult::timed_out(attempts_made, self.elapsed_since(started));
                }
                LoopState::Aborted(reason) => {
                    break EngineResult::aborted(attempts_made, self.elapsed_since(started), reason);
                }
            };
        };

        tracing::info!(
            status = %result.status,
            attempts = result.attempts_made,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Retry loop finished"
        );
        result
    }

    fn elapsed_since(&self, started: DateTime<Utc>) -> Duration {
        elapsed_between(started, self.clock.now())
    }

    async fn next_state(
        &self,
        outcome: AttemptOutcome,
        deadline: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> LoopState {
        match outcome {
            AttemptOutcome::Success(confirmation) => LoopState::Succeeded(confirmation),
            AttemptOutcome::FatalFailure(reason) => LoopState::Aborted(reason),
            AttemptOutcome::NoAvailability | AttemptOutcome::TransientFailure(_) => {
                if self.clock.now() >= deadline {
                    return LoopState::Exhausted;
                }
                tokio::select! {
                    _ = self.clock.sleep(self.interval) => {}
                    _ = cancel.cancelled() => {}
                }
                LoopState::Idle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ClaimStep, ListStep, ScriptedBackend};
    use crate::clock::{ManualClock, add_duration};
    use crate::domain::{CandidateSlot, DateRange, EngineStatus};
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 1, 14, 0, 0).unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 9).unwrap()
    }

    fn preference() -> SlotPreference {
        SlotPreference::new(
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            2,
            DateRange::single(day()),
        )
        .unwrap()
    }

    fn matching_slot() -> CandidateSlot {
        CandidateSlot::new("tee-0900", day().and_hms_opt(9, 0, 0).unwrap(), 4)
    }

    fn retry_loop(clock: &Arc<ManualClock>, interval_secs: u64) -> RetryLoop<ManualClock> {
        RetryLoop::new(clock.clone(), Duration::from_secs(interval_secs))
    }

    #[tokio::test]
    async fn test_times_out_when_nothing_ever_available() {
        let clock = Arc::new(ManualClock::new(start()));
        let backend = ScriptedBackend::new();
        let deadline = add_duration(start(), Duration::from_secs(60));

        let result = retry_loop(&clock, 10)
            .run(&backend, &preference(), deadline, &CancelToken::new())
            .await;

        assert_eq!(result.status, EngineStatus::TimedOut);
        assert!((5..=7).contains(&result.attempts_made), "attempts {}", result.attempts_made);
        assert!(result.elapsed <= Duration::from_secs(70));
    }

    #[tokio::test]
    async fn test_ends_within_deadline_plus_interval() {
        let clock = Arc::new(ManualClock::new(start()));
        let backend = ScriptedBackend::new();
        let deadline = add_duration(start(), Duration::from_secs(60));

        let result = retry_loop(&clock, 25)
            .run(&backend, &preference(), deadline, &CancelToken::new())
            .await;

        assert_eq!(result.status, EngineStatus::TimedOut);
        assert!(clock.now() <= add_duration(deadline, Duration::from_secs(25)));
        assert_eq!(result.attempts_made, backend.list_calls());
    }

    #[tokio::test]
    async fn test_books_on_second_attempt() {
        let clock = Arc::new(ManualClock::new(start()));
        let backend = ScriptedBackend::new()
            .with_listing(ListStep::empty())
            .with_listing(ListStep::slots(vec![matching_slot()]))
            .with_claim(ClaimStep::confirmed("BOOKED-42"));
        let deadline = add_duration(start(), Duration::from_secs(60));

        let result = retry_loop(&clock, 10)
            .run(&backend, &preference(), deadline, &CancelToken::new())
            .await;

        assert_eq!(result.status, EngineStatus::Booked);
        assert_eq!(result.attempts_made, 2);
        assert_eq!(result.confirmation, Some(Confirmation::new("BOOKED-42")));
        assert_eq!(result.elapsed, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_transient_claim_failure_is_retried() {
        let clock = Arc::new(ManualClock::new(start()));
        let backend = ScriptedBackend::new()
            .with_listing(ListStep::slots(vec![matching_slot()]))
            .with_listing(ListStep::slots(vec![matching_slot()]))
            .with_claim(ClaimStep::unavailable("HTTP 502"))
            .with_claim(ClaimStep::confirmed("BOOKED-7"));
        let deadline = add_duration(start(), Duration::from_secs(60));

        let result = retry_loop(&clock, 10)
            .run(&backend, &preference(), deadline, &CancelToken::new())
            .await;

        assert_eq!(result.status, EngineStatus::Booked);
        assert_eq!(result.attempts_made, 2);
        assert_eq!(result.confirmation, Some(Confirmation::new("BOOKED-7")));
        assert_eq!(backend.claimed(), vec!["tee-0900".to_string(), "tee-0900".to_string()]);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(10)]);
    }

    #[tokio::test]
    async fn test_timed_out_elapsed_covers_final_pause() {
        let clock = Arc::new(ManualClock::new(start()));
        let backend = ScriptedBackend::new();
        let deadline = add_duration(start(), Duration::from_secs(20));

        let result = retry_loop(&clock, 10)
            .run(&backend, &preference(), deadline, &CancelToken::new())
            .await;

        // Attempts at 0 s, 10 s and 20 s; the third sees the deadline
        assert_eq!(result.status, EngineStatus::TimedOut);
        assert_eq!(result.attempts_made, 3);
        assert_eq!(result.elapsed, Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_fatal_stops_immediately() {
        let clock = Arc::new(ManualClock::new(start()));
        let backend = ScriptedBackend::new()
            .with_listing(ListStep::slots(vec![matching_slot()]))
            .with_claim(ClaimStep::rejected("invalid credentials"));
        let deadline = add_duration(start(), Duration::from_secs(60));

        let result = retry_loop(&clock, 10)
            .run(&backend, &preference(), deadline, &CancelToken::new())
            .await;

        assert_eq!(result.status, EngineStatus::Aborted);
        assert_eq!(result.attempts_made, 1);
        assert_eq!(
            result.reason.as_deref(),
            Some("Backend rejected request: invalid credentials")
        );
        assert_eq!(backend.total_calls(), 2);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_past_deadline_still_attempts_once() {
        let clock = Arc::new(ManualClock::new(start()));
        let backend = ScriptedBackend::new();

        let result = retry_loop(&clock, 10)
            .run(&backend, &preference(), start(), &CancelToken::new())
            .await;

        assert_eq!(result.status, EngineStatus::TimedOut);
        assert_eq!(result.attempts_made, 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let clock = Arc::new(ManualClock::new(start()));
        let backend = ScriptedBackend::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = retry_loop(&clock, 10)
            .run(&backend, &preference(), add_duration(start(), Duration::from_secs(60)), &cancel)
            .await;

        assert_eq!(result.status, EngineStatus::Aborted);
        assert_eq!(result.attempts_made, 0);
        assert_eq!(result.reason.as_deref(), Some(CANCELLED_REASON));
        assert_eq!(backend.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_interval_sleep() {
        let clock = Arc::new(crate::clock::SystemClock);
        let backend = ScriptedBackend::new();
        let cancel = CancelToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let deadline = add_duration(Utc::now(), Duration::from_secs(3600));
        let looped = RetryLoop::new(clock, Duration::from_secs(600));

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            looped.run(&backend, &preference(), deadline, &cancel),
        )
        .await
        .expect("sleep should be interrupted");

        assert_eq!(result.status, EngineStatus::Aborted);
        assert_eq!(result.attempts_made, 1);
    }
}
