//! Waits for a release instant in coarse steps.
//!
//! The remaining time is recomputed after every step, so a wall clock that is
//! stepped or crosses a DST change mid-wait is re-read instead of trusted from
//! one long sleep.

use std::sync::Arc;
use std::time::Duration;

use super::Clock;
use crate::coordination::CancelToken;
use crate::domain::ReleaseSchedule;

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Current time is at or past the target
    Reached,
    /// The run was cancelled first
    Aborted,
}

/// Blocks the calling flow until a release instant.
pub struct ClockWaiter<C: Clock> {
    clock: Arc<C>,
    granularity: Duration,
}

impl<C: Clock> ClockWaiter<C> {
    /// Longest single sleep before the remaining time is re-read.
    pub const DEFAULT_GRANULARITY: Duration = Duration::from_secs(30);

    const MIN_GRANULARITY: Duration = Duration::from_millis(1);

    pub fn new(clock: Arc<C>) -> Self {
        Self {
            clock,
            granularity: Self::DEFAULT_GRANULARITY,
        }
    }

    pub fn with_granularity(mut self, granularity: Duration) -> Self {
        self.granularity = granularity.max(Self::MIN_GRANULARITY);
        self
    }

    /// Return once `now >= schedule`, or [`WaitOutcome::Aborted`] if cancelled first.
    pub async fn wait_until(&self, schedule: &ReleaseSchedule, cancel: &CancelToken) -> WaitOutcome {
        let target = schedule.utc();
        let initial = schedule.remaining(self.clock.now());
        if !initial.is_zero() {
            tracing::info!(
                release = %schedule,
                remaining_secs = initial.as_secs(),
                "Waiting for release instant"
            );
        }

        loop {
            if cancel.is_cancelled() {
                tracing::info!(release = %schedule, "Wait aborted");
                return WaitOutcome::Aborted;
            }

            let now = self.clock.now();
            if now >= target {
                tracing::debug!(release = %schedule, "Release instant reached");
                return WaitOutcome::Reached;
            }

            let step = schedule.remaining(now).min(self.granularity);
            tracing::trace!(step_ms = step.as_millis() as u64, "Sleeping toward release");

            tokio::select! {
                _ = self.clock.sleep(step) => {}
                _ = cancel.cancelled() => {}
            }
        }
    }
}
