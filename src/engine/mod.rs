//! Acquisition engine - one timed booking run end to end.
//!
//! A run waits for the release instant, then hands over to the retry loop
//! until it books, hits a fatal failure, runs out of budget or is cancelled.
//! The terminal result is reported to the observer exactly once.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::Backend;
use crate::clock::{Clock, ClockWaiter, WaitOutcome, add_duration, elapsed_between};
use crate::coordination::CancelToken;
use crate::domain::{EngineResult, ReleaseSchedule, SlotPreference};
use crate::id::{generate_run_id, resource_key};
use crate::observer::{NoOpObserver, Observer, RunContext};
use crate::runner::{CANCELLED_REASON, RetryLoop};

/// Timing knobs for a run. The retry budget is passed per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Fixed delay between attempts
    pub interval: Duration,
    /// Longest single sleep while waiting for the release instant
    pub wait_granularity: Duration,
    /// When set, `Backend::prepare` runs this long before release
    pub prepare_lead: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            wait_granularity: Duration::from_secs(30),
            prepare_lead: None,
        }
    }
}

/// Runs timed acquisitions against one backend.
pub struct AcquisitionEngine<B, C>
where
    B: Backend + ?Sized,
    C: Clock,
{
    backend: Arc<B>,
    clock: Arc<C>,
    observer: Arc<dyn Observer>,
    config: EngineConfig,
    cancel: CancelToken,
}

impl<B, C> AcquisitionEngine<B, C>
where
    B: Backend + ?Sized,
    C: Clock,
{
    pub fn new(backend: Arc<B>, clock: Arc<C>) -> Self {
        Self {
            backend,
            clock,
            observer: Arc::new(NoOpObserver),
            config: EngineConfig::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing token, e.g. one tripped by a signal handler.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle that cancels this engine's runs.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for `schedule`, then attempt for up to `retry_budget`.
    ///
    /// Never fails: timeouts, fatal backend errors and cancellation all come
    /// back as an [`EngineResult`].
    pub async fn run(
        &self,
        schedule: &ReleaseSchedule,
        preference: &SlotPreference,
        retry_budget: Duration,
    ) -> EngineResult {
        let started_at = self.clock.now();
        let key = resource_key(preference);
        let context = RunContext {
            run_id: generate_run_id(started_at, &key),
            resource_key: key,
            started_at,
            release_at: schedule.utc(),
        };

        tracing::info!(
            run_id = %context.run_id,
            release = %schedule,
            preference = %preference,
            budget_secs = retry_budget.as_secs(),
            "Run started"
        );

        let result = self.execute(schedule, preference, retry_budget).await;
        self.report(&context, &result).await;
        result
    }

    async fn execute(
        &self,
        schedule: &ReleaseSchedule,
        preference: &SlotPreference,
        retry_budget: Duration,
    ) -> EngineResult {
        let waiter =
            ClockWaiter::new(self.clock.clone()).with_granularity(self.config.wait_granularity);
        let wait_started = self.clock.now();

        if let Some(lead) = self.config.prepare_lead {
            let prepare_at = schedule.earlier_by(lead);
            if waiter.wait_until(&prepare_at, &self.cancel).await == WaitOutcome::Aborted {
                return self.aborted_before_attempts(wait_started, CANCELLED_REASON.to_string());
            }

            match self.backend.prepare().await {
                Ok(()) => tracing::info!(lead_secs = lead.as_secs(), "Backend prepared"),
                Err(e) if !e.is_retryable() => {
                    tracing::error!(error = %e, "Backend prepare rejected");
                    return self.aborted_before_attempts(wait_started, e.to_string());
                }
                Err(e) => tracing::warn!(error = %e, "Backend prepare failed, continuing"),
            }
        }

        if waiter.wait_until(schedule, &self.cancel).await == WaitOutcome::Aborted {
            return self.aborted_before_attempts(wait_started, CANCELLED_REASON.to_string());
        }

        let deadline = add_duration(self.clock.now(), retry_budget);
        RetryLoop::new(self.clock.clone(), self.config.interval)
            .run(self.backend.as_ref(), preference, deadline, &self.cancel)
            .await
    }

    fn aborted_before_attempts(
        &self,
        wait_started: chrono::DateTime<chrono::Utc>,
        reason: String,
    ) -> EngineResult {
        let elapsed = elapsed_between(wait_started, self.clock.now());
        EngineResult::aborted(0, elapsed, reason)
    }

    async fn report(&self, context: &RunContext, result: &EngineResult) {
        if let Err(e) = self.observer.report(context, result).await {
            tracing::warn!(run_id = %context.run_id, error = %e, "Failed to report run result");
        }
    }
}
