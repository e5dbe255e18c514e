//! Run result reporting.
//!
//! The engine hands every terminal result to exactly one [`Observer`]. Reporting
//! is best-effort: a failing observer is logged and never changes the result.

mod jsonl;

pub use jsonl::{JsonlObserver, RunRecord};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{EngineResult, EngineStatus};
use crate::error::{Result, SlotgrabError};

/// Identity of one engine run, passed alongside its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub run_id: String,
    pub resource_key: String,
    pub started_at: DateTime<Utc>,
    pub release_at: DateTime<Utc>,
}

/// Receives terminal run results (notification, metrics, history).
#[async_trait]
pub trait Observer: Send + Sync {
    async fn report(&self, context: &RunContext, result: &EngineResult) -> Result<()>;
}

/// Discards every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpObserver;

#[async_trait]
impl Observer for NoOpObserver {
    async fn report(&self, _context: &RunContext, _result: &EngineResult) -> Result<()> {
        Ok(())
    }
}

/// Writes each result to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

#[async_trait]
impl Observer for LogObserver {
    async fn report(&self, context: &RunContext, result: &EngineResult) -> Result<()> {
        let confirmation = result.confirmation.as_ref().map(|c| c.as_str()).unwrap_or("-");
        let reason = result.reason.as_deref().unwrap_or("-");
        match result.status {
            EngineStatus::Booked => tracing::info!(
                run_id = %context.run_id,
                attempts = result.attempts_made,
                elapsed_ms = result.elapsed.as_millis() as u64,
                confirmation = confirmation,
                "Run booked"
            ),
            EngineStatus::TimedOut => tracing::warn!(
                run_id = %context.run_id,
                attempts = result.attempts_made,
                elapsed_ms = result.elapsed.as_millis() as u64,
                "Run timed out without a booking"
            ),
            EngineStatus::Aborted => tracing::error!(
                run_id = %context.run_id,
                attempts = result.attempts_made,
                reason = reason,
                "Run aborted"
            ),
        }
        Ok(())
    }
}

/// Forwards each result to a closure.
pub struct CallbackObserver<F>
where
    F: Fn(&RunContext, &EngineResult) -> Result<()> + Send + Sync,
{
    callback: F,
}

impl<F> CallbackObserver<F>
where
    F: Fn(&RunContext, &EngineResult) -> Result<()> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F> Observer for CallbackObserver<F>
where
    F: Fn(&RunContext, &EngineResult) -> Result<()> + Send + Sync,
{
    async fn report(&self, context: &RunContext, result: &EngineResult) -> Result<()> {
        (self.callback)(context, result)
    }
}

/// Reports to several observers in order.
///
/// Every observer is called even when an earlier one fails; the failures are
/// combined into one error.
#[derive(Default, Clone)]
pub struct FanOutObserver {
    observers: Vec<Arc<dyn Observer>>,
}

impl FanOutObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }
}

#[async_trait]
impl Observer for FanOutObserver {
    async fn report(&self, context: &RunContext, result: &EngineResult) -> Result<()> {
        let mut failures = Vec::new();
        for observer in &self.observers {
            if let Err(e) = observer.report(context, result).await {
                failures.push(e.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SlotgrabError::Observer(failures.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Confirmation;
    use chrono::TimeZone;
    use std::sync::Mutex;
    use std::time::Duration;

    fn context() -> RunContext {
        let at = Utc.with_ymd_and_hms(2025, 8, 1, 14, 0, 0).unwrap();
        RunContext {
            run_id: "1754056800000-abcdef12".into(),
            resource_key: "abcdef123456".into(),
            started_at: at,
            release_at: at,
        }
    }

    fn booked() -> EngineResult {
        EngineResult::booked(2, Duration::from_secs(10), Confirmation::new("CONF"))
    }

    #[tokio::test]
    async fn test_noop_and_log_observers_succeed() {
        assert!(NoOpObserver.report(&context(), &booked()).await.is_ok());
        assert!(LogObserver.report(&context(), &booked()).await.is_ok());
        let aborted = EngineResult::aborted(1, Duration::ZERO, "locked");
        assert!(LogObserver.report(&context(), &aborted).await.is_ok());
    }

    #[tokio::test]
    async fn test_callback_observer_receives_result() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let observer = CallbackObserver::new(move |ctx: &RunContext, result: &EngineResult| {
            sink.lock().unwrap().push((ctx.run_id.clone(), result.status));
            Ok(())
        });

        observer.report(&context(), &booked()).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, EngineStatus::Booked);
    }

    #[tokio::test]
    async fn test_fan_out_continues_past_failure() {
        let calls = Arc::new(Mutex::new(0u32));
        let counter = calls.clone();
        let failing: Arc<dyn Observer> = Arc::new(CallbackObserver::new(|_: &RunContext, _: &EngineResult| {
            Err(SlotgrabError::Observer("sns down".into()))
        }));
        let counting: Arc<dyn Observer> = Arc::new(CallbackObserver::new(
            move |_: &RunContext, _: &EngineResult| {
                *counter.lock().unwrap() += 1;
                Ok(())
            },
        ));
        let fan_out = FanOutObserver::new().with(failing).with(counting);
        assert_eq!(fan_out.len(), 2);

        let err = fan_out.report(&context(), &booked()).await.unwrap_err();

        assert!(err.to_string().contains("sns down"));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_fan_out_is_ok() {
        let fan_out = FanOutObserver::new();
        assert!(fan_out.is_empty());
        assert!(fan_out.report(&context(), &booked()).await.is_ok());
    }
}
