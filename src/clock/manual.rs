//! Manually driven clock for deterministic runs.
//!
//! `sleep` advances virtual time by the requested duration and returns after
//! yielding once, so a full wait-and-retry run finishes instantly while still
//! observing every suspension point.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};

use super::{Clock, add_duration};

#[derive(Debug)]
struct State {
    now: DateTime<Utc>,
    sleeps: Vec<Duration>,
    /// Extra jumps applied right after the n-th sleep (1-based)
    adjustments: HashMap<usize, TimeDelta>,
}

/// Virtual wall clock.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<State>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(State {
                now: start,
                sleeps: Vec::new(),
                adjustments: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// After the `nth` sleep (1-based) completes, shift the clock by `offset`.
    ///
    /// Negative offsets model the system clock being stepped backwards mid-wait.
    pub fn adjust_after_sleep(&self, nth: usize, offset: TimeDelta) {
        self.lock().adjustments.insert(nth, offset);
    }

    /// Every sleep requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.lock().sleeps.clone()
    }

    pub fn total_slept(&self) -> Duration {
        self.lock().sleeps.iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut state = self.lock();
            state.now = add_duration(state.now, duration);
            state.sleeps.push(duration);
            let nth = state.sleeps.len();
            if let Some(offset) = state.adjustments.remove(&nth) {
                state.now = state.now.checked_add_signed(offset).unwrap_or(state.now);
            }
        }
        tokio::task::yield_now().await;
    }
}
