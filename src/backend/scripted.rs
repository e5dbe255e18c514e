//! Fixture-driven backend.
//!
//! Replays a script of listing and claim responses in order. Used by the
//! test suite and by `slotgrab rehearse` to exercise a full run offline.
//! Once the listing script runs out every listing is empty; once the claim
//! script runs out every claim succeeds with `scripted-<identifier>`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Backend, BackendError};
use crate::domain::{CandidateSlot, Confirmation, DateRange};

/// Scripted response to `list_candidates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ListStep {
    Slots {
        #[serde(default)]
        slots: Vec<CandidateSlot>,
    },
    Unavailable {
        reason: String,
    },
    Rejected {
        reason: String,
    },
}

impl ListStep {
    pub fn slots(slots: Vec<CandidateSlot>) -> Self {
        ListStep::Slots { slots }
    }

    pub fn empty() -> Self {
        ListStep::Slots { slots: Vec::new() }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ListStep::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        ListStep::Rejected {
            reason: reason.into(),
        }
    }
}

/// Scripted response to `claim`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ClaimStep {
    Confirmed { confirmation: String },
    Taken { reason: String },
    Unavailable { reason: String },
    Rejected { reason: String },
}

impl ClaimStep {
    pub fn confirmed(confirmation: impl Into<String>) -> Self {
        ClaimStep::Confirmed {
            confirmation: confirmation.into(),
        }
    }

    pub fn taken(reason: impl Into<String>) -> Self {
        ClaimStep::Taken {
            reason: reason.into(),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ClaimStep::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        ClaimStep::Rejected {
            reason: reason.into(),
        }
    }
}

/// Scripted response to `prepare`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PrepareStep {
    Ready,
    Unavailable { reason: String },
    Rejected { reason: String },
}

/// Whole script, as loaded from a rehearsal file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendScript {
    pub prepare: Option<PrepareStep>,
    pub listings: Vec<ListStep>,
    pub claims: Vec<ClaimStep>,
}

#[derive(Debug, Default)]
struct Script {
    prepare: Option<PrepareStep>,
    listings: VecDeque<ListStep>,
    claims: VecDeque<ClaimStep>,
}

/// Backend that replays a [`BackendScript`] and counts every call.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
    prepare_calls: AtomicU32,
    list_calls: AtomicU32,
    claim_calls: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
    claimed: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_script(script: BackendScript) -> Self {
        let backend = Self::new();
        {
            let mut inner = backend.lock_script();
            inner.prepare = script.prepare;
            inner.listings = script.listings.into();
            inner.claims = script.claims.into();
        }
        backend
    }

    pub fn with_listing(self, step: ListStep) -> Self {
        self.lock_script().listings.push_back(step);
        self
    }

    pub fn with_claim(self, step: ClaimStep) -> Self {
        self.lock_script().claims.push_back(step);
        self
    }

    pub fn with_prepare(self, step: PrepareStep) -> Self {
        self.lock_script().prepare = Some(step);
        self
    }

    pub fn prepare_calls(&self) -> u32 {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> u32 {
        self.claim_calls.load(Ordering::SeqCst)
    }

    /// Total backend calls (prepare, list and claim).
    pub fn total_calls(&self) -> u32 {
        self.prepare_calls() + self.list_calls() + self.claim_calls()
    }

    /// Most calls that were ever in progress at the same time.
    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Identifiers passed to `claim`, in order.
    pub fn claimed(&self) -> Vec<String> {
        self.claimed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lock_script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn enter(&self) {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        // Give any overlapping caller a chance to show up in the counter
        tokio::task::yield_now().await;
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn prepare(&self) -> Result<(), BackendError> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let step = self.lock_script().prepare.clone();
        self.leave();

        match step {
            None | Some(PrepareStep::Ready) => Ok(()),
            Some(PrepareStep::Unavailable { reason }) => Err(BackendError::Unavailable(reason)),
            Some(PrepareStep::Rejected { reason }) => Err(BackendError::Rejected(reason)),
        }
    }

    async fn list_candidates(
        &self,
        _dates: DateRange,
        _party_size: u32,
    ) -> Result<Vec<CandidateSlot>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        let step = self.lock_script().listings.pop_front();
        self.leave();

        match step {
            None => Ok(Vec::new()),
            Some(ListStep::Slots { slots }) => Ok(slots),
            Some(ListStep::Unavailable { reason }) => Err(BackendError::Unavailable(reason)),
            Some(ListStep::Rejected { reason }) => Err(BackendError::Rejected(reason)),
        }
    }

    async fn claim(&self, candidate: &CandidateSlot) -> Result<Confirmation, BackendError> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await;
        self.claimed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(candidate.identifier.clone());
        let step = self.lock_script().claims.pop_front();
        self.leave();

        match step {
            None => Ok(Confirmation::new(format!("scripted-{}", candidate.identifier))),
            Some(ClaimStep::Confirmed { confirmation }) => Ok(Confirmation::new(confirmation)),
            Some(ClaimStep::Taken { reason }) => Err(BackendError::SlotUnavailable(reason)),
            Some(ClaimStep::Unavailable { reason }) => Err(BackendError::Unavailable(reason)),
            Some(ClaimStep::Rejected { reason }) => Err(BackendError::Rejected(reason)),
        }
    }
}
