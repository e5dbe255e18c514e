//! One list-select-claim round against a backend.

use crate::backend::{Backend, BackendError};
use crate::domain::{AttemptOutcome, CandidateSlot, SlotPreference};
use crate::matcher::SlotMatcher;

/// What a listing offers for a preference, without claiming anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub listed: usize,
    pub eligible: usize,
    pub best: Option<CandidateSlot>,
}

impl Availability {
    pub fn is_available(&self) -> bool {
        self.best.is_some()
    }
}

/// Performs a single acquisition attempt and classifies what happened.
///
/// Never retries by itself; that is the retry loop's job.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcquisitionAttempt {
    matcher: SlotMatcher,
}

impl AcquisitionAttempt {
    pub fn new() -> Self {
        Self::default()
    }

    /// List, select and claim once.
    pub async fn attempt<B>(&self, backend: &B, preference: &SlotPreference) -> AttemptOutcome
    where
        B: Backend + ?Sized,
    {
        let candidates = match backend
            .list_candidates(preference.date_range(), preference.party_size())
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => return Self::classify(e, "listing"),
        };

        if candidates.is_empty() {
            tracing::debug!("Backend listed no candidates");
            return AttemptOutcome::NoAvailability;
        }

        let Some(selected) = self.matcher.select(&candidates, preference) else {
            tracing::debug!(listed = candidates.len(), "No listed candidate matches preference");
            return AttemptOutcome::NoAvailability;
        };

        tracing::info!(
            slot = %selected.identifier,
            slot_time = %selected.slot_time,
            listed = candidates.len(),
            "Claiming slot"
        );

        match backend.claim(selected).await {
            Ok(confirmation) => AttemptOutcome::Success(confirmation),
            Err(e) => Self::classify(e, "claim"),
        }
    }

    /// List and rank once without claiming.
    pub async fn check<B>(&self, backend: &B, preference: &SlotPreference) -> Result<Availability, BackendError>
    where
        B: Backend + ?Sized,
    {
        let candidates = backend
            .list_candidates(preference.date_range(), preference.party_size())
            .await?;
        let ranked = self.matcher.rank(&candidates, preference);

        let availability = Availability {
            listed: candidates.len(),
            eligible: ranked.len(),
            best: ranked.first().map(|slot| (*slot).clone()),
        };
        tracing::info!(
            listed = availability.listed,
            eligible = availability.eligible,
            best = ?availability.best.as_ref().map(|slot| slot.identifier.as_str()),
            "Checked availability"
        );
        Ok(availability)
    }

    fn classify(error: BackendError, phase: &str) -> AttemptOutcome {
        if error.is_retryable() {
            tracing::warn!(phase = phase, error = %error, "Transient backend failure");
            AttemptOutcome::TransientFailure(error.to_string())
        } else {
            tracing::error!(phase = phase, error = %error, "Fatal backend failure");
            AttemptOutcome::FatalFailure(error.to_string())
        }
    }
}
