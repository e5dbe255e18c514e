//! Acquisition backend - the site-specific side of a run.
//!
//! A backend lists bookable slots and claims one. Everything about logging in,
//! navigating pages or solving challenges lives behind this trait; the engine
//! only sees candidates, confirmations and classified errors.

mod scripted;

pub use scripted::{BackendScript, ClaimStep, ListStep, PrepareStep, ScriptedBackend};

use async_trait::async_trait;

use crate::domain::{CandidateSlot, Confirmation, DateRange};

/// Site-specific listing and claiming.
///
/// Implementations shared between concurrent runs are responsible for their
/// own thread-safety.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Get ready ahead of the release instant (e.g. log in).
    ///
    /// Called once, `prepare_lead` before release, when the engine is
    /// configured with a lead.
    async fn prepare(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Bookable slots for the given dates that can take `party_size`.
    async fn list_candidates(
        &self,
        dates: DateRange,
        party_size: u32,
    ) -> Result<Vec<CandidateSlot>, BackendError>;

    /// Claim one specific slot.
    async fn claim(&self, candidate: &CandidateSlot) -> Result<Confirmation, BackendError>;
}

/// Errors a backend can report
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Network failure, timeout or unexpected response
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Slot was taken between listing and claiming
    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    /// Invalid credentials, account lockout or malformed request
    #[error("Backend rejected request: {0}")]
    Rejected(String),
}

impl BackendError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            BackendError::Unavailable(_) => true,
            BackendError::SlotUnavailable(_) => true,
            BackendError::Rejected(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_retryable() {
        assert!(BackendError::Unavailable("timeout".into()).is_retryable());
        assert!(BackendError::SlotUnavailable("gone".into()).is_retryable());
        assert!(!BackendError::Rejected("bad password".into()).is_retryable());
    }

    #[test]
    fn test_backend_error_display() {
        assert_eq!(
            BackendError::Rejected("account suspended".into()).to_string(),
            "Backend rejected request: account suspended"
        );
        assert_eq!(
            BackendError::Unavailable("HTTP 503".into()).to_string(),
            "Backend unavailable: HTTP 503"
        );
    }

    struct AlwaysEmpty;

    #[async_trait]
    impl Backend for AlwaysEmpty {
        async fn list_candidates(
            &self,
            _dates: DateRange,
            _party_size: u32,
        ) -> Result<Vec<CandidateSlot>, BackendError> {
            Ok(Vec::new())
        }

        async fn claim(&self, candidate: &CandidateSlot) -> Result<Confirmation, BackendError> {
            Err(BackendError::SlotUnavailable(candidate.identifier.clone()))
        }
    }

    #[tokio::test]
    async fn test_default_prepare_is_noop() {
        assert_eq!(AlwaysEmpty.prepare().await, Ok(()));
    }
}
