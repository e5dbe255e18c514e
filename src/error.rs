//! Error types for slotgrab
//!
//! Centralized error handling using thiserror. Backend failures have their own
//! type in [`crate::backend::BackendError`] because they are classified into
//! attempt outcomes rather than propagated.

use thiserror::Error;

/// All error types that can occur while building or reporting an engine run
#[derive(Debug, Error)]
pub enum SlotgrabError {
    /// Preference violates one of its invariants
    #[error("Invalid preference: {0}")]
    InvalidPreference(String),

    /// Release schedule cannot be resolved to a single instant
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// Timezone name is not a known IANA zone
    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    /// Observer could not record a run
    #[error("Observer error: {0}")]
    Observer(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for slotgrab operations
pub type Result<T> = std::result::Result<T, SlotgrabError>;
