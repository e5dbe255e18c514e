//! ID generation utilities for slotgrab
//!
//! A resource key names what a run is trying to book, so the history of
//! several runs against the same preference can be grouped. A run id names
//! one run.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::domain::SlotPreference;

const RESOURCE_KEY_LEN: usize = 12;
const RUN_ID_KEY_LEN: usize = 8;

/// Stable textual form of a preference, used for hashing.
///
/// Format: `target=HH:MM:SS;window=START-END;party=N;dates=FROM..TO`,
/// with `*` for an absent window bound.
pub fn canonical_preference(preference: &SlotPreference) -> String {
    let bound = |t: Option<chrono::NaiveTime>| {
        t.map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "*".to_string())
    };
    let range = preference.date_range();
    format!(
        "target={};window={}-{};party={};dates={}..{}",
        preference.target_time().format("%H:%M:%S"),
        bound(preference.window_start()),
        bound(preference.window_end()),
        preference.party_size(),
        range.start,
        range.end
    )
}

/// First 12 hex chars of the SHA-256 of the canonical preference.
pub fn resource_key(preference: &SlotPreference) -> String {
    let digest = Sha256::digest(canonical_preference(preference).as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(RESOURCE_KEY_LEN);
    key
}

/// Generate a run ID
///
/// Format: `{timestamp_ms}-{resource_key prefix}`
/// Example: `1754056800000-3f2a9c1b`
pub fn generate_run_id(now: DateTime<Utc>, resource_key: &str) -> String {
    let prefix: String = resource_key.chars().take(RUN_ID_KEY_LEN).collect();
    format!("{}-{}", now.timestamp_millis(), prefix)
}
