//! Candidate slots returned by a backend, and the confirmation a claim yields.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// One bookable unit (tee time, permit date, campsite night).
///
/// Produced fresh by every listing; never stored between attempts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateSlot {
    /// Opaque backend handle used to claim the slot
    pub identifier: String,
    /// Local date and time the slot starts
    pub slot_time: NaiveDateTime,
    /// How many people the slot can still take
    pub capacity: u32,
}

impl CandidateSlot {
    pub fn new(identifier: impl Into<String>, slot_time: NaiveDateTime, capacity: u32) -> Self {
        Self {
            identifier: identifier.into(),
            slot_time,
            capacity,
        }
    }

    pub fn time_of_day(&self) -> NaiveTime {
        self.slot_time.time()
    }

    pub fn fits(&self, party_size: u32) -> bool {
        self.capacity >= party_size
    }
}

/// Opaque confirmation token handed back by a successful claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confirmation(String);

impl Confirmation {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Confirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 9).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_candidate_fits() {
        let slot = CandidateSlot::new("tile-1", at(9, 0), 4);
        assert!(slot.fits(4));
        assert!(slot.fits(1));
        assert!(!slot.fits(5));
    }

    #[test]
    fn test_candidate_time_of_day() {
        let slot = CandidateSlot::new("tile-1", at(17, 51), 2);
        assert_eq!(slot.time_of_day(), NaiveTime::from_hms_opt(17, 51, 0).unwrap());
    }

    #[test]
    fn test_candidate_deserialize() {
        let json = r#"{"identifier":"site-42","slot_time":"2025-08-09T09:30:00","capacity":6}"#;
        let slot: CandidateSlot = serde_json::from_str(json).unwrap();
        assert_eq!(slot, CandidateSlot::new("site-42", at(9, 30), 6));
    }

    #[test]
    fn test_confirmation_is_transparent() {
        let confirmation = Confirmation::new("ORDER-991");
        assert_eq!(serde_json::to_string(&confirmation).unwrap(), "\"ORDER-991\"");
        assert_eq!(confirmation.to_string(), "ORDER-991");
        assert_eq!(confirmation.as_str(), "ORDER-991");
    }
}
