//! Picks the candidate slot that best matches a preference.
//!
//! Selection order:
//! 1. Date must lie inside the preference's date range
//! 2. Capacity must fit the party
//! 3. Time of day must lie inside the window, if one is set
//! 4. Closest to the target time wins
//! 5. Ties go to the earlier slot, then the lower identifier
//!
//! The comparison is a total order over candidates, so the same input always
//! yields the same pick regardless of the order the backend listed them in.

use std::cmp::Ordering;

use chrono::NaiveTime;

use crate::domain::{CandidateSlot, SlotPreference};

/// Stateless slot selector.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotMatcher;

impl SlotMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Best acceptable candidate, or `None` when nothing fits.
    ///
    /// `None` means "no availability", not an error.
    pub fn select<'a>(
        &self,
        candidates: &'a [CandidateSlot],
        preference: &SlotPreference,
    ) -> Option<&'a CandidateSlot> {
        Self::eligible(candidates, preference).min_by(|a, b| Self::compare(a, b, preference))
    }

    /// All acceptable candidates, best first.
    pub fn rank<'a>(
        &self,
        candidates: &'a [CandidateSlot],
        preference: &SlotPreference,
    ) -> Vec<&'a CandidateSlot> {
        let mut ranked: Vec<&CandidateSlot> = Self::eligible(candidates, preference).collect();
        ranked.sort_by(|a, b| Self::compare(a, b, preference));
        ranked
    }

    /// Seconds between a slot's time of day and the target time.
    pub fn distance_secs(slot: &CandidateSlot, target: NaiveTime) -> u64 {
        slot.time_of_day()
            .signed_duration_since(target)
            .num_seconds()
            .unsigned_abs()
    }

    fn eligible<'a>(
        candidates: &'a [CandidateSlot],
        preference: &SlotPreference,
    ) -> impl Iterator<Item = &'a CandidateSlot> {
        let dates = preference.date_range();
        candidates
            .iter()
            .filter(move |c| dates.contains(c.slot_time.date()))
            .filter(|c| c.fits(preference.party_size()))
            .filter(|c| preference.window_contains(c.time_of_day()))
    }

    fn compare(a: &CandidateSlot, b: &CandidateSlot, preference: &SlotPreference) -> Ordering {
        let target = preference.target_time();
        Self::distance_secs(a, target)
            .cmp(&Self::distance_secs(b, target))
            .then_with(|| a.slot_time.cmp(&b.slot_time))
            .then_with(|| a.identifier.cmp(&b.identifier))
            // Same handle listed twice: prefer the roomier entry
            .then_with(|| b.capacity.cmp(&a.capacity))
    }
}
