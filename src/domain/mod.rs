//! Domain types for slotgrab
//!
//! - ReleaseSchedule: the zoned instant a resource becomes bookable
//! - SlotPreference / DateRange: what the caller wants
//! - CandidateSlot / Confirmation: what a backend lists and returns
//! - AttemptOutcome / EngineResult: per-attempt and per-run results

pub mod outcome;
pub mod preference;
pub mod schedule;
pub mod slot;

pub use outcome::{AttemptOutcome, EngineResult, EngineStatus};
pub use preference::{DateRange, SlotPreference};
pub use schedule::ReleaseSchedule;
pub use slot::{CandidateSlot, Confirmation};
