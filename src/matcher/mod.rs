//! Slot matching - deterministic choice among listed candidates.

mod slot_matcher;

pub use slot_matcher::SlotMatcher;
