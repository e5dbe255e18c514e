//! What the caller wants to book: a target time, an optional acceptance
//! window, a party size and the dates to search.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SlotgrabError};

/// Inclusive range of dates to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(SlotgrabError::InvalidPreference(format!(
                "date range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// A range covering exactly one date.
    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..={}", self.start, self.end)
        }
    }
}

/// Slot preference with validated invariants.
///
/// `target_time` does not have to fall inside the window: the intent is
/// "closest slot inside the window, otherwise nothing".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotPreference {
    target_time: NaiveTime,
    window_start: Option<NaiveTime>,
    window_end: Option<NaiveTime>,
    party_size: u32,
    date_range: DateRange,
}

impl SlotPreference {
    /// Create a preference without an acceptance window.
    pub fn new(target_time: NaiveTime, party_size: u32, date_range: DateRange) -> Result<Self> {
        if party_size == 0 {
            return Err(SlotgrabError::InvalidPreference(
                "party_size must be positive".to_string(),
            ));
        }
        if date_range.start > date_range.end {
            return Err(SlotgrabError::InvalidPreference(format!(
                "date range start {} is after end {}",
                date_range.start, date_range.end
            )));
        }
        Ok(Self {
            target_time,
            window_start: None,
            window_end: None,
            party_size,
            date_range,
        })
    }

    /// Restrict acceptable slots to `[start, end]`. Either bound may be open.
    pub fn with_window(mut self, start: Option<NaiveTime>, end: Option<NaiveTime>) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end)
            && s > e
        {
            return Err(SlotgrabError::InvalidPreference(format!(
                "window start {} is after window end {}",
                s, e
            )));
        }
        self.window_start = start;
        self.window_end = end;
        Ok(self)
    }

    pub fn target_time(&self) -> NaiveTime {
        self.target_time
    }

    pub fn window_start(&self) -> Option<NaiveTime> {
        self.window_start
    }

    pub fn window_end(&self) -> Option<NaiveTime> {
        self.window_end
    }

    pub fn party_size(&self) -> u32 {
        self.party_size
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn has_window(&self) -> bool {
        self.window_start.is_some() || self.window_end.is_some()
    }

    /// Whether a time of day lies inside the window (inclusive on both ends).
    pub fn window_contains(&self, time: NaiveTime) -> bool {
        self.window_start.is_none_or(|start| start <= time)
            && self.window_end.is_none_or(|end| time <= end)
    }
}

impl std::fmt::Display for SlotPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} x{} near {}",
            self.date_range,
            self.party_size,
            self.target_time.format("%H:%M")
        )?;
        if self.has_window() {
            let bound = |t: Option<NaiveTime>| t.map_or("*".to_string(), |t| t.format("%H:%M").to_string());
            write!(f, " within [{}, {}]", bound(self.window_start), bound(self.window_end))?;
        }
        Ok(())
    }
}
