//! Release schedule: the instant a scarce resource becomes bookable.
//!
//! The instant carries its IANA timezone so it can be shown to operators in
//! local time, but every comparison happens in UTC.

use std::time::Duration;

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SlotgrabError};

/// When a resource releases, as a zoned timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseSchedule {
    target_instant: DateTime<Tz>,
}

impl ReleaseSchedule {
    /// Wrap an already-resolved zoned instant.
    pub fn new(target_instant: DateTime<Tz>) -> Self {
        Self { target_instant }
    }

    /// Resolve a local wall-clock date and time in `timezone`.
    ///
    /// A time repeated by a DST fall-back resolves to the earlier instant.
    /// A time skipped by a DST spring-forward is rejected.
    pub fn at_local(date: NaiveDate, time: NaiveTime, timezone: Tz) -> Result<Self> {
        match timezone.from_local_datetime(&date.and_time(time)) {
            LocalResult::Single(instant) => Ok(Self::new(instant)),
            LocalResult::Ambiguous(earliest, _) => Ok(Self::new(earliest)),
            LocalResult::None => Err(SlotgrabError::InvalidSchedule(format!(
                "{} {} does not exist in {}",
                date, time, timezone
            ))),
        }
    }

    /// Next occurrence of a daily release at `time` in `timezone`, at or after `now`.
    ///
    /// A day on which `time` does not exist (DST gap) has no release, so the
    /// following day is used.
    pub fn next_daily(time: NaiveTime, timezone: Tz, now: DateTime<Utc>) -> Result<Self> {
        let today = now.with_timezone(&timezone).date_naive();
        if let Ok(candidate) = Self::at_local(today, time, timezone)
            && candidate.utc() >= now
        {
            return Ok(candidate);
        }

        let tomorrow = today
            .succ_opt()
            .ok_or_else(|| SlotgrabError::InvalidSchedule(format!("no day after {}", today)))?;
        Self::at_local(tomorrow, time, timezone)
    }

    /// Look up an IANA timezone by name (e.g. `America/Los_Angeles`).
    pub fn parse_timezone(name: &str) -> Result<Tz> {
        name.parse::<Tz>()
            .map_err(|_| SlotgrabError::UnknownTimezone(name.to_string()))
    }

    /// The release instant in its own timezone.
    pub fn target_instant(&self) -> DateTime<Tz> {
        self.target_instant
    }

    pub fn timezone(&self) -> Tz {
        self.target_instant.timezone()
    }

    /// The release instant normalized to UTC.
    pub fn utc(&self) -> DateTime<Utc> {
        self.target_instant.with_timezone(&Utc)
    }

    /// Time left until release, zero once it has passed.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.utc() - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// A schedule `lead` earlier than this one, in the same timezone.
    pub fn earlier_by(&self, lead: Duration) -> Self {
        let shifted = TimeDelta::from_std(lead)
            .ok()
            .and_then(|delta| self.target_instant.checked_sub_signed(delta))
            .unwrap_or(self.target_instant);
        Self::new(shifted)
    }
}

impl std::fmt::Display for ReleaseSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({})",
            self.target_instant.format("%Y-%m-%d %H:%M:%S %Z"),
            self.timezone()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Los_Angeles;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_at_local_normalizes_to_utc() {
        // PDT is UTC-7 in August
        let schedule = ReleaseSchedule::at_local(date(2025, 8, 1), time(7, 0), Los_Angeles).unwrap();
        assert_eq!(schedule.utc(), Utc.with_ymd_and_hms(2025, 8, 1, 14, 0, 0).unwrap());
        assert_eq!(schedule.timezone(), Los_Angeles);
    }

    #[test]
    fn test_at_local_rejects_spring_forward_gap() {
        // 2025-03-09 02:30 does not exist in Los Angeles
        let result = ReleaseSchedule::at_local(date(2025, 3, 9), time(2, 30), Los_Angeles);
        assert!(matches!(result, Err(SlotgrabError::InvalidSchedule(_))));
    }

    #[test]
    fn test_at_local_fall_back_picks_earlier_instant() {
        // 2025-11-02 01:30 happens twice; the PDT one is 08:30 UTC
        let schedule = ReleaseSchedule::at_local(date(2025, 11, 2), time(1, 30), Los_Angeles).unwrap();
        assert_eq!(schedule.utc(), Utc.with_ymd_and_hms(2025, 11, 2, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_next_daily_later_today() {
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 13, 0, 0).unwrap(); // 06:00 PDT
        let schedule = ReleaseSchedule::next_daily(time(7, 0), Los_Angeles, now).unwrap();
        assert_eq!(schedule.utc(), Utc.with_ymd_and_hms(2025, 8, 1, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_next_daily_rolls_to_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 15, 0, 0).unwrap(); // 08:00 PDT
        let schedule = ReleaseSchedule::next_daily(time(7, 0), Los_Angeles, now).unwrap();
        assert_eq!(schedule.utc(), Utc.with_ymd_and_hms(2025, 8, 2, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_next_daily_exactly_now() {
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 14, 0, 0).unwrap();
        let schedule = ReleaseSchedule::next_daily(time(7, 0), Los_Angeles, now).unwrap();
        assert_eq!(schedule.utc(), now);
    }

    #[test]
    fn test_next_daily_skips_spring_forward_gap() {
        // 02:30 never happens on 2025-03-09; the next one is 02:30 PDT on the 10th
        let expected = Utc.with_ymd_and_hms(2025, 3, 10, 9, 30, 0).unwrap();

        let after_gap = Utc.with_ymd_and_hms(2025, 3, 9, 12, 0, 0).unwrap(); // 05:00 PDT
        let schedule = ReleaseSchedule::next_daily(time(2, 30), Los_Angeles, after_gap).unwrap();
        assert_eq!(schedule.utc(), expected);

        let before_gap = Utc.with_ymd_and_hms(2025, 3, 9, 8, 0, 0).unwrap(); // 00:00 PST
        let schedule = ReleaseSchedule::next_daily(time(2, 30), Los_Angeles, before_gap).unwrap();
        assert_eq!(schedule.utc(), expected);
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(ReleaseSchedule::parse_timezone("America/Los_Angeles").unwrap(), Los_Angeles);
        assert!(matches!(
            ReleaseSchedule::parse_timezone("Pacific/Nowhere"),
            Err(SlotgrabError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn test_remaining() {
        let schedule = ReleaseSchedule::at_local(date(2025, 8, 1), time(7, 0), Los_Angeles).unwrap();
        let before = Utc.with_ymd_and_hms(2025, 8, 1, 13, 59, 30).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 8, 1, 14, 0, 30).unwrap();
        assert_eq!(schedule.remaining(before), Duration::from_secs(30));
        assert_eq!(schedule.remaining(after), Duration::ZERO);
    }

    #[test]
    fn test_earlier_by() {
        let schedule = ReleaseSchedule::at_local(date(2025, 8, 1), time(7, 0), Los_Angeles).unwrap();
        let prepare = schedule.earlier_by(Duration::from_secs(60));
        assert_eq!(prepare.utc(), Utc.with_ymd_and_hms(2025, 8, 1, 13, 59, 0).unwrap());
        assert_eq!(prepare.timezone(), Los_Angeles);
    }
}
