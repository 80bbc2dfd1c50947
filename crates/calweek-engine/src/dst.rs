//! DST transition policies for local wall-clock times.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Policy for local times that fall into a DST gap (e.g. 02:30 on spring-forward day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DstPolicy {
    /// Drop the instant entirely.
    Skip,
    /// Move to the same wall-clock time one hour later, past the gap.
    #[default]
    ShiftForward,
}

/// Resolve a naive local time in `tz`.
///
/// Ambiguous times (the repeated hour on fall-back day) resolve to the earlier
/// instant. Nonexistent times are handled according to `policy`.
pub fn localize(tz: Tz, naive: NaiveDateTime, policy: DstPolicy) -> Option<DateTime<Tz>> {
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return Some(dt);
    }
    match policy {
        DstPolicy::Skip => None,
        DstPolicy::ShiftForward => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}

/// First instant of `date` in `tz`.
///
/// This is midnight, except in zones that change clock at midnight (e.g.
/// `America/Santiago`), where the day starts at the end of the gap.
pub fn start_of_day(tz: Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    localize(tz, date.and_time(NaiveTime::MIN), DstPolicy::ShiftForward)
}
