//! Display windows and window filtering.
//!
//! A window is a closed interval `[start, end]`. Both the overlap test and
//! clamping treat the bounds inclusively, so an event ending exactly at
//! `window.start` or starting exactly at `window.end` is kept.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};
use chrono_tz::Tz;

use crate::config::EngineConfig;
use crate::dst::start_of_day;
use crate::error::{CalweekError, Result};
use crate::normalize::CanonicalEvent;

/// The range of instants shown on one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl DisplayWindow {
    /// # Errors
    /// Returns `CalweekError::InvalidWindow` if `end` is before `start`.
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Result<Self> {
        if end < start {
            return Err(CalweekError::InvalidWindow(format!(
                "end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// The Monday-to-Sunday week containing `now`, in the reference zone.
    ///
    /// Starts at 00:00 on the most recent Monday (today, if today is Monday)
    /// and ends at 23:59:59 on the following Sunday.
    ///
    /// # Errors
    /// Returns `CalweekError::InvalidWindow` if a week boundary cannot be
    /// represented in the reference zone.
    pub fn current_week<Z: TimeZone>(now: DateTime<Z>, config: &EngineConfig) -> Result<Self> {
        let today = now.with_timezone(&config.reference_tz).date_naive();
        let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        Self::days_from(monday, 7, config)
    }

    /// `days` whole calendar days starting at the first instant of `first_day`
    /// (midnight, unless the zone changes clock at midnight).
    ///
    /// The end is one second before the next day starts, computed on the
    /// calendar so weeks containing a DST change still end at 23:59:59.
    ///
    /// # Errors
    /// Returns `CalweekError::InvalidWindow` if `days` is zero or a boundary
    /// does not exist in the reference zone.
    pub fn days_from(first_day: NaiveDate, days: u32, config: &EngineConfig) -> Result<Self> {
        if days == 0 {
            return Err(CalweekError::InvalidWindow("zero-day window".to_string()));
        }
        let day_start = |date: NaiveDate| {
            start_of_day(config.reference_tz, date)
                .ok_or_else(|| CalweekError::InvalidWindow(format!("no start of day on {}", date)))
        };
        let start = day_start(first_day)?;
        let end = day_start(first_day + Duration::days(i64::from(days)))? - Duration::seconds(1);
        Self::new(start, end)
    }

    pub fn contains(&self, instant: DateTime<Tz>) -> bool {
        self.start <= instant && instant <= self.end
    }

    /// Inclusive overlap: touching a bound counts.
    pub fn overlaps(&self, event: &CanonicalEvent) -> bool {
        event.end >= self.start && event.start <= self.end
    }

    /// Same end, start moved earlier by `by`. Used to catch recurring
    /// occurrences that begin before the window but run into it.
    pub fn extended_back(&self, by: Duration) -> Self {
        Self {
            start: self.start - by.max(Duration::zero()),
            end: self.end,
        }
    }

    /// Calendar dates covered by the window, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let first = self.start.date_naive();
        let last = self.end.date_naive();
        first
            .iter_days()
            .take_while(|d| *d <= last)
            .collect()
    }

    /// Column index of the calendar date of `instant`, if it falls in the window.
    pub fn day_index(&self, instant: DateTime<Tz>) -> Option<usize> {
        let date = instant.with_timezone(&self.start.timezone()).date_naive();
        let offset = (date - self.start.date_naive()).num_days();
        let count = self.dates().len() as i64;
        (0..count).contains(&offset).then_some(offset as usize)
    }
}

/// Clamp an event to the window. Callers must have checked overlap first.
fn clamp(event: CanonicalEvent, window: &DisplayWindow) -> CanonicalEvent {
    CanonicalEvent {
        start: event.start.max(window.start),
        end: event.end.min(window.end),
        ..event
    }
}

/// Keep events overlapping the window, clamped to its bounds.
///
/// Input order is preserved. Applying the filter twice with the same window
/// gives the same result as applying it once.
pub fn filter_to_window<I>(events: I, window: &DisplayWindow) -> Vec<CanonicalEvent>
where
    I: IntoIterator<Item = CanonicalEvent>,
{
    events
        .into_iter()
        .filter(|e| window.overlaps(e))
        .map(|e| clamp(e, window))
        .collect()
}
