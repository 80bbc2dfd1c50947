//! Week layout -- day columns, lanes for overlapping events, and vertical
//! positions on the timeline.
//!
//! Lanes are assigned greedily (first fit, in start order). This is
//! interval-graph colouring, not a minimum-lane solution; a day may use more
//! lanes than strictly necessary.

use chrono::{DateTime, Duration, NaiveDate, Timelike};
use chrono_tz::Tz;

use crate::error::{CalweekError, Result};
use crate::normalize::CanonicalEvent;
use crate::window::DisplayWindow;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Tunables for the vertical timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    /// Hours shown when there are no timed events, as `[first, last)`.
    pub default_hours: (u32, u32),
    pub pixels_per_hour: u32,
    /// Short events are drawn at least this tall so their text stays legible.
    pub min_block_px: u32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            default_hours: (8, 17),
            pixels_per_hour: 48,
            min_block_px: 18,
        }
    }
}

/// Visible hour range, `[first_hour, last_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeline {
    pub first_hour: u32,
    pub last_hour: u32,
}

impl Timeline {
    pub fn hours(&self) -> impl Iterator<Item = u32> {
        self.first_hour..self.last_hour
    }
}

/// An event drawn inside one day column.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedBlock {
    pub event: CanonicalEvent,
    pub day: usize,
    pub lane: usize,
    /// Lanes in use on this block's day.
    pub lanes: usize,
    pub top_px: u32,
    pub height_px: u32,
}

impl TimedBlock {
    pub fn width_percent(&self) -> f64 {
        100.0 / self.lanes.max(1) as f64
    }

    pub fn left_percent(&self) -> f64 {
        self.lane as f64 * self.width_percent()
    }
}

/// An all-day event, or a timed event crossing midnight, drawn in the strip
/// above the day columns. `first_day..=last_day` are column indices.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanningBlock {
    pub event: CanonicalEvent,
    pub first_day: usize,
    pub last_day: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekLayout {
    pub days: Vec<NaiveDate>,
    pub timeline: Timeline,
    pub pixels_per_hour: u32,
    pub spanning: Vec<SpanningBlock>,
    pub timed: Vec<TimedBlock>,
}

impl WeekLayout {
    pub fn is_empty(&self) -> bool {
        self.spanning.is_empty() && self.timed.is_empty()
    }

    pub fn height_px(&self) -> u32 {
        (self.timeline.last_hour - self.timeline.first_hour) * self.pixels_per_hour
    }
}

/// Half-open overlap: events that merely touch do not overlap.
pub fn overlaps(a: &CanonicalEvent, b: &CanonicalEvent) -> bool {
    a.start < b.end && b.start < a.end
}

/// Calendar date of the last instant covered by the event. An end at the
/// first instant of a day (normally midnight) belongs to the previous day.
fn last_date(event: &CanonicalEvent) -> NaiveDate {
    let end = event.end;
    let before_end = end - Duration::seconds(1);
    if end > event.start && before_end.date_naive() < end.date_naive() {
        before_end.date_naive()
    } else {
        end.date_naive()
    }
}

fn is_spanning(event: &CanonicalEvent) -> bool {
    event.all_day || last_date(event) > event.start.date_naive()
}

fn minute_of_day(dt: DateTime<Tz>) -> i64 {
    i64::from(dt.hour() * 60 + dt.minute())
}

/// Start and end minute within the event's start day. An end on a later
/// date (only possible at midnight for non-spanning events) is 24:00.
fn minute_range(event: &CanonicalEvent) -> (i64, i64) {
    let start = minute_of_day(event.start);
    let end = if event.end.date_naive() > event.start.date_naive() {
        MINUTES_PER_DAY
    } else {
        minute_of_day(event.end)
    };
    (start, end.max(start))
}

/// Assign a lane to each event, returned in input order.
///
/// Events are visited by start (then end). An event reuses the first lane
/// whose last event has ended at or before its start; otherwise it opens a
/// new lane.
pub fn assign_lanes(events: &[CanonicalEvent]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..events.len()).collect();
    order.sort_by_key(|&i| (events[i].start, events[i].end));

    let mut lane_ends: Vec<DateTime<Tz>> = Vec::new();
    let mut lanes = vec![0; events.len()];
    for i in order {
        let event = &events[i];
        match lane_ends.iter().position(|end| event.start >= *end) {
            Some(lane) => {
                lane_ends[lane] = event.end;
                lanes[i] = lane;
            }
            None => {
                lanes[i] = lane_ends.len();
                lane_ends.push(event.end);
            }
        }
    }
    lanes
}

/// Compute the visible hour range for a set of single-day timed events.
pub fn timeline_for(events: &[CanonicalEvent], options: &LayoutOptions) -> Timeline {
    let ranges: Vec<(i64, i64)> = events.iter().map(minute_range).collect();
    let (Some(min_start), Some(max_end)) = (
        ranges.iter().map(|r| r.0).min(),
        ranges.iter().map(|r| r.1).max(),
    ) else {
        return Timeline {
            first_hour: options.default_hours.0,
            last_hour: options.default_hours.1,
        };
    };

    let first_hour = (min_start / 60) as u32;
    // Ceil to the hour, then one hour of padding, never past midnight.
    let last_hour = (((max_end + 59) / 60) as u32 + 1).min(24);
    Timeline {
        first_hour,
        last_hour: last_hour.max(first_hour + 1),
    }
}

/// Lay out window-clamped events on a week grid.
///
/// # Errors
/// Returns `CalweekError::Render` if an event lies outside the window, which
/// means it was not passed through the window filter.
pub fn layout_week(
    events: &[CanonicalEvent],
    window: &DisplayWindow,
    options: &LayoutOptions,
) -> Result<WeekLayout> {
    let days = window.dates();
    let column = |dt: DateTime<Tz>, event: &CanonicalEvent| {
        window.day_index(dt).ok_or_else(|| {
            CalweekError::Render(format!(
                "event '{}' at {} is outside the display window",
                event.summary, dt
            ))
        })
    };

    let (spanning_events, timed_events): (Vec<&CanonicalEvent>, Vec<&CanonicalEvent>) =
        events.iter().partition(|e| is_spanning(e));

    let mut spanning = Vec::with_capacity(spanning_events.len());
    for event in spanning_events {
        let first_day = column(event.start, event)?;
        let last_offset = (last_date(event) - window.start.date_naive()).num_days();
        let last_day = usize::try_from(last_offset)
            .unwrap_or(first_day)
            .clamp(first_day, days.len() - 1);
        spanning.push(SpanningBlock {
            event: event.clone(),
            first_day,
            last_day,
        });
    }
    spanning.sort_by_key(|b| (b.first_day, b.event.start, b.last_day));

    let timeline = timeline_for(
        &timed_events.iter().map(|e| (*e).clone()).collect::<Vec<_>>(),
        options,
    );
    let mut by_day: Vec<Vec<CanonicalEvent>> = vec![Vec::new(); days.len()];
    for event in timed_events {
        by_day[column(event.start, event)?].push(event.clone());
    }

    let ppm = f64::from(options.pixels_per_hour) / 60.0;
    let mut timed = Vec::new();
    for (day, day_events) in by_day.into_iter().enumerate() {
        let lanes = assign_lanes(&day_events);
        let lane_count = lanes.iter().max().map_or(1, |m| m + 1);
        for (event, lane) in day_events.into_iter().zip(lanes) {
            let (start_min, end_min) = minute_range(&event);
            let offset = start_min - i64::from(timeline.first_hour) * 60;
            let top_px = (offset.max(0) as f64 * ppm).round() as u32;
            let height_px =
                (((end_min - start_min) as f64 * ppm).round() as u32).max(options.min_block_px);
            timed.push(TimedBlock {
                event,
                day,
                lane,
                lanes: lane_count,
                top_px,
                height_px,
            });
        }
    }
    timed.sort_by_key(|b| (b.day, b.event.start, b.lane));

    Ok(WeekLayout {
        days,
        timeline,
        pixels_per_hour: options.pixels_per_hour,
        spanning,
        timed,
    })
}
