//! Tests for lane assignment and week layout.

use chrono::{DateTime, NaiveDate, TimeZone};
use chrono_tz::Tz;
use calweek_engine::layout::{overlaps, timeline_for, Timeline};
use calweek_engine::{
    assign_lanes, layout_week, CalweekError, CanonicalEvent, DisplayWindow, EngineConfig,
    LayoutOptions,
};

fn at(d: u32, h: u32, m: u32) -> DateTime<Tz> {
    chrono_tz::UTC.with_ymd_and_hms(2026, 6, d, h, m, 0).unwrap()
}

/// Helper to create an event from hour ranges on a given June day.
fn event(day: u32, start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> CanonicalEvent {
    CanonicalEvent {
        start: at(day, start_hour, start_min),
        end: at(day, end_hour, end_min),
        all_day: false,
        summary: format!("{:02}:{:02}", start_hour, start_min),
        location: String::new(),
        description: String::new(),
    }
}

fn all_day(first: u32, days: i64) -> CanonicalEvent {
    let start = at(first, 0, 0);
    CanonicalEvent {
        start,
        end: start + chrono::Duration::days(days),
        all_day: true,
        summary: "Trip".to_string(),
        location: String::new(),
        description: String::new(),
    }
}

fn june_week() -> DisplayWindow {
    let config = EngineConfig::new(chrono_tz::UTC);
    DisplayWindow::days_from(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(), 7, &config).unwrap()
}

// ---------------------------------------------------------------------------
// Lanes
// ---------------------------------------------------------------------------

#[test]
fn overlapping_events_get_separate_lanes() {
    let events = vec![event(2, 9, 0, 10, 0), event(2, 9, 30, 10, 30)];
    assert_eq!(assign_lanes(&events), vec![0, 1]);
}

#[test]
fn adjacent_events_share_a_lane() {
    let events = vec![event(2, 9, 0, 10, 0), event(2, 10, 0, 11, 0)];
    assert_eq!(assign_lanes(&events), vec![0, 0]);
    assert!(!overlaps(&events[0], &events[1]));
}

#[test]
fn freed_lane_is_reused_first_fit() {
    // A 09-10, B 09:30-10:30, C 10-11 → C fits back into lane 0.
    let events = vec![event(2, 9, 0, 10, 0), event(2, 9, 30, 10, 30), event(2, 10, 0, 11, 0)];
    assert_eq!(assign_lanes(&events), vec![0, 1, 0]);
}

#[test]
fn lanes_follow_input_order_regardless_of_sorting() {
    let events = vec![event(2, 10, 0, 11, 0), event(2, 9, 0, 12, 0), event(2, 9, 0, 9, 30)];
    // Sorted by (start, end): 09:00-09:30 → 0, 09:00-12:00 → 1, 10:00-11:00 → 0.
    assert_eq!(assign_lanes(&events), vec![0, 1, 0]);
}

#[test]
fn no_events_no_lanes() {
    assert!(assign_lanes(&[]).is_empty());
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

#[test]
fn timeline_rounds_outward_with_padding() {
    let t = timeline_for(
        &[event(2, 7, 45, 8, 15), event(4, 15, 0, 16, 10)],
        &LayoutOptions::default(),
    );
    assert_eq!(t, Timeline { first_hour: 7, last_hour: 18 });
}

#[test]
fn timeline_default_range_is_configurable() {
    let options = LayoutOptions {
        default_hours: (6, 20),
        ..LayoutOptions::default()
    };
    assert_eq!(timeline_for(&[], &options), Timeline { first_hour: 6, last_hour: 20 });
}

// ---------------------------------------------------------------------------
// layout_week
// ---------------------------------------------------------------------------

#[test]
fn blocks_positioned_on_the_timeline() {
    let events = vec![event(2, 9, 0, 10, 0), event(2, 11, 30, 12, 0)];
    let layout = layout_week(&events, &june_week(), &LayoutOptions::default()).unwrap();

    assert_eq!(layout.timeline, Timeline { first_hour: 9, last_hour: 13 });
    assert_eq!(layout.timed.len(), 2);
    assert_eq!(layout.timed[0].day, 1);
    assert_eq!((layout.timed[0].top_px, layout.timed[0].height_px), (0, 48));
    assert_eq!((layout.timed[1].top_px, layout.timed[1].height_px), (120, 24));
    assert_eq!(layout.height_px(), 4 * 48);
}

#[test]
fn short_blocks_have_minimum_height() {
    let layout = layout_week(&[event(3, 9, 0, 9, 5)], &june_week(), &LayoutOptions::default())
        .unwrap();
    assert_eq!(layout.timed[0].height_px, 18);
}

#[test]
fn lane_counts_are_per_day() {
    let events = vec![
        event(2, 9, 0, 10, 0),
        event(2, 9, 0, 10, 0),
        event(2, 9, 0, 10, 0),
        event(3, 9, 0, 10, 0),
    ];
    let layout = layout_week(&events, &june_week(), &LayoutOptions::default()).unwrap();
    let tuesday: Vec<_> = layout.timed.iter().filter(|b| b.day == 1).collect();
    let wednesday: Vec<_> = layout.timed.iter().filter(|b| b.day == 2).collect();
    assert!(tuesday.iter().all(|b| b.lanes == 3));
    assert_eq!(wednesday[0].lanes, 1);
    assert_eq!(wednesday[0].width_percent(), 100.0);
}

#[test]
fn all_day_and_overnight_events_span_columns() {
    let overnight = CanonicalEvent {
        start: at(5, 22, 0),
        end: at(6, 2, 0),
        ..event(5, 22, 0, 23, 0)
    };
    let events = vec![all_day(2, 1), all_day(3, 3), overnight];
    let layout = layout_week(&events, &june_week(), &LayoutOptions::default()).unwrap();

    assert!(layout.timed.is_empty());
    let spans: Vec<(usize, usize)> = layout.spanning.iter().map(|b| (b.first_day, b.last_day)).collect();
    assert_eq!(spans, vec![(1, 1), (2, 4), (4, 5)]);
    assert_eq!(layout.timeline, Timeline { first_hour: 8, last_hour: 17 });
}

#[test]
fn event_outside_window_is_a_render_error() {
    let stray = event(9, 9, 0, 10, 0);
    let err = layout_week(&[stray], &june_week(), &LayoutOptions::default()).unwrap_err();
    assert!(matches!(err, CalweekError::Render(_)));
}

#[test]
fn empty_layout() {
    let layout = layout_week(&[], &june_week(), &LayoutOptions::default()).unwrap();
    assert!(layout.is_empty());
    assert_eq!(layout.days.len(), 7);
}
