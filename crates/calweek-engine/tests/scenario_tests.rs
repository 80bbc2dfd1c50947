//! End-to-end scenarios: feed text → selection → layout → HTML.

use chrono::{DateTime, FixedOffset, TimeZone};
use chrono_tz::Tz;
use calweek_engine::{
    layout_week, parse_feed, render_list, render_week, select_events, DisplayWindow,
    EngineConfig, RenderOptions, Selection,
};

/// Wednesday 2026-06-03 12:00 UTC; the window is Monday 06-01 .. Sunday 06-07.
fn now() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-06-03T12:00:00Z").unwrap()
}

fn utc(d: u32, h: u32, m: u32) -> DateTime<Tz> {
    chrono_tz::UTC.with_ymd_and_hms(2026, 6, d, h, m, 0).unwrap()
}

fn feed(events: &[&[&str]]) -> String {
    let mut lines = vec!["BEGIN:VCALENDAR", "VERSION:2.0", "PRODID:-//calweek//tests//EN"];
    for event in events {
        lines.push("BEGIN:VEVENT");
        lines.extend_from_slice(event);
        lines.push("END:VEVENT");
    }
    lines.push("END:VCALENDAR");
    lines.join("\r\n")
}

fn select(ics: &str) -> Selection {
    let config = EngineConfig::new(chrono_tz::UTC);
    let window = DisplayWindow::current_week(now(), &config).unwrap();
    let components = parse_feed(ics).expect("fixture must parse");
    select_events(&components, &window, &config)
}

fn week_html(selection: &Selection) -> String {
    let options = RenderOptions::default();
    let layout = layout_week(&selection.events, &selection.window, &options.layout).unwrap();
    render_week(&layout, &selection.window, &options)
}

// ---------------------------------------------------------------------------
// Scenario A: one timed event inside the window
// ---------------------------------------------------------------------------

#[test]
fn single_event_inside_window_renders_one_block() {
    let ics = feed(&[&[
        "UID:a@example.com",
        "SUMMARY:Design review",
        "DTSTART:20260602T090000Z",
        "DTEND:20260602T100000Z",
    ]]);
    let selection = select(&ics);

    assert_eq!(selection.events.len(), 1);
    assert_eq!(selection.events[0].start, utc(2, 9, 0));
    assert_eq!(selection.events[0].end, utc(2, 10, 0));

    let html = week_html(&selection);
    assert_eq!(html.matches("<div class=\"event\"").count(), 1);
    assert!(html.contains("09:00–10:00"));
    assert!(html.contains("Design review"));
}

// ---------------------------------------------------------------------------
// Scenario B: event crossing the window start is clamped
// ---------------------------------------------------------------------------

#[test]
fn event_crossing_window_start_is_clamped() {
    let ics = feed(&[&[
        "SUMMARY:Conference",
        "DTSTART:20260530T090000Z",
        "DTEND:20260603T090000Z",
    ]]);
    let selection = select(&ics);

    assert_eq!(selection.events.len(), 1);
    assert_eq!(selection.events[0].start, selection.window.start);
    assert_eq!(selection.events[0].end, utc(3, 9, 0));

    let html = week_html(&selection);
    assert_eq!(html.matches("<div class=\"allday\"").count(), 1);
    assert!(html.contains("grid-column:2 / 5"), "spans Monday..Wednesday");
}

// ---------------------------------------------------------------------------
// Scenario C: weekly event with one exclusion
// ---------------------------------------------------------------------------

#[test]
fn weekly_event_with_exclusion_loses_one_occurrence() {
    let base: &[&str] = &[
        "UID:c@example.com",
        "SUMMARY:Gym",
        "DTSTART:20260302T070000Z",
        "DTEND:20260302T080000Z",
        "RRULE:FREQ=WEEKLY;BYDAY=MO,WE,FR",
    ];
    let unconstrained = select(&feed(&[base]));
    assert_eq!(unconstrained.events.len(), 3);

    let mut with_exdate = base.to_vec();
    with_exdate.push("EXDATE:20260603T070000Z");
    let selection = select(&feed(&[&with_exdate]));

    assert_eq!(selection.events.len(), 2);
    let starts: Vec<_> = selection.events.iter().map(|e| e.start).collect();
    assert_eq!(starts, vec![utc(1, 7, 0), utc(5, 7, 0)]);
    assert_eq!(selection.stats.recurring, 1);
    assert_eq!(selection.stats.fallbacks, 0);
}

// ---------------------------------------------------------------------------
// Scenario D: empty feed
// ---------------------------------------------------------------------------

#[test]
fn empty_feed_renders_no_events_indicator() {
    let selection = select(&feed(&[]));
    assert!(selection.events.is_empty());

    let html = week_html(&selection);
    assert!(html.contains("No events this week."));
    assert!(!html.contains("<div class=\"event\""));
    assert!(html.ends_with("</html>\n"));

    let list = render_list(&selection.events, &RenderOptions::default());
    assert!(list.contains("No events found."));
}

// ---------------------------------------------------------------------------
// Scenario E: fully overlapping events get separate lanes
// ---------------------------------------------------------------------------

#[test]
fn overlapping_events_render_side_by_side() {
    let ics = feed(&[
        &["SUMMARY:First", "DTSTART:20260604T140000Z", "DTEND:20260604T150000Z"],
        &["SUMMARY:Second", "DTSTART:20260604T140000Z", "DTEND:20260604T150000Z"],
    ]);
    let selection = select(&ics);
    let options = RenderOptions::default();
    let layout = layout_week(&selection.events, &selection.window, &options.layout).unwrap();

    assert_eq!(layout.timed.len(), 2);
    let (a, b) = (&layout.timed[0], &layout.timed[1]);
    assert_ne!(a.lane, b.lane);
    let (left, right) = if a.lane < b.lane { (a, b) } else { (b, a) };
    assert!(left.left_percent() + left.width_percent() <= right.left_percent());

    let html = render_week(&layout, &selection.window, &options);
    assert!(html.contains("left:0.0000%;width:50.0000%"));
    assert!(html.contains("left:50.0000%;width:50.0000%"));
}

// ---------------------------------------------------------------------------
// Pipeline behaviour
// ---------------------------------------------------------------------------

#[test]
fn malformed_components_are_skipped_not_fatal() {
    let ics = feed(&[
        &["SUMMARY:No start"],
        &["SUMMARY:Bad start", "DTSTART:tomorrow"],
        &["SUMMARY:Fine", "DTSTART:20260605T120000Z"],
    ]);
    let selection = select(&ics);
    assert_eq!(selection.stats.events, 3);
    assert_eq!(selection.stats.skipped, 2);
    assert_eq!(selection.events.len(), 1);
    assert_eq!(selection.events[0].summary, "Fine");
}

#[test]
fn out_of_range_duration_skips_only_that_event() {
    let ics = feed(&[
        &["SUMMARY:Forever", "DTSTART:20260602T090000Z", "DURATION:P99999999D"],
        &["SUMMARY:Fine", "DTSTART:20260602T100000Z", "DURATION:PT30M"],
    ]);
    let selection = select(&ics);
    assert_eq!(selection.stats.skipped, 1);
    assert_eq!(selection.events.len(), 1);
    assert_eq!(selection.events[0].summary, "Fine");
}

#[test]
fn all_day_rule_with_date_until_expands() {
    let ics = feed(&[&[
        "SUMMARY:Trip",
        "DTSTART;VALUE=DATE:20260525",
        "RRULE:FREQ=DAILY;UNTIL=20260604",
    ]]);
    let selection = select(&ics);
    assert_eq!(selection.stats.fallbacks, 0);
    assert!(selection.events.iter().all(|e| e.all_day));
    // Sunday's occurrence ends exactly at the window start and is kept at
    // zero length; only whole days are counted here.
    let days: Vec<_> = selection
        .events
        .iter()
        .filter(|e| e.end > e.start)
        .map(|e| e.start)
        .collect();
    assert_eq!(days, vec![utc(1, 0, 0), utc(2, 0, 0), utc(3, 0, 0), utc(4, 0, 0)]);
}

#[test]
fn unusable_rule_shows_event_once() {
    let ics = feed(&[&[
        "SUMMARY:Odd rule",
        "DTSTART:20260602T120000Z",
        "RRULE:FREQ=FORTNIGHTLY",
    ]]);
    let selection = select(&ics);
    assert_eq!(selection.stats.fallbacks, 1);
    assert_eq!(selection.events.len(), 1);
    assert_eq!(selection.events[0].start, utc(2, 12, 0));
}

#[test]
fn recurring_occurrence_started_before_window_is_clamped_in() {
    // Weekly Sunday 22:00 → Monday 02:00; last Sunday's occurrence runs into the window.
    let ics = feed(&[&[
        "SUMMARY:Night shift",
        "DTSTART:20260503T220000Z",
        "DTEND:20260504T020000Z",
        "RRULE:FREQ=WEEKLY",
    ]]);
    let selection = select(&ics);
    let starts: Vec<_> = selection.events.iter().map(|e| e.start).collect();
    assert_eq!(starts, vec![selection.window.start, utc(7, 22, 0)]);
    assert_eq!(selection.events[0].end, utc(1, 2, 0));
    assert_eq!(selection.events[1].end, selection.window.end);
}

#[test]
fn modified_instance_replaces_master_occurrence() {
    let ics = feed(&[
        &[
            "UID:standup@example.com",
            "SUMMARY:Standup",
            "DTSTART:20260504T130000Z",
            "DTEND:20260504T131500Z",
            "RRULE:FREQ=WEEKLY;BYDAY=MO,TH",
        ],
        &[
            "UID:standup@example.com",
            "RECURRENCE-ID:20260604T130000Z",
            "SUMMARY:Standup (moved)",
            "DTSTART:20260604T160000Z",
            "DTEND:20260604T161500Z",
        ],
    ]);
    let selection = select(&ics);
    let summary: Vec<(&str, DateTime<Tz>)> = selection
        .events
        .iter()
        .map(|e| (e.summary.as_str(), e.start))
        .collect();
    assert_eq!(
        summary,
        vec![("Standup", utc(1, 13, 0)), ("Standup (moved)", utc(4, 16, 0))]
    );
}

#[test]
fn several_feeds_are_concatenated_without_dedup() {
    let one = feed(&[&["SUMMARY:Shared", "DTSTART:20260603T100000Z"]]);
    let config = EngineConfig::new(chrono_tz::UTC);
    let window = DisplayWindow::current_week(now(), &config).unwrap();
    let mut components = parse_feed(&one).unwrap();
    components.extend(parse_feed(&one).unwrap());
    let selection = select_events(&components, &window, &config);
    assert_eq!(selection.events.len(), 2);
}

#[test]
fn feed_text_is_escaped_in_output() {
    let ics = feed(&[&[
        "SUMMARY:<script>alert(1)</script> & co",
        r"LOCATION:Room <b>7</b>",
        "DTSTART:20260602T090000Z",
    ]]);
    let selection = select(&ics);
    let html = week_html(&selection);
    assert!(!html.contains("<script>"));
    assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; co"));
    assert!(html.contains("Room &lt;b&gt;7&lt;/b&gt;"));

    let list = render_list(&selection.events, &RenderOptions::default());
    assert!(!list.contains("<script>"));
}

#[test]
fn list_view_is_chronological_and_capped() {
    let ics = feed(&[
        &["SUMMARY:Later", "DTSTART:20260605T090000Z"],
        &["SUMMARY:Earlier", "DTSTART:20260602T090000Z"],
        &["SUMMARY:Holiday", "DTSTART;VALUE=DATE:20260603"],
    ]);
    let selection = select(&ics);
    let options = RenderOptions {
        max_events: 2,
        ..RenderOptions::default()
    };
    let html = render_list(&selection.events, &options);
    let earlier = html.find("Earlier").unwrap();
    let holiday = html.find("Holiday").unwrap();
    assert!(earlier < holiday);
    assert!(!html.contains("Later"));
    assert!(html.contains("2026-06-02 09:00 → 2026-06-02 10:00"));
    assert!(html.contains("<div class='time'>2026-06-03</div>"));
}
