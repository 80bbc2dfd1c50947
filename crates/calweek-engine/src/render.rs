//! HTML rendering: a seven-column week grid and a chronological list.
//!
//! Output is a complete standalone document with embedded, fixed CSS. All
//! feed-supplied text goes through [`html_escape`].

use std::fmt::Write;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

use crate::layout::{LayoutOptions, SpanningBlock, TimedBlock, WeekLayout};
use crate::normalize::CanonicalEvent;
use crate::window::DisplayWindow;

const UNTITLED: &str = "(No title)";

const WEEK_CSS: &str = r#"
  body{ font-family: -apple-system, "Helvetica Neue", Arial, sans-serif; margin:12px; color:#222; }
  h1{ font-size:18px; margin:0 0 4px 0; }
  .range{ font-size:12px; color:#666; margin-bottom:10px; }
  .week{ display:grid; grid-template-columns:48px repeat(7, minmax(0, 1fr)); column-gap:2px; }
  .dayhead{ font-size:12px; font-weight:600; text-align:center; padding:4px 0; border-bottom:1px solid #ccc; }
  .allday{ font-size:11px; background:#e3ecfa; border-left:3px solid #4a78c2; margin:1px 0; padding:2px 4px; overflow:hidden; white-space:nowrap; text-overflow:ellipsis; }
  .hours{ position:relative; }
  .hour{ position:absolute; right:4px; font-size:10px; color:#888; }
  .day{ position:relative; border-left:1px solid #eee; background:repeating-linear-gradient(#fff, #fff calc(var(--hour) - 1px), #f0f0f0 calc(var(--hour) - 1px), #f0f0f0 var(--hour)); }
  .event{ position:absolute; box-sizing:border-box; font-size:11px; background:#fdf0d5; border-left:3px solid #d99a1e; padding:1px 3px; overflow:hidden; }
  .event .time{ color:#555; }
  .event .loc{ color:#666; font-style:italic; }
  .empty{ color:#666; font-size:14px; padding:24px 0; text-align:center; }
"#;

const LIST_CSS: &str = r#"
  body{ font-family: -apple-system, "Helvetica Neue", Arial; padding:10px; max-width:420px; }
  h1{ font-size:18px; margin:0 0 8px 0; }
  .event{ padding:8px 6px; border-bottom:1px solid #ddd; }
  .time{ font-size:12px; color:#444; }
  .title{ font-size:15px; margin-top:4px; }
  .desc{ font-size:12px; color:#333; margin-top:6px; white-space:pre-wrap; }
  .muted{ color:#666; font-size:12px; }
"#;

/// Page-level settings shared by both views.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub title: String,
    /// Cap on list-view entries.
    pub max_events: usize,
    /// `meta refresh` interval; zero disables it.
    pub refresh_secs: u32,
    pub layout: LayoutOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "My Calendar".to_string(),
            max_events: 50,
            refresh_secs: 6 * 60 * 60,
            layout: LayoutOptions::default(),
        }
    }
}

/// Escapes text for HTML display.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

fn title_of(event: &CanonicalEvent) -> &str {
    if event.summary.is_empty() {
        UNTITLED
    } else {
        &event.summary
    }
}

fn head(title: &str, css: &str, viewport: &str, refresh_secs: u32) -> String {
    let mut out = String::new();
    out.push_str("<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<meta name=\"viewport\" content=\"{}\">", viewport);
    if refresh_secs > 0 {
        let _ = writeln!(out, "<meta http-equiv=\"refresh\" content=\"{}\">", refresh_secs);
    }
    let _ = writeln!(out, "<title>{}</title>", html_escape(title));
    let _ = writeln!(out, "<style>{}</style>", css);
    out.push_str("</head>\n<body>\n");
    out
}

const FOOT: &str = "</body>\n</html>\n";

fn hm(dt: DateTime<Tz>) -> String {
    dt.format("%H:%M").to_string()
}

fn timed_block_html(block: &TimedBlock) -> String {
    let e = &block.event;
    let mut out = String::new();
    let _ = write!(
        out,
        "<div class=\"event\" data-lane=\"{}\" style=\"top:{}px;height:{}px;left:{:.4}%;width:{:.4}%\"",
        block.lane,
        block.top_px,
        block.height_px,
        block.left_percent(),
        block.width_percent()
    );
    if !e.description.is_empty() {
        let _ = write!(out, " title=\"{}\"", html_escape(&e.description));
    }
    let _ = write!(
        out,
        "><span class=\"time\">{}–{}</span> {}",
        hm(e.start),
        hm(e.end),
        html_escape(title_of(e))
    );
    if !e.location.is_empty() {
        let _ = write!(out, "<div class=\"loc\">{}</div>", html_escape(&e.location));
    }
    out.push_str("</div>");
    out
}

fn spanning_block_html(block: &SpanningBlock) -> String {
    let e = &block.event;
    let label = if e.all_day {
        html_escape(title_of(e))
    } else {
        format!(
            "{} {}–{} {}",
            e.start.format("%a"),
            hm(e.start),
            hm(e.end),
            html_escape(title_of(e))
        )
    };
    let tooltip = if e.location.is_empty() {
        String::new()
    } else {
        format!(" title=\"{}\"", html_escape(&e.location))
    };
    // Column 1 holds the hour labels, so day N sits in grid column N + 2.
    format!(
        "<div class=\"allday\" style=\"grid-column:{} / {}\"{}>{}</div>",
        block.first_day + 2,
        block.last_day + 3,
        tooltip,
        label
    )
}

/// Render the week grid.
///
/// An empty layout renders the day headers followed by an explicit
/// "No events this week." message instead of an empty grid.
pub fn render_week(layout: &WeekLayout, window: &DisplayWindow, options: &RenderOptions) -> String {
    let mut out = head(&options.title, WEEK_CSS, "width=device-width", options.refresh_secs);
    let _ = writeln!(out, "<h1>{}</h1>", html_escape(&options.title));
    let _ = writeln!(
        out,
        "<div class=\"range\">{} – {}</div>",
        window.start.format("%a %-d %b %Y"),
        window.end.format("%a %-d %b %Y")
    );

    out.push_str("<div class=\"week\">\n<div></div>\n");
    for day in &layout.days {
        let _ = writeln!(out, "<div class=\"dayhead\">{}</div>", day.format("%a %-d %b"));
    }
    out.push_str("</div>\n");

    if layout.is_empty() {
        out.push_str("<p class=\"empty\">No events this week.</p>\n");
        out.push_str(FOOT);
        return out;
    }

    if !layout.spanning.is_empty() {
        out.push_str("<div class=\"week\">\n");
        for block in &layout.spanning {
            out.push_str(&spanning_block_html(block));
            out.push('\n');
        }
        out.push_str("</div>\n");
    }

    let height = layout.height_px();
    let _ = writeln!(
        out,
        "<div class=\"week\" style=\"--hour:{}px\">",
        layout.pixels_per_hour
    );
    let _ = writeln!(out, "<div class=\"hours\" style=\"height:{}px\">", height);
    for (i, hour) in layout.timeline.hours().enumerate() {
        let _ = writeln!(
            out,
            "<div class=\"hour\" style=\"top:{}px\">{:02}:00</div>",
            i as u32 * layout.pixels_per_hour,
            hour
        );
    }
    out.push_str("</div>\n");
    for day in 0..layout.days.len() {
        let _ = writeln!(out, "<div class=\"day\" style=\"height:{}px\">", height);
        for block in layout.timed.iter().filter(|b| b.day == day) {
            out.push_str(&timed_block_html(block));
            out.push('\n');
        }
        out.push_str("</div>\n");
    }
    out.push_str("</div>\n");
    out.push_str(FOOT);
    out
}

fn list_time(event: &CanonicalEvent) -> String {
    if event.all_day {
        let last = if event.end > event.start {
            event.end - Duration::days(1)
        } else {
            event.end
        };
        if last.date_naive() > event.start.date_naive() {
            format!("{} → {}", event.start.format("%Y-%m-%d"), last.format("%Y-%m-%d"))
        } else {
            event.start.format("%Y-%m-%d").to_string()
        }
    } else {
        format!(
            "{} → {}",
            event.start.format("%Y-%m-%d %H:%M"),
            event.end.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Render a chronological list of at most `options.max_events` events.
/// Callers pass events already sorted by start.
pub fn render_list(events: &[CanonicalEvent], options: &RenderOptions) -> String {
    let mut out = head(&options.title, LIST_CSS, "width=420", options.refresh_secs);
    out.push_str("<h1>Upcoming</h1>\n<div id=\"events\">\n");

    if events.is_empty() {
        out.push_str("<p class='muted'>No events found.</p>\n");
    }
    for event in events.iter().take(options.max_events) {
        let _ = write!(
            out,
            "<div class='event'><div class='time'>{}</div><div class='title'>{}</div>",
            html_escape(&list_time(event)),
            html_escape(title_of(event))
        );
        let mut extras = String::new();
        if !event.location.is_empty() {
            let _ = write!(extras, "Location: {}", event.location);
        }
        if !event.description.is_empty() {
            if !extras.is_empty() {
                extras.push_str("\n\n");
            }
            extras.push_str(&event.description);
        }
        if !extras.is_empty() {
            let _ = write!(out, "<div class='desc'>{}</div>", html_escape(&extras));
        }
        out.push_str("</div>\n");
    }

    out.push_str("</div>\n");
    out.push_str(FOOT);
    out
}
