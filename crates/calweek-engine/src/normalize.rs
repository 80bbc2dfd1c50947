//! Event normalization -- raw feed components into canonical events.
//!
//! This is the only place that looks at how a time was written (date, UTC,
//! TZID-qualified or floating). Everything downstream sees one shape: an
//! instant in the reference zone plus a `date_only` flag.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::dst::{localize, start_of_day};
use crate::error::{CalweekError, Result};
use crate::feed::{RawComponent, RawProperty};

const DATE_FORMAT: &str = "%Y%m%d";
const DATETIME_FORMAT: &str = "%Y%m%dT%H%M%S";
const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// A point in time in the reference zone, tagged with how it was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instant {
    pub at: DateTime<Tz>,
    /// The source value had no time-of-day (`VALUE=DATE`).
    pub date_only: bool,
    /// Zone the wall-clock value was expressed in: its TZID, UTC for `Z`
    /// values, or the reference zone for floating times and dates.
    pub source_tz: Tz,
}

/// The normalized unit consumed by expansion, filtering and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalEvent {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub all_day: bool,
    pub summary: String,
    pub location: String,
    pub description: String,
}

impl CanonicalEvent {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

/// Recurrence data attached to an event. Consumed once by the expander.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecurrenceSpec {
    /// Raw RRULE values, one per RRULE property.
    pub rules: Vec<String>,
    /// RDATE instants.
    pub additions: Vec<DateTime<Tz>>,
    /// EXDATE instants.
    pub exclusions: Vec<DateTime<Tz>>,
    /// Zone the rule is evaluated in, so wall-clock time survives DST changes.
    pub anchor_tz: Option<Tz>,
}

impl RecurrenceSpec {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.additions.is_empty()
    }
}

/// Output of [`normalize_component`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub event: CanonicalEvent,
    pub recurrence: Option<RecurrenceSpec>,
    pub uid: Option<String>,
    /// Set on a modified instance of a recurring event: the original start
    /// this component replaces.
    pub recurrence_id: Option<DateTime<Tz>>,
}

/// Normalize one raw component.
///
/// Returns `Ok(None)` for components that are not events. Events whose start
/// is missing or unreadable produce `CalweekError::MalformedEvent`, which
/// callers treat as a per-component skip.
///
/// # Errors
/// Returns `CalweekError::MalformedEvent` when DTSTART is absent or malformed,
/// or when DTEND/DURATION is present but unreadable.
pub fn normalize_component(
    raw: &RawComponent,
    config: &EngineConfig,
) -> Result<Option<NormalizedEvent>> {
    if !raw.is_event() {
        return Ok(None);
    }

    let summary = raw.value("SUMMARY").map(unescape_text).unwrap_or_default();

    let start_prop = raw
        .property("DTSTART")
        .ok_or_else(|| malformed(&summary, "missing DTSTART"))?;
    let start = parse_instant(start_prop, config).map_err(|e| malformed(&summary, &e.to_string()))?;

    let end = match (raw.property("DTEND"), raw.value("DURATION")) {
        (Some(end_prop), _) => {
            let end =
                parse_instant(end_prop, config).map_err(|e| malformed(&summary, &e.to_string()))?;
            end.at
        }
        (None, Some(duration)) => {
            let parsed = parse_duration(duration)
                .ok_or_else(|| malformed(&summary, &format!("bad DURATION '{}'", duration)))?;
            end_after(&start, parsed, config)
                .ok_or_else(|| malformed(&summary, &format!("DURATION '{}' out of range", duration)))?
        }
        (None, None) => {
            let default = if start.date_only {
                config.default_all_day_duration
            } else {
                config.default_timed_duration
            };
            end_after(&start, default, config)
                .ok_or_else(|| malformed(&summary, "default duration out of range"))?
        }
    };
    // An end before the start would break every interval computation downstream.
    let end = end.max(start.at);

    let event = CanonicalEvent {
        start: start.at,
        end,
        all_day: start.date_only,
        summary,
        location: raw.value("LOCATION").map(unescape_text).unwrap_or_default(),
        description: raw
            .value("DESCRIPTION")
            .map(unescape_text)
            .unwrap_or_default(),
    };

    let recurrence = recurrence_spec(raw, &start, config);
    if recurrence.is_some() {
        debug!(summary = %event.summary, "Event carries recurrence data");
    }

    let recurrence_id = match raw.property("RECURRENCE-ID") {
        Some(prop) => match parse_instant(prop, config) {
            Ok(instant) => Some(instant.at),
            Err(e) => {
                warn!(summary = %event.summary, error = %e, "Ignoring unreadable RECURRENCE-ID");
                None
            }
        },
        None => None,
    };

    Ok(Some(NormalizedEvent {
        event,
        recurrence,
        uid: raw.value("UID").map(|v| v.trim().to_string()),
        recurrence_id,
    }))
}

/// `start + duration`, or `None` when the result is not representable.
///
/// Whole days added to a date-only start are calendar days: the end lands on
/// the first instant of the later date even when a DST change falls between.
fn end_after(start: &Instant, duration: Duration, config: &EngineConfig) -> Option<DateTime<Tz>> {
    if start.date_only && duration.num_seconds() % SECONDS_PER_DAY == 0 {
        let date = start
            .at
            .date_naive()
            .checked_add_signed(Duration::try_days(duration.num_days())?)?;
        return start_of_day(config.reference_tz, date);
    }
    start.at.checked_add_signed(duration)
}

fn malformed(summary: &str, reason: &str) -> CalweekError {
    let name = if summary.is_empty() { "(untitled)" } else { summary };
    CalweekError::MalformedEvent(format!("{}: {}", name, reason))
}

fn recurrence_spec(
    raw: &RawComponent,
    start: &Instant,
    config: &EngineConfig,
) -> Option<RecurrenceSpec> {
    let rules: Vec<String> = raw
        .properties_named("RRULE")
        .filter_map(|p| p.value.as_deref())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();

    let additions = date_list(raw, "RDATE", config);
    let exclusions = date_list(raw, "EXDATE", config);

    let spec = RecurrenceSpec {
        rules,
        additions,
        exclusions,
        anchor_tz: Some(start.source_tz),
    };
    (!spec.is_empty()).then_some(spec)
}

/// Collect every instant listed by the named multi-valued date property.
/// Unreadable entries are dropped with a warning.
fn date_list(raw: &RawComponent, name: &str, config: &EngineConfig) -> Vec<DateTime<Tz>> {
    let mut out = Vec::new();
    for prop in raw.properties_named(name) {
        let Some(value) = prop.value.as_deref() else {
            continue;
        };
        for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            // PERIOD values (start/end or start/duration) contribute their start.
            let item = item.split('/').next().unwrap_or(item);
            match parse_value(item, prop, config) {
                Ok(instant) => out.push(instant.at),
                Err(e) => warn!(property = name, value = item, error = %e, "Ignoring unreadable date"),
            }
        }
    }
    out
}

/// Parse a DTSTART/DTEND-style property into an [`Instant`].
///
/// # Errors
/// Returns `CalweekError::MalformedEvent` if the property has no value or the
/// value is neither `YYYYMMDD` nor `YYYYMMDDTHHMMSS[Z]`.
pub fn parse_instant(prop: &RawProperty, config: &EngineConfig) -> Result<Instant> {
    let value = prop
        .value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CalweekError::MalformedEvent(format!("{} has no value", prop.name)))?;
    parse_value(value, prop, config)
}

fn parse_value(value: &str, prop: &RawProperty, config: &EngineConfig) -> Result<Instant> {
    let reference = config.reference_tz;
    let bad = || CalweekError::MalformedEvent(format!("{} value '{}' is malformed", prop.name, value));

    let date_only = prop
        .param("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
        || (value.len() == 8 && value.chars().all(|c| c.is_ascii_digit()));

    if date_only {
        let date = NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| bad())?;
        let at = start_of_day(reference, date).ok_or_else(bad)?;
        return Ok(Instant {
            at,
            date_only: true,
            source_tz: reference,
        });
    }

    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, DATETIME_FORMAT).map_err(|_| bad())?;
        return Ok(Instant {
            at: chrono_tz::UTC.from_utc_datetime(&naive).with_timezone(&reference),
            date_only: false,
            source_tz: chrono_tz::UTC,
        });
    }

    let naive = NaiveDateTime::parse_from_str(value, DATETIME_FORMAT).map_err(|_| bad())?;
    let source_tz = match prop.param("TZID") {
        Some(tzid) => resolve_tzid(tzid).unwrap_or_else(|| {
            warn!(tzid, fallback = reference.name(), "Unknown TZID, using reference zone");
            reference
        }),
        None => reference,
    };
    let at = localize(source_tz, naive, config.dst_policy)
        .ok_or_else(bad)?
        .with_timezone(&reference);
    Ok(Instant {
        at,
        date_only: false,
        source_tz,
    })
}

/// Map a TZID parameter to an IANA zone. Some producers prefix the name with
/// a `/` or a vendor path (`/mozilla.org/20050126_1/Europe/Berlin`).
fn resolve_tzid(tzid: &str) -> Option<Tz> {
    let tzid = tzid.trim();
    if let Ok(tz) = tzid.parse::<Tz>() {
        return Some(tz);
    }
    let segments: Vec<&str> = tzid.split('/').filter(|s| !s.is_empty()).collect();
    (0..segments.len()).find_map(|i| segments[i..].join("/").parse::<Tz>().ok())
}

/// Parse an RFC 5545 `dur-value` such as `PT1H30M`, `P1D` or `P2W`.
/// Negative durations and values too large for a `Duration` are rejected.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    let value = value.strip_prefix('+').unwrap_or(value);
    let rest = value.strip_prefix('P')?;

    let mut total = Duration::zero();
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;

    for c in rest.chars() {
        match c {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' => number.push(c),
            unit => {
                let n: i64 = number.parse().ok()?;
                number.clear();
                let part = match (unit, in_time) {
                    ('W', false) => Duration::try_weeks(n)?,
                    ('D', false) => Duration::try_days(n)?,
                    ('H', true) => Duration::try_hours(n)?,
                    ('M', true) => Duration::try_minutes(n)?,
                    ('S', true) => Duration::try_seconds(n)?,
                    _ => return None,
                };
                total = total.checked_add(&part)?;
                saw_component = true;
            }
        }
    }

    (saw_component && number.is_empty()).then_some(total)
}

/// Undo iCalendar TEXT escaping (`\n`, `\,`, `\;`, `\\`).
pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out.trim().to_string()
}
