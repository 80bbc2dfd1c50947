//! RRULE expansion -- turns a recurring event into the concrete occurrences
//! that start inside a display window.
//!
//! Wraps the `rrule` crate so the feed's own RFC 5545 grammar is evaluated
//! directly. RDATE and EXDATE are applied here on normalized instants, so an
//! exclusion matches exactly when it names the same instant as an occurrence.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::warn;

use crate::dst::{localize, start_of_day, DstPolicy};
use crate::error::{CalweekError, Result};
use crate::normalize::{CanonicalEvent, RecurrenceSpec};
use crate::window::DisplayWindow;

/// Upper bound on occurrences generated for one event and one window. A week
/// at minute resolution (10 080) fits comfortably.
const MAX_OCCURRENCES: u16 = u16::MAX;

/// Keywords of the RFC 5545 `recur` value.
const RULE_KEYWORDS: &[&str] = &[
    "FREQ", "UNTIL", "COUNT", "INTERVAL", "BYSECOND", "BYMINUTE", "BYHOUR", "BYDAY",
    "BYMONTHDAY", "BYYEARDAY", "BYWEEKNO", "BYMONTH", "BYSETPOS", "WKST", "RSCALE", "SKIP",
];

/// Result of [`expand_or_single`].
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub occurrences: Vec<CanonicalEvent>,
    /// The rule could not be evaluated and the source event was used as-is.
    pub fell_back: bool,
}

/// Expand a recurring event into occurrences whose start lies in
/// `[window.start, window.end]`, both bounds inclusive.
///
/// The rule set is the RRULE sequence (or the event's own start when only
/// RDATEs are given), plus RDATE instants in the window, minus EXDATE
/// instants. Each occurrence keeps the source event's duration. Results are
/// sorted by start and contain no duplicate starts.
///
/// # Errors
/// Returns `CalweekError::InvalidRule` if an RRULE cannot be parsed or
/// validated by the `rrule` crate.
pub fn expand_occurrences(
    event: &CanonicalEvent,
    spec: &RecurrenceSpec,
    window: &DisplayWindow,
) -> Result<Vec<CanonicalEvent>> {
    let reference = event.start.timezone();
    let in_window = |dt: &DateTime<Tz>| window.contains(*dt);

    let mut starts: Vec<DateTime<Tz>> = if spec.rules.is_empty() {
        vec![event.start]
    } else {
        rule_starts(event, spec, window)?
    };
    starts.retain(in_window);
    starts.extend(spec.additions.iter().filter(|dt| in_window(*dt)).copied());
    starts.retain(|dt| !spec.exclusions.contains(dt));

    starts.sort();
    starts.dedup();

    let duration = event.duration();
    Ok(starts
        .into_iter()
        .filter_map(|start| {
            let start = start.with_timezone(&reference);
            Some(CanonicalEvent {
                start,
                end: start.checked_add_signed(duration)?,
                ..event.clone()
            })
        })
        .collect())
}

/// Like [`expand_occurrences`], but a rule that cannot be evaluated degrades
/// to the single source event instead of failing.
pub fn expand_or_single(
    event: &CanonicalEvent,
    spec: &RecurrenceSpec,
    window: &DisplayWindow,
) -> Expansion {
    match expand_occurrences(event, spec, window) {
        Ok(occurrences) => Expansion {
            occurrences,
            fell_back: false,
        },
        Err(e) => {
            warn!(
                summary = %event.summary,
                error = %e,
                "Unusable recurrence rule, showing the event once"
            );
            Expansion {
                occurrences: vec![event.clone()],
                fell_back: true,
            }
        }
    }
}

/// Run the RRULEs and return raw starts near the window (not yet trimmed).
fn rule_starts(
    event: &CanonicalEvent,
    spec: &RecurrenceSpec,
    window: &DisplayWindow,
) -> Result<Vec<DateTime<Tz>>> {
    let reference = event.start.timezone();
    let anchor_tz = spec.anchor_tz.unwrap_or(reference);
    let rrule_text = rrule_text(event.start, anchor_tz, &spec.rules)?;

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| CalweekError::InvalidRule(format!("{}", e)))?;

    // Pad by a second on each side; the window check afterwards is authoritative.
    let after = (window.start - Duration::seconds(1)).with_timezone(&rrule::Tz::UTC);
    let before = (window.end + Duration::seconds(1)).with_timezone(&rrule::Tz::UTC);
    let result = rrule_set.after(after).before(before).all(MAX_OCCURRENCES);
    if result.limited {
        warn!(
            summary = %event.summary,
            limit = MAX_OCCURRENCES,
            "Occurrence limit reached, later occurrences are not shown"
        );
    }

    Ok(result
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&Utc).with_timezone(&reference))
        .collect())
}

/// Build the iCalendar text block the `rrule` crate parses: a DTSTART line in
/// the anchor zone followed by one RRULE line per rule.
fn rrule_text(start: DateTime<Tz>, anchor_tz: Tz, rules: &[String]) -> Result<String> {
    let dtstart = if anchor_tz == chrono_tz::UTC {
        format!("DTSTART:{}Z", start.with_timezone(&Utc).format("%Y%m%dT%H%M%S"))
    } else {
        format!(
            "DTSTART;TZID={}:{}",
            anchor_tz.name(),
            start.with_timezone(&anchor_tz).format("%Y%m%dT%H%M%S")
        )
    };

    let mut text = dtstart;
    for rule in rules {
        let rule = sanitize_rule(rule);
        if rule.is_empty() {
            return Err(CalweekError::InvalidRule("empty RRULE string".to_string()));
        }
        text.push_str("\nRRULE:");
        text.push_str(&utc_until(&rule, anchor_tz));
    }
    Ok(text)
}

/// Rewrite a DATE or floating UNTIL as a UTC instant, which `rrule` requires
/// whenever DTSTART is zoned. Both forms are read in the anchor zone, and a
/// DATE covers its whole day. Anything else is left for the parser to judge.
fn utc_until(rule: &str, anchor_tz: Tz) -> String {
    rule.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.trim().eq_ignore_ascii_case("UNTIL") => {
                match until_instant(value.trim(), anchor_tz) {
                    Some(until) => format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ")),
                    None => part.to_string(),
                }
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn until_instant(value: &str, anchor_tz: Tz) -> Option<DateTime<Utc>> {
    if value.ends_with(['Z', 'z']) {
        return None;
    }
    let until = if value.len() == 8 {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        start_of_day(anchor_tz, date.succ_opt()?)? - Duration::seconds(1)
    } else {
        let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
        localize(anchor_tz, naive, DstPolicy::ShiftForward)?
    };
    Some(until.with_timezone(&Utc))
}

/// Strip stray numeric fragments (`;5`, `;=3`, `;X=12`) that some producers
/// emit, leaving recognized `KEY=VALUE` parts and anything else for the
/// parser to judge.
pub fn sanitize_rule(rule: &str) -> String {
    let rule = rule.trim();
    let rule = rule
        .get(..6)
        .filter(|p| p.eq_ignore_ascii_case("RRULE:"))
        .map_or(rule, |_| &rule[6..]);

    rule.split(';')
        .map(str::trim)
        .filter(|part| !is_numeric_fragment(part))
        .collect::<Vec<_>>()
        .join(";")
}

fn is_numeric_fragment(part: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    match part.split_once('=') {
        None => part.is_empty() || all_digits(part),
        Some((key, value)) => {
            let key = key.trim();
            let recognized = RULE_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(key));
            !recognized && (key.is_empty() || all_digits(key) || all_digits(value.trim()))
        }
    }
}
