//! Event selection -- normalize, expand and window-filter the components of
//! every feed for one display window.

use std::collections::HashMap;

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::expander::expand_or_single;
use crate::feed::RawComponent;
use crate::normalize::{normalize_component, CanonicalEvent, NormalizedEvent};
use crate::window::{filter_to_window, DisplayWindow};

/// Counters reported in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionStats {
    /// Event components seen.
    pub events: usize,
    /// Components dropped as malformed.
    pub skipped: usize,
    /// Events carrying RRULE or RDATE.
    pub recurring: usize,
    /// Recurring events shown once because their rule was unusable.
    pub fallbacks: usize,
    /// Events and occurrences that made it into the window.
    pub selected: usize,
}

/// Events chosen for one window, sorted by start.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub window: DisplayWindow,
    pub events: Vec<CanonicalEvent>,
    pub stats: SelectionStats,
}

/// Run the normalize → expand → filter stages over raw components.
///
/// Malformed components are skipped and counted; unusable recurrence rules
/// fall back to a single instance. Modified instances (RECURRENCE-ID) replace
/// the occurrence they override on the master event with the same UID.
pub fn select_events(
    components: &[RawComponent],
    window: &DisplayWindow,
    config: &EngineConfig,
) -> Selection {
    let mut stats = SelectionStats::default();
    let mut normalized: Vec<NormalizedEvent> = Vec::new();

    for component in components.iter().filter(|c| c.is_event()) {
        stats.events += 1;
        match normalize_component(component, config) {
            Ok(Some(event)) => normalized.push(event),
            Ok(None) => {}
            Err(e) => {
                stats.skipped += 1;
                debug!(error = %e, "Skipping malformed event");
            }
        }
    }

    let mut overridden: HashMap<String, Vec<DateTime<Tz>>> = HashMap::new();
    for event in &normalized {
        if let (Some(uid), Some(rid)) = (&event.uid, event.recurrence_id) {
            overridden.entry(uid.clone()).or_default().push(rid);
        }
    }

    let mut candidates = Vec::new();
    for item in normalized {
        let Some(mut spec) = item.recurrence else {
            candidates.push(item.event);
            continue;
        };
        stats.recurring += 1;
        if item.recurrence_id.is_none() {
            if let Some(rids) = item.uid.as_ref().and_then(|uid| overridden.get(uid)) {
                spec.exclusions.extend(rids.iter().copied());
            }
        }
        // Occurrences starting before the window can still run into it.
        let search = window.extended_back(item.event.duration());
        let expansion = expand_or_single(&item.event, &spec, &search);
        if expansion.fell_back {
            stats.fallbacks += 1;
        }
        debug!(
            summary = %item.event.summary,
            occurrences = expansion.occurrences.len(),
            "Expanded recurring event"
        );
        candidates.extend(expansion.occurrences);
    }

    let mut events = filter_to_window(candidates, window);
    events.sort_by(|a, b| {
        (a.start, a.end, &a.summary).cmp(&(b.start, b.end, &b.summary))
    });
    stats.selected = events.len();

    info!(
        events = stats.events,
        skipped = stats.skipped,
        recurring = stats.recurring,
        fallbacks = stats.fallbacks,
        selected = stats.selected,
        "Selected events for window"
    );

    Selection {
        window: *window,
        events,
        stats,
    }
}
