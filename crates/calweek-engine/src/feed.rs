//! iCalendar feed parsing.
//!
//! Turns feed text into [`RawComponent`]s: an opaque bag of properties per
//! calendar component. Nothing is interpreted here; the normalizer decides
//! what a property means.

use std::io::{BufReader, Cursor};

use ical::parser::ical::component::IcalCalendar;
use ical::property::Property;
use ical::IcalParser;
use tracing::debug;

use crate::error::{CalweekError, Result};

/// One property line of a component, e.g. `DTSTART;TZID=Europe/Berlin:20260302T090000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProperty {
    pub name: String,
    pub params: Vec<(String, Vec<String>)>,
    pub value: Option<String>,
}

impl RawProperty {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            params: Vec::new(),
            value: Some(value.to_string()),
        }
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.params
            .push((key.to_ascii_uppercase(), vec![value.to_string()]));
        self
    }

    /// First value of the named parameter, with surrounding quotes removed.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .and_then(|(_, values)| values.first())
            .map(|v| v.trim_matches('"'))
    }
}

impl From<Property> for RawProperty {
    fn from(property: Property) -> Self {
        Self {
            name: property.name.to_ascii_uppercase(),
            params: property.params.unwrap_or_default(),
            value: property.value,
        }
    }
}

/// A calendar component as it appeared in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComponent {
    /// Component name, e.g. `VEVENT` or `VTODO`.
    pub kind: String,
    pub properties: Vec<RawProperty>,
}

impl RawComponent {
    pub fn event(properties: Vec<RawProperty>) -> Self {
        Self {
            kind: "VEVENT".to_string(),
            properties,
        }
    }

    pub fn is_event(&self) -> bool {
        self.kind.eq_ignore_ascii_case("VEVENT")
    }

    /// First property with the given name.
    pub fn property(&self, name: &str) -> Option<&RawProperty> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Every property with the given name, in feed order.
    pub fn properties_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RawProperty> {
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }

    /// Value of the first property with the given name, if present and non-empty.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.property(name)
            .and_then(|p| p.value.as_deref())
            .filter(|v| !v.trim().is_empty())
    }
}

/// Parse feed text into raw components.
///
/// A feed may contain several `VCALENDAR` objects; their components are
/// concatenated. Events and to-dos are returned; other component kinds carry
/// nothing we display.
///
/// # Errors
/// Returns `CalweekError::FeedParse` if the text is not iCalendar syntax or
/// contains no `VCALENDAR` at all.
pub fn parse_feed(text: &str) -> Result<Vec<RawComponent>> {
    let text = unfold(text);
    let parser = IcalParser::new(BufReader::new(Cursor::new(text.as_bytes())));

    let mut calendars = 0usize;
    let mut components = Vec::new();
    for calendar in parser {
        let calendar: IcalCalendar =
            calendar.map_err(|e| CalweekError::FeedParse(e.to_string()))?;
        calendars += 1;
        components.extend(calendar.events.into_iter().map(|event| RawComponent {
            kind: "VEVENT".to_string(),
            properties: event.properties.into_iter().map(RawProperty::from).collect(),
        }));
        components.extend(calendar.todos.into_iter().map(|todo| RawComponent {
            kind: "VTODO".to_string(),
            properties: todo.properties.into_iter().map(RawProperty::from).collect(),
        }));
    }

    if calendars == 0 {
        return Err(CalweekError::FeedParse(
            "no VCALENDAR object found".to_string(),
        ));
    }

    debug!(calendars, components = components.len(), "Parsed feed");
    Ok(components)
}

/// Join folded lines (a line break followed by one space or tab). The `ical`
/// reader trims each physical line before unfolding, which would eat the
/// space in `planning \r\n with`.
fn unfold(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('\n') {
        let (line, tail) = rest.split_at(pos);
        let tail = &tail[1..];
        if tail.starts_with([' ', '\t']) {
            out.push_str(line.strip_suffix('\r').unwrap_or(line));
            rest = &tail[1..];
        } else {
            out.push_str(line);
            out.push('\n');
            rest = tail;
        }
    }
    out.push_str(rest);
    out
}
