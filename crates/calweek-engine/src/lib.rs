//! # calweek-engine
//!
//! Turns iCalendar feed text into a static HTML timetable for one week.
//!
//! Every stage is a pure function of its inputs and an explicit
//! [`EngineConfig`]; there is no clock and no I/O in this crate. Recurrence
//! rules are evaluated with the `rrule` crate, timezones with `chrono-tz`.
//!
//! ## Modules
//!
//! - [`feed`]: feed text → raw components
//! - [`normalize`]: raw component → canonical event (+ recurrence data)
//! - [`expander`]: RRULE/RDATE/EXDATE → occurrences inside a window
//! - [`window`]: display windows, overlap filtering and clamping
//! - [`timetable`]: the normalize → expand → filter pipeline
//! - [`layout`]: day columns, lanes, vertical positions
//! - [`render`]: week grid and list HTML
//! - [`dst`]: DST gap policies
//! - [`error`]: Error types

pub mod config;
pub mod dst;
pub mod error;
pub mod expander;
pub mod feed;
pub mod layout;
pub mod normalize;
pub mod render;
pub mod timetable;
pub mod window;

pub use config::EngineConfig;
pub use error::{CalweekError, Result};
pub use expander::{expand_occurrences, expand_or_single, Expansion};
pub use feed::{parse_feed, RawComponent, RawProperty};
pub use layout::{assign_lanes, layout_week, LayoutOptions, WeekLayout};
pub use normalize::{normalize_component, CanonicalEvent, RecurrenceSpec};
pub use render::{render_list, render_week, RenderOptions};
pub use timetable::{select_events, Selection, SelectionStats};
pub use window::{filter_to_window, DisplayWindow};
