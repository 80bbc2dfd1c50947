//! Engine configuration shared by the normalizer, expander and window filter.

use chrono::Duration;
use chrono_tz::Tz;

use crate::dst::DstPolicy;
use crate::error::{CalweekError, Result};

/// Engine-wide parameters, passed explicitly to every stage.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Zone that every instant is converted into, and that zone-less
    /// ("floating") times and all-day dates are interpreted in.
    pub reference_tz: Tz,
    /// Length substituted when a timed event has no DTEND/DURATION.
    pub default_timed_duration: Duration,
    /// Length substituted when an all-day event has no DTEND/DURATION.
    pub default_all_day_duration: Duration,
    pub dst_policy: DstPolicy,
}

impl EngineConfig {
    pub const DEFAULT_TIMEZONE: &'static str = "America/New_York";

    /// Default configuration in the given reference zone.
    pub fn new(reference_tz: Tz) -> Self {
        Self {
            reference_tz,
            default_timed_duration: Duration::hours(1),
            default_all_day_duration: Duration::days(1),
            dst_policy: DstPolicy::default(),
        }
    }

    /// Build a configuration from an IANA timezone name.
    ///
    /// # Errors
    /// Returns `CalweekError::InvalidTimezone` if `name` is not a known IANA identifier.
    pub fn with_timezone_name(name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|_| CalweekError::InvalidTimezone(name.to_string()))?;
        Ok(Self::new(tz))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(chrono_tz::America::New_York)
    }
}
