//! Error types for calweek-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalweekError {
    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Feed parse error: {0}")]
    FeedParse(String),

    #[error("Invalid display window: {0}")]
    InvalidWindow(String),

    #[error("Render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, CalweekError>;
