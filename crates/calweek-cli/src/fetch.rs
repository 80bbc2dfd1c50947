//! Feed retrieval over HTTP, or from disk for local paths.

use std::time::Duration;

use calweek_engine::{parse_feed, CalweekError, RawComponent};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::{debug, info};

/// Why one feed contributed nothing. Never fatal on its own.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {feed} failed: {source}")]
    Network {
        feed: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{feed} answered HTTP {status}")]
    Status { feed: String, status: StatusCode },

    #[error("cannot read {feed}: {source}")]
    Io {
        feed: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{feed} is not a calendar feed: {source}")]
    Parse {
        feed: String,
        #[source]
        source: CalweekError,
    },
}

/// Short, log-safe name for a feed source. Private calendar URLs carry their
/// secret in the path or query, so only scheme and host are shown.
pub fn display_name(source: &str) -> String {
    match Url::parse(source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            format!("{}://{}/…", url.scheme(), url.host_str().unwrap_or("?"))
        }
        _ => source.to_string(),
    }
}

fn is_remote(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Blocking feed loader shared by every feed of a run.
pub struct FeedLoader {
    client: Client,
}

impl FeedLoader {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("calweek/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Retrieve the raw feed text. `http(s)://` sources are fetched with GET;
    /// anything else is read as a file path.
    pub fn fetch(&self, source: &str) -> Result<String, FetchError> {
        let feed = display_name(source);
        if !is_remote(source) {
            return std::fs::read_to_string(source).map_err(|e| FetchError::Io { feed, source: e });
        }

        let response = self
            .client
            .get(source)
            .send()
            .map_err(|e| FetchError::Network {
                feed: feed.clone(),
                source: e,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { feed, status });
        }
        response
            .text()
            .map_err(|e| FetchError::Network { feed, source: e })
    }

    /// Fetch and parse one feed.
    pub fn load(&self, source: &str) -> Result<Vec<RawComponent>, FetchError> {
        let text = self.fetch(source)?;
        debug!(feed = %display_name(source), bytes = text.len(), "Fetched feed");
        let components = parse_feed(&text).map_err(|e| FetchError::Parse {
            feed: display_name(source),
            source: e,
        })?;
        info!(feed = %display_name(source), components = components.len(), "Loaded feed");
        Ok(components)
    }
}
