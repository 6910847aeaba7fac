/*!
Error taxonomy for the monitor.

Runtime errors are logged where they occur and never reach the scheduler;
only startup errors are returned to `main`.
*/

use std::time::Duration;

use phishing_list::FeedError;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Failed to fetch list from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Malformed list document: {0}")]
    Parse(#[from] FeedError),

    #[error("Output {sink} failed: {reason}")]
    Dispatch { sink: &'static str, reason: String },

    #[error("Lookup for {identifier} timed out after {after:?}")]
    LookupTimeout { identifier: String, after: Duration },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl MonitorError {
    pub fn fetch(url: &str, reason: impl ToString) -> Self {
        MonitorError::Fetch {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn dispatch(sink: &'static str, reason: impl ToString) -> Self {
        MonitorError::Dispatch {
            sink,
            reason: reason.to_string(),
        }
    }
}
