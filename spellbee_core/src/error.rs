//! Error types shared across the contest core

use thiserror::Error;

/// Startup configuration problems. These are fatal; there is no degraded mode.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
}

/// Failures talking to a backing service: a missed-word store or the
/// speech service.
///
/// Never escapes a [`crate::MissedWordStore`] call; stores log these and
/// fall back to an empty result or a no-op.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("service returned HTTP {0}")]
    Status(u16),

    #[error("malformed missed-word document: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Validation failures surfaced to whoever drives a contest.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContestError {
    #[error("unknown word list '{0}'")]
    UnknownList(String),

    #[error("failed to load word list from '{0}'")]
    ListUnavailable(String),

    #[error("failed to select words from '{list}'; check the range {start_id}..={end_id}")]
    EmptySelection {
        list: String,
        start_id: usize,
        end_id: usize,
    },

    #[error("no session with id {0}")]
    UnknownSession(String),

    #[error("no contest in progress")]
    NotInProgress,
}
