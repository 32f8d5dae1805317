//! Typed errors for the ingestion pipeline.
//!
//! None of these abort a run: the orchestrator counts them and moves on.

use thiserror::Error;

/// A source could not be fetched or its content could not be read as the
/// expected kind. The source is skipped for the run.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error fetching {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("could not parse {url} as {expected}: {reason}")]
    Parse {
        url: String,
        expected: &'static str,
        reason: String,
    },
}

/// A single entry could not be turned into a draft. The entry is skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("entry is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unreadable entry: {0}")]
    Malformed(String),

    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },

    #[error("extractor for {source_name} cannot read {found} content")]
    ContentMismatch {
        source_name: String,
        found: &'static str,
    },
}

/// A persistence call failed. The entry is counted as errored.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("corrupt row {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    #[error("store task failed: {0}")]
    Task(String),
}
