use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("search index is not ready; call init first")]
    NotReady,
    #[error("an init request is already in flight")]
    InitInProgress,
    /// Failure raised inside the worker while indexing or matching. The
    /// message is the worker's original text.
    #[error("search worker error: {0}")]
    Worker(String),
    #[error("request {id} timed out after {after:?}")]
    Timeout { id: u64, after: Duration },
    #[error("search worker is gone")]
    ChannelClosed,
    #[error("index error: {0}")]
    Index(#[from] tantivy::TantivyError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("other error: {0}")]
    Other(String),
}

/// Why a `hh:mm AM|PM` token could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    #[error("empty time string")]
    Empty,
    #[error("missing ':' in {0:?}")]
    MissingColon(String),
    #[error("non-numeric time component in {0:?}")]
    NotNumeric(String),
    #[error("unknown meridiem {0:?}")]
    BadMeridiem(String),
    #[error("time out of range: {0:?}")]
    OutOfRange(String),
}
