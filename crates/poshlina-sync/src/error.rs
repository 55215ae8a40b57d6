use std::time::Duration;

use poshlina_core::{CourtType, FeeError};
use poshlina_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote source unavailable: {0}")]
    Unavailable(String),
    #[error("requested the {requested} schedule but received {received}")]
    CourtMismatch {
        requested: CourtType,
        received: CourtType,
    },
    #[error("invalid fee data: {0}")]
    Invalid(#[from] FeeError),
    #[error("cache error: {0}")]
    Store(#[from] StoreError),
}
