use thiserror::Error;

use crate::CourtType;

#[derive(Debug, Error)]
pub enum FeeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("exemption '{exemption}' is not applicable to {court} courts")]
    NotApplicable { exemption: String, court: CourtType },

    #[error("invalid fee schedule: {0}")]
    InvalidSchedule(String),

    #[error("invalid exemption: {0}")]
    InvalidExemption(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
