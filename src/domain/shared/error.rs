//! Domain errors

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Client-visible error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    Forbidden,
    BadRequest,
    NotFound,
    InternalServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A guardrail denied the operation
    #[error("{0}")]
    Forbidden(String),

    /// A prerequisite is missing or invalid
    #[error("{0}")]
    BadRequest(String),

    /// Entity not found within the caller's organization
    #[error("{0}")]
    NotFound(String),

    /// Upstream failure, surfaced with a generic message only
    #[error("{0}")]
    Internal(String),

    /// Store unavailable or query failed
    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::Forbidden(_) => ErrorCode::Forbidden,
            DomainError::BadRequest(_) => ErrorCode::BadRequest,
            DomainError::NotFound(_) => ErrorCode::NotFound,
            DomainError::Internal(_) | DomainError::Storage(_) => ErrorCode::InternalServerError,
        }
    }

    /// Message safe to hand to an API caller. Storage detail stays server-side.
    pub fn public_message(&self) -> String {
        match self {
            DomainError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}
