//! Unified error model for the stratum core.
//! Every public operation returns `CoreResult<T>`; presentation layers pick their
//! text through `user_message` instead of re-parsing transport errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a `CoreError`, stable across message wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authorization,
    Write,
    Read,
    NotFound,
    RateLimit,
    Quota,
    Remote,
    Config,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CoreError {
    #[error("{code}: {message}")]
    Validation { code: String, message: String },
    #[error("{code}: {message}")]
    Authorization { code: String, message: String },
    #[error("{code}: {message}")]
    Write { code: String, message: String },
    #[error("{code}: {message}")]
    Read { code: String, message: String },
    #[error("{code}: {message}")]
    NotFound { code: String, message: String },
    #[error("{code}: {message}")]
    RateLimit { code: String, message: String },
    #[error("{code}: {message}")]
    Quota { code: String, message: String },
    #[error("{code}: {message}")]
    Remote { code: String, message: String },
    #[error("{code}: {message}")]
    Config { code: String, message: String },
    #[error("{code}: {message}")]
    Internal { code: String, message: String },
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation { .. } => ErrorKind::Validation,
            CoreError::Authorization { .. } => ErrorKind::Authorization,
            CoreError::Write { .. } => ErrorKind::Write,
            CoreError::Read { .. } => ErrorKind::Read,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::RateLimit { .. } => ErrorKind::RateLimit,
            CoreError::Quota { .. } => ErrorKind::Quota,
            CoreError::Remote { .. } => ErrorKind::Remote,
            CoreError::Config { .. } => ErrorKind::Config,
            CoreError::Internal { .. } => ErrorKind::Internal,
        }
    }

    pub fn code_str(&self) -> &str {
        match self {
            CoreError::Validation { code, .. }
            | CoreError::Authorization { code, .. }
            | CoreError::Write { code, .. }
            | CoreError::Read { code, .. }
            | CoreError::NotFound { code, .. }
            | CoreError::RateLimit { code, .. }
            | CoreError::Quota { code, .. }
            | CoreError::Remote { code, .. }
            | CoreError::Config { code, .. }
            | CoreError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CoreError::Validation { message, .. }
            | CoreError::Authorization { message, .. }
            | CoreError::Write { message, .. }
            | CoreError::Read { message, .. }
            | CoreError::NotFound { message, .. }
            | CoreError::RateLimit { message, .. }
            | CoreError::Quota { message, .. }
            | CoreError::Remote { message, .. }
            | CoreError::Config { message, .. }
            | CoreError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn validation(code: impl Into<String>, msg: impl Into<String>) -> Self { CoreError::Validation { code: code.into(), message: msg.into() } }
    pub fn authorization(code: impl Into<String>, msg: impl Into<String>) -> Self { CoreError::Authorization { code: code.into(), message: msg.into() } }
    pub fn write(code: impl Into<String>, msg: impl Into<String>) -> Self { CoreError::Write { code: code.into(), message: msg.into() } }
    pub fn read(code: impl Into<String>, msg: impl Into<String>) -> Self { CoreError::Read { code: code.into(), message: msg.into() } }
    pub fn not_found(code: impl Into<String>, msg: impl Into<String>) -> Self { CoreError::NotFound { code: code.into(), message: msg.into() } }
    pub fn rate_limit(code: impl Into<String>, msg: impl Into<String>) -> Self { CoreError::RateLimit { code: code.into(), message: msg.into() } }
    pub fn quota(code: impl Into<String>, msg: impl Into<String>) -> Self { CoreError::Quota { code: code.into(), message: msg.into() } }
    pub fn remote(code: impl Into<String>, msg: impl Into<String>) -> Self { CoreError::Remote { code: code.into(), message: msg.into() } }
    pub fn config(code: impl Into<String>, msg: impl Into<String>) -> Self { CoreError::Config { code: code.into(), message: msg.into() } }
    pub fn internal(code: impl Into<String>, msg: impl Into<String>) -> Self { CoreError::Internal { code: code.into(), message: msg.into() } }

    /// Human-readable text for the presentation layer, one wording per kind.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Validation { message, .. } => message.clone(),
            CoreError::Authorization { .. } => "You do not have permission to perform this action.".to_string(),
            CoreError::Write { message, .. } => format!("Could not save changes: {}", message),
            CoreError::Read { message, .. } => format!("Could not load data: {}", message),
            CoreError::NotFound { .. } => "The requested item no longer exists.".to_string(),
            CoreError::RateLimit { .. } => "Rate limit exceeded. Please wait and try again.".to_string(),
            CoreError::Quota { .. } => "AI credits exhausted. Please add funds.".to_string(),
            CoreError::Remote { message, .. } => format!("Analysis failed: {}", message),
            CoreError::Config { message, .. } | CoreError::Internal { message, .. } => {
                format!("Operation failed: {}", message)
            }
        }
    }

    /// Map to HTTP status code for hosts that expose the core over HTTP.
    pub fn http_status(&self) -> u16 {
        match self {
            CoreError::Validation { .. } => 400,
            CoreError::Authorization { .. } => 403,
            CoreError::NotFound { .. } => 404,
            CoreError::RateLimit { .. } => 429,
            CoreError::Quota { .. } => 402,
            CoreError::Remote { .. } => 502,
            CoreError::Write { .. } | CoreError::Read { .. } => 503,
            CoreError::Config { .. } | CoreError::Internal { .. } => 500,
        }
    }

    /// Whether a caller policy may retry. The core itself never retries.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimit | ErrorKind::Write | ErrorKind::Read | ErrorKind::Remote)
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<anyhow::Error> for CoreError {
    fn from(err: anyhow::Error) -> Self {
        CoreError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
