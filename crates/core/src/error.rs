//! Application error model.

use thiserror::Error;

/// Result type used across the service layer.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error.
///
/// Keep this focused on deterministic, business/domain failures. Each variant
/// maps to exactly one HTTP status at the API boundary; the store-adjacent
/// layer translates "row not found" into `NotFound`, unique-key violations
/// into `Conflict`, and everything else into `Internal`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A value failed validation (malformed/missing input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Authentication failure (bad credentials, invalid/expired token).
    #[error("{0}")]
    Unauthorized(String),

    /// The caller is authenticated but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),

    /// A requested resource was not found.
    #[error("not found")]
    NotFound,

    /// A unique-key conflict (email, code, role name, existing membership).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Unexpected store or infrastructure failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }
}
