//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] crm_core::EmailError),

    /// Password does not meet requirements.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Bearer token missing, malformed, unknown or revoked.
    #[error("invalid token")]
    InvalidToken,

    /// Bearer token past its expiry.
    #[error("token expired")]
    TokenExpired,

    /// Password hashing failed.
    #[error("password hashing failed")]
    PasswordHash,

    /// Token MAC could not be computed.
    #[error("token hashing failed")]
    TokenHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl AuthError {
    /// Whether this is a server-side failure rather than a rejected request.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::PasswordHash | Self::TokenHash | Self::Repository(_))
    }
}
