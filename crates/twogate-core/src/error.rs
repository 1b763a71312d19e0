//! Error types for the twogate system.

use thiserror::Error;

/// Failure taxonomy surfaced by the orchestrator and the store.
///
/// Credential failures are deliberately coarse: an unknown email and a
/// wrong password both produce [`TwogateError::InvalidCredentials`], and
/// only [`TwogateError::Internal`] hides its cause from the caller (it is
/// logged server-side instead).
#[derive(Debug, Error)]
pub enum TwogateError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email address already registered")]
    DuplicateEmail,

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Invalid verification code")]
    InvalidCode,

    #[error("Verification code expired")]
    ExpiredCode,

    #[error("A phone number is required to enable SMS verification")]
    MissingPhoneNumber,

    #[error("Too many attempts, retry later")]
    ThrottleExceeded,

    /// Optimistic-concurrency loser on `save`. Treated as an internal
    /// failure at the transport boundary; the core never retries.
    #[error("Concurrent update conflict: {entity} with id {id}")]
    Conflict { entity: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type TwogateResult<T> = Result<T, TwogateError>;
