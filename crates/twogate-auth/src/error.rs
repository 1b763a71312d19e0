//! Authentication error types.

use thiserror::Error;
use twogate_core::error::TwogateError;

use crate::gateway::DeliveryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid verification code")]
    InvalidCode,

    #[error("verification code expired")]
    ExpiredCode,

    #[error("a phone number is required")]
    MissingPhoneNumber,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

impl From<AuthError> for TwogateError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => TwogateError::InvalidCredentials,
            AuthError::InvalidCode => TwogateError::InvalidCode,
            AuthError::ExpiredCode => TwogateError::ExpiredCode,
            AuthError::MissingPhoneNumber => TwogateError::MissingPhoneNumber,
            // Token failures gate request authentication, so they share
            // the credential rejection.
            AuthError::TokenExpired | AuthError::TokenInvalid(_) => {
                TwogateError::InvalidCredentials
            }
            AuthError::Crypto(msg) => TwogateError::Internal(msg),
            AuthError::Delivery(e) => TwogateError::Internal(format!("delivery failed: {e}")),
        }
    }
}
