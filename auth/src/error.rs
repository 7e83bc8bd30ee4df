//! Error types for token verification.

use thiserror::Error;
use timely_core::BookingError;

/// Result type alias for verification.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Why a credential was rejected.
///
/// Every variant maps to `Unauthorized`; the distinction is for logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization` header.
    #[error("Authorization header is required")]
    MissingToken,

    /// Header present but not `Bearer <token>`.
    #[error("Invalid authorization header. Expected: Bearer <token>")]
    InvalidTokenFormat,

    /// Signature valid but `exp` has passed.
    #[error("Token has expired")]
    TokenExpired,

    /// Signature, audience, or structure check failed.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// No usable subject claim.
    #[error("Token subject is missing or is not a valid user id")]
    InvalidSubject,

    /// Token could not be signed.
    #[error("Failed to issue token: {0}")]
    Issue(String),
}

impl From<AuthError> for BookingError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_to_unauthorized() {
        let err: BookingError = AuthError::TokenExpired.into();
        assert_eq!(err, BookingError::Unauthorized("Token has expired".to_string()));
    }
}
