//! # Timely Auth
//!
//! Identity verification for the Timely API.
//!
//! The identity provider issues HS256 session tokens carrying a subject id and a
//! role claim. This crate turns a bearer credential into a
//! [`timely_core::Identity`] and nothing more; issuing real sessions is the
//! provider's job.
//!
//! ```rust,ignore
//! use timely_auth::{IdentityVerifier, bearer_token};
//!
//! let verifier = IdentityVerifier::signed(secret, None);
//! let identity = verifier.verify(bearer_token(header)?)?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod claims;
pub mod error;
pub mod verifier;

pub use claims::{Audience, TokenClaims, UserMetadata};
pub use error::{AuthError, Result};
pub use verifier::{IdentityVerifier, VerificationPolicy, bearer_token};

/// Sign `claims` with `secret` (HS256). For tests and local tooling.
///
/// # Errors
///
/// Returns [`AuthError::Issue`] if encoding fails.
#[cfg(feature = "test-utils")]
pub fn issue_token(secret: &str, claims: &TokenClaims) -> Result<String> {
    use jsonwebtoken::{EncodingKey, Header, encode};

    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Issue(e.to_string()))
}
