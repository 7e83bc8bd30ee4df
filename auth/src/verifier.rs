//! Identity Verifier: bearer credential to caller identity.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use std::collections::HashSet;
use std::fmt;
use timely_core::Identity;

use crate::claims::TokenClaims;
use crate::error::{AuthError, Result};

/// How tokens are checked.
#[derive(Clone, PartialEq, Eq)]
pub enum VerificationPolicy {
    /// HS256 signature and expiry are verified; audience too when set.
    Signed {
        /// Shared signing secret
        secret: String,
        /// Required `aud` claim
        audience: Option<String>,
    },
    /// Claims are decoded without any signature or expiry check.
    ///
    /// A degraded trust boundary for deployments without the signing secret.
    /// Chosen by configuration only; a failed signed verification never falls
    /// back to this.
    DecodeOnly,
}

impl fmt::Debug for VerificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signed { audience, .. } => f
                .debug_struct("Signed")
                .field("secret", &"<redacted>")
                .field("audience", audience)
                .finish(),
            Self::DecodeOnly => f.write_str("DecodeOnly"),
        }
    }
}

/// Strip the `Bearer ` scheme from an `Authorization` header value.
///
/// # Errors
///
/// Returns [`AuthError::InvalidTokenFormat`] if the scheme is missing or the token is empty.
pub fn bearer_token(header: &str) -> Result<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidTokenFormat)
}

/// Verifies bearer tokens. A pure function of the token; cheap to clone.
#[derive(Clone)]
pub struct IdentityVerifier {
    policy: VerificationPolicy,
    key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for IdentityVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityVerifier")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl IdentityVerifier {
    /// Create a verifier for `policy`.
    #[must_use]
    pub fn new(policy: VerificationPolicy) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);

        let key = match &policy {
            VerificationPolicy::Signed { secret, audience } => {
                match audience {
                    Some(audience) => validation.set_audience(&[audience]),
                    None => validation.validate_aud = false,
                }
                DecodingKey::from_secret(secret.as_bytes())
            }
            VerificationPolicy::DecodeOnly => {
                validation.insecure_disable_signature_validation();
                validation.validate_exp = false;
                validation.validate_aud = false;
                validation.required_spec_claims = HashSet::new();
                DecodingKey::from_secret(&[])
            }
        };

        Self {
            policy,
            key,
            validation,
        }
    }

    /// Signed verification with `secret`.
    #[must_use]
    pub fn signed(secret: impl Into<String>, audience: Option<String>) -> Self {
        Self::new(VerificationPolicy::Signed {
            secret: secret.into(),
            audience,
        })
    }

    /// Decode-only verification.
    #[must_use]
    pub fn decode_only() -> Self {
        Self::new(VerificationPolicy::DecodeOnly)
    }

    /// The active policy.
    #[must_use]
    pub const fn policy(&self) -> &VerificationPolicy {
        &self.policy
    }

    /// `true` when signatures are not checked.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self.policy, VerificationPolicy::DecodeOnly)
    }

    /// Verify a bearer token and resolve the caller.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidTokenFormat`] for an empty token
    /// - [`AuthError::TokenExpired`] when `exp` has passed (signed policy)
    /// - [`AuthError::InvalidToken`] for a bad signature, audience or encoding
    /// - [`AuthError::InvalidSubject`] when no subject holds a user id
    pub fn verify(&self, token: &str) -> Result<Identity> {
        if token.trim().is_empty() {
            return Err(AuthError::InvalidTokenFormat);
        }

        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|err| {
            tracing::debug!(error = %err, "Token rejected");
            match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(err.to_string()),
            }
        })?;

        data.claims.into_identity()
    }
}

#[cfg(all(test, feature = "test-utils"))]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::issue_token;
    use chrono::Duration;
    use timely_core::{Role, UserId};

    const SECRET: &str = "test-secret-at-least-thirty-two-bytes!";

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc").unwrap(), "abc");
        assert_eq!(bearer_token("Bearer ").unwrap_err(), AuthError::InvalidTokenFormat);
        assert_eq!(bearer_token("Basic abc").unwrap_err(), AuthError::InvalidTokenFormat);
    }

    #[test]
    fn test_signed_round_trip_resolves_identity() {
        let user_id = UserId::new();
        let token = issue_token(
            SECRET,
            &TokenClaims::for_user(user_id)
                .with_role("authenticated")
                .with_metadata_role("admin")
                .with_email("owner@example.com"),
        )
        .unwrap();

        let identity = IdentityVerifier::signed(SECRET, None).verify(&token).unwrap();
        assert_eq!(identity.user_id, user_id);
        assert_eq!(identity.role, Role::Admin);
        assert_eq!(identity.email.as_deref(), Some("owner@example.com"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(SECRET, &TokenClaims::for_user(UserId::new())).unwrap();
        let err = IdentityVerifier::signed("another-secret-of-sufficient-length", None)
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = TokenClaims::for_user(UserId::new()).expiring_in(Duration::hours(-2));
        let token = issue_token(SECRET, &claims).unwrap();
        let err = IdentityVerifier::signed(SECRET, None).verify(&token).unwrap_err();
        assert_eq!(err, AuthError::TokenExpired);
    }

    #[test]
    fn test_audience_enforced_only_when_configured() {
        let token = issue_token(
            SECRET,
            &TokenClaims::for_user(UserId::new()).with_audience("authenticated"),
        )
        .unwrap();

        assert!(IdentityVerifier::signed(SECRET, None).verify(&token).is_ok());
        assert!(
            IdentityVerifier::signed(SECRET, Some("authenticated".to_string()))
                .verify(&token)
                .is_ok()
        );
        assert!(
            IdentityVerifier::signed(SECRET, Some("service_role".to_string()))
                .verify(&token)
                .is_err()
        );
    }

    #[test]
    fn test_array_audience_verifies_under_both_policies() {
        let user_id = UserId::new();
        let token = issue_token(
            SECRET,
            &TokenClaims::for_user(user_id).with_audiences(["authenticated", "api"]),
        )
        .unwrap();

        let open = IdentityVerifier::signed(SECRET, None).verify(&token).unwrap();
        assert_eq!(open.user_id, user_id);
        let scoped = IdentityVerifier::signed(SECRET, Some("api".to_string()))
            .verify(&token)
            .unwrap();
        assert_eq!(scoped.user_id, user_id);
        assert!(
            IdentityVerifier::signed(SECRET, Some("service_role".to_string()))
                .verify(&token)
                .is_err()
        );
        assert_eq!(
            IdentityVerifier::decode_only().verify(&token).unwrap().user_id,
            user_id
        );
    }

    #[test]
    fn test_decode_only_ignores_signature_and_expiry() {
        let user_id = UserId::new();
        let claims = TokenClaims::for_user(user_id).expiring_in(Duration::hours(-2));
        let token = issue_token("whatever-secret", &claims).unwrap();

        let verifier = IdentityVerifier::decode_only();
        assert!(verifier.is_degraded());
        assert_eq!(verifier.verify(&token).unwrap().user_id, user_id);
    }

    #[test]
    fn test_garbage_rejected_in_both_modes() {
        assert!(IdentityVerifier::decode_only().verify("not.a.jwt").is_err());
        assert!(IdentityVerifier::signed(SECRET, None).verify("not.a.jwt").is_err());
        assert!(IdentityVerifier::decode_only().verify("  ").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", IdentityVerifier::signed(SECRET, None));
        assert!(!debug.contains(SECRET));
    }
}
