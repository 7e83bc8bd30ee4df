//! Token claims and identity resolution.
//!
//! Hosted identity providers put the application role in `user_metadata` and a
//! provider role such as `authenticated` at the top level, so resolution looks at
//! both and falls back to `cliente`.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use timely_core::{Identity, Role, UserId};

use crate::error::{AuthError, Result};

/// Free-form profile claims set at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Subject copy some providers embed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Application role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// `aud` claim. Providers send either a single string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// `"aud": "authenticated"`
    One(String),
    /// `"aud": ["authenticated", "api"]`
    Many(Vec<String>),
}

/// Claims read from a bearer token. Unknown claims are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Legacy subject claim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Top-level role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Profile claims
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<UserMetadata>,
    /// Audience
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,
    /// Expiry (unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued at (unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

impl TokenClaims {
    /// Claims for `user_id` with no role, issued now and valid for an hour.
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            sub: Some(user_id.to_string()),
            ..Self::default()
        }
        .expiring_in(Duration::hours(1))
    }

    /// Set `iat` to now and `exp` to now plus `ttl`.
    #[must_use]
    pub fn expiring_in(mut self, ttl: Duration) -> Self {
        let now = Utc::now();
        self.iat = Some(now.timestamp());
        self.exp = Some((now + ttl).timestamp());
        self
    }

    /// Set the top-level role claim.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the role inside `user_metadata`.
    #[must_use]
    pub fn with_metadata_role(mut self, role: impl Into<String>) -> Self {
        self.user_metadata.get_or_insert_with(UserMetadata::default).role = Some(role.into());
        self
    }

    /// Set the email claim.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the audience claim.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.aud = Some(Audience::One(audience.into()));
        self
    }

    /// Set the audience claim to an array.
    #[must_use]
    pub fn with_audiences<I, S>(mut self, audiences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aud = Some(Audience::Many(audiences.into_iter().map(Into::into).collect()));
        self
    }

    /// Subject: `sub`, then `user_id`, then `user_metadata.sub`.
    fn subject(&self) -> Option<&str> {
        self.sub
            .as_deref()
            .or(self.user_id.as_deref())
            .or_else(|| self.user_metadata.as_ref().and_then(|m| m.sub.as_deref()))
    }

    /// Role: a known top-level role, then a known metadata role, then `cliente`.
    #[must_use]
    pub fn resolve_role(&self) -> Role {
        self.role
            .as_deref()
            .and_then(Role::from_claim)
            .or_else(|| {
                self.user_metadata
                    .as_ref()
                    .and_then(|m| m.role.as_deref())
                    .and_then(Role::from_claim)
            })
            .unwrap_or_default()
    }

    /// Resolve the caller identity.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidSubject`] when no subject claim holds a UUID.
    pub fn into_identity(self) -> Result<Identity> {
        let user_id = self
            .subject()
            .and_then(|s| s.parse::<UserId>().ok())
            .ok_or(AuthError::InvalidSubject)?;
        let role = self.resolve_role();
        Ok(Identity::new(user_id, self.email, role))
    }
}
