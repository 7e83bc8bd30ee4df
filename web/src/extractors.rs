//! Custom Axum extractors.
//!
//! - `CorrelationId`: the request's correlation id
//! - `AuthUser`: the verified caller behind the `Authorization` bearer token
//! - `JsonBody`: a JSON body whose rejections use the `{code, message}` shape
//!
//! ```ignore
//! async fn handler(
//!     State(state): State<AppState>,
//!     AuthUser(caller): AuthUser,
//!     JsonBody(body): JsonBody<SlotRequest>,
//! ) -> Result<Json<Slot>, AppError> { ... }
//! ```

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Json, Request, rejection::JsonRejection},
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::de::DeserializeOwned;
use timely_auth::{AuthError, bearer_token};
use timely_core::Identity;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::{CORRELATION_ID_HEADER, parse_correlation_id};
use crate::state::AppState;

/// Correlation ID for request tracing.
///
/// Prefers the id stored by [`track_request`](crate::middleware::track_request),
/// then the `X-Correlation-ID` header, and generates a new UUID v4 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(tracked) = parts.extensions.get::<Self>() {
            return Ok(*tracked);
        }
        let correlation_id = parse_correlation_id(parts.headers.get(CORRELATION_ID_HEADER))
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// The authenticated caller.
///
/// Rejects with `401` when the header is missing, is not `Bearer <token>`,
/// or the token fails verification under the configured policy.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidTokenFormat)?;

        let identity = state.verifier.verify(bearer_token(header)?)?;
        tracing::debug!(user_id = %identity.user_id, role = %identity.role, "Caller authenticated");
        Ok(Self(identity))
    }
}

/// JSON request body.
///
/// Malformed JSON, unknown fields and wrong types are `400 INVALID_ARGUMENT`.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(&rejection)),
        }
    }
}

fn json_rejection(rejection: &JsonRejection) -> AppError {
    AppError::bad_request(rejection.body_text())
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let req = Request::builder()
            .header(CORRELATION_ID_HEADER, uuid.to_string())
            .body(())
            .expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_correlation_id_prefers_extension() {
        let stored = Uuid::new_v4();
        let mut req = Request::builder()
            .header(CORRELATION_ID_HEADER, Uuid::new_v4().to_string())
            .body(())
            .expect("Valid request");
        req.extensions_mut().insert(CorrelationId(stored));

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_eq!(correlation_id.0, stored);
    }

    #[tokio::test]
    async fn test_correlation_id_generates_new() {
        let req = Request::builder().body(()).expect("Valid request");

        let (mut parts, ()) = req.into_parts();
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .expect("Should extract");

        assert_ne!(correlation_id.0, Uuid::nil());
    }
}
