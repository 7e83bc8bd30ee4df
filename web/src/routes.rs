//! Router assembly.

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::{get, patch, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{admin, appointments, health, schedules};
use crate::middleware::track_request;
use crate::state::AppState;

/// All API routes with HTTP tracing and request tracking. CORS is added by
/// the caller with [`cors_layer`].
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/appointments/schedule/:scheduleId", post(appointments::create))
        .route("/appointments/me", get(appointments::list_mine))
        .route(
            "/appointments/business/:businessId",
            get(appointments::list_for_business),
        )
        .route(
            "/appointments/:appointmentId",
            axum::routing::delete(appointments::cancel),
        )
        .route(
            "/appointments/:appointmentId/status",
            patch(appointments::update_status),
        )
        .route(
            "/schedules/business/:businessId",
            post(schedules::create).get(schedules::list),
        )
        .route(
            "/schedules/:scheduleId",
            patch(schedules::update).delete(schedules::delete),
        )
        .route("/admin/reconciliation", get(admin::reconciliation))
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/metrics", get(health::metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_request))
}

/// CORS for the browser frontend.
///
/// Origins that are not valid header values are skipped with a warning.
#[must_use]
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("x-correlation-id"),
        ])
        .expose_headers([HeaderName::from_static("x-correlation-id")])
        .allow_credentials(true)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, response::Response};
    use tower::ServiceExt;

    fn origins() -> Vec<String> {
        vec![
            "http://localhost:3000".to_string(),
            "bad\norigin".to_string(),
        ]
    }

    async fn preflight(origin: &str) -> Response {
        let app = Router::new()
            .route("/appointments/me", get(|| async { "ok" }))
            .layer(cors_layer(&origins()));
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/appointments/me")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_preflight_from_allowed_origin_is_granted() {
        let response = preflight("http://localhost:3000").await;
        let headers = response.headers();

        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:3000"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
        let methods = headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("PATCH"));
        assert!(methods.contains("DELETE"));
    }

    #[tokio::test]
    async fn test_preflight_from_unknown_origin_gets_no_grant() {
        let response = preflight("http://evil.example").await;

        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn test_invalid_configured_origin_is_skipped_not_fatal() {
        let response = preflight("bad").await;

        assert!(response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }
}
