//! # Timely Web
//!
//! REST surface for the Timely booking engine.
//!
//! Handlers stay thin: they extract the caller and path ids, call one
//! `timely-core` service, and map the result. All domain failures become
//! [`AppError`] responses with a `{code, message}` body.
//!
//! # Request Flow
//!
//! 1. **Correlation id** assigned by [`middleware::track_request`]
//! 2. **Caller** verified by the [`extractors::AuthUser`] extractor
//! 3. **Service call** into the orchestrator, schedule or listing service
//! 4. **Result** serialized, or mapped through [`AppError`]
//!
//! ```ignore
//! let state = AppState::new(env, IdentityVerifier::signed(secret, None));
//! let app = timely_web::router(state).layer(timely_web::cors_layer(&origins));
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{Config, ConfigError};
pub use error::AppError;
pub use extractors::{AuthUser, CorrelationId, JsonBody};
pub use middleware::{CORRELATION_ID_HEADER, track_request};
pub use routes::{cors_layer, router};
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
