//! HTTP request handlers, organized by resource.

pub mod admin;
pub mod appointments;
pub mod health;
pub mod schedules;

pub use health::{health_check, readiness_check};
