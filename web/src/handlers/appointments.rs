//! Appointment endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use timely_core::{
    Appointment, AppointmentId, AppointmentView, BusinessAppointments, BusinessId, ScheduleId,
    VerifyDecision,
};

use crate::WebResult;
use crate::extractors::{AuthUser, CorrelationId, JsonBody};
use crate::state::AppState;

/// Response to a successful booking.
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    /// Human-readable confirmation
    pub message: &'static str,
    /// The new pending appointment
    pub appointment: Appointment,
}

/// Response to a cancellation.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Human-readable confirmation
    pub message: &'static str,
    /// Non-fatal problems, such as a slot that could not be released
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Response to a status update.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Human-readable confirmation
    pub message: &'static str,
    /// The appointment after the update
    pub appointment: Appointment,
    /// Non-fatal problems
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Body of `PATCH /appointments/:appointmentId/status`.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    /// `"approved"` or `"canceled"`
    pub verify: String,
}

/// `?date=` filter.
#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    /// `YYYY-MM-DD`; empty means no filter
    pub date: Option<String>,
}

/// `POST /appointments/schedule/:scheduleId`
#[tracing::instrument(skip(state, caller, correlation_id), fields(correlation_id = %correlation_id.0))]
pub async fn create(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthUser(caller): AuthUser,
    Path(schedule_id): Path<String>,
) -> WebResult<(StatusCode, Json<CreatedResponse>)> {
    let schedule_id: ScheduleId = schedule_id.parse()?;
    let appointment = state
        .orchestrator
        .create_appointment(schedule_id, &caller)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Appointment created successfully",
            appointment,
        }),
    ))
}

/// `GET /appointments/me`
pub async fn list_mine(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> WebResult<Json<Vec<AppointmentView>>> {
    Ok(Json(state.listing.list_for_user(&caller).await?))
}

/// `GET /appointments/business/:businessId?date=`
pub async fn list_for_business(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(business_id): Path<String>,
    Query(query): Query<DateQuery>,
) -> WebResult<Json<BusinessAppointments>> {
    let business_id: BusinessId = business_id.parse()?;
    let listing = state
        .listing
        .list_for_business(business_id, query.date, &caller)
        .await?;
    Ok(Json(listing))
}

/// `DELETE /appointments/:appointmentId`
#[tracing::instrument(skip(state, caller, correlation_id), fields(correlation_id = %correlation_id.0))]
pub async fn cancel(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthUser(caller): AuthUser,
    Path(appointment_id): Path<String>,
) -> WebResult<Json<CancelResponse>> {
    let appointment_id: AppointmentId = appointment_id.parse()?;
    let outcome = state
        .orchestrator
        .cancel_appointment(appointment_id, &caller)
        .await?;

    Ok(Json(CancelResponse {
        message: "Appointment cancelled successfully",
        warnings: outcome.warnings,
    }))
}

/// `PATCH /appointments/:appointmentId/status`
#[tracing::instrument(skip(state, caller, correlation_id, body), fields(correlation_id = %correlation_id.0))]
pub async fn update_status(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    AuthUser(caller): AuthUser,
    Path(appointment_id): Path<String>,
    JsonBody(body): JsonBody<StatusRequest>,
) -> WebResult<Json<StatusResponse>> {
    let appointment_id: AppointmentId = appointment_id.parse()?;
    let decision: VerifyDecision = body.verify.parse()?;
    let outcome = state
        .orchestrator
        .update_status(appointment_id, decision, &caller)
        .await?;

    Ok(Json(StatusResponse {
        message: "Appointment updated successfully",
        appointment: outcome.appointment,
        warnings: outcome.warnings,
    }))
}
