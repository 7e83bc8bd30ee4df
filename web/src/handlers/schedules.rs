//! Slot ("schedule") management endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use timely_core::{BusinessId, ScheduleId, Slot, SlotPatchRequest, SlotRequest};

use super::appointments::DateQuery;
use crate::WebResult;
use crate::extractors::{AuthUser, JsonBody};
use crate::state::AppState;

/// Response to a slot deletion.
#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    /// Human-readable confirmation
    pub message: &'static str,
}

/// `POST /schedules/business/:businessId`
pub async fn create(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(business_id): Path<String>,
    JsonBody(body): JsonBody<SlotRequest>,
) -> WebResult<(StatusCode, Json<Slot>)> {
    let business_id: BusinessId = business_id.parse()?;
    let slot = state
        .schedules
        .create_slot(business_id, body, &caller)
        .await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

/// `GET /schedules/business/:businessId?date=` (public)
pub async fn list(
    State(state): State<AppState>,
    Path(business_id): Path<String>,
    Query(query): Query<DateQuery>,
) -> WebResult<Json<Vec<Slot>>> {
    let business_id: BusinessId = business_id.parse()?;
    Ok(Json(state.schedules.list_slots(business_id, query.date).await?))
}

/// `PATCH /schedules/:scheduleId`
pub async fn update(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(schedule_id): Path<String>,
    JsonBody(body): JsonBody<SlotPatchRequest>,
) -> WebResult<Json<Slot>> {
    let schedule_id: ScheduleId = schedule_id.parse()?;
    let slot = state
        .schedules
        .update_slot(schedule_id, body, &caller)
        .await?;
    Ok(Json(slot))
}

/// `DELETE /schedules/:scheduleId`
pub async fn delete(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(schedule_id): Path<String>,
) -> WebResult<Json<DeletedResponse>> {
    let schedule_id: ScheduleId = schedule_id.parse()?;
    state.schedules.delete_slot(schedule_id, &caller).await?;
    Ok(Json(DeletedResponse {
        message: "Schedule deleted successfully",
    }))
}
