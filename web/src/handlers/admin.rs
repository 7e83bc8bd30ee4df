//! Operator endpoints.

use axum::{Json, extract::State};
use serde::Serialize;
use timely_core::{ReconciliationEntry, policy};

use crate::WebResult;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// Body of `GET /admin/reconciliation`.
#[derive(Debug, Serialize)]
pub struct ReconciliationReport {
    /// Recorded partial-failure states, oldest first
    pub entries: Vec<ReconciliationEntry>,
    /// Number of entries
    pub total: usize,
}

/// `GET /admin/reconciliation`
///
/// Admin only. Lists orphaned appointments and slots that could not be
/// released, for manual correction.
pub async fn reconciliation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> WebResult<Json<ReconciliationReport>> {
    policy::authorize_reconciliation_view(&caller)?;
    let entries = state.reconciliation.entries();
    Ok(Json(ReconciliationReport {
        total: entries.len(),
        entries,
    }))
}
