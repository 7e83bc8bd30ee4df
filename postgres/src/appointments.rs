//! Appointment persistence and listing joins.

use sqlx::PgPool;
use timely_core::{
    Appointment, AppointmentContext, AppointmentId, AppointmentStore, AppointmentView, BusinessId,
    StoreError, StoreFuture, UserId, Verify, VerifyDecision,
};

use crate::rows::{
    APPOINTMENT_COLUMNS, AppointmentRow, ContextRow, ViewRow, db_error, parse_verify,
};

/// Appointment, slot and business columns for the listing views. The
/// profile columns are appended per query.
const VIEW_SELECT: &str = r"
    SELECT a.id, a.schedule_id, a.user_id, a.status, a.verify, a.created_at,
           s.business_id, s.date, s.start_time, s.end_time, s.available,
           b.name AS business_name, b.address AS business_address, b.phone AS business_phone";

/// `PostgreSQL`-backed [`AppointmentStore`] over the `appointments` table.
#[derive(Clone)]
pub struct PgAppointmentStore {
    pool: PgPool,
}

impl PgAppointmentStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn into_views(rows: Vec<ViewRow>) -> Result<Vec<AppointmentView>, StoreError> {
    rows.into_iter().map(AppointmentView::try_from).collect()
}

impl AppointmentStore for PgAppointmentStore {
    fn insert(&self, appointment: Appointment) -> StoreFuture<'_, Appointment> {
        Box::pin(async move {
            let query = format!(
                "INSERT INTO appointments (id, schedule_id, user_id, status, verify, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING {APPOINTMENT_COLUMNS}"
            );
            let row: AppointmentRow = sqlx::query_as(&query)
                .bind(appointment.id.as_uuid())
                .bind(appointment.schedule_id.as_uuid())
                .bind(appointment.user_id.as_uuid())
                .bind(appointment.status)
                .bind(appointment.verify.as_str())
                .bind(appointment.created_at)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("insert appointment"))?;
            row.try_into()
        })
    }

    fn get(&self, id: AppointmentId) -> StoreFuture<'_, Option<Appointment>> {
        Box::pin(async move {
            let query = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
            let row: Option<AppointmentRow> = sqlx::query_as(&query)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("load appointment"))?;
            row.map(Appointment::try_from).transpose()
        })
    }

    fn get_context(&self, id: AppointmentId) -> StoreFuture<'_, Option<AppointmentContext>> {
        Box::pin(async move {
            let row: Option<ContextRow> = sqlx::query_as(
                r"
                SELECT a.id, a.schedule_id, a.user_id, a.status, a.verify, a.created_at,
                       s.business_id, s.date, s.start_time, s.end_time, s.available,
                       b.owner_id
                FROM appointments a
                JOIN schedules s ON s.id = a.schedule_id
                JOIN businesses b ON b.id = s.business_id
                WHERE a.id = $1
                ",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("load appointment context"))?;
            row.map(AppointmentContext::try_from).transpose()
        })
    }

    fn list_by_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<AppointmentView>> {
        Box::pin(async move {
            let query = format!(
                "{VIEW_SELECT},
                    NULL::uuid AS profile_id, NULL::text AS profile_user_name,
                    NULL::text AS profile_phone
                 FROM appointments a
                 JOIN schedules s ON s.id = a.schedule_id
                 JOIN businesses b ON b.id = s.business_id
                 WHERE a.user_id = $1
                 ORDER BY a.created_at DESC"
            );
            let rows: Vec<ViewRow> = sqlx::query_as(&query)
                .bind(user_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("list user appointments"))?;
            into_views(rows)
        })
    }

    fn list_by_business(
        &self,
        business_id: BusinessId,
        date: Option<String>,
    ) -> StoreFuture<'_, Vec<AppointmentView>> {
        Box::pin(async move {
            let query = format!(
                "{VIEW_SELECT},
                    p.id AS profile_id, p.user_name AS profile_user_name,
                    p.phone AS profile_phone
                 FROM appointments a
                 JOIN schedules s ON s.id = a.schedule_id
                 JOIN businesses b ON b.id = s.business_id
                 LEFT JOIN user_profiles p ON p.id = a.user_id
                 WHERE s.business_id = $1 AND ($2::text IS NULL OR s.date = $2)"
            );
            let rows: Vec<ViewRow> = sqlx::query_as(&query)
                .bind(business_id.as_uuid())
                .bind(date)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("list business appointments"))?;
            into_views(rows)
        })
    }

    fn set_verify(
        &self,
        id: AppointmentId,
        expected: Verify,
        decision: VerifyDecision,
    ) -> StoreFuture<'_, Option<Appointment>> {
        Box::pin(async move {
            let query = format!(
                "UPDATE appointments SET verify = $3
                 WHERE id = $1 AND verify = $2
                 RETURNING {APPOINTMENT_COLUMNS}"
            );
            let row: Option<AppointmentRow> = sqlx::query_as(&query)
                .bind(id.as_uuid())
                .bind(expected.as_str())
                .bind(decision.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("update appointment verify"))?;
            row.map(Appointment::try_from).transpose()
        })
    }

    fn delete(&self, id: AppointmentId) -> StoreFuture<'_, Option<Verify>> {
        Box::pin(async move {
            let row: Option<(String,)> =
                sqlx::query_as("DELETE FROM appointments WHERE id = $1 RETURNING verify")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(db_error("delete appointment"))?;
            row.map(|(verify,)| parse_verify(&verify)).transpose()
        })
    }
}
