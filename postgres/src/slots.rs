//! Slot persistence.

use sqlx::{PgConnection, PgPool};
use timely_core::{
    BusinessId, GuardedWrite, ScheduleId, Slot, SlotPatch, SlotStore, StoreError, StoreFuture,
};

use crate::rows::{SLOT_COLUMNS, SlotRow, db_error};

/// Lock a slot row for the rest of the transaction, returning its `available`.
///
/// Appointment inserts take a key-share lock on the slot through the foreign
/// key, so they wait for this lock, and a booking already in flight is
/// visible once it is granted.
async fn lock_slot(conn: &mut PgConnection, id: ScheduleId) -> Result<Option<bool>, StoreError> {
    let row: Option<(bool,)> =
        sqlx::query_as("SELECT available FROM schedules WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(db_error("lock schedule"))?;
    Ok(row.map(|(available,)| available))
}

async fn slot_is_held(conn: &mut PgConnection, id: ScheduleId) -> Result<bool, StoreError> {
    let (held,): (bool,) = sqlx::query_as(
        "SELECT EXISTS (
             SELECT 1 FROM appointments
             WHERE schedule_id = $1 AND verify IN ('pending', 'approved')
         )",
    )
    .bind(id.as_uuid())
    .fetch_one(&mut *conn)
    .await
    .map_err(db_error("check live appointments"))?;
    Ok(held)
}

/// `PostgreSQL`-backed [`SlotStore`] over the `schedules` table.
#[derive(Clone)]
pub struct PgSlotStore {
    pool: PgPool,
}

impl PgSlotStore {
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

impl SlotStore for PgSlotStore {
    fn insert(&self, slot: Slot) -> StoreFuture<'_, Slot> {
        Box::pin(async move {
            let query = format!(
                "INSERT INTO schedules (id, business_id, date, start_time, end_time, available)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING {SLOT_COLUMNS}"
            );
            let row: SlotRow = sqlx::query_as(&query)
                .bind(slot.id.as_uuid())
                .bind(slot.business_id.as_uuid())
                .bind(&slot.date)
                .bind(&slot.start_time)
                .bind(&slot.end_time)
                .bind(slot.available)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("insert schedule"))?;
            Ok(row.into())
        })
    }

    fn get(&self, id: ScheduleId) -> StoreFuture<'_, Option<Slot>> {
        Box::pin(async move {
            let query = format!("SELECT {SLOT_COLUMNS} FROM schedules WHERE id = $1");
            let row: Option<SlotRow> = sqlx::query_as(&query)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("load schedule"))?;
            Ok(row.map(Slot::from))
        })
    }

    fn list_by_business(
        &self,
        business_id: BusinessId,
        date: Option<String>,
    ) -> StoreFuture<'_, Vec<Slot>> {
        Box::pin(async move {
            let query = format!(
                "SELECT {SLOT_COLUMNS} FROM schedules
                 WHERE business_id = $1 AND ($2::text IS NULL OR date = $2)
                 ORDER BY date, start_time"
            );
            let rows: Vec<SlotRow> = sqlx::query_as(&query)
                .bind(business_id.as_uuid())
                .bind(date)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("list schedules"))?;
            Ok(rows.into_iter().map(Slot::from).collect())
        })
    }

    fn update(&self, id: ScheduleId, patch: SlotPatch) -> StoreFuture<'_, GuardedWrite<Slot>> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(db_error("begin schedule update"))?;

            let Some(available) = lock_slot(&mut tx, id).await? else {
                return Ok(GuardedWrite::Missing);
            };
            if patch.available == Some(true) && !available && slot_is_held(&mut tx, id).await? {
                return Ok(GuardedWrite::Held);
            }

            let query = format!(
                "UPDATE schedules SET
                    date = COALESCE($2, date),
                    start_time = COALESCE($3, start_time),
                    end_time = COALESCE($4, end_time),
                    available = COALESCE($5, available)
                 WHERE id = $1
                 RETURNING {SLOT_COLUMNS}"
            );
            let row: SlotRow = sqlx::query_as(&query)
                .bind(id.as_uuid())
                .bind(patch.date)
                .bind(patch.start_time)
                .bind(patch.end_time)
                .bind(patch.available)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error("update schedule"))?;

            tx.commit()
                .await
                .map_err(db_error("commit schedule update"))?;
            Ok(GuardedWrite::Applied(row.into()))
        })
    }

    fn set_availability(&self, id: ScheduleId, available: bool) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let result = sqlx::query("UPDATE schedules SET available = $2 WHERE id = $1")
                .bind(id.as_uuid())
                .bind(available)
                .execute(&self.pool)
                .await
                .map_err(db_error("set schedule availability"))?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn claim(&self, id: ScheduleId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            // The row lock taken by UPDATE serializes concurrent claims; the
            // loser re-evaluates the predicate and matches nothing.
            let result = sqlx::query(
                "UPDATE schedules SET available = false WHERE id = $1 AND available = true",
            )
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_error("claim schedule"))?;
            Ok(result.rows_affected() == 1)
        })
    }

    fn delete(&self, id: ScheduleId) -> StoreFuture<'_, GuardedWrite<()>> {
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(db_error("begin schedule delete"))?;

            if lock_slot(&mut tx, id).await?.is_none() {
                return Ok(GuardedWrite::Missing);
            }
            if slot_is_held(&mut tx, id).await? {
                return Ok(GuardedWrite::Held);
            }

            // Canceled history goes with the slot (ON DELETE CASCADE).
            sqlx::query("DELETE FROM schedules WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(db_error("delete schedule"))?;

            tx.commit()
                .await
                .map_err(db_error("commit schedule delete"))?;
            Ok(GuardedWrite::Applied(()))
        })
    }

    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(db_error("ping"))?;
            Ok(())
        })
    }
}
