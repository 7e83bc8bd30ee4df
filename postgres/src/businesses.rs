//! Business ownership lookups.
//!
//! Businesses and profiles are managed outside the booking flow; the insert
//! helpers exist for provisioning and tests.

use sqlx::PgPool;
use timely_core::{Business, BusinessDirectory, BusinessId, Role, StoreError, StoreFuture, UserId};

use crate::rows::{BusinessRow, db_error};

/// `PostgreSQL`-backed [`BusinessDirectory`].
#[derive(Clone)]
pub struct PgBusinessDirectory {
    pool: PgPool,
}

impl PgBusinessDirectory {
    /// Create a directory over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a business.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn upsert(&self, business: &Business) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO businesses (id, owner_id, name, address, phone, info)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                name = EXCLUDED.name,
                address = EXCLUDED.address,
                phone = EXCLUDED.phone,
                info = EXCLUDED.info
            ",
        )
        .bind(business.id.as_uuid())
        .bind(business.owner_id.as_uuid())
        .bind(&business.name)
        .bind(&business.address)
        .bind(&business.phone)
        .bind(&business.info)
        .execute(&self.pool)
        .await
        .map_err(db_error("upsert business"))?;
        Ok(())
    }

    /// Insert or replace a user profile.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the write fails.
    pub async fn upsert_profile(
        &self,
        user_id: UserId,
        user_name: Option<&str>,
        phone: Option<&str>,
        role: Role,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO user_profiles (id, user_name, phone, role)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                user_name = EXCLUDED.user_name,
                phone = EXCLUDED.phone,
                role = EXCLUDED.role
            ",
        )
        .bind(user_id.as_uuid())
        .bind(user_name)
        .bind(phone)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_error("upsert profile"))?;
        Ok(())
    }
}

impl BusinessDirectory for PgBusinessDirectory {
    fn get(&self, id: BusinessId) -> StoreFuture<'_, Option<Business>> {
        Box::pin(async move {
            let row: Option<BusinessRow> = sqlx::query_as(
                "SELECT id, owner_id, name, address, phone, info FROM businesses WHERE id = $1",
            )
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("load business"))?;
            Ok(row.map(Business::from))
        })
    }
}
