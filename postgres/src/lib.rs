//! `PostgreSQL` stores for Timely.
//!
//! Implements the store traits from `timely-core` on top of a shared `sqlx`
//! connection pool:
//!
//! - [`PgSlotStore`]: time slots, including the conditional claim
//! - [`PgAppointmentStore`]: appointments and their joined listing views
//! - [`PgBusinessDirectory`]: business ownership lookups
//!
//! Every statement runs on its own; the booking orchestrator coordinates
//! multi-step sequences. The claim is a single conditional `UPDATE`, so two
//! concurrent bookings of one slot cannot both succeed.
//!
//! # Example
//!
//! ```ignore
//! use timely_postgres::{PgStores, PoolSettings};
//!
//! let pool = timely_postgres::connect(&PoolSettings::new(database_url)).await?;
//! timely_postgres::migrate(&pool).await?;
//! let stores = PgStores::new(pool);
//! ```

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use timely_core::{AppointmentStore, BusinessDirectory, SlotStore, StoreError};

mod appointments;
mod businesses;
mod rows;
mod slots;

pub use appointments::PgAppointmentStore;
pub use businesses::PgBusinessDirectory;
pub use slots::PgSlotStore;

/// Connection pool settings.
#[derive(Clone, Debug)]
pub struct PoolSettings {
    /// `postgres://` connection string
    pub url: String,
    /// Upper bound on open connections
    pub max_connections: u32,
    /// Connections kept open while idle
    pub min_connections: u32,
    /// How long to wait for a free connection
    pub acquire_timeout: Duration,
    /// Idle connections are closed after this long
    pub idle_timeout: Duration,
    /// Connections are recycled after this long
    pub max_lifetime: Duration,
}

impl PoolSettings {
    /// Default settings for the given connection string.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }

    /// Override the maximum pool size.
    #[must_use]
    pub const fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Override the acquire timeout.
    #[must_use]
    pub const fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Open a connection pool.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the database cannot be reached.
pub async fn connect(settings: &PoolSettings) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections.min(settings.max_connections))
        .acquire_timeout(settings.acquire_timeout)
        .idle_timeout(settings.idle_timeout)
        .max_lifetime(settings.max_lifetime)
        .connect(&settings.url)
        .await
        .map_err(|e| StoreError::Unavailable(format!("Failed to connect: {e}")))?;

    tracing::info!(
        max_connections = settings.max_connections,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Apply the bundled schema migrations.
///
/// # Errors
///
/// Returns [`StoreError::Database`] if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// The three stores over one pool, ready to hand to the services.
#[derive(Clone)]
pub struct PgStores {
    /// Slot store
    pub slots: Arc<dyn SlotStore>,
    /// Appointment store
    pub appointments: Arc<dyn AppointmentStore>,
    /// Business directory
    pub businesses: Arc<dyn BusinessDirectory>,
}

impl PgStores {
    /// Build all stores over a shared pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            slots: Arc::new(PgSlotStore::new(pool.clone())),
            appointments: Arc::new(PgAppointmentStore::new(pool.clone())),
            businesses: Arc::new(PgBusinessDirectory::new(pool)),
        }
    }
}
