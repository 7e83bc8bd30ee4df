//! Injected dependencies of the booking services.
//!
//! Every external collaborator sits behind a trait object so the services can be
//! driven by PostgreSQL in production and by in-memory stores in tests. The
//! environment is passed explicitly; nothing in the core reaches for global state.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::reconciliation::ReconciliationLog;
use crate::store::{AppointmentStore, BusinessDirectory, SlotStore};

/// Clock trait - abstracts time operations for testability
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Dependencies shared by the orchestrator, schedule, and listing services.
///
/// Cheap to clone: every field is reference counted.
#[derive(Clone)]
pub struct BookingEnvironment {
    /// Slot records
    pub slots: Arc<dyn SlotStore>,
    /// Appointment records
    pub appointments: Arc<dyn AppointmentStore>,
    /// Business ownership lookups
    pub businesses: Arc<dyn BusinessDirectory>,
    /// Timestamp source for `created_at`
    pub clock: Arc<dyn Clock>,
    /// Sink for partial-failure states
    pub reconciliation: ReconciliationLog,
}

impl BookingEnvironment {
    /// Create an environment with the system clock and a fresh reconciliation log.
    #[must_use]
    pub fn new(
        slots: Arc<dyn SlotStore>,
        appointments: Arc<dyn AppointmentStore>,
        businesses: Arc<dyn BusinessDirectory>,
    ) -> Self {
        Self {
            slots,
            appointments,
            businesses,
            clock: Arc::new(SystemClock),
            reconciliation: ReconciliationLog::default(),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the reconciliation log.
    #[must_use]
    pub fn with_reconciliation(mut self, reconciliation: ReconciliationLog) -> Self {
        self.reconciliation = reconciliation;
        self
    }
}
