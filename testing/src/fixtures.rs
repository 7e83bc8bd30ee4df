//! Ready-made booking worlds for service-level tests.

use std::sync::Arc;
use timely_core::{
    BookingEnvironment, BookingOrchestrator, Business, BusinessId, Identity, ListingService,
    ReconciliationLog, Role, ScheduleId, ScheduleService, Slot, UserId, UserSummary,
};

use crate::mocks::test_clock;
use crate::stores::InMemoryDatabase;

/// A new admin identity.
#[must_use]
pub fn admin() -> Identity {
    Identity::new(UserId::new(), None, Role::Admin)
}

/// A new client identity.
#[must_use]
pub fn client() -> Identity {
    Identity::new(UserId::new(), None, Role::Cliente)
}

/// Business B owned by admin U1 with slot S (`2025-03-01`, `09:00`-`10:00`, available),
/// wired to an in-memory database and the three services.
pub struct World {
    /// Backing tables and fault switches
    pub db: InMemoryDatabase,
    /// Environment shared by the services
    pub env: BookingEnvironment,
    /// Reservation, cancellation and status updates
    pub orchestrator: BookingOrchestrator,
    /// Slot management
    pub schedules: ScheduleService,
    /// Joined views
    pub listing: ListingService,
    /// U1
    pub owner: Identity,
    /// B
    pub business: Business,
    /// S
    pub slot: Slot,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Build the world.
    #[must_use]
    pub fn new() -> Self {
        let db = InMemoryDatabase::new();
        let env = BookingEnvironment::new(
            Arc::new(db.slot_store()),
            Arc::new(db.appointment_store()),
            Arc::new(db.business_directory()),
        )
        .with_clock(Arc::new(test_clock()))
        .with_reconciliation(ReconciliationLog::default());

        let owner = admin();
        let business = Business {
            id: BusinessId::new(),
            owner_id: owner.user_id,
            name: "Barberia Central".to_string(),
            address: Some("Av. Siempre Viva 742".to_string()),
            phone: Some("555-0100".to_string()),
            info: None,
        };
        db.seed_business(business.clone());

        let slot = Slot {
            id: ScheduleId::new(),
            business_id: business.id,
            date: "2025-03-01".to_string(),
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            available: true,
        };
        db.seed_slot(slot.clone());

        Self {
            orchestrator: BookingOrchestrator::new(env.clone()),
            schedules: ScheduleService::new(env.clone()),
            listing: ListingService::new(env.clone()),
            db,
            env,
            owner,
            business,
            slot,
        }
    }

    /// A new client with a stored profile.
    #[must_use]
    pub fn client(&self, user_name: &str) -> Identity {
        let identity = client();
        self.db.seed_profile(UserSummary {
            id: identity.user_id,
            user_name: Some(user_name.to_string()),
            phone: None,
        });
        identity
    }

    /// Add another slot to business B.
    #[must_use]
    pub fn add_slot(&self, date: &str, start_time: &str, end_time: &str) -> Slot {
        let slot = Slot {
            id: ScheduleId::new(),
            business_id: self.business.id,
            date: date.to_string(),
            start_time: start_time.to_string(),
            end_time: end_time.to_string(),
            available: true,
        };
        self.db.seed_slot(slot.clone());
        slot
    }

    /// `available` of slot S as stored.
    #[must_use]
    pub fn slot_available(&self) -> bool {
        self.db.slot(self.slot.id).is_some_and(|s| s.available)
    }
}
