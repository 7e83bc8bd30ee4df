//! # Timely Testing
//!
//! Testing utilities for the Timely booking core.
//!
//! This crate provides:
//! - In-memory implementations of the store traits, with fault injection
//! - A fixed clock for deterministic timestamps
//! - A ready-made [`World`] (business, owner, slot, services)
//!
//! ## Example
//!
//! ```ignore
//! use timely_testing::{FaultPoint, World};
//!
//! #[tokio::test]
//! async fn test_rollback() {
//!     let world = World::new();
//!     let client = world.client("Ana");
//!
//!     world.db.fail_next(FaultPoint::SlotClaim);
//!     let result = world.orchestrator.create_appointment(world.slot.id, &client).await;
//!
//!     assert!(result.is_err());
//!     assert!(world.slot_available());
//! }
//! ```

pub mod fixtures;
pub mod stores;

/// Deterministic collaborators.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use timely_core::Clock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use timely_testing::mocks::FixedClock;
    /// use timely_core::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// Never in practice: the timestamp is a literal.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

/// Install a test-friendly `tracing` subscriber. Safe to call from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub use fixtures::{World, admin, client};
pub use mocks::{FixedClock, test_clock};
pub use stores::{
    FaultPoint, InMemoryAppointmentStore, InMemoryBusinessDirectory, InMemoryDatabase,
    InMemorySlotStore,
};

#[cfg(test)]
mod tests {
    use super::*;
    use timely_core::Clock;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
    }

    #[test]
    fn test_world_seeds_available_slot() {
        let world = World::new();
        assert!(world.slot_available());
        assert_eq!(world.business.owner_id, world.owner.user_id);
    }
}
