//! Store abstractions for slots, appointments, and businesses.
//!
//! The record store behind these traits offers single-statement atomicity only.
//! Multi-step sequences (check slot, insert appointment, claim slot) are coordinated
//! by [`BookingOrchestrator`](crate::booking::BookingOrchestrator), which compensates
//! when a later step fails.
//!
//! # Implementations
//!
//! - `PgSlotStore`, `PgAppointmentStore`, `PgBusinessDirectory` (in `timely-postgres`)
//! - `InMemorySlotStore`, `InMemoryAppointmentStore`, `InMemoryBusinessDirectory`
//!   (in `timely-testing`), with fault injection
//!
//! # Dyn Compatibility
//!
//! These traits return `Pin<Box<dyn Future>>` instead of using `async fn` so the
//! services can hold them as `Arc<dyn SlotStore>` and so on.

use std::future::Future;
use std::pin::Pin;

use crate::error::StoreError;
use crate::types::{
    Appointment, AppointmentContext, AppointmentId, AppointmentView, Business, BusinessId,
    ScheduleId, Slot, SlotPatch, UserId, Verify, VerifyDecision,
};

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Outcome of a slot write that must not disturb a live appointment.
///
/// The live-appointment check and the write happen in one store operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardedWrite<T> {
    /// The write went through.
    Applied(T),
    /// The slot does not exist.
    Missing,
    /// A pending or approved appointment references the slot; nothing changed.
    Held,
}

/// Time-slot records scoped to a business.
pub trait SlotStore: Send + Sync {
    /// Persist a new slot. The caller has validated it.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn insert(&self, slot: Slot) -> StoreFuture<'_, Slot>;

    /// Load a slot by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails. A missing slot is `Ok(None)`.
    fn get(&self, id: ScheduleId) -> StoreFuture<'_, Option<Slot>>;

    /// Slots of a business, optionally restricted to one date, ordered by
    /// `(date, start_time)`.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_by_business(
        &self,
        business_id: BusinessId,
        date: Option<String>,
    ) -> StoreFuture<'_, Vec<Slot>>;

    /// Apply a partial update, returning the new row.
    ///
    /// A patch that sets `available: true` on an unavailable slot is refused
    /// with [`GuardedWrite::Held`] while a live appointment references it.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn update(&self, id: ScheduleId, patch: SlotPatch) -> StoreFuture<'_, GuardedWrite<Slot>>;

    /// Unconditionally set `available`. Returns `false` if the slot does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn set_availability(&self, id: ScheduleId, available: bool) -> StoreFuture<'_, bool>;

    /// Atomically flip `available` from `true` to `false`.
    ///
    /// Returns `true` only if this call changed the row. A `false` result means
    /// the slot was already taken (or no longer exists).
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn claim(&self, id: ScheduleId) -> StoreFuture<'_, bool>;

    /// Delete a slot that no live appointment references, together with its
    /// canceled appointment history.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn delete(&self, id: ScheduleId) -> StoreFuture<'_, GuardedWrite<()>>;

    /// Connectivity check used by readiness.
    ///
    /// # Errors
    ///
    /// Returns error if the store cannot be reached.
    fn ping(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}

/// Appointment records and their joined read views.
pub trait AppointmentStore: Send + Sync {
    /// Persist a new appointment.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn insert(&self, appointment: Appointment) -> StoreFuture<'_, Appointment>;

    /// Load an appointment by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn get(&self, id: AppointmentId) -> StoreFuture<'_, Option<Appointment>>;

    /// Load an appointment joined with its slot and the business owner.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn get_context(&self, id: AppointmentId) -> StoreFuture<'_, Option<AppointmentContext>>;

    /// Appointments booked by a user, joined with slot and business,
    /// newest `created_at` first.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_by_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<AppointmentView>>;

    /// Appointments on a business's slots, joined with slot, business and client
    /// profile, optionally restricted to one slot date. No ordering guarantee.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn list_by_business(
        &self,
        business_id: BusinessId,
        date: Option<String>,
    ) -> StoreFuture<'_, Vec<AppointmentView>>;

    /// Record the owner's decision if the stored value is still `expected`.
    ///
    /// Returns the updated row, or `None` if the appointment is gone or its
    /// `verify` no longer equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn set_verify(
        &self,
        id: AppointmentId,
        expected: Verify,
        decision: VerifyDecision,
    ) -> StoreFuture<'_, Option<Appointment>>;

    /// Delete an appointment, returning the `verify` value the deleted row
    /// held (`None` if it did not exist).
    ///
    /// # Errors
    ///
    /// Returns error if the write fails.
    fn delete(&self, id: AppointmentId) -> StoreFuture<'_, Option<Verify>>;
}

/// Read access to business ownership.
pub trait BusinessDirectory: Send + Sync {
    /// Load a business by id.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails.
    fn get(&self, id: BusinessId) -> StoreFuture<'_, Option<Business>>;
}
