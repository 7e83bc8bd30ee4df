//! Slot management for business owners.

use crate::environment::BookingEnvironment;
use crate::error::{BookingError, Result};
use crate::identity::Identity;
use crate::policy;
use crate::store::GuardedWrite;
use crate::types::{Business, BusinessId, ScheduleId, Slot};
use crate::validation::{self, SlotPatchRequest, SlotRequest};

/// Create, list, update and delete slots.
///
/// Writes require the `admin` role and ownership of the slot's business.
/// Listing is public.
#[derive(Clone)]
pub struct ScheduleService {
    env: BookingEnvironment,
}

impl ScheduleService {
    /// Create a schedule service over `env`.
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// Publish a new slot for a business.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the business does not exist
    /// - `Forbidden` if the caller is not an admin owning it
    /// - `InvalidArgument` if the request fails validation
    /// - `Internal` if the insert fails
    #[tracing::instrument(skip(self, request, caller), fields(user_id = %caller.user_id))]
    pub async fn create_slot(
        &self,
        business_id: BusinessId,
        request: SlotRequest,
        caller: &Identity,
    ) -> Result<Slot> {
        let business = self.load_business(business_id).await?;
        policy::authorize_slot_management(caller, &business)?;

        let slot = request.into_slot(business_id)?;
        let slot = self.env.slots.insert(slot).await?;

        tracing::info!(schedule_id = %slot.id, %business_id, date = %slot.date, "Slot created");
        Ok(slot)
    }

    /// Slots of a business, optionally for one date, ordered by `(date, start_time)`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a malformed date
    /// - `Internal` if the query fails
    pub async fn list_slots(
        &self,
        business_id: BusinessId,
        date: Option<String>,
    ) -> Result<Vec<Slot>> {
        let date = validation::validate_date_filter(date)?;
        Ok(self.env.slots.list_by_business(business_id, date).await?)
    }

    /// Partially update a slot.
    ///
    /// Re-opening a slot (`available: true`) is refused while a live appointment
    /// still holds it.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the slot or its business does not exist
    /// - `Forbidden` if the caller is not an admin owning the business
    /// - `InvalidArgument` if the patch fails validation
    /// - `Conflict` when re-opening a held slot
    /// - `Internal` if a store operation fails
    #[tracing::instrument(skip(self, request, caller), fields(user_id = %caller.user_id))]
    pub async fn update_slot(
        &self,
        schedule_id: ScheduleId,
        request: SlotPatchRequest,
        caller: &Identity,
    ) -> Result<Slot> {
        let slot = self.load_slot(schedule_id).await?;
        let business = self.load_business(slot.business_id).await?;
        policy::authorize_slot_management(caller, &business)?;

        let patch = request.into_patch(&slot)?;

        let updated = match self.env.slots.update(schedule_id, patch).await? {
            GuardedWrite::Applied(updated) => updated,
            GuardedWrite::Missing => return Err(BookingError::not_found("Schedule", schedule_id)),
            GuardedWrite::Held => {
                return Err(BookingError::Conflict(
                    "Schedule has an active appointment and cannot be made available".to_string(),
                ));
            }
        };

        tracing::info!(%schedule_id, "Slot updated");
        Ok(updated)
    }

    /// Delete a slot that no live appointment references.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the slot or its business does not exist
    /// - `Forbidden` if the caller is not an admin owning the business
    /// - `Conflict` if a pending or approved appointment references the slot
    /// - `Internal` if a store operation fails
    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn delete_slot(&self, schedule_id: ScheduleId, caller: &Identity) -> Result<()> {
        let slot = self.load_slot(schedule_id).await?;
        let business = self.load_business(slot.business_id).await?;
        policy::authorize_slot_management(caller, &business)?;

        match self.env.slots.delete(schedule_id).await? {
            GuardedWrite::Applied(()) => {
                tracing::info!(%schedule_id, "Slot deleted");
                Ok(())
            }
            GuardedWrite::Missing => Err(BookingError::not_found("Schedule", schedule_id)),
            GuardedWrite::Held => Err(BookingError::Conflict(
                "Schedule has an active appointment and cannot be deleted".to_string(),
            )),
        }
    }

    async fn load_slot(&self, schedule_id: ScheduleId) -> Result<Slot> {
        self.env
            .slots
            .get(schedule_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Schedule", schedule_id))
    }

    async fn load_business(&self, business_id: BusinessId) -> Result<Business> {
        self.env
            .businesses
            .get(business_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Business", business_id))
    }
}
