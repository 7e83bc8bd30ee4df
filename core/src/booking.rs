//! Booking Orchestrator: the appointment lifecycle state machine.
//!
//! # Reservation
//!
//! ```text
//! Requested ─► SlotChecked ─► Inserted ─► SlotFlipped ─► Committed
//!                                │
//!                                └──(claim lost or failed)──► RolledBack
//! ```
//!
//! The store has no multi-statement transactions. A reservation reads the slot,
//! inserts a pending appointment, then claims the slot with a single conditional
//! update (`available := false WHERE id = ? AND available`). Exactly one of any
//! number of concurrent requests wins the claim; every loser deletes the
//! appointment it inserted and fails with `Conflict`. So a slot never ends up
//! with two live appointments, and a failed claim never leaves one behind unless
//! the compensating delete itself fails, which is recorded in the
//! [`ReconciliationLog`](crate::ReconciliationLog).
//!
//! # Cancellation and rejection
//!
//! Both release the slot after the appointment change is stored. A failed release
//! does not fail the request (the primary change already happened); it comes back
//! as a warning and a `SlotNotReleased` entry.

use serde::Serialize;
use std::fmt;
use std::time::Instant;

use crate::environment::BookingEnvironment;
use crate::error::{BookingError, Result};
use crate::identity::Identity;
use crate::metrics;
use crate::policy;
use crate::reconciliation::Inconsistency;
use crate::types::{
    Appointment, AppointmentContext, AppointmentId, ScheduleId, UserId, Verify, VerifyDecision,
};

/// Warning returned when a slot could not be made available again.
pub const SLOT_NOT_RELEASED_WARNING: &str =
    "Schedule availability could not be restored; flagged for reconciliation";

/// Steps of a reservation attempt, as they appear in logs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BookingPhase {
    /// Request accepted
    Requested,
    /// Slot exists and was available when read
    SlotChecked,
    /// Pending appointment stored
    Inserted,
    /// Conditional claim won
    SlotFlipped,
    /// Reservation complete
    Committed,
    /// Appointment removed after a lost or failed claim
    RolledBack,
}

impl BookingPhase {
    /// Log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::SlotChecked => "slot_checked",
            Self::Inserted => "inserted",
            Self::SlotFlipped => "slot_flipped",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }
}

impl fmt::Display for BookingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a cancellation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CancelOutcome {
    /// The deleted appointment
    pub appointment_id: AppointmentId,
    /// Whether the slot was set back to available
    pub slot_released: bool,
    /// Non-fatal problems
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Result of an owner decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpdateOutcome {
    /// The appointment after the update
    pub appointment: Appointment,
    /// Non-fatal problems
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Coordinates slot and appointment writes for create, cancel and status update.
#[derive(Clone)]
pub struct BookingOrchestrator {
    env: BookingEnvironment,
}

impl BookingOrchestrator {
    /// Create an orchestrator over `env`.
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// The injected dependencies.
    #[must_use]
    pub const fn environment(&self) -> &BookingEnvironment {
        &self.env
    }

    /// Reserve a slot for the caller.
    ///
    /// Any authenticated identity may book any available slot.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the slot does not exist
    /// - `Conflict` if the slot is unavailable or another booking claimed it first
    /// - `Internal` if a store write fails
    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn create_appointment(
        &self,
        schedule_id: ScheduleId,
        caller: &Identity,
    ) -> Result<Appointment> {
        let started = Instant::now();
        let result = self.reserve(schedule_id, caller.user_id).await;

        match &result {
            Ok(_) => metrics::record_appointment("create", "created"),
            Err(err) => metrics::record_appointment("create", err.code()),
        }
        metrics::record_booking_duration(started.elapsed());

        result
    }

    async fn reserve(&self, schedule_id: ScheduleId, user_id: UserId) -> Result<Appointment> {
        tracing::debug!(phase = %BookingPhase::Requested, %schedule_id);

        let slot = self
            .env
            .slots
            .get(schedule_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Schedule", schedule_id))?;

        if !slot.available {
            return Err(BookingError::Conflict("Schedule is not available".to_string()));
        }
        tracing::debug!(phase = %BookingPhase::SlotChecked, %schedule_id);

        let appointment = Appointment::pending(
            AppointmentId::new(),
            schedule_id,
            user_id,
            self.env.clock.now(),
        );
        let appointment = self.env.appointments.insert(appointment).await?;
        tracing::debug!(
            phase = %BookingPhase::Inserted,
            appointment_id = %appointment.id,
            %schedule_id
        );

        match self.env.slots.claim(schedule_id).await {
            Ok(true) => {
                metrics::record_slot_claim("won");
                tracing::debug!(phase = %BookingPhase::SlotFlipped, %schedule_id);
                tracing::info!(
                    phase = %BookingPhase::Committed,
                    appointment_id = %appointment.id,
                    %schedule_id,
                    "Appointment created"
                );
                Ok(appointment)
            }
            Ok(false) => {
                metrics::record_slot_claim("lost");
                tracing::warn!(
                    appointment_id = %appointment.id,
                    %schedule_id,
                    "Slot claimed by a concurrent booking"
                );
                self.compensate(&appointment).await;
                Err(BookingError::Conflict("Schedule is not available".to_string()))
            }
            Err(err) => {
                metrics::record_slot_claim("error");
                tracing::error!(
                    appointment_id = %appointment.id,
                    %schedule_id,
                    error = %err,
                    "Failed to claim slot"
                );
                self.compensate(&appointment).await;
                Err(BookingError::Internal(
                    "Failed to update schedule availability".to_string(),
                ))
            }
        }
    }

    /// One-shot compensating delete of an appointment whose claim did not go through.
    async fn compensate(&self, appointment: &Appointment) {
        match self.env.appointments.delete(appointment.id).await {
            Ok(_) => {
                metrics::record_compensation("succeeded");
                tracing::info!(
                    phase = %BookingPhase::RolledBack,
                    appointment_id = %appointment.id,
                    "Compensating delete succeeded"
                );
            }
            Err(err) => {
                metrics::record_compensation("failed");
                self.env.reconciliation.record(
                    Inconsistency::OrphanedAppointment {
                        appointment_id: appointment.id,
                        schedule_id: appointment.schedule_id,
                        reason: err.to_string(),
                    },
                    self.env.clock.now(),
                );
            }
        }
    }

    /// Cancel an appointment as its client or as the business owner.
    ///
    /// The appointment row is deleted. If it still held its slot (pending or
    /// approved) the slot is released; an appointment already rejected by the
    /// owner released its slot at that point, and the slot may since have been
    /// booked again.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the appointment does not exist
    /// - `Forbidden` if the caller is neither the client nor the owner
    /// - `Internal` if the delete fails
    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn cancel_appointment(
        &self,
        appointment_id: AppointmentId,
        caller: &Identity,
    ) -> Result<CancelOutcome> {
        let context = self.load_context(appointment_id).await?;
        policy::authorize_cancel(caller, &context)?;

        let Some(deleted) = self.env.appointments.delete(appointment_id).await? else {
            // Deleted by a concurrent cancellation.
            return Err(BookingError::not_found("Appointment", appointment_id));
        };

        // Decide on the row as deleted, not as read above: a rejection in
        // between already released the slot, and a new booking may hold it.
        let mut warnings = Vec::new();
        let slot_released = if deleted.is_live() {
            self.release_slot(&context, &mut warnings).await
        } else {
            false
        };

        metrics::record_appointment("cancel", "canceled");
        tracing::info!(
            %appointment_id,
            schedule_id = %context.slot.id,
            slot_released,
            "Appointment canceled"
        );

        Ok(CancelOutcome {
            appointment_id,
            slot_released,
            warnings,
        })
    }

    /// Record the business owner's decision.
    ///
    /// `pending` may move to `approved` or `canceled`, `approved` may move to
    /// `canceled`, and `canceled` is terminal. Re-applying the current value
    /// succeeds without side effects. Approval keeps the slot consumed;
    /// cancellation releases it.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the appointment does not exist
    /// - `Forbidden` if the caller does not own the business
    /// - `Conflict` if the appointment is already canceled
    /// - `Internal` if the update fails
    #[tracing::instrument(skip(self, caller), fields(user_id = %caller.user_id))]
    pub async fn update_status(
        &self,
        appointment_id: AppointmentId,
        decision: VerifyDecision,
        caller: &Identity,
    ) -> Result<UpdateOutcome> {
        let context = self.load_context(appointment_id).await?;
        policy::authorize_owner(caller, context.owner_id)?;

        let target = decision.into_verify();
        let mut appointment = context.appointment.clone();

        // The write is conditional on the value read. When another decision
        // lands first, re-read and judge the transition again; `verify` only
        // moves forward, so this settles after at most two rounds.
        let (updated, from) = loop {
            let current = appointment.verify;
            if current == target {
                tracing::debug!(%appointment_id, verify = %current, "Status unchanged");
                return Ok(UpdateOutcome {
                    appointment,
                    warnings: Vec::new(),
                });
            }
            if current == Verify::Canceled {
                return Err(BookingError::Conflict(
                    "Appointment is already canceled".to_string(),
                ));
            }

            match self
                .env
                .appointments
                .set_verify(appointment_id, current, decision)
                .await?
            {
                Some(updated) => break (updated, current),
                None => {
                    tracing::debug!(%appointment_id, "Status changed concurrently, re-reading");
                    appointment = self.load_context(appointment_id).await?.appointment;
                }
            }
        };

        let mut warnings = Vec::new();
        if decision == VerifyDecision::Canceled {
            self.release_slot(&context, &mut warnings).await;
        }

        metrics::record_appointment("update_status", decision.as_str());
        tracing::info!(
            %appointment_id,
            %from,
            to = %target,
            "Appointment status updated"
        );

        Ok(UpdateOutcome {
            appointment: updated,
            warnings,
        })
    }

    async fn load_context(&self, appointment_id: AppointmentId) -> Result<AppointmentContext> {
        self.env
            .appointments
            .get_context(appointment_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Appointment", appointment_id))
    }

    /// Set the slot back to available. Returns whether it was released.
    async fn release_slot(&self, context: &AppointmentContext, warnings: &mut Vec<String>) -> bool {
        let schedule_id = context.slot.id;
        match self.env.slots.set_availability(schedule_id, true).await {
            Ok(true) => true,
            Ok(false) => {
                tracing::warn!(%schedule_id, "Slot no longer exists, nothing to release");
                false
            }
            Err(err) => {
                warnings.push(SLOT_NOT_RELEASED_WARNING.to_string());
                self.env.reconciliation.record(
                    Inconsistency::SlotNotReleased {
                        schedule_id,
                        appointment_id: context.appointment.id,
                        reason: err.to_string(),
                    },
                    self.env.clock.now(),
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_labels() {
        assert_eq!(BookingPhase::SlotFlipped.to_string(), "slot_flipped");
        assert_eq!(BookingPhase::RolledBack.as_str(), "rolled_back");
    }

    #[test]
    fn test_cancel_outcome_omits_empty_warnings() {
        let outcome = CancelOutcome {
            appointment_id: AppointmentId::new(),
            slot_released: true,
            warnings: Vec::new(),
        };
        let json = serde_json::to_value(&outcome).unwrap_or_default();
        assert!(json.get("warnings").is_none());
        assert_eq!(json["slot_released"], true);
    }
}
