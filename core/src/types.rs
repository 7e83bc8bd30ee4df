//! Domain types for the booking core.
//!
//! Identifiers are UUID newtypes. Dates and times are kept as the zero-padded
//! strings the clients send (`YYYY-MM-DD`, `HH:MM[:SS]`), so lexical order is
//! chronological order and no timezone handling takes place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::BookingError;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Create a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = BookingError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self).map_err(|_| {
                    BookingError::InvalidArgument(format!("Invalid {} id: {s}", $label))
                })
            }
        }
    };
}

define_id!(
    /// Unique identifier for a time slot (a "schedule" on the wire)
    ScheduleId,
    "schedule"
);
define_id!(
    /// Unique identifier for an appointment
    AppointmentId,
    "appointment"
);
define_id!(
    /// Unique identifier for a business
    BusinessId,
    "business"
);
define_id!(
    /// Unique identifier for a user (the identity provider's subject)
    UserId,
    "user"
);

// ============================================================================
// Verification status
// ============================================================================

/// The business owner's decision on a booking.
///
/// `Pending` on creation; `Approved` consumes the slot, `Canceled` frees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verify {
    /// Awaiting the owner's decision
    Pending,
    /// Accepted by the owner
    Approved,
    /// Rejected or revoked by the owner
    Canceled,
}

impl Verify {
    /// Wire/storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Canceled => "canceled",
        }
    }

    /// Whether an appointment in this state still holds its slot.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }
}

impl fmt::Display for Verify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verify {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "canceled" => Ok(Self::Canceled),
            other => Err(BookingError::InvalidArgument(format!(
                "Unknown verify value: {other}"
            ))),
        }
    }
}

/// A value an owner may set on an appointment.
///
/// Narrower than [`Verify`]: an appointment can never be moved back to `pending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifyDecision {
    /// Approve the booking; the slot stays consumed
    Approved,
    /// Reject the booking; the slot is released
    Canceled,
}

impl VerifyDecision {
    /// Wire/storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.into_verify().as_str()
    }

    /// The resulting verification status.
    #[must_use]
    pub const fn into_verify(self) -> Verify {
        match self {
            Self::Approved => Verify::Approved,
            Self::Canceled => Verify::Canceled,
        }
    }
}

impl From<VerifyDecision> for Verify {
    fn from(decision: VerifyDecision) -> Self {
        decision.into_verify()
    }
}

impl FromStr for VerifyDecision {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "canceled" => Ok(Self::Canceled),
            _ => Err(BookingError::InvalidArgument(
                r#"Invalid verify value. Must be "approved" or "canceled""#.to_string(),
            )),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// A business's offered time window on a date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Slot id
    pub id: ScheduleId,
    /// Owning business (immutable)
    pub business_id: BusinessId,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    /// Start of the window, `HH:MM` or `HH:MM:SS`
    pub start_time: String,
    /// End of the window, `HH:MM` or `HH:MM:SS`
    pub end_time: String,
    /// `true` while the slot can be booked
    pub available: bool,
}

/// Partial update of a slot. `None` leaves the field untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotPatch {
    /// New date
    pub date: Option<String>,
    /// New start time
    pub start_time: Option<String>,
    /// New end time
    pub end_time: Option<String>,
    /// New availability
    pub available: Option<bool>,
}

impl SlotPatch {
    /// Apply the patch to a slot in place.
    pub fn apply(&self, slot: &mut Slot) {
        if let Some(date) = &self.date {
            slot.date.clone_from(date);
        }
        if let Some(start_time) = &self.start_time {
            slot.start_time.clone_from(start_time);
        }
        if let Some(end_time) = &self.end_time {
            slot.end_time.clone_from(end_time);
        }
        if let Some(available) = self.available {
            slot.available = available;
        }
    }

    /// `true` when the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.available.is_none()
    }
}

/// A client's reservation against one slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Appointment id
    pub id: AppointmentId,
    /// Reserved slot (immutable)
    pub schedule_id: ScheduleId,
    /// Client who booked (immutable)
    pub user_id: UserId,
    /// Legacy "confirmed" flag kept for existing API consumers. Always `true`.
    pub status: bool,
    /// Owner decision
    pub verify: Verify,
    /// Insert time, used for ordering
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// A fresh pending appointment.
    #[must_use]
    pub const fn pending(
        id: AppointmentId,
        schedule_id: ScheduleId,
        user_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            schedule_id,
            user_id,
            status: true,
            verify: Verify::Pending,
            created_at,
        }
    }
}

/// A business as far as the booking core is concerned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Business {
    /// Business id
    pub id: BusinessId,
    /// Owning admin
    pub owner_id: UserId,
    /// Display name
    pub name: String,
    /// Street address
    pub address: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Free-form description
    pub info: Option<String>,
}

impl Business {
    /// Public subset embedded in appointment listings.
    #[must_use]
    pub fn summary(&self) -> BusinessSummary {
        BusinessSummary {
            id: self.id,
            name: self.name.clone(),
            address: self.address.clone(),
            phone: self.phone.clone(),
        }
    }
}

// ============================================================================
// Joined views
// ============================================================================

/// Business fields embedded in listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSummary {
    /// Business id
    pub id: BusinessId,
    /// Display name
    pub name: String,
    /// Street address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
}

/// Client profile fields embedded in business listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// User id
    pub id: UserId,
    /// Display name
    pub user_name: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
}

/// A slot joined with its business.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotWithBusiness {
    /// Slot fields
    #[serde(flatten)]
    pub slot: Slot,
    /// Owning business
    pub business: BusinessSummary,
}

/// An appointment joined with its slot, business, and optionally the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentView {
    /// Appointment fields
    #[serde(flatten)]
    pub appointment: Appointment,
    /// Reserved slot with its business
    pub schedule: SlotWithBusiness,
    /// Client profile (business listings only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// What the orchestrator needs to authorize and apply a transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppointmentContext {
    /// The appointment
    pub appointment: Appointment,
    /// Its slot
    pub slot: Slot,
    /// Owner of the slot's business
    pub owner_id: UserId,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_decision_rejects_pending() {
        assert!("pending".parse::<VerifyDecision>().is_err());
        assert!("APPROVED".parse::<VerifyDecision>().is_err());
        assert_eq!(
            "canceled".parse::<VerifyDecision>().unwrap(),
            VerifyDecision::Canceled
        );
    }

    #[test]
    fn test_id_parse_error_is_invalid_argument() {
        let err = "not-a-uuid".parse::<ScheduleId>().unwrap_err();
        assert!(matches!(err, BookingError::InvalidArgument(_)));
    }

    #[test]
    fn test_appointment_serializes_flat_with_legacy_status() {
        let appointment = Appointment::pending(
            AppointmentId::new(),
            ScheduleId::new(),
            UserId::new(),
            Utc::now(),
        );
        let json = serde_json::to_value(&appointment).unwrap();
        assert_eq!(json["verify"], "pending");
        assert_eq!(json["status"], true);
    }

    #[test]
    fn test_patch_apply() {
        let mut slot = Slot {
            id: ScheduleId::new(),
            business_id: BusinessId::new(),
            date: "2025-03-01".to_string(),
            start_time: "09:00".to_string(),
            end_time: "10:00".to_string(),
            available: true,
        };
        let patch = SlotPatch {
            end_time: Some("11:00".to_string()),
            available: Some(false),
            ..SlotPatch::default()
        };
        patch.apply(&mut slot);
        assert_eq!(slot.end_time, "11:00");
        assert_eq!(slot.start_time, "09:00");
        assert!(!slot.available);
        assert!(SlotPatch::default().is_empty());
    }
}
