//! Authorization Guard: per-operation policy checks.
//!
//! Evaluated after identity verification. A missing credential never reaches this
//! module (that is `Unauthorized`); everything here fails with `Forbidden`.
//!
//! | Operation | Allowed caller |
//! |---|---|
//! | create appointment | any authenticated identity |
//! | list my appointments | self (query is scoped to the caller) |
//! | list business appointments | business owner |
//! | cancel appointment | booking client or business owner |
//! | approve / reject | business owner |
//! | slot create / update / delete | `admin` role and business owner |
//! | reconciliation report | `admin` role |

use crate::error::{BookingError, Result};
use crate::identity::{Identity, Role};
use crate::types::{AppointmentContext, Business, UserId};

/// Cancel: the client who booked or the owning business's owner.
///
/// # Errors
///
/// Returns `Forbidden` for anyone else.
pub fn authorize_cancel(caller: &Identity, context: &AppointmentContext) -> Result<()> {
    if caller.user_id == context.appointment.user_id || caller.user_id == context.owner_id {
        Ok(())
    } else {
        Err(BookingError::Forbidden(
            "You do not have permission to cancel this appointment".to_string(),
        ))
    }
}

/// Approve or reject: the owning business's owner only.
///
/// # Errors
///
/// Returns `Forbidden` for anyone else, including the booking client.
pub fn authorize_owner(caller: &Identity, owner_id: UserId) -> Result<()> {
    if caller.user_id == owner_id {
        Ok(())
    } else {
        Err(BookingError::Forbidden(
            "Only the business owner can update appointment status".to_string(),
        ))
    }
}

/// Business appointment listing: owner only.
///
/// # Errors
///
/// Returns `Forbidden` for anyone but the owner.
pub fn authorize_business_listing(caller: &Identity, business: &Business) -> Result<()> {
    if caller.user_id == business.owner_id {
        Ok(())
    } else {
        Err(BookingError::Forbidden(
            "You can only view appointments for your own businesses".to_string(),
        ))
    }
}

/// Slot management: `admin` role and owner of the business.
///
/// # Errors
///
/// Returns `Forbidden` when the caller is not an admin or does not own `business`.
pub fn authorize_slot_management(caller: &Identity, business: &Business) -> Result<()> {
    if caller.role != Role::Admin {
        return Err(BookingError::Forbidden(
            "Only admins can manage schedules".to_string(),
        ));
    }
    if caller.user_id != business.owner_id {
        return Err(BookingError::Forbidden(
            "You can only manage schedules for your own businesses".to_string(),
        ));
    }
    Ok(())
}

/// Reconciliation report: any admin.
///
/// # Errors
///
/// Returns `Forbidden` for non-admins.
pub fn authorize_reconciliation_view(caller: &Identity) -> Result<()> {
    if caller.is_admin() {
        Ok(())
    } else {
        Err(BookingError::Forbidden(
            "Only admins can view the reconciliation report".to_string(),
        ))
    }
}
