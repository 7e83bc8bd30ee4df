//! Query/Listing Service: joined appointment views for clients and owners.
//!
//! Reads never block writes and may observe a slot before or after a concurrent
//! flip.

use serde::Serialize;
use std::cmp::Ordering;

use crate::environment::BookingEnvironment;
use crate::error::{BookingError, Result};
use crate::identity::Identity;
use crate::policy;
use crate::types::{AppointmentView, BusinessId};
use crate::validation;

/// Appointments on one business's slots, as returned to the owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessAppointments {
    /// Sorted by `(date, start_time)`
    pub appointments: Vec<AppointmentView>,
    /// `appointments.len()`
    pub total: usize,
    /// The date filter, or `"all"`
    pub date: String,
    /// The business queried
    pub business_id: BusinessId,
}

/// Order views ascending by slot `(date, start_time)`.
///
/// Both fields are zero-padded fixed-format strings, so byte order is
/// chronological order. The sort is stable.
pub fn sort_by_slot_time(appointments: &mut [AppointmentView]) {
    appointments.sort_by(|a, b| compare_slot_time(a, b));
}

fn compare_slot_time(a: &AppointmentView, b: &AppointmentView) -> Ordering {
    let (a, b) = (&a.schedule.slot, &b.schedule.slot);
    a.date
        .cmp(&b.date)
        .then_with(|| a.start_time.cmp(&b.start_time))
}

/// Read side of the booking core.
#[derive(Clone)]
pub struct ListingService {
    env: BookingEnvironment,
}

impl ListingService {
    /// Create a listing service over `env`.
    #[must_use]
    pub const fn new(env: BookingEnvironment) -> Self {
        Self { env }
    }

    /// The caller's own appointments, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the query fails.
    pub async fn list_for_user(&self, caller: &Identity) -> Result<Vec<AppointmentView>> {
        let appointments = self.env.appointments.list_by_user(caller.user_id).await?;
        tracing::debug!(user_id = %caller.user_id, count = appointments.len(), "Listed user appointments");
        Ok(appointments)
    }

    /// Appointments on a business's slots, optionally for one date. Owner only.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a malformed date
    /// - `NotFound` if the business does not exist
    /// - `Forbidden` if the caller does not own it
    /// - `Internal` if a query fails
    pub async fn list_for_business(
        &self,
        business_id: BusinessId,
        date: Option<String>,
        caller: &Identity,
    ) -> Result<BusinessAppointments> {
        let date = validation::validate_date_filter(date)?;

        let business = self
            .env
            .businesses
            .get(business_id)
            .await?
            .ok_or_else(|| BookingError::not_found("Business", business_id))?;
        policy::authorize_business_listing(caller, &business)?;

        let mut appointments = self
            .env
            .appointments
            .list_by_business(business_id, date.clone())
            .await?;
        sort_by_slot_time(&mut appointments);

        Ok(BusinessAppointments {
            total: appointments.len(),
            appointments,
            date: date.unwrap_or_else(|| "all".to_string()),
            business_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Appointment, AppointmentId, BusinessSummary, ScheduleId, Slot, SlotWithBusiness, UserId,
    };
    use chrono::Utc;
    use proptest::prelude::*;

    fn view(date: &str, start_time: &str) -> AppointmentView {
        let business_id = BusinessId::new();
        let slot = Slot {
            id: ScheduleId::new(),
            business_id,
            date: date.to_string(),
            start_time: start_time.to_string(),
            end_time: "23:59:59".to_string(),
            available: false,
        };
        AppointmentView {
            appointment: Appointment::pending(AppointmentId::new(), slot.id, UserId::new(), Utc::now()),
            schedule: SlotWithBusiness {
                slot,
                business: BusinessSummary {
                    id: business_id,
                    name: "Shop".to_string(),
                    address: None,
                    phone: None,
                },
            },
            user: None,
        }
    }

    fn keys(views: &[AppointmentView]) -> Vec<(String, String)> {
        views
            .iter()
            .map(|v| (v.schedule.slot.date.clone(), v.schedule.slot.start_time.clone()))
            .collect()
    }

    #[test]
    fn test_sorts_by_date_then_start_time() {
        let mut views = vec![
            view("2025-03-02", "08:00"),
            view("2025-03-01", "14:30"),
            view("2025-03-01", "09:00:30"),
            view("2025-03-01", "09:00"),
        ];
        sort_by_slot_time(&mut views);
        assert_eq!(
            keys(&views),
            vec![
                ("2025-03-01".to_string(), "09:00".to_string()),
                ("2025-03-01".to_string(), "09:00:30".to_string()),
                ("2025-03-01".to_string(), "14:30".to_string()),
                ("2025-03-02".to_string(), "08:00".to_string()),
            ]
        );
    }

    #[test]
    fn test_output_uses_camel_case_business_id() {
        let out = BusinessAppointments {
            appointments: Vec::new(),
            total: 0,
            date: "all".to_string(),
            business_id: BusinessId::new(),
        };
        let json = serde_json::to_value(&out).unwrap_or_default();
        assert!(json.get("businessId").is_some());
        assert_eq!(json["date"], "all");
    }

    fn slot_time() -> impl Strategy<Value = (String, String)> {
        (
            2024u32..2027,
            1u32..13,
            1u32..29,
            0u32..24,
            0u32..60,
            proptest::option::of(0u32..60),
        )
            .prop_map(|(y, mo, d, h, mi, s)| {
                let time = match s {
                    Some(s) => format!("{h:02}:{mi:02}:{s:02}"),
                    None => format!("{h:02}:{mi:02}"),
                };
                (format!("{y:04}-{mo:02}-{d:02}"), time)
            })
    }

    proptest! {
        #[test]
        fn prop_listing_is_sorted_for_any_permutation(
            slots in proptest::collection::vec(slot_time(), 0..40)
        ) {
            let mut views: Vec<_> = slots.iter().map(|(d, t)| view(d, t)).collect();
            sort_by_slot_time(&mut views);

            let sorted = keys(&views);
            for pair in sorted.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
            prop_assert_eq!(sorted.len(), slots.len());
        }
    }
}
