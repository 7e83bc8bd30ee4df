//! Row types and their mapping to domain records.

use chrono::{DateTime, Utc};
use sqlx::types::Uuid;
use timely_core::{
    Appointment, AppointmentContext, AppointmentId, AppointmentView, Business, BusinessId,
    BusinessSummary, ScheduleId, Slot, SlotWithBusiness, StoreError, UserId, UserSummary, Verify,
};

/// Map a `sqlx` error to a store error, tagging it with the failed operation.
pub(crate) fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> StoreError {
    move |err| match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("{operation}: {err}"))
        }
        other => StoreError::Database(format!("{operation}: {other}")),
    }
}

pub(crate) fn parse_verify(value: &str) -> Result<Verify, StoreError> {
    value
        .parse()
        .map_err(|_| StoreError::Database(format!("unexpected verify value in row: {value}")))
}

/// Columns shared by every slot query.
pub(crate) const SLOT_COLUMNS: &str = "id, business_id, date, start_time, end_time, available";

/// Columns shared by every appointment query.
pub(crate) const APPOINTMENT_COLUMNS: &str = "id, schedule_id, user_id, status, verify, created_at";

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SlotRow {
    id: Uuid,
    business_id: Uuid,
    date: String,
    start_time: String,
    end_time: String,
    available: bool,
}

impl From<SlotRow> for Slot {
    fn from(row: SlotRow) -> Self {
        Self {
            id: ScheduleId::from_uuid(row.id),
            business_id: BusinessId::from_uuid(row.business_id),
            date: row.date,
            start_time: row.start_time,
            end_time: row.end_time,
            available: row.available,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AppointmentRow {
    id: Uuid,
    schedule_id: Uuid,
    user_id: Uuid,
    status: bool,
    verify: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<AppointmentRow> for Appointment {
    type Error = StoreError;

    fn try_from(row: AppointmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: AppointmentId::from_uuid(row.id),
            schedule_id: ScheduleId::from_uuid(row.schedule_id),
            user_id: UserId::from_uuid(row.user_id),
            status: row.status,
            verify: parse_verify(&row.verify)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BusinessRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    address: Option<String>,
    phone: Option<String>,
    info: Option<String>,
}

impl From<BusinessRow> for Business {
    fn from(row: BusinessRow) -> Self {
        Self {
            id: BusinessId::from_uuid(row.id),
            owner_id: UserId::from_uuid(row.owner_id),
            name: row.name,
            address: row.address,
            phone: row.phone,
            info: row.info,
        }
    }
}

/// Appointment joined with slot, business and optionally the client profile.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ViewRow {
    id: Uuid,
    schedule_id: Uuid,
    user_id: Uuid,
    status: bool,
    verify: String,
    created_at: DateTime<Utc>,
    business_id: Uuid,
    date: String,
    start_time: String,
    end_time: String,
    available: bool,
    business_name: String,
    business_address: Option<String>,
    business_phone: Option<String>,
    profile_id: Option<Uuid>,
    profile_user_name: Option<String>,
    profile_phone: Option<String>,
}

impl TryFrom<ViewRow> for AppointmentView {
    type Error = StoreError;

    fn try_from(row: ViewRow) -> Result<Self, Self::Error> {
        let business_id = BusinessId::from_uuid(row.business_id);
        Ok(Self {
            appointment: Appointment {
                id: AppointmentId::from_uuid(row.id),
                schedule_id: ScheduleId::from_uuid(row.schedule_id),
                user_id: UserId::from_uuid(row.user_id),
                status: row.status,
                verify: parse_verify(&row.verify)?,
                created_at: row.created_at,
            },
            schedule: SlotWithBusiness {
                slot: Slot {
                    id: ScheduleId::from_uuid(row.schedule_id),
                    business_id,
                    date: row.date,
                    start_time: row.start_time,
                    end_time: row.end_time,
                    available: row.available,
                },
                business: BusinessSummary {
                    id: business_id,
                    name: row.business_name,
                    address: row.business_address,
                    phone: row.business_phone,
                },
            },
            user: row.profile_id.map(|id| UserSummary {
                id: UserId::from_uuid(id),
                user_name: row.profile_user_name,
                phone: row.profile_phone,
            }),
        })
    }
}

/// Appointment joined with its slot and the business owner.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ContextRow {
    id: Uuid,
    schedule_id: Uuid,
    user_id: Uuid,
    status: bool,
    verify: String,
    created_at: DateTime<Utc>,
    business_id: Uuid,
    date: String,
    start_time: String,
    end_time: String,
    available: bool,
    owner_id: Uuid,
}

impl TryFrom<ContextRow> for AppointmentContext {
    type Error = StoreError;

    fn try_from(row: ContextRow) -> Result<Self, Self::Error> {
        Ok(Self {
            appointment: Appointment {
                id: AppointmentId::from_uuid(row.id),
                schedule_id: ScheduleId::from_uuid(row.schedule_id),
                user_id: UserId::from_uuid(row.user_id),
                status: row.status,
                verify: parse_verify(&row.verify)?,
                created_at: row.created_at,
            },
            slot: Slot {
                id: ScheduleId::from_uuid(row.schedule_id),
                business_id: BusinessId::from_uuid(row.business_id),
                date: row.date,
                start_time: row.start_time,
                end_time: row.end_time,
                available: row.available,
            },
            owner_id: UserId::from_uuid(row.owner_id),
        })
    }
}
