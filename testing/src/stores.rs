//! In-memory store implementations with fault injection.
//!
//! [`InMemoryDatabase`] holds every table behind one lock, so each store call is
//! atomic like a single SQL statement and nothing more. The three facades
//! implement the core store traits over a shared database. Every call yields to
//! the scheduler first so concurrent requests actually interleave between steps.
//!
//! # Example
//!
//! ```
//! use timely_testing::{FaultPoint, InMemoryDatabase};
//!
//! let db = InMemoryDatabase::new();
//! db.fail_next(FaultPoint::SlotClaim);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use timely_core::{
    Appointment, AppointmentContext, AppointmentId, AppointmentStore, AppointmentView, Business,
    BusinessDirectory, BusinessId, GuardedWrite, ScheduleId, Slot, SlotPatch, SlotStore,
    SlotWithBusiness, StoreError, StoreFuture, UserId, UserSummary, Verify, VerifyDecision,
};

/// A store operation that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// `SlotStore::insert`
    SlotInsert,
    /// `SlotStore::get`
    SlotGet,
    /// `SlotStore::update`
    SlotUpdate,
    /// `SlotStore::set_availability`
    SlotSetAvailability,
    /// `SlotStore::claim`
    SlotClaim,
    /// `SlotStore::delete`
    SlotDelete,
    /// `AppointmentStore::insert`
    AppointmentInsert,
    /// `AppointmentStore::get_context`
    AppointmentGetContext,
    /// `AppointmentStore::set_verify`
    AppointmentSetVerify,
    /// `AppointmentStore::delete`
    AppointmentDelete,
    /// Both appointment listings
    AppointmentList,
    /// `BusinessDirectory::get`
    BusinessGet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FaultMode {
    Once,
    Always,
}

#[derive(Debug, Default)]
struct Tables {
    slots: HashMap<ScheduleId, Slot>,
    appointments: HashMap<AppointmentId, Appointment>,
    businesses: HashMap<BusinessId, Business>,
    profiles: HashMap<UserId, UserSummary>,
}

impl Tables {
    fn slot_is_held(&self, schedule_id: ScheduleId) -> bool {
        self.appointments
            .values()
            .any(|a| a.schedule_id == schedule_id && a.verify.is_live())
    }

    fn view(&self, appointment: &Appointment, with_user: bool) -> Option<AppointmentView> {
        let slot = self.slots.get(&appointment.schedule_id)?;
        let business = self.businesses.get(&slot.business_id)?;
        Some(AppointmentView {
            appointment: appointment.clone(),
            schedule: SlotWithBusiness {
                slot: slot.clone(),
                business: business.summary(),
            },
            user: if with_user {
                self.profiles.get(&appointment.user_id).cloned()
            } else {
                None
            },
        })
    }
}

/// Shared in-memory tables plus armed faults.
///
/// Clones share state.
#[derive(Clone, Debug, Default)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
    faults: Arc<Mutex<HashMap<FaultPoint, FaultMode>>>,
}

impl InMemoryDatabase {
    /// Create an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot store facade.
    #[must_use]
    pub fn slot_store(&self) -> InMemorySlotStore {
        InMemorySlotStore { db: self.clone() }
    }

    /// Appointment store facade.
    #[must_use]
    pub fn appointment_store(&self) -> InMemoryAppointmentStore {
        InMemoryAppointmentStore { db: self.clone() }
    }

    /// Business directory facade.
    #[must_use]
    pub fn business_directory(&self) -> InMemoryBusinessDirectory {
        InMemoryBusinessDirectory { db: self.clone() }
    }

    // ------------------------------------------------------------------
    // Fault injection
    // ------------------------------------------------------------------

    /// Make the next call at `point` fail.
    pub fn fail_next(&self, point: FaultPoint) {
        self.faults_guard().insert(point, FaultMode::Once);
    }

    /// Make every call at `point` fail until cleared.
    pub fn fail_always(&self, point: FaultPoint) {
        self.faults_guard().insert(point, FaultMode::Always);
    }

    /// Disarm all faults.
    pub fn clear_faults(&self) {
        self.faults_guard().clear();
    }

    fn faults_guard(&self) -> std::sync::MutexGuard<'_, HashMap<FaultPoint, FaultMode>> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, point: FaultPoint) -> Result<(), StoreError> {
        let mut faults = self.faults_guard();
        match faults.get(&point).copied() {
            None => Ok(()),
            Some(mode) => {
                if mode == FaultMode::Once {
                    faults.remove(&point);
                }
                Err(StoreError::Database(format!("injected fault at {point:?}")))
            }
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn tables_mut(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn tables(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------
    // Seeding and inspection (synchronous, never faulted)
    // ------------------------------------------------------------------

    /// Insert or replace a business.
    pub fn seed_business(&self, business: Business) {
        self.tables_mut().businesses.insert(business.id, business);
    }

    /// Insert or replace a client profile.
    pub fn seed_profile(&self, profile: UserSummary) {
        self.tables_mut().profiles.insert(profile.id, profile);
    }

    /// Insert or replace a slot.
    pub fn seed_slot(&self, slot: Slot) {
        self.tables_mut().slots.insert(slot.id, slot);
    }

    /// Insert or replace an appointment without touching its slot.
    pub fn seed_appointment(&self, appointment: Appointment) {
        self.tables_mut()
            .appointments
            .insert(appointment.id, appointment);
    }

    /// Current state of a slot.
    #[must_use]
    pub fn slot(&self, id: ScheduleId) -> Option<Slot> {
        self.tables().slots.get(&id).cloned()
    }

    /// Current state of an appointment.
    #[must_use]
    pub fn appointment(&self, id: AppointmentId) -> Option<Appointment> {
        self.tables().appointments.get(&id).cloned()
    }

    /// Every appointment referencing a slot, in any state.
    #[must_use]
    pub fn appointments_for_slot(&self, schedule_id: ScheduleId) -> Vec<Appointment> {
        self.tables()
            .appointments
            .values()
            .filter(|a| a.schedule_id == schedule_id)
            .cloned()
            .collect()
    }

    /// Pending or approved appointments referencing a slot.
    #[must_use]
    pub fn live_appointments_for_slot(&self, schedule_id: ScheduleId) -> usize {
        self.appointments_for_slot(schedule_id)
            .iter()
            .filter(|a| a.verify.is_live())
            .count()
    }

    /// Total number of appointments.
    #[must_use]
    pub fn appointment_count(&self) -> usize {
        self.tables().appointments.len()
    }
}

/// [`SlotStore`] over an [`InMemoryDatabase`].
#[derive(Clone, Debug)]
pub struct InMemorySlotStore {
    db: InMemoryDatabase,
}

impl SlotStore for InMemorySlotStore {
    fn insert(&self, slot: Slot) -> StoreFuture<'_, Slot> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::SlotInsert)?;
            self.db.write()?.slots.insert(slot.id, slot.clone());
            Ok(slot)
        })
    }

    fn get(&self, id: ScheduleId) -> StoreFuture<'_, Option<Slot>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::SlotGet)?;
            Ok(self.db.read()?.slots.get(&id).cloned())
        })
    }

    fn list_by_business(
        &self,
        business_id: BusinessId,
        date: Option<String>,
    ) -> StoreFuture<'_, Vec<Slot>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            let tables = self.db.read()?;
            let mut slots: Vec<Slot> = tables
                .slots
                .values()
                .filter(|s| s.business_id == business_id)
                .filter(|s| date.as_ref().is_none_or(|d| &s.date == d))
                .cloned()
                .collect();
            slots.sort_by(|a, b| {
                a.date
                    .cmp(&b.date)
                    .then_with(|| a.start_time.cmp(&b.start_time))
            });
            Ok(slots)
        })
    }

    fn update(&self, id: ScheduleId, patch: SlotPatch) -> StoreFuture<'_, GuardedWrite<Slot>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::SlotUpdate)?;
            let mut tables = self.db.write()?;
            let Some(current) = tables.slots.get(&id) else {
                return Ok(GuardedWrite::Missing);
            };
            if patch.available == Some(true) && !current.available && tables.slot_is_held(id) {
                return Ok(GuardedWrite::Held);
            }
            Ok(tables
                .slots
                .get_mut(&id)
                .map_or(GuardedWrite::Missing, |slot| {
                    patch.apply(slot);
                    GuardedWrite::Applied(slot.clone())
                }))
        })
    }

    fn set_availability(&self, id: ScheduleId, available: bool) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::SlotSetAvailability)?;
            let mut tables = self.db.write()?;
            Ok(tables
                .slots
                .get_mut(&id)
                .map(|slot| slot.available = available)
                .is_some())
        })
    }

    fn claim(&self, id: ScheduleId) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::SlotClaim)?;
            let mut tables = self.db.write()?;
            match tables.slots.get_mut(&id) {
                Some(slot) if slot.available => {
                    slot.available = false;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn delete(&self, id: ScheduleId) -> StoreFuture<'_, GuardedWrite<()>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::SlotDelete)?;
            let mut tables = self.db.write()?;
            if !tables.slots.contains_key(&id) {
                return Ok(GuardedWrite::Missing);
            }
            if tables.slot_is_held(id) {
                return Ok(GuardedWrite::Held);
            }
            tables.slots.remove(&id);
            tables.appointments.retain(|_, a| a.schedule_id != id);
            Ok(GuardedWrite::Applied(()))
        })
    }
}

/// [`AppointmentStore`] over an [`InMemoryDatabase`].
#[derive(Clone, Debug)]
pub struct InMemoryAppointmentStore {
    db: InMemoryDatabase,
}

impl AppointmentStore for InMemoryAppointmentStore {
    fn insert(&self, appointment: Appointment) -> StoreFuture<'_, Appointment> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::AppointmentInsert)?;
            let mut tables = self.db.write()?;
            if !tables.slots.contains_key(&appointment.schedule_id) {
                return Err(StoreError::Database(
                    "foreign key violation: schedule_id".to_string(),
                ));
            }
            tables
                .appointments
                .insert(appointment.id, appointment.clone());
            Ok(appointment)
        })
    }

    fn get(&self, id: AppointmentId) -> StoreFuture<'_, Option<Appointment>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            Ok(self.db.read()?.appointments.get(&id).cloned())
        })
    }

    fn get_context(&self, id: AppointmentId) -> StoreFuture<'_, Option<AppointmentContext>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::AppointmentGetContext)?;
            let tables = self.db.read()?;
            let context = tables.appointments.get(&id).and_then(|appointment| {
                let slot = tables.slots.get(&appointment.schedule_id)?;
                let business = tables.businesses.get(&slot.business_id)?;
                Some(AppointmentContext {
                    appointment: appointment.clone(),
                    slot: slot.clone(),
                    owner_id: business.owner_id,
                })
            });
            Ok(context)
        })
    }

    fn list_by_user(&self, user_id: UserId) -> StoreFuture<'_, Vec<AppointmentView>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::AppointmentList)?;
            let tables = self.db.read()?;
            let mut views: Vec<AppointmentView> = tables
                .appointments
                .values()
                .filter(|a| a.user_id == user_id)
                .filter_map(|a| tables.view(a, false))
                .collect();
            views.sort_by(|a, b| b.appointment.created_at.cmp(&a.appointment.created_at));
            Ok(views)
        })
    }

    fn list_by_business(
        &self,
        business_id: BusinessId,
        date: Option<String>,
    ) -> StoreFuture<'_, Vec<AppointmentView>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::AppointmentList)?;
            let tables = self.db.read()?;
            // HashMap order: callers must not rely on it.
            Ok(tables
                .appointments
                .values()
                .filter_map(|a| tables.view(a, true))
                .filter(|v| v.schedule.slot.business_id == business_id)
                .filter(|v| date.as_ref().is_none_or(|d| &v.schedule.slot.date == d))
                .collect())
        })
    }

    fn set_verify(
        &self,
        id: AppointmentId,
        expected: Verify,
        decision: VerifyDecision,
    ) -> StoreFuture<'_, Option<Appointment>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::AppointmentSetVerify)?;
            let mut tables = self.db.write()?;
            Ok(tables
                .appointments
                .get_mut(&id)
                .filter(|appointment| appointment.verify == expected)
                .map(|appointment| {
                    appointment.verify = decision.into_verify();
                    appointment.clone()
                }))
        })
    }

    fn delete(&self, id: AppointmentId) -> StoreFuture<'_, Option<Verify>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::AppointmentDelete)?;
            Ok(self
                .db
                .write()?
                .appointments
                .remove(&id)
                .map(|appointment| appointment.verify))
        })
    }
}

/// [`BusinessDirectory`] over an [`InMemoryDatabase`].
#[derive(Clone, Debug)]
pub struct InMemoryBusinessDirectory {
    db: InMemoryDatabase,
}

impl BusinessDirectory for InMemoryBusinessDirectory {
    fn get(&self, id: BusinessId) -> StoreFuture<'_, Option<Business>> {
        Box::pin(async move {
            tokio::task::yield_now().await;
            self.db.check(FaultPoint::BusinessGet)?;
            Ok(self.db.read()?.businesses.get(&id).cloned())
        })
    }
}
