//! # Timely Core
//!
//! Appointment lifecycle and slot-availability engine for the Timely booking platform.
//!
//! Businesses publish time slots ("schedules"), clients reserve them ("appointments"),
//! and business owners approve, reject, or cancel reservations. This crate owns the
//! invariants of that flow:
//!
//! - A slot is never left with two live appointments
//! - Slot availability and appointment state stay consistent under concurrent
//!   requests and partial store failures
//! - State transitions enforce authorization and their side effects
//!
//! # Architecture
//!
//! ```text
//! request ─► Identity ─► policy (Authorization Guard)
//!                              │
//!                              ▼
//!                    ┌───────────────────┐        ┌──────────────────┐
//!                    │ BookingOrchestrator│──────►│ SlotStore        │
//!                    │ ScheduleService    │       │ AppointmentStore │
//!                    │ ListingService     │◄──────│ BusinessDirectory│
//!                    └───────────────────┘        └──────────────────┘
//!                              │
//!                              ▼
//!                      ReconciliationLog (partial-failure states)
//! ```
//!
//! Stores are traits; `timely-postgres` provides the production implementation and
//! `timely-testing` an in-memory one with fault injection.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod booking;
pub mod environment;
pub mod error;
pub mod identity;
pub mod listing;
pub mod metrics;
pub mod policy;
pub mod reconciliation;
pub mod schedules;
pub mod store;
pub mod types;
pub mod validation;

pub use booking::{BookingOrchestrator, BookingPhase, CancelOutcome, UpdateOutcome};
pub use environment::{BookingEnvironment, Clock, SystemClock};
pub use error::{BookingError, Result, StoreError};
pub use identity::{Identity, Role};
pub use listing::{BusinessAppointments, ListingService};
pub use reconciliation::{Inconsistency, ReconciliationEntry, ReconciliationLog};
pub use schedules::ScheduleService;
pub use store::{AppointmentStore, BusinessDirectory, GuardedWrite, SlotStore, StoreFuture};
pub use types::*;
pub use validation::{SlotPatchRequest, SlotRequest};
