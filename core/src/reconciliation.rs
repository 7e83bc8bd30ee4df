//! Partial-failure states that need manual reconciliation.
//!
//! The booking flow spans several single-statement writes without a transaction.
//! When a compensating step or a slot release fails, the data is left inconsistent
//! and nothing retries. Those states are recorded here so they are observable:
//! each entry is logged at `error` level, counted in `timely_inconsistencies_total`,
//! and kept in a bounded in-process log that admins can read.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::metrics;
use crate::types::{AppointmentId, ScheduleId};

/// Default number of entries kept before the oldest are dropped.
pub const DEFAULT_CAPACITY: usize = 1000;

/// A state the booking flow could not repair on its own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inconsistency {
    /// A pending appointment whose slot claim failed and whose compensating
    /// delete also failed. The slot may still be available.
    OrphanedAppointment {
        /// Appointment left behind
        appointment_id: AppointmentId,
        /// Slot it references
        schedule_id: ScheduleId,
        /// Store error of the failed delete
        reason: String,
    },

    /// An appointment was canceled or rejected but its slot could not be set
    /// back to available.
    SlotNotReleased {
        /// Slot left unavailable
        schedule_id: ScheduleId,
        /// Appointment that held it
        appointment_id: AppointmentId,
        /// Store error of the failed release
        reason: String,
    },
}

impl Inconsistency {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::OrphanedAppointment { .. } => "orphaned_appointment",
            Self::SlotNotReleased { .. } => "slot_not_released",
        }
    }
}

/// A recorded inconsistency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReconciliationEntry {
    /// When it was detected
    pub recorded_at: DateTime<Utc>,
    /// What is inconsistent
    #[serde(flatten)]
    pub inconsistency: Inconsistency,
}

/// Bounded, shared log of inconsistencies.
///
/// Clones share the same storage. When full, the oldest entry is dropped.
#[derive(Clone, Debug)]
pub struct ReconciliationLog {
    entries: Arc<Mutex<VecDeque<ReconciliationEntry>>>,
    max_size: usize,
}

impl Default for ReconciliationLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ReconciliationLog {
    /// Create an empty log keeping at most `max_size` entries.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            max_size: max_size.max(1),
        }
    }

    /// Record an inconsistency detected at `recorded_at`.
    pub fn record(&self, inconsistency: Inconsistency, recorded_at: DateTime<Utc>) {
        let kind = inconsistency.kind();
        tracing::error!(
            kind,
            inconsistency = ?inconsistency,
            "Inconsistent booking state requires manual reconciliation"
        );
        metrics::record_inconsistency(kind);

        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if entries.len() >= self.max_size {
            entries.pop_front();
            tracing::warn!(max_size = self.max_size, "Reconciliation log full, dropping oldest entry");
        }
        entries.push_back(ReconciliationEntry {
            recorded_at,
            inconsistency,
        });
    }

    /// Snapshot of the current entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<ReconciliationEntry> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
