//! Application state shared across handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use timely_auth::IdentityVerifier;
use timely_core::{
    BookingEnvironment, BookingOrchestrator, ListingService, ReconciliationLog, ScheduleService,
    SlotStore,
};

/// Services and infrastructure handles available to every request.
///
/// Cheap to clone: every field is an `Arc` or wraps one.
#[derive(Clone)]
pub struct AppState {
    /// Create, cancel and status transitions
    pub orchestrator: Arc<BookingOrchestrator>,
    /// Slot management
    pub schedules: Arc<ScheduleService>,
    /// Appointment listings
    pub listing: Arc<ListingService>,
    /// Bearer credential verification
    pub verifier: Arc<IdentityVerifier>,
    /// Partial-failure records
    pub reconciliation: ReconciliationLog,
    /// Checked by the readiness endpoint
    pub readiness: Arc<dyn SlotStore>,
    /// Prometheus renderer, when the exporter is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Build the services over one environment.
    #[must_use]
    pub fn new(env: BookingEnvironment, verifier: IdentityVerifier) -> Self {
        Self {
            reconciliation: env.reconciliation.clone(),
            readiness: Arc::clone(&env.slots),
            schedules: Arc::new(ScheduleService::new(env.clone())),
            listing: Arc::new(ListingService::new(env.clone())),
            orchestrator: Arc::new(BookingOrchestrator::new(env)),
            verifier: Arc::new(verifier),
            metrics: None,
        }
    }

    /// Serve `/metrics` from this Prometheus handle.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}
