//! Business metrics for the booking flow.
//!
//! Recorded through the `metrics` facade; the server installs a Prometheus recorder
//! and serves them at `/metrics`. Without a recorder every call is a no-op, which is
//! what the unit tests rely on.

use metrics::{describe_counter, describe_histogram};
use std::time::Duration;

/// Appointment operations by `operation` and `outcome`.
pub const APPOINTMENTS_TOTAL: &str = "timely_appointments_total";
/// Conditional slot claims by `outcome` (`won`, `lost`, `error`).
pub const SLOT_CLAIMS_TOTAL: &str = "timely_slot_claims_total";
/// Compensating deletes by `outcome` (`succeeded`, `failed`).
pub const COMPENSATIONS_TOTAL: &str = "timely_compensations_total";
/// Partial-failure states by `kind`.
pub const INCONSISTENCIES_TOTAL: &str = "timely_inconsistencies_total";
/// End-to-end booking latency.
pub const BOOKING_DURATION_SECONDS: &str = "timely_booking_duration_seconds";

/// Register metric descriptions. Call once after installing a recorder.
pub fn register_metrics() {
    describe_counter!(
        APPOINTMENTS_TOTAL,
        "Total appointment operations by operation and outcome"
    );
    describe_counter!(
        SLOT_CLAIMS_TOTAL,
        "Total conditional slot claims by outcome"
    );
    describe_counter!(
        COMPENSATIONS_TOTAL,
        "Total compensating appointment deletes by outcome"
    );
    describe_counter!(
        INCONSISTENCIES_TOTAL,
        "Total partial-failure states recorded for reconciliation"
    );
    describe_histogram!(
        BOOKING_DURATION_SECONDS,
        "Time taken to create an appointment"
    );
}

/// Count an appointment operation.
pub fn record_appointment(operation: &'static str, outcome: &'static str) {
    metrics::counter!(APPOINTMENTS_TOTAL, "operation" => operation, "outcome" => outcome)
        .increment(1);
}

/// Count a conditional claim.
pub fn record_slot_claim(outcome: &'static str) {
    metrics::counter!(SLOT_CLAIMS_TOTAL, "outcome" => outcome).increment(1);
}

/// Count a compensating delete.
pub fn record_compensation(outcome: &'static str) {
    metrics::counter!(COMPENSATIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// Count a reconciliation entry.
pub fn record_inconsistency(kind: &'static str) {
    metrics::counter!(INCONSISTENCIES_TOTAL, "kind" => kind).increment(1);
}

/// Observe booking latency.
pub fn record_booking_duration(elapsed: Duration) {
    metrics::histogram!(BOOKING_DURATION_SECONDS).record(elapsed.as_secs_f64());
}
