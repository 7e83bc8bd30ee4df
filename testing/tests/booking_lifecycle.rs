//! Appointment lifecycle against the in-memory stores.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use timely_core::{BookingError, Inconsistency, Verify, VerifyDecision};
use timely_testing::{FaultPoint, World, client, init_test_tracing};

// ============================================================================
// Reservation
// ============================================================================

#[tokio::test]
async fn test_create_consumes_slot_with_one_live_appointment() {
    init_test_tracing();
    let world = World::new();
    let ana = world.client("Ana");

    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &ana)
        .await
        .expect("booking should succeed");

    assert_eq!(appointment.verify, Verify::Pending);
    assert!(appointment.status);
    assert_eq!(appointment.user_id, ana.user_id);
    assert!(!world.slot_available());
    assert_eq!(world.db.live_appointments_for_slot(world.slot.id), 1);
}

#[tokio::test]
async fn test_create_on_unavailable_slot_conflicts_without_insert() {
    let world = World::new();
    world.db.seed_slot(timely_core::Slot {
        available: false,
        ..world.slot.clone()
    });

    let err = world
        .orchestrator
        .create_appointment(world.slot.id, &world.client("Ana"))
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::Conflict(_)));
    assert_eq!(world.db.appointment_count(), 0);
}

#[tokio::test]
async fn test_create_on_missing_slot_is_not_found() {
    let world = World::new();
    let err = world
        .orchestrator
        .create_appointment(timely_core::ScheduleId::new(), &client())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound { resource: "Schedule", .. }));
}

#[tokio::test]
async fn test_failed_insert_leaves_slot_untouched() {
    let world = World::new();
    world.db.fail_next(FaultPoint::AppointmentInsert);

    let err = world
        .orchestrator
        .create_appointment(world.slot.id, &client())
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::Internal(_)));
    assert!(world.slot_available());
    assert_eq!(world.db.appointment_count(), 0);
}

#[tokio::test]
async fn test_failed_claim_rolls_back_appointment() {
    let world = World::new();
    world.db.fail_next(FaultPoint::SlotClaim);

    let err = world
        .orchestrator
        .create_appointment(world.slot.id, &client())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        BookingError::Internal("Failed to update schedule availability".to_string())
    );
    assert!(world.slot_available());
    assert!(world.db.appointments_for_slot(world.slot.id).is_empty());
    assert!(world.env.reconciliation.is_empty());
}

#[tokio::test]
async fn test_failed_compensation_is_recorded_as_orphan() {
    let world = World::new();
    world.db.fail_next(FaultPoint::SlotClaim);
    world.db.fail_next(FaultPoint::AppointmentDelete);

    let err = world
        .orchestrator
        .create_appointment(world.slot.id, &client())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Internal(_)));

    let orphans = world.db.appointments_for_slot(world.slot.id);
    assert_eq!(orphans.len(), 1);

    let entries = world.env.reconciliation.entries();
    assert_eq!(entries.len(), 1);
    match &entries[0].inconsistency {
        Inconsistency::OrphanedAppointment {
            appointment_id,
            schedule_id,
            ..
        } => {
            assert_eq!(*appointment_id, orphans[0].id);
            assert_eq!(*schedule_id, world.slot.id);
        }
        other => panic!("unexpected entry: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_of_one_slot_have_one_winner() {
    let world = Arc::new(World::new());

    let attempts = (0..16).map(|i| {
        let world = Arc::clone(&world);
        tokio::spawn(async move {
            let caller = world.client(&format!("client-{i}"));
            world
                .orchestrator
                .create_appointment(world.slot.id, &caller)
                .await
        })
    });
    let results: Vec<_> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should not panic"))
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, BookingError::Conflict(_)))
    );
    assert!(!world.slot_available());
    assert_eq!(world.db.live_appointments_for_slot(world.slot.id), 1);
    assert_eq!(world.db.appointments_for_slot(world.slot.id).len(), 1);
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn test_cancel_releases_slot_and_hides_appointment() {
    let world = World::new();
    let ana = world.client("Ana");
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &ana)
        .await
        .unwrap();

    let outcome = world
        .orchestrator
        .cancel_appointment(appointment.id, &ana)
        .await
        .unwrap();

    assert!(outcome.slot_released);
    assert!(outcome.warnings.is_empty());
    assert!(world.slot_available());
    assert!(world.listing.list_for_user(&ana).await.unwrap().is_empty());
    let listing = world
        .listing
        .list_for_business(world.business.id, None, &world.owner)
        .await
        .unwrap();
    assert_eq!(listing.total, 0);
}

#[tokio::test]
async fn test_owner_can_cancel_approved_appointment() {
    let world = World::new();
    let ana = world.client("Ana");
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &ana)
        .await
        .unwrap();
    world
        .orchestrator
        .update_status(appointment.id, VerifyDecision::Approved, &world.owner)
        .await
        .unwrap();

    let outcome = world
        .orchestrator
        .cancel_appointment(appointment.id, &world.owner)
        .await
        .unwrap();

    assert!(outcome.slot_released);
    assert!(world.slot_available());
    assert!(world.db.appointment(appointment.id).is_none());
}

#[tokio::test]
async fn test_cancel_release_failure_is_a_warning() {
    let world = World::new();
    let ana = world.client("Ana");
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &ana)
        .await
        .unwrap();

    world.db.fail_next(FaultPoint::SlotSetAvailability);
    let outcome = world
        .orchestrator
        .cancel_appointment(appointment.id, &ana)
        .await
        .expect("cancellation itself succeeded");

    assert!(!outcome.slot_released);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(world.db.appointment(appointment.id).is_none());
    assert!(!world.slot_available());
    assert!(matches!(
        world.env.reconciliation.entries()[0].inconsistency,
        Inconsistency::SlotNotReleased { .. }
    ));
}

#[tokio::test]
async fn test_cancel_delete_failure_is_internal_and_keeps_state() {
    let world = World::new();
    let ana = world.client("Ana");
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &ana)
        .await
        .unwrap();

    world.db.fail_next(FaultPoint::AppointmentDelete);
    let err = world
        .orchestrator
        .cancel_appointment(appointment.id, &ana)
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::Internal(_)));
    assert!(world.db.appointment(appointment.id).is_some());
    assert!(!world.slot_available());
}

#[tokio::test]
async fn test_cancel_of_rejected_appointment_does_not_free_rebooked_slot() {
    let world = World::new();
    let ana = world.client("Ana");
    let bea = world.client("Bea");

    let first = world
        .orchestrator
        .create_appointment(world.slot.id, &ana)
        .await
        .unwrap();
    world
        .orchestrator
        .update_status(first.id, VerifyDecision::Canceled, &world.owner)
        .await
        .unwrap();
    world
        .orchestrator
        .create_appointment(world.slot.id, &bea)
        .await
        .expect("released slot can be booked again");

    let outcome = world
        .orchestrator
        .cancel_appointment(first.id, &ana)
        .await
        .unwrap();

    assert!(!outcome.slot_released);
    assert!(!world.slot_available());
    assert_eq!(world.db.live_appointments_for_slot(world.slot.id), 1);
}

#[tokio::test]
async fn test_cancel_missing_appointment_is_not_found() {
    let world = World::new();
    let err = world
        .orchestrator
        .cancel_appointment(timely_core::AppointmentId::new(), &client())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound { resource: "Appointment", .. }));
}

// ============================================================================
// Owner decisions
// ============================================================================

#[tokio::test]
async fn test_approve_keeps_slot_consumed_and_reject_frees_it() {
    let world = World::new();
    let ana = world.client("Ana");
    let other_slot = world.add_slot("2025-03-01", "10:00", "11:00");

    let approved = world
        .orchestrator
        .create_appointment(world.slot.id, &ana)
        .await
        .unwrap();
    let rejected = world
        .orchestrator
        .create_appointment(other_slot.id, &ana)
        .await
        .unwrap();

    let outcome = world
        .orchestrator
        .update_status(approved.id, VerifyDecision::Approved, &world.owner)
        .await
        .unwrap();
    assert_eq!(outcome.appointment.verify, Verify::Approved);
    assert!(!world.slot_available());

    let outcome = world
        .orchestrator
        .update_status(rejected.id, VerifyDecision::Canceled, &world.owner)
        .await
        .unwrap();
    assert_eq!(outcome.appointment.verify, Verify::Canceled);
    assert!(world.db.slot(other_slot.id).unwrap().available);
}

#[tokio::test]
async fn test_approved_can_still_be_canceled_by_owner() {
    let world = World::new();
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &world.client("Ana"))
        .await
        .unwrap();
    world
        .orchestrator
        .update_status(appointment.id, VerifyDecision::Approved, &world.owner)
        .await
        .unwrap();

    let outcome = world
        .orchestrator
        .update_status(appointment.id, VerifyDecision::Canceled, &world.owner)
        .await
        .unwrap();

    assert_eq!(outcome.appointment.verify, Verify::Canceled);
    assert!(world.slot_available());
}

#[tokio::test]
async fn test_canceled_is_terminal_but_repeat_is_idempotent() {
    let world = World::new();
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &world.client("Ana"))
        .await
        .unwrap();
    world
        .orchestrator
        .update_status(appointment.id, VerifyDecision::Canceled, &world.owner)
        .await
        .unwrap();

    // Someone else books the released slot.
    world
        .orchestrator
        .create_appointment(world.slot.id, &world.client("Bea"))
        .await
        .unwrap();

    let repeat = world
        .orchestrator
        .update_status(appointment.id, VerifyDecision::Canceled, &world.owner)
        .await
        .unwrap();
    assert_eq!(repeat.appointment.verify, Verify::Canceled);
    assert!(!world.slot_available(), "repeat must not release the re-booked slot");

    let err = world
        .orchestrator
        .update_status(appointment.id, VerifyDecision::Approved, &world.owner)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Conflict(_)));
}

#[tokio::test]
async fn test_concurrent_approve_and_reject_settle_on_canceled() {
    let world = World::new();
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &world.client("Ana"))
        .await
        .unwrap();

    // Both decisions read `pending` before either writes.
    let (reject, approve) = tokio::join!(
        world
            .orchestrator
            .update_status(appointment.id, VerifyDecision::Canceled, &world.owner),
        world
            .orchestrator
            .update_status(appointment.id, VerifyDecision::Approved, &world.owner),
    );

    assert_eq!(reject.unwrap().appointment.verify, Verify::Canceled);
    if let Ok(approved) = &approve {
        // Approval landed first; the rejection then moved it on to canceled.
        assert_eq!(approved.appointment.verify, Verify::Approved);
    } else {
        assert!(matches!(approve, Err(BookingError::Conflict(_))));
    }
    assert_eq!(
        world.db.appointment(appointment.id).unwrap().verify,
        Verify::Canceled
    );
    assert!(world.slot_available());

    world
        .orchestrator
        .create_appointment(world.slot.id, &world.client("Bea"))
        .await
        .expect("released slot can be booked again");
    assert_eq!(world.db.live_appointments_for_slot(world.slot.id), 1);
}

#[tokio::test]
async fn test_stale_status_write_is_refused_by_the_store() {
    use timely_core::AppointmentStore;

    let world = World::new();
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &world.client("Ana"))
        .await
        .unwrap();
    world
        .orchestrator
        .update_status(appointment.id, VerifyDecision::Canceled, &world.owner)
        .await
        .unwrap();

    let store = world.db.appointment_store();
    let stale = store
        .set_verify(appointment.id, Verify::Pending, VerifyDecision::Approved)
        .await
        .unwrap();
    assert!(stale.is_none());
    assert_eq!(
        world.db.appointment(appointment.id).unwrap().verify,
        Verify::Canceled
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancel_racing_reject_and_rebook_keeps_one_live_appointment() {
    for _ in 0..25 {
        let world = Arc::new(World::new());
        let ana = world.client("Ana");
        let bea = world.client("Bea");
        let first = world
            .orchestrator
            .create_appointment(world.slot.id, &ana)
            .await
            .unwrap()
            .id;

        let cancel = {
            let world = Arc::clone(&world);
            tokio::spawn(async move { world.orchestrator.cancel_appointment(first, &ana).await })
        };
        let reject_then_rebook = {
            let world = Arc::clone(&world);
            tokio::spawn(async move {
                let _ = world
                    .orchestrator
                    .update_status(first, VerifyDecision::Canceled, &world.owner)
                    .await;
                world
                    .orchestrator
                    .create_appointment(world.slot.id, &bea)
                    .await
            })
        };

        let _ = cancel.await.expect("task should not panic");
        let rebooked = reject_then_rebook.await.expect("task should not panic");

        let live = world.db.live_appointments_for_slot(world.slot.id);
        assert!(live <= 1);
        assert_eq!(world.slot_available(), live == 0);
        if rebooked.is_ok() {
            assert_eq!(live, 1);
        }
    }
}

#[tokio::test]
async fn test_reject_release_failure_is_a_warning() {
    let world = World::new();
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &world.client("Ana"))
        .await
        .unwrap();

    world.db.fail_next(FaultPoint::SlotSetAvailability);
    let outcome = world
        .orchestrator
        .update_status(appointment.id, VerifyDecision::Canceled, &world.owner)
        .await
        .unwrap();

    assert_eq!(outcome.appointment.verify, Verify::Canceled);
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(world.env.reconciliation.len(), 1);
}

#[tokio::test]
async fn test_failed_status_write_is_internal() {
    let world = World::new();
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &world.client("Ana"))
        .await
        .unwrap();

    world.db.fail_next(FaultPoint::AppointmentSetVerify);
    let err = world
        .orchestrator
        .update_status(appointment.id, VerifyDecision::Canceled, &world.owner)
        .await
        .unwrap_err();

    assert!(matches!(err, BookingError::Internal(_)));
    assert_eq!(world.db.appointment(appointment.id).unwrap().verify, Verify::Pending);
    assert!(!world.slot_available());
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn test_cancel_forbidden_for_strangers() {
    let world = World::new();
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &world.client("Ana"))
        .await
        .unwrap();

    for stranger in [client(), timely_testing::admin()] {
        let err = world
            .orchestrator
            .cancel_appointment(appointment.id, &stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Forbidden(_)));
    }
    assert!(world.db.appointment(appointment.id).is_some());
}

#[tokio::test]
async fn test_status_update_forbidden_for_anyone_but_owner() {
    let world = World::new();
    let ana = world.client("Ana");
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &ana)
        .await
        .unwrap();

    for caller in [ana, client(), timely_testing::admin()] {
        let err = world
            .orchestrator
            .update_status(appointment.id, VerifyDecision::Approved, &caller)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Forbidden(_)));
    }
    assert_eq!(world.db.appointment(appointment.id).unwrap().verify, Verify::Pending);
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[tokio::test]
async fn test_scenario_book_approve_cancel_rebook() {
    let world = World::new();
    let u2 = world.client("U2");
    let u3 = world.client("U3");

    // A: U2 books S; a second attempt conflicts.
    let appointment = world
        .orchestrator
        .create_appointment(world.slot.id, &u2)
        .await
        .unwrap();
    assert_eq!(appointment.verify, Verify::Pending);
    assert!(!world.slot_available());
    let err = world
        .orchestrator
        .create_appointment(world.slot.id, &u2)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Conflict(_)));

    // D: U3 is neither owner nor client.
    let err = world
        .orchestrator
        .update_status(appointment.id, VerifyDecision::Approved, &u3)
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Forbidden(_)));

    // C: U2 cancels before approval; U3 can then book.
    world
        .orchestrator
        .cancel_appointment(appointment.id, &u2)
        .await
        .unwrap();
    assert!(world.slot_available());
    let rebooked = world
        .orchestrator
        .create_appointment(world.slot.id, &u3)
        .await
        .unwrap();

    // B: U1 approves; S stays consumed.
    let outcome = world
        .orchestrator
        .update_status(rebooked.id, VerifyDecision::Approved, &world.owner)
        .await
        .unwrap();
    assert_eq!(outcome.appointment.verify, Verify::Approved);
    assert!(!world.slot_available());
}
