//! Reservation scenarios: duplicate windows, lifecycle, and access.

use chrono::{Duration, NaiveDate, NaiveTime, Utc};

use copperpot_checkout::access::Actor;
use copperpot_checkout::error::CoreError;
use copperpot_checkout::hooks::LoggingHooks;
use copperpot_checkout::reservations::{ReservationRequest, ReservationService};
use copperpot_checkout::store::MemoryStore;
use copperpot_core::{Email, ReservationStatus, UserId};
use copperpot_integration_tests::FlakyStore;

fn service() -> ReservationService<MemoryStore, LoggingHooks> {
    ReservationService::new(MemoryStore::new(), LoggingHooks)
}

fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

fn next_week() -> NaiveDate {
    (Utc::now() + Duration::days(7)).date_naive()
}

fn request(email: &str, time: NaiveTime) -> ReservationRequest {
    ReservationRequest {
        user_id: None,
        name: "Pat Diner".into(),
        email: Email::parse(email).expect("valid email"),
        phone: "555-0142".into(),
        date: next_week(),
        time,
        party_size: 4,
        notes: Some("window table".into()),
    }
}

#[tokio::test]
async fn test_thirty_minute_window_scenario() {
    let service = service();

    // Existing pending reservation at 19:00.
    service
        .create_reservation(&request("a@b.com", at(19, 0)))
        .await
        .expect("first booking");

    // 19:20 for the same email and date: inside the window.
    let err = service
        .create_reservation(&request("a@b.com", at(19, 20)))
        .await
        .unwrap_err();
    match err {
        CoreError::Conflict(msg) => assert!(msg.contains("30 minutes")),
        other => panic!("expected conflict, got {other:?}"),
    }

    // 19:35: outside the window.
    service
        .create_reservation(&request("a@b.com", at(19, 35)))
        .await
        .expect("second booking outside the window");
}

#[tokio::test]
async fn test_completed_reservation_is_immutable_for_every_actor() {
    let service = service();
    let owner = UserId::new(7);
    let mut req = request("owner@b.com", at(18, 0));
    req.user_id = Some(owner);
    let id = service.create_reservation(&req).await.expect("booked");

    service
        .transition(&Actor::Admin, id, ReservationStatus::Confirmed)
        .await
        .expect("confirm");
    service
        .transition(&Actor::Admin, id, ReservationStatus::Completed)
        .await
        .expect("complete");

    for actor in [Actor::Admin, Actor::Customer(owner)] {
        let err = service
            .transition(&actor, id, ReservationStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)), "{actor:?}");
    }
}

#[tokio::test]
async fn test_transition_survives_a_serialization_conflict() {
    let store = FlakyStore::new(MemoryStore::new());
    let service = ReservationService::new(store.clone(), LoggingHooks);

    let id = service
        .create_reservation(&request("a@b.com", at(19, 0)))
        .await
        .expect("booked");

    store.fail_commits(1);
    service
        .transition(&Actor::Admin, id, ReservationStatus::Confirmed)
        .await
        .expect("retried past the conflict");

    let reservation = service
        .get_reservation(&Actor::Admin, id, None)
        .await
        .expect("admin read");
    assert_eq!(reservation.status, ReservationStatus::Confirmed);
}

#[tokio::test]
async fn test_owner_cancels_but_cannot_confirm() {
    let service = service();
    let owner = UserId::new(7);
    let mut req = request("owner@b.com", at(18, 0));
    req.user_id = Some(owner);
    let id = service.create_reservation(&req).await.expect("booked");

    let err = service
        .transition(&Actor::Customer(owner), id, ReservationStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));

    service
        .transition(&Actor::Customer(owner), id, ReservationStatus::Cancelled)
        .await
        .expect("owner cancel");

    let reservation = service
        .get_reservation(&Actor::Admin, id, None)
        .await
        .expect("admin read");
    assert_eq!(reservation.status, ReservationStatus::Cancelled);
}

#[tokio::test]
async fn test_stranger_cannot_touch_a_reservation() {
    let service = service();
    let mut req = request("owner@b.com", at(18, 0));
    req.user_id = Some(UserId::new(7));
    let id = service.create_reservation(&req).await.expect("booked");

    let err = service
        .transition(
            &Actor::Customer(UserId::new(8)),
            id,
            ReservationStatus::Cancelled,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden(_)));
}

#[tokio::test]
async fn test_anonymous_read_requires_matching_email() {
    let service = service();
    let id = service
        .create_reservation(&request("a@b.com", at(19, 0)))
        .await
        .expect("booked");

    // No filter: not found, same shape as a missing row.
    let err = service
        .get_reservation(&Actor::Public, id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    // Wrong email: still not found.
    let wrong = Email::parse("other@b.com").expect("valid email");
    let err = service
        .get_reservation(&Actor::Public, id, Some(&wrong))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    // Matching email: visible.
    let mine = Email::parse("a@b.com").expect("valid email");
    let reservation = service
        .get_reservation(&Actor::Public, id, Some(&mine))
        .await
        .expect("own reservation visible by email");
    assert_eq!(reservation.party_size, 4);
}

#[tokio::test]
async fn test_customer_lists_only_their_reservations() {
    let service = service();

    let mut owned = request("owner@b.com", at(18, 0));
    owned.user_id = Some(UserId::new(7));
    service.create_reservation(&owned).await.expect("booked");
    service
        .create_reservation(&request("walkup@b.com", at(19, 0)))
        .await
        .expect("booked");

    let mine = service
        .list_reservations(&Actor::Customer(UserId::new(7)), None)
        .await
        .expect("customer list");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].user_id, Some(UserId::new(7)));

    let all = service
        .list_reservations(&Actor::Admin, None)
        .await
        .expect("admin list");
    assert_eq!(all.len(), 2);
}
