//! Guest-visibility regression suite.
//!
//! A prior policy allowed any caller to enumerate all guest orders. The
//! contract now is secure-by-default: an anonymous caller who cannot present
//! the right guest session id gets an empty result set - not an error, and
//! never somebody else's rows.

use uuid::Uuid;

use copperpot_checkout::access::Actor;
use copperpot_checkout::error::CoreError;
use copperpot_core::{GuestSessionId, Identity, ItemId, ItemRef, UserId};

use copperpot_integration_tests::{
    TestCheckout, checkout_request, checkout_service, line, seeded_store,
};

async fn service_with_guest_orders() -> (TestCheckout, GuestSessionId, GuestSessionId) {
    let store = seeded_store().await;
    let service = checkout_service(store);

    let first = GuestSessionId::new(Uuid::new_v4());
    let second = GuestSessionId::new(Uuid::new_v4());
    for session_id in [first, second] {
        service
            .create_order(&checkout_request(
                Identity::Guest { session_id },
                vec![line(ItemRef::Current(ItemId::new(1)), 1)],
            ))
            .await
            .expect("guest checkout succeeds");
    }
    (service, first, second)
}

#[tokio::test]
async fn test_public_caller_sees_zero_rows_not_an_error() {
    let (service, _, _) = service_with_guest_orders().await;

    // Guest orders exist, but a caller with no session id gets nothing.
    let orders = service
        .list_orders(&Actor::Public)
        .await
        .expect("empty result, not an error");
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_wrong_session_sees_zero_rows() {
    let (service, _, _) = service_with_guest_orders().await;

    let stranger = GuestSessionId::new(Uuid::new_v4());
    let orders = service
        .list_orders(&Actor::Guest(stranger))
        .await
        .expect("empty result, not an error");
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_matching_session_sees_only_its_own_order() {
    let (service, first, second) = service_with_guest_orders().await;

    let mine = service
        .list_orders(&Actor::Guest(first))
        .await
        .expect("guest list");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].guest_session_id, Some(first));

    let theirs = service
        .list_orders(&Actor::Guest(second))
        .await
        .expect("guest list");
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].guest_session_id, Some(second));
}

#[tokio::test]
async fn test_customer_does_not_see_guest_rows() {
    let (service, _, _) = service_with_guest_orders().await;

    let orders = service
        .list_orders(&Actor::Customer(UserId::new(1)))
        .await
        .expect("customer list");
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_admin_sees_all() {
    let (service, _, _) = service_with_guest_orders().await;

    let orders = service.list_orders(&Actor::Admin).await.expect("admin list");
    assert_eq!(orders.len(), 2);
}

#[tokio::test]
async fn test_public_single_order_read_is_not_found() {
    let (service, first, _) = service_with_guest_orders().await;

    let order_id = service
        .list_orders(&Actor::Guest(first))
        .await
        .expect("guest list")[0]
        .id;

    // Public and wrong-guest reads collapse to the missing-row shape.
    let err = service.get_order(&Actor::Public, order_id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let stranger = GuestSessionId::new(Uuid::new_v4());
    let err = service
        .get_order(&Actor::Guest(stranger), order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}
