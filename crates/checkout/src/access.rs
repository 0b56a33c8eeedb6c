//! Row-visibility and mutation policy.
//!
//! Every read and write path threads an explicit [`Actor`] through this
//! module before touching the store; nothing relies on the database to filter
//! rows silently. The policy is pure, so it is unit-tested without a
//! database or an HTTP context.
//!
//! The non-negotiable rule: guest identity is never ambient. A caller who
//! cannot present a matching guest session id (or, for reservations, an email
//! filter) gets an **empty result set** - not an error, and never somebody
//! else's guest rows. A prior incarnation of this policy let any caller
//! enumerate all guest orders; the scope types below exist so that hole
//! cannot reopen.

use copperpot_core::{Email, GuestSessionId, ReservationStatus, UserId};

use crate::error::CoreError;
use crate::models::{Order, Reservation};

/// The caller class for a read or mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// Anonymous caller with no guest session.
    Public,
    /// Authenticated customer.
    Customer(UserId),
    /// Anonymous caller presenting a guest session id.
    Guest(GuestSessionId),
    /// Staff with full access.
    Admin,
}

/// What slice of the orders table an actor may list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderScope {
    /// Every row (admin only).
    All,
    /// Rows owned by this user.
    User(UserId),
    /// Guest rows matching this session id (and only true guest rows).
    Guest(GuestSessionId),
    /// Nothing. The store is not even consulted.
    Nothing,
}

/// What slice of the reservations table an actor may list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationScope {
    /// Every row (admin only).
    All,
    /// Rows owned by this user.
    User(UserId),
    /// Rows matching a caller-supplied email.
    Email(Email),
    /// Nothing. The store is not even consulted.
    Nothing,
}

/// Derive the order-listing scope for an actor.
#[must_use]
pub fn order_scope(actor: &Actor) -> OrderScope {
    match actor {
        Actor::Admin => OrderScope::All,
        Actor::Customer(user_id) => OrderScope::User(*user_id),
        Actor::Guest(session_id) => OrderScope::Guest(*session_id),
        // Secure by default: no session id means zero rows, not an error.
        Actor::Public => OrderScope::Nothing,
    }
}

/// Derive the reservation-listing scope for an actor.
///
/// Anonymous callers (public or guest-by-session) only ever see reservations
/// matching an email they supplied themselves; without one they see nothing.
#[must_use]
pub fn reservation_scope(actor: &Actor, email_filter: Option<&Email>) -> ReservationScope {
    match (actor, email_filter) {
        (Actor::Admin, None) => ReservationScope::All,
        // Admin may narrow to an email like anyone else.
        (Actor::Admin, Some(email)) => ReservationScope::Email(email.clone()),
        (Actor::Customer(user_id), _) => ReservationScope::User(*user_id),
        (Actor::Public | Actor::Guest(_), Some(email)) => ReservationScope::Email(email.clone()),
        (Actor::Public | Actor::Guest(_), None) => ReservationScope::Nothing,
    }
}

/// Whether the actor may read this specific order row.
///
/// Guests match only when the row is a true guest row: session id equal,
/// `is_guest` set, and no user attached.
#[must_use]
pub fn can_view_order(actor: &Actor, order: &Order) -> bool {
    match actor {
        Actor::Admin => true,
        Actor::Customer(user_id) => order.user_id == Some(*user_id),
        Actor::Guest(session_id) => {
            order.is_guest
                && order.user_id.is_none()
                && order.guest_session_id == Some(*session_id)
        }
        Actor::Public => false,
    }
}

/// Whether the actor may read this specific reservation row.
#[must_use]
pub fn can_view_reservation(
    actor: &Actor,
    reservation: &Reservation,
    email_filter: Option<&Email>,
) -> bool {
    match actor {
        Actor::Admin => true,
        Actor::Customer(user_id) => reservation.user_id == Some(*user_id),
        Actor::Public | Actor::Guest(_) => email_filter == Some(&reservation.email),
    }
}

/// Check that the actor may update order status. Admin-only; customers never
/// mutate an order after creation.
///
/// # Errors
///
/// Returns [`CoreError::Forbidden`] for every non-admin actor.
pub fn check_order_status_update(actor: &Actor) -> Result<(), CoreError> {
    match actor {
        Actor::Admin => Ok(()),
        _ => Err(CoreError::Forbidden(
            "only admin may update order status".into(),
        )),
    }
}

/// Check that the actor may transition this reservation to `to`.
///
/// Terminal rows stay terminal for everyone, admin included. From a
/// non-terminal state an admin may move to any state (a diner who never
/// showed goes straight from `pending` to `no_show`); owners follow the
/// lifecycle and may only cancel.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] for an illegal lifecycle step and
/// [`CoreError::Forbidden`] when the actor lacks rights to an otherwise legal
/// one.
pub fn check_reservation_transition(
    actor: &Actor,
    reservation: &Reservation,
    to: ReservationStatus,
) -> Result<(), CoreError> {
    if reservation.status.is_terminal() {
        return Err(CoreError::Validation(format!(
            "reservation cannot move from {} to {}",
            reservation.status, to
        )));
    }

    match actor {
        Actor::Admin => Ok(()),
        Actor::Customer(user_id) if reservation.user_id == Some(*user_id) => {
            if !reservation.status.can_transition(to) {
                return Err(CoreError::Validation(format!(
                    "reservation cannot move from {} to {}",
                    reservation.status, to
                )));
            }
            if to == ReservationStatus::Cancelled {
                Ok(())
            } else {
                Err(CoreError::Forbidden(
                    "owners may only cancel a reservation".into(),
                ))
            }
        }
        _ => Err(CoreError::Forbidden(
            "not allowed to modify this reservation".into(),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime, Utc};
    use copperpot_core::{OrderId, OrderStatus, ReservationId};
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn guest_order(session_id: GuestSessionId) -> Order {
        Order {
            id: OrderId::new(1),
            user_id: None,
            guest_session_id: Some(session_id),
            is_guest: true,
            email: Email::parse("g@example.com").unwrap(),
            customer_name: "G".into(),
            shipping: serde_json::json!({}),
            subtotal: Decimal::ZERO,
            discount_amount: Decimal::ZERO,
            order_total: Decimal::ZERO,
            discount_id: None,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn reservation(user_id: Option<UserId>, status: ReservationStatus) -> Reservation {
        Reservation {
            id: ReservationId::new(1),
            user_id,
            name: "R".into(),
            email: Email::parse("r@example.com").unwrap(),
            phone: "555-0100".into(),
            date: NaiveDate::from_ymd_opt(2027, 6, 1).unwrap(),
            time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            party_size: 2,
            notes: None,
            status,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_order_scope_is_nothing() {
        assert_eq!(order_scope(&Actor::Public), OrderScope::Nothing);
    }

    #[test]
    fn test_guest_scope_carries_session() {
        let sid = GuestSessionId::new(Uuid::new_v4());
        assert_eq!(order_scope(&Actor::Guest(sid)), OrderScope::Guest(sid));
    }

    #[test]
    fn test_guest_can_view_only_matching_session() {
        let sid = GuestSessionId::new(Uuid::new_v4());
        let other = GuestSessionId::new(Uuid::new_v4());
        let order = guest_order(sid);

        assert!(can_view_order(&Actor::Guest(sid), &order));
        assert!(!can_view_order(&Actor::Guest(other), &order));
        assert!(!can_view_order(&Actor::Public, &order));
        assert!(can_view_order(&Actor::Admin, &order));
    }

    #[test]
    fn test_guest_cannot_view_claimed_row() {
        // A row with a user attached is not a guest row, even if a stale
        // session id lingers.
        let sid = GuestSessionId::new(Uuid::new_v4());
        let mut order = guest_order(sid);
        order.user_id = Some(UserId::new(9));
        assert!(!can_view_order(&Actor::Guest(sid), &order));
    }

    #[test]
    fn test_customer_views_own_orders_only() {
        let sid = GuestSessionId::new(Uuid::new_v4());
        let order = guest_order(sid);
        assert!(!can_view_order(&Actor::Customer(UserId::new(1)), &order));
    }

    #[test]
    fn test_reservation_scope_without_email_is_nothing() {
        assert_eq!(
            reservation_scope(&Actor::Public, None),
            ReservationScope::Nothing
        );
        let sid = GuestSessionId::new(Uuid::new_v4());
        assert_eq!(
            reservation_scope(&Actor::Guest(sid), None),
            ReservationScope::Nothing
        );
    }

    #[test]
    fn test_reservation_scope_with_email() {
        let email = Email::parse("r@example.com").unwrap();
        assert_eq!(
            reservation_scope(&Actor::Public, Some(&email)),
            ReservationScope::Email(email)
        );
    }

    #[test]
    fn test_order_status_update_admin_only() {
        assert!(check_order_status_update(&Actor::Admin).is_ok());
        for actor in [
            Actor::Public,
            Actor::Customer(UserId::new(1)),
            Actor::Guest(GuestSessionId::new(Uuid::new_v4())),
        ] {
            assert!(matches!(
                check_order_status_update(&actor),
                Err(CoreError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn test_owner_may_cancel_active_reservation() {
        let user = UserId::new(4);
        let res = reservation(Some(user), ReservationStatus::Confirmed);
        assert!(
            check_reservation_transition(
                &Actor::Customer(user),
                &res,
                ReservationStatus::Cancelled
            )
            .is_ok()
        );
    }

    #[test]
    fn test_owner_may_not_confirm() {
        let user = UserId::new(4);
        let res = reservation(Some(user), ReservationStatus::Pending);
        assert!(matches!(
            check_reservation_transition(
                &Actor::Customer(user),
                &res,
                ReservationStatus::Confirmed
            ),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[test]
    fn test_admin_may_take_any_edge_from_non_terminal() {
        let pending = reservation(None, ReservationStatus::Pending);
        for to in [
            ReservationStatus::Confirmed,
            ReservationStatus::Completed,
            ReservationStatus::NoShow,
            ReservationStatus::Cancelled,
        ] {
            assert!(
                check_reservation_transition(&Actor::Admin, &pending, to).is_ok(),
                "pending -> {to}"
            );
        }
    }

    #[test]
    fn test_owner_cannot_skip_lifecycle() {
        let user = UserId::new(4);
        let res = reservation(Some(user), ReservationStatus::Pending);
        assert!(matches!(
            check_reservation_transition(
                &Actor::Customer(user),
                &res,
                ReservationStatus::Completed
            ),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_terminal_reservation_immutable_even_for_admin() {
        let res = reservation(None, ReservationStatus::Completed);
        assert!(matches!(
            check_reservation_transition(&Actor::Admin, &res, ReservationStatus::Confirmed),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_non_owner_cannot_cancel() {
        let res = reservation(Some(UserId::new(4)), ReservationStatus::Pending);
        assert!(matches!(
            check_reservation_transition(
                &Actor::Customer(UserId::new(5)),
                &res,
                ReservationStatus::Cancelled
            ),
            Err(CoreError::Forbidden(_))
        ));
    }
}
