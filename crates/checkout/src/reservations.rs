//! Reservation creation, validation, and lifecycle.
//!
//! Validation is ordered and fails on the first violation: contact fields,
//! party size, temporal checks against the server clock, then the
//! duplicate-booking window. The window check runs inside the same
//! transaction that inserts, so two racing bookings for the same email
//! cannot both slip through.

use chrono::{Duration, NaiveDate, NaiveTime, Utc};

use copperpot_core::{Email, ReservationId, ReservationStatus, UserId};

use crate::access::{self, Actor, ReservationScope};
use crate::error::CoreError;
use crate::hooks::CheckoutHooks;
use crate::models::{NewReservation, Reservation};
use crate::store::{Store, StoreTx, with_retries};

/// Smallest bookable party.
pub const MIN_PARTY_SIZE: i32 = 1;
/// Largest bookable party.
pub const MAX_PARTY_SIZE: i32 = 20;
/// Two active reservations for the same email closer together than this, on
/// the same date, conflict.
pub const DUPLICATE_WINDOW_MINUTES: i64 = 30;

/// A reservation request as submitted by a customer or an admin.
#[derive(Debug, Clone)]
pub struct ReservationRequest {
    /// Set when an authenticated customer books.
    pub user_id: Option<UserId>,
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub party_size: i32,
    pub notes: Option<String>,
}

/// Reservation creation and lifecycle, generic over storage and hooks.
#[derive(Debug)]
pub struct ReservationService<S, H> {
    store: S,
    hooks: H,
    tx_retry_limit: u32,
}

impl<S, H> ReservationService<S, H>
where
    S: Store,
    H: CheckoutHooks,
{
    pub const fn new(store: S, hooks: H) -> Self {
        Self {
            store,
            hooks,
            tx_retry_limit: 3,
        }
    }

    /// Override the serialization-failure retry budget.
    #[must_use]
    pub const fn with_tx_retry_limit(mut self, limit: u32) -> Self {
        self.tx_retry_limit = limit;
        self
    }

    /// Create a reservation with status `pending`.
    ///
    /// # Errors
    ///
    /// [`CoreError::Validation`] for bad fields or past dates,
    /// [`CoreError::Conflict`] when another active reservation for this email
    /// sits within the 30-minute window on the same date.
    pub async fn create_reservation(
        &self,
        request: &ReservationRequest,
    ) -> Result<ReservationId, CoreError> {
        validate_request(request)?;

        let id = with_retries(self.tx_retry_limit, || self.attempt_create(request)).await?;

        if let Err(err) = self.hooks.reservation_created(id, &request.email).await {
            tracing::warn!(reservation_id = %id, error = %err, "post-reservation hook failed");
        }

        Ok(id)
    }

    async fn attempt_create(&self, request: &ReservationRequest) -> Result<ReservationId, CoreError> {
        let mut tx = self.store.begin().await?;

        let taken = tx
            .active_reservation_times(&request.email, request.date)
            .await?;
        if taken
            .iter()
            .any(|existing| within_window(*existing, request.time))
        {
            return Err(CoreError::Conflict(
                "a reservation for this email already exists within 30 minutes of the requested time"
                    .into(),
            ));
        }

        let id = tx
            .insert_reservation(&NewReservation {
                user_id: request.user_id,
                name: request.name.clone(),
                email: request.email.clone(),
                phone: request.phone.clone(),
                date: request.date,
                time: request.time,
                party_size: request.party_size,
                notes: request.notes.clone(),
            })
            .await?;

        tx.commit().await?;
        tracing::info!(reservation_id = %id, date = %request.date, "reservation committed");
        Ok(id)
    }

    /// Fetch one reservation, subject to the access policy. Anonymous
    /// callers must present a matching email filter.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] for both missing and hidden rows.
    pub async fn get_reservation(
        &self,
        actor: &Actor,
        id: ReservationId,
        email_filter: Option<&Email>,
    ) -> Result<Reservation, CoreError> {
        let mut tx = self.store.begin().await?;
        tx.fetch_reservation(id)
            .await?
            .filter(|reservation| access::can_view_reservation(actor, reservation, email_filter))
            .ok_or(CoreError::NotFound("reservation"))
    }

    /// List reservations this actor may see. Anonymous callers without an
    /// email filter get an empty list, never the full set.
    pub async fn list_reservations(
        &self,
        actor: &Actor,
        email_filter: Option<&Email>,
    ) -> Result<Vec<Reservation>, CoreError> {
        let scope = access::reservation_scope(actor, email_filter);
        if scope == ReservationScope::Nothing {
            return Ok(Vec::new());
        }
        let mut tx = self.store.begin().await?;
        tx.list_reservations(&scope).await
    }

    /// Transition a reservation's status.
    ///
    /// Terminal rows stay terminal for everyone; from a non-terminal state
    /// admins may take any edge, while owners may only cancel along the
    /// lifecycle. Serialization conflicts retry within the budget.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`], [`CoreError::Validation`], or
    /// [`CoreError::Forbidden`] per the access policy.
    pub async fn transition(
        &self,
        actor: &Actor,
        id: ReservationId,
        to: ReservationStatus,
    ) -> Result<(), CoreError> {
        let from =
            with_retries(self.tx_retry_limit, || self.attempt_transition(actor, id, to)).await?;

        tracing::info!(reservation_id = %id, %from, %to, "reservation status updated");
        Ok(())
    }

    async fn attempt_transition(
        &self,
        actor: &Actor,
        id: ReservationId,
        to: ReservationStatus,
    ) -> Result<ReservationStatus, CoreError> {
        let mut tx = self.store.begin().await?;
        let reservation = tx
            .fetch_reservation(id)
            .await?
            .ok_or(CoreError::NotFound("reservation"))?;

        access::check_reservation_transition(actor, &reservation, to)?;

        if !tx.update_reservation_status(id, to).await? {
            return Err(CoreError::NotFound("reservation"));
        }
        tx.commit().await?;
        Ok(reservation.status)
    }
}

fn validate_request(request: &ReservationRequest) -> Result<(), CoreError> {
    if request.name.trim().is_empty() {
        return Err(CoreError::validation("name is required"));
    }
    if request.phone.trim().is_empty() {
        return Err(CoreError::validation("phone is required"));
    }
    if !(MIN_PARTY_SIZE..=MAX_PARTY_SIZE).contains(&request.party_size) {
        return Err(CoreError::Validation(format!(
            "party size must be between {MIN_PARTY_SIZE} and {MAX_PARTY_SIZE}"
        )));
    }

    let now = Utc::now();
    let today = now.date_naive();
    if request.date < today {
        return Err(CoreError::validation("reservation date is in the past"));
    }
    if request.date == today && request.time <= now.time() {
        return Err(CoreError::validation("reservation time is in the past"));
    }

    Ok(())
}

/// Whether two times on the same date fall inside the duplicate window.
/// The boundary itself (exactly 30 minutes apart) does not conflict.
fn within_window(existing: NaiveTime, requested: NaiveTime) -> bool {
    let gap = if existing > requested {
        existing - requested
    } else {
        requested - existing
    };
    gap < Duration::minutes(DUPLICATE_WINDOW_MINUTES)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hooks::LoggingHooks;
    use crate::store::MemoryStore;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn future_date() -> NaiveDate {
        (Utc::now() + Duration::days(7)).date_naive()
    }

    fn request(email: &str, at: NaiveTime) -> ReservationRequest {
        ReservationRequest {
            user_id: None,
            name: "Diner".into(),
            email: Email::parse(email).unwrap(),
            phone: "555-0100".into(),
            date: future_date(),
            time: at,
            party_size: 2,
            notes: None,
        }
    }

    fn service() -> ReservationService<MemoryStore, LoggingHooks> {
        ReservationService::new(MemoryStore::new(), LoggingHooks)
    }

    #[test]
    fn test_window_boundaries() {
        assert!(within_window(time(19, 0), time(19, 20)));
        assert!(within_window(time(19, 20), time(19, 0)));
        assert!(!within_window(time(19, 0), time(19, 35)));
        // Exactly 30 minutes apart is allowed.
        assert!(!within_window(time(19, 0), time(19, 30)));
    }

    #[tokio::test]
    async fn test_duplicate_window_scenario() {
        let service = service();
        service
            .create_reservation(&request("a@b.com", time(19, 0)))
            .await
            .unwrap();

        let err = service
            .create_reservation(&request("a@b.com", time(19, 20)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));

        service
            .create_reservation(&request("a@b.com", time(19, 35)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_window_is_per_email() {
        let service = service();
        service
            .create_reservation(&request("a@b.com", time(19, 0)))
            .await
            .unwrap();
        service
            .create_reservation(&request("c@d.com", time(19, 0)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_email_case_does_not_evade_window() {
        let service = service();
        service
            .create_reservation(&request("a@b.com", time(19, 0)))
            .await
            .unwrap();
        let err = service
            .create_reservation(&request("A@B.COM", time(19, 10)))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cancelled_reservation_frees_the_window() {
        let service = service();
        let id = service
            .create_reservation(&request("a@b.com", time(19, 0)))
            .await
            .unwrap();
        service
            .transition(&Actor::Admin, id, ReservationStatus::Cancelled)
            .await
            .unwrap();

        service
            .create_reservation(&request("a@b.com", time(19, 10)))
            .await
            .expect("cancelled booking no longer blocks the slot");
    }

    #[tokio::test]
    async fn test_party_size_bounds() {
        let service = service();
        for bad in [0, -1, 21] {
            let mut req = request("a@b.com", time(19, 0));
            req.party_size = bad;
            let err = service.create_reservation(&req).await.unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "size {bad}");
        }
        let mut req = request("a@b.com", time(19, 0));
        req.party_size = 20;
        service.create_reservation(&req).await.unwrap();
    }

    #[tokio::test]
    async fn test_past_date_rejected() {
        let service = service();
        let mut req = request("a@b.com", time(19, 0));
        req.date = (Utc::now() - Duration::days(1)).date_naive();
        let err = service.create_reservation(&req).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_same_day_past_time_rejected() {
        let service = service();
        let now = Utc::now();
        let mut req = request("a@b.com", time(19, 0));
        req.date = now.date_naive();
        req.time = now.time();
        let err = service.create_reservation(&req).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_blank_contact_rejected_first() {
        let service = service();
        let mut req = request("a@b.com", time(19, 0));
        req.name = " ".into();
        req.party_size = 0; // would also fail, but name check comes first
        let err = service.create_reservation(&req).await.unwrap_err();
        match err {
            CoreError::Validation(msg) => assert!(msg.contains("name")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_new_reservation_starts_pending() {
        let service = service();
        let id = service
            .create_reservation(&request("a@b.com", time(19, 0)))
            .await
            .unwrap();
        let reservation = service
            .get_reservation(&Actor::Admin, id, None)
            .await
            .unwrap();
        assert_eq!(reservation.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn test_admin_marks_a_pending_booking_no_show() {
        let service = service();
        let id = service
            .create_reservation(&request("a@b.com", time(19, 0)))
            .await
            .unwrap();

        // No confirmation step needed; the diner simply never showed.
        service
            .transition(&Actor::Admin, id, ReservationStatus::NoShow)
            .await
            .unwrap();
        let reservation = service
            .get_reservation(&Actor::Admin, id, None)
            .await
            .unwrap();
        assert_eq!(reservation.status, ReservationStatus::NoShow);
    }

    #[tokio::test]
    async fn test_terminal_transition_rejected_for_admin() {
        let service = service();
        let id = service
            .create_reservation(&request("a@b.com", time(19, 0)))
            .await
            .unwrap();
        service
            .transition(&Actor::Admin, id, ReservationStatus::Confirmed)
            .await
            .unwrap();
        service
            .transition(&Actor::Admin, id, ReservationStatus::Completed)
            .await
            .unwrap();

        let err = service
            .transition(&Actor::Admin, id, ReservationStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[tokio::test]
    async fn test_anonymous_list_requires_email_filter() {
        let service = service();
        service
            .create_reservation(&request("a@b.com", time(19, 0)))
            .await
            .unwrap();

        let none = service
            .list_reservations(&Actor::Public, None)
            .await
            .unwrap();
        assert!(none.is_empty());

        let email = Email::parse("a@b.com").unwrap();
        let mine = service
            .list_reservations(&Actor::Public, Some(&email))
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
    }
}
