//! Integration tests for Copperpot.
//!
//! The scenario tests in `tests/` exercise the checkout and reservation
//! services end to end against the in-memory store, which implements the
//! same staged-commit transaction contract as the `PostgreSQL` backend.
//! Tests that require a live database belong in a deployment pipeline, not
//! here.
//!
//! # Test Categories
//!
//! - `checkout_flow` - Cart pricing, atomicity, identity, discounts
//! - `guest_isolation` - The guest-visibility regression suite
//! - `reservation_flow` - Temporal validation, windows, lifecycle

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

use copperpot_checkout::access::{OrderScope, ReservationScope};
use copperpot_checkout::checkout::{CheckoutRequest, CheckoutService};
use copperpot_checkout::discounts::StaticDiscounts;
use copperpot_checkout::error::CoreError;
use copperpot_checkout::hooks::LoggingHooks;
use copperpot_checkout::models::{
    ContactInfo, NewOrder, NewReservation, Order, OrderLine, Reservation,
};
use copperpot_checkout::pricing::{CartLine, PricedLine};
use copperpot_checkout::store::memory::MemoryTx;
use copperpot_checkout::store::{CatalogEntry, MemoryStore, Store, StoreTx};
use copperpot_core::{
    Email, Identity, ItemId, ItemRef, LegacyItemId, OrderId, OrderStatus, ReservationId,
    ReservationStatus,
};

/// A checkout service over a seeded in-memory store.
pub type TestCheckout = CheckoutService<MemoryStore, StaticDiscounts, LoggingHooks>;

/// Parse a decimal literal in tests.
///
/// # Panics
///
/// Panics on invalid input; test-only helper.
#[must_use]
pub fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal literal")
}

/// Seed the standard test catalog: current item X (10.00), current item 2
/// (unavailable), legacy item Y (5.50).
pub async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .seed_current_item(ItemId::new(1), dec("10.00"), true)
        .await;
    store
        .seed_current_item(ItemId::new(2), dec("4.00"), false)
        .await;
    store
        .seed_legacy_item(LegacyItemId::new(1), dec("5.50"), true)
        .await;
    store
}

/// A checkout service with no discounts registered, over `store`.
#[must_use]
pub fn checkout_service(store: MemoryStore) -> TestCheckout {
    CheckoutService::new(store, StaticDiscounts::new(), LoggingHooks)
}

/// A well-formed request for `identity` with the given lines.
///
/// # Panics
///
/// Panics on invalid email; test-only helper.
#[must_use]
pub fn checkout_request(identity: Identity, lines: Vec<CartLine>) -> CheckoutRequest {
    CheckoutRequest {
        identity,
        contact: ContactInfo {
            email: Email::parse("buyer@example.com").expect("valid email"),
            name: "Test Buyer".into(),
        },
        shipping: serde_json::json!({
            "line1": "1 Main St",
            "city": "Springfield",
            "postal_code": "01101"
        }),
        lines,
        discount_code: None,
    }
}

/// A cart line without a client price claim.
#[must_use]
pub const fn line(item: ItemRef, quantity: i32) -> CartLine {
    CartLine {
        item,
        quantity,
        expected_price: None,
    }
}

/// An in-memory store whose next N commits fail with a serialization
/// conflict, for exercising the services' retry paths.
#[derive(Clone)]
pub struct FlakyStore {
    inner: MemoryStore,
    failing_commits: Arc<AtomicU32>,
}

impl FlakyStore {
    #[must_use]
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing_commits: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Make the next `n` commits lose their serialization race.
    pub fn fail_commits(&self, n: u32) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }
}

/// A staged transaction that may be told to fail at commit.
pub struct FlakyTx {
    inner: MemoryTx,
    failing_commits: Arc<AtomicU32>,
}

impl Store for FlakyStore {
    type Tx = FlakyTx;

    async fn begin(&self) -> Result<Self::Tx, CoreError> {
        Ok(FlakyTx {
            inner: self.inner.begin().await?,
            failing_commits: Arc::clone(&self.failing_commits),
        })
    }
}

impl StoreTx for FlakyTx {
    async fn find_item(&mut self, item: ItemRef) -> Result<Option<CatalogEntry>, CoreError> {
        self.inner.find_item(item).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, CoreError> {
        self.inner.insert_order(order).await
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &PricedLine,
    ) -> Result<(), CoreError> {
        self.inner.insert_order_line(order_id, line).await
    }

    async fn fetch_order(&mut self, id: OrderId) -> Result<Option<Order>, CoreError> {
        self.inner.fetch_order(id).await
    }

    async fn fetch_order_lines(&mut self, id: OrderId) -> Result<Vec<OrderLine>, CoreError> {
        self.inner.fetch_order_lines(id).await
    }

    async fn list_orders(&mut self, scope: &OrderScope) -> Result<Vec<Order>, CoreError> {
        self.inner.list_orders(scope).await
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, CoreError> {
        self.inner.update_order_status(id, status).await
    }

    async fn insert_reservation(
        &mut self,
        reservation: &NewReservation,
    ) -> Result<ReservationId, CoreError> {
        self.inner.insert_reservation(reservation).await
    }

    async fn fetch_reservation(
        &mut self,
        id: ReservationId,
    ) -> Result<Option<Reservation>, CoreError> {
        self.inner.fetch_reservation(id).await
    }

    async fn list_reservations(
        &mut self,
        scope: &ReservationScope,
    ) -> Result<Vec<Reservation>, CoreError> {
        self.inner.list_reservations(scope).await
    }

    async fn active_reservation_times(
        &mut self,
        email: &Email,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, CoreError> {
        self.inner.active_reservation_times(email, date).await
    }

    async fn update_reservation_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<bool, CoreError> {
        self.inner.update_reservation_status(id, status).await
    }

    async fn commit(self) -> Result<(), CoreError> {
        let lose_race = self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lose_race {
            // Dropping the staged state rolls the attempt back.
            return Err(CoreError::Serialization);
        }
        self.inner.commit().await
    }
}
