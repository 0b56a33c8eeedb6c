//! Storage seam for the checkout core.
//!
//! The same transaction semantics must hold whether the backend is
//! `PostgreSQL` or the staged in-memory store used by tests.
//! [`Store`] hands out a [`StoreTx`]; every
//! write inside one transaction becomes visible together on `commit` or not
//! at all. Dropping a transaction without committing discards it.
//!
//! Catalog resolution ([`StoreTx::find_item`]) lives on the transaction on
//! purpose: price and availability are re-read inside the same transaction
//! that writes the order, closing the window between read and write. There is
//! no cross-request caching of either.

pub mod memory;
pub mod postgres;

use chrono::NaiveTime;
use rust_decimal::Decimal;

use copperpot_core::{Email, ItemRef, OrderId, OrderStatus, ReservationId, ReservationStatus};

use crate::access::{OrderScope, ReservationScope};
use crate::error::CoreError;
use crate::models::{NewOrder, NewReservation, Order, OrderLine, Reservation};
use crate::pricing::PricedLine;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Live price and availability for one catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub price: Decimal,
    pub available: bool,
}

/// A transactional storage backend.
#[allow(async_fn_in_trait)]
pub trait Store: Send + Sync {
    /// The transaction type this backend hands out.
    type Tx: StoreTx;

    /// Begin a transaction.
    async fn begin(&self) -> Result<Self::Tx, CoreError>;
}

/// One open transaction. All reads see a consistent snapshot relative to the
/// writes staged in the same transaction.
#[allow(async_fn_in_trait)]
pub trait StoreTx: Send {
    /// Resolve an item reference against its own catalog table. Returns
    /// `None` when the row does not exist there - a current reference is
    /// never matched against the legacy table or vice versa.
    async fn find_item(&mut self, item: ItemRef) -> Result<Option<CatalogEntry>, CoreError>;

    /// Insert an order header.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, CoreError>;

    /// Insert one priced line belonging to `order_id`.
    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &PricedLine,
    ) -> Result<(), CoreError>;

    /// Fetch one order header, if it exists. Visibility is the caller's job.
    async fn fetch_order(&mut self, id: OrderId) -> Result<Option<Order>, CoreError>;

    /// Fetch the lines of an order.
    async fn fetch_order_lines(&mut self, id: OrderId) -> Result<Vec<OrderLine>, CoreError>;

    /// List orders within an access scope. `OrderScope::Nothing` yields an
    /// empty vec.
    async fn list_orders(&mut self, scope: &OrderScope) -> Result<Vec<Order>, CoreError>;

    /// Set an order's status. Returns `false` if the order does not exist.
    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, CoreError>;

    /// Insert a reservation with status `pending`.
    async fn insert_reservation(
        &mut self,
        reservation: &NewReservation,
    ) -> Result<ReservationId, CoreError>;

    /// Fetch one reservation, if it exists.
    async fn fetch_reservation(
        &mut self,
        id: ReservationId,
    ) -> Result<Option<Reservation>, CoreError>;

    /// List reservations within an access scope.
    async fn list_reservations(
        &mut self,
        scope: &ReservationScope,
    ) -> Result<Vec<Reservation>, CoreError>;

    /// Times of active (pending or confirmed) reservations for this email on
    /// this date. Used for the duplicate-window check, inside the same
    /// transaction that inserts.
    async fn active_reservation_times(
        &mut self,
        email: &Email,
        date: chrono::NaiveDate,
    ) -> Result<Vec<NaiveTime>, CoreError>;

    /// Set a reservation's status. Returns `false` if it does not exist.
    async fn update_reservation_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<bool, CoreError>;

    /// Make every write in this transaction durable at once.
    async fn commit(self) -> Result<(), CoreError>;
}

/// Retry an operation while it fails with a retryable error, up to
/// `retry_limit` additional attempts.
///
/// Serialization conflicts are the only retryable case; they are safe to
/// retry because a rolled-back transaction leaves no partial side effects.
pub(crate) async fn with_retries<T, F, Fut>(retry_limit: u32, mut op: F) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(err) if err.is_retryable() && attempt < retry_limit => {
                attempt += 1;
                tracing::warn!(attempt, "retrying after serialization conflict");
            }
            other => return other,
        }
    }
}
