//! In-memory store with staged transactions.
//!
//! Not a test shim with mocked answers: transactions here are real in the
//! sense the contract demands. `begin` takes the store lock and clones the
//! state; every write lands in the staged clone; `commit` swaps the clone
//! in atomically; dropping the transaction discards it. Holding the lock for
//! the transaction's lifetime serializes transactions, which is a stricter
//! isolation level than the contract requires and exactly what the
//! atomicity and duplicate-window tests need.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use copperpot_core::{
    Email, ItemId, ItemRef, LegacyItemId, OrderId, OrderLineId, OrderStatus, ReservationId,
    ReservationStatus,
};

use crate::access::{OrderScope, ReservationScope};
use crate::error::CoreError;
use crate::models::{NewOrder, NewReservation, Order, OrderLine, Reservation};
use crate::pricing::PricedLine;

use super::{CatalogEntry, Store, StoreTx};

#[derive(Debug, Default, Clone)]
struct State {
    current_items: BTreeMap<i64, CatalogEntry>,
    legacy_items: BTreeMap<i64, CatalogEntry>,
    orders: BTreeMap<i64, Order>,
    order_lines: BTreeMap<i64, OrderLine>,
    reservations: BTreeMap<i64, Reservation>,
    next_order_id: i64,
    next_line_id: i64,
    next_reservation_id: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// An in-memory transactional store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row in the current catalog table.
    pub async fn seed_current_item(&self, id: ItemId, price: Decimal, available: bool) {
        self.state
            .lock()
            .await
            .current_items
            .insert(id.as_i64(), CatalogEntry { price, available });
    }

    /// Seed a row in the legacy catalog table.
    pub async fn seed_legacy_item(&self, id: LegacyItemId, price: Decimal, available: bool) {
        self.state
            .lock()
            .await
            .legacy_items
            .insert(id.as_i64(), CatalogEntry { price, available });
    }

    /// Number of persisted order headers. Used by atomicity tests.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Number of persisted order lines. Used by atomicity tests.
    pub async fn order_line_count(&self) -> usize {
        self.state.lock().await.order_lines.len()
    }

    /// Number of persisted reservations.
    pub async fn reservation_count(&self) -> usize {
        self.state.lock().await.reservations.len()
    }
}

/// One staged in-memory transaction.
#[derive(Debug)]
pub struct MemoryTx {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<Self::Tx, CoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTx { guard, staged })
    }
}

impl StoreTx for MemoryTx {
    async fn find_item(&mut self, item: ItemRef) -> Result<Option<CatalogEntry>, CoreError> {
        let entry = match item {
            ItemRef::Current(id) => self.staged.current_items.get(&id.as_i64()),
            ItemRef::Legacy(id) => self.staged.legacy_items.get(&id.as_i64()),
        };
        Ok(entry.copied())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, CoreError> {
        let id = next_id(&mut self.staged.next_order_id);
        let row = Order {
            id: OrderId::new(id),
            user_id: order.identity.user_id(),
            guest_session_id: order.identity.guest_session_id(),
            is_guest: order.identity.is_guest(),
            email: order.contact.email.clone(),
            customer_name: order.contact.name.clone(),
            shipping: order.shipping.clone(),
            subtotal: order.subtotal,
            discount_amount: order.discount_amount,
            order_total: order.order_total,
            discount_id: order.discount_id,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        };
        self.staged.orders.insert(id, row);
        Ok(OrderId::new(id))
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &PricedLine,
    ) -> Result<(), CoreError> {
        if !self.staged.orders.contains_key(&order_id.as_i64()) {
            return Err(CoreError::Integrity(format!(
                "order line references missing order {order_id}"
            )));
        }
        let id = next_id(&mut self.staged.next_line_id);
        self.staged.order_lines.insert(
            id,
            OrderLine {
                id: OrderLineId::new(id),
                order_id,
                item: Some(line.item),
                quantity: line.quantity,
                price_at_purchase: line.price_at_purchase,
            },
        );
        Ok(())
    }

    async fn fetch_order(&mut self, id: OrderId) -> Result<Option<Order>, CoreError> {
        Ok(self.staged.orders.get(&id.as_i64()).cloned())
    }

    async fn fetch_order_lines(&mut self, id: OrderId) -> Result<Vec<OrderLine>, CoreError> {
        Ok(self
            .staged
            .order_lines
            .values()
            .filter(|line| line.order_id == id)
            .cloned()
            .collect())
    }

    async fn list_orders(&mut self, scope: &OrderScope) -> Result<Vec<Order>, CoreError> {
        let orders = self.staged.orders.values();
        let matched: Vec<Order> = match scope {
            OrderScope::All => orders.cloned().collect(),
            OrderScope::User(user_id) => orders
                .filter(|o| o.user_id == Some(*user_id))
                .cloned()
                .collect(),
            OrderScope::Guest(session_id) => orders
                .filter(|o| {
                    o.is_guest && o.user_id.is_none() && o.guest_session_id == Some(*session_id)
                })
                .cloned()
                .collect(),
            OrderScope::Nothing => Vec::new(),
        };
        Ok(matched)
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, CoreError> {
        match self.staged.orders.get_mut(&id.as_i64()) {
            Some(order) => {
                order.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_reservation(
        &mut self,
        reservation: &NewReservation,
    ) -> Result<ReservationId, CoreError> {
        let id = next_id(&mut self.staged.next_reservation_id);
        self.staged.reservations.insert(
            id,
            Reservation {
                id: ReservationId::new(id),
                user_id: reservation.user_id,
                name: reservation.name.clone(),
                email: reservation.email.clone(),
                phone: reservation.phone.clone(),
                date: reservation.date,
                time: reservation.time,
                party_size: reservation.party_size,
                notes: reservation.notes.clone(),
                status: ReservationStatus::Pending,
                created_at: Utc::now(),
            },
        );
        Ok(ReservationId::new(id))
    }

    async fn fetch_reservation(
        &mut self,
        id: ReservationId,
    ) -> Result<Option<Reservation>, CoreError> {
        Ok(self.staged.reservations.get(&id.as_i64()).cloned())
    }

    async fn list_reservations(
        &mut self,
        scope: &ReservationScope,
    ) -> Result<Vec<Reservation>, CoreError> {
        let reservations = self.staged.reservations.values();
        let matched: Vec<Reservation> = match scope {
            ReservationScope::All => reservations.cloned().collect(),
            ReservationScope::User(user_id) => reservations
                .filter(|r| r.user_id == Some(*user_id))
                .cloned()
                .collect(),
            ReservationScope::Email(email) => reservations
                .filter(|r| &r.email == email)
                .cloned()
                .collect(),
            ReservationScope::Nothing => Vec::new(),
        };
        Ok(matched)
    }

    async fn active_reservation_times(
        &mut self,
        email: &Email,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, CoreError> {
        Ok(self
            .staged
            .reservations
            .values()
            .filter(|r| &r.email == email && r.date == date && r.status.is_active())
            .map(|r| r.time)
            .collect())
    }

    async fn update_reservation_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<bool, CoreError> {
        match self.staged.reservations.get_mut(&id.as_i64()) {
            Some(reservation) => {
                reservation.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn commit(self) -> Result<(), CoreError> {
        let Self { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }
}
