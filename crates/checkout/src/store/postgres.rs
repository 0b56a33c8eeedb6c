//! `PostgreSQL` store backend.
//!
//! Queries use runtime binding (not the `query!` macros) so the crate builds
//! without a live database; row shapes are pinned by the migrations in
//! `crates/checkout/migrations/`.
//!
//! Transactions run at `SERIALIZABLE` isolation. The duplicate-reservation
//! window check reads sibling rows before inserting; under weaker isolation
//! two concurrent bookings for the same email could both pass the check.
//! Serialization failures surface as [`CoreError::Serialization`] and are
//! retried by the services.

use chrono::{NaiveDate, NaiveTime};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};

use copperpot_core::{
    Email, GuestSessionId, ItemRef, OrderId, OrderLineId, OrderStatus, ReservationId,
    ReservationStatus, UserId,
};

use crate::access::{OrderScope, ReservationScope};
use crate::error::CoreError;
use crate::models::{NewOrder, NewReservation, Order, OrderLine, Reservation};
use crate::pricing::PricedLine;

use super::{CatalogEntry, Store, StoreTx};

/// `PostgreSQL`-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// One open `PostgreSQL` transaction.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn order_from_row(row: &PgRow) -> Result<Order, CoreError> {
    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
        guest_session_id: row.try_get::<Option<GuestSessionId>, _>("guest_session_id")?,
        is_guest: row.try_get("is_guest")?,
        email: row.try_get("email")?,
        customer_name: row.try_get("customer_name")?,
        shipping: row.try_get("shipping")?,
        subtotal: row.try_get("subtotal")?,
        discount_amount: row.try_get("discount_amount")?,
        order_total: row.try_get("order_total")?,
        discount_id: row
            .try_get::<Option<i64>, _>("discount_id")?
            .map(copperpot_core::DiscountId::new),
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_line_from_row(row: &PgRow) -> Result<OrderLine, CoreError> {
    let order_id = OrderId::new(row.try_get("order_id")?);
    let item = match (
        row.try_get::<Option<i64>, _>("item_id")?,
        row.try_get::<Option<i64>, _>("legacy_item_id")?,
    ) {
        (Some(id), None) => Some(ItemRef::Current(copperpot_core::ItemId::new(id))),
        (None, Some(id)) => Some(ItemRef::Legacy(copperpot_core::LegacyItemId::new(id))),
        // Tombstone: the catalog row was deleted after purchase.
        (None, None) => None,
        (Some(_), Some(_)) => {
            return Err(CoreError::Integrity(format!(
                "order line for {order_id} references both catalog tables"
            )));
        }
    };
    Ok(OrderLine {
        id: OrderLineId::new(row.try_get("id")?),
        order_id,
        item,
        quantity: row.try_get("quantity")?,
        price_at_purchase: row.try_get("price_at_purchase")?,
    })
}

fn reservation_from_row(row: &PgRow) -> Result<Reservation, CoreError> {
    Ok(Reservation {
        id: ReservationId::new(row.try_get("id")?),
        user_id: row.try_get::<Option<i64>, _>("user_id")?.map(UserId::new),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        phone: row.try_get("phone")?,
        date: row.try_get("reservation_date")?,
        time: row.try_get("reservation_time")?,
        party_size: row.try_get("party_size")?,
        notes: row.try_get("notes")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
    })
}

const ORDER_COLUMNS: &str = "id, user_id, guest_session_id, is_guest, email, customer_name, \
     shipping, subtotal, discount_amount, order_total, discount_id, status, created_at";

const RESERVATION_COLUMNS: &str = "id, user_id, name, email, phone, reservation_date, \
     reservation_time, party_size, notes, status, created_at";

impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<Self::Tx, CoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await?;
        Ok(PgTx { tx })
    }
}

impl StoreTx for PgTx {
    async fn find_item(&mut self, item: ItemRef) -> Result<Option<CatalogEntry>, CoreError> {
        // FOR SHARE keeps the price stable until this transaction commits.
        let (sql, id) = match item {
            ItemRef::Current(id) => (
                "SELECT price, available FROM catalog_items WHERE id = $1 FOR SHARE",
                id.as_i64(),
            ),
            ItemRef::Legacy(id) => (
                "SELECT price, available FROM legacy_catalog_items WHERE id = $1 FOR SHARE",
                id.as_i64(),
            ),
        };

        let row = sqlx::query(sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;

        match row {
            Some(row) => Ok(Some(CatalogEntry {
                price: row.try_get("price")?,
                available: row.try_get("available")?,
            })),
            None => Ok(None),
        }
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<OrderId, CoreError> {
        let row = sqlx::query(
            r"
            INSERT INTO orders
                (user_id, guest_session_id, is_guest, email, customer_name,
                 shipping, subtotal, discount_amount, order_total, discount_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            ",
        )
        .bind(order.identity.user_id().map(|id| id.as_i64()))
        .bind(order.identity.guest_session_id())
        .bind(order.identity.is_guest())
        .bind(&order.contact.email)
        .bind(&order.contact.name)
        .bind(&order.shipping)
        .bind(order.subtotal)
        .bind(order.discount_amount)
        .bind(order.order_total)
        .bind(order.discount_id.map(|id| id.as_i64()))
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(OrderId::new(row.try_get("id")?))
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        line: &PricedLine,
    ) -> Result<(), CoreError> {
        sqlx::query(
            r"
            INSERT INTO order_lines
                (order_id, item_id, legacy_item_id, quantity, price_at_purchase)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(order_id.as_i64())
        .bind(line.item.current_id().map(|id| id.as_i64()))
        .bind(line.item.legacy_id().map(|id| id.as_i64()))
        .bind(line.quantity)
        .bind(line.price_at_purchase)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn fetch_order(&mut self, id: OrderId) -> Result<Option<Order>, CoreError> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(order_from_row).transpose()
    }

    async fn fetch_order_lines(&mut self, id: OrderId) -> Result<Vec<OrderLine>, CoreError> {
        let rows = sqlx::query(
            r"
            SELECT id, order_id, item_id, legacy_item_id, quantity, price_at_purchase
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id.as_i64())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(order_line_from_row).collect()
    }

    async fn list_orders(&mut self, scope: &OrderScope) -> Result<Vec<Order>, CoreError> {
        let rows = match scope {
            OrderScope::All => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
                ))
                .fetch_all(&mut *self.tx)
                .await
            }
            OrderScope::User(user_id) => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
                ))
                .bind(user_id.as_i64())
                .fetch_all(&mut *self.tx)
                .await
            }
            OrderScope::Guest(session_id) => {
                sqlx::query(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders \
                     WHERE guest_session_id = $1 AND is_guest AND user_id IS NULL \
                     ORDER BY created_at DESC"
                ))
                .bind(*session_id)
                .fetch_all(&mut *self.tx)
                .await
            }
            OrderScope::Nothing => return Ok(Vec::new()),
        }?;

        rows.iter().map(order_from_row).collect()
    }

    async fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_reservation(
        &mut self,
        reservation: &NewReservation,
    ) -> Result<ReservationId, CoreError> {
        let row = sqlx::query(
            r"
            INSERT INTO reservations
                (user_id, name, email, phone, reservation_date, reservation_time,
                 party_size, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            ",
        )
        .bind(reservation.user_id.map(|id| id.as_i64()))
        .bind(&reservation.name)
        .bind(&reservation.email)
        .bind(&reservation.phone)
        .bind(reservation.date)
        .bind(reservation.time)
        .bind(reservation.party_size)
        .bind(&reservation.notes)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(ReservationId::new(row.try_get("id")?))
    }

    async fn fetch_reservation(
        &mut self,
        id: ReservationId,
    ) -> Result<Option<Reservation>, CoreError> {
        let row = sqlx::query(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(reservation_from_row).transpose()
    }

    async fn list_reservations(
        &mut self,
        scope: &ReservationScope,
    ) -> Result<Vec<Reservation>, CoreError> {
        let rows = match scope {
            ReservationScope::All => {
                sqlx::query(&format!(
                    "SELECT {RESERVATION_COLUMNS} FROM reservations \
                     ORDER BY reservation_date, reservation_time"
                ))
                .fetch_all(&mut *self.tx)
                .await
            }
            ReservationScope::User(user_id) => {
                sqlx::query(&format!(
                    "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE user_id = $1 \
                     ORDER BY reservation_date, reservation_time"
                ))
                .bind(user_id.as_i64())
                .fetch_all(&mut *self.tx)
                .await
            }
            ReservationScope::Email(email) => {
                sqlx::query(&format!(
                    "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE email = $1 \
                     ORDER BY reservation_date, reservation_time"
                ))
                .bind(email)
                .fetch_all(&mut *self.tx)
                .await
            }
            ReservationScope::Nothing => return Ok(Vec::new()),
        }?;

        rows.iter().map(reservation_from_row).collect()
    }

    async fn active_reservation_times(
        &mut self,
        email: &Email,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, CoreError> {
        let rows = sqlx::query(
            r"
            SELECT reservation_time
            FROM reservations
            WHERE email = $1
              AND reservation_date = $2
              AND status IN ('pending', 'confirmed')
            ",
        )
        .bind(email)
        .bind(date)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter()
            .map(|row| row.try_get("reservation_time").map_err(CoreError::from))
            .collect()
    }

    async fn update_reservation_status(
        &mut self,
        id: ReservationId,
        status: ReservationStatus,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query("UPDATE reservations SET status = $1 WHERE id = $2")
            .bind(status)
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self) -> Result<(), CoreError> {
        Ok(self.tx.commit().await?)
    }
}
