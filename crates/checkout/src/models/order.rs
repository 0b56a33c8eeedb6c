//! Order header and line-item models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use copperpot_core::{
    DiscountId, Email, GuestSessionId, Identity, ItemRef, OrderId, OrderLineId, OrderStatus, UserId,
};

use crate::error::CoreError;

/// Contact details captured at checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Customer email, validated and lowercase-normalized.
    pub email: Email,
    /// Customer display name. Must be non-blank.
    pub name: String,
}

/// An order ready to be persisted. All amounts were computed server-side by
/// the pricing calculator; nothing here came from a client price field.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Who is placing the order.
    pub identity: Identity,
    /// Contact details.
    pub contact: ContactInfo,
    /// Opaque structured shipping/delivery payload.
    pub shipping: serde_json::Value,
    /// Sum of resolved price x quantity over all lines.
    pub subtotal: Decimal,
    /// Computed, clamped discount. Zero when no code was applied.
    pub discount_amount: Decimal,
    /// `max(subtotal - discount_amount, 0)`.
    pub order_total: Decimal,
    /// The discount code entity this order applied, if any.
    pub discount_id: Option<DiscountId>,
}

/// A persisted order header.
///
/// Identity lives in three raw columns (`user_id`, `guest_session_id`,
/// `is_guest`); [`Order::identity`] re-derives the sum type and rejects rows
/// that violate the exactly-one invariant.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: Option<UserId>,
    pub guest_session_id: Option<GuestSessionId>,
    pub is_guest: bool,
    pub email: Email,
    pub customer_name: String,
    pub shipping: serde_json::Value,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub order_total: Decimal,
    pub discount_id: Option<DiscountId>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Re-derive the caller identity from the persisted columns.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Integrity`] if the row has both or neither of
    /// `user_id` / `guest_session_id`, or if `is_guest` disagrees with which
    /// one is set.
    pub fn identity(&self) -> Result<Identity, CoreError> {
        match (self.user_id, self.guest_session_id, self.is_guest) {
            (Some(user_id), None, false) => Ok(Identity::Authenticated { user_id }),
            (None, Some(session_id), true) => Ok(Identity::Guest { session_id }),
            _ => Err(CoreError::Integrity(format!(
                "order {} has inconsistent identity columns",
                self.id
            ))),
        }
    }
}

/// A persisted order line.
///
/// `price_at_purchase` is a historical snapshot taken inside the checkout
/// transaction; later catalog price changes never touch it.
#[derive(Debug, Clone)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    /// Which catalog table the line points at, and which row. `None` when
    /// the catalog row was deleted after purchase: the reference is
    /// tombstoned but the purchase record survives.
    pub item: Option<ItemRef>,
    pub quantity: i32,
    pub price_at_purchase: Decimal,
}
