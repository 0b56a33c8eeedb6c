//! Server-side price recomputation and discount application.
//!
//! Clients submit item references and quantities; prices come from the
//! catalog, re-read through the transaction that will write the order. The
//! client's `expected_price` is accepted only as a soft integrity signal:
//! divergence beyond [`price_tolerance`] is logged, and the resolved price is
//! used either way.

use rust_decimal::Decimal;

use copperpot_core::{DiscountId, ItemRef};

use crate::discounts::{Discount, DiscountValue};
use crate::error::CoreError;
use crate::store::StoreTx;

/// One requested cart line as submitted by the client.
#[derive(Debug, Clone)]
pub struct CartLine {
    pub item: ItemRef,
    pub quantity: i32,
    /// What the client believed the unit price was. Soft check only.
    pub expected_price: Option<Decimal>,
}

/// One line after authoritative pricing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub item: ItemRef,
    pub quantity: i32,
    /// Unit price snapshot taken inside the pricing transaction.
    pub price_at_purchase: Decimal,
}

/// The authoritative amounts for a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    /// `max(subtotal - discount_amount, 0)`.
    pub order_total: Decimal,
    pub discount_id: Option<DiscountId>,
    pub lines: Vec<PricedLine>,
}

/// How far a client-submitted expected price may drift from the resolved
/// price before we log it (0.01 currency units).
#[must_use]
pub fn price_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Price a cart against live catalog data.
///
/// Resolution happens through `tx` so the snapshot is taken inside the same
/// transaction that will persist the order. Any bad line aborts the whole
/// calculation; there are no partial quotes.
///
/// # Errors
///
/// - [`CoreError::Validation`] for an empty cart or a non-positive quantity
/// - [`CoreError::NotFound`] when a reference does not resolve in its table
/// - [`CoreError::Unavailable`] when the item cannot be purchased
/// - [`CoreError::Integrity`] when the catalog row carries a non-positive price
pub async fn price_cart<T: StoreTx>(
    tx: &mut T,
    lines: &[CartLine],
    discount: Option<&Discount>,
) -> Result<Quote, CoreError> {
    if lines.is_empty() {
        return Err(CoreError::validation("cart is empty"));
    }

    let mut priced = Vec::with_capacity(lines.len());
    let mut subtotal = Decimal::ZERO;

    for line in lines {
        if line.quantity <= 0 {
            return Err(CoreError::Validation(format!(
                "quantity must be positive for {}",
                line.item
            )));
        }

        let entry = tx
            .find_item(line.item)
            .await?
            .ok_or(CoreError::NotFound("catalog item"))?;

        if !entry.available {
            return Err(CoreError::Unavailable(format!(
                "item {} is not available",
                line.item
            )));
        }
        if entry.price <= Decimal::ZERO {
            return Err(CoreError::Integrity(format!(
                "item {} has non-positive price",
                line.item
            )));
        }

        if let Some(expected) = line.expected_price {
            let drift = (expected - entry.price).abs();
            if drift > price_tolerance() {
                tracing::warn!(
                    item = %line.item,
                    %expected,
                    resolved = %entry.price,
                    "client price diverges from catalog; using resolved price"
                );
            }
        }

        subtotal += entry.price * Decimal::from(line.quantity);
        priced.push(PricedLine {
            item: line.item,
            quantity: line.quantity,
            price_at_purchase: entry.price,
        });
    }

    let (discount_id, discount_amount) = match discount {
        Some(d) => (Some(d.id), discount_amount(d.value, subtotal)),
        None => (None, Decimal::ZERO),
    };

    let order_total = (subtotal - discount_amount).max(Decimal::ZERO);

    Ok(Quote {
        subtotal,
        discount_amount,
        order_total,
        discount_id,
        lines: priced,
    })
}

/// Compute the amount a discount is worth against a subtotal, clamped to
/// `[0, subtotal]`.
fn discount_amount(value: DiscountValue, subtotal: Decimal) -> Decimal {
    let raw = match value {
        DiscountValue::Amount(amount) => amount,
        DiscountValue::Percent(pct) => (subtotal * pct / Decimal::ONE_HUNDRED).round_dp(2),
    };
    raw.clamp(Decimal::ZERO, subtotal)
}
