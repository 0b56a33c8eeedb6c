//! The order writer and order read paths.
//!
//! [`CheckoutService::create_order`] is the atomic unit at the heart of the
//! core: one transaction resolves and prices every line against live catalog
//! data, inserts the header and all lines, and commits. Any failure rolls
//! the whole thing back; a serialization race is retried within the
//! configured budget. Post-commit hooks run outside the boundary and cannot
//! fail a checkout.

use copperpot_core::{Email, Identity, OrderId, OrderStatus};

use crate::access::{self, Actor};
use crate::discounts::{Discount, DiscountResolver};
use crate::error::CoreError;
use crate::hooks::CheckoutHooks;
use crate::models::{ContactInfo, NewOrder, Order, OrderLine};
use crate::pricing::{self, CartLine};
use crate::store::{Store, StoreTx, with_retries};

/// A checkout request as assembled by the (external) session and auth layers.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Exactly one of authenticated or guest; the type makes "neither"
    /// unrepresentable.
    pub identity: Identity,
    pub contact: ContactInfo,
    /// Opaque structured shipping/delivery payload. Must be present.
    pub shipping: serde_json::Value,
    pub lines: Vec<CartLine>,
    pub discount_code: Option<String>,
}

/// What a successful checkout hands back to collaborators.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub customer_email: Email,
}

/// Order creation and order access, generic over the storage backend, the
/// external discount lookup, and the post-commit hooks.
#[derive(Debug)]
pub struct CheckoutService<S, D, H> {
    store: S,
    discounts: D,
    hooks: H,
    tx_retry_limit: u32,
}

impl<S, D, H> CheckoutService<S, D, H>
where
    S: Store,
    D: DiscountResolver,
    H: CheckoutHooks,
{
    pub const fn new(store: S, discounts: D, hooks: H) -> Self {
        Self {
            store,
            discounts,
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

    /// Create an order: validate, price inside the transaction, persist
    /// header plus lines atomically, then fire hooks.
    ///
    /// # Errors
    ///
    /// Validation, pricing, and storage errors per the crate taxonomy. By the
    /// time an error is returned, nothing has been written.
    pub async fn create_order(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt, CoreError> {
        if request.contact.name.trim().is_empty() {
            return Err(CoreError::validation("contact name is required"));
        }
        if request.shipping.is_null() {
            return Err(CoreError::validation("shipping payload is required"));
        }

        // External lookup; not part of the write transaction.
        let discount = match &request.discount_code {
            Some(code) => Some(
                self.discounts
                    .resolve(code)
                    .await?
                    .ok_or(CoreError::NotFound("discount code"))?,
            ),
            None => None,
        };

        let order_id = with_retries(self.tx_retry_limit, || {
            self.attempt_create(request, discount.as_ref())
        })
        .await?;

        tracing::info!(%order_id, "checkout committed");

        // Fire-and-forget: payment intent and confirmation email are
        // downstream of persistence, and their failure stays downstream.
        if let Err(err) = self
            .hooks
            .order_created(order_id, &request.contact.email)
            .await
        {
            tracing::warn!(%order_id, error = %err, "post-checkout hook failed");
        }

        Ok(CheckoutReceipt {
            order_id,
            customer_email: request.contact.email.clone(),
        })
    }

    /// One transactional attempt. Prices are resolved through the same
    /// transaction that writes, so the snapshot cannot go stale between
    /// read and commit.
    async fn attempt_create(
        &self,
        request: &CheckoutRequest,
        discount: Option<&Discount>,
    ) -> Result<OrderId, CoreError> {
        let mut tx = self.store.begin().await?;

        let quote = pricing::price_cart(&mut tx, &request.lines, discount).await?;

        let order_id = tx
            .insert_order(&NewOrder {
                identity: request.identity,
                contact: request.contact.clone(),
                shipping: request.shipping.clone(),
                subtotal: quote.subtotal,
                discount_amount: quote.discount_amount,
                order_total: quote.order_total,
                discount_id: quote.discount_id,
            })
            .await?;

        for line in &quote.lines {
            tx.insert_order_line(order_id, line).await?;
        }

        tx.commit().await?;
        Ok(order_id)
    }

    /// Fetch one order with its lines, subject to the access policy.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] both when the order does not exist and
    /// when it exists but is not visible to this actor.
    pub async fn get_order(
        &self,
        actor: &Actor,
        id: OrderId,
    ) -> Result<(Order, Vec<OrderLine>), CoreError> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .fetch_order(id)
            .await?
            .filter(|order| access::can_view_order(actor, order))
            .ok_or(CoreError::NotFound("order"))?;
        let lines = tx.fetch_order_lines(id).await?;
        Ok((order, lines))
    }

    /// List the orders this actor may see. An anonymous caller without a
    /// guest session gets an empty list, never an error.
    pub async fn list_orders(&self, actor: &Actor) -> Result<Vec<Order>, CoreError> {
        let scope = access::order_scope(actor);
        if scope == access::OrderScope::Nothing {
            return Ok(Vec::new());
        }
        let mut tx = self.store.begin().await?;
        tx.list_orders(&scope).await
    }

    /// Transition an order's lifecycle status. Admin only, and only along
    /// legal lifecycle edges. Serialization conflicts retry within the
    /// budget.
    ///
    /// # Errors
    ///
    /// [`CoreError::Forbidden`] for non-admin actors, [`CoreError::Validation`]
    /// for an illegal transition, [`CoreError::NotFound`] for a missing order.
    pub async fn update_order_status(
        &self,
        actor: &Actor,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<(), CoreError> {
        access::check_order_status_update(actor)?;

        let from =
            with_retries(self.tx_retry_limit, || self.attempt_status_update(id, to)).await?;

        tracing::info!(order_id = %id, %from, %to, "order status updated");
        Ok(())
    }

    async fn attempt_status_update(
        &self,
        id: OrderId,
        to: OrderStatus,
    ) -> Result<OrderStatus, CoreError> {
        let mut tx = self.store.begin().await?;
        let order = tx
            .fetch_order(id)
            .await?
            .ok_or(CoreError::NotFound("order"))?;

        if !order.status.can_transition(to) {
            return Err(CoreError::Validation(format!(
                "order cannot move from {} to {}",
                order.status, to
            )));
        }

        if !tx.update_order_status(id, to).await? {
            return Err(CoreError::NotFound("order"));
        }
        tx.commit().await?;
        Ok(order.status)
    }
}
