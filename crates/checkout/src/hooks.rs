//! Post-commit hooks.
//!
//! After an order or reservation commits, downstream collaborators (payment
//! intent creation, confirmation email, admin notification surfaces) are
//! triggered fire-and-forget. The transaction boundary ends at persistence:
//! a failing hook is logged and swallowed, never rolled into a checkout
//! failure.

use copperpot_core::{Email, OrderId, ReservationId};

/// A hook failure. Carried back to the service only so it can be logged.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HookError(pub String);

/// Downstream notifications fired after a successful commit.
#[allow(async_fn_in_trait)]
pub trait CheckoutHooks: Send + Sync {
    /// An order was persisted. Consumers: payment-intent initiator and
    /// confirmation-email dispatcher.
    async fn order_created(&self, order_id: OrderId, email: &Email) -> Result<(), HookError>;

    /// A reservation was persisted. Consumers: admin- and customer-facing
    /// notification surfaces.
    async fn reservation_created(
        &self,
        reservation_id: ReservationId,
        email: &Email,
    ) -> Result<(), HookError>;
}

/// Default hooks: log and move on.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHooks;

impl CheckoutHooks for LoggingHooks {
    async fn order_created(&self, order_id: OrderId, email: &Email) -> Result<(), HookError> {
        tracing::info!(%order_id, customer = %email, "order created");
        Ok(())
    }

    async fn reservation_created(
        &self,
        reservation_id: ReservationId,
        email: &Email,
    ) -> Result<(), HookError> {
        tracing::info!(%reservation_id, customer = %email, "reservation created");
        Ok(())
    }
}
