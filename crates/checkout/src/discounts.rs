//! Discount resolution seam.
//!
//! Discount codes live outside this core; resolving a code to its value is a
//! pure lookup against an external collaborator. The *amount* applied to an
//! order is always computed and clamped here, never accepted from a client.

use std::collections::HashMap;

use rust_decimal::Decimal;

use copperpot_core::DiscountId;

use crate::error::CoreError;

/// What a discount code is worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountValue {
    /// A fixed amount off, in currency units.
    Amount(Decimal),
    /// A percentage off the subtotal, 0-100.
    Percent(Decimal),
}

/// A resolved discount code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discount {
    pub id: DiscountId,
    pub value: DiscountValue,
}

/// External discount lookup: `code -> discount`, or `None` for unknown codes.
#[allow(async_fn_in_trait)]
pub trait DiscountResolver: Send + Sync {
    /// Resolve a code.
    async fn resolve(&self, code: &str) -> Result<Option<Discount>, CoreError>;
}

/// A resolver that knows no codes. The default for deployments without a
/// discount collaborator wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscounts;

impl DiscountResolver for NoDiscounts {
    async fn resolve(&self, _code: &str) -> Result<Option<Discount>, CoreError> {
        Ok(None)
    }
}

/// A fixed in-memory code table, used by tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscounts {
    codes: HashMap<String, Discount>,
}

impl StaticDiscounts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a code.
    #[must_use]
    pub fn with_code(mut self, code: &str, discount: Discount) -> Self {
        self.codes.insert(code.to_owned(), discount);
        self
    }
}

impl DiscountResolver for StaticDiscounts {
    async fn resolve(&self, code: &str) -> Result<Option<Discount>, CoreError> {
        Ok(self.codes.get(code).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_discounts_resolves_nothing() {
        let resolver = NoDiscounts;
        assert_eq!(resolver.resolve("WELCOME10").await.expect("ok"), None);
    }

    #[tokio::test]
    async fn test_static_discounts() {
        let discount = Discount {
            id: DiscountId::new(1),
            value: DiscountValue::Percent(Decimal::new(10, 0)),
        };
        let resolver = StaticDiscounts::new().with_code("WELCOME10", discount);
        assert_eq!(
            resolver.resolve("WELCOME10").await.expect("ok"),
            Some(discount)
        );
        assert_eq!(resolver.resolve("OTHER").await.expect("ok"), None);
    }
}
