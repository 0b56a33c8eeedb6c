//! Database pool and migrations for the checkout core.
//!
//! ## Tables
//!
//! - `orders` - Order headers (identity, contact, totals, status)
//! - `order_lines` - Line items with immutable `price_at_purchase`
//! - `reservations` - Table bookings with status lifecycle
//! - `catalog_items` / `legacy_catalog_items` - Read-only from this core;
//!   owned by the (external) catalog-management subsystem
//!
//! Migrations live in `crates/checkout/migrations/` and are embedded at
//! compile time via [`MIGRATOR`].

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::CheckoutConfig;

/// Embedded migrations for the checkout schema.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Create a `PostgreSQL` connection pool from the checkout configuration.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(config: &CheckoutConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(config.database_url.expose_secret())
        .await
}

/// Run pending migrations against the pool.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
