//! Database operations against `PostgreSQL`.
//!
//! ## Tables
//!
//! - `account` - Accounts with role/status
//! - `address` - Delivery addresses
//! - `product`, `tag`/`product_tag`, `image`/`product_image` - Catalogue
//! - `line_item`, `trolley` - Cart contents
//! - `"order"`, `order_item`, `invoice`, `receipt` - Order history
//! - `report` - Staff-generated reports
//!
//! Queries use the runtime sqlx API with `FromRow` models. Migrations are
//! stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p tradewind-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub mod accounts;
pub mod orders;
pub mod products;
pub mod trolley;

pub use accounts::AccountRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use trolley::TrolleyRepository;

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Map constraint violations onto `Conflict` so callers can answer 409
    /// instead of 500.
    #[must_use]
    pub fn from_sqlx(err: sqlx::Error, conflict_message: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation()
                || db_err.is_foreign_key_violation()
                || db_err.is_check_violation()
            {
                return Self::Conflict(conflict_message.to_string());
            }
        }
        Self::Database(err)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
