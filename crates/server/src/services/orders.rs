//! Order placement and reporting.

use chrono::Utc;
use tradewind_core::checkout::{self, OrderError, OrderSummary};
use tradewind_core::{AccountId, AddressId};

use crate::db::orders::PgCheckout;
use crate::db::{OrderRepository, RepositoryError};
use crate::models::Report;
use crate::state::AppState;

/// Convert the account's trolley into an order.
///
/// Opens one transaction, runs the checkout workflow inside it, and
/// commits only when the whole placement succeeded. Any error rolls the
/// transaction back, leaving trolley, stock, and history untouched.
///
/// # Errors
///
/// See [`OrderError`].
pub async fn place(
    state: &AppState,
    account: AccountId,
    address: AddressId,
) -> Result<OrderSummary, OrderError> {
    let mut tx = PgCheckout::begin(state.pool())
        .await
        .map_err(|e| OrderError::Store(Box::new(e)))?;

    let summary = checkout::place_order(&mut tx, account, address, Utc::now()).await?;

    tx.commit()
        .await
        .map_err(|e| OrderError::Store(Box::new(e)))?;

    tracing::info!(
        account_id = %account,
        order_id = %summary.order_id,
        total = %summary.total,
        "order placed"
    );
    Ok(summary)
}

/// Build and store a sales report over all placed orders.
///
/// # Errors
///
/// Returns `RepositoryError` if a query fails.
pub async fn create_sales_report(
    state: &AppState,
    creator: AccountId,
) -> Result<Report, RepositoryError> {
    let repo = OrderRepository::new(state.pool());
    let (order_count, revenue) = repo.sales_summary().await?;

    let payload = serde_json::json!({
        "orders": order_count,
        "revenue": revenue.to_string(),
        "generated_at": Utc::now(),
    });

    repo.insert_report(creator, "sales", &payload).await
}
