//! Order endpoints, scoped to the calling account.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tradewind_core::checkout::OrderSummary;
use tradewind_core::gate::Capability;
use tradewind_core::{AddressId, OrderId, Role};

use crate::db::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::Bearer;
use crate::middleware::auth::require;
use crate::models::{Invoice, Order, Receipt};
use crate::services::orders;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlaceOrderBody {
    pub address_id: AddressId,
}

/// `POST /api/orders` - convert the trolley into an order.
pub async fn place(
    State(state): State<AppState>,
    bearer: Bearer,
    Json(body): Json<PlaceOrderBody>,
) -> Result<(StatusCode, Json<OrderSummary>)> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    let summary = orders::place(&state, caller.id, body.address_id).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// `GET /api/orders`
pub async fn index(State(state): State<AppState>, bearer: Bearer) -> Result<Json<Vec<Order>>> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    let orders = OrderRepository::new(state.pool())
        .list_for_account(caller.id)
        .await?;
    Ok(Json(orders))
}

/// `GET /api/orders/{id}` - owner only; other accounts' orders read as 404.
pub async fn show(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<OrderId>,
) -> Result<Json<Order>> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    let order = owned_order(&state, caller.id, id).await?;
    Ok(Json(order))
}

/// `GET /api/orders/{id}/invoice`
pub async fn invoice(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<OrderId>,
) -> Result<Json<Invoice>> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    owned_order(&state, caller.id, id).await?;

    let invoice = OrderRepository::new(state.pool())
        .invoice_for_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("invoice for order {id}")))?;
    Ok(Json(invoice))
}

/// `GET /api/orders/{id}/receipt`
pub async fn receipt(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<OrderId>,
) -> Result<Json<Receipt>> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    owned_order(&state, caller.id, id).await?;

    let receipt = OrderRepository::new(state.pool())
        .receipt_for_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("receipt for order {id}")))?;
    Ok(Json(receipt))
}

async fn owned_order(
    state: &AppState,
    account: tradewind_core::AccountId,
    id: OrderId,
) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get(id)
        .await?
        .filter(|o| o.account_id == account)
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))
}
