//! Trolley endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tradewind_core::gate::Capability;
use tradewind_core::{ProductId, Role};

use crate::db::TrolleyRepository;
use crate::error::{AppError, Result};
use crate::middleware::Bearer;
use crate::middleware::auth::require;
use crate::models::TrolleyLine;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddItemBody {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct QuantityBody {
    pub quantity: i32,
}

/// Quantity rule for adding a line: at least one unit.
fn validate_add_quantity(quantity: i32) -> Result<()> {
    if quantity < 1 {
        return Err(AppError::InvalidInput(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Quantity rule for updating a line: non-negative, zero removes it.
fn validate_new_quantity(quantity: i32) -> Result<()> {
    if quantity < 0 {
        return Err(AppError::InvalidInput(
            "quantity must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// `GET /api/trolley`
pub async fn show(State(state): State<AppState>, bearer: Bearer) -> Result<Json<Vec<TrolleyLine>>> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    let lines = TrolleyRepository::new(state.pool()).list(caller.id).await?;
    Ok(Json(lines))
}

/// `POST /api/trolley/items`
pub async fn add(
    State(state): State<AppState>,
    bearer: Bearer,
    Json(body): Json<AddItemBody>,
) -> Result<(StatusCode, Json<TrolleyLine>)> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    validate_add_quantity(body.quantity)?;

    let line = TrolleyRepository::new(state.pool())
        .add(caller.id, body.product_id, body.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(line)))
}

/// `PATCH /api/trolley/items/{product_id}` - quantity 0 removes the line.
pub async fn set_quantity(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(product_id): Path<ProductId>,
    Json(body): Json<QuantityBody>,
) -> Result<StatusCode> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    validate_new_quantity(body.quantity)?;

    TrolleyRepository::new(state.pool())
        .set_quantity(caller.id, product_id, body.quantity)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/trolley/items/{product_id}`
pub async fn remove(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    TrolleyRepository::new(state.pool())
        .remove(caller.id, product_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/trolley`
pub async fn clear(State(state): State<AppState>, bearer: Bearer) -> Result<StatusCode> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    TrolleyRepository::new(state.pool()).clear(caller.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_requires_at_least_one_unit() {
        assert!(matches!(
            validate_add_quantity(0),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_add_quantity(-3),
            Err(AppError::InvalidInput(_))
        ));
        assert!(validate_add_quantity(1).is_ok());
    }

    #[test]
    fn updates_allow_zero_but_not_negatives() {
        assert!(matches!(
            validate_new_quantity(-1),
            Err(AppError::InvalidInput(_))
        ));
        // Zero is valid input; the handler turns it into a removal.
        assert!(validate_new_quantity(0).is_ok());
        assert!(validate_new_quantity(4).is_ok());
    }
}
