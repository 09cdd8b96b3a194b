//! Self-service account endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tradewind_core::gate::Capability;
use tradewind_core::{AddressId, Role};

use crate::db::AccountRepository;
use crate::error::{AppError, Result};
use crate::middleware::Bearer;
use crate::middleware::auth::require;
use crate::models::{Account, Address};
use crate::services::auth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileBody {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PasswordBody {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AddressBody {
    pub location: String,
}

/// `GET /api/account` - unverified accounts may read themselves.
pub async fn show(State(state): State<AppState>, bearer: Bearer) -> Result<Json<Account>> {
    let caller = require(
        &state,
        &bearer,
        Capability::min_role(Role::Guest).allow_unverified(),
    )
    .await?;

    let account = AccountRepository::new(state.pool())
        .get_by_id(caller.id)
        .await?
        .ok_or_else(|| AppError::NotFound("account".to_string()))?;
    Ok(Json(account))
}

/// `PATCH /api/account`
pub async fn update(
    State(state): State<AppState>,
    bearer: Bearer,
    Json(body): Json<ProfileBody>,
) -> Result<Json<Account>> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;

    let account = AccountRepository::new(state.pool())
        .update_profile(
            caller.id,
            body.first_name.as_deref(),
            body.last_name.as_deref(),
        )
        .await?;
    Ok(Json(account))
}

/// `POST /api/account/password`
pub async fn change_password(
    State(state): State<AppState>,
    bearer: Bearer,
    Json(body): Json<PasswordBody>,
) -> Result<StatusCode> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    auth::change_password(&state, caller.id, &body.current_password, &body.new_password).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/account/addresses`
pub async fn addresses(State(state): State<AppState>, bearer: Bearer) -> Result<Json<Vec<Address>>> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    let addresses = AccountRepository::new(state.pool())
        .list_addresses(caller.id)
        .await?;
    Ok(Json(addresses))
}

/// `POST /api/account/addresses`
pub async fn create_address(
    State(state): State<AppState>,
    bearer: Bearer,
    Json(body): Json<AddressBody>,
) -> Result<(StatusCode, Json<Address>)> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;

    if body.location.trim().is_empty() {
        return Err(AppError::InvalidInput("location must not be empty".to_string()));
    }

    let address = AccountRepository::new(state.pool())
        .insert_address(caller.id, body.location.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// `DELETE /api/account/addresses/{id}`
pub async fn delete_address(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<AddressId>,
) -> Result<StatusCode> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Guest)).await?;
    AccountRepository::new(state.pool())
        .delete_address(caller.id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
