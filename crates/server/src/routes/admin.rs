//! Administration endpoints.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tradewind_core::gate::{AccountView, Capability, GateError};
use tradewind_core::{AccountId, AccountStatus, Email, Role};

use crate::db::AccountRepository;
use crate::error::{AppError, Result};
use crate::middleware::Bearer;
use crate::middleware::auth::require;
use crate::models::{Account, Report};
use crate::services::{auth, orders};
use crate::state::AppState;

/// Account deletion is reserved for exactly these roles.
const DELETION_ROLES: &[Role] = &[Role::Admin, Role::Owner];

/// Refuse operations on accounts above the caller's rung. An Admin may
/// not mint, mutate, or delete an Owner.
fn ensure_outranks(caller: &AccountView, target: Role) -> Result<()> {
    if target > caller.role {
        return Err(AppError::Gate(GateError::RoleInsufficient {
            held: caller.role,
        }));
    }
    Ok(())
}

/// `GET /api/admin/accounts`
pub async fn accounts(State(state): State<AppState>, bearer: Bearer) -> Result<Json<Vec<Account>>> {
    require(&state, &bearer, Capability::min_role(Role::Admin)).await?;
    let accounts = AccountRepository::new(state.pool()).list().await?;
    Ok(Json(accounts))
}

#[derive(Debug, Deserialize)]
pub struct NewAccountBody {
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// `POST /api/admin/accounts` - create a privileged account.
///
/// Admins may not mint accounts above their own rung.
pub async fn create_account(
    State(state): State<AppState>,
    bearer: Bearer,
    Json(body): Json<NewAccountBody>,
) -> Result<(StatusCode, Json<Account>)> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Admin)).await?;
    ensure_outranks(&caller, body.role)?;

    let email =
        Email::parse(&body.email).map_err(|e| AppError::InvalidInput(e.to_string()))?;
    auth::validate_password(&body.password)?;
    let hash = auth::hash_password(&body.password)?;

    let account = AccountRepository::new(state.pool())
        .insert(&email, Some(&hash), body.role, AccountStatus::Active)
        .await?;

    tracing::info!(account_id = %account.id, role = %account.role, "account created by admin");
    Ok((StatusCode::CREATED, Json(account)))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: AccountStatus,
}

/// `PATCH /api/admin/accounts/{id}/status`
///
/// Deactivation takes effect on the target's next gated request, whatever
/// tokens it still holds.
pub async fn set_status(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<AccountId>,
    Json(body): Json<StatusBody>,
) -> Result<StatusCode> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Admin)).await?;

    let repo = AccountRepository::new(state.pool());
    let target = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("account".to_string()))?;
    ensure_outranks(&caller, target.role)?;

    repo.set_status(id, body.status).await?;
    tracing::info!(account_id = %id, status = %body.status, "account status changed");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SetPasswordBody {
    pub password: String,
}

/// `POST /api/admin/accounts/{id}/password`
pub async fn set_password(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<AccountId>,
    Json(body): Json<SetPasswordBody>,
) -> Result<StatusCode> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Admin)).await?;

    let target = AccountRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("account".to_string()))?;
    ensure_outranks(&caller, target.role)?;

    auth::reset_password(&state, id, &body.password).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/admin/accounts/{id}`
///
/// Refused while order history references the account.
pub async fn delete_account(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<AccountId>,
) -> Result<StatusCode> {
    let caller = require(&state, &bearer, Capability::one_of(DELETION_ROLES)).await?;

    if caller.id == id {
        return Err(AppError::Conflict(
            "cannot delete your own account".to_string(),
        ));
    }

    let repo = AccountRepository::new(state.pool());
    let target = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("account".to_string()))?;
    ensure_outranks(&caller, target.role)?;

    repo.delete(id).await?;
    tracing::info!(account_id = %id, "account deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/admin/reports` - generate and store a sales report.
pub async fn create_report(
    State(state): State<AppState>,
    bearer: Bearer,
) -> Result<(StatusCode, Json<Report>)> {
    let caller = require(&state, &bearer, Capability::min_role(Role::Admin)).await?;
    let report = orders::create_sales_report(&state, caller.id).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// `GET /api/admin/reports`
pub async fn reports(State(state): State<AppState>, bearer: Bearer) -> Result<Json<Vec<Report>>> {
    require(&state, &bearer, Capability::min_role(Role::Admin)).await?;
    let reports = crate::db::OrderRepository::new(state.pool())
        .list_reports()
        .await?;
    Ok(Json(reports))
}

/// `DELETE /api/admin/reports/{id}`
pub async fn delete_report(
    State(state): State<AppState>,
    bearer: Bearer,
    Path(id): Path<tradewind_core::ReportId>,
) -> Result<StatusCode> {
    require(&state, &bearer, Capability::min_role(Role::Admin)).await?;
    crate::db::OrderRepository::new(state.pool())
        .delete_report(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tradewind_core::{AccountStatus, Email};

    use super::*;

    fn caller(role: Role) -> AccountView {
        AccountView {
            id: AccountId::new(1),
            email: Email::parse("staff@shop.example").unwrap(),
            role,
            status: AccountStatus::Active,
        }
    }

    #[test]
    fn admin_cannot_reach_above_own_rung() {
        let err = ensure_outranks(&caller(Role::Admin), Role::Owner).unwrap_err();
        assert!(matches!(
            err,
            AppError::Gate(GateError::RoleInsufficient { held: Role::Admin })
        ));
    }

    #[test]
    fn same_or_lower_rung_is_allowed() {
        let admin = caller(Role::Admin);
        assert!(ensure_outranks(&admin, Role::Admin).is_ok());
        assert!(ensure_outranks(&admin, Role::Customer).is_ok());
        assert!(ensure_outranks(&caller(Role::Owner), Role::Admin).is_ok());
    }
}
