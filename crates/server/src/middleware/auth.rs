//! Bearer token extraction and the gate helper handlers call.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use tradewind_core::gate::{self, AccountView, Capability};

use crate::db::AccountRepository;
use crate::error::{AppError, set_sentry_user};
use crate::state::AppState;

/// Extractor for the raw `Authorization: Bearer` token, if any.
///
/// Extraction never rejects; requirements are enforced by [`require`],
/// so every endpoint decides its own capability.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(State(state): State<AppState>, bearer: Bearer) -> Result<...> {
///     let caller = require(&state, &bearer, Capability::min_role(Role::Customer)).await?;
///     // ...
/// }
/// ```
pub struct Bearer(pub Option<String>);

impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_owned);

        Ok(Self(token))
    }
}

/// Run the authorization gate for this request.
///
/// Verifies the token cryptographically, then re-reads the live account
/// row, so role demotions and status changes take effect immediately.
///
/// # Errors
///
/// Returns `AppError::Gate`: 401 for token problems, 403 for status/role
/// rejections.
pub async fn require(
    state: &AppState,
    bearer: &Bearer,
    capability: Capability,
) -> Result<AccountView, AppError> {
    let directory = AccountRepository::new(state.pool());
    let caller = gate::authorize(
        state.tokens(),
        &directory,
        bearer.0.as_deref(),
        capability,
        Utc::now(),
    )
    .await?;

    set_sentry_user(&caller.id, Some(caller.email.as_str()));
    Ok(caller)
}
