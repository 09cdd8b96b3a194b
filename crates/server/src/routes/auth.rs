//! Public authentication endpoints.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Account;
use crate::services::auth;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsBody {
    pub email: String,
    pub password: String,
}

/// Token issued to the client, with the account it belongs to.
#[derive(Debug, Serialize)]
pub struct SessionBody {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub account: Account,
}

impl From<auth::Session> for SessionBody {
    fn from(session: auth::Session) -> Self {
        Self {
            token: session.token.token,
            expires_at: session.token.expires_at,
            account: session.account,
        }
    }
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Result<(StatusCode, Json<SessionBody>)> {
    let session = auth::register(&state, &body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<CredentialsBody>,
) -> Result<Json<SessionBody>> {
    let session = auth::login(&state, &body.email, &body.password).await?;
    Ok(Json(session.into()))
}

/// `POST /api/auth/guest`
pub async fn guest(State(state): State<AppState>) -> Result<(StatusCode, Json<SessionBody>)> {
    let session = auth::guest(&state).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}
