//! Authentication service: registration, login, guest access, passwords.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use tradewind_core::{AccountId, AccountStatus, Email, Role};

use crate::db::{AccountRepository, RepositoryError};
use crate::models::Account;
use crate::state::AppState;
use crate::token::IssuedToken;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Status given to self-registered accounts. There is no email verification
/// flow; registration activates immediately, so login and the first issued
/// token both work. `Unverified` is reserved for admin-driven onboarding.
const REGISTERED_STATUS: AccountStatus = AccountStatus::Active;

/// Errors from authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Email/password pair does not match a stored credential.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but its status forbids login.
    #[error("account is {0}")]
    AccountNotActive(AccountStatus),

    /// An account with this email already exists.
    #[error("email already registered")]
    EmailTaken,

    /// Password does not meet the rules.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// Email address failed validation.
    #[error("invalid email: {0}")]
    InvalidEmail(String),

    /// Underlying repository error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Password hashing failed.
    #[error("password hashing failed")]
    Hashing,

    /// Token signing failed.
    #[error("token issuing failed")]
    TokenIssue,
}

/// An authenticated account paired with its freshly issued token.
#[derive(Debug)]
pub struct Session {
    pub account: Account,
    pub token: IssuedToken,
}

/// Register a new customer account and issue its first token.
///
/// The account comes up `Active` and can immediately log in, shop, and
/// check out.
///
/// # Errors
///
/// Returns `AuthError::EmailTaken` for duplicate emails and
/// `AuthError::WeakPassword`/`InvalidEmail` for rejected input.
pub async fn register(state: &AppState, email: &str, password: &str) -> Result<Session, AuthError> {
    let email = Email::parse(email).map_err(|e| AuthError::InvalidEmail(e.to_string()))?;
    validate_password(password)?;

    let repo = AccountRepository::new(state.pool());
    if repo.get_by_email(&email).await?.is_some() {
        return Err(AuthError::EmailTaken);
    }

    let hash = hash_password(password)?;
    let account = repo
        .insert(&email, Some(&hash), Role::Customer, REGISTERED_STATUS)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::EmailTaken,
            other => AuthError::Repository(other),
        })?;

    tracing::info!(account_id = %account.id, "account registered");
    issue_session(state, account, state.config().token_ttl_minutes)
}

/// Authenticate with email and password and issue a token.
///
/// Only `Active` accounts may log in. The error for a missing account and
/// for a wrong password is the same, so the endpoint does not leak which
/// emails are registered.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` or `AuthError::AccountNotActive`.
pub async fn login(state: &AppState, email: &str, password: &str) -> Result<Session, AuthError> {
    let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

    let repo = AccountRepository::new(state.pool());
    let account = repo
        .get_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    let hash = repo
        .password_hash(account.id)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    verify_password(password, &hash)?;

    if !account.status.may_login() {
        return Err(AuthError::AccountNotActive(account.status));
    }

    tracing::info!(account_id = %account.id, "login");
    issue_session(state, account, state.config().token_ttl_minutes)
}

/// Mint a throwaway guest account with a short-lived token.
///
/// Guests can browse, fill a trolley, and check out, but have no password
/// and cannot log back in once the token expires.
///
/// # Errors
///
/// Returns `AuthError::Repository` if the insert fails.
pub async fn guest(state: &AppState) -> Result<Session, AuthError> {
    let handle = uuid::Uuid::new_v4().simple().to_string();
    let email = format!("guest_{}@temp.domain", &handle[..8]);
    let email = Email::parse(&email).map_err(|e| AuthError::InvalidEmail(e.to_string()))?;

    let repo = AccountRepository::new(state.pool());
    let account = repo
        .insert(&email, None, Role::Guest, AccountStatus::Active)
        .await?;

    tracing::info!(account_id = %account.id, "guest account minted");
    issue_session(state, account, state.config().guest_token_ttl_minutes)
}

/// Change the caller's own password, verifying the current one first.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the current password is
/// wrong and `AuthError::WeakPassword` if the new one is rejected.
pub async fn change_password(
    state: &AppState,
    account: AccountId,
    current: &str,
    new: &str,
) -> Result<(), AuthError> {
    validate_password(new)?;

    let repo = AccountRepository::new(state.pool());
    let hash = repo
        .password_hash(account)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    verify_password(current, &hash)?;

    let new_hash = hash_password(new)?;
    repo.set_password_hash(account, &new_hash).await?;
    tracing::info!(account_id = %account, "password changed");
    Ok(())
}

/// Set an account's password without knowing the old one. Admin paths and
/// the CLI only.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is rejected.
pub async fn reset_password(
    state: &AppState,
    account: AccountId,
    new: &str,
) -> Result<(), AuthError> {
    validate_password(new)?;
    let hash = hash_password(new)?;
    AccountRepository::new(state.pool())
        .set_password_hash(account, &hash)
        .await?;
    Ok(())
}

fn issue_session(state: &AppState, account: Account, ttl_minutes: i64) -> Result<Session, AuthError> {
    let token = state
        .tokens()
        .issue(account.id, Utc::now(), Duration::minutes(ttl_minutes))
        .map_err(|_| AuthError::TokenIssue)?;
    Ok(Session { account, token })
}

/// Validate password rules: length plus at least one uppercase letter.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if !password.chars().any(char::is_uppercase) {
        return Err(AuthError::WeakPassword(
            "password must contain at least one uppercase letter".to_string(),
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Hashing)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_accounts_can_log_straight_in() {
        // Login admits Active accounts only, so registration must produce
        // a status that passes that check.
        assert!(REGISTERED_STATUS.may_login());
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(matches!(
            validate_password("Short1"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn all_lowercase_password_is_rejected() {
        assert!(matches!(
            validate_password("lowercase-only"),
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[test]
    fn conforming_password_is_accepted() {
        assert!(validate_password("Correct horse").is_ok());
    }

    #[test]
    fn hash_round_trip() {
        let hash = hash_password("Tradewind1").expect("hashing");
        assert!(verify_password("Tradewind1", &hash).is_ok());
        assert!(matches!(
            verify_password("tradewind1", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
