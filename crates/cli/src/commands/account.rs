//! Privileged account creation.

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use tradewind_core::{AccountStatus, Email, Role};

use super::{CommandError, connect};

/// Create an account with the given role, argon2-hashing the password.
///
/// # Errors
///
/// Returns an error for invalid input, a taken email, or a failed query.
pub async fn create(email: &str, password: &str, role: &str) -> Result<(), CommandError> {
    let email = Email::parse(email).map_err(|e| CommandError::Invalid(e.to_string()))?;
    let role: Role = role
        .parse()
        .map_err(|_| CommandError::Invalid(format!("unknown role: {role}")))?;

    if password.chars().count() < 8 || !password.chars().any(char::is_uppercase) {
        return Err(CommandError::Invalid(
            "password must be at least 8 characters with an uppercase letter".to_string(),
        ));
    }

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CommandError::Invalid(format!("hashing failed: {e}")))?
        .to_string();

    let pool = connect().await?;
    let id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO account (email, password_hash, role, status)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(email.as_str())
    .bind(&hash)
    .bind(role)
    .bind(AccountStatus::Active)
    .fetch_one(&pool)
    .await?;

    tracing::info!(account_id = id, %role, "account created");
    Ok(())
}

/// Delete guest accounts older than `days` that never placed an order.
///
/// Guest accounts are minted on every `POST /api/auth/guest` and become
/// unreachable once their token expires; this reclaims the abandoned ones.
/// Guests with order history are kept, matching the append-only policy.
///
/// # Errors
///
/// Returns an error for a non-positive age or a failed query.
pub async fn purge_guests(days: i32) -> Result<(), CommandError> {
    if days < 1 {
        return Err(CommandError::Invalid(
            "--days must be at least 1".to_string(),
        ));
    }

    let pool = connect().await?;
    let result = sqlx::query(
        "DELETE FROM account a
         WHERE a.role = 'guest'
           AND a.created_at < now() - make_interval(days => $1)
           AND NOT EXISTS (SELECT 1 FROM \"order\" o WHERE o.account_id = a.id)",
    )
    .bind(days)
    .execute(&pool)
    .await?;

    tracing::info!(purged = result.rows_affected(), days, "stale guest accounts purged");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn purge_rejects_non_positive_age() {
        assert!(matches!(
            purge_guests(0).await,
            Err(CommandError::Invalid(_))
        ));
        assert!(matches!(
            purge_guests(-7).await,
            Err(CommandError::Invalid(_))
        ));
    }
}
