//! Account and address repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tradewind_core::gate::{AccountDirectory, AccountView};
use tradewind_core::{AccountId, AccountStatus, AddressId, Email, Role};

use super::RepositoryError;
use crate::models::{Account, Address};

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i32,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    role: Role,
    status: AccountStatus,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_account(self) -> Result<Account, RepositoryError> {
        let email = Email::parse(&self.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Account {
            id: AccountId::new(self.id),
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            status: self.status,
            created_at: self.created_at,
        })
    }
}

/// Repository for account database operations.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an account by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: AccountId) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, first_name, last_name, role, status, created_at
             FROM account WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(AccountRow::into_account).transpose()
    }

    /// Get an account by its email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<Account>, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, first_name, last_name, role, status, created_at
             FROM account WHERE email = $1",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(AccountRow::into_account).transpose()
    }

    /// Fetch the stored password hash for an email, if any.
    ///
    /// Guest accounts have no hash and yield `Ok(None)` even when the
    /// account row exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn password_hash(&self, id: AccountId) -> Result<Option<String>, RepositoryError> {
        let hash = sqlx::query_scalar::<_, Option<String>>(
            "SELECT password_hash FROM account WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(hash.flatten())
    }

    /// Insert a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already taken.
    pub async fn insert(
        &self,
        email: &Email,
        password_hash: Option<&str>,
        role: Role,
        status: AccountStatus,
    ) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "INSERT INTO account (email, password_hash, role, status)
             VALUES ($1, $2, $3, $4)
             RETURNING id, email, first_name, last_name, role, status, created_at",
        )
        .bind(email.as_str())
        .bind(password_hash)
        .bind(role)
        .bind(status)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, "email already registered"))?;

        row.into_account()
    }

    /// Update profile fields. `None` leaves a field untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn update_profile(
        &self,
        id: AccountId,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Result<Account, RepositoryError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "UPDATE account
             SET first_name = COALESCE($2, first_name),
                 last_name = COALESCE($3, last_name)
             WHERE id = $1
             RETURNING id, email, first_name, last_name, role, status, created_at",
        )
        .bind(id)
        .bind(first_name)
        .bind(last_name)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        row.into_account()
    }

    /// Replace the stored password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn set_password_hash(
        &self,
        id: AccountId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE account SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set the account status. Takes effect on the next gated request, so
    /// it also revokes outstanding tokens for deactivated accounts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist.
    pub async fn set_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE account SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List all accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Account>, RepositoryError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            "SELECT id, email, first_name, last_name, role, status, created_at
             FROM account ORDER BY created_at DESC",
        )
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(AccountRow::into_account).collect()
    }

    /// Delete an account. Fails while orders still reference it, since
    /// order history is append-only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the account does not exist and
    /// `RepositoryError::Conflict` if orders still reference it.
    pub async fn delete(&self, id: AccountId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM account WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_sqlx(e, "account has order history and cannot be deleted")
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List an account's addresses.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_addresses(&self, id: AccountId) -> Result<Vec<Address>, RepositoryError> {
        let rows = sqlx::query_as::<_, AddressRow>(
            "SELECT id, account_id, location, created_at
             FROM address WHERE account_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(AddressRow::into_address).collect())
    }

    /// Add an address to an account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert_address(
        &self,
        id: AccountId,
        location: &str,
    ) -> Result<Address, RepositoryError> {
        let row = sqlx::query_as::<_, AddressRow>(
            "INSERT INTO address (account_id, location) VALUES ($1, $2)
             RETURNING id, account_id, location, created_at",
        )
        .bind(id)
        .bind(location)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into_address())
    }

    /// Delete an address, scoped to its owner. Addresses referenced by an
    /// order are kept for history and refuse deletion.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address does not exist or
    /// belongs to someone else.
    pub async fn delete_address(
        &self,
        account_id: AccountId,
        address_id: AddressId,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM address WHERE id = $1 AND account_id = $2")
            .bind(address_id)
            .bind(account_id)
            .execute(self.pool)
            .await
            .map_err(|e| {
                RepositoryError::from_sqlx(e, "address is referenced by an order")
            })?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: i32,
    account_id: i32,
    location: String,
    created_at: DateTime<Utc>,
}

impl AddressRow {
    fn into_address(self) -> Address {
        Address {
            id: AddressId::new(self.id),
            account_id: AccountId::new(self.account_id),
            location: self.location,
            created_at: self.created_at,
        }
    }
}

impl AccountDirectory for AccountRepository<'_> {
    type Error = RepositoryError;

    async fn find_account(&self, id: AccountId) -> Result<Option<AccountView>, RepositoryError> {
        let account = self.get_by_id(id).await?;
        Ok(account.map(|a| AccountView {
            id: a.id,
            email: a.email,
            role: a.role,
            status: a.status,
        }))
    }
}
