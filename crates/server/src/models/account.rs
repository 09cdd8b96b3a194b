//! Account and address models.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tradewind_core::{AccountId, AccountStatus, AddressId, Email, Role};

/// A registered account. The password hash never leaves the repository
/// layer, so it is not part of this model.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: AccountId,
    pub email: Email,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

/// A delivery address belonging to an account.
#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub id: AddressId,
    pub account_id: AccountId,
    pub location: String,
    pub created_at: DateTime<Utc>,
}
