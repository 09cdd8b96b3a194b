//! Account status.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an account.
///
/// Only `Active` accounts may log in and obtain new tokens. The gate
/// re-reads status on every request, so moving an account to `Inactive` or
/// `Condemned` revokes access immediately regardless of token expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "account_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Registered but email not yet verified.
    #[default]
    Unverified,
    /// In good standing.
    Active,
    /// Deactivated by an administrator; may be reactivated.
    Inactive,
    /// Banned; never served again.
    Condemned,
}

impl AccountStatus {
    /// Whether an account in this status may authenticate for a new token.
    #[must_use]
    pub fn may_login(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unverified => write!(f, "unverified"),
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
            Self::Condemned => write!(f, "condemned"),
        }
    }
}

impl std::str::FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unverified" => Ok(Self::Unverified),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            "condemned" => Ok(Self::Condemned),
            _ => Err(format!("invalid account status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_active_may_login() {
        assert!(AccountStatus::Active.may_login());
        assert!(!AccountStatus::Unverified.may_login());
        assert!(!AccountStatus::Inactive.may_login());
        assert!(!AccountStatus::Condemned.may_login());
    }
}
