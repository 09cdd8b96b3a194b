//! Account roles and their ordering.

use serde::{Deserialize, Serialize};

/// Account role, ordered by privilege.
///
/// The derived `Ord` gives the comparison used by capability checks:
/// `Guest < Customer < Employee < Admin < Owner`. Endpoints usually require
/// a *minimum* role; a few (account deletion) require exact membership in a
/// role set instead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "account_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Anonymous shopper with a minted temporary account.
    #[default]
    Guest,
    /// Registered shopper.
    Customer,
    /// Staff member managing the catalogue.
    Employee,
    /// Staff member managing accounts and reports.
    Admin,
    /// Unrestricted access.
    Owner,
}

impl Role {
    /// All roles, lowest privilege first.
    pub const ALL: [Self; 5] = [
        Self::Guest,
        Self::Customer,
        Self::Employee,
        Self::Admin,
        Self::Owner,
    ];

    /// Whether this role grants at least the privileges of `other`.
    #[must_use]
    pub fn at_least(self, other: Self) -> bool {
        self >= other
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest => write!(f, "guest"),
            Self::Customer => write!(f, "customer"),
            Self::Employee => write!(f, "employee"),
            Self::Admin => write!(f, "admin"),
            Self::Owner => write!(f, "owner"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(Self::Guest),
            "customer" => Ok(Self::Customer),
            "employee" => Ok(Self::Employee),
            "admin" => Ok(Self::Admin),
            "owner" => Ok(Self::Owner),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_the_privilege_ladder() {
        assert!(Role::Guest < Role::Customer);
        assert!(Role::Customer < Role::Employee);
        assert!(Role::Employee < Role::Admin);
        assert!(Role::Admin < Role::Owner);
        assert!(Role::Owner.at_least(Role::Guest));
        assert!(!Role::Customer.at_least(Role::Employee));
    }

    #[test]
    fn display_and_from_str_round_trip() {
        for role in Role::ALL {
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("superuser".parse::<Role>().is_err());
    }
}
