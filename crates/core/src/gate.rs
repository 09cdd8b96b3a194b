//! Authorization gate.
//!
//! Resolves a bearer token to an account and checks the account's role and
//! status against the capability an endpoint requires. Token verification
//! itself is a collaborator concern behind [`TokenVerifier`]; the gate only
//! consumes the verified claims. Crucially, role and status are taken from a
//! **fresh read** of the account record ([`AccountDirectory`]), never from
//! cached claims, so that deactivating or condemning an account revokes
//! access even while previously issued tokens are unexpired.

use chrono::{DateTime, Utc};

use crate::{AccountId, AccountStatus, Email, Role};

/// Claims extracted from a cryptographically verified bearer token.
///
/// Carries identity and expiry only. Role and status may also be embedded in
/// a token for client display purposes, but the gate ignores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenClaims {
    /// Account the token was issued to.
    pub account_id: AccountId,
    /// Instant after which the token is no longer valid.
    pub expires_at: DateTime<Utc>,
}

/// Why a raw token string failed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFault {
    /// Signature expired.
    Expired,
    /// Malformed token or signature mismatch.
    Invalid,
}

/// Collaborator-provided token verification primitive.
pub trait TokenVerifier {
    /// Verify a raw bearer token and extract its claims.
    fn verify(&self, token: &str) -> Result<TokenClaims, TokenFault>;
}

/// The live account fields the gate decides on.
#[derive(Debug, Clone)]
pub struct AccountView {
    /// Account identity.
    pub id: AccountId,
    /// Account email, for request context.
    pub email: Email,
    /// Current role, as persisted.
    pub role: Role,
    /// Current status, as persisted.
    pub status: AccountStatus,
}

/// Read-only lookup of the current persisted account state.
pub trait AccountDirectory {
    /// Storage-layer error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the live view of an account, or `None` if it does not exist.
    fn find_account(
        &self,
        id: AccountId,
    ) -> impl Future<Output = Result<Option<AccountView>, Self::Error>> + Send;
}

/// The role requirement of a capability.
#[derive(Debug, Clone, Copy)]
pub enum RoleRule {
    /// Any role at or above the given rung of the ladder.
    AtLeast(Role),
    /// Exact membership in a set, e.g. "admin or owner".
    OneOf(&'static [Role]),
}

impl RoleRule {
    fn permits(self, held: Role) -> bool {
        match self {
            Self::AtLeast(min) => held.at_least(min),
            Self::OneOf(set) => set.contains(&held),
        }
    }
}

/// What an endpoint requires of the caller.
#[derive(Debug, Clone, Copy)]
pub struct Capability {
    role: RoleRule,
    statuses: &'static [AccountStatus],
}

impl Capability {
    /// Require at least `role`, `Active` status.
    #[must_use]
    pub const fn min_role(role: Role) -> Self {
        Self {
            role: RoleRule::AtLeast(role),
            statuses: &[AccountStatus::Active],
        }
    }

    /// Require exact membership in `roles`, `Active` status.
    #[must_use]
    pub const fn one_of(roles: &'static [Role]) -> Self {
        Self {
            role: RoleRule::OneOf(roles),
            statuses: &[AccountStatus::Active],
        }
    }

    /// Additionally admit `Unverified` accounts (read-only self endpoints).
    #[must_use]
    pub const fn allow_unverified(mut self) -> Self {
        self.statuses = &[AccountStatus::Active, AccountStatus::Unverified];
        self
    }

    /// The role requirement.
    #[must_use]
    pub const fn role_rule(&self) -> RoleRule {
        self.role
    }
}

/// Authorization failure taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// No bearer token was presented.
    #[error("missing bearer token")]
    TokenMissing,
    /// The token's validity window has passed.
    #[error("bearer token expired")]
    TokenExpired,
    /// The token is malformed or its signature does not verify.
    #[error("invalid bearer token")]
    TokenInvalid,
    /// The token names an account that no longer exists.
    #[error("account not found")]
    AccountNotFound,
    /// The account's current status disallows the operation.
    #[error("account status {0} is not permitted here")]
    AccountStatusRejected(AccountStatus),
    /// The account's current role is below what the endpoint requires.
    #[error("role {held} is insufficient")]
    RoleInsufficient {
        /// Role the account actually holds.
        held: Role,
    },
    /// The account lookup itself failed.
    #[error("account directory error")]
    Directory(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl GateError {
    /// Whether this failure maps to "who are you" rather than "you may not".
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(
            self,
            Self::TokenMissing | Self::TokenExpired | Self::TokenInvalid | Self::AccountNotFound
        )
    }
}

/// Validate a bearer token against a required capability.
///
/// `token` is the raw value of the `Authorization: Bearer` header, if any.
/// Expiry is enforced here against `now` in addition to the verifier's own
/// checks, so callers with a pre-decoded token still get server-side expiry.
///
/// # Errors
///
/// See [`GateError`]. No state is mutated on any path.
pub async fn authorize<V, D>(
    verifier: &V,
    directory: &D,
    token: Option<&str>,
    capability: Capability,
    now: DateTime<Utc>,
) -> Result<AccountView, GateError>
where
    V: TokenVerifier,
    D: AccountDirectory,
{
    let token = token.ok_or(GateError::TokenMissing)?;

    let claims = verifier.verify(token).map_err(|fault| match fault {
        TokenFault::Expired => GateError::TokenExpired,
        TokenFault::Invalid => GateError::TokenInvalid,
    })?;

    if claims.expires_at <= now {
        return Err(GateError::TokenExpired);
    }

    let account = directory
        .find_account(claims.account_id)
        .await
        .map_err(|e| GateError::Directory(Box::new(e)))?
        .ok_or(GateError::AccountNotFound)?;

    if !capability.statuses.contains(&account.status) {
        return Err(GateError::AccountStatusRejected(account.status));
    }

    if !capability.role.permits(account.role) {
        return Err(GateError::RoleInsufficient { held: account.role });
    }

    Ok(account)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::convert::Infallible;

    use chrono::Duration;

    use super::*;

    struct FakeVerifier {
        tokens: HashMap<String, Result<TokenClaims, TokenFault>>,
    }

    impl TokenVerifier for FakeVerifier {
        fn verify(&self, token: &str) -> Result<TokenClaims, TokenFault> {
            self.tokens
                .get(token)
                .copied()
                .unwrap_or(Err(TokenFault::Invalid))
        }
    }

    struct FakeDirectory {
        accounts: HashMap<AccountId, AccountView>,
    }

    impl AccountDirectory for FakeDirectory {
        type Error = Infallible;

        async fn find_account(&self, id: AccountId) -> Result<Option<AccountView>, Infallible> {
            Ok(self.accounts.get(&id).cloned())
        }
    }

    fn account(id: i32, role: Role, status: AccountStatus) -> AccountView {
        AccountView {
            id: AccountId::new(id),
            email: Email::parse(&format!("a{id}@shop.example")).unwrap(),
            role,
            status,
        }
    }

    fn fixture(role: Role, status: AccountStatus) -> (FakeVerifier, FakeDirectory, DateTime<Utc>) {
        let now = Utc::now();
        let claims = TokenClaims {
            account_id: AccountId::new(1),
            expires_at: now + Duration::minutes(30),
        };
        let verifier = FakeVerifier {
            tokens: HashMap::from([
                ("good".to_owned(), Ok(claims)),
                ("stale".to_owned(), Err(TokenFault::Expired)),
            ]),
        };
        let directory = FakeDirectory {
            accounts: HashMap::from([(AccountId::new(1), account(1, role, status))]),
        };
        (verifier, directory, now)
    }

    #[tokio::test]
    async fn missing_token_is_unauthenticated() {
        let (v, d, now) = fixture(Role::Customer, AccountStatus::Active);
        let err = authorize(&v, &d, None, Capability::min_role(Role::Guest), now)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::TokenMissing));
        assert!(err.is_unauthenticated());
    }

    #[tokio::test]
    async fn garbage_and_expired_tokens_are_rejected() {
        let (v, d, now) = fixture(Role::Customer, AccountStatus::Active);
        let cap = Capability::min_role(Role::Guest);
        assert!(matches!(
            authorize(&v, &d, Some("nonsense"), cap, now).await,
            Err(GateError::TokenInvalid)
        ));
        assert!(matches!(
            authorize(&v, &d, Some("stale"), cap, now).await,
            Err(GateError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn claims_expiry_is_enforced_server_side() {
        // Verifier accepts the token; the gate still checks the window.
        let (v, d, now) = fixture(Role::Customer, AccountStatus::Active);
        let later = now + Duration::hours(2);
        assert!(matches!(
            authorize(&v, &d, Some("good"), Capability::min_role(Role::Guest), later).await,
            Err(GateError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn deleted_account_is_not_found() {
        let (v, _, now) = fixture(Role::Customer, AccountStatus::Active);
        let empty = FakeDirectory {
            accounts: HashMap::new(),
        };
        assert!(matches!(
            authorize(&v, &empty, Some("good"), Capability::min_role(Role::Guest), now).await,
            Err(GateError::AccountNotFound)
        ));
    }

    #[tokio::test]
    async fn condemned_account_rejected_even_with_live_token() {
        // The token is unexpired; the live status read wins.
        let (v, d, now) = fixture(Role::Customer, AccountStatus::Condemned);
        let err = authorize(&v, &d, Some("good"), Capability::min_role(Role::Guest), now)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GateError::AccountStatusRejected(AccountStatus::Condemned)
        ));
        assert!(!err.is_unauthenticated());
    }

    #[tokio::test]
    async fn unverified_admitted_only_when_capability_allows() {
        let (v, d, now) = fixture(Role::Customer, AccountStatus::Unverified);
        assert!(matches!(
            authorize(&v, &d, Some("good"), Capability::min_role(Role::Guest), now).await,
            Err(GateError::AccountStatusRejected(AccountStatus::Unverified))
        ));
        let relaxed = Capability::min_role(Role::Guest).allow_unverified();
        assert!(authorize(&v, &d, Some("good"), relaxed, now).await.is_ok());
    }

    #[tokio::test]
    async fn minimum_role_is_a_floor() {
        let (v, d, now) = fixture(Role::Customer, AccountStatus::Active);
        assert!(matches!(
            authorize(&v, &d, Some("good"), Capability::min_role(Role::Employee), now).await,
            Err(GateError::RoleInsufficient {
                held: Role::Customer
            })
        ));

        let (v, d, now) = fixture(Role::Admin, AccountStatus::Active);
        let account = authorize(&v, &d, Some("good"), Capability::min_role(Role::Employee), now)
            .await
            .unwrap();
        assert_eq!(account.role, Role::Admin);
    }

    #[tokio::test]
    async fn role_set_requires_exact_membership() {
        let cap = Capability::one_of(&[Role::Admin, Role::Owner]);

        let (v, d, now) = fixture(Role::Employee, AccountStatus::Active);
        assert!(matches!(
            authorize(&v, &d, Some("good"), cap, now).await,
            Err(GateError::RoleInsufficient {
                held: Role::Employee
            })
        ));

        let (v, d, now) = fixture(Role::Owner, AccountStatus::Active);
        assert!(authorize(&v, &d, Some("good"), cap, now).await.is_ok());
    }
}
