//! Bearer token issuing and verification.
//!
//! Tokens are HS256 JWTs carrying the account id as `sub` and an `exp`
//! timestamp. Verification is purely cryptographic; the authorization gate
//! re-reads the account row afterwards so that deactivating an account
//! revokes every outstanding token immediately.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tradewind_core::AccountId;
use tradewind_core::gate::{TokenClaims, TokenFault, TokenVerifier};

#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    /// Account id, stringified per JWT convention.
    sub: String,
    /// Expiry as a unix timestamp.
    exp: i64,
    /// Issued-at as a unix timestamp.
    iat: i64,
}

/// Signs and verifies bearer tokens with a shared HMAC secret.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
        }
    }

    /// Issue a token for `account_id` expiring `ttl` from `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if JWT encoding fails, which only happens with a
    /// malformed key.
    pub fn issue(
        &self,
        account_id: AccountId,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<IssuedToken, jsonwebtoken::errors::Error> {
        let expires_at = now + ttl;
        let claims = JwtClaims {
            sub: account_id.to_string(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        Ok(IssuedToken { token, expires_at })
    }
}

/// A freshly signed token plus its expiry, for the login/register responses.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenVerifier for TokenCodec {
    fn verify(&self, token: &str) -> Result<TokenClaims, TokenFault> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &self.validation)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenFault::Expired,
                _ => TokenFault::Invalid,
            })?;

        let account_id = data
            .claims
            .sub
            .parse::<i32>()
            .map(AccountId::new)
            .map_err(|_| TokenFault::Invalid)?;
        let expires_at =
            DateTime::from_timestamp(data.claims.exp, 0).ok_or(TokenFault::Invalid)?;

        Ok(TokenClaims {
            account_id,
            expires_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new(&SecretString::from("k9#mP2$vX8@qL5!nR3^wT7&zB1*cF4(j"))
    }

    #[test]
    fn issued_token_round_trips() {
        let codec = codec();
        let issued = codec
            .issue(AccountId::new(42), Utc::now(), Duration::minutes(30))
            .unwrap();

        let claims = codec.verify(&issued.token).unwrap();
        assert_eq!(claims.account_id, AccountId::new(42));
        assert_eq!(claims.expires_at.timestamp(), issued.expires_at.timestamp());
    }

    #[test]
    fn expired_token_reports_expiry() {
        let codec = codec();
        let issued = codec
            .issue(
                AccountId::new(1),
                Utc::now() - Duration::hours(2),
                Duration::minutes(30),
            )
            .unwrap();

        assert_eq!(codec.verify(&issued.token), Err(TokenFault::Expired));
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let codec = codec();
        let issued = codec
            .issue(AccountId::new(1), Utc::now(), Duration::minutes(30))
            .unwrap();

        let mut tampered = issued.token;
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert_eq!(codec.verify(&tampered), Err(TokenFault::Invalid));
    }

    #[test]
    fn other_secret_is_rejected() {
        let issued = codec()
            .issue(AccountId::new(1), Utc::now(), Duration::minutes(30))
            .unwrap();

        let other = TokenCodec::new(&SecretString::from("z7!qW4$eR9@tY2#uI6^oP1&aS8*dF5(g"));
        assert_eq!(other.verify(&issued.token), Err(TokenFault::Invalid));
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(codec().verify("not-a-token"), Err(TokenFault::Invalid));
    }
}
