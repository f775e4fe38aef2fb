//! HS256 bearer tokens.
//!
//! The signed payload is a flat JSON object:
//!
//! | Claim | Meaning |
//! |-------|---------|
//! | `user_id` | account id |
//! | `org_id` | organization id |
//! | `username` | login name |
//! | `role` | authoritative role key |
//! | `iss` | configured issuer |
//! | `iat` / `nbf` / `exp` | unix seconds |

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use schoolmart_core::{DomainError, OrgId, RoleKey, UserId};

use crate::claims::{IdentityClaims, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature or format is invalid")]
    Malformed,

    #[error("token issuer mismatch")]
    WrongIssuer,

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("token encoding failed: {0}")]
    Encode(String),
}

impl From<TokenError> for DomainError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encode(msg) => DomainError::internal(format!("token encoding failed: {msg}")),
            _ => DomainError::InvalidToken,
        }
    }
}

/// Token verification seam used by the HTTP middleware.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaims, TokenError>;
}

/// Signing configuration.
#[derive(Clone)]
pub struct TokenConfig {
    pub secret: Vec<u8>,
    pub issuer: String,
    pub ttl: Duration,
}

impl TokenConfig {
    pub fn new(secret: impl Into<Vec<u8>>, issuer: impl Into<String>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            ttl,
        }
    }
}

impl core::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// A freshly signed token and the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: IdentityClaims,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    user_id: i64,
    org_id: i64,
    username: String,
    role: String,
    iss: String,
    iat: i64,
    nbf: i64,
    exp: i64,
}

/// Issues and verifies HS256 tokens with a fixed issuer and TTL.
#[derive(Clone)]
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl Hs256TokenService {
    pub fn new(config: TokenConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(&config.secret),
            decoding: DecodingKey::from_secret(&config.secret),
            issuer: config.issuer,
            ttl: config.ttl,
        }
    }

    /// Sign a token for an identity whose role was read from the Role Store.
    pub fn issue(
        &self,
        user_id: UserId,
        org_id: OrgId,
        username: &str,
        role_key: &RoleKey,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        // Tokens carry whole seconds; truncate so the returned claims match a decode.
        let issued_at = Utc
            .timestamp_opt(now.timestamp(), 0)
            .single()
            .ok_or_else(|| TokenError::Encode("timestamp out of range".to_string()))?;
        let expires_at = issued_at + self.ttl;

        let wire = WireClaims {
            user_id: user_id.get(),
            org_id: org_id.get(),
            username: username.to_string(),
            role: role_key.as_str().to_string(),
            iss: self.issuer.clone(),
            iat: issued_at.timestamp(),
            nbf: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &wire, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))?;

        Ok(IssuedToken {
            token,
            claims: IdentityClaims {
                user_id,
                org_id,
                username: username.to_string(),
                role_key: role_key.clone(),
                issued_at,
                expires_at,
            },
        })
    }
}

impl core::fmt::Debug for Hs256TokenService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Hs256TokenService")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtValidator for Hs256TokenService {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        // Time checks run against the caller's clock in `validate_claims`.
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<WireClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidIssuer => TokenError::WrongIssuer,
                _ => TokenError::Malformed,
            }
        })?;
        let wire = data.claims;

        let issued_at = Utc.timestamp_opt(wire.iat, 0).single().ok_or(TokenError::Malformed)?;
        let expires_at = Utc.timestamp_opt(wire.exp, 0).single().ok_or(TokenError::Malformed)?;

        let claims = IdentityClaims {
            user_id: UserId::new(wire.user_id),
            org_id: OrgId::new(wire.org_id),
            username: wire.username,
            role_key: RoleKey::new(wire.role),
            issued_at,
            expires_at,
        };

        validate_claims(&claims, now)?;
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: &str) -> Hs256TokenService {
        Hs256TokenService::new(TokenConfig::new(secret, "schoolmart", Duration::hours(24)))
    }

    #[test]
    fn issued_token_verifies_with_same_claims() {
        let svc = service("test-secret");
        let now = Utc::now();
        let issued = svc
            .issue(UserId::new(1), OrgId::new(1), "platform_admin", &RoleKey::PLATFORM_ADMIN, now)
            .unwrap();

        let claims = svc.validate(&issued.token, now).unwrap();
        assert_eq!(claims, issued.claims);
        assert_eq!(claims.role_key, RoleKey::PLATFORM_ADMIN);
        assert_eq!(claims.user_id, UserId::new(1));
    }

    #[test]
    fn rejects_foreign_secret_and_issuer() {
        let now = Utc::now();
        let issued = service("a")
            .issue(UserId::new(2), OrgId::new(1), "bob", &RoleKey::SCHOOL_ADMIN, now)
            .unwrap();
        assert_eq!(service("b").validate(&issued.token, now), Err(TokenError::Malformed));

        let other = Hs256TokenService::new(TokenConfig::new("a", "someone-else", Duration::hours(1)));
        assert_eq!(other.validate(&issued.token, now), Err(TokenError::WrongIssuer));
    }

    #[test]
    fn rejects_expired_token() {
        let svc = service("test-secret");
        let now = Utc::now();
        let issued = svc
            .issue(UserId::new(3), OrgId::new(1), "carol", &RoleKey::SUPPLIER_ADMIN, now)
            .unwrap();

        let later = now + Duration::hours(25);
        assert_eq!(
            svc.validate(&issued.token, later),
            Err(TokenError::Claims(TokenValidationError::Expired))
        );
        assert_eq!(DomainError::from(TokenError::Malformed), DomainError::InvalidToken);
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(service("s").validate("not.a.jwt", Utc::now()), Err(TokenError::Malformed));
    }
}
