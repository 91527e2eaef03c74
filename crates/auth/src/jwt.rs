//! HS256 token issue and verification.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;
use thiserror::Error;

use crate::claims::{JwtClaims, TokenType, TokenValidationError, validate_claims};
use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JwtError {
    #[error("malformed or badly signed token")]
    Invalid,

    #[error("expected a {expected:?} token")]
    WrongType { expected: TokenType },

    #[error(transparent)]
    Claims(#[from] TokenValidationError),

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Verifies bearer tokens presented by clients.
pub trait JwtValidator: Send + Sync {
    /// Validate an access token at `now`.
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError>;
}

/// Freshly issued access/refresh pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

/// Shared-secret codec for both token kinds.
#[derive(Clone)]
pub struct Hs256JwtCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl Hs256JwtCodec {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn issue(
        &self,
        principal: &Principal,
        typ: TokenType,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), JwtError> {
        let ttl = match typ {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let claims = JwtClaims {
            sub: principal.user_id,
            roles: principal.roles.clone(),
            permissions: principal.permissions,
            typ,
            issued_at: now,
            expires_at: now + ttl,
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| JwtError::Signing(e.to_string()))?;
        Ok((token, claims.expires_at))
    }

    pub fn issue_pair(&self, principal: &Principal, now: DateTime<Utc>) -> Result<TokenPair, JwtError> {
        let (access_token, access_expires_at) = self.issue(principal, TokenType::Access, now)?;
        let (refresh_token, refresh_expires_at) = self.issue(principal, TokenType::Refresh, now)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            access_expires_at,
            refresh_expires_at,
        })
    }

    /// Verify signature, token kind and time window.
    pub fn decode(
        &self,
        token: &str,
        expected: TokenType,
        now: DateTime<Utc>,
    ) -> Result<JwtClaims, JwtError> {
        // Time checks run against `now` in validate_claims, not the wall clock.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "jwt rejected");
                JwtError::Invalid
            })?;

        let claims = data.claims;
        if claims.typ != expected {
            return Err(JwtError::WrongType { expected });
        }
        validate_claims(&claims, now)?;
        Ok(claims)
    }
}

impl JwtValidator for Hs256JwtCodec {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        self.decode(token, TokenType::Access, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Permissions;
    use backoffice_core::UserId;

    fn codec(secret: &[u8]) -> Hs256JwtCodec {
        Hs256JwtCodec::new(secret, Duration::minutes(15), Duration::days(7))
    }

    fn principal() -> Principal {
        Principal::new(
            UserId::new(),
            vec!["Admin".into()],
            Permissions::VIEW_USER | Permissions::ADD_USER,
        )
    }

    #[test]
    fn issued_access_token_validates() {
        let codec = codec(b"secret");
        let p = principal();
        let now = Utc::now();
        let pair = codec.issue_pair(&p, now).unwrap();

        let claims = codec.validate(&pair.access_token, now).unwrap();
        assert_eq!(claims.sub, p.user_id);
        assert_eq!(claims.permissions.mask(), 3);
        assert_eq!(pair.access_expires_at, now + Duration::minutes(15));
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let codec = codec(b"secret");
        let now = Utc::now();
        let pair = codec.issue_pair(&principal(), now).unwrap();

        assert_eq!(
            codec.validate(&pair.refresh_token, now),
            Err(JwtError::WrongType { expected: TokenType::Access })
        );
        assert!(codec.decode(&pair.refresh_token, TokenType::Refresh, now).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let codec = codec(b"secret");
        let issued = Utc::now() - Duration::hours(1);
        let (token, _) = codec.issue(&principal(), TokenType::Access, issued).unwrap();

        assert_eq!(
            codec.validate(&token, Utc::now()),
            Err(JwtError::Claims(TokenValidationError::Expired))
        );
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let now = Utc::now();
        let (token, _) = codec(b"other").issue(&principal(), TokenType::Access, now).unwrap();
        assert_eq!(codec(b"secret").validate(&token, now), Err(JwtError::Invalid));
        assert_eq!(codec(b"secret").validate("not-a-jwt", now), Err(JwtError::Invalid));
    }
}
