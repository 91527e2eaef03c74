use chrono::{DateTime, Utc};
use serde::Serialize;

use backoffice_auth::{JwtClaims, Permissions, Principal};
use backoffice_core::UserId;

/// Authenticated session for a request.
///
/// Built by the auth middleware from a verified access token and handed to
/// handlers explicitly. Immutable for the lifetime of the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    user_id: UserId,
    roles: Vec<String>,
    permissions: Permissions,
    expires_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn from_claims(claims: JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            roles: claims.roles,
            permissions: claims.permissions,
            expires_at: claims.expires_at,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.user_id, self.roles.clone(), self.permissions)
    }
}
