use serde::{Deserialize, Serialize};

use backoffice_core::UserId;

use crate::{JwtClaims, Permissions};

/// An authenticated back-office user as seen by authorization checks.
///
/// Built from verified token claims; carries no storage handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<String>,
    pub permissions: Permissions,
}

impl Principal {
    pub fn new(user_id: UserId, roles: Vec<String>, permissions: Permissions) -> Self {
        Self {
            user_id,
            roles,
            permissions,
        }
    }

    pub fn from_claims(claims: &JwtClaims) -> Self {
        Self {
            user_id: claims.sub,
            roles: claims.roles.clone(),
            permissions: claims.permissions,
        }
    }

    pub fn has(&self, required: Permissions) -> bool {
        self.permissions.contains(required)
    }
}
