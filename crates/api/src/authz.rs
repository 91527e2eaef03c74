//! API-side authorization guard.
//!
//! Every protected handler names the one permission flag it needs and checks
//! it against the session before touching the store.

use backoffice_auth::{AuthzError, Permissions, authorize};

use crate::context::SessionContext;

/// Check that the session holds every flag of `required`.
pub fn require(session: &SessionContext, required: Permissions) -> Result<(), AuthzError> {
    authorize(&session.principal(), required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_auth::{JwtClaims, TokenType};
    use backoffice_core::UserId;
    use chrono::{Duration, Utc};

    fn session(permissions: Permissions) -> SessionContext {
        let now = Utc::now();
        SessionContext::from_claims(JwtClaims {
            sub: UserId::new(),
            roles: vec!["Support".into()],
            permissions,
            typ: TokenType::Access,
            issued_at: now,
            expires_at: now + Duration::minutes(15),
        })
    }

    #[test]
    fn missing_flag_is_named() {
        let s = session(Permissions::VIEW_USER);
        assert!(require(&s, Permissions::VIEW_USER).is_ok());
        let err = require(&s, Permissions::DELETE_USER).unwrap_err();
        assert!(err.to_string().contains("DELETE_USER"));
    }
}
