use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use backoffice_auth::Permissions;
use backoffice_core::UserId;

/// Tokens and identity returned by login and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub user_id: UserId,
    pub full_name: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Permissions,
}

impl Session {
    /// The access token expires within `margin` of `now`.
    pub fn needs_refresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.access_expires_at - margin <= now
    }

    pub fn can_refresh(&self, now: DateTime<Utc>) -> bool {
        self.refresh_expires_at > now
    }

    pub fn has(&self, required: Permissions) -> bool {
        self.permissions.contains(required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(now: DateTime<Utc>) -> Session {
        Session {
            access_token: "a".into(),
            refresh_token: "r".into(),
            access_expires_at: now + Duration::minutes(15),
            refresh_expires_at: now + Duration::days(7),
            user_id: UserId::new(),
            full_name: "Ada Lovelace".into(),
            profile_image_url: None,
            roles: vec!["Administrator".into()],
            permissions: Permissions::VIEW_USER | Permissions::ADD_USER,
        }
    }

    #[test]
    fn refresh_is_due_inside_the_margin() {
        let now = Utc::now();
        let s = session(now);
        let margin = Duration::seconds(30);

        assert!(!s.needs_refresh(now, margin));
        assert!(!s.needs_refresh(now + Duration::minutes(14), margin));
        assert!(s.needs_refresh(now + Duration::seconds(14 * 60 + 31), margin));
        assert!(s.needs_refresh(now + Duration::minutes(20), margin));
        assert!(s.can_refresh(now + Duration::days(6)));
        assert!(!s.can_refresh(now + Duration::days(7)));
    }

    #[test]
    fn deserializes_login_payload() {
        let json = serde_json::json!({
            "accessToken": "a",
            "refreshToken": "r",
            "expiresIn": 900,
            "accessExpiresAt": "2026-01-01T00:15:00Z",
            "refreshExpiresAt": "2026-01-08T00:00:00Z",
            "userId": "0190f5c4-1c6e-7d2a-9b1e-3f4a5b6c7d8e",
            "fullName": "Ada Lovelace",
            "profileImageUrl": null,
            "roles": ["Administrator"],
            "permissions": 3
        });
        let s: Session = serde_json::from_value(json).unwrap();
        assert!(s.has(Permissions::ADD_USER));
        assert!(!s.has(Permissions::EDIT_USER));
    }
}
