use chrono::{DateTime, Utc};

use backoffice_core::{ResetTokenId, UserId};

/// Stored password-reset token. Only the SHA-256 digest of the raw token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetToken {
    pub id: ResetTokenId,
    pub user_id: UserId,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn new(user_id: UserId, token_hash: String, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            id: ResetTokenId::new(),
            user_id,
            token_hash,
            expires_at,
            used_at: None,
            created_at: now,
        }
    }

    pub fn usable_at(&self, now: DateTime<Utc>) -> bool {
        self.used_at.is_none() && now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn usable_until_expiry_or_use() {
        let now = Utc::now();
        let mut token = PasswordResetToken::new(UserId::new(), "h".into(), now + Duration::hours(1), now);
        assert!(token.usable_at(now + Duration::minutes(59)));
        assert!(!token.usable_at(now + Duration::hours(1)));

        token.used_at = Some(now);
        assert!(!token.usable_at(now));
    }
}
