//! Single-use password reset tokens.
//!
//! The raw token only ever leaves the server inside the reset link; storage
//! keeps its SHA-256 digest.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use url::Url;

pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;
const RESET_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedResetToken {
    /// Sent to the user.
    pub raw: String,
    /// Persisted.
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

pub fn issue_reset_token(now: DateTime<Utc>) -> IssuedResetToken {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let raw = URL_SAFE_NO_PAD.encode(bytes);
    let hash = hash_reset_token(&raw);

    IssuedResetToken {
        raw,
        hash,
        expires_at: now + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
    }
}

pub fn hash_reset_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Append `token` and `email` to the client-supplied reset page URL.
pub fn reset_link(client_reset_url: &str, raw_token: &str, email: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(client_reset_url)?;
    url.query_pairs_mut()
        .append_pair("token", raw_token)
        .append_pair("email", email);
    Ok(url.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_hashes_to_stored_digest() {
        let now = Utc::now();
        let issued = issue_reset_token(now);

        assert_eq!(issued.raw.len(), 43);
        assert_eq!(hash_reset_token(&issued.raw), issued.hash);
        assert_eq!(issued.hash.len(), 64);
        assert_eq!(issued.expires_at - now, Duration::hours(1));
        assert_ne!(issue_reset_token(now).raw, issued.raw);
    }

    #[test]
    fn link_carries_token_and_encoded_email() {
        let link = reset_link("https://admin.example.com/reset", "abc", "a+b@x.io").unwrap();
        assert_eq!(link, "https://admin.example.com/reset?token=abc&email=a%2Bb%40x.io");
    }

    #[test]
    fn link_keeps_existing_query() {
        let link = reset_link("https://x.io/reset?lang=en", "t", "e@x.io").unwrap();
        assert!(link.starts_with("https://x.io/reset?lang=en&token=t&email="));
    }

    #[test]
    fn relative_url_is_rejected() {
        assert!(reset_link("/reset", "t", "e@x.io").is_err());
    }
}
