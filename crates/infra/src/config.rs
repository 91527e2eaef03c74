//! Runtime configuration read from the environment.
//!
//! A `.env` file in the working directory is loaded first when present.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Administrator created at startup when missing.
#[derive(Clone, PartialEq, Eq)]
pub struct SeedAdmin {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for SeedAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SeedAdmin")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Postgres connection string; the in-memory store is used when absent.
    pub database_url: Option<String>,
    pub seed_admin: Option<SeedAdmin>,
    pub cors_allow_origin: Option<String>,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("database", &self.database_url.as_ref().map(|_| "<set>"))
            .field("seed_admin", &self.seed_admin)
            .field("cors_allow_origin", &self.cors_allow_origin)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to load .env file");
            }
        }
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match get("BIND_ADDR") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: "BIND_ADDR",
                value,
            })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let access_token_ttl = seconds(get("ACCESS_TOKEN_TTL_SECS"), "ACCESS_TOKEN_TTL_SECS", 900)?;
        let refresh_token_ttl =
            seconds(get("REFRESH_TOKEN_TTL_SECS"), "REFRESH_TOKEN_TTL_SECS", 604_800)?;

        let seed_admin = match (get("SEED_ADMIN_EMAIL"), get("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SeedAdmin {
                email: email.to_lowercase(),
                password,
            }),
            (None, None) => None,
            _ => {
                tracing::warn!("SEED_ADMIN_EMAIL and SEED_ADMIN_PASSWORD must be set together; skipping seed");
                None
            }
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl,
            database_url: get("DATABASE_URL"),
            seed_admin,
            cors_allow_origin: get("CORS_ALLOW_ORIGIN"),
        })
    }
}

fn seconds(raw: Option<String>, var: &'static str, default: i64) -> Result<Duration, ConfigError> {
    let Some(value) = raw else {
        return Ok(Duration::seconds(default));
    };
    match value.parse::<i64>() {
        Ok(secs) if secs > 0 => Ok(Duration::seconds(secs)),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.access_token_ttl, Duration::minutes(15));
        assert_eq!(cfg.refresh_token_ttl, Duration::days(7));
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.seed_admin, None);
    }

    #[test]
    fn seed_admin_needs_both_values() {
        let cfg = config(&[("SEED_ADMIN_EMAIL", "Root@Example.com"), ("SEED_ADMIN_PASSWORD", "Adm1n@pass")]).unwrap();
        assert_eq!(cfg.seed_admin.map(|s| s.email), Some("root@example.com".to_string()));

        let partial = config(&[("SEED_ADMIN_EMAIL", "root@example.com")]).unwrap();
        assert_eq!(partial.seed_admin, None);
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = config(&[("ACCESS_TOKEN_TTL_SECS", "-5")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "ACCESS_TOKEN_TTL_SECS",
                value: "-5".into()
            }
        );
        assert!(config(&[("BIND_ADDR", "not-an-addr")]).is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = config(&[("JWT_SECRET", "s3cr3t"), ("DATABASE_URL", "postgres://u:pw@db/app")]).unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("s3cr3t"));
        assert!(!rendered.contains("pw@db"));
    }
}
