//! Process configuration
//!
//! Read once at startup from flags or the environment (after `.env` loading)
//! and handed to constructors. Request handling never reads the environment.

use anyhow::{bail, Context, Result};
use chrono::Duration;
use clap::Parser;
use jsonwebtoken::Algorithm;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_SECRET: &str = "secret";
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;

#[derive(Parser, Debug, Clone)]
#[command(name = "rideshare")]
#[command(about = "Ride-hailing API server with scope-gated bearer tokens")]
pub struct Settings {
    /// Shared secret used to sign access tokens
    #[arg(long, env = "SECRET_KEY", default_value = DEFAULT_SECRET, hide_env_values = true)]
    pub secret_key: String,

    /// Token signing algorithm (HS256, HS384 or HS512)
    #[arg(long, env = "ALGORITHM", default_value = "HS256")]
    pub algorithm: String,

    /// Default access token lifetime in minutes
    #[arg(long, env = "ACCESS_TOKEN_EXPIRE_MINUTES", default_value_t = DEFAULT_TOKEN_TTL_MINUTES)]
    pub access_token_expire_minutes: i64,

    /// SQLite database path
    #[arg(long, env = "DB_PATH", default_value = "rideshare.db")]
    pub db_path: String,

    /// Address the API server binds to
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: String,
}

impl Settings {
    pub fn auth_config(&self) -> Result<AuthConfig> {
        if self.secret_key == DEFAULT_SECRET {
            warn!("⚠️  SECRET_KEY is using the built-in default, set it in production");
        }
        AuthConfig::new(
            self.secret_key.clone(),
            &self.algorithm,
            self.access_token_expire_minutes,
        )
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            db_path: self.db_path.clone(),
            bind_addr: self.bind_addr.clone(),
        }
    }
}

/// Signing configuration for the token codec and session issuer
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub algorithm: Algorithm,
    pub token_ttl: Duration,
}

impl AuthConfig {
    pub fn new(secret: String, algorithm: &str, ttl_minutes: i64) -> Result<Self> {
        if secret.is_empty() {
            bail!("Signing secret must not be empty");
        }
        let algorithm = Algorithm::from_str(algorithm)
            .with_context(|| format!("Unknown signing algorithm: {}", algorithm))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            bail!(
                "Signing algorithm {:?} is not a shared-secret (HMAC) algorithm",
                algorithm
            );
        }
        if ttl_minutes <= 0 {
            bail!("Token lifetime must be positive, got {} minutes", ttl_minutes);
        }
        let token_ttl = Duration::try_minutes(ttl_minutes).context("Token lifetime overflows")?;

        Ok(Self {
            secret,
            algorithm,
            token_ttl,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: String,
    pub bind_addr: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse() {
        let settings = Settings::parse_from(["rideshare"]);
        assert_eq!(settings.algorithm, "HS256");
        assert_eq!(settings.access_token_expire_minutes, 60);

        let auth = AuthConfig::new("k".to_string(), &settings.algorithm, 60).unwrap();
        assert_eq!(auth.algorithm, Algorithm::HS256);
        assert_eq!(auth.token_ttl, Duration::minutes(60));
    }

    #[test]
    fn test_rejects_non_hmac_algorithm() {
        assert!(AuthConfig::new("k".to_string(), "RS256", 60).is_err());
        assert!(AuthConfig::new("k".to_string(), "nope", 60).is_err());
        assert!(AuthConfig::new("k".to_string(), "HS512", 60).is_ok());
    }

    #[test]
    fn test_rejects_bad_lifetime_and_secret() {
        assert!(AuthConfig::new("k".to_string(), "HS256", 0).is_err());
        assert!(AuthConfig::new(String::new(), "HS256", 60).is_err());
    }
}
