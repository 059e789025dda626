use std::env;
use std::time::Duration;
use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::SecurityHeadersLayer;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 7 * 24 * 60 * 60;
const DEV_JWT_SECRET: &str = "campus-events-dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set when RUST_ENV=production")]
    MissingJwtSecret,
}

/// Optional admin account created at startup when no user owns the email.
#[derive(Debug, Clone)]
pub struct AdminBootstrap {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub token_lifetime: Duration,
    pub port: u16,
    pub cors_allowed_origins: Option<String>,
    pub production: bool,
    pub admin: Option<AdminBootstrap>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            token_lifetime: Duration::from_secs(DEFAULT_TOKEN_LIFETIME_SECS),
            port: DEFAULT_PORT,
            cors_allowed_origins: None,
            production: false,
            admin: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let production = env::var("RUST_ENV")
            .map(|v| v.to_lowercase() == "production")
            .unwrap_or(false);

        let jwt_secret = jwt_secret(env::var("JWT_SECRET").ok(), production)?;

        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminBootstrap {
                name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string()),
                email,
                password,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            jwt_secret,
            token_lifetime: Duration::from_secs(parse_var(
                "JWT_EXPIRES_IN_SECS",
                DEFAULT_TOKEN_LIFETIME_SECS,
            )),
            port: parse_var("PORT", DEFAULT_PORT),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS").ok(),
            production,
            admin,
        })
    }
}

/// The development secret is public, so production refuses to start without
/// a configured one.
fn jwt_secret(configured: Option<String>, production: bool) -> Result<String, ConfigError> {
    match configured.filter(|secret| !secret.trim().is_empty()) {
        Some(secret) => Ok(secret),
        None if production => Err(ConfigError::MissingJwtSecret),
        None => {
            tracing::warn!("JWT_SECRET is not set; using the development secret");
            Ok(DEV_JWT_SECRET.to_string())
        }
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "Ignoring unparsable value");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_falls_back_on_garbage() {
        std::env::set_var("CAMPUS_EVENTS_TEST_PORT", "not-a-port");
        assert_eq!(parse_var("CAMPUS_EVENTS_TEST_PORT", 5000u16), 5000);

        std::env::set_var("CAMPUS_EVENTS_TEST_PORT", " 8080 ");
        assert_eq!(parse_var("CAMPUS_EVENTS_TEST_PORT", 5000u16), 8080);

        std::env::remove_var("CAMPUS_EVENTS_TEST_PORT");
        assert_eq!(parse_var("CAMPUS_EVENTS_TEST_PORT", 5000u16), 5000);
    }

    #[test]
    fn test_production_requires_jwt_secret() {
        assert_eq!(jwt_secret(None, true), Err(ConfigError::MissingJwtSecret));
        assert_eq!(
            jwt_secret(Some("   ".to_string()), true),
            Err(ConfigError::MissingJwtSecret)
        );
        assert_eq!(
            jwt_secret(Some("s3cret".to_string()), true),
            Ok("s3cret".to_string())
        );
    }

    #[test]
    fn test_development_falls_back_to_dev_secret() {
        assert_eq!(jwt_secret(None, false), Ok(DEV_JWT_SECRET.to_string()));
    }
}
