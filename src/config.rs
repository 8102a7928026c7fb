//! Service configuration, read once at startup from the environment

use crate::auth::token::{DEFAULT_TTL_SECS, MAX_TTL_SECS};
use std::env;
use std::fmt;
use tracing::warn;

/// Secrets shorter than this are accepted with a warning
const MIN_RECOMMENDED_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `JWT_SECRET` unset or blank. Tokens can be neither issued nor accepted.
    MissingSecret,
    InvalidValue { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingSecret => {
                write!(f, "JWT_SECRET must be set to a non-empty value")
            }
            ConfigError::InvalidValue { var, value } => {
                write!(f, "Invalid value for {}: {:?}", var, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Bootstrap admin credentials
#[derive(Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub database_path: String,
    pub bind_addr: String,
    pub cors_allowed_origins: Vec<String>,
    pub secure_cookies: bool,
    pub admin: Option<AdminBootstrap>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("database_path", &self.database_path)
            .field("bind_addr", &self.bind_addr)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("secure_cookies", &self.secure_cookies)
            .field("admin", &self.admin)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingSecret)?;
        if jwt_secret.len() < MIN_RECOMMENDED_SECRET_LEN {
            warn!(
                "⚠️  JWT_SECRET is shorter than {} bytes; use a longer random secret in production",
                MIN_RECOMMENDED_SECRET_LEN
            );
        }

        let token_ttl_secs = match lookup("TOKEN_TTL_SECS") {
            None => DEFAULT_TTL_SECS,
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|v| (1..=MAX_TTL_SECS).contains(v))
                .ok_or(ConfigError::InvalidValue {
                    var: "TOKEN_TTL_SECS",
                    value: raw,
                })?,
        };

        let database_path = lookup("DATABASE_PATH")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "coop.db".to_string());

        let bind_addr = lookup("BIND_ADDR")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "0.0.0.0:3000".to_string());

        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let secure_cookies = lookup("SECURE_COOKIES")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON"))
            .unwrap_or(false);

        let admin = match (lookup("ADMIN_EMAIL"), lookup("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some(AdminBootstrap { email, password })
            }
            _ => None,
        };

        Ok(Self {
            jwt_secret,
            token_ttl_secs,
            database_path,
            bind_addr,
            cors_allowed_origins,
            secure_cookies,
            admin,
        })
    }
}
