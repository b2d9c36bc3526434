//! Service configuration, read once from the environment at startup and passed
//! by reference from there on.

use std::str::FromStr;

use thiserror::Error;

const SQUARE_SANDBOX_URL: &str = "https://connect.squareupsandbox.com";
const SQUARE_PRODUCTION_URL: &str = "https://connect.squareup.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
    /// Currency tag attached to order money sent to the gateway.
    pub default_currency: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"***")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let required = |name: &'static str| var(name).ok_or(ConfigError::Missing(name));

        fn parsed<T: FromStr>(
            value: Option<String>,
            name: &'static str,
            default: T,
        ) -> Result<T, ConfigError> {
            match value {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid { name, value: raw }),
                None => Ok(default),
            }
        }

        let base_url = match var("SQUARE_BASE_URL") {
            Some(url) => url,
            None => match var("SQUARE_ENVIRONMENT").as_deref() {
                None | Some("sandbox") => SQUARE_SANDBOX_URL.to_string(),
                Some("production") => SQUARE_PRODUCTION_URL.to_string(),
                Some(other) => {
                    return Err(ConfigError::Invalid {
                        name: "SQUARE_ENVIRONMENT",
                        value: other.to_string(),
                    });
                }
            },
        };

        Ok(Self {
            port: parsed(var("PORT"), "PORT", 8080)?,
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: parsed(
                    var("DATABASE_MAX_CONNECTIONS"),
                    "DATABASE_MAX_CONNECTIONS",
                    10,
                )?,
            },
            auth: AuthConfig {
                jwt_secret: required("JWT_SECRET")?,
                token_ttl_hours: parsed(var("JWT_TTL_HOURS"), "JWT_TTL_HOURS", 24)?,
            },
            gateway: GatewayConfig {
                base_url,
                api_version: var("SQUARE_API_VERSION").unwrap_or_else(|| "2024-10-17".into()),
                timeout_secs: parsed(var("SQUARE_TIMEOUT_SECS"), "SQUARE_TIMEOUT_SECS", 30)?,
            },
            default_currency: var("DEFAULT_CURRENCY")
                .map(|c| c.to_uppercase())
                .unwrap_or_else(|| "USD".into()),
        })
    }
}
