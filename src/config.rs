//! Service configuration read from the environment

use std::env;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

use crate::accounts::PasswordPolicy;
use crate::auth::TOKEN_TTL_MINUTES;
use crate::weather::DEFAULT_ARCHIVE_URL;

/// Signing secret used when neither `JWT_SECRET` nor `SECRET_KEY` is set. Never fit for
/// production.
pub const DEFAULT_JWT_SECRET: &str = "test key";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_DATABASE_URL: &str = "sqlite://map_my_crop.db";

/// Work factors bcrypt accepts
const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {name}")]
    InvalidValue { name: &'static str, value: String },
}

/// Logging output format
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

/// Credential and session settings
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Symmetric secret session tokens are signed with
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub password_policy: PasswordPolicy,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: DEFAULT_JWT_SECRET.to_owned(),
            token_ttl: Duration::minutes(TOKEN_TTL_MINUTES),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            password_policy: PasswordPolicy::default(),
        }
    }
}

/// Top level service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Address where to host the service
    pub bind_addr: String,
    pub database_url: String,
    /// Weather archive endpoint
    pub weather_api_url: String,
    pub log_format: LogFormat,
    pub auth: AuthConfig,
}

impl Config {
    /// Reads configuration from environment variables.
    ///
    /// | Variable            | Default                                          |
    /// |---------------------|--------------------------------------------------|
    /// | `BIND_ADDR`         | `0.0.0.0:$PORT`, or `0.0.0.0:8000`               |
    /// | `DATABASE_URL`      | `sqlite://map_my_crop.db`                        |
    /// | `JWT_SECRET`        | `SECRET_KEY`, or `test key`                      |
    /// | `TOKEN_TTL_MINUTES` | `15`                                             |
    /// | `BCRYPT_COST`       | `12`                                             |
    /// | `WEATHER_API_URL`   | `https://archive-api.open-meteo.com/v1/archive`  |
    /// | `LOG_FORMAT`        | `compact`                                        |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR")
            .or_else(|| lookup("PORT").map(|port| format!("0.0.0.0:{port}")))
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());

        let defaults = AuthConfig::default();
        let auth = AuthConfig {
            jwt_secret: lookup("JWT_SECRET")
                .or_else(|| lookup("SECRET_KEY"))
                .unwrap_or(defaults.jwt_secret),
            token_ttl: parse_var::<u32>(&lookup, "TOKEN_TTL_MINUTES")?
                .map(|minutes| Duration::minutes(minutes.into()))
                .unwrap_or(defaults.token_ttl),
            bcrypt_cost: match parse_var::<u32>(&lookup, "BCRYPT_COST")? {
                Some(cost) if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) => {
                    return Err(ConfigError::InvalidValue {
                        name: "BCRYPT_COST",
                        value: cost.to_string(),
                    });
                }
                cost => cost.unwrap_or(defaults.bcrypt_cost),
            },
            password_policy: defaults.password_policy,
        };

        Ok(Self {
            bind_addr,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            weather_api_url: lookup("WEATHER_API_URL")
                .unwrap_or_else(|| DEFAULT_ARCHIVE_URL.to_owned()),
            log_format: parse_var(&lookup, "LOG_FORMAT")?.unwrap_or_default(),
            auth,
        })
    }

    /// Whether tokens would be signed with the built-in secret
    pub fn uses_default_secret(&self) -> bool {
        self.auth.jwt_secret == DEFAULT_JWT_SECRET
    }
}

/// Parses variable `name` if it is set
fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(name)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name, value })
        })
        .transpose()
}
