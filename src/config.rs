// src/config.rs

use std::{env, fmt, net::SocketAddr};

use serde::Serialize;

/// Runtime configuration, read once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Session token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    /// Ceiling for a whole request body. Must stay above the per-field limit.
    pub max_body_bytes: usize,

    /// Signup gate. Ignored while the user table is empty.
    pub allow_signups: bool,
    pub base_url: String,
    pub platform_title: String,
    pub single_blog_auto_redirect: bool,

    /// Optional operator account created at startup on an empty store.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

/// Fields of the configuration that the front end is allowed to see.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub allow_signups: bool,
    pub base_url: String,
    pub platform_title: String,
    pub first_blog_auto_redirect: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "{} has an invalid value: {:?}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("AUTH_SECRET")
            .or_else(|| lookup("JWT_SECRET"))
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("AUTH_SECRET"))?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr.parse::<SocketAddr>().map_err(|_| ConfigError::Invalid {
            key: "BIND_ADDR",
            value: bind_addr.clone(),
        })?;

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://blogdeck.db".to_string()),
            jwt_secret,
            jwt_expiration: parse_number(&lookup, "JWT_EXPIRATION", 7 * 24 * 60 * 60)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            bind_addr,
            max_body_bytes: parse_number(&lookup, "MAX_BODY_BYTES", 48 * 1024 * 1024)?,
            allow_signups: parse_flag(&lookup, "ALLOW_SIGNUPS")?,
            base_url: lookup("BASE_URL").unwrap_or_else(|| "http://localhost:3000".to_string()),
            platform_title: lookup("PLATFORM_TITLE").unwrap_or_else(|| "Blogdeck".to_string()),
            single_blog_auto_redirect: parse_flag(&lookup, "ENABLE_SINGLE_BLOG_AUTO_REDIRECT")?,
            admin_email: lookup("ADMIN_EMAIL").filter(|s| !s.is_empty()),
            admin_password: lookup("ADMIN_PASSWORD").filter(|s| !s.is_empty()),
        })
    }

    pub fn public(&self) -> PublicConfig {
        PublicConfig {
            allow_signups: self.allow_signups,
            base_url: self.base_url.clone(),
            platform_title: self.platform_title.clone(),
            first_blog_auto_redirect: self.single_blog_auto_redirect,
        }
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(false),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" | "off" => Ok(false),
            "1" | "true" | "yes" | "on" => Ok(true),
            _ => Err(ConfigError::Invalid { key, value }),
        },
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
