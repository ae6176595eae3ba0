//! Gate configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::ErrorCode;

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_USER_INFO_PATH: &str = "/login/api/get-user-info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: String },
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("invalid URL in {var}: {value}")]
    InvalidUrl { var: String, value: String },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Missing { .. } => "E_CONFIG_MISSING",
            Self::Parse(_) => "E_CONFIG_PARSE",
            Self::InvalidUrl { .. } => "E_CONFIG_URL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Identity provider origin, without a trailing slash.
    pub auth_base_url: String,
    /// Base URL every API path is joined onto, without a trailing slash.
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub user_info_path: String,
    /// Where the session is persisted. `None` keeps it in memory only.
    pub session_file: Option<PathBuf>,
}

impl GateConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `AUTHGATE_AUTH_BASE_URL`
    /// - `AUTHGATE_API_BASE_URL`
    ///
    /// Optional:
    /// - `AUTHGATE_REQUEST_TIMEOUT_MS`: default 5000
    /// - `AUTHGATE_USER_INFO_PATH`: default `/login/api/get-user-info`
    /// - `AUTHGATE_SESSION_FILE`: in-memory session when absent
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when a required variable is missing, a URL
    /// does not parse, or the timeout is not a number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth_base_url = required_url("AUTHGATE_AUTH_BASE_URL")?;
        let api_base_url = required_url("AUTHGATE_API_BASE_URL")?;

        let request_timeout = match std::env::var("AUTHGATE_REQUEST_TIMEOUT_MS") {
            Ok(raw) => Duration::from_millis(parse_timeout_ms(&raw)?),
            Err(_) => Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
        };

        let user_info_path =
            std::env::var("AUTHGATE_USER_INFO_PATH").unwrap_or_else(|_| DEFAULT_USER_INFO_PATH.to_string());

        let session_file = match std::env::var("AUTHGATE_SESSION_FILE") {
            Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path)),
            _ => None,
        };

        Ok(Self { auth_base_url, api_base_url, request_timeout, user_info_path, session_file })
    }

    /// Config with defaults for everything but the two base URLs.
    #[must_use]
    pub fn new(auth_base_url: impl Into<String>, api_base_url: impl Into<String>) -> Self {
        Self {
            auth_base_url: trim_base(&auth_base_url.into()),
            api_base_url: trim_base(&api_base_url.into()),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            user_info_path: DEFAULT_USER_INFO_PATH.to_string(),
            session_file: None,
        }
    }
}

fn required_url(var: &str) -> Result<String, ConfigError> {
    let value = std::env::var(var).map_err(|_| ConfigError::Missing { var: var.into() })?;
    let trimmed = trim_base(&value);
    if Url::parse(&trimmed).is_err() {
        return Err(ConfigError::InvalidUrl { var: var.into(), value });
    }
    Ok(trimmed)
}

fn trim_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn parse_timeout_ms(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Parse("AUTHGATE_REQUEST_TIMEOUT_MS must be positive".into())),
        Ok(ms) => Ok(ms),
        Err(e) => Err(ConfigError::Parse(format!("AUTHGATE_REQUEST_TIMEOUT_MS: {e}"))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
