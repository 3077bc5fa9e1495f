//! Gate configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

use crate::session::retry::{Backoff, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS, RetryPolicy};

pub const DEFAULT_PING_PATH: &str = "/pingauth";
pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 10_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for ProbeTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub base_url: String,
    pub ping_path: String,
    pub login_path: String,
    pub policy: RetryPolicy,
    /// Raw `Cookie` header value sent with every probe.
    pub session_cookie: Option<String>,
    pub timeouts: ProbeTimeouts,
}

impl GateConfig {
    /// Config with defaults for everything but the server address.
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            ping_path: DEFAULT_PING_PATH.to_owned(),
            login_path: DEFAULT_LOGIN_PATH.to_owned(),
            policy: RetryPolicy::default(),
            session_cookie: None,
            timeouts: ProbeTimeouts::default(),
        }
    }

    /// Build typed gate config from environment variables.
    ///
    /// Required:
    /// - `AUTHGATE_BASE_URL`
    ///
    /// Optional:
    /// - `AUTHGATE_PING_PATH`: default `/pingauth`
    /// - `AUTHGATE_LOGIN_PATH`: default `/login`
    /// - `AUTHGATE_MAX_RETRIES`: default 10
    /// - `AUTHGATE_RETRY_DELAY_MS`: default 1000
    /// - `AUTHGATE_BACKOFF`: `fixed` (default) or `exponential`
    /// - `AUTHGATE_RETRY_MAX_DELAY_MS`: exponential cap, default 10000
    /// - `AUTHGATE_SESSION_COOKIE`
    /// - `AUTHGATE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `AUTHGATE_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is missing or a value fails to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("AUTHGATE_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTHGATE_BASE_URL"))?;
        let mut config = Self::new(base_url.trim());

        if let Some(path) = lookup("AUTHGATE_PING_PATH") {
            config = config.with_ping_path(&path);
        }
        if let Some(path) = lookup("AUTHGATE_LOGIN_PATH") {
            config = config.with_login_path(&path);
        }

        let max_attempts = parse_or(&lookup, "AUTHGATE_MAX_RETRIES", DEFAULT_MAX_ATTEMPTS)?;
        let delay_ms = parse_or(&lookup, "AUTHGATE_RETRY_DELAY_MS", DEFAULT_RETRY_DELAY_MS)?;
        let max_delay_ms = parse_or(&lookup, "AUTHGATE_RETRY_MAX_DELAY_MS", DEFAULT_RETRY_MAX_DELAY_MS)?;
        let backoff = parse_backoff(lookup("AUTHGATE_BACKOFF").as_deref(), delay_ms, max_delay_ms)?;
        config.policy = RetryPolicy { max_attempts, backoff };

        config.session_cookie = lookup("AUTHGATE_SESSION_COOKIE").filter(|v| !v.is_empty());
        config.timeouts = ProbeTimeouts {
            request_secs: parse_or(&lookup, "AUTHGATE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            connect_secs: parse_or(&lookup, "AUTHGATE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?,
        };

        Ok(config)
    }

    /// Session-check path; a missing leading `/` is added.
    #[must_use]
    pub fn with_ping_path(mut self, path: &str) -> Self {
        self.ping_path = normalize_path(path);
        self
    }

    /// Redirect target for unauthorized mounts; a missing leading `/` is added.
    #[must_use]
    pub fn with_login_path(mut self, path: &str) -> Self {
        self.login_path = normalize_path(path);
        self
    }

    /// Full URL of the session-check endpoint.
    #[must_use]
    pub fn ping_url(&self) -> String {
        format!("{}{}", self.base_url, self.ping_path)
    }
}

fn normalize_path(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with('/') { trimmed.to_owned() } else { format!("/{trimmed}") }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

fn parse_backoff(raw: Option<&str>, delay_ms: u64, max_delay_ms: u64) -> Result<Backoff, ConfigError> {
    let base = Duration::from_millis(delay_ms);
    match raw.map(str::trim).unwrap_or("fixed") {
        "fixed" => Ok(Backoff::Fixed(base)),
        "exponential" => Ok(Backoff::Exponential { base, max: Duration::from_millis(max_delay_ms) }),
        other => Err(ConfigError::Invalid { var: "AUTHGATE_BACKOFF", value: other.to_owned() }),
    }
}
