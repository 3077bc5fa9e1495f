//! Single session-check round trip.
//!
//! DESIGN
//! ======
//! HTTP-level outcomes are data: 200, 401 and every other status come back
//! as a `ProbeOutcome`. Only transport failures (connect, timeout, body read)
//! surface as `ProbeError`, and the retry loop folds those into
//! `TransientFailure::Transport`. Classification is a pure function so the
//! status/payload table is testable without a server.

#[cfg(test)]
#[path = "probe_test.rs"]
mod probe_test;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::COOKIE;

use super::Identity;
use crate::config::{GateConfig, ProbeTimeouts};

/// Result of one probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// 200 with a well-formed identity payload.
    Authenticated(Identity),
    /// 401. Definitive, never retried.
    Unauthenticated,
    /// Anything the server did not definitively answer.
    Transient(TransientFailure),
}

/// Why an attempt could not produce a definitive answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransientFailure {
    /// Non-200/401 HTTP status.
    #[error("unexpected status {0}")]
    Status(u16),
    /// 200 whose body is not an identity payload.
    #[error("malformed identity payload: {0}")]
    Payload(String),
    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl TransientFailure {
    /// Stable code for logs and telemetry.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Status(_) => "E_PROBE_STATUS",
            Self::Payload(_) => "E_PROBE_PAYLOAD",
            Self::Transport(_) => "E_PROBE_TRANSPORT",
        }
    }
}

/// Transport-level probe failures.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Connection, TLS or body-read failure.
    #[error("session check request failed: {0}")]
    Transport(String),
    /// The request exceeded the configured timeout.
    #[error("session check timed out")]
    Timeout,
    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { Self::Timeout } else { Self::Transport(err.to_string()) }
    }
}

/// One authentication check against a fixed endpoint. No retry logic.
#[async_trait]
pub trait SessionProbe: Send + Sync {
    /// Perform one round trip.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` only when no HTTP response was obtained.
    async fn probe(&self) -> Result<ProbeOutcome, ProbeError>;
}

// =============================================================================
// HTTP PROBE
// =============================================================================

/// `GET <base_url><ping_path>` with an optional session cookie.
pub struct HttpSessionProbe {
    http: reqwest::Client,
    url: String,
    session_cookie: Option<String>,
}

impl HttpSessionProbe {
    /// Build a probe for `url` (already joined).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(url: impl Into<String>, session_cookie: Option<String>, timeouts: ProbeTimeouts) -> Result<Self, ProbeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| ProbeError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, url: url.into(), session_cookie })
    }

    /// Build a probe from typed gate config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &GateConfig) -> Result<Self, ProbeError> {
        Self::new(config.ping_url(), config.session_cookie.clone(), config.timeouts)
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SessionProbe for HttpSessionProbe {
    async fn probe(&self) -> Result<ProbeOutcome, ProbeError> {
        let mut request = self.http.get(&self.url);
        if let Some(cookie) = &self.session_cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Ok(classify(status, ""));
        }

        let body = response.text().await?;
        Ok(classify(status, &body))
    }
}

// =============================================================================
// CLASSIFICATION
// =============================================================================

#[derive(serde::Deserialize)]
struct PingPayload {
    email: String,
}

/// Map a status and body to a probe outcome. The body is only read for 200.
pub(crate) fn classify(status: u16, body: &str) -> ProbeOutcome {
    match status {
        200 => match serde_json::from_str::<PingPayload>(body) {
            Ok(payload) => ProbeOutcome::Authenticated(Identity::new(payload.email)),
            Err(e) => ProbeOutcome::Transient(TransientFailure::Payload(e.to_string())),
        },
        401 => ProbeOutcome::Unauthenticated,
        other => ProbeOutcome::Transient(TransientFailure::Status(other)),
    }
}
