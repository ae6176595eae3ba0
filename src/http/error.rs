//! Error taxonomy for failed API calls.
//!
//! DESIGN
//! ======
//! `ErrorKind` is closed: every classified failure maps to exactly one kind.
//! `ErrorEnvelope` is what callers inspect; `ApiError` adds the cases the
//! pipeline cannot classify (a raw transport fault, a bad URL, an undecodable
//! payload) so they are never disguised as one of the kinds.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorCode;

// =============================================================================
// KIND
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Body reported `status: "fail"`.
    Business,
    /// Body reported `status: "error"`, or an unmatched error status.
    Http,
    /// The server could not be reached.
    Network,
    /// The per-request budget ran out.
    Timeout,
    /// 401.
    Auth,
    /// 403.
    Permission,
    /// 404.
    NotFound,
    /// 429.
    TooManyRequests,
    /// 5xx.
    Server,
}

impl ErrorKind {
    /// Kind for a response that arrived with a non-2xx status.
    #[must_use]
    pub fn for_status(status: u16) -> Self {
        match status {
            401 => Self::Auth,
            403 => Self::Permission,
            404 => Self::NotFound,
            429 => Self::TooManyRequests,
            500.. => Self::Server,
            _ => Self::Http,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Http => "http",
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::NotFound => "notFound",
            Self::TooManyRequests => "tooManyRequests",
            Self::Server => "server",
        }
    }

    /// Message used when the server supplied none.
    #[must_use]
    pub fn default_message(self, status: Option<u16>) -> String {
        match (self, status) {
            (Self::Business, _) => "business operation failed".into(),
            (Self::Http, Some(status)) => format!("request failed ({status})"),
            (Self::Http, None) => "request failed".into(),
            (Self::Network, _) => "network connection error".into(),
            (Self::Timeout, _) => "request timed out".into(),
            (Self::Auth, _) => "unauthorized".into(),
            (Self::Permission, _) => "permission denied".into(),
            (Self::NotFound, _) => "resource not found".into(),
            (Self::TooManyRequests, _) => "too many requests".into(),
            (Self::Server, _) => "internal server error".into(),
        }
    }

    #[must_use]
    pub fn error_code(self) -> &'static str {
        match self {
            Self::Business => "E_BUSINESS",
            Self::Http => "E_HTTP",
            Self::Network => "E_NETWORK",
            Self::Timeout => "E_TIMEOUT",
            Self::Auth => "E_AUTH",
            Self::Permission => "E_PERMISSION",
            Self::NotFound => "E_NOT_FOUND",
            Self::TooManyRequests => "E_TOO_MANY_REQUESTS",
            Self::Server => "E_SERVER",
        }
    }

    #[must_use]
    pub fn retryable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::TooManyRequests | Self::Server)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENVELOPE
// =============================================================================

/// Normalized description of one failed call. Consumed once by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub kind: ErrorKind,
    #[serde(rename = "status", skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    pub message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub raw: Value,
}

impl ErrorEnvelope {
    /// Envelope with the kind's default message and no payload.
    #[must_use]
    pub fn new(kind: ErrorKind, http_status: Option<u16>) -> Self {
        Self { kind, http_status, code: None, message: kind.default_message(http_status), raw: Value::Null }
    }

    /// Prefer a server-supplied message over the default.
    #[must_use]
    pub fn with_message(mut self, message: Option<String>) -> Self {
        if let Some(message) = message {
            self.message = message;
        }
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: Option<Value>) -> Self {
        self.code = code;
        self
    }

    #[must_use]
    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = raw;
        self
    }
}

// =============================================================================
// API ERROR
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A failure the pipeline classified.
    #[error("{}: {}", .0.kind, .0.message)]
    Classified(ErrorEnvelope),

    /// A transport fault with no response and no recognized cause.
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("response decode failed: {0}")]
    Decode(String),

    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),
}

impl ApiError {
    #[must_use]
    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            Self::Classified(envelope) => Some(envelope),
            _ => None,
        }
    }

    /// Kind of a classified failure; `None` for unclassified ones.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        self.envelope().map(|envelope| envelope.kind)
    }
}

impl From<ErrorEnvelope> for ApiError {
    fn from(envelope: ErrorEnvelope) -> Self {
        Self::Classified(envelope)
    }
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Classified(envelope) => envelope.kind.error_code(),
            Self::Transport(_) => "E_TRANSPORT",
            Self::InvalidUrl(_) => "E_INVALID_URL",
            Self::Decode(_) => "E_DECODE",
            Self::ClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Classified(envelope) => envelope.kind.retryable(),
            Self::Transport(_) => true,
            Self::InvalidUrl(_) | Self::Decode(_) | Self::ClientBuild(_) => false,
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
