//! Request/response interceptor stages.
//!
//! ARCHITECTURE
//! ============
//! Three pure stages, composed by `ApiClient::send`:
//!
//! - outbound: attach `Authorization: Bearer <token>` when a token exists.
//! - inbound success (2xx): binary bodies pass through; structured bodies are
//!   classified by their `status` discriminator.
//! - inbound failure: a transport fault or a non-2xx status becomes an
//!   `ErrorEnvelope`. Precedence is network, then timeout, then status.
//!
//! The 401 side effect (clear session, re-login redirect) is not a stage: it
//! needs the session and router, so it lives on the client.

use reqwest::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use super::envelope::{ApiPayload, ResponseEnvelope, is_binary_content_type, server_message};
use super::error::{ApiError, ErrorEnvelope, ErrorKind};
use crate::session::SessionStore;

// =============================================================================
// OUTBOUND
// =============================================================================

/// Attach the session token as a bearer credential, if there is one.
#[must_use]
pub fn attach_credentials(builder: RequestBuilder, session: &SessionStore) -> RequestBuilder {
    match session.token() {
        Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

// =============================================================================
// INBOUND SUCCESS
// =============================================================================

/// Classify a 2xx response body.
///
/// # Errors
///
/// Returns a `business` envelope for `status: "fail"` and an `http` envelope
/// for `status: "error"`.
pub fn on_success(status: u16, content_type: Option<&str>, body: Vec<u8>) -> Result<ApiPayload, ErrorEnvelope> {
    if let Some(content_type) = content_type.filter(|ct| is_binary_content_type(ct)) {
        return Ok(ApiPayload::Binary { content_type: content_type.to_string(), bytes: body });
    }

    let value = match serde_json::from_slice::<Value>(&body) {
        Ok(value) => value,
        Err(_) => return Ok(ApiPayload::Text(String::from_utf8_lossy(&body).into_owned())),
    };

    match ResponseEnvelope::from_body(value) {
        ResponseEnvelope::Success(body) => {
            if let Some(msg) = body.get("msg").and_then(Value::as_str).filter(|msg| *msg != "success") {
                let message = server_message(&body).unwrap_or_else(|| msg.to_string());
                tracing::info!(%message, "api reported success");
            }
            Ok(ApiPayload::Json(body))
        }
        ResponseEnvelope::Business { code, message, raw } => {
            tracing::warn!(code = ?code, message = ?message, "business error");
            Err(ErrorEnvelope::new(ErrorKind::Business, None).with_code(code).with_message(message).with_raw(raw))
        }
        ResponseEnvelope::AppError { code, message, raw } => {
            tracing::error!(status, code = ?code, message = ?message, "api reported error");
            Err(ErrorEnvelope::new(ErrorKind::Http, Some(status))
                .with_code(code)
                .with_message(message)
                .with_raw(raw))
        }
        ResponseEnvelope::Unrecognized(body) => {
            // Legacy endpoints answer without a `status`; kept lenient.
            tracing::debug!("response without recognized status passed through");
            Ok(ApiPayload::Json(body))
        }
    }
}

// =============================================================================
// INBOUND FAILURE
// =============================================================================

/// Classify a response that arrived with a non-2xx status.
#[must_use]
pub fn on_error_status(status: u16, body: &[u8]) -> ErrorEnvelope {
    let raw = serde_json::from_slice::<Value>(body).unwrap_or(Value::Null);
    let kind = ErrorKind::for_status(status);
    tracing::error!(status, %kind, "request failed");
    ErrorEnvelope::new(kind, Some(status))
        .with_code(raw.get("code").cloned())
        .with_message(server_message(&raw))
        .with_raw(raw)
}

/// Kind for a fault that produced no response. Connectivity wins over the
/// deadline when both apply.
#[must_use]
pub fn fault_kind(is_connect: bool, is_timeout: bool) -> Option<ErrorKind> {
    if is_connect {
        Some(ErrorKind::Network)
    } else if is_timeout {
        Some(ErrorKind::Timeout)
    } else {
        None
    }
}

/// Classify a transport fault, or hand it back raw when unrecognized.
#[must_use]
pub fn on_fault(err: reqwest::Error) -> ApiError {
    match fault_kind(err.is_connect(), err.is_timeout()) {
        Some(kind) => {
            tracing::error!(%kind, error = %err, "request fault");
            ApiError::Classified(ErrorEnvelope::new(kind, None))
        }
        None => {
            tracing::error!(error = %err, "unclassified request fault");
            ApiError::Transport(err)
        }
    }
}

#[cfg(test)]
#[path = "interceptor_test.rs"]
mod tests;
