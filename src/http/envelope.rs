//! Response envelope contract.
//!
//! Non-binary API responses carry `{ status, code, message | msg, data }`.
//! `ResponseEnvelope` turns the `status` discriminator into a variant so the
//! success stage matches exhaustively instead of probing fields.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;

const STATUS_SUCCESS: &str = "success";
const STATUS_FAIL: &str = "fail";
const STATUS_ERROR: &str = "error";

/// A structured body classified by its `status` field.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    /// `status: "success"`.
    Success(Value),
    /// `status: "fail"`: the application rejected the operation.
    Business { code: Option<Value>, message: Option<String>, raw: Value },
    /// `status: "error"`: the application reported an HTTP-level error.
    AppError { code: Option<Value>, message: Option<String>, raw: Value },
    /// No or an unknown `status`. Passed through unchanged.
    Unrecognized(Value),
}

impl ResponseEnvelope {
    #[must_use]
    pub fn from_body(body: Value) -> Self {
        let status = body.get("status").and_then(Value::as_str).map(str::to_owned);
        match status.as_deref() {
            Some(STATUS_SUCCESS) => Self::Success(body),
            Some(STATUS_FAIL) => Self::Business {
                code: body.get("code").cloned(),
                message: server_message(&body),
                raw: body,
            },
            Some(STATUS_ERROR) => Self::AppError {
                code: body.get("code").cloned(),
                message: server_message(&body),
                raw: body,
            },
            _ => Self::Unrecognized(body),
        }
    }
}

/// `message`, falling back to `msg`. Empty strings count as absent.
#[must_use]
pub fn server_message(body: &Value) -> Option<String> {
    ["message", "msg"]
        .iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .map(str::to_owned)
}

/// `application/octet-stream` and `image/*` bodies skip status inspection.
#[must_use]
pub fn is_binary_content_type(content_type: &str) -> bool {
    let lower = content_type.to_ascii_lowercase();
    lower.contains("application/octet-stream") || lower.contains("image/")
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// What a successful call resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiPayload {
    Json(Value),
    Text(String),
    Binary { content_type: String, bytes: Vec<u8> },
}

impl ApiPayload {
    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Decode a JSON payload into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] for non-JSON payloads or a shape mismatch.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            Self::Json(value) => serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string())),
            Self::Text(_) => Err(ApiError::Decode("expected JSON payload, got text".into())),
            Self::Binary { content_type, .. } => {
                Err(ApiError::Decode(format!("expected JSON payload, got {content_type}")))
            }
        }
    }
}

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;
