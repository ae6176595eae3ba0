//! User-info fetcher — exchanges a token for the user's profile.
//!
//! Stateless: one GET per call. The guard depends on the `UserInfoFetcher`
//! trait so tests can swap in a scripted fake.

use std::num::FpCategory;

use serde::Deserialize;
use serde_json::Value;

use crate::http::{ApiClient, ApiError};
use crate::navigation::TOKEN_PARAM;
use crate::session::Profile;

/// `{ code, data }` answer of the user-info endpoint. `code == 0` is success.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserInfoResponse {
    #[serde(default)]
    pub code: Value,
    #[serde(default)]
    pub data: Option<Value>,
}

impl UserInfoResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        // Integral and float zero both count (`0`, `0.0`).
        self.code.as_f64().is_some_and(|code| code.classify() == FpCategory::Zero)
    }

    /// The profile of a successful answer. A success without data carries
    /// no identity and yields `None`.
    #[must_use]
    pub fn into_profile(self) -> Option<Profile> {
        if !self.is_success() {
            return None;
        }
        self.data.filter(|data| !data.is_null()).map(Profile)
    }
}

#[async_trait::async_trait]
pub trait UserInfoFetcher: Send + Sync {
    /// Look up the profile behind `token`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] when the call itself fails. A rejected token
    /// may also come back as a non-zero `code` instead.
    async fn fetch_user_info(&self, token: &str) -> Result<UserInfoResponse, ApiError>;
}

/// Calls the user-info endpoint through the API pipeline.
#[derive(Debug, Clone)]
pub struct HttpUserInfoFetcher {
    client: ApiClient,
    path: String,
}

impl HttpUserInfoFetcher {
    /// The fetcher runs during bootstrap, so its client never drives the
    /// re-login route; the guard decides where a failure leads.
    #[must_use]
    pub fn new(client: &ApiClient, path: impl Into<String>) -> Self {
        Self { client: client.without_router(), path: path.into() }
    }
}

#[async_trait::async_trait]
impl UserInfoFetcher for HttpUserInfoFetcher {
    async fn fetch_user_info(&self, token: &str) -> Result<UserInfoResponse, ApiError> {
        self.client.get(&self.path, &[(TOKEN_PARAM, token)]).await?.decode()
    }
}

#[cfg(test)]
#[path = "user_info_test.rs"]
mod tests;
