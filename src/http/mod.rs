//! HTTP — the resilient API client every feature calls through.
//!
//! DESIGN
//! ======
//! `ApiClient` owns one `reqwest::Client` with a fixed per-request timeout
//! and runs every call through the interceptor stages. Failed calls are
//! never resolved as successes and never retried here.
//!
//! A 401 additionally clears the session and, when a router is attached,
//! replaces the current route with the re-login route. Callers still receive
//! the rejection. Several in-flight calls may hit 401 together; each one
//! repeats the same clear + replace, which is harmless.

pub mod envelope;
pub mod error;
pub mod interceptor;

use std::sync::Arc;

use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::config::GateConfig;
use crate::navigation::{Router, internal_login_path};
use crate::session::SessionStore;
pub use envelope::ApiPayload;
pub use error::{ApiError, ErrorEnvelope, ErrorKind};

// =============================================================================
// REQUEST
// =============================================================================

/// One API call, relative to the client's base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self { method: Method::GET, path: path.into(), query: Vec::new(), body: None }
    }

    #[must_use]
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self { method: Method::POST, path: path.into(), query: Vec::new(), body: Some(body) }
    }

    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
    router: Option<Arc<dyn Router>>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .field("has_router", &self.router.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ApiError::ClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &GateConfig, session: SessionStore, router: Option<Arc<dyn Router>>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::ClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.api_base_url.trim_end_matches('/').to_string(), session, router })
    }

    /// Same client and session, but a 401 never drives the router.
    /// Used during bootstrap, where the guard decides where to go.
    #[must_use]
    pub fn without_router(&self) -> Self {
        Self { router: None, ..self.clone() }
    }

    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// `GET path?query`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiPayload, ApiError> {
        let request = query.iter().fold(ApiRequest::get(path), |req, (k, v)| req.query(*k, *v));
        self.send(request).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn post(&self, path: &str, body: Value) -> Result<ApiPayload, ApiError> {
        self.send(ApiRequest::post(path, body)).await
    }

    /// Run one request through the outbound and inbound stages.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Classified`] for every failure the pipeline can
    /// classify, [`ApiError::Transport`] for an unrecognized transport fault,
    /// and [`ApiError::InvalidUrl`] when the path does not form a URL.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiPayload, ApiError> {
        let request_id = Uuid::new_v4();
        let url = self.url_for(&request.path)?;

        let mut builder = self.http.request(request.method.clone(), url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        let builder = interceptor::attach_credentials(builder, &self.session);

        tracing::debug!(
            %request_id,
            method = %request.method,
            path = %request.path,
            authenticated = self.session.token().is_some(),
            "api request"
        );

        let response = builder.send().await.map_err(interceptor::on_fault)?;
        let status = response.status().as_u16();
        let content_type = match response.headers().get(CONTENT_TYPE).map(|value| value.to_str()) {
            Some(Ok(value)) => Some(value.to_owned()),
            _ => None,
        };

        if (200..300).contains(&status) {
            let body = response.bytes().await.map_err(interceptor::on_fault)?.to_vec();
            tracing::debug!(%request_id, status, bytes = body.len(), "api response");
            return interceptor::on_success(status, content_type.as_deref(), body).map_err(ApiError::Classified);
        }

        // The status decides the classification; a broken error body only
        // loses the server message.
        let body = match response.bytes().await {
            Ok(bytes) => bytes.to_vec(),
            Err(e) => {
                tracing::warn!(%request_id, status, error = %e, "error response body unreadable");
                Vec::new()
            }
        };
        tracing::debug!(%request_id, status, bytes = body.len(), "api response");

        let envelope = interceptor::on_error_status(status, &body);
        if envelope.kind == ErrorKind::Auth {
            self.force_relogin();
        }
        Err(ApiError::Classified(envelope))
    }

    fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        let raw = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };
        Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))
    }

    fn force_relogin(&self) {
        self.session.clear();
        match &self.router {
            Some(router) => {
                let target = internal_login_path(&router.current_path());
                tracing::warn!(%target, "unauthorized; session cleared, redirecting to login");
                router.replace(&target);
            }
            None => tracing::warn!("unauthorized; session cleared"),
        }
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
