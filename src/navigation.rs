//! Navigation primitives shared by the bootstrap guard and the HTTP pipeline.
//!
//! SYSTEM CONTEXT
//! ==============
//! Neither the guard nor the pipeline navigates by itself. The guard returns
//! a `NavigationDecision` for the caller to carry out; the pipeline, which
//! has no caller to return a decision to, asks a `Router` to replace the
//! current in-app route when a request comes back 401.

use std::sync::{Mutex, PoisonError};

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Serialize;
use url::Url;

use crate::session::Credentials;

pub const LOGIN_ROUTE: &str = "/login";
pub const TOKEN_PARAM: &str = "token";
pub const REFRESH_TOKEN_PARAM: &str = "refreshToken";
/// Older identity-provider deployments send the refresh token snake-cased.
pub const LEGACY_REFRESH_TOKEN_PARAM: &str = "refresh_token";
pub const REDIRECT_PARAM: &str = "redirect";

/// Characters left alone by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// In-app paths keep their slashes readable inside the `redirect` value.
const ROUTE_QUERY_VALUE: &AsciiSet = &URI_COMPONENT.remove(b'/');

// =============================================================================
// DECISION
// =============================================================================

/// Outcome of a guarded navigation. Exactly one is produced per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "camelCase")]
pub enum NavigationDecision {
    /// Let the navigation complete.
    Proceed,
    /// Leave the application for the identity provider. Never retried
    /// automatically; a human has to sign in again.
    RedirectExternal(String),
    /// Navigate to another in-app route instead.
    RedirectInternal(String),
}

impl NavigationDecision {
    #[must_use]
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// The full URL of a navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRequest {
    url: Url,
}

impl NavigationRequest {
    #[must_use]
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// # Errors
    ///
    /// Returns the parse error when `raw` is not an absolute URL.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(Url::parse(raw)?))
    }

    #[must_use]
    pub fn full_url(&self) -> &str {
        self.url.as_str()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Path plus query and fragment, as the in-app router sees it.
    #[must_use]
    pub fn full_path(&self) -> String {
        path_of(&self.url)
    }

    /// `full_path` with the credential parameters removed. This is what the
    /// router records, so tokens never end up in a later `redirect` value.
    #[must_use]
    pub fn route_path(&self) -> String {
        let kept: Vec<(String, String)> = self
            .url
            .query_pairs()
            .filter(|(key, _)| !is_credential_param(key))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        if kept.len() == self.url.query_pairs().count() {
            return self.full_path();
        }
        let mut url = self.url.clone();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(&kept);
        }
        path_of(&url)
    }

    /// Resolve an in-app target (e.g. an internal redirect) against this URL.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `target` does not form a URL.
    pub fn join(&self, target: &str) -> Result<Self, url::ParseError> {
        Ok(Self::new(self.url.join(target)?))
    }

    /// `token` + `refreshToken` (or `refresh_token`) query parameters, when
    /// both are present and non-empty.
    #[must_use]
    pub fn query_credentials(&self) -> Option<Credentials> {
        let mut token = None;
        let mut refresh_token = None;
        for (key, value) in self.url.query_pairs() {
            match key.as_ref() {
                TOKEN_PARAM => token = Some(value.into_owned()),
                REFRESH_TOKEN_PARAM => refresh_token = Some(value.into_owned()),
                LEGACY_REFRESH_TOKEN_PARAM if refresh_token.is_none() => refresh_token = Some(value.into_owned()),
                _ => {}
            }
        }
        Credentials::new(token?, refresh_token?)
    }
}

fn path_of(url: &Url) -> String {
    let mut full = url.path().to_string();
    if let Some(query) = url.query() {
        full.push('?');
        full.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        full.push('#');
        full.push_str(fragment);
    }
    full
}

fn is_credential_param(key: &str) -> bool {
    matches!(key, TOKEN_PARAM | REFRESH_TOKEN_PARAM | LEGACY_REFRESH_TOKEN_PARAM)
}

// =============================================================================
// LOGIN TARGETS
// =============================================================================

/// `<auth_base_url>/login?redirect=<encoded current URL>`.
#[must_use]
pub fn external_login_url(auth_base_url: &str, current_url: &str) -> String {
    format!(
        "{}{LOGIN_ROUTE}?{REDIRECT_PARAM}={}",
        auth_base_url.trim_end_matches('/'),
        utf8_percent_encode(current_url, URI_COMPONENT)
    )
}

/// `/login?redirect=<current path>` for the in-app re-login route.
///
/// When the router already sits on the login route the current path is
/// returned unchanged, so repeated requests target the same place instead of
/// nesting redirects.
#[must_use]
pub fn internal_login_path(current_path: &str) -> String {
    let route = current_path.split(['?', '#']).next().unwrap_or_default();
    if route == LOGIN_ROUTE {
        return current_path.to_string();
    }
    format!("{LOGIN_ROUTE}?{REDIRECT_PARAM}={}", utf8_percent_encode(current_path, ROUTE_QUERY_VALUE))
}

// =============================================================================
// ROUTER
// =============================================================================

/// In-app router the pipeline drives on terminal auth failures.
pub trait Router: Send + Sync {
    /// Full path (with query) of the route currently displayed.
    fn current_path(&self) -> String;

    /// Replace the current route. Must tolerate repeated calls.
    fn replace(&self, target: &str);
}

/// Router that only records where it was sent. Backs the CLI and tests.
#[derive(Debug)]
pub struct InMemoryRouter {
    current: Mutex<String>,
    history: Mutex<Vec<String>>,
}

impl InMemoryRouter {
    #[must_use]
    pub fn new(initial_path: impl Into<String>) -> Self {
        Self { current: Mutex::new(initial_path.into()), history: Mutex::new(Vec::new()) }
    }

    /// Every `replace` target, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl Router for InMemoryRouter {
    fn current_path(&self) -> String {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn replace(&self, target: &str) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = target.to_string();
        self.history.lock().unwrap_or_else(PoisonError::into_inner).push(target.to_string());
    }
}

#[cfg(test)]
#[path = "navigation_test.rs"]
mod tests;
