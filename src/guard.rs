//! Bootstrap guard — decides, before every route transition, whether the
//! visitor may proceed or must authenticate first.
//!
//! DESIGN
//! ======
//! Each navigation is classified into one of four states from the session
//! snapshot and the request's query parameters:
//!
//! - no token, no query credentials: leave for the identity provider
//! - no token, query credentials: store them, then exchange the token
//! - token, no profile: exchange the stored token
//! - token and profile: proceed with no network call
//!
//! An exchange either attaches the profile and proceeds, or clears the
//! session and leaves for the identity provider. `check` always returns a
//! decision; every failure path ends in a redirect.

use std::sync::Arc;

use crate::navigation::{NavigationDecision, NavigationRequest, external_login_url};
use crate::session::{Credentials, Session, SessionStore};
use crate::user_info::UserInfoFetcher;

// =============================================================================
// STATE
// =============================================================================

/// Where a navigation stands before the guard acts on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    NoSessionNoCreds,
    NoSessionWithCreds(Credentials),
    HasSessionNoProfile { token: String },
    HasSessionWithProfile,
}

impl GuardState {
    /// Query credentials only count while the session holds no token.
    #[must_use]
    pub fn classify(session: &Session, request: &NavigationRequest) -> Self {
        if session.has_token() {
            if session.user_info.is_some() {
                return Self::HasSessionWithProfile;
            }
            return Self::HasSessionNoProfile { token: session.token.clone() };
        }
        match request.query_credentials() {
            Some(credentials) => Self::NoSessionWithCreds(credentials),
            None => Self::NoSessionNoCreds,
        }
    }

    /// Log-safe name; never includes token material.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoSessionNoCreds => "no_session_no_creds",
            Self::NoSessionWithCreds(_) => "no_session_with_creds",
            Self::HasSessionNoProfile { .. } => "has_session_no_profile",
            Self::HasSessionWithProfile => "has_session_with_profile",
        }
    }
}

// =============================================================================
// GUARD
// =============================================================================

pub struct BootstrapGuard {
    session: SessionStore,
    fetcher: Arc<dyn UserInfoFetcher>,
    auth_base_url: String,
}

impl std::fmt::Debug for BootstrapGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapGuard")
            .field("session", &self.session)
            .field("auth_base_url", &self.auth_base_url)
            .finish_non_exhaustive()
    }
}

impl BootstrapGuard {
    #[must_use]
    pub fn new(session: SessionStore, fetcher: Arc<dyn UserInfoFetcher>, auth_base_url: impl Into<String>) -> Self {
        Self { session, fetcher, auth_base_url: auth_base_url.into() }
    }

    /// Decide the fate of one navigation attempt.
    pub async fn check(&self, request: &NavigationRequest) -> NavigationDecision {
        let state = GuardState::classify(&self.session.snapshot(), request);
        tracing::debug!(state = state.name(), path = request.path(), "bootstrap guard");

        match state {
            GuardState::NoSessionNoCreds => self.leave_for_login(request, "no session and no credentials"),
            GuardState::NoSessionWithCreds(credentials) => {
                let token = credentials.token.clone();
                self.session.set_credentials(credentials);
                self.exchange(&token, request).await
            }
            GuardState::HasSessionNoProfile { token } => self.exchange(&token, request).await,
            GuardState::HasSessionWithProfile => NavigationDecision::Proceed,
        }
    }

    /// Trade `token` for a profile. At most one fetch per call.
    async fn exchange(&self, token: &str, request: &NavigationRequest) -> NavigationDecision {
        let response = match self.fetcher.fetch_user_info(token).await {
            Ok(response) => response,
            Err(e) => {
                self.session.clear();
                return self.leave_for_login(request, &format!("user-info fetch failed: {e}"));
            }
        };

        let Some(profile) = response.into_profile() else {
            self.session.clear();
            return self.leave_for_login(request, "identity provider rejected the token");
        };

        if !self.session.set_profile(token, profile) {
            return self.leave_for_login(request, "session changed during the exchange");
        }
        tracing::info!(path = request.path(), "session authenticated");
        NavigationDecision::Proceed
    }

    fn leave_for_login(&self, request: &NavigationRequest, cause: &str) -> NavigationDecision {
        let target = external_login_url(&self.auth_base_url, request.full_url());
        tracing::warn!(%cause, %target, "redirecting to identity provider");
        NavigationDecision::RedirectExternal(target)
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
