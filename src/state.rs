//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` wires one session store, one router, one API client, the
//! bootstrap guard, and the services together. Everything inside is `Arc`
//! or a cheap handle, so clones share the same session and router.
//!
//! `navigate` is the single entry point for route transitions: the route
//! table is consulted first (legacy redirects skip the guard), then the
//! guard decides. A `Proceed` moves the router to the new route.

use std::sync::Arc;

use serde::Serialize;

use crate::config::GateConfig;
use crate::error::ErrorCode;
use crate::guard::BootstrapGuard;
use crate::http::{ApiClient, ApiError};
use crate::navigation::{InMemoryRouter, NavigationDecision, NavigationRequest, Router};
use crate::routes::{self, Route, RouteMatch};
use crate::services::catalog::CatalogService;
use crate::session::{FilePersistence, SessionStore};
use crate::user_info::{HttpUserInfoFetcher, UserInfoFetcher};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid navigation url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl ErrorCode for StateError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUrl(_) => "E_NAV_URL",
            Self::Api(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::InvalidUrl(_) => false,
            Self::Api(e) => e.retryable(),
        }
    }
}

// =============================================================================
// NAVIGATION RESULT
// =============================================================================

/// One resolved navigation attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Navigation {
    pub url: String,
    /// `None` for legacy redirects and paths outside the route table.
    pub route: Option<Route>,
    pub decision: NavigationDecision,
}

// =============================================================================
// APP STATE
// =============================================================================

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GateConfig>,
    pub session: SessionStore,
    pub router: Arc<InMemoryRouter>,
    pub api: ApiClient,
    pub guard: Arc<BootstrapGuard>,
    pub catalog: CatalogService,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("session", &self.session)
            .field("current_path", &self.router.current_path())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build the state from configuration. The session is loaded from
    /// `session_file` when one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Api`] if the HTTP client cannot be built.
    pub fn from_config(config: GateConfig, initial_path: &str) -> Result<Self, StateError> {
        let session = match &config.session_file {
            Some(path) => SessionStore::open(Arc::new(FilePersistence::new(path))),
            None => SessionStore::in_memory(),
        };
        let router = Arc::new(InMemoryRouter::new(initial_path));
        let api = ApiClient::new(&config, session.clone(), Some(router.clone() as Arc<dyn Router>))?;
        let fetcher = Arc::new(HttpUserInfoFetcher::new(&api, config.user_info_path.clone()));
        Ok(Self::with_parts(config, session, router, api, fetcher))
    }

    /// Assemble from prebuilt parts, e.g. a scripted user-info fetcher.
    #[must_use]
    pub fn with_parts(
        config: GateConfig,
        session: SessionStore,
        router: Arc<InMemoryRouter>,
        api: ApiClient,
        fetcher: Arc<dyn UserInfoFetcher>,
    ) -> Self {
        let guard = Arc::new(BootstrapGuard::new(session.clone(), fetcher, config.auth_base_url.clone()));
        let catalog = CatalogService::new(api.clone());
        Self { config: Arc::new(config), session, router, api, guard, catalog }
    }

    /// Resolve `url` against the route table, then run the guard.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::InvalidUrl`] when `url` is not absolute.
    pub async fn navigate(&self, url: &str) -> Result<Navigation, StateError> {
        let request = NavigationRequest::parse(url)?;
        let (route, decision) = match routes::resolve(request.path()) {
            RouteMatch::Redirect(target) => {
                tracing::debug!(from = request.path(), %target, "legacy route redirect");
                (None, NavigationDecision::RedirectInternal(target))
            }
            RouteMatch::Page(route) => {
                let decision = self.guard.check(&request).await;
                (Some(route), decision)
            }
            RouteMatch::Unknown => (None, self.guard.check(&request).await),
        };

        if decision.is_proceed() {
            self.router.replace(&request.route_path());
        }
        Ok(Navigation { url: request.full_url().to_string(), route, decision })
    }

    /// `navigate`, following internal redirects until the guard has decided.
    /// Legacy routes redirect to table pages, so this settles after one hop.
    ///
    /// # Errors
    ///
    /// See [`AppState::navigate`].
    pub async fn navigate_following(&self, url: &str) -> Result<Navigation, StateError> {
        const MAX_HOPS: usize = 4;

        let mut navigation = self.navigate(url).await?;
        for _ in 0..MAX_HOPS {
            let NavigationDecision::RedirectInternal(target) = &navigation.decision else {
                break;
            };
            let next = NavigationRequest::parse(&navigation.url)?.join(target)?;
            navigation = self.navigate(next.full_url()).await?;
        }
        Ok(navigation)
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
