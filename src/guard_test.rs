use super::*;
use crate::config::GateConfig;
use crate::http::{ApiClient, ApiError, ErrorEnvelope, ErrorKind};
use crate::navigation::{InMemoryRouter, Router};
use crate::session::Profile;
use crate::user_info::UserInfoResponse;
use mockito::{Matcher, Server};
use serde_json::{Value, json};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const AUTH: &str = "https://auth.test";

// =============================================================================
// MockFetcher
// =============================================================================

enum Reply {
    Body(Value),
    Fail(ErrorKind),
}

/// Scripted user-info fetcher that counts calls and records tokens.
struct MockFetcher {
    reply: Reply,
    calls: AtomicUsize,
    tokens: Mutex<Vec<String>>,
    /// Cleared mid-flight to simulate a concurrent logout.
    clear_during_fetch: Option<SessionStore>,
}

impl MockFetcher {
    fn new(reply: Reply) -> Self {
        Self { reply, calls: AtomicUsize::new(0), tokens: Mutex::new(Vec::new()), clear_during_fetch: None }
    }

    fn profile(data: Value) -> Self {
        Self::new(Reply::Body(json!({ "code": 0, "data": data })))
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl UserInfoFetcher for MockFetcher {
    async fn fetch_user_info(&self, token: &str) -> Result<UserInfoResponse, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());
        if let Some(session) = &self.clear_during_fetch {
            session.clear();
        }
        match &self.reply {
            Reply::Body(body) => Ok(serde_json::from_value(body.clone()).unwrap()),
            Reply::Fail(kind) => Err(ErrorEnvelope::new(*kind, None).into()),
        }
    }
}

fn guard_with(session: &SessionStore, fetcher: Arc<MockFetcher>) -> BootstrapGuard {
    BootstrapGuard::new(session.clone(), fetcher, AUTH)
}

fn request(url: &str) -> NavigationRequest {
    NavigationRequest::parse(url).unwrap()
}

fn signed_in(token: &str) -> SessionStore {
    let session = SessionStore::in_memory();
    session.set_credentials(Credentials::new(token, "r").unwrap());
    session.set_profile(token, Profile(json!({ "name": "Ann" })));
    session
}

// =============================================================================
// Classification
// =============================================================================

#[test]
fn classify_covers_all_four_states() {
    let empty = Session::default();
    let bare = request("https://app.test/books");
    let with_creds = request("https://app.test/books?token=abc&refreshToken=xyz");

    assert_eq!(GuardState::classify(&empty, &bare), GuardState::NoSessionNoCreds);
    assert_eq!(
        GuardState::classify(&empty, &with_creds),
        GuardState::NoSessionWithCreds(Credentials::new("abc", "xyz").unwrap())
    );

    let token_only = Session { token: "t".into(), refresh_token: "r".into(), user_info: None };
    assert_eq!(GuardState::classify(&token_only, &bare), GuardState::HasSessionNoProfile { token: "t".into() });

    let full = Session { user_info: Some(Profile(json!({}))), ..token_only };
    assert_eq!(GuardState::classify(&full, &bare), GuardState::HasSessionWithProfile);
}

#[test]
fn query_credentials_ignored_once_session_has_token() {
    let session = Session { token: "t".into(), refresh_token: "r".into(), user_info: None };
    let req = request("https://app.test/?token=other&refreshToken=x");
    assert_eq!(GuardState::classify(&session, &req), GuardState::HasSessionNoProfile { token: "t".into() });
}

#[test]
fn state_name_hides_token() {
    let state = GuardState::NoSessionWithCreds(Credentials::new("secret", "secret2").unwrap());
    assert!(!state.name().contains("secret"));
}

// =============================================================================
// Decisions
// =============================================================================

#[tokio::test]
async fn credentials_in_query_authenticate_and_proceed() {
    let session = SessionStore::in_memory();
    let fetcher = Arc::new(MockFetcher::profile(json!({ "name": "Ann" })));
    let guard = guard_with(&session, fetcher.clone());

    let decision = guard.check(&request("https://app.test/books?token=abc&refreshToken=xyz")).await;

    assert_eq!(decision, NavigationDecision::Proceed);
    let stored = session.snapshot();
    assert_eq!(stored.token, "abc");
    assert_eq!(stored.refresh_token, "xyz");
    assert_eq!(stored.user_info, Some(Profile(json!({ "name": "Ann" }))));
    assert_eq!(*fetcher.tokens.lock().unwrap(), vec!["abc".to_string()]);
}

#[tokio::test]
async fn empty_session_without_credentials_redirects_external() {
    let session = SessionStore::in_memory();
    let fetcher = Arc::new(MockFetcher::profile(json!({})));
    let guard = guard_with(&session, fetcher.clone());

    let decision = guard.check(&request("https://app.test/books")).await;

    assert_eq!(
        decision,
        NavigationDecision::RedirectExternal("https://auth.test/login?redirect=https%3A%2F%2Fapp.test%2Fbooks".into())
    );
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn half_credentials_count_as_none() {
    let session = SessionStore::in_memory();
    let fetcher = Arc::new(MockFetcher::profile(json!({})));
    let guard = guard_with(&session, fetcher.clone());

    let decision = guard.check(&request("https://app.test/?token=abc")).await;

    assert!(matches!(decision, NavigationDecision::RedirectExternal(_)));
    assert_eq!(fetcher.calls(), 0);
    assert!(session.token().is_none());
}

#[tokio::test]
async fn token_without_profile_exchanges_stored_token() {
    let session = SessionStore::in_memory();
    session.set_credentials(Credentials::new("stored", "r").unwrap());
    let fetcher = Arc::new(MockFetcher::profile(json!({ "name": "Bo" })));
    let guard = guard_with(&session, fetcher.clone());

    let decision = guard.check(&request("https://app.test/")).await;

    assert!(decision.is_proceed());
    assert!(session.snapshot().is_authenticated());
    assert_eq!(*fetcher.tokens.lock().unwrap(), vec!["stored".to_string()]);
}

#[tokio::test]
async fn authenticated_session_proceeds_without_network() {
    let session = signed_in("abc");
    let fetcher = Arc::new(MockFetcher::profile(json!({})));
    let guard = guard_with(&session, fetcher.clone());

    let req = request("https://app.test/courses/3/learn");
    assert!(guard.check(&req).await.is_proceed());
    assert!(guard.check(&req).await.is_proceed());
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn rejected_token_clears_session_and_redirects() {
    let session = SessionStore::in_memory();
    let fetcher = Arc::new(MockFetcher::new(Reply::Body(json!({ "code": 40101, "data": null }))));
    let guard = guard_with(&session, fetcher);

    let decision = guard.check(&request("https://app.test/?token=abc&refreshToken=xyz")).await;

    assert!(matches!(decision, NavigationDecision::RedirectExternal(_)));
    assert_eq!(session.snapshot(), Session::default());
}

#[tokio::test]
async fn success_code_without_data_redirects() {
    let session = SessionStore::in_memory();
    session.set_credentials(Credentials::new("abc", "r").unwrap());
    let fetcher = Arc::new(MockFetcher::new(Reply::Body(json!({ "code": 0 }))));
    let guard = guard_with(&session, fetcher);

    let decision = guard.check(&request("https://app.test/")).await;

    assert!(matches!(decision, NavigationDecision::RedirectExternal(_)));
    assert!(session.token().is_none());
}

#[tokio::test]
async fn every_fetch_failure_kind_redirects() {
    for kind in [ErrorKind::Network, ErrorKind::Timeout, ErrorKind::Auth, ErrorKind::Server] {
        let session = SessionStore::in_memory();
        session.set_credentials(Credentials::new("abc", "r").unwrap());
        let guard = guard_with(&session, Arc::new(MockFetcher::new(Reply::Fail(kind))));

        let decision = guard.check(&request("https://app.test/books")).await;

        assert!(matches!(decision, NavigationDecision::RedirectExternal(_)), "{kind}");
        assert!(session.token().is_none(), "{kind}");
    }
}

#[tokio::test]
async fn session_cleared_during_exchange_does_not_proceed() {
    let session = SessionStore::in_memory();
    let mut fetcher = MockFetcher::profile(json!({ "name": "Ann" }));
    fetcher.clear_during_fetch = Some(session.clone());
    let guard = guard_with(&session, Arc::new(fetcher));

    let decision = guard.check(&request("https://app.test/?token=abc&refreshToken=xyz")).await;

    assert!(matches!(decision, NavigationDecision::RedirectExternal(_)));
    assert!(session.snapshot().user_info.is_none());
}

#[tokio::test]
async fn redirect_carries_full_url_with_query() {
    let guard = guard_with(&SessionStore::in_memory(), Arc::new(MockFetcher::profile(json!({}))));
    let decision = guard.check(&request("https://app.test/books/2/courses?page=3")).await;
    assert_eq!(
        decision,
        NavigationDecision::RedirectExternal(
            "https://auth.test/login?redirect=https%3A%2F%2Fapp.test%2Fbooks%2F2%2Fcourses%3Fpage%3D3".into()
        )
    );
}

// =============================================================================
// Interplay with the pipeline
// =============================================================================

#[tokio::test]
async fn guard_redirects_external_after_unauthorized_call() {
    let mut server = Server::new_async().await;
    let _mock = server.mock("GET", "/book/getBookList").match_query(Matcher::Any).with_status(401).create_async().await;

    let session = signed_in("abc");
    let router = Arc::new(InMemoryRouter::new("/books"));
    let config = GateConfig::new(AUTH, server.url());
    let client = ApiClient::new(&config, session.clone(), Some(router.clone() as Arc<dyn Router>)).unwrap();
    let fetcher = Arc::new(MockFetcher::profile(json!({})));
    let guard = guard_with(&session, fetcher.clone());

    assert!(guard.check(&request("https://app.test/books")).await.is_proceed());

    let err = client.get("/book/getBookList", &[]).await.unwrap_err();
    assert_eq!(err.kind(), Some(ErrorKind::Auth));

    let decision = guard.check(&request("https://app.test/login?redirect=/books")).await;
    assert!(matches!(decision, NavigationDecision::RedirectExternal(_)));
    assert_eq!(fetcher.calls(), 0);
}
