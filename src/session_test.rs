use super::*;
use std::sync::Mutex;

fn creds(token: &str, refresh: &str) -> Credentials {
    Credentials::new(token, refresh).unwrap()
}

fn profile(name: &str) -> Profile {
    Profile(serde_json::json!({ "name": name }))
}

/// Persistence fake that records every save and can be told to fail.
#[derive(Default)]
struct RecordingPersistence {
    stored: Mutex<Option<Session>>,
    saves: Mutex<Vec<Session>>,
    fail_saves: bool,
}

impl SessionPersistence for RecordingPersistence {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.stored.lock().unwrap().clone())
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        if self.fail_saves {
            return Err(SessionError::Io(std::io::Error::other("disk full")));
        }
        self.saves.lock().unwrap().push(session.clone());
        *self.stored.lock().unwrap() = Some(session.clone());
        Ok(())
    }
}

// =============================================================================
// Credentials / Session
// =============================================================================

#[test]
fn credentials_require_both_halves() {
    assert!(Credentials::new("abc", "xyz").is_some());
    assert!(Credentials::new("", "xyz").is_none());
    assert!(Credentials::new("abc", "").is_none());
}

#[test]
fn default_session_is_empty() {
    let session = Session::default();
    assert!(!session.has_token());
    assert!(!session.is_authenticated());
    assert!(session.user_info.is_none());
}

#[test]
fn normalized_drops_orphaned_profile() {
    let orphan = Session { token: String::new(), refresh_token: "r".into(), user_info: Some(profile("Ann")) };
    assert_eq!(orphan.normalized(), Session::default());
}

#[test]
fn normalized_keeps_valid_session() {
    let session = Session { token: "t".into(), refresh_token: "r".into(), user_info: Some(profile("Ann")) };
    assert_eq!(session.clone().normalized(), session);
}

#[test]
fn session_serializes_camel_case() {
    let session = Session { token: "abc".into(), refresh_token: "xyz".into(), user_info: Some(profile("Ann")) };
    let json = serde_json::to_value(&session).unwrap();
    assert_eq!(json, serde_json::json!({ "token": "abc", "refreshToken": "xyz", "userInfo": { "name": "Ann" } }));
}

#[test]
fn session_deserializes_missing_fields_as_empty() {
    let session: Session = serde_json::from_str("{}").unwrap();
    assert_eq!(session, Session::default());
}

// =============================================================================
// SessionStore transitions
// =============================================================================

#[test]
fn set_credentials_then_profile_authenticates() {
    let store = SessionStore::in_memory();
    store.set_credentials(creds("abc", "xyz"));
    assert_eq!(store.token().as_deref(), Some("abc"));
    assert!(!store.snapshot().is_authenticated());

    assert!(store.set_profile("abc", profile("Ann")));
    let session = store.snapshot();
    assert_eq!(session.token, "abc");
    assert_eq!(session.refresh_token, "xyz");
    assert_eq!(session.user_info, Some(profile("Ann")));
}

#[test]
fn set_profile_without_token_is_rejected() {
    let store = SessionStore::in_memory();
    assert!(!store.set_profile("abc", profile("Ann")));
    assert_eq!(store.snapshot(), Session::default());
}

#[test]
fn set_profile_for_replaced_token_is_rejected() {
    let store = SessionStore::in_memory();
    store.set_credentials(creds("old", "r1"));
    store.set_credentials(creds("new", "r2"));
    assert!(!store.set_profile("old", profile("Ann")));
    assert!(store.snapshot().user_info.is_none());
}

#[test]
fn new_credentials_drop_stale_profile() {
    let store = SessionStore::in_memory();
    store.set_credentials(creds("old", "r1"));
    store.set_profile("old", profile("Ann"));

    store.set_credentials(creds("new", "r2"));
    let session = store.snapshot();
    assert_eq!(session.token, "new");
    assert!(session.user_info.is_none());
}

#[test]
fn clear_wipes_everything() {
    let store = SessionStore::in_memory();
    store.set_credentials(creds("abc", "xyz"));
    store.set_profile("abc", profile("Ann"));
    store.clear();
    assert_eq!(store.snapshot(), Session::default());
    assert!(store.token().is_none());
}

#[test]
fn clones_share_the_same_record() {
    let store = SessionStore::in_memory();
    let other = store.clone();
    store.set_credentials(creds("abc", "xyz"));
    assert_eq!(other.token().as_deref(), Some("abc"));
}

#[test]
fn concurrent_writers_never_leave_partial_records() {
    let store = SessionStore::in_memory();
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    store.set_credentials(creds(&format!("t{i}"), &format!("r{i}")));
                    let session = store.snapshot();
                    let suffix = session.token.trim_start_matches('t');
                    assert_eq!(session.refresh_token, format!("r{suffix}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn open_loads_persisted_session() {
    let backend = Arc::new(RecordingPersistence::default());
    *backend.stored.lock().unwrap() =
        Some(Session { token: "abc".into(), refresh_token: "xyz".into(), user_info: Some(profile("Ann")) });

    let store = SessionStore::open(backend);
    assert!(store.snapshot().is_authenticated());
}

#[test]
fn open_normalizes_orphaned_profile() {
    let backend = Arc::new(RecordingPersistence::default());
    *backend.stored.lock().unwrap() =
        Some(Session { token: String::new(), refresh_token: String::new(), user_info: Some(profile("Ann")) });

    let store = SessionStore::open(backend);
    assert_eq!(store.snapshot(), Session::default());
}

#[test]
fn every_transition_is_written_through() {
    let backend = Arc::new(RecordingPersistence::default());
    let store = SessionStore::open(backend.clone());

    store.set_credentials(creds("abc", "xyz"));
    store.set_profile("abc", profile("Ann"));
    store.clear();

    let saves = backend.saves.lock().unwrap();
    assert_eq!(saves.len(), 3);
    assert_eq!(saves[0].token, "abc");
    assert!(saves[0].user_info.is_none());
    assert!(saves[1].is_authenticated());
    assert_eq!(saves[2], Session::default());
}

#[test]
fn failed_save_keeps_in_memory_state() {
    let backend = Arc::new(RecordingPersistence { fail_saves: true, ..Default::default() });
    let store = SessionStore::open(backend);
    store.set_credentials(creds("abc", "xyz"));
    assert_eq!(store.token().as_deref(), Some("abc"));
}

#[test]
fn file_persistence_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.json");

    let store = SessionStore::open(Arc::new(FilePersistence::new(&path)));
    store.set_credentials(creds("abc", "xyz"));
    store.set_profile("abc", profile("Ann"));

    let reopened = SessionStore::open(Arc::new(FilePersistence::new(&path)));
    let session = reopened.snapshot();
    assert_eq!(session.token, "abc");
    assert_eq!(session.user_info, Some(profile("Ann")));
}

#[test]
fn file_persistence_matches_memory_after_concurrent_writers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let store = SessionStore::open(Arc::new(FilePersistence::new(&path)));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..20 {
                    store.set_credentials(creds(&format!("t{i}"), &format!("r{i}")));
                    store.set_profile(&format!("t{i}"), profile("Ann"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let on_disk = FilePersistence::new(&path).load().unwrap().unwrap();
    assert_eq!(on_disk, store.snapshot());
}

#[test]
fn file_persistence_missing_file_loads_none() {
    let dir = tempfile::tempdir().unwrap();
    let backend = FilePersistence::new(dir.path().join("absent.json"));
    assert!(backend.load().unwrap().is_none());
}

#[test]
fn file_persistence_corrupt_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, b"not json").unwrap();

    let backend = FilePersistence::new(&path);
    let err = backend.load().unwrap_err();
    assert_eq!(err.error_code(), "E_SESSION_FORMAT");

    let store = SessionStore::open(Arc::new(backend));
    assert_eq!(store.snapshot(), Session::default());
}
