//! Session bootstrap and resilient API access for the course catalog app.
//!
//! ARCHITECTURE
//! ============
//! - `session`: the shared session record and its persistence
//! - `guard`: decides every navigation (proceed or redirect)
//! - `http`: the API client and its interceptor stages
//! - `user_info`: the token-for-profile exchange the guard relies on
//! - `routes`, `navigation`: route table and navigation primitives
//! - `services`: typed catalog calls issued through the client
//! - `state`: wires the above together for the binary

pub mod config;
pub mod error;
pub mod guard;
pub mod http;
pub mod navigation;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
pub mod user_info;

pub use config::{ConfigError, GateConfig};
pub use error::ErrorCode;
pub use guard::BootstrapGuard;
pub use http::{ApiClient, ApiError, ApiPayload, ErrorEnvelope, ErrorKind};
pub use navigation::{NavigationDecision, NavigationRequest, Router};
pub use session::{Credentials, Profile, Session, SessionStore};
pub use state::{AppState, Navigation, StateError};
