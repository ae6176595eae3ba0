//! Shared error contract.
//!
//! Every error enum in the crate carries a grepable code and a retryable hint
//! so the CLI and embedding applications can report failures uniformly. The
//! hint is advisory: nothing in this crate retries on its own.

/// Classifies an error with a stable code and a retryable hint.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}
