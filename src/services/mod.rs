//! Application services issued through the API pipeline.
//!
//! ARCHITECTURE
//! ============
//! Services know endpoint paths and parameter names; the pipeline owns
//! credentials, classification, and forced re-login.

pub mod catalog;
