//! # fieldcheck-auth
//!
//! Bearer token acquisition for the safety-check backend.
//!
//! The client fetches a fresh token for every outbound request, so
//! providers must be cheap to call repeatedly and must return current
//! state on every call rather than a cached snapshot.
//!
//! Providers:
//! - [`StaticTokenProvider`]: fixed token for tests and development
//! - [`EnvTokenProvider`]: reads an environment variable on every call
//! - [`FileTokenProvider`]: backed by `~/.fieldcheck/auth.json` with expiry
//!   checking and 0o600 file permissions

#![deny(unsafe_code)]

pub mod errors;
pub mod provider;
pub mod storage;

pub use errors::AuthError;
pub use provider::{BearerToken, EnvTokenProvider, StaticTokenProvider, TokenProvider};
pub use storage::{AuthState, FileTokenProvider, auth_file_path, load_auth_state, save_auth_state};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
