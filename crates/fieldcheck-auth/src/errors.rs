//! Auth error types.

/// Errors that can occur while obtaining a bearer token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credentials are available for the active user.
    #[error("no active session")]
    NoSession,

    /// Stored credentials exist but have expired.
    #[error("session token expired at {0}")]
    Expired(String),

    /// File I/O error while accessing stored credentials.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Credential state could not be serialized or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
