//! Terminal error taxonomy for a logical safety-check request.

use thiserror::Error;

use fieldcheck_auth::AuthError;

use crate::connection::ConnectionError;

/// Why a safety-check request failed.
///
/// Every variant is terminal for the current logical request only and is
/// reported exactly once through the pending handle; connection-level
/// failures are retried by the connection manager before surfacing here.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The channel could not be established or used.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// No fresh token was available for the request.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The outbound request could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// No terminal message arrived within the completion deadline.
    #[error("Error in performing safety check")]
    Timeout,

    /// The server signalled completion without any content.
    #[error("No response received from safety check")]
    EmptyResponse,

    /// The server reported a failure.
    #[error("{0}")]
    Server(String),

    /// The pending request was cancelled before completion.
    #[error("safety check cancelled")]
    Cancelled,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
