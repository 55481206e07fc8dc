//! Credential storage file I/O.
//!
//! Reads and writes `~/.fieldcheck/auth.json` with secure file permissions
//! (0o600).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::AuthError;
use crate::provider::{BearerToken, TokenProvider};

/// Default auth file name.
const AUTH_FILE_NAME: &str = "auth.json";

/// Current storage schema version.
const STORAGE_VERSION: u32 = 1;

/// Resolve the default auth file path (`~/.fieldcheck/auth.json`).
pub fn auth_file_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".fieldcheck").join(AUTH_FILE_NAME)
}

/// Persisted credential state.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    /// Storage schema version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Identity token presented as the bearer credential.
    pub id_token: Option<String>,
    /// RFC 3339 expiry of the identity token.
    pub expires_at: Option<String>,
    /// RFC 3339 timestamp of the last write.
    #[serde(default)]
    pub last_updated: String,
}

fn default_version() -> u32 {
    STORAGE_VERSION
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            version: STORAGE_VERSION,
            id_token: None,
            expires_at: None,
            last_updated: String::new(),
        }
    }
}

/// Load credential state from file.
///
/// Returns `None` if the file doesn't exist, is invalid, or carries an
/// unsupported schema version.
pub fn load_auth_state(path: &Path) -> Option<AuthState> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("failed to read auth file: {e}");
            return None;
        }
    };

    match serde_json::from_str::<AuthState>(&data) {
        Ok(state) if state.version == STORAGE_VERSION => Some(state),
        Ok(state) => {
            tracing::warn!("unsupported auth storage version: {}", state.version);
            None
        }
        Err(e) => {
            tracing::warn!("failed to parse auth file: {e}");
            None
        }
    }
}

/// Save credential state to file.
///
/// Creates parent directories if needed. Sets file permissions to 0o600.
pub fn save_auth_state(path: &Path, state: &mut AuthState) -> Result<(), AuthError> {
    state.last_updated = chrono::Utc::now().to_rfc3339();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, &json)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        let _ = std::fs::set_permissions(path, perms);
    }

    Ok(())
}

/// Provider backed by the credential storage file.
///
/// Reloads the file on every fetch so external refreshes are picked up
/// without restarting the client.
pub struct FileTokenProvider {
    path: PathBuf,
}

impl FileTokenProvider {
    /// Provider reading from the given auth file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Provider reading from the default auth file path.
    #[must_use]
    pub fn default_path() -> Self {
        Self::new(auth_file_path())
    }
}

#[async_trait]
impl TokenProvider for FileTokenProvider {
    async fn fetch_token(&self) -> Result<BearerToken, AuthError> {
        let state = load_auth_state(&self.path).ok_or(AuthError::NoSession)?;
        let token = state
            .id_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoSession)?;

        if let Some(expires_at) = &state.expires_at {
            if let Ok(expiry) = chrono::DateTime::parse_from_rfc3339(expires_at) {
                if expiry.with_timezone(&chrono::Utc) <= chrono::Utc::now() {
                    return Err(AuthError::Expired(expires_at.clone()));
                }
            }
        }

        Ok(BearerToken::new(token))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
