//! Token provider abstraction.

use std::fmt;

use async_trait::async_trait;

use crate::errors::AuthError;

/// A bearer token for the safety-check backend.
///
/// `Debug` redacts the secret so tokens cannot leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw token value for the wire.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Consume and return the raw token.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

/// Source of fresh bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fetch a token for one outbound request.
    ///
    /// Called once per send; implementations must return current state on
    /// every call. Fails with [`AuthError::NoSession`] when no credentials
    /// are available.
    async fn fetch_token(&self) -> Result<BearerToken, AuthError>;
}

/// Fixed-token provider for tests and development.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Provider that always yields `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn fetch_token(&self) -> Result<BearerToken, AuthError> {
        Ok(BearerToken::new(self.token.clone()))
    }
}

/// Reads the token from an environment variable on every call.
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    /// Provider reading `var` on every fetch.
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn fetch_token(&self) -> Result<BearerToken, AuthError> {
        std::env::var(&self.var)
            .ok()
            .filter(|v| !v.is_empty())
            .map(BearerToken::new)
            .ok_or(AuthError::NoSession)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_debug_is_redacted() {
        let token = BearerToken::new("super-secret");
        let debug = format!("{token:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("BearerToken"));
    }

    #[test]
    fn bearer_token_exposes_raw_value() {
        let token = BearerToken::new("tok-1");
        assert_eq!(token.expose(), "tok-1");
        assert_eq!(token.into_inner(), "tok-1");
    }

    #[tokio::test]
    async fn static_provider_yields_token() {
        let provider = StaticTokenProvider::new("tok-static");
        let token = provider.fetch_token().await.unwrap();
        assert_eq!(token.expose(), "tok-static");
    }

    #[tokio::test]
    async fn static_provider_yields_fresh_values_per_call() {
        let provider = StaticTokenProvider::new("tok-static");
        let first = provider.fetch_token().await.unwrap();
        let second = provider.fetch_token().await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn env_provider_missing_var_is_no_session() {
        let provider = EnvTokenProvider::new("FIELDCHECK_TEST_TOKEN_UNSET");
        let err = provider.fetch_token().await.unwrap_err();
        assert!(matches!(err, AuthError::NoSession));
    }
}
