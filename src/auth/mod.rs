//! Access-token provider seam for authorized metadata requests.
//!
//! Real token management (refresh, storage) belongs to the surrounding
//! application; the transfer subsystem only needs a current access token to
//! build `Authorization: Bearer` headers for resolution and existence
//! checks.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while obtaining an access token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No access token is available for the current session.
    #[error("no access token available")]
    Missing,
}

/// Supplies the current access token for authorized requests.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Returns the current access token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Missing`] when no token is available.
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Provider backed by a fixed token, handed in at construction.
///
/// Suits CLI invocations and tests; long-running hosts should implement
/// [`AuthProvider`] over their session manager instead.
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Creates a provider that always returns `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        if self.token.is_empty() {
            return Err(AuthError::Missing);
        }
        Ok(self.token.clone())
    }
}

/// Builds the auth headers for a request on behalf of `token`.
#[must_use]
pub fn bearer_headers(token: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Authorization".to_string(), format!("Bearer {token}"));
    headers
}
