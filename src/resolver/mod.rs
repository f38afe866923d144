//! Signed-URL resolution for remote-stored attachments.
//!
//! Remote attachments are not fetched directly: the sync service first
//! exchanges an identifier plus auth headers for a short-lived signed URL
//! granting direct access to the stored object. This module provides the
//! [`UrlResolver`] trait seam and the production HTTP implementation.
//!
//! Resolution is a single round trip. No retry is performed here; retry
//! policy, if any, belongs to the caller.

mod error;
mod http;

pub use error::ResolveError;
pub use http::HttpUrlResolver;

use async_trait::async_trait;

use crate::transfer::RemoteRef;

/// A short-lived, pre-authorized URL granting direct access to a remote
/// object without per-request credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrl {
    /// The resolved downloadable URL.
    pub url: String,
}

impl SignedUrl {
    /// Creates a new signed URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Exchanges an attachment identifier and auth headers for a signed URL.
///
/// # Object Safety
///
/// Uses `async_trait` to support `Arc<dyn UrlResolver>` dispatch; the
/// orchestration only knows this seam, which keeps tests deterministic.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Resolves `identifier` via the remote reference carried on the
    /// request.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError`] when the remote responds with a non-success
    /// status, an empty body, or the round trip fails outright.
    async fn resolve(
        &self,
        identifier: &str,
        remote: &RemoteRef,
    ) -> Result<SignedUrl, ResolveError>;
}
