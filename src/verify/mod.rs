//! Post-transfer integrity verification and remote attachment pre-checks.
//!
//! A transfer that returned 2xx can still be truncated; nothing becomes
//! cache-visible until [`verify_transfer`] confirms the on-disk size
//! matches the advertised total. The [`AttachmentChecker`] covers the other
//! side: a metadata-only query that confirms a remote artifact is non-empty
//! before a real transfer is attempted. Both checks degrade optimistically
//! when the network is unreachable, avoiding false negatives offline.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::auth::{AuthError, AuthProvider};
use crate::probe::ReachabilityProbe;

/// Metadata query timeout. Size queries are tiny HEAD round trips.
const CHECK_TIMEOUT_SECS: u64 = 15;

/// Outcome of an integrity or existence check.
///
/// Reason strings are surfaced verbatim to the notification sink for
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    /// Whether the check passed.
    pub ok: bool,
    /// Failure reason when `ok` is false.
    pub reason: Option<String>,
}

impl VerificationResult {
    /// A passing result.
    #[must_use]
    pub fn passed() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    /// A failing result with a reason.
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

/// Errors that can occur during remote metadata queries.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// No token could be obtained for the authorized query.
    #[error("size query needs authorization: {source}")]
    Token {
        /// The underlying auth error.
        #[source]
        source: AuthError,
    },

    /// The metadata round trip failed.
    #[error("network error querying size at {url}: {source}")]
    Network {
        /// The metadata URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },
}

/// Verifies a completed transfer against the advertised total.
///
/// When `expected_total` is 0 the server never advertised a length; the
/// only thing left to guard against is a zero-byte artifact.
pub async fn verify_transfer(path: &Path, expected_total: u64) -> VerificationResult {
    let actual = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) => return VerificationResult::failed(format!("downloaded file missing: {e}")),
    };

    if expected_total == 0 {
        if actual == 0 {
            return VerificationResult::failed("File length is 0.");
        }
        return VerificationResult::passed();
    }

    if actual == expected_total {
        VerificationResult::passed()
    } else {
        VerificationResult::failed(format!(
            "expected {expected_total} bytes, got {actual}"
        ))
    }
}

/// Remote attachment pre-check: confirms an artifact exists and is
/// non-empty before a transfer is attempted.
pub struct AttachmentChecker {
    client: Client,
    api_host: String,
    auth: Arc<dyn AuthProvider>,
    probe: Arc<dyn ReachabilityProbe>,
}

impl AttachmentChecker {
    /// Creates a checker against `api_host`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(
        api_host: impl Into<String>,
        auth: Arc<dyn AuthProvider>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CHECK_TIMEOUT_SECS))
            .timeout(Duration::from_secs(CHECK_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            api_host: api_host.into(),
            auth,
            probe,
        }
    }

    /// Queries the stored size of `identifier` via a metadata-only HEAD
    /// request.
    ///
    /// A response without a parseable Content-Length reports 0, which the
    /// caller treats as "artifact missing or empty".
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Token`] when no access token is available and
    /// [`VerifyError::Network`] when the round trip fails.
    #[instrument(skip(self), fields(identifier = %identifier))]
    pub async fn remote_size(&self, identifier: &str) -> Result<u64, VerifyError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|source| VerifyError::Token { source })?;

        let url = format!(
            "{}/s3?name={identifier}",
            self.api_host.trim_end_matches('/')
        );
        let response = self
            .client
            .head(&url)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|source| VerifyError::Network {
                url: url.clone(),
                source,
            })?;

        let size = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);
        debug!(identifier, size, "remote size queried");
        Ok(size)
    }

    /// Checks that the remote artifact for `identifier` is present and
    /// non-empty.
    ///
    /// Optimistic by design: an unreachable network or a failed size query
    /// yields a passing result rather than a network-dependent false
    /// negative. Only a confirmed zero-length artifact fails.
    pub async fn check(&self, identifier: &str) -> VerificationResult {
        if !self.probe.is_reachable().await {
            debug!(identifier, "network unreachable, assuming attachment ok");
            return VerificationResult::passed();
        }

        match self.remote_size(identifier).await {
            Err(error) => {
                debug!(identifier, error = %error, "size query failed, assuming attachment ok");
                VerificationResult::passed()
            }
            Ok(0) => VerificationResult::failed("File length is 0."),
            Ok(_) => VerificationResult::passed(),
        }
    }
}
