//! Point-in-time network reachability checks.
//!
//! When the probe reports unreachable, existence and verification checks
//! short-circuit to an optimistic "assume OK" result instead of failing,
//! avoiding false negatives while offline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Probe request timeout. Reachability checks must answer quickly; a slow
/// answer is treated the same as no answer.
const PROBE_TIMEOUT_SECS: u64 = 5;

/// Point-in-time connectivity check.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Returns true if the network is believed reachable right now.
    async fn is_reachable(&self) -> bool;
}

/// HTTP-based reachability probe.
///
/// Issues a HEAD request against a well-known endpoint; any HTTP response
/// (including an error status) proves the network path is up.
#[derive(Debug, Clone)]
pub struct HttpReachabilityProbe {
    client: Client,
    endpoint: String,
}

impl HttpReachabilityProbe {
    /// Creates a probe against the given endpoint.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .timeout(Duration::from_secs(PROBE_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ReachabilityProbe for HttpReachabilityProbe {
    async fn is_reachable(&self) -> bool {
        match self.client.head(&self.endpoint).send().await {
            Ok(_) => true,
            Err(error) => {
                debug!(endpoint = %self.endpoint, error = %error, "reachability probe failed");
                false
            }
        }
    }
}

/// Probe that always reports reachable.
///
/// For deployments without a probe endpoint and for tests that want the
/// network-dependent path exercised.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeReachable;

#[async_trait]
impl ReachabilityProbe for AssumeReachable {
    async fn is_reachable(&self) -> bool {
        true
    }
}
