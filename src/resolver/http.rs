//! HTTP implementation of the signed-URL resolver.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument};

use crate::transfer::RemoteRef;

use super::{ResolveError, SignedUrl, UrlResolver};

/// Resolution round-trip timeout. Resolution is a small metadata exchange;
/// it should never take as long as the transfer itself.
const RESOLVE_TIMEOUT_SECS: u64 = 30;

/// Production resolver: GET against the remote reference carried on the
/// request, auth headers attached, body interpreted as the signed URL.
#[derive(Debug, Clone)]
pub struct HttpUrlResolver {
    client: Client,
}

impl HttpUrlResolver {
    /// Creates a resolver with default timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(RESOLVE_TIMEOUT_SECS))
            .timeout(Duration::from_secs(RESOLVE_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Creates a resolver over an existing client, sharing its connection
    /// pool.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpUrlResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlResolver for HttpUrlResolver {
    #[instrument(skip(self, remote), fields(identifier = %identifier))]
    async fn resolve(
        &self,
        identifier: &str,
        remote: &RemoteRef,
    ) -> Result<SignedUrl, ResolveError> {
        let mut request = self.client.get(&remote.url);
        for (name, value) in &remote.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ResolveError::network(identifier, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::status(identifier, status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::network(identifier, e))?;
        let url = body.trim();
        if url.is_empty() {
            return Err(ResolveError::empty_body(identifier));
        }

        debug!(identifier, "download url resolved");
        Ok(SignedUrl::new(url))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn remote_ref(url: String) -> RemoteRef {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), "Bearer tok-123".to_string());
        RemoteRef { url, headers }
    }

    #[tokio::test]
    async fn test_resolve_returns_body_as_signed_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/attachments/doc123/url"))
            .and(header("Authorization", "Bearer tok-123"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("https://cdn.example.com/blob?sig=abc"),
            )
            .mount(&server)
            .await;

        let resolver = HttpUrlResolver::new();
        let remote = remote_ref(format!("{}/attachments/doc123/url", server.uri()));
        let signed = resolver.resolve("doc123", &remote).await.unwrap();
        assert_eq!(signed.url, "https://cdn.example.com/blob?sig=abc");
    }

    #[tokio::test]
    async fn test_resolve_trims_whitespace_around_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("  https://cdn.example.com/x \n"))
            .mount(&server)
            .await;

        let resolver = HttpUrlResolver::new();
        let remote = remote_ref(server.uri());
        let signed = resolver.resolve("doc123", &remote).await.unwrap();
        assert_eq!(signed.url, "https://cdn.example.com/x");
    }

    #[tokio::test]
    async fn test_resolve_non_success_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resolver = HttpUrlResolver::new();
        let remote = remote_ref(server.uri());
        let error = resolver.resolve("doc123", &remote).await.unwrap_err();
        assert!(matches!(error, ResolveError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_resolve_empty_body_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("   "))
            .mount(&server)
            .await;

        let resolver = HttpUrlResolver::new();
        let remote = remote_ref(server.uri());
        let error = resolver.resolve("doc123", &remote).await.unwrap_err();
        assert!(matches!(error, ResolveError::EmptyBody { .. }));
    }

    #[tokio::test]
    async fn test_resolve_connection_refused_is_network_error() {
        let resolver = HttpUrlResolver::new();
        let remote = remote_ref("http://127.0.0.1:1/resolve".to_string());
        let error = resolver.resolve("doc123", &remote).await.unwrap_err();
        assert!(matches!(error, ResolveError::Network { .. }));
    }
}
