//! Download orchestration: cache check, resolution, streaming transfer,
//! verification, and cleanup.
//!
//! All errors are absorbed at this boundary and converted to a boolean
//! outcome plus one diagnostic log entry; callers never see raw transport
//! errors. Cancellation is the one settled outcome that suppresses
//! user-facing notification - cleanup still runs.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::CacheStore;
use crate::notify::{Notification, NotificationScope, NotificationSink};
use crate::progress::ProgressRegistry;
use crate::resolver::UrlResolver;

use super::cancel::CancelToken;
use super::error::TransferError;
use super::executor::{TransferExecutor, TransferOutcome};
use super::{RemoteRef, TransferRequest};
use crate::verify::verify_transfer;

/// Heading used for download failure notifications.
const DOWNLOAD_ERROR_HEADING: &str = "Download failed";

/// Orchestrates attachment downloads end to end.
///
/// Concurrent requests for *different* identifiers run independently.
/// Concurrent requests for the *same* identifier are deduplicated: the
/// second caller joins the in-flight transfer and observes its outcome
/// instead of starting a duplicate (avoids redundant network use and
/// progress registry clobbering).
pub struct AttachmentManager {
    resolver: Arc<dyn UrlResolver>,
    executor: TransferExecutor,
    registry: Arc<ProgressRegistry>,
    cache: Arc<CacheStore>,
    notifier: Arc<dyn NotificationSink>,
    /// identifier → settled-outcome channel for in-flight downloads.
    inflight: DashMap<String, watch::Receiver<Option<bool>>>,
}

impl AttachmentManager {
    /// Creates a manager over the given collaborators.
    #[must_use]
    pub fn new(
        resolver: Arc<dyn UrlResolver>,
        executor: TransferExecutor,
        registry: Arc<ProgressRegistry>,
        cache: Arc<CacheStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            resolver,
            executor,
            registry,
            cache,
            notifier,
            inflight: DashMap::new(),
        }
    }

    /// Returns the shared progress registry, for observers.
    #[must_use]
    pub fn registry(&self) -> Arc<ProgressRegistry> {
        Arc::clone(&self.registry)
    }

    /// Returns the cache store backing this manager.
    #[must_use]
    pub fn cache(&self) -> Arc<CacheStore> {
        Arc::clone(&self.cache)
    }

    /// Downloads an attachment, creating a fresh cancellation token.
    ///
    /// Returns true when a verified local file is present afterwards
    /// (including the cache-hit short-circuit); false otherwise. A false
    /// return leaves no partial file and no progress entry behind, so the
    /// caller may retry.
    pub async fn download(&self, request: TransferRequest) -> bool {
        self.download_with_cancel(request, CancelToken::new()).await
    }

    /// Downloads an attachment with a caller-supplied cancellation token.
    ///
    /// The token is also reachable through the progress registry entry for
    /// the duration of the transfer, so any observer can cancel by
    /// identifier.
    #[instrument(skip(self, request, cancel), fields(identifier = %request.identifier))]
    pub async fn download_with_cancel(
        &self,
        request: TransferRequest,
        cancel: CancelToken,
    ) -> bool {
        let identifier = request.identifier.clone();

        // Dedup by identifier: join an in-flight download when one exists,
        // otherwise claim the slot atomically. The entry guard must not be
        // held across an await.
        let mut join_rx = None;
        let mut settle_tx = None;
        match self.inflight.entry(identifier.clone()) {
            Entry::Occupied(entry) => join_rx = Some(entry.get().clone()),
            Entry::Vacant(entry) => {
                let (tx, rx) = watch::channel(None);
                entry.insert(rx);
                settle_tx = Some(tx);
            }
        }

        if let Some(mut rx) = join_rx {
            debug!(identifier, "joining in-flight download");
            return match rx.wait_for(Option::is_some).await {
                Ok(settled) => (*settled).unwrap_or(false),
                // The owning task died without settling; report failure.
                Err(_) => false,
            };
        }

        let result = self.run(&request, &cancel).await;

        self.inflight.remove(&identifier);
        if let Some(tx) = settle_tx {
            // Joiners hold receiver clones; a send after removal still
            // reaches them.
            let _ = tx.send(Some(result));
        }
        result
    }

    /// The per-request state machine.
    async fn run(&self, request: &TransferRequest, cancel: &CancelToken) -> bool {
        let identifier = request.identifier.as_str();

        let Some(remote) = request.remote.as_ref() else {
            let error = TransferError::no_data(identifier);
            warn!(identifier, kind = error.kind(), "download failed: {error}");
            return false;
        };

        info!(identifier, "downloading attachment");

        if let Err(e) = self.cache.ensure_dirs().await {
            let error = TransferError::io_from_cache(e);
            self.cleanup(identifier).await;
            self.report_failure(identifier, remote, &error);
            return false;
        }

        if self.cache.exists(identifier).await {
            debug!(identifier, "file exists already");
            return true;
        }

        let signed = match self.resolver.resolve(identifier, remote).await {
            Ok(signed) => signed,
            Err(e) => {
                let error = TransferError::resolution(e);
                self.cleanup(identifier).await;
                self.report_failure(identifier, remote, &error);
                return false;
            }
        };

        // The progress entry goes live only once a transfer actually
        // starts; resolution failures never create one.
        let direction = request.direction;
        self.registry
            .begin(identifier, direction, 0, cancel.clone());
        info!(identifier, "transfer starting");

        let dest = self.cache.staging_path(identifier);
        let registry = Arc::clone(&self.registry);
        let progress_id = identifier.to_string();
        let on_progress = move |received: u64, total: u64| {
            registry.update(&progress_id, direction, received, total);
            debug!(identifier = %progress_id, received, total, "transfer progress");
        };

        let outcome = self
            .executor
            .execute(&signed.url, &dest, on_progress, cancel)
            .await;

        match outcome {
            TransferOutcome::Success { bytes, total, .. } => {
                let verification = verify_transfer(&dest, total).await;
                if !verification.ok {
                    let reason = verification
                        .reason
                        .unwrap_or_else(|| "integrity check failed".to_string());
                    let error = TransferError::verification(reason);
                    self.cleanup(identifier).await;
                    self.report_failure(identifier, remote, &error);
                    return false;
                }

                match self.cache.publish(identifier).await {
                    Ok(path) => {
                        self.registry.remove(identifier);
                        info!(identifier, bytes, path = %path.display(), "download complete");
                        true
                    }
                    Err(e) => {
                        let error = TransferError::io_from_cache(e);
                        self.cleanup(identifier).await;
                        self.report_failure(identifier, remote, &error);
                        false
                    }
                }
            }
            TransferOutcome::Cancelled => {
                self.cleanup(identifier).await;
                info!(identifier, "download cancelled");
                false
            }
            TransferOutcome::Failed(error) => {
                self.cleanup(identifier).await;
                self.report_failure(identifier, remote, &error);
                false
            }
        }
    }

    /// Best-effort teardown, safe on every exit path: clears the progress
    /// entry (idempotent) and discards any partial file (logged, never
    /// propagated).
    async fn cleanup(&self, identifier: &str) {
        self.registry.remove(identifier);
        self.cache.discard_partial(identifier).await;
    }

    /// Emits the single diagnostic log entry plus the global and local
    /// notifications for a genuine (non-cancelled) failure.
    fn report_failure(&self, identifier: &str, remote: &RemoteRef, failure: &TransferError) {
        // Header values may carry credentials; log names only.
        let header_names: Vec<&str> = remote.headers.keys().map(String::as_str).collect();
        error!(
            identifier,
            kind = failure.kind(),
            url = %remote.url,
            headers = ?header_names,
            "download failed: {failure}"
        );

        let notification = Notification::error(
            DOWNLOAD_ERROR_HEADING,
            failure.to_string(),
            NotificationScope::Global,
        );
        self.notifier.notify(&notification);
        self.notifier
            .notify(&notification.with_scope(NotificationScope::Local));
    }
}

impl TransferError {
    /// Maps a cache mutation failure into the transfer error taxonomy.
    fn io_from_cache(error: crate::cache::CacheError) -> Self {
        match error {
            crate::cache::CacheError::Io { path, source } => Self::io(path, source),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::progress::Direction;
    use crate::resolver::{ResolveError, SignedUrl};

    use super::*;

    /// Resolver that must never be reached.
    struct PanicResolver;

    #[async_trait]
    impl UrlResolver for PanicResolver {
        async fn resolve(
            &self,
            _identifier: &str,
            _remote: &RemoteRef,
        ) -> Result<SignedUrl, ResolveError> {
            panic!("resolver must not be called");
        }
    }

    /// Resolver that always rejects.
    struct RejectingResolver;

    #[async_trait]
    impl UrlResolver for RejectingResolver {
        async fn resolve(
            &self,
            identifier: &str,
            _remote: &RemoteRef,
        ) -> Result<SignedUrl, ResolveError> {
            Err(ResolveError::status(identifier, 404))
        }
    }

    #[derive(Default)]
    struct CollectingSink {
        received: Mutex<Vec<Notification>>,
    }

    impl CollectingSink {
        fn count(&self) -> usize {
            self.received.lock().unwrap().len()
        }
    }

    impl NotificationSink for CollectingSink {
        fn notify(&self, notification: &Notification) {
            self.received.lock().unwrap().push(notification.clone());
        }
    }

    struct Harness {
        manager: AttachmentManager,
        registry: Arc<ProgressRegistry>,
        sink: Arc<CollectingSink>,
        _dir: tempfile::TempDir,
    }

    fn harness(resolver: Arc<dyn UrlResolver>) -> Harness {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = Arc::new(ProgressRegistry::new());
        let sink = Arc::new(CollectingSink::default());
        let manager = AttachmentManager::new(
            resolver,
            TransferExecutor::new(),
            Arc::clone(&registry),
            Arc::new(CacheStore::new(dir.path())),
            Arc::clone(&sink) as Arc<dyn NotificationSink>,
        );
        Harness {
            manager,
            registry,
            sink,
            _dir: dir,
        }
    }

    fn request(identifier: &str, remote: Option<RemoteRef>) -> TransferRequest {
        TransferRequest {
            identifier: identifier.to_string(),
            remote,
            direction: Direction::Download,
        }
    }

    #[tokio::test]
    async fn test_no_remote_ref_fails_fast() {
        let h = harness(Arc::new(PanicResolver));

        let ok = h.manager.download(request("doc123", None)).await;

        assert!(!ok);
        assert!(h.registry.is_empty(), "no progress entry may be created");
        assert_eq!(h.sink.count(), 0, "NoData is logged, not notified");
    }

    #[tokio::test]
    async fn test_cache_hit_short_circuits_without_resolution() {
        let h = harness(Arc::new(PanicResolver));
        let cache = h.manager.cache();
        cache.ensure_dirs().await.unwrap();
        tokio::fs::write(cache.path_for("doc123"), b"cached")
            .await
            .unwrap();

        let ok = h
            .manager
            .download(request("doc123", Some(RemoteRef::new("http://unused"))))
            .await;

        assert!(ok, "cached identifier must succeed without network");
        assert!(h.registry.is_empty());
        assert_eq!(h.sink.count(), 0);
    }

    #[tokio::test]
    async fn test_resolution_failure_notifies_and_creates_no_progress() {
        let h = harness(Arc::new(RejectingResolver));

        let ok = h
            .manager
            .download(request("doc123", Some(RemoteRef::new("http://resolve.example"))))
            .await;

        assert!(!ok);
        assert!(h.registry.is_empty());
        // One global + one local notification.
        assert_eq!(h.sink.count(), 2);
        let notifications = h.sink.received.lock().unwrap();
        assert_eq!(notifications[0].scope, NotificationScope::Global);
        assert_eq!(notifications[1].scope, NotificationScope::Local);
        assert_eq!(notifications[0].heading, DOWNLOAD_ERROR_HEADING);
    }
}
