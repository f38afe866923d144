//! Attachment transfer pipeline: requests, cancellation, the streaming
//! executor, and the download orchestration.
//!
//! # Overview
//!
//! [`AttachmentManager::download`] drives one request through the full
//! state machine: cache check → signed-URL resolution → streaming transfer
//! (with progress pushed into the shared registry) → integrity
//! verification → cache publish. Every outcome — success, failure, or
//! cancellation — clears the progress entry and leaves no partial file
//! behind.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use attachments_core::{
//!     AttachmentManager, CacheStore, HttpUrlResolver, ProgressRegistry, RemoteRef,
//!     TracingNotificationSink, TransferExecutor, TransferRequest,
//! };
//!
//! # async fn example() {
//! let manager = AttachmentManager::new(
//!     Arc::new(HttpUrlResolver::new()),
//!     TransferExecutor::new(),
//!     Arc::new(ProgressRegistry::new()),
//!     Arc::new(CacheStore::new("./attachment-cache")),
//!     Arc::new(TracingNotificationSink::new()),
//! );
//!
//! let remote = RemoteRef::new("https://sync.example.com/attachments/doc123/url");
//! let ok = manager
//!     .download(TransferRequest::download("doc123", Some(remote)))
//!     .await;
//! println!("usable local file: {ok}");
//! # }
//! ```

mod cancel;
mod error;
mod executor;
mod manager;

pub use cancel::CancelToken;
pub use error::TransferError;
pub use executor::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS, TransferExecutor, TransferOutcome};
pub use manager::AttachmentManager;

use std::collections::HashMap;

use crate::progress::Direction;

/// Location and credentials for a remote-stored attachment's resolution
/// endpoint.
#[derive(Debug, Clone)]
pub struct RemoteRef {
    /// Resolution endpoint URL.
    pub url: String,
    /// Auth headers to present (e.g. `Authorization: Bearer <token>`).
    pub headers: HashMap<String, String>,
}

impl RemoteRef {
    /// Creates a remote reference with no headers.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    /// Creates a remote reference with auth headers.
    #[must_use]
    pub fn with_headers(url: impl Into<String>, headers: HashMap<String, String>) -> Self {
        Self {
            url: url.into(),
            headers,
        }
    }
}

/// One transfer request. Immutable once created.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    /// Stable key naming the remote attachment.
    pub identifier: String,
    /// Where to resolve it from; `None` fails fast with no network call.
    pub remote: Option<RemoteRef>,
    /// Which way the bytes move.
    pub direction: Direction,
}

impl TransferRequest {
    /// Creates a download request.
    #[must_use]
    pub fn download(identifier: impl Into<String>, remote: Option<RemoteRef>) -> Self {
        Self {
            identifier: identifier.into(),
            remote,
            direction: Direction::Download,
        }
    }
}
