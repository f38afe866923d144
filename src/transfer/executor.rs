//! Streaming transfer executor - the concurrency core.
//!
//! The executor streams bytes from a resolved URL directly to a destination
//! path, invoking a progress callback per chunk and racing every read
//! against a cooperative [`CancelToken`]. The payload is never buffered in
//! memory, which is what makes large attachments viable.
//!
//! The executor has no dependency on the progress registry; the caller
//! forwards progress updates into whatever store it uses. Likewise it does
//! not clean up partial bytes on disk: the destination file belongs to the
//! caller, which owns cleanup on failure and cancellation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument};

use super::cancel::CancelToken;
use super::error::TransferError;

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes for large attachments).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Settled result of one transfer execution.
#[derive(Debug)]
pub enum TransferOutcome {
    /// The transfer streamed to completion.
    Success {
        /// Destination path holding the complete bytes.
        path: PathBuf,
        /// Bytes actually written.
        bytes: u64,
        /// Total advertised by the server; 0 when unknown.
        total: u64,
    },
    /// Cancellation was observed before completion.
    Cancelled,
    /// The transfer failed.
    Failed(TransferError),
}

/// How a streaming loop ended, before outcome mapping.
enum StreamEnd {
    Completed { bytes: u64, total: u64 },
    Cancelled,
}

/// HTTP executor for streaming transfers.
///
/// Designed to be created once and reused across transfers, taking
/// advantage of connection pooling. Cloning is cheap (the underlying
/// client is reference-counted).
#[derive(Debug, Clone)]
pub struct TransferExecutor {
    client: Client,
}

impl TransferExecutor {
    /// Creates an executor with default timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    pub fn new() -> Self {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates an executor with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Streams `url` to `dest`, reporting progress per chunk.
    ///
    /// `on_progress` is invoked with `(received, total)` after every chunk
    /// is written; `received` is monotonically non-decreasing and `total`
    /// is the Content-Length advertisement (0 when unknown). Call
    /// frequency is bounded by the transport; there is no guaranteed
    /// minimum granularity.
    ///
    /// Cancellation is cooperative: each read races against `cancel`, with
    /// the race biased toward cancellation so no further reads are issued
    /// once a cancel is observed. A cancel that lands after the final chunk
    /// still yields `Cancelled`, never a racing late success.
    ///
    /// HTTP status in [200, 300) is the only success condition.
    #[instrument(skip(self, on_progress, cancel), fields(url = %url, dest = %dest.display()))]
    pub async fn execute<F>(
        &self,
        url: &str,
        dest: &Path,
        on_progress: F,
        cancel: &CancelToken,
    ) -> TransferOutcome
    where
        F: FnMut(u64, u64) + Send,
    {
        if cancel.is_cancelled() {
            return TransferOutcome::Cancelled;
        }
        match self.stream_to_dest(url, dest, on_progress, cancel).await {
            Ok(StreamEnd::Completed { bytes, total }) => {
                debug!(bytes, total, "transfer complete");
                TransferOutcome::Success {
                    path: dest.to_path_buf(),
                    bytes,
                    total,
                }
            }
            Ok(StreamEnd::Cancelled) => TransferOutcome::Cancelled,
            Err(error) => TransferOutcome::Failed(error),
        }
    }

    async fn stream_to_dest<F>(
        &self,
        url: &str,
        dest: &Path,
        mut on_progress: F,
        cancel: &CancelToken,
    ) -> Result<StreamEnd, TransferError>
    where
        F: FnMut(u64, u64) + Send,
    {
        // Race the request itself against cancellation so an abort lands
        // even before response headers arrive; dropping the send future
        // tears down the in-flight connection.
        let send = self.client.get(url).send();
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
            result = send => result.map_err(|e| TransferError::network(url, e))?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::status(url, status.as_u16()));
        }

        let total = response.content_length().unwrap_or(0);

        let file = File::create(dest)
            .await
            .map_err(|e| TransferError::io(dest.to_path_buf(), e))?;
        let mut writer = BufWriter::new(file);
        let mut stream = response.bytes_stream();
        let mut received: u64 = 0;

        loop {
            // Biased toward cancellation: once a cancel is observed, no
            // further reads are issued on the stream.
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                chunk = stream.next() => chunk,
            };

            match next {
                Some(Ok(chunk)) => {
                    writer
                        .write_all(&chunk)
                        .await
                        .map_err(|e| TransferError::io(dest.to_path_buf(), e))?;
                    received += chunk.len() as u64;
                    on_progress(received, total);
                }
                Some(Err(e)) => return Err(TransferError::network(url, e)),
                None => break,
            }
        }

        // A cancel that raced the final chunk must still win.
        if cancel.is_cancelled() {
            return Ok(StreamEnd::Cancelled);
        }

        writer
            .flush()
            .await
            .map_err(|e| TransferError::io(dest.to_path_buf(), e))?;

        Ok(StreamEnd::Completed {
            bytes: received,
            total,
        })
    }
}

impl Default for TransferExecutor {
    fn default() -> Self {
        Self::new()
    }
}
