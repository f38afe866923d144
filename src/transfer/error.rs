//! Error types for the transfer pipeline.

use std::path::PathBuf;

use thiserror::Error;

use crate::resolver::ResolveError;

/// Errors that can occur while downloading an attachment.
///
/// Cancellation is deliberately not represented here: it is a settled
/// outcome, not an error, and suppresses user-facing notification (see
/// [`TransferOutcome`](super::TransferOutcome)).
#[derive(Debug, Error)]
pub enum TransferError {
    /// The request carried no remote reference; nothing to fetch.
    #[error("no remote data for {identifier}")]
    NoData {
        /// Identifier of the request that failed fast.
        identifier: String,
    },

    /// The signed download URL could not be obtained.
    #[error("{source}")]
    Resolution {
        /// The underlying resolution error.
        #[source]
        source: ResolveError,
    },

    /// The transfer endpoint answered with a non-2xx final status.
    #[error("HTTP {status} transferring {url}")]
    Status {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// Transport-level failure during streaming (DNS, connect, TLS,
    /// timeout, broken stream).
    #[error("network error transferring {url}: {source}")]
    Network {
        /// The URL whose transfer failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// File system error while writing the destination file.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The transfer completed but the content failed the integrity check.
    #[error("{reason}")]
    Verification {
        /// Reason string, surfaced verbatim to the notification sink.
        reason: String,
    },
}

impl TransferError {
    /// Creates a no-data error.
    pub fn no_data(identifier: impl Into<String>) -> Self {
        Self::NoData {
            identifier: identifier.into(),
        }
    }

    /// Wraps a resolution error.
    #[must_use]
    pub fn resolution(source: ResolveError) -> Self {
        Self::Resolution { source }
    }

    /// Creates an HTTP status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a verification error.
    pub fn verification(reason: impl Into<String>) -> Self {
        Self::Verification {
            reason: reason.into(),
        }
    }

    /// Stable tag for diagnostic log entries.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoData { .. } => "NoData",
            Self::Resolution { .. } => "ResolutionError",
            Self::Status { .. } | Self::Network { .. } | Self::Io { .. } => "TransferError",
            Self::Verification { .. } => "VerificationError",
        }
    }
}
