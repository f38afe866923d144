//! Error types for signed-URL resolution.

use thiserror::Error;

/// Errors that can occur while resolving a signed download URL.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resolution endpoint answered with a non-success status.
    #[error("HTTP {status}: unable to resolve download url for {identifier}")]
    Status {
        /// Identifier whose resolution failed.
        identifier: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The resolution endpoint answered 2xx but with an empty body.
    #[error("unable to resolve download url for {identifier}: empty response")]
    EmptyBody {
        /// Identifier whose resolution failed.
        identifier: String,
    },

    /// The round trip itself failed (DNS, connect, TLS, timeout).
    #[error("network error resolving download url for {identifier}: {source}")]
    Network {
        /// Identifier whose resolution failed.
        identifier: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },
}

impl ResolveError {
    /// Creates a non-success status error.
    pub fn status(identifier: impl Into<String>, status: u16) -> Self {
        Self::Status {
            identifier: identifier.into(),
            status,
        }
    }

    /// Creates an empty-body error.
    pub fn empty_body(identifier: impl Into<String>) -> Self {
        Self::EmptyBody {
            identifier: identifier.into(),
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(identifier: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            identifier: identifier.into(),
            source,
        }
    }
}
