//! Filesystem-backed attachment cache with a staging area.
//!
//! Completed, verified attachments live directly under the cache root keyed
//! by identifier. In-flight transfers write to a `staging/` subdirectory;
//! [`CacheStore::exists`] only ever consults final paths, so a half-written
//! file is never visible as "present". Publishing is a rename, which is
//! atomic on the same filesystem.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

/// Subdirectory for in-flight partial files.
const STAGING_DIR: &str = "staging";

/// Suffix marking a partial file as not-yet-published.
const PARTIAL_SUFFIX: &str = ".partial";

/// Errors that can occur during cache mutations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// File system error while preparing or publishing a cache entry.
    #[error("cache IO error at {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl CacheError {
    /// Creates an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Local attachment cache keyed by identifier.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Creates a cache store rooted at `root`. No directories are created
    /// until [`ensure_dirs`](Self::ensure_dirs) runs.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the cache root and staging directories if absent.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if directory creation fails.
    pub async fn ensure_dirs(&self) -> Result<(), CacheError> {
        let staging = self.root.join(STAGING_DIR);
        tokio::fs::create_dir_all(&staging)
            .await
            .map_err(|e| CacheError::io(staging, e))
    }

    /// Returns the final (published) path for an identifier.
    #[must_use]
    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.root.join(sanitize_identifier(identifier))
    }

    /// Returns the staging path used while a transfer for `identifier` is
    /// in flight. The staging file belongs exclusively to that transfer
    /// until it settles.
    #[must_use]
    pub fn staging_path(&self, identifier: &str) -> PathBuf {
        self.root
            .join(STAGING_DIR)
            .join(format!("{}{PARTIAL_SUFFIX}", sanitize_identifier(identifier)))
    }

    /// Returns true if a verified attachment is present for `identifier`.
    ///
    /// Side-effect-free; staged partial files are never reported.
    pub async fn exists(&self, identifier: &str) -> bool {
        tokio::fs::metadata(self.path_for(identifier))
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    /// Makes a staged file visible as the published entry for `identifier`.
    ///
    /// Only called after the transfer passed integrity verification.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the rename fails (e.g. the staged file
    /// is missing).
    pub async fn publish(&self, identifier: &str) -> Result<PathBuf, CacheError> {
        let staged = self.staging_path(identifier);
        let target = self.path_for(identifier);
        tokio::fs::rename(&staged, &target)
            .await
            .map_err(|e| CacheError::io(staged, e))?;
        debug!(identifier, path = %target.display(), "cache entry published");
        Ok(target)
    }

    /// Removes the staged partial file for `identifier`, if any.
    ///
    /// Best-effort: failures are logged and never propagated, so cleanup is
    /// safe on every exit path.
    pub async fn discard_partial(&self, identifier: &str) {
        let staged = self.staging_path(identifier);
        match tokio::fs::remove_file(&staged).await {
            Ok(()) => debug!(identifier, "partial file discarded"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(identifier, path = %staged.display(), error = %e, "failed to discard partial file"),
        }
    }

    /// Removes the published entry for `identifier`, if any. Best-effort.
    pub async fn evict(&self, identifier: &str) {
        let target = self.path_for(identifier);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => debug!(identifier, "cache entry evicted"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(identifier, path = %target.display(), error = %e, "failed to evict cache entry"),
        }
    }
}

/// Maps an identifier onto a safe single-component file name.
///
/// Identifiers are content hashes in practice, but a hostile or corrupted
/// value must not escape the cache root.
fn sanitize_identifier(identifier: &str) -> String {
    let cleaned: String = identifier
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect();
    if cleaned == "." || cleaned == ".." || cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}
