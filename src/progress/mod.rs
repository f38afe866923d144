//! Process-wide registry of in-flight transfer progress.
//!
//! The registry is an explicit shared store injected into the orchestration
//! rather than ambient global state. Observers (a UI layer, the CLI
//! progress bar) poll it by identifier; mutations are atomic per key via
//! `DashMap`'s sharded locking.
//!
//! Each live entry also carries the transfer's [`CancelToken`], so an
//! external observer can request cancellation knowing only the identifier.

use dashmap::DashMap;
use serde::Serialize;

use crate::transfer::CancelToken;

/// Which way the bytes are moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Remote → local cache.
    Download,
    /// Local → remote store.
    Upload,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Upload => write!(f, "upload"),
        }
    }
}

/// Live registry entry for one in-flight transfer.
#[derive(Debug)]
struct ProgressEntry {
    direction: Direction,
    received: u64,
    total: u64,
    cancel: CancelToken,
}

/// Observer-facing copy of a registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// Identifier of the attachment being transferred.
    pub identifier: String,
    /// Transfer direction.
    pub direction: Direction,
    /// Bytes transferred so far; monotonically non-decreasing.
    pub received: u64,
    /// Advertised total bytes; 0 when unknown.
    pub total: u64,
}

/// Shared map identifier → in-flight transfer progress.
///
/// At most one live entry exists per identifier; an entry exists iff a
/// transfer for that identifier is currently executing. Entries are removed
/// unconditionally when a transfer settles, whatever the outcome.
#[derive(Debug, Default)]
pub struct ProgressRegistry {
    entries: DashMap<String, ProgressEntry>,
}

impl ProgressRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the live entry for a transfer that is about to start.
    ///
    /// `received` starts at 0; `cancel` becomes reachable through
    /// [`cancel`](Self::cancel) for external cancel requests.
    pub fn begin(&self, identifier: &str, direction: Direction, total: u64, cancel: CancelToken) {
        self.entries.insert(
            identifier.to_string(),
            ProgressEntry {
                direction,
                received: 0,
                total,
                cancel,
            },
        );
    }

    /// Upserts progress for `identifier`.
    ///
    /// `received` is clamped to never move backwards, preserving the
    /// monotonic view observers rely on. An update for an unknown
    /// identifier installs a fresh entry (with a detached cancel token).
    pub fn update(&self, identifier: &str, direction: Direction, received: u64, total: u64) {
        self.entries
            .entry(identifier.to_string())
            .and_modify(|entry| {
                entry.direction = direction;
                entry.received = entry.received.max(received);
                entry.total = total;
            })
            .or_insert_with(|| ProgressEntry {
                direction,
                received,
                total,
                cancel: CancelToken::new(),
            });
    }

    /// Removes the entry for `identifier`. Idempotent; removing an unknown
    /// identifier is a no-op.
    pub fn remove(&self, identifier: &str) {
        self.entries.remove(identifier);
    }

    /// Returns a copy of the entry for `identifier`, if one is live.
    #[must_use]
    pub fn get(&self, identifier: &str) -> Option<ProgressSnapshot> {
        self.entries.get(identifier).map(|entry| ProgressSnapshot {
            identifier: identifier.to_string(),
            direction: entry.direction,
            received: entry.received,
            total: entry.total,
        })
    }

    /// Fires the cancellation handle stored with `identifier`'s entry.
    ///
    /// Returns true if a live entry was found. The entry itself stays until
    /// the transfer observes the cancel and settles.
    pub fn cancel(&self, identifier: &str) -> bool {
        let token = self
            .entries
            .get(identifier)
            .map(|entry| entry.cancel.clone());
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Returns a copy of every live entry.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ProgressSnapshot> {
        self.entries
            .iter()
            .map(|entry| ProgressSnapshot {
                identifier: entry.key().clone(),
                direction: entry.direction,
                received: entry.received,
                total: entry.total,
            })
            .collect()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no transfers are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
