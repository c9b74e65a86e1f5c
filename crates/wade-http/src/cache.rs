#![forbid(unsafe_code)]

//! Request cache loaded once from a captured snapshot.
//!
//! # Invariants
//!
//! - Records for one identity are served first-in, first-out, each at most
//!   once.
//! - Nothing is added after construction; an exhausted identity stays
//!   exhausted and callers fall through to the live transport.
//!
//! # Failure Modes
//!
//! - A malformed snapshot fails construction with [`SnapshotError`].
//!   Blank text is not malformed; it yields an empty cache.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;
use crate::page::snapshot_from_html;
use crate::request::RequestRecord;

/// Default `type` of the script element carrying the snapshot.
pub const DEFAULT_SNAPSHOT_SCRIPT_TYPE: &str = "text/wadehttp";

/// Serialized snapshot: identity to records in capture order.
pub type Snapshot = BTreeMap<String, Vec<RequestRecord>>;

/// Where the snapshot lives in a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub snapshot_script_type: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            snapshot_script_type: DEFAULT_SNAPSHOT_SCRIPT_TYPE.to_string(),
        }
    }
}

/// FIFO record queues keyed by request identity.
#[derive(Debug, Clone, Default)]
pub struct RequestCache {
    queues: HashMap<String, VecDeque<RequestRecord>>,
}

impl RequestCache {
    /// Empty cache; every lookup misses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache over already-deserialized records.
    #[must_use]
    pub fn from_records(snapshot: Snapshot) -> Self {
        let queues = snapshot
            .into_iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(identity, records)| (identity, VecDeque::from(records)))
            .collect();
        Self { queues }
    }

    /// Parse snapshot JSON. Blank input yields an empty cache.
    pub fn from_snapshot(text: &str) -> Result<Self, SnapshotError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let snapshot: Snapshot = serde_json::from_str(text)?;
        let cache = Self::from_records(snapshot);
        tracing::debug!(
            identities = cache.queues.len(),
            records = cache.total_remaining(),
            "request snapshot loaded"
        );
        Ok(cache)
    }

    /// Load the snapshot embedded in a rendered page. A page without one
    /// yields an empty cache.
    pub fn from_page(html: &str, config: &CacheConfig) -> Result<Self, SnapshotError> {
        match snapshot_from_html(html, &config.snapshot_script_type)? {
            Some(text) => Self::from_snapshot(&text),
            None => {
                tracing::debug!(
                    script_type = %config.snapshot_script_type,
                    "page has no request snapshot"
                );
                Ok(Self::new())
            }
        }
    }

    /// Take the next unconsumed record for `identity`.
    pub fn lookup(&mut self, identity: &str) -> Option<RequestRecord> {
        let queue = self.queues.get_mut(identity)?;
        let record = queue.pop_front();
        if queue.is_empty() {
            self.queues.remove(identity);
        }
        record
    }

    /// Unconsumed records for `identity`.
    #[must_use]
    pub fn remaining(&self, identity: &str) -> usize {
        self.queues.get(identity).map_or(0, VecDeque::len)
    }

    #[must_use]
    pub fn total_remaining(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
