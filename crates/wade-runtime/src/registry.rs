#![forbid(unsafe_code)]

//! Watch registry.
//!
//! An explicit object owned by the scheduler that maps each watch target to
//! its single live [`Observation`].
//!
//! # Invariants
//!
//! - At most one active observation exists per target. Watching a target
//!   that is already watched closes the previous observation, installs a
//!   fresh one and returns the same [`WatchId`].
//! - The value kind of a field target is decided when it is first watched.
//! - [`WatchRegistry::unwatch`] is idempotent: unknown and already-closed
//!   ids are ignored.
//!
//! # Failure Modes
//!
//! - An unparsable field path fails [`WatchRegistry::watch`] synchronously
//!   with [`WatchError::InvalidPath`]; the registry is left unchanged.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::WatchError;
use crate::model::{ModelObject, ObservableMap, ObservableSeq, Path, ValueKind};
use crate::observe::{Observation, WatchId, install};
use crate::queue::SignalSender;

/// A location that can be watched.
#[derive(Clone)]
pub enum WatchTarget {
    /// A dotted path resolved from a model object.
    Field { owner: ModelObject, path: String },
    /// A sequence observed directly, without a holder field.
    Sequence(ObservableSeq),
    /// A map observed directly, without a holder field.
    Map(ObservableMap),
}

impl WatchTarget {
    /// Watch `path` on `owner`.
    pub fn field(owner: &ModelObject, path: impl Into<String>) -> Self {
        Self::Field {
            owner: owner.clone(),
            path: path.into(),
        }
    }

    fn key(&self) -> Result<TargetKey, WatchError> {
        Ok(match self {
            Self::Field { owner, path } => {
                TargetKey::Field(owner.id(), Path::parse(path)?.to_string())
            }
            Self::Sequence(seq) => TargetKey::Collection(seq.id()),
            Self::Map(map) => TargetKey::Collection(map.id()),
        })
    }

    fn describe(&self) -> String {
        match self {
            Self::Field { path, .. } => path.trim().to_string(),
            Self::Sequence(seq) => format!("#{}", seq.id()),
            Self::Map(map) => format!("#{}", map.id()),
        }
    }
}

impl fmt::Debug for WatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field { owner, path } => f
                .debug_struct("Field")
                .field("owner", &owner.id())
                .field("path", path)
                .finish(),
            Self::Sequence(seq) => f.debug_tuple("Sequence").field(&seq.id()).finish(),
            Self::Map(map) => f.debug_tuple("Map").field(&map.id()).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TargetKey {
    Field(u64, String),
    Collection(u64),
}

struct Entry {
    key: TargetKey,
    path: String,
    observation: Observation,
    holders: usize,
}

/// Owner of every live observation.
pub struct WatchRegistry {
    sender: SignalSender,
    next_id: u64,
    entries: BTreeMap<WatchId, Entry>,
    by_target: HashMap<TargetKey, WatchId>,
}

impl WatchRegistry {
    /// Registry whose observations report into `sender`.
    #[must_use]
    pub fn new(sender: SignalSender) -> Self {
        Self {
            sender,
            next_id: 1,
            entries: BTreeMap::new(),
            by_target: HashMap::new(),
        }
    }

    /// Install an observation on `target`.
    ///
    /// Re-watching a target replaces its observation under the same id and
    /// adds a holder; see [`release`](Self::release).
    pub fn watch(&mut self, target: WatchTarget) -> Result<WatchId, WatchError> {
        let key = target.key()?;

        let existing = self.by_target.get(&key).copied();
        if let Some(entry) = existing.and_then(|id| self.entries.get_mut(&id)) {
            let id = entry.observation.watch();
            entry.observation.close();
            entry.observation = install(id, &target, self.sender.clone())?;
            entry.holders += 1;
            tracing::trace!(
                watch = %id,
                path = %entry.path,
                holders = entry.holders,
                "watch replaced"
            );
            return Ok(id);
        }

        let id = WatchId(self.next_id);
        let observation = install(id, &target, self.sender.clone())?;
        self.next_id += 1;
        let path = target.describe();
        tracing::trace!(watch = %id, path = %path, kind = ?observation.kind(), "watch installed");
        self.by_target.insert(key.clone(), id);
        self.entries.insert(
            id,
            Entry {
                key,
                path,
                observation,
                holders: 1,
            },
        );
        Ok(id)
    }

    /// Drop one holder of `id`, closing the observation when none remain.
    ///
    /// Returns whether the observation was closed by this call.
    pub fn release(&mut self, id: WatchId) -> bool {
        let Some(entry) = self.entries.get_mut(&id) else {
            return false;
        };
        entry.holders = entry.holders.saturating_sub(1);
        if entry.holders > 0 {
            return false;
        }
        self.unwatch(id)
    }

    /// Close the observation behind `id` regardless of holders.
    ///
    /// Returns `false` if `id` was unknown or already closed.
    pub fn unwatch(&mut self, id: WatchId) -> bool {
        let Some(mut entry) = self.entries.remove(&id) else {
            return false;
        };
        self.by_target.remove(&entry.key);
        entry.observation.close();
        tracing::trace!(watch = %id, path = %entry.path, "watch removed");
        true
    }

    /// Close every observation.
    pub fn close_all(&mut self) {
        let ids: Vec<WatchId> = self.entries.keys().copied().collect();
        for id in ids {
            self.unwatch(id);
        }
    }

    /// Kind decided at registration.
    #[must_use]
    pub fn kind(&self, id: WatchId) -> Option<ValueKind> {
        self.entries.get(&id).map(|entry| entry.observation.kind())
    }

    /// Path or collection label the watch was registered with.
    #[must_use]
    pub fn path(&self, id: WatchId) -> Option<&str> {
        self.entries.get(&id).map(|entry| entry.path.as_str())
    }

    #[must_use]
    pub fn is_active(&self, id: WatchId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of live observations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ids of live observations in registration order.
    pub fn ids(&self) -> impl Iterator<Item = WatchId> + '_ {
        self.entries.keys().copied()
    }
}

impl fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("watches", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
