#![forbid(unsafe_code)]

//! The observable model host.
//!
//! A model is a graph of shared handles: [`ModelObject`] (named fields),
//! [`ObservableSeq`] (ordered collection) and [`ObservableMap`] (keyed map).
//! Leaves are [`Value::Scalar`] JSON values. Every mutation goes through a
//! handle method, which notifies that container's host observers once the
//! internal borrow has been released.
//!
//! Handles have identity: cloning a handle shares the container, and
//! [`ModelObject::id`] (and friends) tell two instances apart even when their
//! contents are equal. The watch machinery relies on identity to notice that
//! a field now holds a *different* collection.
//!
//! # Invariants
//!
//! 1. Observers never run while the container is borrowed, so they may read
//!    the model freely.
//! 2. The observation machinery only reads the model; all writes come from
//!    application code.
//! 3. Ids are unique for the process lifetime.
//!
//! Cyclic graphs are allowed but [`Value::to_json`] does not terminate on
//! them.

pub mod observers;
pub mod path;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value as Json;

pub use observers::HostSubscription;
pub use path::{Path, PathStep};

use observers::ObserverList;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_handle_id() -> u64 {
    NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Structural kind of a value, which decides how it is observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Observed through its path. Objects count as scalars here.
    Scalar,
    /// Ordered collection.
    Sequence,
    /// Keyed map.
    Map,
}

/// A model value.
#[derive(Clone)]
pub enum Value {
    Scalar(Json),
    Object(ModelObject),
    Seq(ObservableSeq),
    Map(ObservableMap),
}

impl Value {
    /// `Value::Scalar(null)`.
    #[must_use]
    pub fn null() -> Self {
        Self::Scalar(Json::Null)
    }

    /// Deep-convert JSON: arrays become [`ObservableSeq`], objects become
    /// [`ModelObject`].
    #[must_use]
    pub fn from_json(json: Json) -> Self {
        match json {
            Json::Array(items) => {
                Self::Seq(ObservableSeq::from_values(items.into_iter().map(Self::from_json)))
            }
            Json::Object(map) => Self::Object(ModelObject::from_fields(
                map.into_iter().map(|(k, v)| (k, Self::from_json(v))),
            )),
            scalar => Self::Scalar(scalar),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar(_) | Self::Object(_) => ValueKind::Scalar,
            Self::Seq(_) => ValueKind::Sequence,
            Self::Map(_) => ValueKind::Map,
        }
    }

    /// Snapshot as JSON.
    #[must_use]
    pub fn to_json(&self) -> Json {
        match self {
            Self::Scalar(json) => json.clone(),
            Self::Object(obj) => obj.to_json(),
            Self::Seq(seq) => seq.to_json(),
            Self::Map(map) => map.to_json(),
        }
    }

    /// Handle id for containers, `None` for scalars.
    #[must_use]
    pub fn handle_id(&self) -> Option<u64> {
        match self {
            Self::Scalar(_) => None,
            Self::Object(obj) => Some(obj.id()),
            Self::Seq(seq) => Some(seq.id()),
            Self::Map(map) => Some(map.id()),
        }
    }

    /// Same container instance, or equal scalar.
    #[must_use]
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Scalar(a), Self::Scalar(b)) => a == b,
            _ => match (self.handle_id(), other.handle_id()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ModelObject> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_seq(&self) -> Option<&ObservableSeq> {
        match self {
            Self::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&ObservableMap> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Descend one step. Scalars are descended as JSON.
    #[must_use]
    pub fn child(&self, step: &PathStep) -> Option<Value> {
        match self {
            Self::Object(obj) => obj.get(&step.as_key()),
            Self::Map(map) => map.get(&step.as_key()),
            Self::Seq(seq) => step_index(step).and_then(|i| seq.get(i)),
            Self::Scalar(json) => match json {
                Json::Object(map) => map.get(&*step.as_key()).cloned().map(Self::Scalar),
                Json::Array(items) => step_index(step)
                    .and_then(|i| items.get(i))
                    .cloned()
                    .map(Self::Scalar),
                _ => None,
            },
        }
    }

    /// Resolve a sequence of steps starting at this value.
    #[must_use]
    pub fn resolve_steps(&self, steps: &[PathStep]) -> Option<Value> {
        let mut current = self.clone();
        for step in steps {
            current = current.child(step)?;
        }
        Some(current)
    }
}

pub(crate) fn step_index(step: &PathStep) -> Option<usize> {
    match step {
        PathStep::Index(i) => Some(*i),
        PathStep::Key(k) => k.parse().ok(),
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(json) => write!(f, "Scalar({json})"),
            Self::Object(obj) => fmt::Debug::fmt(obj, f),
            Self::Seq(seq) => fmt::Debug::fmt(seq, f),
            Self::Map(map) => fmt::Debug::fmt(map, f),
        }
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Self::Scalar(json)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Scalar(Json::String(s.to_string()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Scalar(Json::String(s))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Scalar(Json::Bool(b))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Scalar(Json::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Scalar(Json::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Scalar(Json::from(n))
    }
}

impl From<ModelObject> for Value {
    fn from(obj: ModelObject) -> Self {
        Self::Object(obj)
    }
}

impl From<ObservableSeq> for Value {
    fn from(seq: ObservableSeq) -> Self {
        Self::Seq(seq)
    }
}

impl From<ObservableMap> for Value {
    fn from(map: ObservableMap) -> Self {
        Self::Map(map)
    }
}

// ---------------------------------------------------------------------------
// ModelObject
// ---------------------------------------------------------------------------

/// A write to one field of a [`ModelObject`].
#[derive(Debug, Clone)]
pub struct FieldWrite {
    pub field: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

struct ObjectInner {
    fields: BTreeMap<String, Value>,
}

/// Object with named fields.
#[derive(Clone)]
pub struct ModelObject {
    id: u64,
    inner: Rc<RefCell<ObjectInner>>,
    observers: ObserverList<FieldWrite>,
}

impl Default for ModelObject {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelObject {
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_handle_id(),
            inner: Rc::new(RefCell::new(ObjectInner {
                fields: BTreeMap::new(),
            })),
            observers: ObserverList::new(),
        }
    }

    /// Object pre-populated with fields.
    #[must_use]
    pub fn from_fields<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        let obj = Self::new();
        obj.inner
            .borrow_mut()
            .fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v)));
        obj
    }

    /// Builder-style field initialisation.
    #[must_use]
    pub fn with(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<Value> {
        self.inner.borrow().fields.get(field).cloned()
    }

    /// Write a field and notify observers.
    pub fn set(&self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        let old = self
            .inner
            .borrow_mut()
            .fields
            .insert(field.clone(), value.clone());
        self.observers.notify(&FieldWrite {
            field,
            old,
            new: Some(value),
        });
    }

    /// Remove a field, notifying observers if it existed.
    pub fn remove(&self, field: &str) -> Option<Value> {
        let old = self.inner.borrow_mut().fields.remove(field);
        if old.is_some() {
            self.observers.notify(&FieldWrite {
                field: field.to_string(),
                old: old.clone(),
                new: None,
            });
        }
        old
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.inner.borrow().fields.keys().cloned().collect()
    }

    /// Resolve a path string relative to this object.
    ///
    /// # Errors
    ///
    /// Propagates path parse errors.
    pub fn resolve(&self, path: &str) -> Result<Option<Value>, crate::error::WatchError> {
        let path = Path::parse(path)?;
        Ok(self.resolve_path(&path))
    }

    #[must_use]
    pub fn resolve_path(&self, path: &Path) -> Option<Value> {
        Value::Object(self.clone()).resolve_steps(path.steps())
    }

    #[must_use]
    pub fn to_json(&self) -> Json {
        let fields = self.inner.borrow().fields.clone();
        Json::Object(fields.into_iter().map(|(k, v)| (k, v.to_json())).collect())
    }

    /// Number of live host observers on this object.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn subscribe(&self, callback: impl Fn(&FieldWrite) + 'static) -> HostSubscription {
        self.observers.subscribe(callback)
    }
}

impl fmt::Debug for ModelObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelObject")
            .field("id", &self.id)
            .field("fields", &self.field_names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ObservableSeq
// ---------------------------------------------------------------------------

/// A splice applied to an [`ObservableSeq`].
///
/// `removed` holds the values taken out at `index`; `added` counts the values
/// put in their place. A replacement is one removed and one added.
#[derive(Debug, Clone)]
pub struct SeqSplice {
    pub index: usize,
    pub removed: Vec<Value>,
    pub added: usize,
}

struct SeqInner {
    items: Vec<Value>,
}

/// Ordered collection with index-level change notification.
#[derive(Clone)]
pub struct ObservableSeq {
    id: u64,
    inner: Rc<RefCell<SeqInner>>,
    observers: ObserverList<SeqSplice>,
}

impl Default for ObservableSeq {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservableSeq {
    #[must_use]
    pub fn new() -> Self {
        Self::from_values(std::iter::empty::<Value>())
    }

    #[must_use]
    pub fn from_values<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self {
            id: next_handle_id(),
            inner: Rc::new(RefCell::new(SeqInner {
                items: values.into_iter().map(Into::into).collect(),
            })),
            observers: ObserverList::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.inner.borrow().items.get(index).cloned()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Value> {
        self.inner.borrow().items.clone()
    }

    /// Replace `remove` values at `index` with `insert`.
    ///
    /// `index` is clamped to the length and `remove` to what is available.
    /// Nothing is notified when the splice is a no-op.
    pub fn splice<V: Into<Value>>(
        &self,
        index: usize,
        remove: usize,
        insert: impl IntoIterator<Item = V>,
    ) -> Vec<Value> {
        let insert: Vec<Value> = insert.into_iter().map(Into::into).collect();
        let added = insert.len();
        let (index, removed) = {
            let mut inner = self.inner.borrow_mut();
            let index = index.min(inner.items.len());
            let end = index.saturating_add(remove).min(inner.items.len());
            let removed: Vec<Value> = inner.items.splice(index..end, insert).collect();
            (index, removed)
        };
        if !removed.is_empty() || added > 0 {
            self.observers.notify(&SeqSplice {
                index,
                removed: removed.clone(),
                added,
            });
        }
        removed
    }

    pub fn push(&self, value: impl Into<Value>) {
        let len = self.len();
        self.splice(len, 0, [value.into()]);
    }

    pub fn insert(&self, index: usize, value: impl Into<Value>) {
        self.splice(index, 0, [value.into()]);
    }

    pub fn remove(&self, index: usize) -> Option<Value> {
        if index >= self.len() {
            return None;
        }
        self.splice(index, 1, std::iter::empty::<Value>()).pop()
    }

    pub fn pop(&self) -> Option<Value> {
        let len = self.len();
        len.checked_sub(1).and_then(|last| self.remove(last))
    }

    /// Replace the element at `index`. Out-of-range indices are ignored.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Option<Value> {
        if index >= self.len() {
            return None;
        }
        self.splice(index, 1, [value.into()]).pop()
    }

    pub fn clear(&self) {
        let len = self.len();
        self.splice(0, len, std::iter::empty::<Value>());
    }

    #[must_use]
    pub fn to_json(&self) -> Json {
        Json::Array(self.to_vec().iter().map(Value::to_json).collect())
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn subscribe(&self, callback: impl Fn(&SeqSplice) + 'static) -> HostSubscription {
        self.observers.subscribe(callback)
    }
}

impl fmt::Debug for ObservableSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableSeq")
            .field("id", &self.id)
            .field("len", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ObservableMap
// ---------------------------------------------------------------------------

/// A write to one key of an [`ObservableMap`].
#[derive(Debug, Clone)]
pub struct MapWrite {
    pub key: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

struct MapInner {
    entries: BTreeMap<String, Value>,
}

/// Keyed map with per-key change notification.
#[derive(Clone)]
pub struct ObservableMap {
    id: u64,
    inner: Rc<RefCell<MapInner>>,
    observers: ObserverList<MapWrite>,
}

impl Default for ObservableMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ObservableMap {
    #[must_use]
    pub fn new() -> Self {
        Self::from_entries(std::iter::empty::<(String, Value)>())
    }

    #[must_use]
    pub fn from_entries<K: Into<String>, V: Into<Value>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            id: next_handle_id(),
            inner: Rc::new(RefCell::new(MapInner {
                entries: entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            })),
            observers: ObserverList::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.borrow().entries.get(key).cloned()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().entries.keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace a key, notifying observers.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        let old = self
            .inner
            .borrow_mut()
            .entries
            .insert(key.clone(), value.clone());
        self.observers.notify(&MapWrite {
            key,
            old: old.clone(),
            new: Some(value),
        });
        old
    }

    /// Remove a key, notifying observers if it existed.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let old = self.inner.borrow_mut().entries.remove(key);
        if old.is_some() {
            self.observers.notify(&MapWrite {
                key: key.to_string(),
                old: old.clone(),
                new: None,
            });
        }
        old
    }

    #[must_use]
    pub fn to_json(&self) -> Json {
        let entries = self.inner.borrow().entries.clone();
        Json::Object(entries.into_iter().map(|(k, v)| (k, v.to_json())).collect())
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn subscribe(&self, callback: impl Fn(&MapWrite) + 'static) -> HostSubscription {
        self.observers.subscribe(callback)
    }
}

impl fmt::Debug for ObservableMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableMap")
            .field("id", &self.id)
            .field("keys", &self.keys())
            .finish()
    }
}
