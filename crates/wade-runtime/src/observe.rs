#![forbid(unsafe_code)]

//! Change observation strategies.
//!
//! Three strategies cover the three [`ValueKind`]s:
//!
//! - **Scalar path**: every container along the path is observed. A write to
//!   the leaf field always fires; a write further up fires only when the
//!   resolved leaf actually changed, and re-links the chain onto the new
//!   containers.
//! - **Ordered collection**: index-level splices on the sequence, plus a path
//!   observation on the field holding it. When the field is reassigned to a
//!   different sequence the old splice observer is closed and a new one is
//!   installed before the replacement is reported, so the stale collection
//!   can never fire again and there is no gap where neither fires.
//! - **Keyed map**: per-key writes, with the same holder tracking as
//!   sequences.
//!
//! Observers do not call back into bindings. They push
//! [`ChangeNotification`]s into the scheduler's inbound queue.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value as Json;

use crate::error::WatchError;
use crate::model::{
    FieldWrite, HostSubscription, MapWrite, ModelObject, Path, SeqSplice, Value, ValueKind,
    step_index,
};
use crate::queue::SignalSender;
use crate::registry::WatchTarget;

/// Identifier of a registered watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(pub(crate) u64);

impl WatchId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// What changed at a watched location.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// A scalar path now resolves to a different value, or was rewritten.
    Value { old: Option<Json>, new: Option<Json> },
    /// Elements were removed and/or inserted at `index`.
    Splice {
        index: usize,
        removed: Vec<Json>,
        added: usize,
    },
    /// One key of a map was inserted, replaced or removed.
    Key {
        key: String,
        old: Option<Json>,
        new: Option<Json>,
    },
    /// The field holding a watched collection now holds something else.
    Replaced { old: Option<Json>, new: Option<Json> },
}

impl Change {
    /// Net change in collection length caused by this change.
    #[must_use]
    pub fn length_delta(&self) -> isize {
        match self {
            Self::Splice { removed, added, .. } => {
                isize::try_from(*added).unwrap_or(isize::MAX)
                    - isize::try_from(removed.len()).unwrap_or(isize::MAX)
            }
            Self::Key { old: None, new: Some(_), .. } => 1,
            Self::Key { old: Some(_), new: None, .. } => -1,
            _ => 0,
        }
    }

    /// Whether the structure changed, as opposed to an element in place.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Replaced { .. }) || self.length_delta() != 0
    }
}

/// A change reported by one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    pub watch: WatchId,
    pub path: String,
    pub change: Change,
}

#[derive(Clone)]
struct Emitter {
    sender: SignalSender,
    watch: WatchId,
    path: Rc<str>,
}

impl Emitter {
    fn emit(&self, change: Change) {
        self.sender.notify(ChangeNotification {
            watch: self.watch,
            path: self.path.to_string(),
            change,
        });
    }
}

fn snapshot(value: Option<&Value>) -> Option<Json> {
    value.map(Value::to_json)
}

// ---------------------------------------------------------------------------
// Path observation
// ---------------------------------------------------------------------------

type PathCallback = Rc<dyn Fn(Option<Value>, Option<Value>)>;

struct PathState {
    root: ModelObject,
    path: Path,
    links: Vec<HostSubscription>,
    chain: Vec<u64>,
    last: Option<Value>,
    on_change: PathCallback,
}

struct PathObserver {
    state: Option<Rc<RefCell<PathState>>>,
}

impl PathObserver {
    fn install(root: ModelObject, path: Path, on_change: PathCallback) -> Self {
        let last = root.resolve_path(&path);
        let state = Rc::new(RefCell::new(PathState {
            root,
            path,
            links: Vec::new(),
            chain: Vec::new(),
            last,
            on_change,
        }));
        relink(&state);
        Self { state: Some(state) }
    }

    fn close(&mut self) {
        if let Some(state) = self.state.take() {
            state.borrow_mut().links.clear();
        }
    }
}

/// Containers along the path, one per step that has one.
fn chain_of(root: &ModelObject, path: &Path) -> Vec<Value> {
    let steps = path.steps();
    let mut containers = vec![Value::Object(root.clone())];
    let mut current = Value::Object(root.clone());
    for step in &steps[..steps.len() - 1] {
        match current.child(step) {
            Some(next @ (Value::Object(_) | Value::Seq(_) | Value::Map(_))) => {
                containers.push(next.clone());
                current = next;
            }
            _ => break,
        }
    }
    containers
}

fn relink(state: &Rc<RefCell<PathState>>) {
    let weak = Rc::downgrade(state);
    let mut st = state.borrow_mut();
    let containers = chain_of(&st.root, &st.path);
    let ids: Vec<u64> = containers.iter().filter_map(Value::handle_id).collect();
    if ids == st.chain && !st.links.is_empty() {
        return;
    }

    st.links.clear();
    let leaf_index = st.path.steps().len() - 1;
    let mut links = Vec::with_capacity(containers.len());
    for (i, container) in containers.iter().enumerate() {
        let step = st.path.steps()[i].clone();
        let is_leaf = i == leaf_index;
        let weak = weak.clone();
        let link = match container {
            Value::Object(obj) => {
                let key = step.as_key().into_owned();
                obj.subscribe(move |write: &FieldWrite| {
                    if write.field == key {
                        refresh(&weak, is_leaf);
                    }
                })
            }
            Value::Map(map) => {
                let key = step.as_key().into_owned();
                map.subscribe(move |write: &MapWrite| {
                    if write.key == key {
                        refresh(&weak, is_leaf);
                    }
                })
            }
            Value::Seq(seq) => {
                let Some(index) = step_index(&step) else {
                    continue;
                };
                seq.subscribe(move |splice: &SeqSplice| {
                    if splice.index <= index {
                        let in_place =
                            splice.index == index && splice.removed.len() == splice.added;
                        refresh(&weak, is_leaf && in_place);
                    }
                })
            }
            Value::Scalar(_) => continue,
        };
        links.push(link);
    }
    st.links = links;
    st.chain = ids;
}

fn refresh(weak: &Weak<RefCell<PathState>>, direct: bool) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    relink(&state);

    let (old, new, callback) = {
        let mut st = state.borrow_mut();
        let new = st.root.resolve_path(&st.path);
        let changed = match (&st.last, &new) {
            (Some(a), Some(b)) => !a.same_as(b),
            (None, None) => false,
            _ => true,
        };
        if !direct && !changed {
            return;
        }
        let old = std::mem::replace(&mut st.last, new.clone());
        (old, new, Rc::clone(&st.on_change))
    };
    callback(old, new);
}

// ---------------------------------------------------------------------------
// Observation
// ---------------------------------------------------------------------------

/// A live subscription on one watch target.
///
/// Owned by the [`WatchRegistry`](crate::registry::WatchRegistry) entry that
/// created it. Closing releases every host observer it holds and is
/// idempotent; dropping closes it.
pub struct Observation {
    watch: WatchId,
    kind: ValueKind,
    holder: Option<PathObserver>,
    collection: Option<Rc<RefCell<Option<HostSubscription>>>>,
    closed: bool,
}

impl Observation {
    #[must_use]
    pub fn watch(&self) -> WatchId {
        self.watch
    }

    /// Kind fixed at registration time.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release all host observers. Further calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(mut holder) = self.holder.take() {
            holder.close();
        }
        if let Some(slot) = self.collection.take() {
            slot.borrow_mut().take();
        }
        tracing::trace!(watch = %self.watch, "observation closed");
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observation")
            .field("watch", &self.watch)
            .field("kind", &self.kind)
            .field("closed", &self.closed)
            .finish()
    }
}

fn subscribe_collection(
    value: &Value,
    kind: ValueKind,
    emitter: &Emitter,
) -> Option<HostSubscription> {
    let emitter = emitter.clone();
    match (kind, value) {
        (ValueKind::Sequence, Value::Seq(seq)) => Some(seq.subscribe(move |splice: &SeqSplice| {
            emitter.emit(Change::Splice {
                index: splice.index,
                removed: splice.removed.iter().map(Value::to_json).collect(),
                added: splice.added,
            });
        })),
        (ValueKind::Map, Value::Map(map)) => Some(map.subscribe(move |write: &MapWrite| {
            emitter.emit(Change::Key {
                key: write.key.clone(),
                old: snapshot(write.old.as_ref()),
                new: snapshot(write.new.as_ref()),
            });
        })),
        _ => None,
    }
}

/// Install the observation strategy matching `target`.
pub(crate) fn install(
    watch: WatchId,
    target: &WatchTarget,
    sender: SignalSender,
) -> Result<Observation, WatchError> {
    match target {
        WatchTarget::Field { owner, path } => {
            let path = Path::parse(path)?;
            let emitter = Emitter {
                sender,
                watch,
                path: Rc::from(path.to_string()),
            };
            let current = owner.resolve_path(&path);
            let kind = current.as_ref().map_or(ValueKind::Scalar, Value::kind);
            let observation = match kind {
                ValueKind::Scalar => observe_scalar(watch, owner, path, emitter),
                ValueKind::Sequence | ValueKind::Map => {
                    observe_collection(watch, owner, path, current.as_ref(), kind, emitter)
                }
            };
            Ok(observation)
        }
        WatchTarget::Sequence(seq) => {
            let value = Value::Seq(seq.clone());
            Ok(observe_direct(watch, &value, ValueKind::Sequence, sender))
        }
        WatchTarget::Map(map) => {
            let value = Value::Map(map.clone());
            Ok(observe_direct(watch, &value, ValueKind::Map, sender))
        }
    }
}

fn observe_scalar(
    watch: WatchId,
    owner: &ModelObject,
    path: Path,
    emitter: Emitter,
) -> Observation {
    let on_change: PathCallback = Rc::new(move |old: Option<Value>, new: Option<Value>| {
        emitter.emit(Change::Value {
            old: snapshot(old.as_ref()),
            new: snapshot(new.as_ref()),
        });
    });
    Observation {
        watch,
        kind: ValueKind::Scalar,
        holder: Some(PathObserver::install(owner.clone(), path, on_change)),
        collection: None,
        closed: false,
    }
}

fn observe_collection(
    watch: WatchId,
    owner: &ModelObject,
    path: Path,
    current: Option<&Value>,
    kind: ValueKind,
    emitter: Emitter,
) -> Observation {
    let slot = Rc::new(RefCell::new(
        current.and_then(|value| subscribe_collection(value, kind, &emitter)),
    ));
    let current_id = Rc::new(Cell::new(current.and_then(Value::handle_id)));

    let on_change: PathCallback = {
        let slot = Rc::clone(&slot);
        Rc::new(move |old: Option<Value>, new: Option<Value>| {
            let new_id = new
                .as_ref()
                .filter(|value| value.kind() == kind)
                .and_then(Value::handle_id);
            if new_id.is_some() && new_id == current_id.get() {
                return;
            }
            if new_id != current_id.get() {
                let fresh = new
                    .as_ref()
                    .and_then(|value| subscribe_collection(value, kind, &emitter));
                let stale = slot.replace(fresh);
                drop(stale);
                current_id.set(new_id);
                tracing::trace!(
                    watch = %emitter.watch,
                    path = %emitter.path,
                    "collection reference replaced"
                );
            }
            let unchanged = match (&old, &new) {
                (Some(a), Some(b)) => a.same_as(b),
                (None, None) => true,
                _ => false,
            };
            if !unchanged {
                emitter.emit(Change::Replaced {
                    old: snapshot(old.as_ref()),
                    new: snapshot(new.as_ref()),
                });
            }
        })
    };

    Observation {
        watch,
        kind,
        holder: Some(PathObserver::install(owner.clone(), path, on_change)),
        collection: Some(slot),
        closed: false,
    }
}

fn observe_direct(
    watch: WatchId,
    value: &Value,
    kind: ValueKind,
    sender: SignalSender,
) -> Observation {
    let emitter = Emitter {
        sender,
        watch,
        path: Rc::from(format!("#{}", value.handle_id().unwrap_or_default())),
    };
    Observation {
        watch,
        kind,
        holder: None,
        collection: Some(Rc::new(RefCell::new(subscribe_collection(
            value, kind, &emitter,
        )))),
        closed: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObservableMap, ObservableSeq};
    use crate::queue::{Signal, SignalQueue, signal_channel};
    use serde_json::json;

    fn changes(queue: &SignalQueue) -> Vec<Change> {
        queue
            .drain()
            .into_iter()
            .filter_map(|signal| match signal {
                Signal::Change(n) => Some(n.change),
                Signal::Wake => None,
            })
            .collect()
    }

    fn field(owner: &ModelObject, path: &str) -> WatchTarget {
        WatchTarget::Field {
            owner: owner.clone(),
            path: path.to_string(),
        }
    }

    #[test]
    fn scalar_leaf_write_fires_even_when_equal() {
        let (tx, rx) = signal_channel();
        let model = ModelObject::new().with("count", 1);
        let _obs = install(WatchId(1), &field(&model, "count"), tx).unwrap();

        model.set("count", 2);
        model.set("count", 2);
        assert_eq!(
            changes(&rx),
            vec![
                Change::Value {
                    old: Some(json!(1)),
                    new: Some(json!(2)),
                },
                Change::Value {
                    old: Some(json!(2)),
                    new: Some(json!(2)),
                },
            ]
        );
    }

    #[test]
    fn unrelated_fields_do_not_fire() {
        let (tx, rx) = signal_channel();
        let model = ModelObject::new().with("a", 1).with("b", 1);
        let _obs = install(WatchId(1), &field(&model, "a"), tx).unwrap();
        model.set("b", 2);
        assert!(changes(&rx).is_empty());
    }

    #[test]
    fn nested_path_relinks_on_intermediate_replacement() {
        let (tx, rx) = signal_channel();
        let old_user = ModelObject::new().with("name", "ann");
        let model = ModelObject::new().with("user", old_user.clone());
        let _obs = install(WatchId(1), &field(&model, "user.name"), tx).unwrap();

        let new_user = ModelObject::new().with("name", "bob");
        model.set("user", new_user.clone());
        assert_eq!(
            changes(&rx),
            vec![Change::Value {
                old: Some(json!("ann")),
                new: Some(json!("bob")),
            }]
        );
        assert_eq!(old_user.observer_count(), 0);

        old_user.set("name", "zed");
        assert!(changes(&rx).is_empty());

        new_user.set("name", "cat");
        assert_eq!(changes(&rx).len(), 1);
    }

    #[test]
    fn intermediate_write_with_same_leaf_is_silent() {
        let (tx, rx) = signal_channel();
        let model = ModelObject::new().with("user", ModelObject::new().with("name", "ann"));
        let _obs = install(WatchId(1), &field(&model, "user.name"), tx).unwrap();
        model.set("user", ModelObject::new().with("name", "ann"));
        assert!(changes(&rx).is_empty());
    }

    #[test]
    fn missing_path_fires_when_created() {
        let (tx, rx) = signal_channel();
        let model = ModelObject::new();
        let _obs = install(WatchId(1), &field(&model, "profile.age"), tx).unwrap();
        model.set("profile", ModelObject::new().with("age", 30));
        assert_eq!(
            changes(&rx),
            vec![Change::Value {
                old: None,
                new: Some(json!(30)),
            }]
        );
    }

    #[test]
    fn indexed_path_tracks_sequence_element() {
        let (tx, rx) = signal_channel();
        let todos = ObservableSeq::from_values([ModelObject::new().with("title", "a")]);
        let model = ModelObject::new().with("todos", todos.clone());
        let _obs = install(WatchId(1), &field(&model, "todos.0.title"), tx).unwrap();

        todos.push(ModelObject::new().with("title", "b"));
        assert!(changes(&rx).is_empty());

        todos.remove(0);
        assert_eq!(
            changes(&rx),
            vec![Change::Value {
                old: Some(json!("a")),
                new: Some(json!("b")),
            }]
        );
    }

    #[test]
    fn sequence_splices_distinguish_structure_from_element() {
        let (tx, rx) = signal_channel();
        let items = ObservableSeq::from_values([1, 2]);
        let model = ModelObject::new().with("items", items.clone());
        let obs = install(WatchId(1), &field(&model, "items"), tx).unwrap();
        assert_eq!(obs.kind(), ValueKind::Sequence);

        items.set(0, 9);
        items.push(3);
        let got = changes(&rx);
        assert_eq!(got.len(), 2);
        assert!(!got[0].is_structural());
        assert_eq!(got[1].length_delta(), 1);
    }

    #[test]
    fn collection_reassignment_moves_observation() {
        let (tx, rx) = signal_channel();
        let a = ObservableSeq::from_values([1]);
        let b = ObservableSeq::from_values([2]);
        let model = ModelObject::new().with("items", a.clone());
        let _obs = install(WatchId(1), &field(&model, "items"), tx).unwrap();

        model.set("items", b.clone());
        assert_eq!(
            changes(&rx),
            vec![Change::Replaced {
                old: Some(json!([1])),
                new: Some(json!([2])),
            }]
        );
        assert_eq!(a.observer_count(), 0);
        assert_eq!(b.observer_count(), 1);

        a.push(10);
        assert!(changes(&rx).is_empty());

        b.push(20);
        assert_eq!(
            changes(&rx),
            vec![Change::Splice {
                index: 1,
                removed: vec![],
                added: 1,
            }]
        );
    }

    #[test]
    fn map_reassignment_moves_observation() {
        let (tx, rx) = signal_channel();
        let a = ObservableMap::from_entries([("k", 1)]);
        let b = ObservableMap::new();
        let model = ModelObject::new().with("prefs", a.clone());
        let _obs = install(WatchId(1), &field(&model, "prefs"), tx).unwrap();

        model.set("prefs", b.clone());
        assert_eq!(
            changes(&rx),
            vec![Change::Replaced {
                old: Some(json!({"k": 1})),
                new: Some(json!({})),
            }]
        );
        assert_eq!(a.observer_count(), 0);
        assert_eq!(b.observer_count(), 1);

        a.insert("stale", 0);
        assert!(changes(&rx).is_empty());

        b.insert("fresh", 1);
        assert_eq!(
            changes(&rx),
            vec![Change::Key {
                key: "fresh".into(),
                old: None,
                new: Some(json!(1)),
            }]
        );
    }

    #[test]
    fn collection_holder_changing_kind_and_back() {
        let (tx, rx) = signal_channel();
        let items = ObservableSeq::from_values([1]);
        let model = ModelObject::new().with("items", items.clone());
        let obs = install(WatchId(1), &field(&model, "items"), tx).unwrap();

        model.set("items", 5);
        assert_eq!(
            changes(&rx),
            vec![Change::Replaced {
                old: Some(json!([1])),
                new: Some(json!(5)),
            }]
        );
        assert_eq!(items.observer_count(), 0);
        assert_eq!(obs.kind(), ValueKind::Sequence);

        model.remove("items");
        assert_eq!(
            changes(&rx),
            vec![Change::Replaced {
                old: Some(json!(5)),
                new: None,
            }]
        );

        model.set("items", items.clone());
        assert_eq!(
            changes(&rx),
            vec![Change::Replaced {
                old: None,
                new: Some(json!([1])),
            }]
        );
        assert_eq!(items.observer_count(), 1);

        items.push(2);
        assert_eq!(changes(&rx).len(), 1);
    }

    #[test]
    fn rewriting_same_collection_keeps_single_observer() {
        let (tx, rx) = signal_channel();
        let a = ObservableSeq::new();
        let model = ModelObject::new().with("items", a.clone());
        let _obs = install(WatchId(1), &field(&model, "items"), tx).unwrap();
        model.set("items", a.clone());
        assert!(changes(&rx).is_empty());
        assert_eq!(a.observer_count(), 1);
    }

    #[test]
    fn map_fires_per_key() {
        let (tx, rx) = signal_channel();
        let prefs = ObservableMap::new();
        let model = ModelObject::new().with("prefs", prefs.clone());
        let obs = install(WatchId(1), &field(&model, "prefs"), tx).unwrap();
        assert_eq!(obs.kind(), ValueKind::Map);

        prefs.insert("theme", "dark");
        prefs.insert("lang", "en");
        prefs.remove("theme");
        let got = changes(&rx);
        assert_eq!(got.len(), 3);
        assert!(matches!(&got[0], Change::Key { key, .. } if key == "theme"));
        assert_eq!(got[2].length_delta(), -1);
    }

    #[test]
    fn close_is_idempotent_and_releases_everything() {
        let (tx, rx) = signal_channel();
        let items = ObservableSeq::new();
        let model = ModelObject::new().with("items", items.clone());
        let mut obs = install(WatchId(1), &field(&model, "items"), tx).unwrap();
        assert_eq!(model.observer_count(), 1);
        assert_eq!(items.observer_count(), 1);

        obs.close();
        obs.close();
        assert!(obs.is_closed());
        assert_eq!(model.observer_count(), 0);
        assert_eq!(items.observer_count(), 0);

        items.push(1);
        model.set("items", ObservableSeq::new());
        assert!(changes(&rx).is_empty());
    }

    #[test]
    fn close_after_model_dropped_is_safe() {
        let (tx, _rx) = signal_channel();
        let seq = ObservableSeq::new();
        let mut obs = install(WatchId(1), &WatchTarget::Sequence(seq.clone()), tx).unwrap();
        drop(seq);
        obs.close();
        obs.close();
    }

    #[test]
    fn invalid_path_fails_synchronously() {
        let (tx, _rx) = signal_channel();
        let model = ModelObject::new();
        assert!(matches!(
            install(WatchId(1), &field(&model, "a..b"), tx),
            Err(WatchError::InvalidPath { .. })
        ));
    }
}
