#![forbid(unsafe_code)]

//! Host-side observer lists.
//!
//! Every observable container owns an [`ObserverList`]. Registering a
//! callback returns a [`HostSubscription`]; closing the subscription removes
//! the callback and deactivates it immediately, even if a notification is
//! being dispatched at that moment.
//!
//! # Invariants
//!
//! 1. Callbacks run in registration order.
//! 2. A closed subscription never fires again, including for an event whose
//!    dispatch already started.
//! 3. Dispatch never holds the list borrow while a callback runs, so
//!    callbacks may subscribe or close freely.
//! 4. Closing after the container was dropped is a no-op.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

struct Entry<E> {
    id: u64,
    active: Cell<bool>,
    callback: Box<dyn Fn(&E)>,
}

struct ListInner<E> {
    next_id: u64,
    entries: Vec<Rc<Entry<E>>>,
}

/// Callbacks observing one container.
pub(crate) struct ObserverList<E> {
    inner: Rc<RefCell<ListInner<E>>>,
}

impl<E> Clone for ObserverList<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: 'static> ObserverList<E> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(ListInner {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    pub(crate) fn subscribe(&self, callback: impl Fn(&E) + 'static) -> HostSubscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push(Rc::new(Entry {
                id,
                active: Cell::new(true),
                callback: Box::new(callback),
            }));
            id
        };

        let list: Weak<RefCell<ListInner<E>>> = Rc::downgrade(&self.inner);
        HostSubscription::new(move || {
            if let Some(list) = list.upgrade() {
                list.borrow_mut().entries.retain(|entry| {
                    if entry.id == id {
                        entry.active.set(false);
                        false
                    } else {
                        true
                    }
                });
            }
        })
    }

    pub(crate) fn notify(&self, event: &E) {
        let snapshot: Vec<Rc<Entry<E>>> = self.inner.borrow().entries.clone();
        for entry in snapshot {
            if entry.active.get() {
                (entry.callback)(event);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }
}

/// Release handle for one host observer.
///
/// Dropping the handle closes it.
pub struct HostSubscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl HostSubscription {
    fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// Stop observing. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }

    /// Whether [`close`](Self::close) already ran.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.release.is_none()
    }
}

impl Drop for HostSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for HostSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSubscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}
