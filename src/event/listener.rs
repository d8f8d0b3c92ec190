//! Deferred event-listener registrations.
//!
//! A node keeps its `(event, callback)` pairs as plain data whether or not it
//! is attached. [`Dom::attach`](crate::dom::Dom::attach) and
//! [`Dom::detach`](crate::dom::Dom::detach) reconcile them with the host,
//! installing and removing the real listeners.

use std::fmt;
use std::rc::Rc;

use super::dispatch::Event;
use crate::dom::{Dom, DomError};

// ---------------------------------------------------------------------------
// Callback
// ---------------------------------------------------------------------------

/// Shared event callback. Identity (for removal and duplicate checks) is the
/// identity of the underlying closure allocation.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&mut Dom, &mut Event)>);

impl Callback {
    pub fn new(f: impl Fn(&mut Dom, &mut Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, dom: &mut Dom, event: &mut Event) {
        (self.0)(dom, event)
    }

    /// Whether both handles refer to the same closure.
    pub fn ptr_eq(&self, other: &Callback) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0))
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// Host-side handle of one listener, unique per [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// One registration on a node.
#[derive(Debug, Clone)]
pub struct Listener {
    pub id: ListenerId,
    pub event: String,
    pub callback: Callback,
    /// Whether the host currently has this listener installed.
    pub installed: bool,
}

/// All registrations of a single node, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Listeners {
    entries: Vec<Listener>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`. The same closure may be registered
    /// once per event name.
    pub fn add(&mut self, id: ListenerId, event: &str, callback: Callback) -> Result<(), DomError> {
        if self.position(event, &callback).is_some() {
            return Err(DomError::DuplicateListener {
                event: event.to_owned(),
            });
        }
        self.entries.push(Listener {
            id,
            event: event.to_owned(),
            callback,
            installed: false,
        });
        Ok(())
    }

    /// Remove the registration of `callback` for `event`.
    pub fn remove(&mut self, event: &str, callback: &Callback) -> Result<Listener, DomError> {
        let index = self
            .position(event, callback)
            .ok_or_else(|| DomError::ListenerNotFound {
                event: event.to_owned(),
            })?;
        Ok(self.entries.remove(index))
    }

    fn position(&self, event: &str, callback: &Callback) -> Option<usize> {
        self.entries
            .iter()
            .position(|l| l.event == event && l.callback.ptr_eq(callback))
    }

    /// Callbacks of installed listeners for `event`.
    pub fn installed_for(&self, event: &str) -> Vec<Callback> {
        self.entries
            .iter()
            .filter(|l| l.installed && l.event == event)
            .map(|l| l.callback.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listener> {
        self.entries.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Listener> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of registrations currently installed on the host.
    pub fn installed_count(&self) -> usize {
        self.entries.iter().filter(|l| l.installed).count()
    }
}
