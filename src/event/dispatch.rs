//! Event dispatch: bubble path computation and delivery to installed listeners.
//!
//! [`Dom::dispatch`] delivers an [`Event`] to the target node and then to each
//! ancestor in turn, stopping once a callback marks it handled. Only listeners
//! the host has installed (i.e. on attached nodes) see events.

use crate::dom::{Dom, NodeId};
use crate::eval::Value;

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A DOM or custom event travelling through the widget tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name, e.g. `"click"`.
    pub name: String,
    /// The node the event was dispatched on.
    pub target: Option<NodeId>,
    /// The node whose listeners are currently running.
    pub current: Option<NodeId>,
    /// Arbitrary payload.
    pub detail: Value,
    handled: bool,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            current: None,
            detail: Value::None,
            handled: false,
        }
    }

    /// Attach a payload (builder).
    pub fn with_detail(mut self, detail: impl Into<Value>) -> Self {
        self.detail = detail.into();
        self
    }

    /// Mark this event as handled, stopping further propagation.
    pub fn mark_handled(&mut self) {
        self.handled = true;
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }
}

/// Compute the bubble path from `start` up to the root (inclusive).
///
/// Returns `[start, parent, grandparent, ..., root]`.
/// If `start` does not exist in the DOM, returns an empty vec.
pub fn bubble_path(dom: &Dom, start: NodeId) -> Vec<NodeId> {
    if !dom.contains(start) {
        return Vec::new();
    }
    let mut path = vec![start];
    path.extend(dom.ancestors(start));
    path
}

impl Dom {
    /// Dispatch `event` on `target` and bubble it towards the root.
    ///
    /// Callbacks get `&mut Dom` and may restructure the tree; the bubble path
    /// is computed once, up front. Returns the event after delivery.
    pub fn dispatch(&mut self, target: NodeId, mut event: Event) -> Event {
        event.target = Some(target);
        for node in bubble_path(self, target) {
            let callbacks = match self.get(node) {
                Some(data) => data.listeners().installed_for(&event.name),
                None => continue,
            };
            event.current = Some(node);
            for callback in callbacks {
                callback.call(self, &mut event);
            }
            if event.handled {
                break;
            }
        }
        log::trace!(
            "dispatched '{}' on {target:?} (handled: {})",
            event.name,
            event.handled
        );
        event
    }
}

// ===========================================================================
// Tests
// ===========================================================================
