//! Host bridge: the native document that mirrors the widget tree.
//!
//! The [`Dom`](super::Dom) owns all widget state. A [`Host`] only receives
//! the side effects (element creation, insertion, listener install/uninstall)
//! so that it can keep a native tree in sync. Listener registrations are
//! reconciled on attach/detach: a host only ever sees listeners of nodes that
//! are part of the live document.

use std::any::Any;
use std::collections::HashSet;

use super::node::NodeId;
use crate::event::ListenerId;

/// Receiver of tree side effects.
pub trait Host {
    fn create_element(&mut self, node: NodeId, element: &str);
    fn create_text(&mut self, node: NodeId, text: &str);
    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn insert_before(&mut self, parent: NodeId, child: NodeId, anchor: NodeId);
    fn remove_child(&mut self, parent: NodeId, child: NodeId);
    fn add_listener(&mut self, node: NodeId, event: &str, listener: ListenerId);
    fn remove_listener(&mut self, node: NodeId, event: &str, listener: ListenerId);

    /// Mirror an attribute change; `None` removes the attribute.
    fn set_attribute(&mut self, _node: NodeId, _name: &str, _value: Option<&str>) {}

    /// Mirror a text node's new content.
    fn set_text(&mut self, _node: NodeId, _text: &str) {}

    fn as_any(&self) -> &dyn Any;
}

/// A recorded host side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    CreateElement(NodeId, String),
    CreateText(NodeId, String),
    Append { parent: NodeId, child: NodeId },
    InsertBefore { parent: NodeId, child: NodeId, anchor: NodeId },
    Remove { parent: NodeId, child: NodeId },
    AddListener(NodeId, String, ListenerId),
    RemoveListener(NodeId, String, ListenerId),
    SetAttribute(NodeId, String, Option<String>),
    SetText(NodeId, String),
}

/// In-memory host: records every operation and tracks live listeners.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    ops: Vec<HostOp>,
    live: HashSet<ListenerId>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// All operations in the order they were issued.
    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Number of listener registrations currently installed.
    pub fn live_listeners(&self) -> usize {
        self.live.len()
    }

    pub fn is_live(&self, listener: ListenerId) -> bool {
        self.live.contains(&listener)
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }
}

impl Host for HeadlessHost {
    fn create_element(&mut self, node: NodeId, element: &str) {
        self.ops.push(HostOp::CreateElement(node, element.to_owned()));
    }

    fn create_text(&mut self, node: NodeId, text: &str) {
        self.ops.push(HostOp::CreateText(node, text.to_owned()));
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.ops.push(HostOp::Append { parent, child });
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, anchor: NodeId) {
        self.ops.push(HostOp::InsertBefore {
            parent,
            child,
            anchor,
        });
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.ops.push(HostOp::Remove { parent, child });
    }

    fn add_listener(&mut self, node: NodeId, event: &str, listener: ListenerId) {
        self.live.insert(listener);
        self.ops
            .push(HostOp::AddListener(node, event.to_owned(), listener));
    }

    fn remove_listener(&mut self, node: NodeId, event: &str, listener: ListenerId) {
        self.live.remove(&listener);
        self.ops
            .push(HostOp::RemoveListener(node, event.to_owned(), listener));
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: Option<&str>) {
        self.ops.push(HostOp::SetAttribute(
            node,
            name.to_owned(),
            value.map(str::to_owned),
        ));
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        self.ops.push(HostOp::SetText(node, text.to_owned()));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    #[test]
    fn records_ops_and_live_listeners() {
        let mut keys: SlotMap<NodeId, ()> = SlotMap::with_key();
        let a = keys.insert(());
        let mut host = HeadlessHost::new();
        host.create_element(a, "div");
        host.add_listener(a, "click", ListenerId(1));
        assert_eq!(host.live_listeners(), 1);
        assert!(host.is_live(ListenerId(1)));
        host.remove_listener(a, "click", ListenerId(1));
        assert_eq!(host.live_listeners(), 0);
        assert_eq!(host.ops().len(), 3);
        assert_eq!(host.ops()[0], HostOp::CreateElement(a, "div".into()));
        host.clear_ops();
        assert!(host.ops().is_empty());
    }
}
