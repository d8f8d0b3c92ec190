//! Tree operations: create, insert, remove, reparent, walk, and the
//! attach/detach lifecycle.

use std::fmt;
use std::sync::Arc;

use slotmap::{SecondaryMap, SlotMap};

use super::host::{HeadlessHost, Host};
use super::node::{NodeData, NodeId, NodeKind};
use super::DomError;
use crate::eval::Value;
use crate::event::{Callback, ListenerId};
use crate::widget::{builtin, Accessor, WidgetClass};

/// Empty slice constant for returning when a node has no children.
const EMPTY_CHILDREN: &[NodeId] = &[];

/// The widget tree, backed by a slotmap arena.
///
/// All nodes live in a single `SlotMap`. Parent/child relationships are stored
/// in secondary maps so that node removal is O(subtree size) and lookup is O(1).
/// Every tree starts with an attached `body` node; nodes reachable from it are
/// part of the live document and have their event listeners installed on the
/// [`Host`].
pub struct Dom {
    pub(crate) nodes: SlotMap<NodeId, NodeData>,
    children: SecondaryMap<NodeId, Vec<NodeId>>,
    parent: SecondaryMap<NodeId, NodeId>,
    body: NodeId,
    host: Box<dyn Host>,
    next_listener: u64,
}

impl Dom {
    /// Create a tree mirrored onto a [`HeadlessHost`].
    pub fn new() -> Self {
        Self::with_host(HeadlessHost::new())
    }

    /// Create a tree mirrored onto `host`.
    pub fn with_host(host: impl Host + 'static) -> Self {
        let mut host: Box<dyn Host> = Box::new(host);
        let mut nodes = SlotMap::with_key();
        let mut data = NodeData::element(Arc::new(builtin::body()));
        data.attached = true;
        let body = nodes.insert(data);
        host.create_element(body, "body");
        let mut children = SecondaryMap::new();
        children.insert(body, Vec::new());
        Self {
            nodes,
            children,
            parent: SecondaryMap::new(),
            body,
            host,
            next_listener: 0,
        }
    }

    /// The document body, always attached.
    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    /// The host, downcast to its concrete type.
    pub fn host_as<T: Host + 'static>(&self) -> Option<&T> {
        self.host.as_any().downcast_ref::<T>()
    }

    // -------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------

    /// Create a detached element of `class` and run its build hook.
    pub fn create(&mut self, class: Arc<WidgetClass>) -> Result<NodeId, DomError> {
        let hook = class.build_hook();
        let element = class.element_name().to_owned();
        let id = self.nodes.insert(NodeData::element(class));
        self.children.insert(id, Vec::new());
        self.host.create_element(id, &element);
        if let Some(hook) = hook {
            hook(self, id)?;
        }
        Ok(id)
    }

    /// Create a detached element for a tag of the global registry.
    pub fn create_tag(&mut self, tag: &str) -> Result<NodeId, DomError> {
        let class =
            crate::registry::resolve_class(tag).ok_or_else(|| DomError::UnknownTag(tag.to_owned()))?;
        self.create(class)
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        let text = text.into();
        let id = self.nodes.insert(NodeData::text(text.as_str()));
        self.children.insert(id, Vec::new());
        self.host.create_text(id, &text);
        id
    }

    // -------------------------------------------------------------------
    // Structure
    // -------------------------------------------------------------------

    fn check(&self, id: NodeId) -> Result<&NodeData, DomError> {
        self.nodes.get(id).ok_or(DomError::UnknownNode(id))
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.check(parent)?.is_text() {
            return Err(DomError::NotAnElement(parent));
        }
        self.check(child)?;
        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(DomError::CycleDetected { parent, child });
        }
        Ok(())
    }

    fn position(&self, parent: NodeId, child: NodeId) -> Result<usize, DomError> {
        self.children(parent)
            .iter()
            .position(|&c| c == child)
            .ok_or(DomError::NotAChild { parent, child })
    }

    /// Unlink `child` from its current parent, detaching it from the live
    /// document if needed.
    fn unlink(&mut self, child: NodeId) {
        if let Some(old_parent) = self.parent.remove(child) {
            if let Some(siblings) = self.children.get_mut(old_parent) {
                siblings.retain(|&c| c != child);
            }
            self.host.remove_child(old_parent, child);
        }
        if self.nodes.get(child).is_some_and(NodeData::is_attached) {
            self.detach(child);
        }
    }

    /// Link an unlinked `child` into `parent` at `index`.
    fn link(&mut self, parent: NodeId, child: NodeId, index: usize) {
        let next = self.children(parent).get(index).copied();
        self.parent.insert(child, parent);
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.insert(index, child);
        }
        match next {
            Some(anchor) => self.host.insert_before(parent, child, anchor),
            None => self.host.append_child(parent, child),
        }
        if self.nodes.get(parent).is_some_and(NodeData::is_attached) {
            self.attach(child);
        }
    }

    /// Append `child` as the last child of `parent`, moving it away from any
    /// previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.unlink(child);
        let index = self.children(parent).len();
        self.link(parent, child, index);
        Ok(())
    }

    /// Insert `child` as the first child of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.unlink(child);
        self.link(parent, child, 0);
        Ok(())
    }

    /// Insert `child` right before `anchor`, which must be a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        anchor: NodeId,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.position(parent, anchor)?;
        if child == anchor {
            return Ok(());
        }
        self.unlink(child);
        let index = self.position(parent, anchor)?;
        self.link(parent, child, index);
        Ok(())
    }

    /// Insert `child` right after `anchor`, which must be a child of `parent`.
    pub fn insert_after(
        &mut self,
        parent: NodeId,
        child: NodeId,
        anchor: NodeId,
    ) -> Result<(), DomError> {
        self.check_insert(parent, child)?;
        self.position(parent, anchor)?;
        if child == anchor {
            return Ok(());
        }
        self.unlink(child);
        let index = self.position(parent, anchor)? + 1;
        self.link(parent, child, index);
        Ok(())
    }

    /// Remove `child` from `parent`. The child and its subtree stay alive
    /// (detached) and can be inserted elsewhere.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check(parent)?;
        self.position(parent, child)?;
        self.unlink(child);
        Ok(())
    }

    /// Remove all children of `parent`, returning them in their former order.
    pub fn remove_all_children(&mut self, parent: NodeId) -> Result<Vec<NodeId>, DomError> {
        self.check(parent)?;
        let kids = self.children(parent).to_vec();
        for &child in &kids {
            self.unlink(child);
        }
        Ok(kids)
    }

    /// Replace all children of `parent` with `children`.
    pub fn replace_children(&mut self, parent: NodeId, children: &[NodeId]) -> Result<(), DomError> {
        for &child in children {
            self.check_insert(parent, child)?;
        }
        self.remove_all_children(parent)?;
        for &child in children {
            self.append_child(parent, child)?;
        }
        Ok(())
    }

    /// Reorder the children of `parent` by `key`, descending when `reverse`
    /// is set. Equal keys keep their current order. Children stay attached;
    /// the host sees each one moved to its new place.
    pub fn sort_children<K, F>(
        &mut self,
        parent: NodeId,
        mut key: F,
        reverse: bool,
    ) -> Result<(), DomError>
    where
        K: Ord,
        F: FnMut(&Dom, NodeId) -> K,
    {
        self.check(parent)?;
        let current = self.children(parent).to_vec();
        let mut sorted = current.clone();
        let dom: &Dom = self;
        sorted.sort_by_cached_key(|&child| key(dom, child));
        if reverse {
            sorted.reverse();
        }
        if sorted == current {
            return Ok(());
        }
        for &child in &sorted {
            self.host.remove_child(parent, child);
            self.host.append_child(parent, child);
        }
        if let Some(siblings) = self.children.get_mut(parent) {
            *siblings = sorted;
        }
        Ok(())
    }

    /// Remove a node and all its descendants from the arena. Bindings other
    /// nodes hold onto the removed nodes are dropped with them.
    ///
    /// Returns the `NodeData` of the removed node.
    pub fn destroy(&mut self, id: NodeId) -> Result<NodeData, DomError> {
        self.check(id)?;
        self.unlink(id);
        if self.nodes.get(id).is_some_and(NodeData::is_attached) {
            self.detach(id);
        }

        let mut removed = None;
        let mut owners = Vec::new();
        for current in self.walk_depth_first(id) {
            self.children.remove(current);
            self.parent.remove(current);
            let Some(data) = self.nodes.remove(current) else {
                continue;
            };
            if let Some(owner) = data.bound_by {
                owners.push((owner, current));
            }
            if current == id {
                removed = Some(data);
            }
        }
        // Bindings onto surviving owners must not outlive the node.
        for (owner, node) in owners {
            if let Some(data) = self.nodes.get_mut(owner) {
                data.bound.retain(|_, bound| *bound != node);
            }
        }
        removed.ok_or(DomError::UnknownNode(id))
    }

    /// Whether `ancestor` is a (strict) ancestor of `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        while let Some(p) = self.parent.get(current).copied() {
            if p == ancestor {
                return true;
            }
            current = p;
        }
        false
    }

    /// Get the parent of a node, if it has one.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(id).copied()
    }

    /// Get the children of a node. Returns an empty slice if the node has no children
    /// or does not exist.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Walk from `id` up to the root, collecting ancestor node ids.
    ///
    /// The returned vec does **not** include `id` itself; it starts with the
    /// immediate parent and ends at the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Immutable access to a node's data.
    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }

    /// Mutable access to a node's data.
    ///
    /// Changes made here bypass the host; prefer the `Dom` setters for
    /// anything the document shows.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id)
    }

    /// Number of nodes in the arena, including the body.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty (only after the body was destroyed).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the DOM contains a node with the given id.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }

    // -------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------

    /// Mark `node` and its subtree attached and install their pending
    /// listeners on the host. Already installed listeners are left alone.
    pub fn attach(&mut self, node: NodeId) {
        for id in self.walk_depth_first(node) {
            let Some(data) = self.nodes.get_mut(id) else {
                continue;
            };
            data.attached = true;
            for listener in data.listeners.iter_mut().filter(|l| !l.installed) {
                self.host.add_listener(id, &listener.event, listener.id);
                listener.installed = true;
            }
        }
    }

    /// Mark `node` and its subtree detached and uninstall their listeners.
    /// The registrations themselves are kept for the next attach.
    pub fn detach(&mut self, node: NodeId) {
        for id in self.walk_depth_first(node) {
            let Some(data) = self.nodes.get_mut(id) else {
                continue;
            };
            data.attached = false;
            for listener in data.listeners.iter_mut().filter(|l| l.installed) {
                self.host.remove_listener(id, &listener.event, listener.id);
                listener.installed = false;
            }
        }
    }

    /// Register `callback` for `event` on `node`. It is installed on the host
    /// right away when the node is attached, otherwise on the next attach.
    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        callback: Callback,
    ) -> Result<ListenerId, DomError> {
        let data = self.nodes.get_mut(node).ok_or(DomError::UnknownNode(node))?;
        let id = ListenerId(self.next_listener);
        data.listeners.add(id, event, callback)?;
        self.next_listener += 1;
        if data.attached {
            self.host.add_listener(node, event, id);
            for listener in data.listeners.iter_mut().filter(|l| l.id == id) {
                listener.installed = true;
            }
        }
        Ok(id)
    }

    /// Remove a registration made with [`add_event_listener`](Self::add_event_listener).
    pub fn remove_event_listener(
        &mut self,
        node: NodeId,
        event: &str,
        callback: &Callback,
    ) -> Result<(), DomError> {
        let data = self.nodes.get_mut(node).ok_or(DomError::UnknownNode(node))?;
        let listener = data.listeners.remove(event, callback)?;
        if listener.installed {
            self.host.remove_listener(node, event, listener.id);
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Node state
    // -------------------------------------------------------------------

    fn sync_classes(&mut self, node: NodeId) {
        if let Some(data) = self.nodes.get(node) {
            let classes = data.classes.join(" ");
            self.host.set_attribute(node, "class", Some(&classes));
        }
    }

    /// Add whitespace-separated `classes` to `node`.
    pub fn add_class(&mut self, node: NodeId, classes: &str) {
        if let Some(data) = self.nodes.get_mut(node) {
            for class in classes.split_whitespace() {
                data.add_class(class);
            }
            self.sync_classes(node);
        }
    }

    /// Remove whitespace-separated `classes` from `node`.
    pub fn remove_class(&mut self, node: NodeId, classes: &str) {
        if let Some(data) = self.nodes.get_mut(node) {
            for class in classes.split_whitespace() {
                data.remove_class(class);
            }
            self.sync_classes(node);
        }
    }

    /// Toggle each of the whitespace-separated `classes` on `node`.
    pub fn toggle_class(&mut self, node: NodeId, classes: &str) {
        if let Some(data) = self.nodes.get_mut(node) {
            for class in classes.split_whitespace() {
                data.toggle_class(class);
            }
            self.sync_classes(node);
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes.get(node).is_some_and(|d| d.has_class(class))
    }

    /// Raise or lower the disabled counter of `node` and all its descendants.
    ///
    /// A node is disabled while its counter is positive, so nested disables
    /// need the same number of enables.
    pub fn set_disabled(&mut self, node: NodeId, disable: bool) {
        for id in self.walk_depth_first(node) {
            let Some(data) = self.nodes.get_mut(id) else {
                continue;
            };
            let native = data
                .class()
                .is_some_and(|c| c.has_capability(crate::widget::capability::DISABLED.name));
            if disable {
                data.disabled += 1;
                if native && data.disabled == 1 {
                    self.host.set_attribute(id, "disabled", Some(""));
                }
            } else if data.disabled > 0 {
                if native && data.disabled == 1 {
                    self.host.set_attribute(id, "disabled", None);
                }
                data.disabled -= 1;
            }
        }
    }

    /// Disable `node` unless it already is.
    pub fn disable(&mut self, node: NodeId) {
        if self.nodes.get(node).is_some_and(|d| !d.is_disabled()) {
            self.set_disabled(node, true);
        }
    }

    /// Enable `node` if it is disabled.
    pub fn enable(&mut self, node: NodeId) {
        if self.nodes.get(node).is_some_and(NodeData::is_disabled) {
            self.set_disabled(node, false);
        }
    }

    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(NodeData::is_disabled)
    }

    fn set_hidden(&mut self, node: NodeId, hidden: bool) {
        if let Some(data) = self.nodes.get_mut(node) {
            data.hidden = hidden;
            self.host
                .set_attribute(node, "hidden", hidden.then_some(""));
        }
    }

    pub fn hide(&mut self, node: NodeId) {
        self.set_hidden(node, true);
    }

    pub fn show(&mut self, node: NodeId) {
        self.set_hidden(node, false);
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.nodes.get(node).is_some_and(|d| d.hidden)
    }

    fn element_mut(&mut self, node: NodeId) -> Result<&mut NodeData, DomError> {
        let data = self.nodes.get_mut(node).ok_or(DomError::UnknownNode(node))?;
        if data.is_text() {
            return Err(DomError::NotAnElement(node));
        }
        Ok(data)
    }

    /// Set a typed property through the class's property table.
    pub fn set_property(&mut self, node: NodeId, name: &str, value: Value) -> Result<(), DomError> {
        let data = self.element_mut(node)?;
        let key = name.to_ascii_lowercase();
        match data.accessor(&key)? {
            Accessor::Disabled => {
                if value.is_truthy() {
                    self.disable(node);
                } else {
                    self.enable(node);
                }
            }
            Accessor::Hidden => self.set_hidden(node, value.is_truthy()),
            Accessor::Classes => {
                data.store_property(&key, value)?;
                self.sync_classes(node);
            }
            accessor => {
                data.store_property(&key, value)?;
                let rendered = data.props.get(&key).and_then(|v| accessor.render(v));
                self.host.set_attribute(node, &key, rendered.as_deref());
            }
        }
        Ok(())
    }

    /// Read a typed property through the class's property table.
    pub fn property(&self, node: NodeId, name: &str) -> Result<Value, DomError> {
        self.check(node)?.property(name)
    }

    /// Set one inline style declaration.
    pub fn set_style(&mut self, node: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let data = self.element_mut(node)?;
        data.style.insert(name.to_owned(), value.to_owned());
        let style = data
            .style
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");
        self.host.set_attribute(node, "style", Some(&style));
        Ok(())
    }

    /// Set a `data-*` entry (`key` without the prefix).
    pub fn set_data(&mut self, node: NodeId, key: &str, value: &str) -> Result<(), DomError> {
        self.element_mut(node)?
            .data
            .insert(key.to_owned(), value.to_owned());
        self.host
            .set_attribute(node, &format!("data-{key}"), Some(value));
        Ok(())
    }

    /// Set a plain field, invisible to the host.
    pub fn set_field(&mut self, node: NodeId, name: &str, value: Value) -> Result<(), DomError> {
        self.element_mut(node)?.fields.insert(name.to_owned(), value);
        Ok(())
    }

    /// Field or property `name` of `node`.
    pub fn member(&self, node: NodeId, name: &str) -> Option<Value> {
        self.nodes.get(node).and_then(|d| d.member(name))
    }

    /// Record `child` as the pre-built slot `name` of `node`.
    pub fn set_slot(&mut self, node: NodeId, name: &str, child: NodeId) -> Result<(), DomError> {
        self.check(child)?;
        self.element_mut(node)?.slots.insert(name.to_owned(), child);
        Ok(())
    }

    pub fn slot(&self, node: NodeId, name: &str) -> Option<NodeId> {
        self.nodes.get(node).and_then(|d| d.slots.get(name).copied())
    }

    /// Bind `node` onto `owner` under `name`, replacing an earlier binding of
    /// that name.
    pub fn bind(&mut self, owner: NodeId, name: &str, node: NodeId) -> Result<(), DomError> {
        self.check(owner)?;
        let data = self.nodes.get_mut(node).ok_or(DomError::UnknownNode(node))?;
        data.bound_by = Some(owner);
        if let Some(owner) = self.nodes.get_mut(owner) {
            owner.bound.insert(name.to_owned(), node);
        }
        Ok(())
    }

    /// Drop the binding `name` from `owner`, returning the node it named.
    pub fn unbind(&mut self, owner: NodeId, name: &str) -> Option<NodeId> {
        let node = self.nodes.get_mut(owner)?.bound.shift_remove(name)?;
        if let Some(data) = self.nodes.get_mut(node) {
            if data.bound_by == Some(owner) {
                data.bound_by = None;
            }
        }
        Some(node)
    }

    /// Node bound onto `owner` under `name`.
    pub fn bound(&self, owner: NodeId, name: &str) -> Option<NodeId> {
        self.nodes.get(owner).and_then(|d| d.bound.get(name).copied())
    }

    /// Concatenated text of all text nodes below (and including) `node`.
    pub fn text_content(&self, node: NodeId) -> String {
        self.walk_depth_first(node)
            .into_iter()
            .filter_map(|id| self.nodes.get(id).and_then(NodeData::text_value))
            .collect()
    }

    /// Replace the text of a text node, or the children of an element with a
    /// single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<(), DomError> {
        let data = self.nodes.get_mut(node).ok_or(DomError::UnknownNode(node))?;
        if let NodeKind::Text(current) = &mut data.kind {
            text.clone_into(current);
            self.host.set_text(node, text);
            return Ok(());
        }
        for child in self.remove_all_children(node)? {
            self.destroy(child)?;
        }
        if !text.is_empty() {
            let text = self.create_text(text);
            self.append_child(node, text)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dom")
            .field("nodes", &self.nodes.len())
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}
