//! Bind targets: where `[name]` bindings land and where `:attr` members and
//! `@event` handlers are looked up.

use indexmap::IndexMap;

use crate::dom::{Dom, NodeId};
use crate::eval::{Env, Value};
use crate::event::Callback;

/// An object templates can bind widgets onto.
pub trait BindTarget {
    /// Node bound under `name`.
    fn bound(&self, name: &str) -> Option<NodeId>;

    /// Whether `name` is already in use; a taken name is never rebound.
    fn is_taken(&self, name: &str) -> bool {
        self.bound(name).is_some()
    }

    fn bind(&mut self, name: &str, node: NodeId);

    /// Forget the node bound under `name`; used when a failed render is
    /// rolled back.
    fn unbind(&mut self, name: &str);

    /// Value projected by `:attr="name"`.
    fn member(&self, name: &str) -> Option<Value>;

    /// Callback wired by `@event="name"`.
    fn handler(&self, name: &str) -> Option<Callback>;
}

/// Plain bind target: bound nodes plus caller-provided members and handlers.
///
/// ```
/// use flare::render::{BindTarget, Bindings};
///
/// let target = Bindings::new().with_member("title", "Hi");
/// assert!(target.is_taken("title"));
/// assert!(target.bound("title").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    nodes: IndexMap<String, NodeId>,
    members: IndexMap<String, Value>,
    handlers: IndexMap<String, Callback>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide a member for `:attr` projections (builder).
    pub fn with_member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.members.insert(name.into(), value.into());
        self
    }

    /// Provide a handler for `@event` attributes (builder).
    pub fn with_handler(mut self, name: impl Into<String>, callback: Callback) -> Self {
        self.handlers.insert(name.into(), callback);
        self
    }

    /// Node bound under `name`.
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name).copied()
    }

    /// Bound names with their nodes, in binding order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.nodes.iter().map(|(n, id)| (n.as_str(), *id))
    }

    /// Members plus bound nodes (as [`Value::Node`]), ready to be passed to
    /// a later render as its environment.
    pub fn to_env(&self) -> Env {
        let mut env = self.members.clone();
        env.extend(self.iter().map(|(name, node)| (name.to_owned(), Value::Node(node))));
        env
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl BindTarget for Bindings {
    fn bound(&self, name: &str) -> Option<NodeId> {
        self.get(name)
    }

    fn is_taken(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
            || self.members.contains_key(name)
            || self.handlers.contains_key(name)
    }

    fn bind(&mut self, name: &str, node: NodeId) {
        self.nodes.insert(name.to_owned(), node);
    }

    fn unbind(&mut self, name: &str) {
        self.nodes.shift_remove(name);
    }

    fn member(&self, name: &str) -> Option<Value> {
        self.members.get(name).cloned()
    }

    fn handler(&self, name: &str) -> Option<Callback> {
        self.handlers.get(name).cloned()
    }
}

/// Whether `name` is a valid binding name: an ASCII letter or `_`, then
/// ASCII letters, digits or `_`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The bind target of one render pass.
pub(crate) enum BindTo<'a> {
    Nothing,
    /// A node of the tree itself (bindings land in its `bound` map).
    Node(NodeId),
    External(&'a mut dyn BindTarget),
}

impl BindTo<'_> {
    pub(crate) fn is_set(&self) -> bool {
        !matches!(self, BindTo::Nothing)
    }

    pub(crate) fn is_taken(&self, dom: &Dom, name: &str) -> bool {
        match self {
            BindTo::Nothing => false,
            BindTo::Node(node) => dom.get(*node).is_some_and(|data| {
                data.bound.contains_key(name)
                    || data.handlers.contains_key(name)
                    || data.fields.contains_key(name)
            }),
            BindTo::External(target) => target.is_taken(name),
        }
    }

    pub(crate) fn bind(&mut self, dom: &mut Dom, name: &str, node: NodeId) {
        match self {
            BindTo::Nothing => {}
            BindTo::Node(target) => {
                if let Err(e) = dom.bind(*target, name, node) {
                    log::warn!("cannot bind '{name}': {e}");
                }
            }
            BindTo::External(target) => target.bind(name, node),
        }
    }

    pub(crate) fn unbind(&mut self, dom: &mut Dom, name: &str) {
        match self {
            BindTo::Nothing => {}
            BindTo::Node(target) => {
                dom.unbind(*target, name);
            }
            BindTo::External(target) => target.unbind(name),
        }
    }

    pub(crate) fn member(&self, dom: &Dom, name: &str) -> Option<Value> {
        match self {
            BindTo::Nothing => None,
            BindTo::Node(node) => dom.member(*node, name),
            BindTo::External(target) => target.member(name),
        }
    }

    pub(crate) fn handler(&self, dom: &Dom, name: &str) -> Option<Callback> {
        match self {
            BindTo::Nothing => None,
            BindTo::Node(node) => dom.get(*node).and_then(|d| d.handlers.get(name).cloned()),
            BindTo::External(target) => target.handler(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        for ok in ["a", "_", "_x1", "myLink", "A_B_9"] {
            assert!(is_identifier(ok), "{ok}");
        }
        for bad in ["", "1a", "a-b", "a b", "ä", "$x"] {
            assert!(!is_identifier(bad), "{bad}");
        }
    }

    #[test]
    fn bindings_track_names() {
        let mut dom = Dom::new();
        let node = dom.create_text("x");
        let mut target = Bindings::new()
            .with_member("title", "T")
            .with_handler("go", Callback::new(|_, _| {}));
        assert!(target.is_taken("title"));
        assert!(target.is_taken("go"));
        assert!(!target.is_taken("s"));
        target.bind("s", node);
        assert_eq!(target.get("s"), Some(node));
        assert_eq!(target.iter().collect::<Vec<_>>(), vec![("s", node)]);
        assert_eq!(target.member("title"), Some(Value::from("T")));
        assert!(target.handler("go").is_some());
        assert!(target.handler("stop").is_none());
        let env = target.to_env();
        assert_eq!(env.get("title"), Some(&Value::from("T")));
        assert_eq!(env.get("s"), Some(&Value::Node(node)));
        target.unbind("s");
        assert!(target.is_empty());
    }

    #[test]
    fn node_target_uses_node_maps() {
        let mut dom = Dom::new();
        let host = dom.create_tag("div").unwrap();
        let child = dom.create_tag("span").unwrap();
        dom.set_field(host, "label", Value::from("L")).unwrap();
        let mut to = BindTo::Node(host);
        assert!(to.is_set());
        assert!(to.is_taken(&dom, "label"));
        to.bind(&mut dom, "child", child);
        assert!(to.is_taken(&dom, "child"));
        assert_eq!(dom.get(host).unwrap().bound.get("child"), Some(&child));
        assert_eq!(dom.get(child).unwrap().bound_by, Some(host));
        assert_eq!(to.member(&dom, "label"), Some(Value::from("L")));
        to.unbind(&mut dom, "child");
        assert!(!to.is_taken(&dom, "child"));
        assert!(!BindTo::Nothing.is_set());
    }
}
