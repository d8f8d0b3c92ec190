//! Node types: NodeId, NodeKind, NodeData.

use std::sync::Arc;

use indexmap::IndexMap;
use slotmap::new_key_type;

use super::DomError;
use crate::eval::Value;
use crate::event::{Callback, Listeners};
use crate::widget::{Accessor, WidgetClass};

new_key_type! {
    /// Unique identifier for a widget node. Copy, lightweight (u64).
    pub struct NodeId;
}

/// What a node is: a widget element or a run of text.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Element(Arc<WidgetClass>),
    Text(String),
}

/// Data associated with a single node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    /// CSS classes, in insertion order.
    pub classes: Vec<String>,
    /// Inline style declarations.
    pub style: IndexMap<String, String>,
    /// `data-*` attributes, keyed without the prefix.
    pub data: IndexMap<String, String>,
    /// Typed property values, keyed by lowercase property name.
    pub props: IndexMap<String, Value>,
    /// Plain fields for attributes the widget class does not know.
    pub fields: IndexMap<String, Value>,
    /// Nodes bound onto this node by name (when it is a bind target).
    pub bound: IndexMap<String, NodeId>,
    /// Node whose `bound` map holds this node, if any.
    pub bound_by: Option<NodeId>,
    /// Named callbacks `@event` attributes may refer to.
    pub handlers: IndexMap<String, Callback>,
    /// Pre-built children reused by templates (a table's `thead`/`tbody`).
    pub slots: IndexMap<String, NodeId>,
    pub hidden: bool,
    pub(crate) disabled: u32,
    pub(crate) attached: bool,
    pub(crate) listeners: Listeners,
}

impl NodeData {
    fn with_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            classes: Vec::new(),
            style: IndexMap::new(),
            data: IndexMap::new(),
            props: IndexMap::new(),
            fields: IndexMap::new(),
            bound: IndexMap::new(),
            bound_by: None,
            handlers: IndexMap::new(),
            slots: IndexMap::new(),
            hidden: false,
            disabled: 0,
            attached: false,
            listeners: Listeners::new(),
        }
    }

    /// A new element of `class`.
    pub fn element(class: Arc<WidgetClass>) -> Self {
        Self::with_kind(NodeKind::Element(class))
    }

    /// A new text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Text(text.into()))
    }

    /// Set the `id` property (builder).
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.props.insert("id".into(), Value::Str(id.into()));
        self
    }

    /// Add a single CSS class (builder).
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
        self
    }

    /// Register a named handler for `@event` attributes (builder).
    pub fn with_handler(mut self, name: impl Into<String>, callback: Callback) -> Self {
        self.handlers.insert(name.into(), callback);
        self
    }

    /// Set a plain field (builder).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// The widget class, `None` for text nodes.
    pub fn class(&self) -> Option<&Arc<WidgetClass>> {
        match &self.kind {
            NodeKind::Element(class) => Some(class),
            NodeKind::Text(_) => None,
        }
    }

    /// Widget class name, `"#text"` for text nodes.
    pub fn widget_type(&self) -> &str {
        match &self.kind {
            NodeKind::Element(class) => class.name(),
            NodeKind::Text(_) => "#text",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text(_))
    }

    /// Text of a text node.
    pub fn text_value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element(_) => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.props.get("id").and_then(Value::as_str)
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled > 0
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Check whether this node has a given CSS class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Add a CSS class. No-op if already present.
    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_owned());
        }
    }

    /// Remove a CSS class. No-op if not present.
    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    /// Toggle a CSS class: add if absent, remove if present.
    pub fn toggle_class(&mut self, class: &str) {
        if self.has_class(class) {
            self.remove_class(class);
        } else {
            self.add_class(class);
        }
    }

    /// Accessor of property `name` on this node's class.
    pub(crate) fn accessor(&self, name: &str) -> Result<Accessor, DomError> {
        let class = match &self.kind {
            NodeKind::Element(class) => class,
            NodeKind::Text(_) => {
                return Err(DomError::UnknownAttribute {
                    tag: "#text".into(),
                    name: name.to_owned(),
                })
            }
        };
        class.accessor(name).ok_or_else(|| DomError::UnknownAttribute {
            tag: class.name().to_owned(),
            name: name.to_owned(),
        })
    }

    /// Read property `name` through the class's property table.
    pub fn property(&self, name: &str) -> Result<Value, DomError> {
        let key = name.to_ascii_lowercase();
        Ok(match self.accessor(&key)? {
            Accessor::Classes => Value::Str(self.classes.join(" ")),
            Accessor::Disabled => Value::Bool(self.is_disabled()),
            Accessor::Hidden => Value::Bool(self.hidden),
            Accessor::Flag | Accessor::Switch { .. } => {
                Value::Bool(self.props.get(&key).is_some_and(Value::is_truthy))
            }
            Accessor::Text | Accessor::Integer => self.props.get(&key).cloned().unwrap_or_default(),
        })
    }

    /// Store a plain property value; node-state accessors are handled by
    /// [`Dom::set_property`](super::Dom::set_property).
    pub(crate) fn store_property(&mut self, name: &str, value: Value) -> Result<Accessor, DomError> {
        let key = name.to_ascii_lowercase();
        let accessor = self.accessor(&key)?;
        let value = accessor.coerce(&key, value)?;
        match accessor {
            Accessor::Classes => {
                self.classes.clear();
                for class in value.to_text().split_whitespace() {
                    self.add_class(class);
                }
            }
            Accessor::Hidden => self.hidden = value.is_truthy(),
            Accessor::Disabled => {}
            _ => {
                self.props.insert(key, value);
            }
        }
        Ok(accessor)
    }

    /// Value of a member for `:attr` projection: plain fields first, then
    /// typed properties.
    pub fn member(&self, name: &str) -> Option<Value> {
        self.fields
            .get(name)
            .cloned()
            .or_else(|| self.property(name).ok())
    }
}
