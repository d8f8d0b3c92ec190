//! Widget classes: a tag's host element, leaf flag, property table and hooks.

use indexmap::IndexMap;

use super::capability::{Accessor, Capability, GLOBAL};
use crate::dom::{Dom, DomError, NodeId};

/// Runs right after a node of the class has been created, e.g. to pre-build
/// fixed children.
pub type BuildHook = fn(&mut Dom, NodeId) -> Result<(), DomError>;

/// Runs when a template binds a node of the class under a name.
pub type BindHook = fn(&mut Dom, NodeId, &str);

/// Describes one kind of widget.
///
/// ```
/// use flare::widget::{capability, WidgetClass};
///
/// let link = WidgetClass::new("a").with(capability::HREF).with(capability::TARGET);
/// assert!(link.accessor("HREF").is_some());
/// assert!(link.accessor("src").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct WidgetClass {
    name: String,
    element: String,
    leaf: bool,
    capabilities: Vec<&'static str>,
    properties: IndexMap<String, Accessor>,
    build: Option<BuildHook>,
    on_bind: Option<BindHook>,
}

impl WidgetClass {
    /// A class named `name` (lowercased), rendered as a `<name>` element,
    /// with the global properties.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into().to_ascii_lowercase();
        Self {
            element: name.clone(),
            name,
            leaf: false,
            capabilities: Vec::new(),
            properties: IndexMap::new(),
            build: None,
            on_bind: None,
        }
        .with(GLOBAL)
    }

    /// A class inheriting everything from `base` except its name.
    pub fn extends(base: &WidgetClass, name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_lowercase(),
            ..base.clone()
        }
    }

    /// Render nodes of this class as `element` (builder).
    pub fn element(mut self, element: impl Into<String>) -> Self {
        self.element = element.into().to_ascii_lowercase();
        self
    }

    /// Mark the class as a leaf: it never has children and needs no closing
    /// tag (builder).
    pub fn leaf(mut self) -> Self {
        self.leaf = true;
        self
    }

    /// Add a capability's properties (builder).
    pub fn with(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability.name) {
            self.capabilities.push(capability.name);
        }
        for (name, accessor) in capability.properties {
            self.properties.insert((*name).to_owned(), *accessor);
        }
        self
    }

    /// Add a single property (builder).
    pub fn property(mut self, name: impl Into<String>, accessor: Accessor) -> Self {
        self.properties
            .insert(name.into().to_ascii_lowercase(), accessor);
        self
    }

    /// Set the build hook (builder).
    pub fn on_build(mut self, hook: BuildHook) -> Self {
        self.build = Some(hook);
        self
    }

    /// Set the bind hook (builder).
    pub fn on_bind(mut self, hook: BindHook) -> Self {
        self.on_bind = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host element name.
    pub fn element_name(&self) -> &str {
        &self.element
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| *c == name)
    }

    /// Accessor of property `name`, case-insensitively.
    pub fn accessor(&self, name: &str) -> Option<Accessor> {
        self.properties
            .get(name)
            .or_else(|| self.properties.get(&name.to_ascii_lowercase()))
            .copied()
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, Accessor)> {
        self.properties.iter().map(|(n, a)| (n.as_str(), *a))
    }

    /// Lowercase names of all settable properties.
    pub fn attribute_names(&self) -> Vec<String> {
        self.properties.keys().cloned().collect()
    }

    pub fn build_hook(&self) -> Option<BuildHook> {
        self.build
    }

    pub fn bind_hook(&self) -> Option<BindHook> {
        self.on_bind
    }
}
