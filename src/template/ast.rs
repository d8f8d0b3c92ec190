//! Parsed template tree.

use indexmap::IndexMap;

/// One node of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateNode {
    /// Decoded literal text, possibly holding `{{ }}` markers.
    Text(String),
    /// A registered tag with its attributes (lowercase names, source order).
    Element {
        tag: String,
        attributes: IndexMap<String, String>,
        children: Vec<TemplateNode>,
    },
}

impl TemplateNode {
    /// Element with no attributes or children.
    pub fn element(tag: impl Into<String>) -> Self {
        TemplateNode::Element {
            tag: tag.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute (builder, elements only).
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let TemplateNode::Element { attributes, .. } = &mut self {
            attributes.insert(name.into(), value.into());
        }
        self
    }

    /// Add a child (builder, elements only).
    pub fn with_child(mut self, child: TemplateNode) -> Self {
        if let TemplateNode::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            TemplateNode::Element { tag, .. } => Some(tag),
            TemplateNode::Text(_) => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        match self {
            TemplateNode::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            TemplateNode::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[TemplateNode] {
        match self {
            TemplateNode::Element { children, .. } => children,
            TemplateNode::Text(_) => &[],
        }
    }
}

/// A parsed template: the top-level node sequence. Immutable once parsed and
/// reusable across any number of renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    pub nodes: Vec<TemplateNode>,
}

impl Template {
    pub fn new(nodes: Vec<TemplateNode>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All text runs in document order.
    pub fn texts(&self) -> Vec<&str> {
        fn collect<'a>(nodes: &'a [TemplateNode], out: &mut Vec<&'a str>) {
            for node in nodes {
                match node {
                    TemplateNode::Text(text) => out.push(text),
                    TemplateNode::Element { children, .. } => collect(children, out),
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.nodes, &mut out);
        out
    }
}
