//! HTML serialization of a subtree, for debugging and tests.

use std::fmt::Write;

use super::node::{NodeData, NodeId, NodeKind};
use super::tree::Dom;
use crate::widget::capability::DISABLED;
use crate::widget::Accessor;

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            c => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Attributes of an element in output order: class, typed properties,
/// state flags, style, `data-*`.
fn attributes(data: &NodeData) -> Vec<(String, Option<String>)> {
    let mut attrs = Vec::new();
    let Some(class) = data.class() else {
        return attrs;
    };
    if !data.classes.is_empty() {
        attrs.push(("class".to_owned(), Some(data.classes.join(" "))));
    }
    for (name, value) in &data.props {
        let Some(accessor) = class.accessor(name) else {
            continue;
        };
        match accessor {
            Accessor::Flag => {
                if value.is_truthy() {
                    attrs.push((name.clone(), None));
                }
            }
            accessor => {
                if let Some(rendered) = accessor.render(value) {
                    attrs.push((name.clone(), Some(rendered)));
                }
            }
        }
    }
    if data.is_disabled() && class.has_capability(DISABLED.name) {
        attrs.push(("disabled".to_owned(), None));
    }
    if data.hidden {
        attrs.push(("hidden".to_owned(), None));
    }
    if !data.style.is_empty() {
        let style = data
            .style
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join("; ");
        attrs.push(("style".to_owned(), Some(style)));
    }
    for (key, value) in &data.data {
        attrs.push((format!("data-{key}"), Some(value.clone())));
    }
    attrs
}

impl Dom {
    /// Serialize `node` and its subtree as HTML. Unknown nodes yield an
    /// empty string.
    pub fn to_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// Serialize the children of `node`, without `node` itself.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_html(child, &mut out);
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.get(node) else {
            return;
        };
        let class = match &data.kind {
            NodeKind::Text(text) => {
                out.push_str(&escape_text(text));
                return;
            }
            NodeKind::Element(class) => class,
        };
        let element = class.element_name();
        out.push('<');
        out.push_str(element);
        for (name, value) in attributes(data) {
            match value {
                Some(value) => {
                    let _ = write!(out, " {name}=\"{}\"", escape_attr(&value));
                }
                None => {
                    let _ = write!(out, " {name}");
                }
            }
        }
        out.push('>');
        if class.is_leaf() {
            return;
        }
        for &child in self.children(node) {
            self.write_html(child, out);
        }
        let _ = write!(out, "</{element}>");
    }
}
