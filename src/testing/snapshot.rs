//! Snapshot rendering helpers.
//!
//! Functions for turning templates and rendered nodes into HTML strings
//! suitable for snapshot testing and assertions.

use crate::dom::{Dom, NodeId};
use crate::eval::Env;
use crate::render::{RenderError, Renderer};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Render `html` into a fresh headless tree and serialize the body's content.
///
/// # Examples
///
/// ```
/// use flare::testing::render_to_html;
/// use flare::vars;
///
/// let html = render_to_html("<b>{{ n * 2 }}</b>", &vars! { "n" => 21 }).unwrap();
/// assert_eq!(html, "<b>42</b>");
/// ```
pub fn render_to_html(html: &str, env: &Env) -> Result<String, RenderError> {
    render_to_html_with(&Renderer::new(), html, env)
}

/// Same as [`render_to_html`] but with a caller-configured renderer.
pub fn render_to_html_with(
    renderer: &Renderer,
    html: &str,
    env: &Env,
) -> Result<String, RenderError> {
    let mut dom = Dom::new();
    let body = dom.body();
    renderer.append_html(&mut dom, body, html, env)?;
    Ok(dom.inner_html(body))
}

/// Serialize a sequence of nodes, e.g. the top-level nodes of a render pass,
/// back to back.
pub fn nodes_to_html(dom: &Dom, nodes: &[NodeId]) -> String {
    nodes.iter().map(|node| dom.to_html(*node)).collect()
}

// ===========================================================================
// Tests
// ===========================================================================
