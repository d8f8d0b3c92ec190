//! Fixture: a headless tree, a renderer and a bind target in one place.
//!
//! The `Fixture` owns a [`Dom`] on a [`HeadlessHost`], renders templates into
//! its body with a [`Bindings`] target, and offers shortcuts for looking up
//! bound nodes and firing events at them.

use crate::dom::{Dom, HeadlessHost, HostOp, NodeId};
use crate::eval::Env;
use crate::event::{Callback, Event};
use crate::render::{Bindings, RenderError, RenderWarning, Renderer};

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// A headless render environment for tests.
///
/// # Examples
///
/// ```
/// use flare::testing::Fixture;
/// use flare::vars;
///
/// let mut fixture = Fixture::new();
/// fixture.render("<p [name]='greeting'>Hi {{ who }}</p>", &vars! { "who" => "there" }).unwrap();
/// assert_eq!(fixture.text("greeting"), Some("Hi there".to_owned()));
/// ```
#[derive(Debug)]
pub struct Fixture {
    dom: Dom,
    renderer: Renderer,
    bindings: Bindings,
    warnings: Vec<RenderWarning>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_renderer(Renderer::new())
    }

    pub fn with_renderer(renderer: Renderer) -> Self {
        Self {
            dom: Dom::with_host(HeadlessHost::new()),
            renderer,
            bindings: Bindings::new(),
            warnings: Vec::new(),
        }
    }

    /// Register a handler `@event` attributes can refer to (builder).
    pub fn with_handler(mut self, name: &str, callback: Callback) -> Self {
        self.bindings = self.bindings.with_handler(name, callback);
        self
    }

    /// Render `html` at the end of the body. Returns the top-level nodes.
    pub fn render(&mut self, html: &str, env: &Env) -> Result<Vec<NodeId>, RenderError> {
        let body = self.dom.body();
        let out = self
            .renderer
            .render_html_into(&mut self.dom, html, Some(body), &mut self.bindings, env)?;
        self.warnings.extend(out.warnings);
        Ok(out.nodes)
    }

    /// Node bound under `name`.
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.bindings.get(name)
    }

    /// Text content of the node bound under `name`.
    pub fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(|node| self.dom.text_content(node))
    }

    /// Dispatch `event` on the node bound under `name`. Returns `false` when
    /// nothing is bound under that name.
    pub fn fire(&mut self, name: &str, event: &str) -> bool {
        match self.get(name) {
            Some(node) => {
                self.dom.dispatch(node, Event::new(event));
                true
            }
            None => false,
        }
    }

    /// Serialized content of the body.
    pub fn html(&self) -> String {
        self.dom.inner_html(self.dom.body())
    }

    /// Host operations recorded so far.
    pub fn host_ops(&self) -> &[HostOp] {
        self.host().map(HeadlessHost::ops).unwrap_or_default()
    }

    pub fn host(&self) -> Option<&HeadlessHost> {
        self.dom.host_as::<HeadlessHost>()
    }

    /// Warnings collected across all renders.
    pub fn warnings(&self) -> &[RenderWarning] {
        &self.warnings
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut Dom {
        &mut self.dom
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::init_logging;
    use crate::vars;

    #[test]
    fn renders_and_binds() {
        init_logging();
        let mut fixture = Fixture::new();
        let nodes = fixture
            .render("<ul [name]='list'><li flare-for='xs'>{{ value }}</li></ul>", &vars! {
                "xs" => vec![1, 2],
            })
            .unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(fixture.get("list"), Some(nodes[0]));
        assert_eq!(fixture.html(), "<ul><li>12</li></ul>");
        assert!(fixture.warnings().is_empty());
    }

    #[test]
    fn fires_events() {
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let mut fixture = Fixture::new().with_handler(
            "save",
            Callback::new(move |_, event| {
                counter.set(counter.get() + 1);
                event.mark_handled();
            }),
        );
        fixture.render("<button [name]='btn' @click='save'>Save</button>", &Env::new()).unwrap();
        assert!(fixture.fire("btn", "click"));
        assert!(fixture.fire("btn", "keydown"));
        assert!(!fixture.fire("missing", "click"));
        assert_eq!(hits.get(), 1);
        assert_eq!(fixture.host().map(HeadlessHost::live_listeners), Some(1));
    }

    #[test]
    fn records_host_ops() {
        let mut fixture = Fixture::new();
        fixture.render("<b>x</b>", &Env::new()).unwrap();
        assert!(fixture
            .host_ops()
            .iter()
            .any(|op| matches!(op, HostOp::CreateElement(_, tag) if tag == "b")));
    }

    #[test]
    fn collects_warnings() {
        let mut fixture = Fixture::new();
        fixture.render("<b [name]='a'></b>", &Env::new()).unwrap();
        fixture.render("<b [name]='a'></b>", &Env::new()).unwrap();
        assert_eq!(fixture.warnings(), &[RenderWarning::DuplicateBinding("a".into())]);
    }
}
