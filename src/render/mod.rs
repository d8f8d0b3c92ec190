//! Tree interpreter: turns parsed templates into live widget nodes.
//!
//! A [`Renderer`] walks a [`Template`], substituting `{{ }}` markers,
//! resolving `flare-if` / `flare-elif` / `flare-else` chains and `flare-for`
//! repetition, and applying every other attribute to the node it creates.
//! Named nodes (`[name]="ident"`) are recorded on a bind target, which also
//! supplies `:attr` members and `@event` handlers.
//!
//! ```
//! use flare::render::{Bindings, Renderer};
//! use flare::{vars, Dom};
//!
//! let renderer = Renderer::new();
//! let mut dom = Dom::new();
//! let mut target = Bindings::new();
//! let body = dom.body();
//! renderer
//!     .render_html_into(
//!         &mut dom,
//!         "<div>Hello {{ value }}<span [name]='s'>!</span></div>",
//!         Some(body),
//!         &mut target,
//!         &vars! { "value" => "World" },
//!     )
//!     .unwrap();
//! let span = target.get("s").unwrap();
//! assert_eq!(dom.text_content(span), "!");
//! ```

pub mod bind;
mod interpret;
pub mod substitute;

pub use bind::{is_identifier, BindTarget, Bindings};
pub use substitute::{has_markers, segments, substitute, Segment};

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::FlareConfig;
use crate::dom::{Dom, DomError, NodeId};
use crate::eval::{CachedEval, Env, EvalError, ExpressionEvaluator, SafeEval, Value};
use crate::registry::{self, TagRegistry};
use crate::template::{self, Template};
use crate::widget::WidgetClass;

use bind::BindTo;
use interpret::Pass;

// ---------------------------------------------------------------------------
// Errors and warnings
// ---------------------------------------------------------------------------

/// Failures that abort a render pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Dom(#[from] DomError),
    #[error("flare-elif without preceding flare-if/flare-elif")]
    DanglingElif,
    #[error("flare-else without preceding flare-if/flare-elif")]
    DanglingElse,
    #[error("attribute '{name}' collides with a member of <{tag}>")]
    FieldCollision { tag: String, name: String },
    #[error("unknown tag <{0}>")]
    UnknownTag(String),
    #[error("template nests deeper than {0} levels")]
    TooDeep(usize),
}

/// Recoverable problems: the offending attribute is skipped and rendering
/// goes on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderWarning {
    #[error("no bind target, cannot evaluate '{attribute}'")]
    NoBindTarget { attribute: String },
    #[error("cannot bind '{0}': not a valid identifier")]
    InvalidBindingName(String),
    #[error("cannot bind '{0}': name already in use")]
    DuplicateBinding(String),
    #[error("cannot project '{attribute}': bind target has no member '{member}'")]
    MissingMember { attribute: String, member: String },
    #[error("cannot listen to '{event}': bind target has no handler '{handler}'")]
    MissingHandler { event: String, handler: String },
    #[error("invalid value for '{name}' on <{tag}>: {message}")]
    InvalidValue {
        tag: String,
        name: String,
        message: String,
    },
}

impl RenderWarning {
    /// Log level the warning is reported at.
    pub fn level(&self) -> log::Level {
        match self {
            RenderWarning::InvalidBindingName(_) | RenderWarning::DuplicateBinding(_) => {
                log::Level::Warn
            }
            RenderWarning::NoBindTarget { attribute } if attribute == "[name]" => log::Level::Warn,
            _ => log::Level::Error,
        }
    }
}

/// Outcome of a render pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rendered {
    /// Top-level nodes in source order, text nodes included.
    pub nodes: Vec<NodeId>,
    pub warnings: Vec<RenderWarning>,
}

impl Rendered {
    pub fn first(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Template interpreter.
///
/// Holds the configuration, the expression evaluator and optionally a
/// private tag registry; without one, the process-wide registry is used.
pub struct Renderer {
    config: FlareConfig,
    evaluator: Box<dyn ExpressionEvaluator>,
    registry: Option<TagRegistry>,
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("registry", &self.registry.as_ref().map(TagRegistry::len))
            .finish_non_exhaustive()
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    /// Renderer with the default configuration and a caching [`SafeEval`].
    pub fn new() -> Self {
        let config = FlareConfig::default();
        Self {
            evaluator: default_evaluator(&config),
            config,
            registry: None,
        }
    }

    /// Replace the configuration (builder). Also rebuilds the default
    /// evaluator with the new limits, so call it before [`with_evaluator`].
    ///
    /// [`with_evaluator`]: Renderer::with_evaluator
    pub fn with_config(mut self, config: FlareConfig) -> Self {
        self.evaluator = default_evaluator(&config);
        self.config = config;
        self
    }

    /// Use a custom expression evaluator (builder).
    pub fn with_evaluator(mut self, evaluator: impl ExpressionEvaluator + 'static) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Use a private tag registry instead of the global one (builder).
    pub fn with_registry(mut self, registry: TagRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &FlareConfig {
        &self.config
    }

    /// Parse `html` against this renderer's tag registry, nesting elements no
    /// deeper than the configured limit.
    pub fn parse(&self, html: &str) -> Template {
        let depth = self.config.max_depth;
        match &self.registry {
            Some(registry) => template::parse_limited(html, registry, depth),
            None => registry::with(|tags| template::parse_limited(html, tags, depth)),
        }
    }

    /// Render `template` below `append_to`. The `append_to` node is also the
    /// bind target; with no `append_to`, top-level nodes stay detached and
    /// bindings are skipped with a warning.
    ///
    /// A failed render leaves the tree as it was: every node the pass created
    /// is destroyed again and its bindings are dropped.
    pub fn render(
        &self,
        dom: &mut Dom,
        template: &Template,
        append_to: Option<NodeId>,
        env: &Env,
    ) -> Result<Rendered, RenderError> {
        let bind_to = append_to.map_or(BindTo::Nothing, BindTo::Node);
        Pass::new(self, bind_to).run(dom, template, append_to, env)
    }

    /// Render `template` below `append_to`, binding onto `target`.
    pub fn render_into(
        &self,
        dom: &mut Dom,
        template: &Template,
        append_to: Option<NodeId>,
        target: &mut dyn BindTarget,
        env: &Env,
    ) -> Result<Rendered, RenderError> {
        Pass::new(self, BindTo::External(target)).run(dom, template, append_to, env)
    }

    /// Parse and render in one go.
    pub fn render_html(
        &self,
        dom: &mut Dom,
        html: &str,
        append_to: Option<NodeId>,
        env: &Env,
    ) -> Result<Rendered, RenderError> {
        self.render(dom, &self.parse(html), append_to, env)
    }

    /// Parse and render in one go, binding onto `target`.
    pub fn render_html_into(
        &self,
        dom: &mut Dom,
        html: &str,
        append_to: Option<NodeId>,
        target: &mut dyn BindTarget,
        env: &Env,
    ) -> Result<Rendered, RenderError> {
        self.render_into(dom, &self.parse(html), append_to, target, env)
    }

    /// Append the widgets described by `html` to `parent`, binding onto it.
    pub fn append_html(
        &self,
        dom: &mut Dom,
        parent: NodeId,
        html: &str,
        env: &Env,
    ) -> Result<Rendered, RenderError> {
        self.render_html(dom, html, Some(parent), env)
    }

    /// Like [`append_html`](Renderer::append_html), destroying the current
    /// children of `parent` first.
    pub fn replace_html(
        &self,
        dom: &mut Dom,
        parent: NodeId,
        html: &str,
        env: &Env,
    ) -> Result<Rendered, RenderError> {
        for child in dom.remove_all_children(parent)? {
            dom.destroy(child)?;
        }
        self.append_html(dom, parent, html, env)
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    pub(crate) fn class(&self, tag: &str) -> Option<Arc<WidgetClass>> {
        match &self.registry {
            Some(registry) => registry.class(tag),
            None => registry::resolve_class(tag),
        }
    }

    pub(crate) fn evaluate(&self, source: &str, env: &Env) -> Result<Value, EvalError> {
        self.evaluator.evaluate(source, env)
    }

    /// `{{ }}` substitution, or the text unchanged when expressions are off.
    pub(crate) fn substitute(&self, text: &str, env: &Env) -> Result<String, EvalError> {
        if self.config.expressions {
            substitute(text, self.evaluator.as_ref(), env)
        } else {
            Ok(text.to_owned())
        }
    }
}

fn default_evaluator(config: &FlareConfig) -> Box<dyn ExpressionEvaluator> {
    Box::new(CachedEval::new(SafeEval::new().with_limits(config.limits)))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::template::TemplateNode;
    use crate::vars;

    fn html(dom: &Dom, nodes: &[NodeId]) -> String {
        nodes.iter().map(|n| dom.to_html(*n)).collect()
    }

    #[test]
    fn text_only_template() {
        let renderer = Renderer::new();
        let mut dom = Dom::new();
        let out = renderer.render_html(&mut dom, "just text", None, &Env::new()).unwrap();
        assert_eq!(out.nodes.len(), 1);
        assert_eq!(dom.get(out.nodes[0]).unwrap().text_value(), Some("just text"));
        assert!(dom.parent(out.nodes[0]).is_none());
    }

    #[test]
    fn expressions_disabled_leave_markers() {
        let renderer =
            Renderer::new().with_config(FlareConfig::default().with_expressions(false));
        let mut dom = Dom::new();
        let out = renderer
            .render_html(
                &mut dom,
                "<p flare-if='False'>{{ x }}</p><p flare-else>b</p>",
                None,
                &Env::new(),
            )
            .unwrap();
        assert_snapshot!(html(&dom, &out.nodes), @"<p>{{ x }}</p><p>b</p>");
    }

    #[test]
    fn custom_evaluator() {
        struct Constant;
        impl ExpressionEvaluator for Constant {
            fn evaluate(&self, _: &str, _: &Env) -> Result<Value, EvalError> {
                Ok(Value::from("k"))
            }
        }
        let renderer = Renderer::new().with_evaluator(Constant);
        let mut dom = Dom::new();
        let out = renderer.render_html(&mut dom, "{{ anything }}!", None, &Env::new()).unwrap();
        assert_eq!(dom.text_content(out.nodes[0]), "k!");
    }

    #[test]
    fn limits_come_from_config() {
        let config = FlareConfig::default().with_limits(crate::config::EvalLimits {
            max_length: 5,
            ..Default::default()
        });
        let renderer = Renderer::new().with_config(config);
        let mut dom = Dom::new();
        let err = renderer
            .render_html(&mut dom, "{{ 1 + 1 + 1 }}", None, &Env::new())
            .unwrap_err();
        assert!(matches!(err, RenderError::Eval(EvalError::LimitExceeded { .. })));
    }

    #[test]
    fn private_registry() {
        let mut registry = TagRegistry::with_builtins();
        registry.register("card", WidgetClass::new("card").element("div"), true);
        let renderer = Renderer::new().with_registry(registry);
        let mut dom = Dom::new();
        let out = renderer
            .render_html(&mut dom, "<card class='x'>c</card><span>s</span>", None, &Env::new())
            .unwrap();
        assert_snapshot!(html(&dom, &out.nodes), @"<div class=\"x\">c</div><span>s</span>");
    }

    #[test]
    fn unknown_tag_in_hand_built_template() {
        let template = Template::new(vec![TemplateNode::element("nope")]);
        let mut dom = Dom::new();
        let err = Renderer::new().render(&mut dom, &template, None, &Env::new()).unwrap_err();
        assert_eq!(err, RenderError::UnknownTag("nope".into()));
    }

    #[test]
    fn replace_html_clears_first() {
        let renderer = Renderer::new();
        let mut dom = Dom::new();
        let body = dom.body();
        renderer.append_html(&mut dom, body, "<b>old</b>", &Env::new()).unwrap();
        let old = dom.children(body)[0];
        renderer
            .replace_html(&mut dom, body, "<i>{{ n }}</i>", &vars! { "n" => 1 })
            .unwrap();
        assert!(!dom.contains(old));
        assert_snapshot!(dom.inner_html(body), @"<i>1</i>");
    }

    #[test]
    fn replace_html_rebinds_names() {
        let renderer = Renderer::new();
        let mut dom = Dom::new();
        let body = dom.body();
        renderer
            .append_html(&mut dom, body, "<p [name]='x'>old</p>", &Env::new())
            .unwrap();
        let old = dom.bound(body, "x").unwrap();

        let out = renderer
            .replace_html(&mut dom, body, "<p [name]='x'>new</p>", &Env::new())
            .unwrap();
        assert!(out.is_clean());
        assert!(!dom.contains(old));
        assert_eq!(dom.bound(body, "x"), out.first());
        assert_eq!(dom.text_content(body), "new");
    }

    #[test]
    fn parse_honours_max_depth() {
        let renderer = Renderer::new().with_config(FlareConfig::default().with_max_depth(1));
        assert_eq!(
            renderer.parse("<b><i>x</i></b>").nodes,
            vec![TemplateNode::element("b").with_child(TemplateNode::Text("<i>x</i>".into()))]
        );
    }

    #[test]
    fn warning_levels() {
        assert_eq!(RenderWarning::DuplicateBinding("a".into()).level(), log::Level::Warn);
        assert_eq!(
            RenderWarning::NoBindTarget { attribute: "@click".into() }.level(),
            log::Level::Error
        );
        assert_eq!(
            RenderWarning::MissingHandler { event: "click".into(), handler: "go".into() }
                .to_string(),
            "cannot listen to 'click': bind target has no handler 'go'"
        );
    }
}
