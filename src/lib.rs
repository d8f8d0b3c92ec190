//! # flare
//!
//! Declarative widget trees from HTML-like templates, with a sandboxed
//! expression language.
//!
//! flare parses template strings into a reusable [`Template`], then
//! interprets it into a retained widget tree: `{{ expr }}` markers are
//! substituted, `flare-if` / `flare-elif` / `flare-else` and `flare-for`
//! control what gets built, and `[name]` attributes bind the resulting nodes
//! back onto an owning object. Expressions run in [`SafeEval`], a small
//! Python-flavoured evaluator that can only call allow-listed functions.
//!
//! ## Core Systems
//!
//! - **[`eval`]**: Expression evaluator: tokenizer, parser, values, sandboxed interpreter
//! - **[`template`]**: Tolerant template parser driven by the tag registry
//! - **[`registry`]**: Tag name → widget class table, process-wide or local
//! - **[`widget`]**: Widget classes, typed property tables, the built-in HTML5 set
//! - **[`dom`]**: Slotmap-backed widget tree with host bridge, queries and serialization
//! - **[`event`]**: Deferred listener registration and event bubbling
//! - **[`render`]**: Tree interpreter: substitution, directives, bindings
//! - **[`config`]**: Directive prefix and expression limits
//! - **[`testing`]**: Headless fixture and HTML snapshot helpers
//!
//! ```
//! use flare::{vars, Dom, Renderer};
//!
//! let mut dom = Dom::new();
//! let body = dom.body();
//! Renderer::new()
//!     .append_html(
//!         &mut dom,
//!         body,
//!         "<ul flare-for='items'><li>{{ value }}</li></ul>",
//!         &vars! { "items" => vec![1, 2, 3] },
//!     )
//!     .unwrap();
//! assert_eq!(dom.inner_html(body), "<ul><li>1</li><li>2</li><li>3</li></ul>");
//! ```

// Foundation
pub mod config;
pub mod eval;

// Templates
pub mod registry;
pub mod template;

// Widget tree
pub mod dom;
pub mod event;
pub mod widget;

// Interpretation
pub mod render;

// Test support
pub mod testing;

pub use config::{EvalLimits, FlareConfig};
pub use dom::{Dom, DomError, NodeId};
pub use eval::{Env, EvalError, SafeEval, Value};
pub use registry::{register_tag, TagRegistry};
pub use render::{BindTarget, Bindings, RenderError, RenderWarning, Renderer, Rendered};
pub use template::{parse, Template, TemplateNode};
pub use widget::WidgetClass;
