//! The interpretation pass behind [`Renderer`].

use crate::dom::{Dom, DomError, NodeId};
use crate::eval::{Env, Value};
use crate::template::{Template, TemplateNode};

use indexmap::IndexMap;

use super::bind::{is_identifier, BindTo};
use super::{RenderError, RenderWarning, Renderer, Rendered};

/// Names a template attribute can never claim as a plain field.
const RESERVED_FIELDS: &[&str] = &[
    "children", "parent", "tag", "text", "element", "classes", "style", "data",
];

/// Where a sibling sequence stands in an if/elif/else chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chain {
    /// No open chain.
    Idle,
    /// A branch of the current chain has rendered.
    Taken,
    /// Every branch so far was false.
    Pending,
}

#[derive(Debug, Clone, Copy)]
enum Directive {
    If,
    Elif,
    Else,
}

impl Directive {
    const ALL: [Directive; 3] = [Directive::If, Directive::Elif, Directive::Else];

    fn name(self) -> &'static str {
        match self {
            Directive::If => "if",
            Directive::Elif => "elif",
            Directive::Else => "else",
        }
    }
}

/// `s` as an integer if it is one, written canonically.
fn parse_int(s: &str) -> Option<Value> {
    s.parse::<i64>()
        .ok()
        .filter(|n| n.to_string() == s)
        .map(Value::Int)
}

// ---------------------------------------------------------------------------
// Pass
// ---------------------------------------------------------------------------

pub(super) struct Pass<'r, 'b> {
    renderer: &'r Renderer,
    bind_to: BindTo<'b>,
    warnings: Vec<RenderWarning>,
    /// Nodes created so far, in creation order.
    created: Vec<NodeId>,
    /// Names bound so far.
    bound: Vec<String>,
    depth: usize,
}

impl<'r, 'b> Pass<'r, 'b> {
    pub(super) fn new(renderer: &'r Renderer, bind_to: BindTo<'b>) -> Self {
        Self {
            renderer,
            bind_to,
            warnings: Vec::new(),
            created: Vec::new(),
            bound: Vec::new(),
            depth: 0,
        }
    }

    pub(super) fn run(
        mut self,
        dom: &mut Dom,
        template: &Template,
        append_to: Option<NodeId>,
        env: &Env,
    ) -> Result<Rendered, RenderError> {
        let nodes = match self.interpret(dom, append_to, &template.nodes, env) {
            Ok(nodes) => nodes,
            Err(e) => {
                self.rollback(dom);
                return Err(e);
            }
        };
        log::trace!(
            "rendered {} top-level nodes, {} warnings",
            nodes.len(),
            self.warnings.len()
        );
        Ok(Rendered {
            nodes,
            warnings: self.warnings,
        })
    }

    /// Undo a failed pass: drop its bindings, destroy its nodes.
    fn rollback(&mut self, dom: &mut Dom) {
        for name in std::mem::take(&mut self.bound) {
            self.bind_to.unbind(dom, &name);
        }
        let created = std::mem::take(&mut self.created);
        log::debug!("render failed, destroying {} created nodes", created.len());
        for node in created {
            // Earlier entries may have taken this one down with them.
            if dom.contains(node) {
                if let Err(e) = dom.destroy(node) {
                    log::warn!("rollback: {e}");
                }
            }
        }
    }

    fn warn(&mut self, warning: RenderWarning) {
        log::log!(warning.level(), "{warning}");
        self.warnings.push(warning);
    }

    fn interpret(
        &mut self,
        dom: &mut Dom,
        parent: Option<NodeId>,
        items: &[TemplateNode],
        env: &Env,
    ) -> Result<Vec<NodeId>, RenderError> {
        let max_depth = self.renderer.config().max_depth;
        if self.depth > max_depth {
            return Err(RenderError::TooDeep(max_depth));
        }
        self.depth += 1;
        let out = self.interpret_level(dom, parent, items, env);
        self.depth -= 1;
        out
    }

    fn interpret_level(
        &mut self,
        dom: &mut Dom,
        parent: Option<NodeId>,
        items: &[TemplateNode],
        env: &Env,
    ) -> Result<Vec<NodeId>, RenderError> {
        let renderer = self.renderer;
        let mut chain = Chain::Idle;
        let mut out = Vec::with_capacity(items.len());

        for item in items {
            let (tag, attributes, children) = match item {
                TemplateNode::Text(text) => {
                    let node = dom.create_text(renderer.substitute(text, env)?);
                    self.created.push(node);
                    if let Some(parent) = parent {
                        dom.append_child(parent, node)?;
                    }
                    out.push(node);
                    continue;
                }
                TemplateNode::Element {
                    tag,
                    attributes,
                    children,
                } => (tag.as_str(), attributes, children.as_slice()),
            };

            if !self.conditional(attributes, &mut chain, env)? {
                continue;
            }

            let node = match parent.and_then(|p| dom.slot(p, tag)) {
                Some(slot) => slot,
                None => {
                    let class = renderer
                        .class(tag)
                        .ok_or_else(|| RenderError::UnknownTag(tag.to_owned()))?;
                    let node = dom.create(class)?;
                    self.created.push(node);
                    node
                }
            };

            for (name, value) in attributes {
                if renderer.config().strip_directive(name).is_some() {
                    continue;
                }
                let value = renderer.substitute(value, env)?;
                self.apply(dom, node, tag, name, value)?;
            }

            self.repeat(dom, node, attributes, children, env)?;

            if let Some(parent) = parent {
                if dom.parent(node).is_none() {
                    dom.append_child(parent, node)?;
                }
            }
            out.push(node);
        }
        Ok(out)
    }

    /// Advance the conditional chain for one element; `false` skips it.
    fn conditional(
        &self,
        attributes: &IndexMap<String, String>,
        chain: &mut Chain,
        env: &Env,
    ) -> Result<bool, RenderError> {
        let renderer = self.renderer;
        if !renderer.config().expressions {
            return Ok(true);
        }
        let found = Directive::ALL.into_iter().find_map(|directive| {
            attributes
                .get(&renderer.config().directive(directive.name()))
                .map(|source| (directive, source))
        });
        let Some((directive, source)) = found else {
            *chain = Chain::Idle;
            return Ok(true);
        };

        let source = renderer.substitute(source, env)?;
        match directive {
            Directive::Else => {
                let render = match *chain {
                    Chain::Idle => return Err(RenderError::DanglingElse),
                    Chain::Taken => false,
                    Chain::Pending => true,
                };
                *chain = Chain::Idle;
                Ok(render)
            }
            Directive::If | Directive::Elif => {
                if let Directive::Elif = directive {
                    match *chain {
                        Chain::Idle => return Err(RenderError::DanglingElif),
                        Chain::Taken => return Ok(false),
                        Chain::Pending => {}
                    }
                }
                let render = renderer.evaluate(&source, env)?.is_truthy();
                *chain = if render { Chain::Taken } else { Chain::Pending };
                Ok(render)
            }
        }
    }

    /// Interpret `children` into `node`, once per `flare-for` entry if the
    /// element carries one.
    fn repeat(
        &mut self,
        dom: &mut Dom,
        node: NodeId,
        attributes: &IndexMap<String, String>,
        children: &[TemplateNode],
        env: &Env,
    ) -> Result<(), RenderError> {
        let renderer = self.renderer;
        let config = renderer.config();
        let source = attributes
            .get(&config.directive("for"))
            .filter(|source| config.expressions && !source.is_empty());
        let Some(source) = source else {
            self.interpret(dom, Some(node), children, env)?;
            return Ok(());
        };

        let items = renderer.evaluate(source, env)?;
        if !items.is_truthy() {
            return Ok(());
        }
        let mut local = env.clone();
        match items {
            Value::Map(map) => {
                for (key, value) in map {
                    local.insert("key".into(), Value::Str(key));
                    local.insert("value".into(), value);
                    self.interpret(dom, Some(node), children, &local)?;
                }
            }
            Value::List(list) => {
                for value in list {
                    local.insert("value".into(), value);
                    self.interpret(dom, Some(node), children, &local)?;
                }
            }
            scalar => {
                local.insert("value".into(), scalar);
                self.interpret(dom, Some(node), children, &local)?;
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Attributes
    // -------------------------------------------------------------------

    fn apply(
        &mut self,
        dom: &mut Dom,
        node: NodeId,
        tag: &str,
        name: &str,
        value: String,
    ) -> Result<(), RenderError> {
        match name {
            "[name]" => self.bind(dom, node, name, &value),
            "class" => dom.add_class(node, &value),
            "disabled" => {
                if value == "disabled" {
                    dom.disable(node);
                }
            }
            "hidden" => {
                if value == "hidden" {
                    dom.hide(node);
                }
            }
            "style" => {
                for declaration in value.split(';') {
                    if let Some((property, value)) = declaration.split_once(':') {
                        dom.set_style(node, property.trim(), value.trim())?;
                    }
                }
            }
            _ => {
                if let Some(key) = name.strip_prefix("data-") {
                    dom.set_data(node, key, &value)?;
                } else if let Some(member) = name.strip_prefix(':') {
                    self.project(dom, node, tag, name, member, &value)?;
                } else if let Some(event) = name.strip_prefix('@') {
                    self.listen(dom, node, name, event, &value)?;
                } else {
                    self.assign(dom, node, tag, name, value)?;
                }
            }
        }
        Ok(())
    }

    fn bind(&mut self, dom: &mut Dom, node: NodeId, attribute: &str, ident: &str) {
        if !self.bind_to.is_set() {
            self.warn(RenderWarning::NoBindTarget {
                attribute: attribute.to_owned(),
            });
        } else if self.bind_to.is_taken(dom, ident) {
            self.warn(RenderWarning::DuplicateBinding(ident.to_owned()));
        } else if !is_identifier(ident) {
            self.warn(RenderWarning::InvalidBindingName(ident.to_owned()));
        } else {
            self.bind_to.bind(dom, ident, node);
            self.bound.push(ident.to_owned());
            log::debug!("bound {node:?} as '{ident}'");
            let hook = dom
                .get(node)
                .and_then(|data| data.class())
                .and_then(|class| class.bind_hook());
            if let Some(hook) = hook {
                hook(dom, node, ident);
            }
        }
    }

    /// `:attr="member"`: copy a bind target member onto the node.
    fn project(
        &mut self,
        dom: &mut Dom,
        node: NodeId,
        tag: &str,
        attribute: &str,
        target: &str,
        member: &str,
    ) -> Result<(), RenderError> {
        if !self.bind_to.is_set() {
            self.warn(RenderWarning::NoBindTarget {
                attribute: attribute.to_owned(),
            });
            return Ok(());
        }
        let Some(value) = self.bind_to.member(dom, member) else {
            self.warn(RenderWarning::MissingMember {
                attribute: attribute.to_owned(),
                member: member.to_owned(),
            });
            return Ok(());
        };
        match dom.set_property(node, target, value.clone()) {
            Ok(()) => Ok(()),
            Err(DomError::UnknownAttribute { .. }) => Ok(dom.set_field(node, target, value)?),
            Err(DomError::InvalidValue { name, message }) => {
                self.warn(RenderWarning::InvalidValue {
                    tag: tag.to_owned(),
                    name,
                    message,
                });
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `@event="handler"`: wire a bind target handler as a listener.
    fn listen(
        &mut self,
        dom: &mut Dom,
        node: NodeId,
        attribute: &str,
        event: &str,
        handler: &str,
    ) -> Result<(), RenderError> {
        if !self.bind_to.is_set() {
            self.warn(RenderWarning::NoBindTarget {
                attribute: attribute.to_owned(),
            });
            return Ok(());
        }
        match self.bind_to.handler(dom, handler) {
            Some(callback) => {
                dom.add_event_listener(node, event, callback)?;
            }
            None => self.warn(RenderWarning::MissingHandler {
                event: event.to_owned(),
                handler: handler.to_owned(),
            }),
        }
        Ok(())
    }

    /// Any other attribute: a typed property if the class has one, a plain
    /// field otherwise.
    fn assign(
        &mut self,
        dom: &mut Dom,
        node: NodeId,
        tag: &str,
        name: &str,
        value: String,
    ) -> Result<(), RenderError> {
        let typed = parse_int(&value).unwrap_or_else(|| Value::Str(value.clone()));
        match dom.set_property(node, name, typed) {
            Ok(()) => Ok(()),
            Err(DomError::UnknownAttribute { .. }) => {
                if collides(dom, node, name) {
                    return Err(RenderError::FieldCollision {
                        tag: tag.to_owned(),
                        name: name.to_owned(),
                    });
                }
                Ok(dom.set_field(node, name, Value::Str(value))?)
            }
            Err(DomError::InvalidValue { name, message }) => {
                self.warn(RenderWarning::InvalidValue {
                    tag: tag.to_owned(),
                    name,
                    message,
                });
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Whether `name` would shadow something the node already has.
fn collides(dom: &Dom, node: NodeId, name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
        || dom.get(node).is_some_and(|data| {
            data.fields.contains_key(name)
                || data.handlers.contains_key(name)
                || data.bound.contains_key(name)
        })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use indexmap::IndexMap;
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    use crate::dom::{Dom, HeadlessHost, NodeId};
    use crate::eval::{Env, EvalError, Value};
    use crate::event::{Callback, Event};
    use crate::render::{BindTarget, Bindings, RenderError, RenderWarning, Renderer, Rendered};
    use crate::template::{Template, TemplateNode};
    use crate::vars;

    fn render(html: &str, env: &Env) -> (Dom, Rendered) {
        let mut dom = Dom::new();
        let body = dom.body();
        let out = Renderer::new().render_html(&mut dom, html, Some(body), env).unwrap();
        (dom, out)
    }

    fn body_html(html: &str, env: &Env) -> String {
        let (dom, _) = render(html, env);
        dom.inner_html(dom.body())
    }

    // ── Text and substitution ──

    #[test]
    fn hello_world() {
        let mut dom = Dom::new();
        let mut target = Bindings::new();
        let body = dom.body();
        let out = Renderer::new()
            .render_html_into(
                &mut dom,
                "<div>Hello {{ value }}<span [name]='s'>!</span></div>",
                Some(body),
                &mut target,
                &vars! { "value" => "World" },
            )
            .unwrap();
        assert!(out.is_clean());
        let div = out.first().unwrap();
        let children = dom.children(div).to_vec();
        assert_eq!(children.len(), 2);
        assert_eq!(dom.get(children[0]).unwrap().text_value(), Some("Hello World"));
        assert_eq!(target.get("s"), Some(children[1]));
        assert_eq!(dom.text_content(children[1]), "!");
    }

    #[test]
    fn attribute_values_are_substituted() {
        let html = body_html(
            "<a href='/items/{{ id }}' title='{{ name }}'>x</a>",
            &vars! { "id" => 7, "name" => "seven" },
        );
        assert_snapshot!(html, @r#"<a href="/items/7" title="seven">x</a>"#);
    }

    #[test]
    fn expression_errors_propagate() {
        let mut dom = Dom::new();
        let err = Renderer::new()
            .render_html(&mut dom, "<p>{{ open( }}</p>", None, &Env::new())
            .unwrap_err();
        assert!(matches!(err, RenderError::Eval(EvalError::Syntax { .. })));
    }

    #[test]
    fn top_level_includes_text() {
        let (dom, out) = render("a<b>b</b>c", &Env::new());
        assert_eq!(out.nodes.len(), 3);
        assert_eq!(dom.children(dom.body()), out.nodes.as_slice());
    }

    // ── Conditionals ──

    #[test]
    fn if_elif_else_picks_one() {
        let template = "<p flare-if='n == 1'>one</p><p flare-elif='n == 2'>two</p><p flare-else>many</p>";
        assert_snapshot!(body_html(template, &vars! { "n" => 1 }), @"<p>one</p>");
        assert_snapshot!(body_html(template, &vars! { "n" => 2 }), @"<p>two</p>");
        assert_snapshot!(body_html(template, &vars! { "n" => 5 }), @"<p>many</p>");
    }

    #[test]
    fn taken_if_skips_true_elif() {
        let html = body_html(
            "<i flare-if='True'>a</i><i flare-elif='True'>b</i><i flare-else>c</i>",
            &Env::new(),
        );
        assert_snapshot!(html, @"<i>a</i>");
    }

    #[test]
    fn else_closes_chain() {
        let mut dom = Dom::new();
        let err = Renderer::new()
            .render_html(
                &mut dom,
                "<i flare-if='False'>a</i><i flare-else>b</i><i flare-else>c</i>",
                None,
                &Env::new(),
            )
            .unwrap_err();
        assert_eq!(err, RenderError::DanglingElse);
    }

    #[test]
    fn plain_element_resets_chain_but_text_does_not() {
        let mut dom = Dom::new();
        let renderer = Renderer::new();
        let err = renderer
            .render_html(&mut dom, "<i flare-if='1'>a</i><b>x</b><i flare-elif='1'>b</i>", None, &Env::new())
            .unwrap_err();
        assert_eq!(err, RenderError::DanglingElif);

        let html = body_html("<i flare-if='0'>a</i> <i flare-else>b</i>", &Env::new());
        assert_eq!(html, " <i>b</i>");
    }

    #[test]
    fn condition_is_substituted_first() {
        let html = body_html("<i flare-if='{{ flag }}'>on</i>", &vars! { "flag" => "1 == 1" });
        assert_snapshot!(html, @"<i>on</i>");
    }

    // ── Repetition ──

    #[test]
    fn for_over_list() {
        let (dom, _) = render(
            "<ul flare-for='items'><li>{{ value }}</li></ul>",
            &vars! { "items" => vec![Value::Int(1), Value::Int(2), Value::Int(3)] },
        );
        assert_snapshot!(dom.inner_html(dom.body()), @"<ul><li>1</li><li>2</li><li>3</li></ul>");
    }

    #[test]
    fn for_over_map_and_scalar() {
        let mut map = IndexMap::new();
        map.insert("a".to_owned(), Value::Int(1));
        map.insert("b".to_owned(), Value::Int(2));
        let html = body_html(
            "<dl flare-for='m'><dt>{{ key }}</dt><dd>{{ value }}</dd></dl><p flare-for='s'>{{ value }}</p>",
            &vars! { "m" => map, "s" => "solo" },
        );
        assert_snapshot!(html, @"<dl><dt>a</dt><dd>1</dd><dt>b</dt><dd>2</dd></dl><p>solo</p>");
    }

    #[test]
    fn falsy_for_renders_no_children() {
        let html = body_html(
            "<ul flare-for='items'><li>x</li></ul><ol flare-for=''><li>y</li></ol>",
            &vars! { "items" => Vec::<Value>::new() },
        );
        assert_snapshot!(html, @"<ul></ul><ol><li>y</li></ol>");
    }

    #[test]
    fn loop_variables_do_not_leak() {
        let env = vars! { "value" => "outer", "xs" => vec![Value::from("inner")] };
        let html = body_html("<b flare-for='xs'>{{ value }}</b><i>{{ value }}</i>", &env);
        assert_snapshot!(html, @"<b>inner</b><i>outer</i>");
    }

    // ── Attributes ──

    #[test]
    fn class_style_data_and_state() {
        let html = body_html(
            "<button class='a b' style='color: red; ;margin:0' data-row='4' disabled hidden>go</button>",
            &Env::new(),
        );
        assert_snapshot!(html, @r#"<button class="a b" disabled hidden style="color: red; margin: 0" data-row="4">go</button>"#);
    }

    #[test]
    fn disabled_needs_its_own_name() {
        let (dom, out) = render("<div disabled='no' hidden='yes'>x</div>", &Env::new());
        let div = out.first().unwrap();
        assert!(!dom.is_disabled(div));
        assert!(!dom.is_hidden(div));
    }

    #[test]
    fn typed_properties_and_fields() {
        let (dom, out) = render(
            "<div tabindex='3' title='007' answer='42'>x</div>",
            &Env::new(),
        );
        let div = out.first().unwrap();
        assert_eq!(dom.property(div, "tabindex").unwrap(), Value::Int(3));
        assert_eq!(dom.property(div, "title").unwrap(), Value::from("007"));
        assert_eq!(dom.member(div, "answer"), Some(Value::from("42")));
    }

    #[test]
    fn invalid_typed_value_warns() {
        let (dom, out) = render("<div tabindex='first'>x</div>", &Env::new());
        assert_eq!(
            out.warnings,
            vec![RenderWarning::InvalidValue {
                tag: "div".into(),
                name: "tabindex".into(),
                message: "expected an integer, got 'first'".into(),
            }]
        );
        assert_eq!(dom.property(out.first().unwrap(), "tabindex").unwrap(), Value::None);
    }

    #[test]
    fn reserved_field_collides() {
        let mut dom = Dom::new();
        let err = Renderer::new()
            .render_html(&mut dom, "<div children='x'></div>", None, &Env::new())
            .unwrap_err();
        assert_eq!(
            err,
            RenderError::FieldCollision {
                tag: "div".into(),
                name: "children".into()
            }
        );
    }

    // ── Binding ──

    #[test]
    fn duplicate_binding_keeps_first() {
        let mut dom = Dom::new();
        let mut target = Bindings::new();
        let out = Renderer::new()
            .render_html_into(
                &mut dom,
                "<b [name]='foo'>1</b><i [name]='foo'>2</i>",
                None,
                &mut target,
                &Env::new(),
            )
            .unwrap();
        assert_eq!(target.get("foo"), Some(out.nodes[0]));
        assert_eq!(out.warnings, vec![RenderWarning::DuplicateBinding("foo".into())]);
    }

    #[test]
    fn invalid_names_and_missing_target() {
        let mut dom = Dom::new();
        let mut target = Bindings::new();
        let renderer = Renderer::new();
        let out = renderer
            .render_html_into(&mut dom, "<b [name]='1x'>1</b>", None, &mut target, &Env::new())
            .unwrap();
        assert!(target.is_empty());
        assert_eq!(out.warnings, vec![RenderWarning::InvalidBindingName("1x".into())]);

        let out = renderer.render_html(&mut dom, "<b [name]='x'>1</b>", None, &Env::new()).unwrap();
        assert_eq!(
            out.warnings,
            vec![RenderWarning::NoBindTarget { attribute: "[name]".into() }]
        );
    }

    #[test]
    fn append_to_is_default_target() {
        let (dom, out) = render("<b [name]='first'>1</b>", &Env::new());
        let b = out.first().unwrap();
        assert_eq!(dom.get(dom.body()).unwrap().bound.get("first"), Some(&b));
    }

    #[test]
    fn bind_hook_runs() {
        fn remember(dom: &mut Dom, node: NodeId, name: &str) {
            let _ = dom.set_field(node, "bound_as", Value::from(name));
        }
        let mut registry = crate::registry::TagRegistry::with_builtins();
        registry.register(
            "named",
            crate::widget::WidgetClass::new("named").element("span").on_bind(remember),
            true,
        );
        let renderer = Renderer::new().with_registry(registry);
        let mut dom = Dom::new();
        let mut target = Bindings::new();
        let out = renderer
            .render_html_into(&mut dom, "<named [name]='n'></named>", None, &mut target, &Env::new())
            .unwrap();
        assert_eq!(dom.member(out.nodes[0], "bound_as"), Some(Value::from("n")));
    }

    // ── Projection and events ──

    #[test]
    fn projects_members() {
        let mut dom = Dom::new();
        let mut target = Bindings::new().with_member("heading", "Report").with_member("rows", 3);
        let out = Renderer::new()
            .render_html_into(
                &mut dom,
                "<div :title='heading' :count='rows' :gone='missing'></div>",
                None,
                &mut target,
                &Env::new(),
            )
            .unwrap();
        let div = out.first().unwrap();
        assert_eq!(dom.property(div, "title").unwrap(), Value::from("Report"));
        assert_eq!(dom.member(div, "count"), Some(Value::Int(3)));
        assert_eq!(
            out.warnings,
            vec![RenderWarning::MissingMember {
                attribute: ":gone".into(),
                member: "missing".into()
            }]
        );
    }

    #[test]
    fn wires_handlers() {
        let clicks = Rc::new(Cell::new(0));
        let counter = Rc::clone(&clicks);
        let mut target = Bindings::new().with_handler(
            "on_click",
            Callback::new(move |_, _| counter.set(counter.get() + 1)),
        );
        let mut dom = Dom::with_host(HeadlessHost::new());
        let body = dom.body();
        let out = Renderer::new()
            .render_html_into(
                &mut dom,
                "<button @click='on_click' @focus='nothing'>ok</button>",
                Some(body),
                &mut target,
                &Env::new(),
            )
            .unwrap();
        let button = out.first().unwrap();
        assert_eq!(
            out.warnings,
            vec![RenderWarning::MissingHandler {
                event: "focus".into(),
                handler: "nothing".into()
            }]
        );
        dom.dispatch(button, Event::new("click"));
        assert_eq!(clicks.get(), 1);
        assert_eq!(dom.host_as::<HeadlessHost>().unwrap().live_listeners(), 1);
    }

    #[test]
    fn handlers_from_append_to_node() {
        let mut dom = Dom::new();
        let body = dom.body();
        let hits = Rc::new(Cell::new(false));
        let flag = Rc::clone(&hits);
        dom.get_mut(body)
            .unwrap()
            .handlers
            .insert("hit".into(), Callback::new(move |_, _| flag.set(true)));
        let out = Renderer::new()
            .append_html(&mut dom, body, "<a @click='hit'>x</a>", &Env::new())
            .unwrap();
        dom.dispatch(out.nodes[0], Event::new("click"));
        assert!(hits.get());
    }

    // ── Failure ──

    #[test]
    fn failed_render_destroys_what_it_built() {
        let mut dom = Dom::new();
        let renderer = Renderer::new();
        for _ in 0..10 {
            let err = renderer
                .render_html(&mut dom, "<div><p>a</p><p>{{ 1/0 }}</p></div>", None, &Env::new())
                .unwrap_err();
            assert_eq!(err, RenderError::Eval(EvalError::ZeroDivision));
        }
        assert_eq!(dom.len(), 1);

        let body = dom.body();
        let err = renderer
            .render_html(
                &mut dom,
                "<b [name]='kept'>x</b><table><tbody><tr><td>{{ 1/0 }}</td></tr></tbody></table>",
                Some(body),
                &Env::new(),
            )
            .unwrap_err();
        assert!(matches!(err, RenderError::Eval(_)));
        assert!(dom.children(body).is_empty());
        assert_eq!(dom.bound(body, "kept"), None);
        assert_eq!(dom.len(), 1);
    }

    #[test]
    fn failed_render_unbinds_external_target() {
        let mut dom = Dom::new();
        let body = dom.body();
        let mut target = Bindings::new();
        let err = Renderer::new()
            .render_html_into(
                &mut dom,
                "<b [name]='first'>x</b><i flare-elif='1'>y</i>",
                Some(body),
                &mut target,
                &Env::new(),
            )
            .unwrap_err();
        assert_eq!(err, RenderError::DanglingElif);
        assert!(target.is_empty());
        assert_eq!(dom.len(), 1);
    }

    #[test]
    fn nesting_is_bounded() {
        fn nested(levels: usize) -> Template {
            let mut node = TemplateNode::element("div");
            for _ in 1..levels {
                node = TemplateNode::element("div").with_child(node);
            }
            Template::new(vec![node])
        }
        let renderer = Renderer::new();
        let mut dom = Dom::new();
        let max = renderer.config().max_depth;
        assert!(renderer.render(&mut dom, &nested(max), None, &Env::new()).is_ok());

        let before = dom.len();
        let err = renderer
            .render(&mut dom, &nested(max + 1), None, &Env::new())
            .unwrap_err();
        assert_eq!(err, RenderError::TooDeep(max));
        assert_eq!(dom.len(), before);
    }

    // ── Tables ──

    #[test]
    fn table_sections_are_reused() {
        let (dom, out) = render(
            "<table><thead><tr><th>h</th></tr></thead><tbody><tr><td>{{ 1 + 1 }}</td></tr></tbody></table>",
            &Env::new(),
        );
        let table = out.first().unwrap();
        assert_eq!(dom.children(table).len(), 2);
        assert_eq!(dom.children(table)[0], dom.slot(table, "thead").unwrap());
        assert_snapshot!(
            dom.to_html(table),
            @"<table><thead><tr><th>h</th></tr></thead><tbody><tr><td>2</td></tr></tbody></table>"
        );
    }

    #[test]
    fn external_target_trait_object() {
        #[derive(Default)]
        struct Form {
            submit: Option<NodeId>,
        }
        impl BindTarget for Form {
            fn bound(&self, name: &str) -> Option<NodeId> {
                (name == "submit").then_some(self.submit).flatten()
            }
            fn bind(&mut self, name: &str, node: NodeId) {
                if name == "submit" {
                    self.submit = Some(node);
                }
            }
            fn unbind(&mut self, name: &str) {
                if name == "submit" {
                    self.submit = None;
                }
            }
            fn member(&self, _: &str) -> Option<Value> {
                None
            }
            fn handler(&self, _: &str) -> Option<Callback> {
                None
            }
        }
        let mut form = Form::default();
        let mut dom = Dom::new();
        Renderer::new()
            .render_html_into(&mut dom, "<button [name]='submit'>Go</button>", None, &mut form, &Env::new())
            .unwrap();
        assert!(form.submit.is_some());
    }
}
