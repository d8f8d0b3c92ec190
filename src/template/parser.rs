//! Forgiving single-pass HTML template parser.
//!
//! Only tags known to the [`TagRegistry`] open elements; anything else that
//! looks like markup stays literal text. Leaf tags close themselves, closing
//! tags only close the innermost open element when the names match, and
//! whatever is still open at the end of input is closed implicitly. Tags
//! that would nest deeper than the depth limit stay text as well. The parser
//! never fails.

use indexmap::IndexMap;

use super::ast::{Template, TemplateNode};
use super::entities;
use crate::registry::{self, TagRegistry};

/// Characters that end a word (tag or attribute name, unquoted value).
const WORD_STOP: &[char] = &[' ', '\t', '\r', '\n', '<', '>', '=', '"', '\''];

fn is_white(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Default limit on element nesting.
pub const MAX_DEPTH: usize = 128;

/// Parse `html` against the process-wide tag registry.
pub fn parse(html: &str) -> Template {
    registry::with(|tags| parse_with(html, tags))
}

/// Parse `html`, recognizing the tags of `tags`.
pub fn parse_with(html: &str, tags: &TagRegistry) -> Template {
    parse_limited(html, tags, MAX_DEPTH)
}

/// Parse `html`, opening elements at most `max_depth` levels deep.
pub fn parse_limited(html: &str, tags: &TagRegistry, max_depth: usize) -> Template {
    let mut parser = Parser {
        chars: html.chars().collect(),
        cursor: 0,
        tags,
        max_depth,
        stack: vec![Frame::root()],
    };
    parser.run();
    let nodes = parser.finish();
    log::trace!("parsed template into {} top-level nodes", nodes.len());
    Template::new(nodes)
}

/// An element still being filled.
struct Frame {
    tag: Option<String>,
    attributes: IndexMap<String, String>,
    children: Vec<TemplateNode>,
}

impl Frame {
    fn root() -> Self {
        Self::open(None)
    }

    fn open(tag: Option<String>) -> Self {
        Self {
            tag,
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }
}

/// How a text run ended.
enum Step {
    /// End of input.
    Eof,
    /// A registered opening tag was read (its name, lowercased).
    Open(String),
    /// The closing tag of the innermost element was read.
    Close,
}

struct Parser<'a> {
    chars: Vec<char>,
    cursor: usize,
    tags: &'a TagRegistry,
    max_depth: usize,
    stack: Vec<Frame>,
}

impl Parser<'_> {
    // ------- Character stream -------

    fn is_eof(&self) -> bool {
        self.cursor >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.cursor).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.cursor += 1;
        Some(c)
    }

    fn skip(&mut self, n: usize) {
        self.cursor = (self.cursor + n).min(self.chars.len());
    }

    fn starts_with(&self, s: &str) -> bool {
        let mut at = self.cursor;
        for c in s.chars() {
            if self.chars.get(at) != Some(&c) {
                return false;
            }
            at += 1;
        }
        true
    }

    fn scan_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let start = self.cursor;
        while self.peek().is_some_and(&keep) {
            self.cursor += 1;
        }
        self.chars[start..self.cursor].iter().collect()
    }

    fn white(&mut self) -> String {
        self.scan_while(is_white)
    }

    fn word(&mut self) -> String {
        self.scan_while(|c| !WORD_STOP.contains(&c))
    }

    // ------- Stack -------

    fn top(&self) -> Option<&str> {
        self.stack.last().and_then(|f| f.tag.as_deref())
    }

    fn top_is_leaf(&self) -> bool {
        self.top().is_some_and(|tag| self.tags.is_leaf(tag))
    }

    /// Number of open elements.
    fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    fn push_node(&mut self, node: TemplateNode) {
        if let Some(frame) = self.stack.last_mut() {
            frame.children.push(node);
        }
    }

    /// Close the innermost element, moving it into its parent.
    fn pop(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(Frame {
            tag: Some(tag),
            attributes,
            children,
        }) = self.stack.pop()
        {
            self.push_node(TemplateNode::Element {
                tag,
                attributes,
                children,
            });
        }
    }

    fn finish(mut self) -> Vec<TemplateNode> {
        while self.stack.len() > 1 {
            self.pop();
        }
        self.stack.pop().map(|f| f.children).unwrap_or_default()
    }

    // ------- Grammar -------

    fn run(&mut self) {
        while !self.is_eof() {
            while self.top_is_leaf() {
                self.pop();
            }

            let (text, step) = self.text_run();
            if keep_text(&text) {
                self.push_node(TemplateNode::Text(entities::decode(&text)));
            }

            match step {
                Step::Eof => {}
                Step::Close => self.pop(),
                Step::Open(tag) => {
                    self.stack.push(Frame::open(Some(tag)));
                    self.attributes();
                }
            }
        }
    }

    /// Read literal text up to the next registered opening tag, the closing
    /// tag of the innermost element, or the end of input.
    fn text_run(&mut self) -> (String, Step) {
        let mut text = String::new();
        while let Some(c) = self.advance() {
            if c != '<' || self.is_eof() {
                text.push(c);
            } else if self.starts_with("!--") {
                self.skip(3);
                while !self.is_eof() && !self.starts_with("-->") {
                    self.cursor += 1;
                }
                self.skip(3);
            } else if self.peek() != Some('/') {
                let word = self.word();
                if self.tags.contains(&word) {
                    if self.depth() < self.max_depth {
                        return (text, Step::Open(word.to_ascii_lowercase()));
                    }
                    log::debug!("<{word}> nests deeper than {} levels, kept as text", self.max_depth);
                }
                text.push('<');
                text.push_str(&word);
            } else if let Some(open) = self.top().map(str::to_owned) {
                self.cursor += 1;
                let word = self.word();
                let mut junk = format!("</{word}");
                if word.to_ascii_lowercase() == open {
                    junk.push_str(&self.white());
                    if self.peek() == Some('>') {
                        self.cursor += 1;
                        return (text, Step::Close);
                    }
                }
                text.push_str(&junk);
            } else {
                text.push(c);
            }
        }
        (text, Step::Eof)
    }

    /// Read the attributes of the element just opened, up to and including
    /// `>` or `/>`.
    fn attributes(&mut self) {
        loop {
            self.white();
            match self.peek() {
                None => return,
                Some('>') => {
                    self.cursor += 1;
                    return;
                }
                Some('/') => {
                    self.cursor += 1;
                    self.white();
                    if self.peek() == Some('>') {
                        self.cursor += 1;
                        self.pop();
                        return;
                    }
                }
                Some(_) => {}
            }

            let name = self.word().to_ascii_lowercase();
            if name.is_empty() {
                self.advance();
                continue;
            }

            self.white();
            let mut value = name.clone();
            if self.peek() == Some('=') {
                self.cursor += 1;
                self.white();
                match self.peek() {
                    Some(quote @ ('"' | '\'')) => {
                        self.cursor += 1;
                        value = self.scan_while(|c| c != quote);
                        self.advance();
                    }
                    Some(_) => {
                        let word = self.word();
                        if !word.is_empty() {
                            value = word;
                        }
                    }
                    None => {}
                }
            }

            if let Some(frame) = self.stack.last_mut() {
                match frame.attributes.get_mut(&name) {
                    Some(existing) => {
                        existing.push(' ');
                        existing.push_str(&value);
                    }
                    None => {
                        frame.attributes.insert(name, value);
                    }
                }
            }
        }
    }
}

/// Whitespace-only runs are dropped, except a lone space or tab.
fn keep_text(text: &str) -> bool {
    !text.is_empty() && (text == " " || text == "\t" || !text.chars().all(is_white))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn p(html: &str) -> Vec<TemplateNode> {
        parse_with(html, &TagRegistry::with_builtins()).nodes
    }

    fn text(s: &str) -> TemplateNode {
        TemplateNode::Text(s.to_owned())
    }

    fn el(tag: &str) -> TemplateNode {
        TemplateNode::element(tag)
    }

    // ── Structure ──

    #[test]
    fn nested_elements_and_text() {
        assert_eq!(
            p("<div>Hello <span>world</span>!</div>"),
            vec![el("div")
                .with_child(text("Hello "))
                .with_child(el("span").with_child(text("world")))
                .with_child(text("!"))]
        );
    }

    #[test]
    fn leaf_tags_auto_close() {
        assert_eq!(p("<br><br>"), vec![el("br"), el("br")]);
        assert_eq!(
            p("<p><input>after</p>"),
            vec![el("p").with_child(el("input")).with_child(text("after"))]
        );
    }

    #[test]
    fn self_closing_tags() {
        assert_eq!(p("<div/>after"), vec![el("div"), text("after")]);
        assert_eq!(p("<span / >x"), vec![el("span"), text("x")]);
    }

    #[test]
    fn unterminated_elements_close_at_end() {
        assert_eq!(
            p("<div><span>x"),
            vec![el("div").with_child(el("span").with_child(text("x")))]
        );
        assert_eq!(p("<div class=\"a"), vec![el("div").with_attribute("class", "a")]);
    }

    #[test]
    fn tag_names_are_case_insensitive() {
        assert_eq!(p("<DIV>x</Div >"), vec![el("div").with_child(text("x"))]);
    }

    // ── Literal fallbacks ──

    #[test]
    fn unknown_tags_stay_text() {
        assert_eq!(p("<blink>hi</blink>"), vec![text("<blink>hi</blink>")]);
        assert_eq!(p("a < b"), vec![text("a < b")]);
        assert_eq!(p("x<"), vec![text("x<")]);
    }

    #[test]
    fn mismatched_closer_is_text() {
        assert_eq!(
            p("<div></span>x</div>"),
            vec![el("div").with_child(text("</span>x"))]
        );
        assert_eq!(p("</div>"), vec![text("</div>")]);
        assert_eq!(
            p("<div>a</div b>c</div>"),
            vec![el("div").with_child(text("a</div b>c"))]
        );
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(p("a<!-- <div> -->b"), vec![text("ab")]);
        assert_eq!(p("a<!-- open"), vec![text("a")]);
    }

    // ── Text ──

    #[test]
    fn whitespace_rule() {
        assert_eq!(
            p("<ul>\n  <li>a</li> <li>b</li>\t<li>c</li>\n</ul>"),
            vec![el("ul")
                .with_child(el("li").with_child(text("a")))
                .with_child(text(" "))
                .with_child(el("li").with_child(text("b")))
                .with_child(text("\t"))
                .with_child(el("li").with_child(text("c")))]
        );
        assert!(p("   \n ").is_empty());
    }

    #[test]
    fn entities_are_decoded() {
        assert_eq!(
            p("<p>&lt;b&gt; &amp; &#65;</p>"),
            vec![el("p").with_child(text("<b> & A"))]
        );
    }

    // ── Attributes ──

    #[test]
    fn attribute_forms() {
        let nodes = p(
            "<a HREF=\"/x\" title='single' hidden data-row=3 [name]=\"link\" @click=\"go\" :title=\"t\">x</a>",
        );
        let TemplateNode::Element { attributes, .. } = &nodes[0] else {
            panic!("expected element");
        };
        let pairs: Vec<_> = attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("href", "/x"),
                ("title", "single"),
                ("hidden", "hidden"),
                ("data-row", "3"),
                ("[name]", "link"),
                ("@click", "go"),
                (":title", "t"),
            ]
        );
    }

    #[test]
    fn repeated_attributes_concatenate() {
        assert_eq!(
            p("<div class=\"a\" class=\"b\"></div>")[0].attribute("class"),
            Some("a b")
        );
    }

    #[test]
    fn stray_characters_in_tag_are_skipped() {
        assert_eq!(
            p("<div \"x\" = id=\"y\">z</div>")[0].attribute("id"),
            Some("y")
        );
    }

    #[test]
    fn attribute_values_keep_expressions() {
        assert_eq!(
            p("<div flare-if=\"a > 1\" title=\"{{ x }}\"></div>")[0].attribute("flare-if"),
            Some("a > 1")
        );
    }

    // ── Properties ──

    #[test]
    fn parse_is_idempotent() {
        let html = "<div class=x><br>text<span [name]=s>!</span></div>";
        assert_eq!(p(html), p(html));
    }

    #[test]
    fn custom_registry_controls_recognition() {
        let mut tags = TagRegistry::new();
        tags.register_class(crate::widget::WidgetClass::new("my-box"));
        assert_eq!(
            parse_with("<my-box><div></div></my-box>", &tags).nodes,
            vec![el("my-box").with_child(text("<div></div>"))]
        );
    }

    #[test]
    fn nesting_past_the_limit_stays_text() {
        let tags = TagRegistry::with_builtins();
        assert_eq!(
            parse_limited("<b><i><u>x</u></i></b>", &tags, 2).nodes,
            vec![el("b").with_child(el("i").with_child(text("<u>x</u>")))]
        );
    }

    #[test]
    fn very_deep_input_is_cut_at_max_depth() {
        let template = parse(&"<div>".repeat(30_000));
        let mut depth = 0;
        let mut level = template.nodes.as_slice();
        while let Some(TemplateNode::Element { children, .. }) = level.first() {
            depth += 1;
            level = children;
        }
        assert_eq!(depth, MAX_DEPTH);
        assert!(matches!(level.first(), Some(TemplateNode::Text(t)) if t.starts_with("<div><div>")));
    }

    #[test]
    fn global_parse_uses_builtins() {
        assert_eq!(parse("<em>x</em>").nodes, vec![el("em").with_child(text("x"))]);
    }
}
