//! The built-in HTML5 widget set.

use std::sync::Arc;

use super::capability::*;
use super::class::WidgetClass;
use crate::dom::{Dom, DomError, NodeId};

/// Slot names a table pre-builds.
pub const TABLE_SLOTS: [&str; 2] = ["thead", "tbody"];

/// Tags that never have children.
pub const LEAF_TAGS: [&str; 12] = [
    "area", "br", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
];

/// Tags with nothing beyond the global properties.
const PLAIN_TAGS: &[&str] = &[
    "abbr", "address", "article", "aside", "b", "bdi", "bdo", "caption", "cite", "code",
    "datalist", "dd", "dfn", "div", "dl", "dt", "em", "figcaption", "figure", "footer", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "i", "kbd", "legend", "li", "mark", "menu", "nav",
    "noscript", "ol", "p", "rp", "rt", "ruby", "s", "samp", "section", "small", "span", "strong",
    "sub", "summary", "sup", "tbody", "template", "thead", "u", "ul", "var",
];

fn leaf(tag: &str) -> WidgetClass {
    WidgetClass::new(tag).leaf()
}

/// Pre-build the `thead` and `tbody` children of a new table.
fn build_table(dom: &mut Dom, table: NodeId) -> Result<(), DomError> {
    for slot in TABLE_SLOTS {
        let section = dom.create(Arc::new(WidgetClass::new(slot)))?;
        dom.append_child(table, section)?;
        dom.set_slot(table, slot, section)?;
    }
    Ok(())
}

fn form() -> WidgetClass {
    WidgetClass::new("form")
        .with(DISABLED)
        .with(NAME)
        .with(TARGET)
        .with(AUTOCOMPLETE)
        .property("novalidate", Accessor::Flag)
        .property("action", Accessor::Text)
        .property("method", Accessor::Text)
        .property("enctype", Accessor::Text)
        .property("accept-charset", Accessor::Text)
}

fn label() -> WidgetClass {
    WidgetClass::new("label").with(FORM).with(FOR)
}

/// The document body every [`Dom`] starts with.
pub fn body() -> WidgetClass {
    WidgetClass::new("body")
}

/// Every built-in widget class.
pub fn classes() -> Vec<WidgetClass> {
    let mut all: Vec<WidgetClass> = PLAIN_TAGS.iter().map(|t| WidgetClass::new(*t)).collect();
    all.extend([
        WidgetClass::new("a")
            .with(HREF)
            .with(TARGET)
            .with(MEDIA)
            .with(REL)
            .with(NAME)
            .property("download", Accessor::Text),
        WidgetClass::extends(
            &WidgetClass::new("a").with(HREF).with(TARGET).with(MEDIA).with(REL).with(NAME),
            "area",
        )
        .element("area")
        .with(ALT)
        .property("coords", Accessor::Text)
        .property("shape", Accessor::Text)
        .leaf(),
        WidgetClass::new("audio").with(SRC).with(MULTIMEDIA),
        WidgetClass::new("blockquote").with(CITE),
        leaf("br"),
        WidgetClass::new("button")
            .with(DISABLED)
            .with(TYPE)
            .with(FORM)
            .with(AUTOFOCUS)
            .with(NAME)
            .with(VALUE)
            .with(FORMHEAD),
        WidgetClass::new("canvas").with(DIMENSIONS),
        WidgetClass::new("del").with(CITE).with(DATETIME),
        WidgetClass::new("details").property("open", Accessor::Flag),
        WidgetClass::new("dialog").property("open", Accessor::Flag),
        leaf("embed").with(SRC).with(TYPE).with(DIMENSIONS),
        WidgetClass::new("fieldset").with(DISABLED).with(FORM).with(NAME),
        form(),
        leaf("hr"),
        WidgetClass::new("iframe")
            .with(SRC)
            .with(NAME)
            .with(DIMENSIONS)
            .property("sandbox", Accessor::Text)
            .property("srcdoc", Accessor::Text)
            .property("seamless", Accessor::Flag),
        leaf("img")
            .with(SRC)
            .with(DIMENSIONS)
            .with(USEMAP)
            .with(ALT)
            .property("crossorigin", Accessor::Text)
            .property("ismap", Accessor::Flag),
        leaf("input")
            .with(DISABLED)
            .with(TYPE)
            .with(FORM)
            .with(ALT)
            .with(AUTOFOCUS)
            .with(CHECKED)
            .with(INDETERMINATE)
            .with(NAME)
            .with(DIMENSIONS)
            .with(VALUE)
            .with(FORMHEAD)
            .with(AUTOCOMPLETE)
            .with(INPUTS)
            .with(MULTIPLE)
            .with(SIZE)
            .with(SRC)
            .property("accept", Accessor::Text)
            .property("list", Accessor::Text)
            .property("max", Accessor::Text)
            .property("min", Accessor::Text)
            .property("pattern", Accessor::Text)
            .property("step", Accessor::Text),
        WidgetClass::new("ins").with(CITE).with(DATETIME),
        label(),
        leaf("link")
            .with(HREF)
            .with(MEDIA)
            .with(REL)
            .property("sizes", Accessor::Text),
        WidgetClass::extends(&label(), "map").element("map").with(TYPE),
        leaf("meta")
            .with(NAME)
            .with(CHARSET)
            .property("content", Accessor::Text),
        WidgetClass::extends(&form(), "meter")
            .element("meter")
            .with(VALUE)
            .property("high", Accessor::Text)
            .property("low", Accessor::Text)
            .property("max", Accessor::Text)
            .property("min", Accessor::Text)
            .property("optimum", Accessor::Text),
        WidgetClass::extends(&form(), "object")
            .element("object")
            .with(TYPE)
            .with(DIMENSIONS)
            .with(USEMAP),
        WidgetClass::new("optgroup").with(DISABLED).with(LABEL),
        WidgetClass::new("option")
            .with(DISABLED)
            .with(LABEL)
            .with(VALUE)
            .property("selected", Accessor::Flag),
        WidgetClass::new("output").with(FORM).with(NAME).with(FOR),
        leaf("param").with(NAME).with(VALUE),
        WidgetClass::new("progress")
            .with(VALUE)
            .property("max", Accessor::Text),
        WidgetClass::new("q").with(CITE),
        WidgetClass::new("script")
            .with(SRC)
            .with(CHARSET)
            .property("async", Accessor::Flag)
            .property("defer", Accessor::Flag),
        WidgetClass::new("select")
            .with(DISABLED)
            .with(FORM)
            .with(AUTOFOCUS)
            .with(NAME)
            .with(REQUIRED)
            .with(MULTIPLE)
            .with(SIZE),
        leaf("source").with(MEDIA).with(SRC),
        WidgetClass::new("style")
            .with(MEDIA)
            .property("scoped", Accessor::Flag),
        WidgetClass::new("table").on_build(build_table),
        WidgetClass::new("td")
            .property("colspan", Accessor::Integer)
            .property("rowspan", Accessor::Integer),
        WidgetClass::new("textarea")
            .with(DISABLED)
            .with(FORM)
            .with(AUTOFOCUS)
            .with(NAME)
            .with(INPUTS)
            .with(VALUE)
            .property("cols", Accessor::Integer)
            .property("rows", Accessor::Integer)
            .property("wrap", Accessor::Text),
        WidgetClass::new("th")
            .property("colspan", Accessor::Integer)
            .property("rowspan", Accessor::Integer),
        WidgetClass::new("time").with(DATETIME),
        WidgetClass::new("tr").property("rowspan", Accessor::Integer),
        WidgetClass::extends(&label(), "track")
            .element("track")
            .with(SRC)
            .property("kind", Accessor::Text)
            .property("srclang", Accessor::Text)
            .property("default", Accessor::Flag)
            .leaf(),
        WidgetClass::new("video")
            .with(SRC)
            .with(DIMENSIONS)
            .with(MULTIMEDIA)
            .property("poster", Accessor::Text),
        leaf("wbr"),
    ]);
    all
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn names_are_unique() {
        let all = classes();
        let names: HashSet<_> = all.iter().map(|c| c.name().to_owned()).collect();
        assert_eq!(names.len(), all.len());
    }

    #[test]
    fn leaf_tags_match_leaf_flags() {
        let leaves: HashSet<_> = classes()
            .into_iter()
            .filter(|c| c.is_leaf())
            .map(|c| c.name().to_owned())
            .collect();
        let expected: HashSet<_> = LEAF_TAGS.iter().map(|t| (*t).to_owned()).collect();
        assert_eq!(leaves, expected);
    }

    #[test]
    fn element_names_match_class_names() {
        for class in classes() {
            assert_eq!(class.name(), class.element_name());
        }
    }

    #[test]
    fn form_controls_carry_native_disabled() {
        let all = classes();
        let find = |n: &str| all.iter().find(|c| c.name() == n).unwrap();
        assert!(find("input").has_capability("disabled"));
        assert!(find("button").has_capability("disabled"));
        assert!(!find("div").has_capability("disabled"));
        assert!(find("input").accessor("placeholder").is_some());
    }
}
