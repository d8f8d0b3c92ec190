//! Attribute capabilities: small named groups of typed properties that widget
//! classes compose.
//!
//! A widget class is the union of the capabilities it is built `with`. The
//! property names they contribute are what the tag registry reports as the
//! class's recognized attributes.

use crate::dom::DomError;
use crate::eval::Value;

// ---------------------------------------------------------------------------
// Accessor
// ---------------------------------------------------------------------------

/// How a property value is stored, validated and serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    /// Free-form string attribute.
    Text,
    /// Integer attribute (`tabindex`, `colspan`, ...).
    Integer,
    /// Boolean attribute, serialized bare when set.
    Flag,
    /// Enumerated two-state attribute, serialized as `on` / `off`.
    Switch { on: &'static str, off: &'static str },
    /// The node's class list.
    Classes,
    /// The node's (inherited) disabled state.
    Disabled,
    /// The node's hidden state.
    Hidden,
}

impl Accessor {
    /// Validate and normalize a value assigned to property `name`.
    pub fn coerce(self, name: &str, value: Value) -> Result<Value, DomError> {
        match self {
            Accessor::Text | Accessor::Classes => Ok(Value::Str(value.to_text())),
            Accessor::Switch { off, .. } => Ok(Value::Bool(match &value {
                Value::Str(s) => !s.trim().eq_ignore_ascii_case(off) && value.is_truthy(),
                other => other.is_truthy(),
            })),
            Accessor::Flag | Accessor::Disabled | Accessor::Hidden => {
                Ok(Value::Bool(value.is_truthy()))
            }
            Accessor::Integer => match &value {
                Value::Int(_) => Ok(value),
                Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
                Value::Str(s) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                    DomError::InvalidValue {
                        name: name.to_owned(),
                        message: format!("expected an integer, got {}", value.repr()),
                    }
                }),
                other => Err(DomError::InvalidValue {
                    name: name.to_owned(),
                    message: format!("expected an integer, got {}", other.type_name()),
                }),
            },
        }
    }

    /// HTML attribute value for a stored property, `None` if the attribute
    /// should be absent.
    pub fn render(self, value: &Value) -> Option<String> {
        match self {
            Accessor::Flag => value.is_truthy().then(String::new),
            Accessor::Switch { on, off } => Some(if value.is_truthy() { on } else { off }.to_owned()),
            _ if value.is_none() => None,
            _ => Some(value.to_text()),
        }
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// A named set of properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub name: &'static str,
    pub properties: &'static [(&'static str, Accessor)],
}

const TRUE_FALSE: Accessor = Accessor::Switch { on: "true", off: "false" };

/// Properties every widget has.
pub const GLOBAL: Capability = Capability {
    name: "global",
    properties: &[
        ("accesskey", Accessor::Text),
        ("class", Accessor::Classes),
        ("contenteditable", TRUE_FALSE),
        ("contextmenu", Accessor::Text),
        ("dir", Accessor::Text),
        ("disabled", Accessor::Disabled),
        ("draggable", TRUE_FALSE),
        ("dropzone", Accessor::Text),
        ("hidden", Accessor::Hidden),
        ("id", Accessor::Text),
        ("lang", Accessor::Text),
        ("role", Accessor::Text),
        ("spellcheck", TRUE_FALSE),
        ("tabindex", Accessor::Integer),
        ("title", Accessor::Text),
        ("translate", Accessor::Switch { on: "yes", off: "no" }),
    ],
};

/// Native `disabled` attribute: the disabled state is written to the element.
pub const DISABLED: Capability = Capability {
    name: "disabled",
    properties: &[],
};

macro_rules! capability {
    ($(#[$doc:meta])* $ident:ident = $name:literal { $($prop:literal => $acc:expr),* $(,)? }) => {
        $(#[$doc])*
        pub const $ident: Capability = Capability {
            name: $name,
            properties: &[$(($prop, $acc)),*],
        };
    };
}

capability!(LABEL = "label" { "label" => Accessor::Text });
capability!(CHARSET = "charset" { "charset" => Accessor::Text });
capability!(CITE = "cite" { "cite" => Accessor::Text });
capability!(DATETIME = "datetime" { "datetime" => Accessor::Text });
capability!(FORM = "form" { "form" => Accessor::Text });
capability!(ALT = "alt" { "alt" => Accessor::Text });
capability!(AUTOFOCUS = "autofocus" { "autofocus" => Accessor::Flag });
capability!(CHECKED = "checked" { "checked" => Accessor::Flag });
capability!(INDETERMINATE = "indeterminate" { "indeterminate" => Accessor::Flag });
capability!(NAME = "name" { "name" => Accessor::Text });
capability!(VALUE = "value" { "value" => Accessor::Text });
capability!(AUTOCOMPLETE = "autocomplete" {
    "autocomplete" => Accessor::Switch { on: "on", off: "off" },
});
capability!(REQUIRED = "required" { "required" => Accessor::Flag });
capability!(MULTIPLE = "multiple" { "multiple" => Accessor::Flag });
capability!(SIZE = "size" { "size" => Accessor::Integer });
capability!(FOR = "for" { "for" => Accessor::Text });
capability!(
    /// Text-entry controls.
    INPUTS = "inputs" {
        "required" => Accessor::Flag,
        "maxlength" => Accessor::Integer,
        "placeholder" => Accessor::Text,
        "readonly" => Accessor::Flag,
    }
);
capability!(
    /// Form-submission overrides on submit controls.
    FORMHEAD = "formhead" {
        "formaction" => Accessor::Text,
        "formenctype" => Accessor::Text,
        "formmethod" => Accessor::Text,
        "formtarget" => Accessor::Text,
        "formnovalidate" => Accessor::Flag,
    }
);
capability!(HREF = "href" { "href" => Accessor::Text, "hreflang" => Accessor::Text });
capability!(TARGET = "target" { "target" => Accessor::Text });
capability!(TYPE = "type" { "type" => Accessor::Text });
capability!(MEDIA = "media" { "type" => Accessor::Text, "media" => Accessor::Text });
capability!(DIMENSIONS = "dimensions" { "width" => Accessor::Text, "height" => Accessor::Text });
capability!(USEMAP = "usemap" { "usemap" => Accessor::Text });
capability!(
    /// Audio and video playback controls.
    MULTIMEDIA = "multimedia" {
        "autoplay" => Accessor::Flag,
        "playsinline" => Accessor::Flag,
        "controls" => Accessor::Flag,
        "loop" => Accessor::Flag,
        "muted" => Accessor::Flag,
        "preload" => Accessor::Text,
    }
);
capability!(REL = "rel" { "rel" => Accessor::Text });
capability!(SRC = "src" { "src" => Accessor::Text });
