//! Tag registry: maps lowercase tag names to widget classes.
//!
//! [`TagRegistry`] is a plain value that parsers and renderers can be handed
//! directly. The process-wide table behind [`register_tag`] / [`resolve`] is
//! what they fall back to; it starts out with the built-in HTML5 set and can
//! be snapshotted and restored for test isolation.

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::widget::{builtin, WidgetClass};

/// A registered tag: its widget class and the lowercase names of the
/// properties the class can set.
#[derive(Debug, Clone)]
pub struct Registration {
    pub class: Arc<WidgetClass>,
    pub attributes: Vec<String>,
}

impl Registration {
    fn new(class: WidgetClass) -> Self {
        Self {
            attributes: class.attribute_names(),
            class: Arc::new(class),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.class.is_leaf()
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.attributes.iter().any(|a| *a == name)
    }
}

/// Tag name → [`Registration`] table.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    tags: IndexMap<String, Registration>,
}

impl TagRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in HTML5 tag.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for class in builtin::classes() {
            registry.register_class(class);
        }
        registry
    }

    /// Register `class` under `tag`. With `replace` unset an existing entry
    /// is kept. Returns whether the registration took place.
    pub fn register(&mut self, tag: &str, class: WidgetClass, replace: bool) -> bool {
        let tag = tag.to_ascii_lowercase();
        if !replace && self.tags.contains_key(&tag) {
            log::debug!("tag <{tag}> already registered, keeping it");
            return false;
        }
        log::trace!("registering tag <{tag}> as {}", class.name());
        self.tags.insert(tag, Registration::new(class));
        true
    }

    /// Register `class` under its own name, replacing any previous entry.
    pub fn register_class(&mut self, class: WidgetClass) -> bool {
        let tag = class.name().to_owned();
        self.register(&tag, class, true)
    }

    /// Look up a tag, case-insensitively.
    pub fn resolve(&self, tag: &str) -> Option<&Registration> {
        self.tags
            .get(tag)
            .or_else(|| self.tags.get(&tag.to_ascii_lowercase()))
    }

    /// Widget class of a tag.
    pub fn class(&self, tag: &str) -> Option<Arc<WidgetClass>> {
        self.resolve(tag).map(|r| Arc::clone(&r.class))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.resolve(tag).is_some()
    }

    pub fn is_leaf(&self, tag: &str) -> bool {
        self.resolve(tag).is_some_and(Registration::is_leaf)
    }

    pub fn unregister(&mut self, tag: &str) -> Option<Registration> {
        self.tags.shift_remove(&tag.to_ascii_lowercase())
    }

    /// Registered tag names, in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Process-wide registry
// ---------------------------------------------------------------------------

static REGISTRY: Lazy<RwLock<TagRegistry>> = Lazy::new(|| RwLock::new(TagRegistry::with_builtins()));

/// Make sure the process-wide registry exists and holds the built-in tags.
pub fn init() {
    Lazy::force(&REGISTRY);
}

/// Register `class` under `tag` in the process-wide registry.
pub fn register_tag(tag: &str, class: WidgetClass, replace: bool) -> bool {
    REGISTRY.write().register(tag, class, replace)
}

/// Look up a tag in the process-wide registry.
pub fn resolve(tag: &str) -> Option<Registration> {
    REGISTRY.read().resolve(tag).cloned()
}

/// Widget class of a tag in the process-wide registry.
pub fn resolve_class(tag: &str) -> Option<Arc<WidgetClass>> {
    REGISTRY.read().class(tag)
}

/// Run `f` with shared access to the process-wide registry.
///
/// `f` must not register tags itself.
pub fn with<R>(f: impl FnOnce(&TagRegistry) -> R) -> R {
    f(&REGISTRY.read())
}

/// Copy of the current process-wide registry.
pub fn snapshot() -> TagRegistry {
    REGISTRY.read().clone()
}

/// Replace the process-wide registry with `registry`.
pub fn restore(registry: TagRegistry) {
    *REGISTRY.write() = registry;
}

/// Reset the process-wide registry to the built-in tags.
pub fn reset() {
    restore(TagRegistry::with_builtins());
}

// ===========================================================================
// Tests
// ===========================================================================
