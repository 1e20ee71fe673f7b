//! Element types: ElementId, ElementData.

use std::collections::BTreeMap;

use slotmap::new_key_type;

new_key_type! {
    /// Unique identifier for an element. Copy, lightweight (u64).
    pub struct ElementId;
}

/// Attribute holding an element's bind spec.
pub const BIND_ATTRIBUTE: &str = "data-bind";

/// Attribute marking a container child as a named template.
pub const TEMPLATE_ATTRIBUTE: &str = "data-template";

/// Data associated with a single element.
///
/// `id` and `class` are ordinary attributes; the accessors below read them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Tag name (e.g. "li", "span").
    pub tag: String,
    /// Attributes, kept sorted by name.
    pub attributes: BTreeMap<String, String>,
    /// Text content, written before any children.
    pub text: Option<String>,
}

impl ElementData {
    /// Create a new `ElementData` with the given tag and no attributes.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            text: None,
        }
    }

    /// Set the id (builder).
    pub fn with_id(self, id: impl Into<String>) -> Self {
        self.with_attr("id", id)
    }

    /// Add a single class (builder).
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.add_class(&class.into());
        self
    }

    /// Set an attribute (builder).
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text content (builder).
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the bind spec (builder).
    pub fn with_bind(self, spec: impl Into<String>) -> Self {
        self.with_attr(BIND_ATTRIBUTE, spec)
    }

    /// Read an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Write an attribute.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        self.attributes.remove(name)
    }

    /// The `id` attribute.
    pub fn id(&self) -> Option<&str> {
        self.attr("id")
    }

    /// Classes from the `class` attribute.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    /// Check whether this element has a given class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Add a class. No-op if already present.
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{existing} {class}"),
            _ => class.to_owned(),
        };
        self.set_attr("class", joined);
    }

    /// The bind spec, if any.
    pub fn bind_spec(&self) -> Option<&str> {
        self.attr(BIND_ATTRIBUTE)
    }

    /// The template name this element is marked with, if any.
    pub fn template_name(&self) -> Option<&str> {
        self.attr(TEMPLATE_ATTRIBUTE)
    }
}
