//! Element queries: simple selectors matched against a subtree.

use std::fmt;

use super::node::{ElementData, ElementId};
use super::tree::Dom;

/// A simple selector: `tag`, `.class`, or `#id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Tag(String),
    Class(String),
    Id(String),
}

impl Selector {
    /// Parse by leading sigil; anything without one is a tag name.
    pub fn parse(text: &str) -> Self {
        if let Some(class) = text.strip_prefix('.') {
            Selector::Class(class.to_owned())
        } else if let Some(id) = text.strip_prefix('#') {
            Selector::Id(id.to_owned())
        } else {
            Selector::Tag(text.to_owned())
        }
    }

    /// Whether `data` matches this selector.
    pub fn matches(&self, data: &ElementData) -> bool {
        match self {
            Selector::Tag(tag) => data.tag.eq_ignore_ascii_case(tag),
            Selector::Class(class) => data.has_class(class),
            Selector::Id(id) => data.id() == Some(id.as_str()),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Tag(tag) => write!(f, "{tag}"),
            Selector::Class(class) => write!(f, ".{class}"),
            Selector::Id(id) => write!(f, "#{id}"),
        }
    }
}

impl Dom {
    /// Descendants of `root` (excluding `root`) matching `selector`, in
    /// document order.
    pub fn query_subtree(&self, root: ElementId, selector: &Selector) -> Vec<ElementId> {
        self.walk_depth_first(root)
            .into_iter()
            .skip(1)
            .filter(|&id| self.get(id).is_some_and(|data| selector.matches(data)))
            .collect()
    }

    /// First element in the tree under `root` (inclusive) with the given id.
    pub fn query_by_id(&self, root: ElementId, id: &str) -> Option<ElementId> {
        self.walk_depth_first(root)
            .into_iter()
            .find(|&el| self.get(el).and_then(ElementData::id) == Some(id))
    }
}
