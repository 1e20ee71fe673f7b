//! Renderer capability: the seam between widgets and an element tree.
//!
//! The core never parses markup. It asks a [`Renderer`] for the pre-parsed
//! [`Binding`]s of an element, resolves each slot against a record, and hands
//! the results back to be written.

use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use crate::error::{Error, Result};

/// Where a binding writes its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindTarget {
    /// The element's text content.
    Text,
    /// One named attribute.
    Attribute(String),
}

/// One resolved bind rule: write `slot` into `target` of `element`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding<E> {
    pub element: E,
    pub target: BindTarget,
    pub slot: String,
}

impl<E> Binding<E> {
    /// Whether this binding writes text content.
    pub fn is_text(&self) -> bool {
        self.target == BindTarget::Text
    }

    /// The attribute written, if this is an attribute binding.
    pub fn attribute_name(&self) -> Option<&str> {
        match &self.target {
            BindTarget::Text => None,
            BindTarget::Attribute(name) => Some(name),
        }
    }
}

/// A value ready to be written into the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Renderable<E> {
    /// Plain text.
    Scalar(String),
    /// An element (typically another widget's) to mount as the sole child.
    Element(E),
}

impl<E> From<String> for Renderable<E> {
    fn from(text: String) -> Self {
        Renderable::Scalar(text)
    }
}

impl<E> From<&str> for Renderable<E> {
    fn from(text: &str) -> Self {
        Renderable::Scalar(text.to_owned())
    }
}

/// Resolves a slot path to the value to render; `None` renders as empty.
pub type Resolve<'a, E> = dyn Fn(&str) -> Option<Renderable<E>> + 'a;

/// An element tree that widgets can clone templates into and bind against.
pub trait Renderer {
    /// Handle to one element. Cheap to copy; equality is identity.
    type Element: Copy + Eq + Hash + fmt::Debug + 'static;

    /// Whether `container` has a template registered as `template`.
    fn has_template(&self, container: Self::Element, template: &str) -> bool;

    /// A fresh, detached deep copy of the template.
    fn clone_template(&mut self, container: Self::Element, template: &str) -> Result<Self::Element>;

    /// The bindings declared in `element`'s subtree, parsed once and cached.
    fn bindings(&mut self, element: Self::Element) -> Result<Rc<[Binding<Self::Element>]>>;

    /// Write every binding using `resolve`.
    fn apply(&mut self, bindings: &[Binding<Self::Element>], resolve: &Resolve<'_, Self::Element>) -> Result<()>;

    /// Number of direct children of `container`.
    fn child_count(&self, container: Self::Element) -> usize;

    /// The child of `container` at `index`.
    fn child_at(&self, container: Self::Element, index: usize) -> Option<Self::Element>;

    /// Make `child` the last child of `container`, detaching it first.
    fn append_child(&mut self, container: Self::Element, child: Self::Element) -> Result<()>;

    /// Place `child` immediately before `reference` inside `container`.
    fn insert_before(
        &mut self,
        container: Self::Element,
        child: Self::Element,
        reference: Self::Element,
    ) -> Result<()>;

    /// Take `element` out of its parent, keeping it alive.
    fn detach(&mut self, element: Self::Element);

    /// Free `element` and its subtree.
    fn destroy(&mut self, element: Self::Element);

    /// Place `element` at `index` among `container`'s children: append when
    /// `index` is the current child count, otherwise insert before the child
    /// now at `index`.
    fn insert_at(&mut self, container: Self::Element, element: Self::Element, index: usize) -> Result<()> {
        if index >= self.child_count(container) {
            return self.append_child(container, element);
        }
        let reference = self
            .child_at(container, index)
            .ok_or(Error::UnknownElement)?;
        self.insert_before(container, element, reference)
    }
}
