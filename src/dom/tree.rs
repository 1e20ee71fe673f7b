//! Tree operations: insert, move, remove, clone, walk.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use slotmap::{SecondaryMap, SlotMap};

use super::node::{ElementData, ElementId};
use crate::error::{Error, Result};
use crate::widget::Binding;

/// Empty slice constant for returning when an element has no children.
const EMPTY_CHILDREN: &[ElementId] = &[];

/// An in-memory element tree, backed by a slotmap arena.
///
/// All elements live in a single `SlotMap`. Parent/child relationships are
/// stored in secondary maps so that removal is O(subtree size) and lookup is
/// O(1). Elements without a parent are detached; they stay alive until
/// [`Dom::remove`].
pub struct Dom {
    pub(crate) nodes: SlotMap<ElementId, ElementData>,
    children: SecondaryMap<ElementId, Vec<ElementId>>,
    parent: SecondaryMap<ElementId, ElementId>,
    /// Named templates registered on each container.
    pub(crate) templates: SecondaryMap<ElementId, HashMap<String, ElementId>>,
    /// Parsed bindings, cached per bound element.
    pub(crate) bindings: SecondaryMap<ElementId, Rc<[Binding<ElementId>]>>,
    root: Option<ElementId>,
}

impl Dom {
    /// Create an empty DOM.
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            children: SecondaryMap::new(),
            parent: SecondaryMap::new(),
            templates: SecondaryMap::new(),
            bindings: SecondaryMap::new(),
            root: None,
        }
    }

    /// Insert a parentless element.
    ///
    /// If no root has been set yet, this element becomes the root.
    pub fn insert(&mut self, data: ElementData) -> ElementId {
        let id = self.create(data);
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    /// Create a detached element. Never becomes the root.
    pub fn create(&mut self, data: ElementData) -> ElementId {
        let id = self.nodes.insert(data);
        self.children.insert(id, Vec::new());
        id
    }

    /// Insert an element as the last child of `parent`.
    ///
    /// If `parent` does not exist the new element is left detached.
    pub fn insert_child(&mut self, parent: ElementId, data: ElementData) -> ElementId {
        debug_assert!(self.nodes.contains_key(parent), "parent element does not exist");
        let id = self.create(data);
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.push(id);
            self.parent.insert(id, parent);
        }
        id
    }

    /// Move `child` to the end of `parent`'s children, detaching it first.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<()> {
        self.check_move(parent, child)?;
        self.detach(child);
        self.attach(parent, child, None)
    }

    /// Move `child` to sit immediately before `reference` among `parent`'s
    /// children.
    pub fn insert_before(&mut self, parent: ElementId, child: ElementId, reference: ElementId) -> Result<()> {
        self.check_move(parent, child)?;
        if child == reference {
            return Ok(());
        }
        if self.parent(reference) != Some(parent) {
            return Err(Error::UnknownElement);
        }
        self.detach(child);
        self.attach(parent, child, Some(reference))
    }

    fn check_move(&self, parent: ElementId, child: ElementId) -> Result<()> {
        if !self.contains(parent) || !self.contains(child) {
            return Err(Error::UnknownElement);
        }
        if child == parent || self.ancestors(parent).contains(&child) {
            return Err(Error::Render("cannot move an element inside itself".into()));
        }
        Ok(())
    }

    fn attach(&mut self, parent: ElementId, child: ElementId, before: Option<ElementId>) -> Result<()> {
        let siblings = self.children.get_mut(parent).ok_or(Error::UnknownElement)?;
        let index = before
            .and_then(|reference| siblings.iter().position(|&s| s == reference))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        self.parent.insert(child, parent);
        Ok(())
    }

    /// Take `id` out of its parent's children. The subtree stays alive.
    pub fn detach(&mut self, id: ElementId) {
        if let Some(parent_id) = self.parent.remove(id) {
            if let Some(siblings) = self.children.get_mut(parent_id) {
                siblings.retain(|&child| child != id);
            }
        }
    }

    /// Remove an element and all its descendants, along with any templates
    /// registered on them and their cached bindings.
    ///
    /// Returns the `ElementData` for the removed element, or `None` if it
    /// didn't exist.
    pub fn remove(&mut self, id: ElementId) -> Option<ElementData> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        self.detach(id);
        if self.root == Some(id) {
            self.root = None;
        }

        let mut to_remove = VecDeque::new();
        to_remove.push_back(id);
        let mut removed_root_data = None;

        while let Some(current) = to_remove.pop_front() {
            if let Some(kids) = self.children.remove(current) {
                to_remove.extend(kids);
            }
            if let Some(registry) = self.templates.remove(current) {
                to_remove.extend(registry.into_values());
            }
            self.bindings.remove(current);
            self.parent.remove(current);
            let data = self.nodes.remove(current);
            if current == id {
                removed_root_data = data;
            }
        }

        removed_root_data
    }

    /// Deep-copy the subtree at `id` into a new detached subtree.
    pub fn deep_clone(&mut self, id: ElementId) -> Option<ElementId> {
        let data = self.nodes.get(id)?.clone();
        let copy = self.create(data);
        let kids = self.children(id).to_vec();
        for kid in kids {
            if let Some(kid_copy) = self.deep_clone(kid) {
                self.parent.insert(kid_copy, copy);
                if let Some(siblings) = self.children.get_mut(copy) {
                    siblings.push(kid_copy);
                }
            }
        }
        Some(copy)
    }

    /// Get the parent of an element, if it has one.
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.parent.get(id).copied()
    }

    /// Get the children of an element. Returns an empty slice if the element
    /// has no children or does not exist.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or(EMPTY_CHILDREN)
    }

    /// Walk from `id` up to the top of its tree, collecting ancestor ids.
    ///
    /// The returned vec does **not** include `id` itself.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut current = id;
        while let Some(p) = self.parent.get(current).copied() {
            result.push(p);
            current = p;
        }
        result
    }

    /// Immutable access to an element's data.
    pub fn get(&self, id: ElementId) -> Option<&ElementData> {
        self.nodes.get(id)
    }

    /// Mutable access to an element's data.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut ElementData> {
        self.nodes.get_mut(id)
    }

    /// The root element, if set.
    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    /// Number of live elements, templates and detached ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the DOM is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the DOM contains an element with the given id.
    pub fn contains(&self, id: ElementId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Pre-order depth-first traversal starting from `start`.
    pub fn walk_depth_first(&self, start: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !self.nodes.contains_key(current) {
                continue;
            }
            result.push(current);
            // Push children in reverse so the first child is visited first.
            for &child in self.children(current).iter().rev() {
                stack.push(child);
            }
        }
        result
    }
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}
