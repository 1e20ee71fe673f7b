//! OrderedCollection: an observable sequence of nodes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::node::{
    child_change_topic, Event, Forwarding, Node, Observable, ParentRef, Parents,
};
use super::pubsub::PubSub;
use super::value::Snapshot;
use crate::error::{Error, Result};

pub(crate) struct ListInner {
    items: RefCell<Vec<Node>>,
    events: PubSub<Node, Event>,
    parents: Parents,
    forwarding: Forwarding,
}

/// An observable, insertion-ordered list of nodes.
///
/// Adding a node links this collection into the node's parent set so that
/// the node's changes are forwarded here as `"change.<source>"` events.
#[derive(Clone)]
pub struct OrderedCollection {
    inner: Rc<ListInner>,
}

impl OrderedCollection {
    /// An empty collection.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ListInner {
                items: RefCell::new(Vec::new()),
                events: PubSub::new(),
                parents: Parents::new(),
                forwarding: Forwarding::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<ListInner>) -> Self {
        Self { inner }
    }

    fn link(&self) -> ParentRef {
        ParentRef::List(Rc::downgrade(&self.inner))
    }

    /// Append `node` and emit `"add"`.
    ///
    /// If an `"add"` subscriber fails, the node is taken back out and
    /// unlinked before the error is returned. Subscribers that already ran
    /// are not told.
    pub fn add(&self, node: impl Into<Node>) -> Result<()> {
        let node = node.into();
        self.inner.items.borrow_mut().push(node.clone());
        node.parents().add(self.link());
        tracing::debug!(len = self.len(), "ordered collection add");
        let result = self.emit(&Event::Add {
            child: node.clone(),
            key: None,
        });
        if result.is_err() {
            self.rollback_add(&node);
        }
        result
    }

    fn rollback_add(&self, node: &Node) {
        let removed = {
            let mut items = self.inner.items.borrow_mut();
            match items.iter().rposition(|item| item.ptr_eq(node)) {
                Some(index) => {
                    items.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            node.parents().remove(&self.link());
        }
        tracing::debug!(len = self.len(), "ordered collection add rolled back");
    }

    /// Remove the first occurrence of `node` and emit `"remove"`.
    ///
    /// Fails with [`Error::NotAMember`] if the node is not held here.
    pub fn remove(&self, node: &Node) -> Result<()> {
        let removed = {
            let mut items = self.inner.items.borrow_mut();
            let index = items
                .iter()
                .position(|item| item.ptr_eq(node))
                .ok_or(Error::NotAMember)?;
            items.remove(index)
        };
        removed.parents().remove(&self.link());
        tracing::debug!(len = self.len(), "ordered collection remove");
        self.emit(&Event::Remove {
            child: removed,
            key: None,
        })
    }

    /// Whether `node` is held here.
    pub fn contains(&self, node: &Node) -> bool {
        self.inner.items.borrow().iter().any(|item| item.ptr_eq(node))
    }

    /// Whether this collection is in `node`'s parent set.
    pub fn is_parent_of(&self, node: &Node) -> bool {
        node.parents().contains(&self.link())
    }

    /// The node at `index`.
    pub fn get(&self, index: usize) -> Option<Node> {
        self.inner.items.borrow().get(index).cloned()
    }

    /// A copy of the current members, in order.
    pub fn items(&self) -> Vec<Node> {
        self.inner.items.borrow().clone()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.items.borrow().is_empty()
    }

    /// Whether both handles point at the same collection.
    pub fn ptr_eq(&self, other: &OrderedCollection) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Re-emit a descendant's change as `"change.<source>"`, then bubble it
    /// to this collection's own parents.
    ///
    /// A forward of a child this collection is already forwarding can only
    /// arrive through a containment cycle, and stops here. Changes to other
    /// children made from inside a handler are forwarded as usual.
    pub(crate) fn child_changed(&self, child: &Node, previous: &Snapshot, source: &str) -> Result<()> {
        let Some(_forward) = self.inner.forwarding.enter(child) else {
            tracing::trace!(
                depth = self.inner.forwarding.depth(),
                "ordered collection reached again by the same child; containment cycle cut"
            );
            return Ok(());
        };
        self.events().emit(
            &child_change_topic(source),
            &self.to_node(),
            &Event::ChildChange {
                child: child.clone(),
                previous: Rc::clone(previous),
                source: source.to_owned(),
            },
        )?;
        self.parents().notify(child, previous, source)
    }
}

impl Default for OrderedCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for OrderedCollection {
    fn events(&self) -> &PubSub<Node, Event> {
        &self.inner.events
    }

    fn parents(&self) -> &Parents {
        &self.inner.parents
    }

    fn to_node(&self) -> Node {
        Node::List(self.clone())
    }
}

impl fmt::Debug for OrderedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedCollection")
            .field("len", &self.len())
            .field("parents", &self.inner.parents.len())
            .finish()
    }
}
