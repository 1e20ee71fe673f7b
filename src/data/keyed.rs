//! KeyedCollection: an observable string-keyed map of nodes.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use super::node::{
    child_change_topic, Event, Forwarding, Node, Observable, ParentRef, Parents,
};
use super::pubsub::PubSub;
use super::value::Snapshot;
use crate::error::{Error, Result};

pub(crate) struct MapInner {
    entries: RefCell<BTreeMap<String, Node>>,
    events: PubSub<Node, Event>,
    parents: Parents,
    forwarding: Forwarding,
}

/// An observable map from unique string keys to nodes.
///
/// Shares the change-forwarding contract of
/// [`OrderedCollection`](super::OrderedCollection); iteration is in key order.
#[derive(Clone)]
pub struct KeyedCollection {
    inner: Rc<MapInner>,
}

impl KeyedCollection {
    /// An empty collection.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(MapInner {
                entries: RefCell::new(BTreeMap::new()),
                events: PubSub::new(),
                parents: Parents::new(),
                forwarding: Forwarding::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Rc<MapInner>) -> Self {
        Self { inner }
    }

    fn link(&self) -> ParentRef {
        ParentRef::Map(Rc::downgrade(&self.inner))
    }

    /// Insert `node` under `key` and emit `"add"`.
    ///
    /// Re-adding the same node under its current key is a silent no-op.
    /// A different node under an occupied key fails with
    /// [`Error::DuplicateKey`]. If an `"add"` subscriber fails, the entry is
    /// removed and unlinked again before the error is returned.
    pub fn add(&self, key: impl Into<String>, node: impl Into<Node>) -> Result<()> {
        let key = key.into();
        let node = node.into();
        {
            let mut entries = self.inner.entries.borrow_mut();
            if let Some(existing) = entries.get(&key) {
                if existing.ptr_eq(&node) {
                    return Ok(());
                }
                return Err(Error::DuplicateKey { key });
            }
            entries.insert(key.clone(), node.clone());
        }
        node.parents().add(self.link());
        tracing::debug!(%key, "keyed collection add");
        let result = self.emit(&Event::Add {
            child: node.clone(),
            key: Some(key.clone()),
        });
        if result.is_err() {
            self.rollback_add(&key, &node);
        }
        result
    }

    fn rollback_add(&self, key: &str, node: &Node) {
        let removed = {
            let mut entries = self.inner.entries.borrow_mut();
            match entries.get(key) {
                Some(current) if current.ptr_eq(node) => entries.remove(key).is_some(),
                _ => false,
            }
        };
        if removed {
            node.parents().remove(&self.link());
        }
        tracing::debug!(key, "keyed collection add rolled back");
    }

    /// Remove the entry under `key`, emit `"remove"`, and return its node.
    ///
    /// Fails with [`Error::MissingKey`] if there is no such entry.
    pub fn remove_key(&self, key: &str) -> Result<Node> {
        let removed = self
            .inner
            .entries
            .borrow_mut()
            .remove(key)
            .ok_or_else(|| Error::MissingKey(key.to_owned()))?;
        removed.parents().remove(&self.link());
        tracing::debug!(key, "keyed collection remove");
        self.emit(&Event::Remove {
            child: removed.clone(),
            key: Some(key.to_owned()),
        })?;
        Ok(removed)
    }

    /// Remove `node` wherever it is keyed.
    ///
    /// Fails with [`Error::NotAMember`] if the node is not held here.
    pub fn remove(&self, node: &Node) -> Result<()> {
        let key = self.key_of(node).ok_or(Error::NotAMember)?;
        self.remove_key(&key).map(|_| ())
    }

    /// The key `node` is stored under, if any.
    pub fn key_of(&self, node: &Node) -> Option<String> {
        self.inner
            .entries
            .borrow()
            .iter()
            .find(|(_, item)| item.ptr_eq(node))
            .map(|(key, _)| key.clone())
    }

    /// The node under `key`.
    pub fn get(&self, key: &str) -> Option<Node> {
        self.inner.entries.borrow().get(key).cloned()
    }

    /// Whether there is an entry under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.entries.borrow().contains_key(key)
    }

    /// Whether this collection is in `node`'s parent set.
    pub fn is_parent_of(&self, node: &Node) -> bool {
        node.parents().contains(&self.link())
    }

    /// All keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.inner.entries.borrow().keys().cloned().collect()
    }

    /// A copy of the current nodes, in key order.
    pub fn items(&self) -> Vec<Node> {
        self.inner.entries.borrow().values().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// Whether both handles point at the same collection.
    pub fn ptr_eq(&self, other: &KeyedCollection) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Re-emit a descendant's change as `"change.<source>"` and bubble it.
    /// A child already being forwarded here is cut as a containment cycle.
    pub(crate) fn child_changed(&self, child: &Node, previous: &Snapshot, source: &str) -> Result<()> {
        let Some(_forward) = self.inner.forwarding.enter(child) else {
            tracing::trace!(
                depth = self.inner.forwarding.depth(),
                "keyed collection reached again by the same child; containment cycle cut"
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

impl Default for KeyedCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl Observable for KeyedCollection {
    fn events(&self) -> &PubSub<Node, Event> {
        &self.inner.events
    }

    fn parents(&self) -> &Parents {
        &self.inner.parents
    }

    fn to_node(&self) -> Node {
        Node::Map(self.clone())
    }
}

impl fmt::Debug for KeyedCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedCollection")
            .field("keys", &self.keys())
            .field("parents", &self.inner.parents.len())
            .finish()
    }
}
