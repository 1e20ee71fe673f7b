//! Node handles, events, parent links, and the propagation guards.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::collection::{ListInner, OrderedCollection};
use super::keyed::{KeyedCollection, MapInner};
use super::pubsub::{Callback, PubSub};
use super::record::Record;
use super::value::Snapshot;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// Topic a record emits after every `set`.
pub const CHANGE: &str = "change";
/// Topic a collection emits when a child joins.
pub const ADD: &str = "add";
/// Topic a collection emits when a child leaves.
pub const REMOVE: &str = "remove";
/// Source tag used by plain [`Record::set`].
pub const DEFAULT_SOURCE: &str = "data";

/// Topic a collection uses to forward a child change from `source`.
pub fn child_change_topic(source: &str) -> String {
    format!("{CHANGE}.{source}")
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Payload delivered to subscribers.
#[derive(Debug, Clone)]
pub enum Event {
    /// A record was updated; `previous` is the snapshot before the update.
    Change { previous: Snapshot, source: String },
    /// A child (possibly a deeper descendant) of a collection was updated.
    ChildChange {
        child: Node,
        previous: Snapshot,
        source: String,
    },
    /// A child joined a collection. `key` is set for keyed collections.
    Add { child: Node, key: Option<String> },
    /// A child left a collection. `key` is set for keyed collections.
    Remove { child: Node, key: Option<String> },
}

impl Event {
    /// The topic this event is emitted under.
    pub fn topic(&self) -> String {
        match self {
            Event::Change { .. } => CHANGE.to_owned(),
            Event::ChildChange { source, .. } => child_change_topic(source),
            Event::Add { .. } => ADD.to_owned(),
            Event::Remove { .. } => REMOVE.to_owned(),
        }
    }

    /// The child carried by add/remove/child-change events.
    pub fn child(&self) -> Option<&Node> {
        match self {
            Event::Change { .. } => None,
            Event::ChildChange { child, .. }
            | Event::Add { child, .. }
            | Event::Remove { child, .. } => Some(child),
        }
    }
}

/// Subscriber type for every node in the data graph.
pub type NodeCallback = Callback<Node, Event>;

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A handle to any participant in the data graph.
///
/// Cloning is cheap; equality is identity of the underlying node.
#[derive(Clone)]
pub enum Node {
    Record(Record),
    List(OrderedCollection),
    Map(KeyedCollection),
}

impl Node {
    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Record(a), Node::Record(b)) => a.ptr_eq(b),
            (Node::List(a), Node::List(b)) => a.ptr_eq(b),
            (Node::Map(a), Node::Map(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// The record behind this handle, if it is one.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Node::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Whether this node is a collection (ordered or keyed).
    pub fn is_collection(&self) -> bool {
        matches!(self, Node::List(_) | Node::Map(_))
    }

    fn observable(&self) -> &dyn Observable {
        match self {
            Node::Record(record) => record,
            Node::List(list) => list,
            Node::Map(map) => map,
        }
    }
}

impl Observable for Node {
    fn events(&self) -> &PubSub<Node, Event> {
        self.observable().events()
    }

    fn parents(&self) -> &Parents {
        self.observable().parents()
    }

    fn to_node(&self) -> Node {
        self.clone()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Record(record) => f.debug_tuple("Node::Record").field(record).finish(),
            Node::List(list) => f.debug_tuple("Node::List").field(list).finish(),
            Node::Map(map) => f.debug_tuple("Node::Map").field(map).finish(),
        }
    }
}

impl From<Record> for Node {
    fn from(record: Record) -> Self {
        Node::Record(record)
    }
}

impl From<OrderedCollection> for Node {
    fn from(list: OrderedCollection) -> Self {
        Node::List(list)
    }
}

impl From<KeyedCollection> for Node {
    fn from(map: KeyedCollection) -> Self {
        Node::Map(map)
    }
}

// ---------------------------------------------------------------------------
// Observable capability
// ---------------------------------------------------------------------------

/// Capability shared by every node: an emitter and a set of parent links.
pub trait Observable {
    /// The node's own emitter.
    fn events(&self) -> &PubSub<Node, Event>;

    /// Containers currently holding this node.
    fn parents(&self) -> &Parents;

    /// A [`Node`] handle to `self`, used as the sender of events.
    fn to_node(&self) -> Node;

    /// Register `callback` for `topic` on this node.
    fn subscribe(&self, topic: &str, callback: &NodeCallback) {
        self.events().subscribe(topic, Rc::clone(callback));
    }

    /// Remove every registration of `callback` for `topic`.
    fn unsubscribe(&self, topic: &str, callback: &NodeCallback) {
        self.events().unsubscribe(topic, callback);
    }

    /// Emit `event` under its own topic with `self` as sender.
    fn emit(&self, event: &Event) -> Result<()> {
        self.events().emit(&event.topic(), &self.to_node(), event)
    }

    /// Tell every parent that this node changed from `previous`.
    fn changed(&self, previous: &Snapshot, source: &str) -> Result<()> {
        self.parents().notify(&self.to_node(), previous, source)
    }

    /// Number of parent links (a node held twice by one container counts twice).
    fn parent_count(&self) -> usize {
        self.parents().len()
    }
}

// ---------------------------------------------------------------------------
// Parent links
// ---------------------------------------------------------------------------

/// Weak link from a child to a container holding it.
#[derive(Clone)]
pub(crate) enum ParentRef {
    List(Weak<ListInner>),
    Map(Weak<MapInner>),
}

impl ParentRef {
    fn same(&self, other: &ParentRef) -> bool {
        match (self, other) {
            (ParentRef::List(a), ParentRef::List(b)) => a.ptr_eq(b),
            (ParentRef::Map(a), ParentRef::Map(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    fn child_changed(&self, child: &Node, previous: &Snapshot, source: &str) -> Result<()> {
        match self {
            ParentRef::List(weak) => match weak.upgrade() {
                Some(inner) => OrderedCollection::from_inner(inner).child_changed(child, previous, source),
                None => Ok(()),
            },
            ParentRef::Map(weak) => match weak.upgrade() {
                Some(inner) => KeyedCollection::from_inner(inner).child_changed(child, previous, source),
                None => Ok(()),
            },
        }
    }
}

/// The multiset of containers holding a node.
#[derive(Default)]
pub struct Parents {
    links: RefCell<Vec<ParentRef>>,
}

impl Parents {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&self, parent: ParentRef) {
        self.links.borrow_mut().push(parent);
    }

    /// Drop one link to `parent`. Returns whether a link was found.
    pub(crate) fn remove(&self, parent: &ParentRef) -> bool {
        let mut links = self.links.borrow_mut();
        match links.iter().position(|p| p.same(parent)) {
            Some(index) => {
                links.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn contains(&self, parent: &ParentRef) -> bool {
        self.links.borrow().iter().any(|p| p.same(parent))
    }

    /// Number of live links.
    pub fn len(&self) -> usize {
        self.links.borrow().len()
    }

    /// Whether the node has no parents.
    pub fn is_empty(&self) -> bool {
        self.links.borrow().is_empty()
    }

    /// Forward a change of `child` to every parent, once per distinct parent.
    pub(crate) fn notify(&self, child: &Node, previous: &Snapshot, source: &str) -> Result<()> {
        let mut distinct: Vec<ParentRef> = Vec::new();
        for link in self.links.borrow().iter() {
            if !distinct.iter().any(|p| p.same(link)) {
                distinct.push(link.clone());
            }
        }
        for parent in distinct {
            parent.child_changed(child, previous, source)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Parents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parents").field("len", &self.len()).finish()
    }
}

// ---------------------------------------------------------------------------
// Propagation guard
// ---------------------------------------------------------------------------

/// Whether a node is currently running its own notification cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateState {
    #[default]
    Idle,
    Propagating,
}

/// Holds a node in [`UpdateState::Propagating`] until dropped.
pub(crate) struct Propagation<'a> {
    state: &'a Cell<UpdateState>,
}

impl<'a> Propagation<'a> {
    /// Enter the propagating state, or `None` if already propagating.
    pub(crate) fn enter(state: &'a Cell<UpdateState>) -> Option<Self> {
        if state.get() == UpdateState::Propagating {
            return None;
        }
        state.set(UpdateState::Propagating);
        Some(Self { state })
    }
}

impl Drop for Propagation<'_> {
    fn drop(&mut self) {
        self.state.set(UpdateState::Idle);
    }
}

/// Children a collection is forwarding right now, innermost last.
///
/// A child that is already on the stack can only come back through a
/// containment cycle: a record cannot be set again while its own change is
/// still propagating. Different children nest freely.
#[derive(Default)]
pub(crate) struct Forwarding {
    children: RefCell<Vec<Node>>,
}

impl Forwarding {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Push `child`, or `None` if it is already being forwarded here.
    pub(crate) fn enter(&self, child: &Node) -> Option<ForwardGuard<'_>> {
        if self.children.borrow().iter().any(|c| c.ptr_eq(child)) {
            return None;
        }
        self.children.borrow_mut().push(child.clone());
        Some(ForwardGuard { forwarding: self })
    }

    /// Number of forwards in flight.
    pub(crate) fn depth(&self) -> usize {
        self.children.borrow().len()
    }
}

/// Pops its child off the [`Forwarding`] stack when dropped.
pub(crate) struct ForwardGuard<'a> {
    forwarding: &'a Forwarding,
}

impl Drop for ForwardGuard<'_> {
    fn drop(&mut self) {
        self.forwarding.children.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topics() {
        assert_eq!(child_change_topic("data"), "change.data");
        let ev = Event::Add {
            child: Node::Record(Record::default()),
            key: None,
        };
        assert_eq!(ev.topic(), "add");
    }

    #[test]
    fn node_identity() {
        let a = Record::default();
        let b = Record::default();
        let na: Node = a.clone().into();
        assert_eq!(na, Node::from(a));
        assert_ne!(na, Node::from(b));
        assert_ne!(na, Node::from(OrderedCollection::new()));
    }

    #[test]
    fn propagation_guard_resets_on_drop() {
        let state = Cell::new(UpdateState::Idle);
        {
            let guard = Propagation::enter(&state);
            assert!(guard.is_some());
            assert!(Propagation::enter(&state).is_none());
        }
        assert_eq!(state.get(), UpdateState::Idle);
    }

    #[test]
    fn forwarding_cuts_only_the_same_child() {
        let forwarding = Forwarding::new();
        let a = Node::from(Record::default());
        let b = Node::from(Record::default());
        {
            let _outer = forwarding.enter(&a).unwrap();
            assert!(forwarding.enter(&a).is_none());
            let _inner = forwarding.enter(&b).unwrap();
            assert_eq!(forwarding.depth(), 2);
        }
        assert_eq!(forwarding.depth(), 0);
        assert!(forwarding.enter(&a).is_some());
    }

    #[test]
    fn as_record_and_is_collection() {
        let node = Node::from(Record::default());
        assert!(node.as_record().is_some());
        assert!(!node.is_collection());
        assert!(Node::from(KeyedCollection::new()).is_collection());
    }
}
