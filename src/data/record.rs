//! Record: a single observable JSON object.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};

use super::node::{Event, Node, Observable, Parents, Propagation, UpdateState, DEFAULT_SOURCE};
use super::pubsub::PubSub;
use super::value::{self, Patch, Snapshot};
use crate::error::{Error, Result};

struct RecordInner {
    snapshot: RefCell<Snapshot>,
    events: PubSub<Node, Event>,
    parents: Parents,
    state: Cell<UpdateState>,
}

/// An observable JSON object, updated only through [`Record::set`].
///
/// Every `set` produces a new [`Snapshot`]; snapshots handed out earlier are
/// never mutated. Cloning a `Record` yields another handle to the same record.
#[derive(Clone)]
pub struct Record {
    inner: Rc<RecordInner>,
}

impl Record {
    /// Create a record with the given initial data.
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            inner: Rc::new(RecordInner {
                snapshot: RefCell::new(Rc::new(data)),
                events: PubSub::new(),
                parents: Parents::new(),
                state: Cell::new(UpdateState::Idle),
            }),
        }
    }

    /// Create a record from a JSON object.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self::new(fields)),
            other => Err(Error::NotAnObject {
                found: value::kind(&other),
            }),
        }
    }

    /// The current snapshot. Cheap: clones an `Rc`.
    pub fn data(&self) -> Snapshot {
        Rc::clone(&self.inner.snapshot.borrow())
    }

    /// The value at a dotted slot path, cloned out of the current snapshot.
    pub fn get(&self, path: &str) -> Option<Value> {
        value::lookup(&self.inner.snapshot.borrow(), path).cloned()
    }

    /// Merge `patch` into the record with the default source tag.
    pub fn set(&self, patch: Patch) -> Result<()> {
        self.set_tagged(patch, DEFAULT_SOURCE)
    }

    /// Merge `patch` into the record, tagging the change with `source`.
    ///
    /// The new snapshot is installed before any subscriber runs. Subscribers
    /// of `"change"` fire first, then every parent collection is notified.
    /// Calling `set` again on this record from inside that cascade fails with
    /// [`Error::ReentrantUpdate`]; a failing merge leaves the record as it was.
    pub fn set_tagged(&self, patch: Patch, source: &str) -> Result<()> {
        let Some(_propagation) = Propagation::enter(&self.inner.state) else {
            return Err(Error::ReentrantUpdate);
        };

        let previous = self.data();
        let next = value::merge(&previous, &patch)?;
        *self.inner.snapshot.borrow_mut() = Rc::new(next);
        tracing::trace!(source, keys = patch.len(), "record set");

        self.emit(&Event::Change {
            previous: Rc::clone(&previous),
            source: source.to_owned(),
        })?;
        self.changed(&previous, source)
    }

    /// Whether the record is mid-notification.
    pub fn is_propagating(&self) -> bool {
        self.inner.state.get() == UpdateState::Propagating
    }

    /// Whether both handles point at the same record.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new(Map::new())
    }
}

impl Observable for Record {
    fn events(&self) -> &PubSub<Node, Event> {
        &self.inner.events
    }

    fn parents(&self) -> &Parents {
        &self.inner.parents
    }

    fn to_node(&self) -> Node {
        Node::Record(self.clone())
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("data", &*self.inner.snapshot.borrow())
            .field("parents", &self.inner.parents.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::node::{child_change_topic, CHANGE};
    use crate::data::pubsub::callback;
    use crate::data::OrderedCollection;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_json(value).unwrap()
    }

    #[test]
    fn set_merges_and_keeps_other_keys() {
        let r = record(json!({"title": "A", "amount": 2}));
        r.set(Patch::new().set("amount", 3)).unwrap();
        assert_eq!(Value::Object((*r.data()).clone()), json!({"title": "A", "amount": 3}));
    }

    #[test]
    fn set_with_delete_marker() {
        let r = record(json!({"title": "A", "remark": "x"}));
        r.set(Patch::new().delete("remark")).unwrap();
        assert_eq!(Value::Object((*r.data()).clone()), json!({"title": "A"}));
    }

    #[test]
    fn old_snapshots_are_untouched() {
        let r = record(json!({"n": 1}));
        let before = r.data();
        r.set(Patch::new().set("n", 2)).unwrap();
        assert_eq!(before.get("n"), Some(&json!(1)));
        assert_eq!(r.get("n"), Some(json!(2)));
    }

    #[test]
    fn from_json_rejects_non_objects() {
        assert_eq!(
            Record::from_json(json!("text")).unwrap_err(),
            Error::NotAnObject { found: "string" }
        );
    }

    #[test]
    fn change_event_carries_previous_and_source() {
        let r = record(json!({"n": 1}));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        r.subscribe(
            CHANGE,
            &callback(move |sender: &Node, event: &Event| {
                let Event::Change { previous, source } = event else {
                    panic!("unexpected event {event:?}");
                };
                let now = sender.as_record().unwrap().get("n").unwrap();
                s.borrow_mut().push((previous.get("n").cloned().unwrap(), now, source.clone()));
                Ok(())
            }),
        );
        r.set_tagged(Patch::new().set("n", 2), "ui").unwrap();
        assert_eq!(*seen.borrow(), vec![(json!(1), json!(2), "ui".to_owned())]);
    }

    #[test]
    fn reentrant_set_is_rejected() {
        let r = record(json!({"n": 1}));
        let inner = r.clone();
        let outcome = Rc::new(RefCell::new(None));
        let o = Rc::clone(&outcome);
        r.subscribe(
            CHANGE,
            &callback(move |_, _| {
                *o.borrow_mut() = Some(inner.set(Patch::new().set("n", 99)));
                Ok(())
            }),
        );
        r.set(Patch::new().set("n", 2)).unwrap();
        assert_eq!(*outcome.borrow(), Some(Err(Error::ReentrantUpdate)));
        assert_eq!(r.get("n"), Some(json!(2)));
        assert!(!r.is_propagating());
    }

    #[test]
    fn subscriber_error_reaches_caller_and_guard_resets() {
        let r = record(json!({}));
        r.subscribe(CHANGE, &callback(|_, _| Err(Error::transform("boom"))));
        assert_eq!(
            r.set(Patch::new().set("a", 1)),
            Err(Error::Transform("boom".into()))
        );
        assert!(!r.is_propagating());
    }

    #[test]
    fn failed_merge_leaves_record_unmodified() {
        let r = record(json!({"keep": true}));
        let mut patch = Patch::new();
        for _ in 0..value::MAX_MERGE_DEPTH + 1 {
            patch = Patch::new().merge("n", patch);
        }
        assert!(matches!(r.set(patch), Err(Error::MergeTooDeep { .. })));
        assert_eq!(Value::Object((*r.data()).clone()), json!({"keep": true}));
    }

    #[test]
    fn parents_receive_change_once_per_container() {
        let r = record(json!({"n": 1}));
        let list_a = OrderedCollection::new();
        let list_b = OrderedCollection::new();
        list_a.add(r.clone()).unwrap();
        list_b.add(r.clone()).unwrap();

        let hits = Rc::new(Cell::new(0));
        for list in [&list_a, &list_b] {
            let h = Rc::clone(&hits);
            list.subscribe(
                &child_change_topic("data"),
                &callback(move |_, _| {
                    h.set(h.get() + 1);
                    Ok(())
                }),
            );
        }
        r.set(Patch::new().set("n", 2)).unwrap();
        assert_eq!(hits.get(), 2);
    }
}
