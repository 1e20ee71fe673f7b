//! WidgetGroup: a sorted, rendered projection of a collection.
//!
//! The group listens to `"add"` / `"remove"` on an ordered or keyed
//! collection. Each record child gets a [`Widget`] whose element is placed in
//! the container at the index found by binary search under the active
//! comparator, so element order always mirrors the sorted widget array.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::renderer::Renderer;
use super::widget::{Blueprint, Widget};
use crate::data::value::{self, Snapshot};
use crate::data::{callback, Event, Node, NodeCallback, Observable, Record, ADD, CHANGE, REMOVE};
use crate::error::{Error, Result};

/// Total order over two children's data.
pub type Comparator = Rc<dyn Fn(&Snapshot, &Snapshot) -> Ordering>;

/// Chooses the blueprint for a new child from its data.
pub type Generator<E> = Rc<dyn Fn(&Snapshot) -> Blueprint<E>>;

/// Compare the text form of `field`; absent values sort as empty text.
pub fn by_field(field: impl Into<String>) -> Comparator {
    let field = field.into();
    Rc::new(move |a: &Snapshot, b: &Snapshot| field_text(a, &field).cmp(&field_text(b, &field)))
}

/// Compare `field` numerically; absent or non-numeric values sort first.
pub fn by_number(field: impl Into<String>) -> Comparator {
    let field = field.into();
    Rc::new(move |a: &Snapshot, b: &Snapshot| {
        let x = value::lookup(a, &field).and_then(|v| v.as_f64());
        let y = value::lookup(b, &field).and_then(|v| v.as_f64());
        x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    })
}

fn field_text(data: &Snapshot, field: &str) -> String {
    value::lookup(data, field).map(value::display).unwrap_or_default()
}

/// Index at which `key` goes into the sorted `items`.
///
/// Binary search for the first item ordered strictly after `key`, so a
/// key equal to existing items lands after them.
pub fn sorted_insert_index<T, K: ?Sized>(
    items: &[T],
    key: &K,
    mut compare: impl FnMut(&T, &K) -> Ordering,
) -> usize {
    items.partition_point(|item| compare(item, key) != Ordering::Greater)
}

// ---------------------------------------------------------------------------
// GroupConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`WidgetGroup`].
pub struct GroupConfig<E> {
    /// Template used when no generator is set.
    pub template: String,
    /// Data field identifying a child.
    pub id_field: String,
    /// Sort order; defaults to [`by_field`] on `id_field`.
    pub comparator: Option<Comparator>,
    /// Per-child blueprint choice; defaults to `template` without formatters.
    pub generator: Option<Generator<E>>,
}

impl<E> Default for GroupConfig<E> {
    fn default() -> Self {
        Self {
            template: "item".to_owned(),
            id_field: "id".to_owned(),
            comparator: None,
            generator: None,
        }
    }
}

impl<E> GroupConfig<E> {
    /// Create a new default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default template (builder).
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Set the id field (builder).
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    /// Set the comparator (builder).
    pub fn with_comparator(mut self, comparator: Comparator) -> Self {
        self.comparator = Some(comparator);
        self
    }

    /// Set the blueprint generator (builder).
    pub fn with_generator(mut self, generator: impl Fn(&Snapshot) -> Blueprint<E> + 'static) -> Self {
        self.generator = Some(Rc::new(generator));
        self
    }
}

impl<E> Clone for GroupConfig<E> {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
            id_field: self.id_field.clone(),
            comparator: self.comparator.clone(),
            generator: self.generator.clone(),
        }
    }
}

impl<E> fmt::Debug for GroupConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupConfig")
            .field("template", &self.template)
            .field("id_field", &self.id_field)
            .field("comparator", &self.comparator.is_some())
            .field("generator", &self.generator.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// WidgetGroup
// ---------------------------------------------------------------------------

struct Entry<R: Renderer> {
    widget: Widget<R>,
    id: Option<String>,
    on_change: NodeCallback,
}

struct GroupInner<R: Renderer> {
    renderer: Rc<RefCell<R>>,
    container: R::Element,
    collection: Node,
    template: String,
    id_field: String,
    generator: Option<Generator<R::Element>>,
    comparator: RefCell<Comparator>,
    entries: RefCell<Vec<Entry<R>>>,
    by_id: RefCell<HashMap<String, Record>>,
    this: Weak<GroupInner<R>>,
    removed: Cell<bool>,
}

impl<R: Renderer + 'static> GroupInner<R> {
    fn id_of(&self, data: &Snapshot) -> Option<String> {
        value::lookup(data, &self.id_field).map(value::display)
    }

    fn index_of(&self, record: &Record) -> Option<usize> {
        self.entries
            .borrow()
            .iter()
            .position(|entry| entry.widget.record().ptr_eq(record))
    }

    fn indices_of(&self, record: &Record) -> Vec<usize> {
        self.entries
            .borrow()
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.widget.record().ptr_eq(record))
            .map(|(index, _)| index)
            .collect()
    }

    /// Keep `id` pointing at a rendered record that still carries it, or drop
    /// it when none does.
    fn release_id(&self, id: &str) {
        let entries = self.entries.borrow();
        let mut carriers = entries.iter().filter(|entry| entry.id.as_deref() == Some(id));
        let mut by_id = self.by_id.borrow_mut();
        let current_holds = by_id.get(id).is_some_and(|record| {
            entries
                .iter()
                .any(|entry| entry.id.as_deref() == Some(id) && entry.widget.record().ptr_eq(record))
        });
        if current_holds {
            return;
        }
        match carriers.next() {
            Some(entry) => {
                by_id.insert(id.to_owned(), entry.widget.record().clone());
            }
            None => {
                by_id.remove(id);
            }
        }
    }

    fn position_for(&self, data: &Snapshot) -> usize {
        let compare = Rc::clone(&self.comparator.borrow());
        let entries = self.entries.borrow();
        sorted_insert_index(entries.as_slice(), data, |entry, key| {
            compare(&entry.widget.record().data(), key)
        })
    }

    fn insert_elem(&self, element: R::Element, index: usize) -> Result<()> {
        self.renderer
            .borrow_mut()
            .insert_at(self.container, element, index)
    }

    fn insert_child(&self, child: &Node) -> Result<()> {
        let record = child.as_record().ok_or(Error::NotARecord)?.clone();
        let data = record.data();
        let blueprint = match &self.generator {
            Some(generate) => generate(&data),
            None => Blueprint::new(self.template.clone()),
        };
        let widget = Widget::build(&self.renderer, record.clone(), self.container, blueprint)?;
        let index = self.position_for(&data);
        if let Err(err) = self.insert_elem(widget.element(), index) {
            widget.remove()?;
            return Err(err);
        }

        let this = self.this.clone();
        let on_change: NodeCallback = callback(move |sender: &Node, _: &Event| {
            match (this.upgrade(), sender.as_record()) {
                (Some(group), Some(record)) => group.reposition(record),
                _ => Ok(()),
            }
        });
        record.subscribe(CHANGE, &on_change);

        let id = self.id_of(&data);
        if let Some(id) = &id {
            self.by_id.borrow_mut().entry(id.clone()).or_insert(record);
        }
        tracing::debug!(index, id = ?id, "widget group insert");
        self.entries.borrow_mut().insert(
            index,
            Entry {
                widget,
                id,
                on_change,
            },
        );
        Ok(())
    }

    fn remove_child(&self, child: &Node) -> Result<()> {
        let record = child.as_record().ok_or(Error::NotARecord)?;
        let index = self.index_of(record).ok_or_else(|| Error::Desync {
            id: self.id_of(&record.data()),
        })?;
        let entry = self.entries.borrow_mut().remove(index);
        record.unsubscribe(CHANGE, &entry.on_change);
        if let Some(id) = &entry.id {
            self.release_id(id);
        }
        tracing::debug!(index, id = ?entry.id, "widget group remove");
        entry.widget.remove()
    }

    /// Move a changed child if its new data broke the order; keep the id
    /// lookup in step with the id field. A record held more than once has one
    /// widget per occurrence, and all of them move together.
    fn reposition(&self, record: &Record) -> Result<()> {
        let indices = self.indices_of(record);
        if indices.is_empty() {
            return Ok(());
        }
        let data = record.data();

        let id = self.id_of(&data);
        let released: Vec<String> = {
            let mut entries = self.entries.borrow_mut();
            let mut released = Vec::new();
            for &index in &indices {
                let entry = &mut entries[index];
                if entry.id != id {
                    released.extend(std::mem::replace(&mut entry.id, id.clone()));
                }
            }
            released
        };
        if !released.is_empty() {
            if let Some(new) = &id {
                self.by_id
                    .borrow_mut()
                    .entry(new.clone())
                    .or_insert_with(|| record.clone());
            }
            for old in &released {
                self.release_id(old);
            }
        }

        let in_order = {
            let compare = Rc::clone(&self.comparator.borrow());
            let entries = self.entries.borrow();
            indices.iter().all(|&index| {
                let after_prev = index == 0
                    || compare(&entries[index - 1].widget.record().data(), &data) != Ordering::Greater;
                let before_next = index + 1 >= entries.len()
                    || compare(&data, &entries[index + 1].widget.record().data()) != Ordering::Greater;
                after_prev && before_next
            })
        };
        if in_order {
            return Ok(());
        }

        let mut moving = Vec::with_capacity(indices.len());
        {
            let mut entries = self.entries.borrow_mut();
            for &index in indices.iter().rev() {
                moving.push(entries.remove(index));
            }
        }
        moving.reverse();
        {
            let mut renderer = self.renderer.borrow_mut();
            for entry in &moving {
                renderer.detach(entry.widget.element());
            }
        }
        for entry in moving {
            let element = entry.widget.element();
            let target = self.position_for(&data);
            self.entries.borrow_mut().insert(target, entry);
            tracing::debug!(to = target, occurrences = indices.len(), "widget group reposition");
            self.insert_elem(element, target)?;
        }
        Ok(())
    }

    fn resort(&self, comparator: Comparator) -> Result<()> {
        if Rc::ptr_eq(&self.comparator.borrow(), &comparator) {
            return Ok(());
        }
        *self.comparator.borrow_mut() = Rc::clone(&comparator);

        let previous = std::mem::take(&mut *self.entries.borrow_mut());
        {
            let mut renderer = self.renderer.borrow_mut();
            for entry in &previous {
                renderer.detach(entry.widget.element());
            }
        }

        let mut sorted: Vec<Entry<R>> = Vec::with_capacity(previous.len());
        for entry in previous {
            let data = entry.widget.record().data();
            let index = sorted_insert_index(sorted.as_slice(), &data, |e, key| {
                comparator(&e.widget.record().data(), key)
            });
            sorted.insert(index, entry);
        }
        let elements: Vec<R::Element> = sorted.iter().map(|e| e.widget.element()).collect();
        *self.entries.borrow_mut() = sorted;

        tracing::debug!(len = elements.len(), "widget group resort");
        for (index, element) in elements.into_iter().enumerate() {
            self.insert_elem(element, index)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        self.by_id.borrow_mut().clear();
        for entry in entries {
            entry.widget.record().unsubscribe(CHANGE, &entry.on_change);
            entry.widget.remove()?;
        }
        Ok(())
    }
}

/// Keeps the container's children sorted and in sync with a collection.
pub struct WidgetGroup<R: Renderer> {
    inner: Rc<GroupInner<R>>,
    on_add: NodeCallback,
    on_remove: NodeCallback,
}

impl<R: Renderer + 'static> WidgetGroup<R> {
    /// Project `collection` into `container`.
    ///
    /// Fails with [`Error::NotACollection`] for a record, and with
    /// [`Error::MissingTemplate`] if the container lacks the configured
    /// template. Children already in the collection are rendered at once.
    pub fn new(
        renderer: Rc<RefCell<R>>,
        container: R::Element,
        collection: impl Into<Node>,
        config: GroupConfig<R::Element>,
    ) -> Result<Self> {
        let collection = collection.into();
        let existing = match &collection {
            Node::List(list) => list.items(),
            Node::Map(map) => map.items(),
            Node::Record(_) => return Err(Error::NotACollection),
        };
        if !renderer.borrow().has_template(container, &config.template) {
            return Err(Error::MissingTemplate {
                template: config.template,
            });
        }

        let comparator = config
            .comparator
            .unwrap_or_else(|| by_field(config.id_field.clone()));
        let inner = Rc::new_cyclic(|this| GroupInner {
            renderer,
            container,
            collection,
            template: config.template,
            id_field: config.id_field,
            generator: config.generator,
            comparator: RefCell::new(comparator),
            entries: RefCell::new(Vec::new()),
            by_id: RefCell::new(HashMap::new()),
            this: this.clone(),
            removed: Cell::new(false),
        });

        for child in &existing {
            if let Err(err) = inner.insert_child(child) {
                inner.clear()?;
                return Err(err);
            }
        }

        let on_add = Self::relay(Rc::downgrade(&inner), GroupInner::insert_child);
        let on_remove = Self::relay(Rc::downgrade(&inner), GroupInner::remove_child);
        inner.collection.subscribe(ADD, &on_add);
        inner.collection.subscribe(REMOVE, &on_remove);

        Ok(Self {
            inner,
            on_add,
            on_remove,
        })
    }

    fn relay(inner: Weak<GroupInner<R>>, handle: fn(&GroupInner<R>, &Node) -> Result<()>) -> NodeCallback {
        callback(move |_: &Node, event: &Event| {
            match (inner.upgrade(), event.child()) {
                (Some(group), Some(child)) => handle(&group, child),
                _ => Ok(()),
            }
        })
    }

    /// Re-sort under `comparator` and re-place every element.
    ///
    /// No-op when `comparator` is the active one (same `Rc`).
    pub fn resort(&self, comparator: Comparator) -> Result<()> {
        self.inner.resort(comparator)
    }

    /// Tear down: stop observing the collection and remove every widget.
    ///
    /// Fails with [`Error::DoubleRemove`] on a second call.
    pub fn remove(&self) -> Result<()> {
        if self.inner.removed.replace(true) {
            return Err(Error::DoubleRemove);
        }
        self.unsubscribe();
        self.inner.clear()
    }

    fn unsubscribe(&self) {
        self.inner.collection.unsubscribe(ADD, &self.on_add);
        self.inner.collection.unsubscribe(REMOVE, &self.on_remove);
    }

    /// The active comparator.
    pub fn comparator(&self) -> Comparator {
        Rc::clone(&self.inner.comparator.borrow())
    }

    /// The container element.
    pub fn container(&self) -> R::Element {
        self.inner.container
    }

    /// Records in rendered order.
    pub fn records(&self) -> Vec<Record> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|entry| entry.widget.record().clone())
            .collect()
    }

    /// Elements in rendered order.
    pub fn elements(&self) -> Vec<R::Element> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|entry| entry.widget.element())
            .collect()
    }

    /// The record rendered under `id`.
    pub fn record_by_id(&self, id: &str) -> Option<Record> {
        self.inner.by_id.borrow().get(id).cloned()
    }

    /// The element rendered for the record under `id`.
    pub fn element_by_id(&self, id: &str) -> Option<R::Element> {
        let record = self.record_by_id(id)?;
        let index = self.inner.index_of(&record)?;
        Some(self.inner.entries.borrow()[index].widget.element())
    }

    /// Number of rendered children.
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// Whether nothing is rendered.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }
}

impl<R: Renderer> Drop for WidgetGroup<R> {
    fn drop(&mut self) {
        self.inner.collection.unsubscribe(ADD, &self.on_add);
        self.inner.collection.unsubscribe(REMOVE, &self.on_remove);
        for entry in self.inner.entries.borrow().iter() {
            entry.widget.record().unsubscribe(CHANGE, &entry.on_change);
        }
    }
}

impl<R: Renderer> fmt::Debug for WidgetGroup<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetGroup")
            .field("container", &self.inner.container)
            .field("len", &self.inner.entries.borrow().len())
            .field("removed", &self.inner.removed.get())
            .finish()
    }
}
