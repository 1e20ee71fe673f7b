//! Widget: one record rendered into one element.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;

use super::renderer::{Renderable, Renderer};
use crate::data::value::{self, Snapshot};
use crate::data::{callback, NodeCallback, Observable, Record, CHANGE};
use crate::error::{Error, Result};

/// Per-slot value transform applied at render time.
pub type Formatter<E> = Rc<dyn Fn(Option<&Value>) -> Renderable<E>>;

/// What a widget is built from: a template name and its slot formatters.
pub struct Blueprint<E> {
    template: String,
    formatters: HashMap<String, Formatter<E>>,
}

impl<E> Blueprint<E> {
    /// A blueprint cloning `template` with no formatters.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            formatters: HashMap::new(),
        }
    }

    /// Render `slot` through `format` instead of the default text form (builder).
    pub fn with_formatter(
        mut self,
        slot: impl Into<String>,
        format: impl Fn(Option<&Value>) -> Renderable<E> + 'static,
    ) -> Self {
        self.formatters.insert(slot.into(), Rc::new(format));
        self
    }

    /// The template name.
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl<E> Clone for Blueprint<E> {
    fn clone(&self) -> Self {
        Self {
            template: self.template.clone(),
            formatters: self.formatters.clone(),
        }
    }
}

impl<E> fmt::Debug for Blueprint<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut slots: Vec<&String> = self.formatters.keys().collect();
        slots.sort();
        f.debug_struct("Blueprint")
            .field("template", &self.template)
            .field("formatted_slots", &slots)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Live,
    Removed,
}

struct WidgetInner<R: Renderer> {
    renderer: Rc<RefCell<R>>,
    record: Record,
    element: R::Element,
    formatters: HashMap<String, Formatter<R::Element>>,
    dirty: Cell<bool>,
    lifecycle: Cell<Lifecycle>,
}

impl<R: Renderer> WidgetInner<R> {
    fn render(&self) -> Result<()> {
        if self.lifecycle.get() == Lifecycle::Removed {
            return Err(Error::WidgetRemoved);
        }
        let snapshot = self.record.data();
        let mut renderer = self.renderer.borrow_mut();
        let bindings = renderer.bindings(self.element)?;
        renderer.apply(&bindings, &|slot: &str| self.resolve(&snapshot, slot))?;
        tracing::trace!(element = ?self.element, bindings = bindings.len(), "widget rendered");
        Ok(())
    }

    fn resolve(&self, snapshot: &Snapshot, slot: &str) -> Option<Renderable<R::Element>> {
        let found = value::lookup(snapshot, slot);
        match self.formatters.get(slot) {
            Some(format) => Some(format(found)),
            None => found.map(|v| Renderable::Scalar(value::display(v))),
        }
    }

    fn on_change(&self) -> Result<()> {
        if self.lifecycle.get() == Lifecycle::Removed {
            return Ok(());
        }
        if self.dirty.get() {
            // Conflict resolution hook: local edits are pending. Nothing
            // resolves them yet, so the upstream change is not rendered.
            tracing::debug!(element = ?self.element, "dirty widget skipped upstream change");
            return Ok(());
        }
        self.render()
    }
}

/// Binds one [`Record`] to one element and re-renders on every `"change"`.
///
/// The widget exclusively owns its element. [`Widget::remove`] unsubscribes
/// and destroys it; dropping a live widget only unsubscribes.
pub struct Widget<R: Renderer> {
    inner: Rc<WidgetInner<R>>,
    on_change: NodeCallback,
}

impl<R: Renderer + 'static> Widget<R> {
    /// Bind `record` to an existing `element` and render immediately.
    pub fn new(
        renderer: Rc<RefCell<R>>,
        record: Record,
        element: R::Element,
        formatters: HashMap<String, Formatter<R::Element>>,
    ) -> Result<Self> {
        let inner = Rc::new(WidgetInner {
            renderer,
            record,
            element,
            formatters,
            dirty: Cell::new(false),
            lifecycle: Cell::new(Lifecycle::Live),
        });
        inner.render()?;

        let weak: Weak<WidgetInner<R>> = Rc::downgrade(&inner);
        let on_change: NodeCallback = callback(move |_, _| match weak.upgrade() {
            Some(inner) => inner.on_change(),
            None => Ok(()),
        });
        inner.record.subscribe(CHANGE, &on_change);
        Ok(Self { inner, on_change })
    }

    /// Clone `blueprint`'s template from `container` and bind `record` to it.
    ///
    /// The clone is left detached; placing it is the caller's job. If the
    /// first render fails the clone is destroyed.
    pub fn build(
        renderer: &Rc<RefCell<R>>,
        record: Record,
        container: R::Element,
        blueprint: Blueprint<R::Element>,
    ) -> Result<Self> {
        let element = renderer
            .borrow_mut()
            .clone_template(container, &blueprint.template)?;
        Self::new(Rc::clone(renderer), record, element, blueprint.formatters).inspect_err(|_| {
            renderer.borrow_mut().destroy(element);
        })
    }

    /// Re-apply the record's current data to the element.
    ///
    /// Rendering an unchanged record leaves the element unchanged.
    pub fn render(&self) -> Result<()> {
        self.inner.render()
    }

    /// Unsubscribe from the record, then detach and destroy the element.
    ///
    /// Fails with [`Error::DoubleRemove`] on a second call.
    pub fn remove(&self) -> Result<()> {
        if self.inner.lifecycle.get() == Lifecycle::Removed {
            return Err(Error::DoubleRemove);
        }
        self.inner.lifecycle.set(Lifecycle::Removed);
        self.inner.record.unsubscribe(CHANGE, &self.on_change);
        let mut renderer = self.inner.renderer.borrow_mut();
        renderer.detach(self.inner.element);
        renderer.destroy(self.inner.element);
        tracing::trace!(element = ?self.inner.element, "widget removed");
        Ok(())
    }
}

impl<R: Renderer> Widget<R> {
    /// The bound record.
    pub fn record(&self) -> &Record {
        &self.inner.record
    }

    /// The owned element.
    pub fn element(&self) -> R::Element {
        self.inner.element
    }

    /// Whether local edits are pending.
    ///
    /// Reserved for conflict handling; nothing in this crate sets it.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    /// Flag or clear pending local edits. While dirty, upstream changes are
    /// not rendered.
    pub fn set_dirty(&self, dirty: bool) {
        self.inner.dirty.set(dirty);
    }

    /// Whether [`Widget::remove`] has run.
    pub fn is_removed(&self) -> bool {
        self.inner.lifecycle.get() == Lifecycle::Removed
    }
}

impl<R: Renderer> Drop for Widget<R> {
    fn drop(&mut self) {
        self.inner.record.unsubscribe(CHANGE, &self.on_change);
    }
}

impl<R: Renderer> fmt::Debug for Widget<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Widget")
            .field("element", &self.inner.element)
            .field("dirty", &self.inner.dirty.get())
            .field("lifecycle", &self.inner.lifecycle.get())
            .finish()
    }
}
