//! Transformer: keeps a derived record in step with a base record.
//!
//! Each side's `"change"` drives the other through `morph` or `unmorph`.
//! While one direction is being applied, the echo it causes on the other
//! side is suppressed, so a round trip never bounces back.

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::node::{NodeCallback, Observable, CHANGE};
use super::pubsub::callback;
use super::record::Record;
use super::value::{Patch, Snapshot};
use crate::error::Result;

/// Source tag of sets applied to the derived record.
pub const MORPH_SOURCE: &str = "morph";
/// Source tag of sets applied to the base record.
pub const UNMORPH_SOURCE: &str = "unmorph";

/// A pure mapping from one side's snapshot to a patch for the other side.
pub type MorphFn = Rc<dyn Fn(&Snapshot) -> Result<Patch>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Morphing,
    Unmorphing,
}

struct TransformerInner {
    base: Record,
    derived: Record,
    morph: MorphFn,
    unmorph: MorphFn,
    phase: Cell<Phase>,
}

impl TransformerInner {
    fn forward(&self, direction: Phase) -> Result<()> {
        if self.phase.get() != Phase::Idle {
            tracing::trace!(phase = ?self.phase.get(), "transformer echo suppressed");
            return Ok(());
        }
        let (from, to, map, source) = match direction {
            Phase::Morphing => (&self.base, &self.derived, &self.morph, MORPH_SOURCE),
            Phase::Unmorphing => (&self.derived, &self.base, &self.unmorph, UNMORPH_SOURCE),
            Phase::Idle => return Ok(()),
        };
        self.phase.set(direction);
        let result = map(&from.data()).and_then(|patch| to.set_tagged(patch, source));
        self.phase.set(Phase::Idle);
        tracing::trace!(source, ok = result.is_ok(), "transformer round");
        result
    }
}

/// Bidirectional link between a base and a derived [`Record`].
///
/// The link lives as long as the `Transformer` value; dropping it (or
/// calling [`Transformer::detach`]) unsubscribes both sides.
pub struct Transformer {
    inner: Rc<TransformerInner>,
    on_base: NodeCallback,
    on_derived: NodeCallback,
}

impl Transformer {
    /// Link `base` and `derived`, then bring `derived` up to date by
    /// running `morph` once on the current base snapshot.
    ///
    /// If `morph` or `unmorph` fails, the target record is left untouched and
    /// the error is returned to whoever called `set` on the source record.
    pub fn new(
        base: Record,
        derived: Record,
        morph: impl Fn(&Snapshot) -> Result<Patch> + 'static,
        unmorph: impl Fn(&Snapshot) -> Result<Patch> + 'static,
    ) -> Result<Self> {
        let inner = Rc::new(TransformerInner {
            base,
            derived,
            morph: Rc::new(morph),
            unmorph: Rc::new(unmorph),
            phase: Cell::new(Phase::Idle),
        });
        inner.forward(Phase::Morphing)?;

        let on_base = Self::relay(Rc::downgrade(&inner), Phase::Morphing);
        let on_derived = Self::relay(Rc::downgrade(&inner), Phase::Unmorphing);
        inner.base.subscribe(CHANGE, &on_base);
        inner.derived.subscribe(CHANGE, &on_derived);

        Ok(Self {
            inner,
            on_base,
            on_derived,
        })
    }

    /// Build the derived record from `morph` of the base.
    pub fn derive(
        base: Record,
        morph: impl Fn(&Snapshot) -> Result<Patch> + 'static,
        unmorph: impl Fn(&Snapshot) -> Result<Patch> + 'static,
    ) -> Result<Self> {
        Self::new(base, Record::default(), morph, unmorph)
    }

    fn relay(inner: Weak<TransformerInner>, direction: Phase) -> NodeCallback {
        callback(move |_, _| match inner.upgrade() {
            Some(inner) => inner.forward(direction),
            None => Ok(()),
        })
    }

    /// The source-of-truth record.
    pub fn base(&self) -> &Record {
        &self.inner.base
    }

    /// The derived record.
    pub fn derived(&self) -> &Record {
        &self.inner.derived
    }

    /// Stop propagating in both directions. Idempotent.
    pub fn detach(&self) {
        self.inner.base.unsubscribe(CHANGE, &self.on_base);
        self.inner.derived.unsubscribe(CHANGE, &self.on_derived);
    }
}

impl Drop for Transformer {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("base", &self.inner.base)
            .field("derived", &self.inner.derived)
            .field("phase", &self.inner.phase.get())
            .finish()
    }
}
