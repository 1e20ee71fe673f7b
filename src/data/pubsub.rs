//! Per-instance topic emitter.
//!
//! Every observable node owns one [`PubSub`]. Subscribers are kept in
//! registration order and called synchronously on [`PubSub::emit`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;

/// A subscriber callback: receives the emitting object and the event.
///
/// Identity (for [`PubSub::unsubscribe`]) is the `Rc` allocation, so keep a
/// clone of the callback you subscribed if you intend to remove it.
pub type Callback<S, E> = Rc<dyn Fn(&S, &E) -> Result<()>>;

/// Wrap a closure as a [`Callback`].
pub fn callback<S, E>(f: impl Fn(&S, &E) -> Result<()> + 'static) -> Callback<S, E> {
    Rc::new(f)
}

/// Topic-keyed list of subscribers.
pub struct PubSub<S, E> {
    subscribers: RefCell<Vec<(String, Callback<S, E>)>>,
}

impl<S, E> PubSub<S, E> {
    /// An emitter with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
        }
    }

    /// Register `callback` under `topic`.
    ///
    /// Subscribing the same callback twice makes it fire twice.
    pub fn subscribe(&self, topic: impl Into<String>, callback: Callback<S, E>) {
        self.subscribers.borrow_mut().push((topic.into(), callback));
    }

    /// Remove every registration of `callback` under `topic`. No-op if absent.
    pub fn unsubscribe(&self, topic: &str, callback: &Callback<S, E>) {
        self.subscribers
            .borrow_mut()
            .retain(|(t, cb)| !(t == topic && Rc::ptr_eq(cb, callback)));
    }

    /// Call every subscriber of `topic` in registration order.
    ///
    /// The subscriber list is captured before the first call, and callbacks
    /// may subscribe or unsubscribe freely while it runs. A callback
    /// subscribed during the emission first fires on the next one. A callback
    /// unsubscribed during the emission is skipped if it has not run yet.
    /// The first error stops the emission and is returned.
    pub fn emit(&self, topic: &str, sender: &S, event: &E) -> Result<()> {
        let current: Vec<Callback<S, E>> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        for cb in current {
            if !self.is_subscribed(topic, &cb) {
                continue;
            }
            cb(sender, event)?;
        }
        Ok(())
    }

    fn is_subscribed(&self, topic: &str, callback: &Callback<S, E>) -> bool {
        self.subscribers
            .borrow()
            .iter()
            .any(|(t, cb)| t == topic && Rc::ptr_eq(cb, callback))
    }

    /// Number of registrations under `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|(t, _)| t == topic)
            .count()
    }
}

impl<S, E> Default for PubSub<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, E> fmt::Debug for PubSub<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topics: Vec<String> = self
            .subscribers
            .borrow()
            .iter()
            .map(|(t, _)| t.clone())
            .collect();
        f.debug_struct("PubSub").field("topics", &topics).finish()
    }
}
