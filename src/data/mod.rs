//! Observable data model: records, collections, transformers.
//!
//! - [`Record`]: one observable JSON object, updated by deep-merge patches.
//! - [`OrderedCollection`] / [`KeyedCollection`]: containers that link
//!   themselves as parents of their children and forward child changes.
//! - [`Transformer`]: keeps a derived record in step with a base record.
//!
//! Everything is single-threaded and synchronous: an emission runs all of its
//! subscribers to completion before the mutating call returns.

pub mod collection;
pub mod keyed;
pub mod node;
pub mod pubsub;
pub mod record;
pub mod transform;
pub mod value;

pub use collection::OrderedCollection;
pub use keyed::KeyedCollection;
pub use node::{
    child_change_topic, Event, Node, NodeCallback, Observable, Parents, UpdateState, ADD, CHANGE,
    DEFAULT_SOURCE, REMOVE,
};
pub use pubsub::{callback, Callback, PubSub};
pub use record::Record;
pub use transform::{MorphFn, Transformer, MORPH_SOURCE, UNMORPH_SOURCE};
pub use value::{Patch, PatchValue, Snapshot, MAX_MERGE_DEPTH};
