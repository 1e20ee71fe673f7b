//! Testing helpers: markup snapshots of the reference element tree.
//!
//! Use [`render_to_string`] and related helpers to capture an element
//! subtree as compact markup for snapshot-style assertions.

pub mod snapshot;

pub use snapshot::{render_children, render_pretty, render_to_string};
