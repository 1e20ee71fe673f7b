//! Reference element tree: slotmap-backed arena with selector queries,
//! bind specs, and per-container templates.
//!
//! [`Dom`] implements [`Renderer`](crate::widget::Renderer), so widgets and
//! widget groups can be driven and inspected without a real document.

pub mod bindspec;
pub mod node;
pub mod query;
pub mod render;
pub mod template;
pub mod tree;

pub use bindspec::{BindSpec, BindSpecError};
pub use node::{ElementData, ElementId, BIND_ATTRIBUTE, TEMPLATE_ATTRIBUTE};
pub use query::Selector;
pub use tree::Dom;
