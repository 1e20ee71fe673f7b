//! # dtw
//!
//! Observable JSON records and collections, projected into element trees by
//! widgets that re-render on every change.
//!
//! ## Core Systems
//!
//! - **[`data`]**: Records, ordered/keyed collections, transformers, pub/sub
//! - **[`widget`]**: Renderer seam, Widget, sorted WidgetGroup
//! - **[`dom`]**: Slotmap-backed reference element tree implementing the renderer
//! - **[`testing`]**: Markup snapshot helpers
//! - **[`error`]**: Crate-wide error type
//!
//! ## Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use dtw::data::{OrderedCollection, Record};
//! use dtw::dom::{Dom, ElementData};
//! use dtw::testing::render_children;
//! use dtw::widget::{by_number, GroupConfig, WidgetGroup};
//! use serde_json::json;
//!
//! let mut dom = Dom::new();
//! let list = dom.insert(ElementData::new("ul"));
//! dom.insert_child(list, ElementData::new("li").with_attr("data-template", "item").with_bind("name"));
//! dom.harvest_templates(list)?;
//! let dom = Rc::new(RefCell::new(dom));
//!
//! let fruits = OrderedCollection::new();
//! let _group = WidgetGroup::new(
//!     Rc::clone(&dom),
//!     list,
//!     fruits.clone(),
//!     GroupConfig::new().with_comparator(by_number("rank")),
//! )?;
//! fruits.add(Record::from_json(json!({"id": "b", "rank": 2, "name": "Banana"}))?)?;
//! fruits.add(Record::from_json(json!({"id": "a", "rank": 1, "name": "Apple"}))?)?;
//!
//! assert_eq!(render_children(&dom.borrow(), list), "<li>Apple</li><li>Banana</li>");
//! # Ok::<(), dtw::Error>(())
//! ```

pub mod data;
pub mod dom;
pub mod error;
pub mod testing;
pub mod widget;

pub use data::{KeyedCollection, Node, Observable, OrderedCollection, Patch, Record, Transformer};
pub use error::{Error, Result};
pub use widget::{GroupConfig, Widget, WidgetGroup};
