//! Widget system: the renderer seam, single-record widgets, sorted groups.

pub mod group;
pub mod renderer;
#[allow(clippy::module_inception)]
pub mod widget;

pub use group::{by_field, by_number, sorted_insert_index, Comparator, Generator, GroupConfig, WidgetGroup};
pub use renderer::{BindTarget, Binding, Renderable, Renderer, Resolve};
pub use widget::{Blueprint, Formatter, Widget};
