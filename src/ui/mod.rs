//! Terminal UI components.
//!
//! - [`render`]: Lays out and draws the whole screen
//! - [`layout`]: Pane geometry shared with input handling
//! - diagram: Rasterizes the installed diagram into the diagram pane

mod diagram;
mod render;
mod status;

pub use diagram::{DiagramView, create_picker, rasterize_view};
pub use render::{PaneLayout, layout, render};

pub const DIAGRAM_WIDTH_PERCENT: u16 = 70;
pub const DETAILS_WIDTH_PERCENT: u16 = 30;
