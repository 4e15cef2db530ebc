// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. export::ExportError)
    clippy::module_name_repetitions
)]

//! # Mindmapper
//!
//! Interactive mind maps in the terminal.
//!
//! Mindmapper asks a generation service for a mind map of a web page, a
//! video or a free-form prompt, turns the returned tree into a Mermaid
//! flowchart, and shows the rendered diagram with:
//! - Zoom, pan and scroll
//! - Click-to-select nodes with a details panel
//! - PNG export
//!
//! ## Architecture
//!
//! The interactive app uses The Elm Architecture (TEA) pattern:
//! - **Model**: Application state
//! - **Message**: Events and actions
//! - **Update**: Pure state transitions
//! - **View**: Render to terminal
//!
//! ## Modules
//!
//! - [`tree`]: The mind map tree the service returns
//! - [`diagram`]: Tree to Mermaid flowchart text
//! - [`render`]: Diagram engines and the rendered SVG
//! - [`controller`]: Render lifecycle, view transform and hit-testing
//! - [`export`]: PNG export
//! - [`fetch`]: Generation service client
//! - [`app`]: Main application loop and state
//! - [`ui`]: Terminal UI components
//! - [`config`]: Saved command-line defaults

pub mod app;
pub mod config;
pub mod controller;
pub mod diagram;
pub mod export;
pub mod fetch;
pub mod perf;
pub mod render;
pub mod tree;
pub mod ui;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::{App, Message, Model};
    pub use crate::controller::{Completion, Controller, Phase};
    pub use crate::diagram::RendererConfig;
    pub use crate::fetch::{MindMapClient, MindMapSource};
    pub use crate::render::{DiagramEngine, MermaidCli};
    pub use crate::tree::Node;
}
