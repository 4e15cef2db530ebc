//! Application state and main event loop.
//!
//! This module implements The Elm Architecture (TEA):
//! - [`Model`]: The complete application state
//! - [`Message`]: All possible events and actions
//! - [`update`]: Pure function for state transitions
//! - [`App::run`]: Main event loop with rendering
//!
//! Fetches and engine renders run on worker threads and come back as
//! messages, so the model is only ever touched by the loop thread.

mod effects;
mod event_loop;
mod input;
mod model;
mod update;

pub use model::{DEFAULT_CELL_PX, Model, ToastLevel};
pub use update::{FETCH_FAILED_MESSAGE, Message, SCROLL_STEP_PX, update};

use std::path::PathBuf;
use std::sync::Arc;

use crate::diagram::RendererConfig;
use crate::fetch::MindMapSource;
use crate::render::DiagramEngine;
use crate::tree::Node;

/// Main application struct that owns the terminal and runs the event loop.
pub struct App {
    source: Arc<dyn MindMapSource>,
    engine: Arc<dyn DiagramEngine>,
    renderer: RendererConfig,
    output_dir: PathBuf,
    initial_input: Option<String>,
    initial_tree: Option<Node>,
    force_half_cell: bool,
}

impl App {
    /// Create an application that asks `source` for trees and draws them
    /// with `engine`.
    pub fn new(source: Arc<dyn MindMapSource>, engine: Arc<dyn DiagramEngine>) -> Self {
        Self {
            source,
            engine,
            renderer: RendererConfig::default(),
            output_dir: PathBuf::from("."),
            initial_input: None,
            initial_tree: None,
            force_half_cell: false,
        }
    }

    /// Renderer settings used for the diagram text and export fonts.
    #[must_use]
    pub fn with_renderer(mut self, renderer: RendererConfig) -> Self {
        self.renderer = renderer;
        self
    }

    /// Directory exported PNGs are written to.
    #[must_use]
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }

    /// Submit this input as soon as the loop starts.
    #[must_use]
    pub fn with_initial_input(mut self, input: Option<String>) -> Self {
        self.initial_input = input;
        self
    }

    /// Show this tree as soon as the loop starts.
    #[must_use]
    pub fn with_initial_tree(mut self, tree: Option<Node>) -> Self {
        self.initial_tree = tree;
        self
    }

    /// Draw with half-block characters instead of a graphics protocol.
    #[must_use]
    pub const fn with_force_half_cell(mut self, enabled: bool) -> Self {
        self.force_half_cell = enabled;
        self
    }
}
