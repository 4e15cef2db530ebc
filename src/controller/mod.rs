//! Render lifecycle and interaction for one mind map at a time.
//!
//! The [`Controller`] owns the tree snapshot being shown, hands diagram text
//! to the rendering engine (through a [`RenderRequest`]), installs the
//! engine's SVG when it comes back, and turns pointer input into pan, zoom
//! and node selection.
//!
//! Rendering is asynchronous: a request carries the generation of the tree
//! it was made for, and completions for any other generation are dropped.

mod state;

pub use state::{MAX_ZOOM, MIN_ZOOM, Point, RenderState, ZOOM_STEP, apply};

use std::sync::Arc;

use resvg::tiny_skia::Transform;

use crate::diagram::{self, DETAIL_CLASS, RendererConfig};
use crate::export::{self, ExportError, ExportOptions, ExportOutcome};
use crate::render::{RenderError, RenderedDiagram};
use crate::tree::Node;

/// Where the controller is in the render cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing to show: no tree, no root id, or no children
    Empty,
    /// Text handed to the engine, waiting for its SVG
    Rendering { generation: u64 },
    /// SVG installed and interactive
    Rendered,
}

/// Diagram text to submit to the rendering engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub generation: u64,
    pub source: String,
}

/// What happened to a render completion.
#[derive(Debug)]
pub enum Completion {
    Installed,
    /// The tree changed while the engine was busy
    Stale,
    Failed(RenderError),
}

/// Receives the tree node behind a clicked primary node element.
pub trait NodeObserver {
    fn node_clicked(&mut self, node: &Node);
}

impl<F: FnMut(&Node)> NodeObserver for F {
    fn node_clicked(&mut self, node: &Node) {
        self(node);
    }
}

pub struct Controller {
    config: RendererConfig,
    tree: Option<Arc<Node>>,
    phase: Phase,
    generation: u64,
    state: RenderState,
    diagram: Option<RenderedDiagram>,
    /// Indexes into the diagram's elements that respond to clicks
    click_targets: Vec<usize>,
    surface: (f32, f32),
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("phase", &self.phase)
            .field("generation", &self.generation)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl Controller {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            tree: None,
            phase: Phase::Empty,
            generation: 0,
            state: RenderState::default(),
            diagram: None,
            click_targets: Vec::new(),
            surface: (0.0, 0.0),
        }
    }

    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub const fn phase(&self) -> Phase {
        self.phase
    }

    pub const fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_deref()
    }

    pub const fn diagram(&self) -> Option<&RenderedDiagram> {
        self.diagram.as_ref()
    }

    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Show a new tree snapshot.
    ///
    /// Loading the same `Arc` again is a no-op. Anything else resets the
    /// surface and, when the tree has content, returns the request to send
    /// to the engine.
    pub fn load(&mut self, tree: Arc<Node>) -> Option<RenderRequest> {
        if self.tree.as_ref().is_some_and(|current| Arc::ptr_eq(current, &tree)) {
            return None;
        }

        self.diagram = None;
        self.click_targets.clear();
        self.state = RenderState::default();
        self.generation += 1;

        let renderable = tree.is_renderable();
        let source = renderable.then(|| diagram::document(&tree, &self.config));
        self.tree = Some(tree);

        let Some(source) = source else {
            self.phase = Phase::Empty;
            return None;
        };
        self.phase = Phase::Rendering {
            generation: self.generation,
        };
        crate::perf::log_event(
            "controller.load",
            format!("generation={} source_bytes={}", self.generation, source.len()),
        );
        Some(RenderRequest {
            generation: self.generation,
            source,
        })
    }

    /// Accept the engine's answer for `generation`.
    pub fn complete(
        &mut self,
        generation: u64,
        result: Result<String, RenderError>,
    ) -> Completion {
        if self.phase != (Phase::Rendering { generation }) {
            tracing::debug!(
                generation,
                current = self.generation,
                "discarding stale render completion"
            );
            return Completion::Stale;
        }

        let installed = result.and_then(|svg| RenderedDiagram::from_svg(svg, &self.config.font_family));
        let mut diagram = match installed {
            Ok(diagram) => diagram,
            Err(err) => {
                tracing::error!(generation, error = %err, "failed to render mind map");
                self.phase = Phase::Empty;
                return Completion::Failed(err);
            }
        };

        self.click_targets = diagram
            .elements()
            .iter()
            .enumerate()
            .filter(|(_, element)| !element.element_id.contains("_detail"))
            .map(|(index, _)| index)
            .collect();

        // The engine may drop the class hint from the text, so tag again.
        for element in diagram.elements_mut() {
            if diagram::is_detail_id(&element.element_id) {
                element.add_class(DETAIL_CLASS);
            }
        }

        crate::perf::log_event(
            "controller.installed",
            format!(
                "generation={generation} elements={} targets={}",
                diagram.elements().len(),
                self.click_targets.len()
            ),
        );
        self.diagram = Some(diagram);
        self.state.set_rendered(true);
        self.phase = Phase::Rendered;
        Completion::Installed
    }

    /// Size of the drawing surface in pixels.
    pub const fn set_surface_size(&mut self, width: f32, height: f32) {
        self.surface = (width, height);
    }

    pub const fn surface_size(&self) -> (f32, f32) {
        self.surface
    }

    /// Transform from diagram canvas to surface pixels, once rendered.
    pub fn view_transform(&self) -> Option<Transform> {
        let diagram = self.diagram.as_ref()?;
        Some(self.state.view_transform(diagram.size(), self.surface))
    }

    /// Handle a click at a surface point.
    ///
    /// Records `scroll` as the surface's scroll offset, then, unless a drag
    /// is in progress, notifies `observer` with the tree node under the
    /// pointer. Returns the id of the node that was reported.
    pub fn click(
        &mut self,
        at: Point,
        scroll: Point,
        observer: &mut impl NodeObserver,
    ) -> Option<String> {
        self.state.set_scroll(scroll);
        if self.state.is_dragging() {
            return None;
        }

        let diagram = self.diagram.as_ref()?;
        let canvas = self
            .state
            .surface_to_canvas(at, diagram.size(), self.surface)?;

        // Innermost element wins when bounds overlap.
        let (element, _) = self
            .click_targets
            .iter()
            .filter_map(|&index| diagram.elements().get(index))
            .filter_map(|element| {
                let bounds = element.bounds?;
                bounds
                    .contains(canvas.x, canvas.y)
                    .then(|| (element, bounds.area()))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        let node = self.tree.as_deref()?.find(&element.node_id)?;
        tracing::debug!(node = %node.id, "node clicked");
        observer.node_clicked(node);
        Some(node.id.clone())
    }

    pub fn zoom_in(&mut self) {
        self.state.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.state.zoom_out();
    }

    pub const fn reset_view(&mut self) {
        self.state.reset_view();
    }

    pub const fn toggle_full_screen(&mut self) {
        self.state.toggle_full_screen();
    }

    pub const fn pointer_down(&mut self, at: Point) {
        self.state.pointer_down(at);
    }

    pub fn pointer_move(&mut self, at: Point) {
        self.state.pointer_move(at);
    }

    pub const fn pointer_up(&mut self) {
        self.state.pointer_up();
    }

    pub const fn pointer_leave(&mut self) {
        self.state.pointer_leave();
    }

    pub fn scroll_by(&mut self, dx: f32, dy: f32) {
        self.state.scroll_by(dx, dy);
    }

    /// Export the installed diagram as a PNG file.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NotRendered`] before a diagram is installed,
    /// or the export pipeline's error when both strategies fail.
    pub fn export(&self, options: &ExportOptions) -> Result<ExportOutcome, ExportError> {
        let diagram = match (&self.diagram, self.state.is_rendered()) {
            (Some(diagram), true) => diagram,
            _ => return Err(ExportError::NotRendered),
        };
        export::export_png(diagram.svg(), options)
    }
}
