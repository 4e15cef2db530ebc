use std::time::{Duration, Instant};

use ratatui::layout::Rect;
use ratatui_image::picker::Picker;

use crate::controller::{Controller, Point, RenderRequest};
use crate::diagram::RendererConfig;
use crate::tree::Node;
use crate::ui::DiagramView;

/// Cell size assumed when the terminal does not report one.
pub const DEFAULT_CELL_PX: (u16, u16) = (8, 16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
struct Toast {
    level: ToastLevel,
    message: String,
    expires_at: Instant,
}

/// The complete application state.
///
/// All state lives here - no global or scattered state.
pub struct Model {
    /// Render lifecycle, view transform and hit-testing
    pub controller: Controller,
    /// Id of the node whose details are shown
    pub selected: Option<String>,
    /// Text in the input bar
    pub input: String,
    /// Whether keystrokes go to the input bar
    pub input_active: bool,
    /// Last submitted input, for re-fetching
    pub last_input: Option<String>,
    /// Whether a service request is in flight
    pub fetching: bool,
    /// Input waiting to be sent to the service
    pub pending_fetch: Option<String>,
    /// Diagram text waiting to be sent to the engine
    pub pending_render: Option<RenderRequest>,
    toast: Option<Toast>,
    /// Whether the app should quit
    pub should_quit: bool,
    pub terminal_size: (u16, u16),
    /// Pixels per terminal cell
    pub cell_px: (u16, u16),
    /// Image picker for terminal rendering
    pub picker: Option<Picker>,
    /// Last rasterized view of the diagram
    pub diagram_view: Option<DiagramView>,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("controller", &self.controller)
            .field("selected", &self.selected)
            .field("fetching", &self.fetching)
            .field("terminal_size", &self.terminal_size)
            .finish_non_exhaustive()
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(RendererConfig::default(), (80, 24))
    }
}

impl Model {
    pub fn new(config: RendererConfig, terminal_size: (u16, u16)) -> Self {
        let mut model = Self {
            controller: Controller::new(config),
            selected: None,
            input: String::new(),
            input_active: false,
            last_input: None,
            fetching: false,
            pending_fetch: None,
            pending_render: None,
            toast: None,
            should_quit: false,
            terminal_size,
            cell_px: DEFAULT_CELL_PX,
            picker: None,
            diagram_view: None,
        };
        model.sync_surface();
        model
    }

    /// Set the image picker and take the cell size from it.
    #[must_use]
    pub fn with_picker(mut self, picker: Option<Picker>) -> Self {
        if let Some(picker) = &picker {
            let (w, h) = picker.font_size();
            if w > 0 && h > 0 {
                self.cell_px = (w, h);
            }
        }
        self.picker = picker;
        self.sync_surface();
        self
    }

    /// Screen area of the diagram pane.
    pub fn diagram_area(&self) -> Rect {
        let (width, height) = self.terminal_size;
        crate::ui::layout(
            Rect::new(0, 0, width, height),
            self.controller.state().is_full_screen(),
        )
        .diagram
    }

    /// Keep the controller's surface size in step with the diagram pane.
    pub(super) fn sync_surface(&mut self) {
        let area = self.diagram_area();
        let (cw, ch) = self.cell_px;
        self.controller.set_surface_size(
            f32::from(area.width) * f32::from(cw),
            f32::from(area.height) * f32::from(ch),
        );
    }

    /// Center of a terminal cell in surface pixels, if the cell is inside
    /// the diagram pane.
    pub fn surface_point(&self, column: u16, row: u16) -> Option<Point> {
        let area = self.diagram_area();
        let inside = column >= area.x
            && column < area.x + area.width
            && row >= area.y
            && row < area.y + area.height;
        if !inside {
            return None;
        }
        let (cw, ch) = (f32::from(self.cell_px.0), f32::from(self.cell_px.1));
        Some(Point::new(
            (f32::from(column - area.x) + 0.5) * cw,
            (f32::from(row - area.y) + 0.5) * ch,
        ))
    }

    /// The node whose details are shown, if it is still in the tree.
    pub fn selected_node(&self) -> Option<&Node> {
        let id = self.selected.as_deref()?;
        self.controller.tree()?.find(id)
    }

    pub(super) fn show_toast(&mut self, level: ToastLevel, message: impl Into<String>) {
        self.toast = Some(Toast {
            level,
            message: message.into(),
            expires_at: Instant::now() + Duration::from_secs(4),
        });
    }

    pub(super) fn expire_toast(&mut self, now: Instant) -> bool {
        if self
            .toast
            .as_ref()
            .is_some_and(|toast| toast.expires_at <= now)
        {
            self.toast = None;
            return true;
        }
        false
    }

    pub fn active_toast(&self) -> Option<(&str, ToastLevel)> {
        self.toast
            .as_ref()
            .map(|toast| (toast.message.as_str(), toast.level))
    }

    /// Whether a worker may still report back.
    pub fn work_in_flight(&self) -> bool {
        self.fetching
            || matches!(
                self.controller.phase(),
                crate::controller::Phase::Rendering { .. }
            )
    }
}
