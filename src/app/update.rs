use std::sync::Arc;

use crate::app::Model;
use crate::app::model::ToastLevel;
use crate::controller::Completion;
use crate::render::RenderError;
use crate::tree::Node;

/// Distance moved by one scroll step, in surface pixels.
pub const SCROLL_STEP_PX: i32 = 40;

/// Shown when a fetch fails for any reason.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to generate mind map. Please try again.";

/// All possible events and actions in the application.
///
/// Pointer positions are terminal cells; the model maps them onto the
/// diagram surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Input bar
    /// Focus the input bar
    StartInput,
    /// Type a character into the input bar
    InputChar(char),
    /// Delete the last character of the input bar
    InputBackspace,
    /// Leave the input bar without submitting
    CancelInput,
    /// Generate a mind map for this input
    Submit(String),
    /// Generate again from the last submitted input
    Refetch,

    // Worker results
    /// The service returned a tree
    TreeLoaded(Arc<Node>),
    /// The service call failed
    FetchFailed(String),
    /// The engine finished rendering `generation`
    RenderCompleted {
        generation: u64,
        result: Result<String, String>,
    },

    // View
    ZoomIn,
    ZoomOut,
    ResetView,
    ToggleFullScreen,
    /// Scroll the surface by a pixel offset
    ScrollBy { dx: i32, dy: i32 },

    // Pointer
    PointerDown { column: u16, row: u16 },
    PointerMove { column: u16, row: u16 },
    PointerUp { column: u16, row: u16 },
    ClearSelection,

    /// Save the diagram as PNG
    Export,
    /// Terminal resized
    Resize(u16, u16),
    Quit,
}

/// Pure state transition. Work that leaves the loop thread (fetching,
/// rendering, exporting) is queued on the model and started by the event
/// loop's side-effect handler.
pub fn update(mut model: Model, msg: Message) -> Model {
    match msg {
        Message::StartInput => {
            model.input_active = true;
        }
        Message::InputChar(c) => {
            if model.input_active {
                model.input.push(c);
            }
        }
        Message::InputBackspace => {
            if model.input_active {
                model.input.pop();
            }
        }
        Message::CancelInput => {
            model.input_active = false;
        }
        Message::Submit(input) => {
            model.input_active = false;
            request_fetch(&mut model, input);
        }
        Message::Refetch => {
            if let Some(input) = model.last_input.clone() {
                request_fetch(&mut model, input);
            } else {
                model.show_toast(ToastLevel::Info, "Nothing to regenerate yet");
            }
        }

        Message::TreeLoaded(tree) => {
            model.fetching = false;
            model.selected = None;
            let renderable = tree.is_renderable();
            model.pending_render = model.controller.load(tree);
            if !renderable {
                model.show_toast(ToastLevel::Warning, "The mind map came back empty");
            }
        }
        Message::FetchFailed(_) => {
            model.fetching = false;
            model.show_toast(ToastLevel::Error, FETCH_FAILED_MESSAGE);
        }
        Message::RenderCompleted { generation, result } => {
            let result = result.map_err(RenderError::Engine);
            if let Completion::Failed(err) = model.controller.complete(generation, result) {
                model.selected = None;
                model.show_toast(ToastLevel::Error, format!("Failed to render mind map: {err}"));
            }
        }

        Message::ZoomIn => model.controller.zoom_in(),
        Message::ZoomOut => model.controller.zoom_out(),
        Message::ResetView => model.controller.reset_view(),
        Message::ToggleFullScreen => {
            model.controller.toggle_full_screen();
            model.sync_surface();
        }
        #[allow(clippy::cast_precision_loss)]
        Message::ScrollBy { dx, dy } => model.controller.scroll_by(dx as f32, dy as f32),

        Message::PointerDown { column, row } => {
            if let Some(at) = model.surface_point(column, row) {
                model.controller.pointer_down(at);
            }
        }
        Message::PointerMove { column, row } => {
            if model.controller.state().is_dragging() {
                match model.surface_point(column, row) {
                    Some(at) => model.controller.pointer_move(at),
                    None => model.controller.pointer_leave(),
                }
            }
        }
        Message::PointerUp { column, row } => {
            let was_dragging = model.controller.state().is_dragging();
            let moved = model.controller.state().drag_moved();
            model.controller.pointer_up();
            if was_dragging && !moved {
                select_at(&mut model, column, row);
            }
        }
        Message::ClearSelection => {
            model.selected = None;
        }

        Message::Export => {}
        Message::Resize(width, height) => {
            model.terminal_size = (width, height);
            model.sync_surface();
        }
        Message::Quit => {
            model.should_quit = true;
        }
    }
    model
}

fn request_fetch(model: &mut Model, input: String) {
    let input = input.trim().to_string();
    if input.is_empty() {
        return;
    }
    if model.fetching {
        model.show_toast(ToastLevel::Info, "Already generating a mind map");
        return;
    }
    model.fetching = true;
    model.last_input = Some(input.clone());
    model.pending_fetch = Some(input);
}

fn select_at(model: &mut Model, column: u16, row: u16) {
    let Some(at) = model.surface_point(column, row) else {
        return;
    };
    let scroll = model.controller.state().scroll();
    let mut picked = None;
    model.controller.click(at, scroll, &mut |node: &Node| {
        picked = Some(node.id.clone());
    });
    if picked.is_some() {
        model.selected = picked;
    }
}
