#[cfg(unix)]
use std::time::Duration;

use image::{DynamicImage, RgbaImage};
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Wrap};
use ratatui_image::picker::Picker;
#[cfg(unix)]
use ratatui_image::picker::cap_parser::QueryStdioOptions;
use ratatui_image::protocol::StatefulProtocol;
use ratatui_image::{Resize, StatefulImage};
use resvg::tiny_skia::{self, Transform};

use crate::app::Model;
use crate::controller::Phase;
use crate::diagram::DETAIL_CLASS;
use crate::render::{Bounds, RenderedDiagram};
use crate::tree::Node;

#[cfg(unix)]
const PICKER_QUERY_TIMEOUT_MS: u64 = 250;
const HIGHLIGHT_RGBA: [u8; 4] = [255, 140, 0, 255];
const HIGHLIGHT_WIDTH: f32 = 3.0;

/// Create a picker for terminal image rendering.
///
/// The picker detects terminal capabilities and chooses the best protocol.
pub fn create_picker(force_half_cell: bool) -> Option<Picker> {
    if force_half_cell {
        crate::perf::log_event(
            "ui.create_picker",
            "force_half_cell=true protocol=Halfblocks",
        );
        return Some(Picker::halfblocks());
    }

    // The stdio capability query can wedge some Windows consoles.
    #[cfg(not(unix))]
    {
        crate::perf::log_event("ui.create_picker", "windows fallback protocol=Halfblocks");
        return Some(Picker::halfblocks());
    }

    #[cfg(unix)]
    {
        let mut options = QueryStdioOptions::default();
        options.timeout = Duration::from_millis(PICKER_QUERY_TIMEOUT_MS);
        let picker = Picker::from_query_stdio_with_options(options).ok()?;
        crate::perf::log_event(
            "ui.create_picker",
            format!(
                "term={} colorterm={} protocol={:?}",
                std::env::var("TERM").unwrap_or_else(|_| "<unset>".to_string()),
                std::env::var("COLORTERM").unwrap_or_else(|_| "<unset>".to_string()),
                picker.protocol_type()
            ),
        );
        Some(picker)
    }
}

/// Everything the rasterized view depends on.
#[derive(Debug, Clone, PartialEq)]
struct ViewKey {
    generation: u64,
    transform: [f32; 6],
    size: (u32, u32),
    selected: Option<String>,
}

/// The diagram as last rasterized for the terminal.
pub struct DiagramView {
    key: ViewKey,
    protocol: StatefulProtocol,
}

/// Draw the diagram through `transform` onto a white `size` canvas,
/// outlining `highlight` (canvas coordinates) when given.
pub fn rasterize_view(
    diagram: &RenderedDiagram,
    transform: Transform,
    size: (u32, u32),
    highlight: Option<Bounds>,
) -> Option<RgbaImage> {
    let _scope = crate::perf::scope("ui.rasterize_view");
    let mut pixmap = tiny_skia::Pixmap::new(size.0.max(1), size.1.max(1))?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(diagram.tree(), transform, &mut pixmap.as_mut());

    if let Some(bounds) = highlight {
        let rect = tiny_skia::Rect::from_xywh(bounds.x, bounds.y, bounds.width, bounds.height)?;
        let path = tiny_skia::PathBuilder::from_rect(rect);
        let mut paint = tiny_skia::Paint::default();
        let [r, g, b, a] = HIGHLIGHT_RGBA;
        paint.set_color_rgba8(r, g, b, a);
        paint.anti_alias = true;
        let stroke = tiny_skia::Stroke {
            width: HIGHLIGHT_WIDTH / transform.sx.max(f32::EPSILON),
            ..tiny_skia::Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, transform, None);
    }

    let (width, height) = (pixmap.width(), pixmap.height());
    // Opaque background, so premultiplied and straight alpha agree.
    RgbaImage::from_raw(width, height, pixmap.take())
}

/// Canvas bounds of the selected node's own element.
fn selected_bounds(diagram: &RenderedDiagram, selected: Option<&str>) -> Option<Bounds> {
    let selected = selected?;
    diagram
        .elements()
        .iter()
        .find(|e| e.node_id == selected && !e.has_class(DETAIL_CLASS))
        .and_then(|e| e.bounds)
}

pub(super) fn render_diagram(model: &mut Model, frame: &mut Frame, area: Rect) {
    match model.controller.phase() {
        Phase::Empty if model.fetching => render_notice(frame, area, "Generating mind map...", None),
        Phase::Empty => render_notice(
            frame,
            area,
            "No Mind Map Yet",
            Some("Enter a URL, video link, or prompt to generate an interactive mind map."),
        ),
        Phase::Rendering { .. } => render_notice(frame, area, "Rendering...", None),
        Phase::Rendered => {
            if refresh_view(model).is_some() {
                if let Some(view) = model.diagram_view.as_mut() {
                    let widget = StatefulImage::default().resize(Resize::Scale(None));
                    frame.render_stateful_widget(widget, area, &mut view.protocol);
                }
            } else if let Some(tree) = model.controller.tree() {
                render_outline(frame, area, tree, model.selected.as_deref());
            }
        }
    }
}

/// Re-rasterize when anything the view depends on has changed.
fn refresh_view(model: &mut Model) -> Option<()> {
    let picker = model.picker.as_ref()?;
    let diagram = model.controller.diagram()?;
    let transform = model.controller.view_transform()?;
    let (width, height) = model.controller.surface_size();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let size = (width.round() as u32, height.round() as u32);

    let key = ViewKey {
        generation: model.controller.generation(),
        transform: [
            transform.sx,
            transform.ky,
            transform.kx,
            transform.sy,
            transform.tx,
            transform.ty,
        ],
        size,
        selected: model.selected.clone(),
    };
    if model
        .diagram_view
        .as_ref()
        .is_some_and(|view| view.key == key)
    {
        return Some(());
    }

    let highlight = selected_bounds(diagram, model.selected.as_deref());
    let image = rasterize_view(diagram, transform, size, highlight)?;
    let protocol = picker.new_resize_protocol(DynamicImage::ImageRgba8(image));
    crate::perf::log_event(
        "ui.diagram_view.refresh",
        format!(
            "generation={} size={}x{} selected={:?}",
            key.generation, size.0, size.1, key.selected
        ),
    );
    model.diagram_view = Some(DiagramView { key, protocol });
    Some(())
}

fn render_notice(frame: &mut Frame, area: Rect, title: &str, hint: Option<&str>) {
    let mut lines = vec![Line::styled(
        title.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    if let Some(hint) = hint {
        lines.push(Line::default());
        lines.push(Line::styled(
            hint.to_string(),
            Style::default().fg(Color::DarkGray),
        ));
    }
    let top = area.y + area.height.saturating_sub(2) / 2;
    let body = Rect::new(area.x, top, area.width, area.bottom().saturating_sub(top));
    let notice = Paragraph::new(lines).centered().wrap(Wrap { trim: true });
    frame.render_widget(notice, body);
}

/// Indented outline for terminals without image support.
fn render_outline(frame: &mut Frame, area: Rect, tree: &Node, selected: Option<&str>) {
    fn walk<'a>(node: &'a Node, depth: usize, selected: Option<&str>, out: &mut Vec<Line<'a>>) {
        let style = if selected == Some(node.id.as_str()) {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        out.push(Line::from(vec![
            Span::raw("  ".repeat(depth)),
            Span::styled(node.label.as_str(), style),
        ]));
        for child in &node.children {
            walk(child, depth + 1, selected, out);
        }
    }

    let mut lines = Vec::new();
    walk(tree, 0, selected, &mut lines);
    frame.render_widget(Paragraph::new(lines), area);
}
