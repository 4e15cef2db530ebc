use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Padding, Paragraph, Wrap};

use crate::app::Model;

use super::{DETAILS_WIDTH_PERCENT, DIAGRAM_WIDTH_PERCENT, diagram, status};

/// Screen areas for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneLayout {
    pub diagram: Rect,
    /// Absent in full-screen mode
    pub details: Option<Rect>,
    pub input: Rect,
    pub status: Rect,
}

/// Split the screen into the diagram pane, the details panel, the input
/// bar and the status bar.
pub fn layout(area: Rect, full_screen: bool) -> PaneLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);
    let (main, input, status) = (rows[0], rows[1], rows[2]);

    if full_screen {
        return PaneLayout {
            diagram: main,
            details: None,
            input,
            status,
        };
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(DIAGRAM_WIDTH_PERCENT),
            Constraint::Percentage(DETAILS_WIDTH_PERCENT),
        ])
        .split(main);
    PaneLayout {
        diagram: columns[0],
        details: Some(columns[1]),
        input,
        status,
    }
}

/// Render the complete UI.
pub fn render(model: &mut Model, frame: &mut Frame) {
    let panes = layout(frame.area(), model.controller.state().is_full_screen());

    diagram::render_diagram(model, frame, panes.diagram);
    if let Some(area) = panes.details {
        render_details(model, frame, area);
    }
    status::render_input_bar(model, frame, panes.input);
    status::render_status_bar(model, frame, panes.status);
    status::render_toast_bar(model, frame, panes.status);
}

fn render_details(model: &Model, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title("Details")
        .borders(Borders::ALL)
        .padding(Padding::horizontal(1));

    let lines: Vec<Line> = match model.selected_node() {
        None => vec![Line::styled(
            "Select a node to view details",
            Style::default().fg(Color::DarkGray),
        )],
        Some(node) => {
            let mut lines = vec![
                Line::styled(
                    node.label.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Line::default(),
            ];
            if node.has_details() {
                lines.extend(
                    node.detail_entries()
                        .iter()
                        .map(|entry| Line::from(format!("• {entry}"))),
                );
            } else {
                lines.push(Line::styled(
                    "No additional details available",
                    Style::default().fg(Color::DarkGray),
                ));
            }
            lines
        }
    };

    let details = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(details, area);
}
