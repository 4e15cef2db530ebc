use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::app::{Model, ToastLevel};
use crate::controller::Phase;

pub fn render_input_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let (text, style) = if model.input_active {
        (
            format!("> {}_", model.input),
            Style::default().bg(Color::Blue).fg(Color::White),
        )
    } else if model.fetching {
        (
            format!(
                "Generating mind map for \"{}\"...",
                model.last_input.as_deref().unwrap_or_default()
            ),
            Style::default().fg(Color::Yellow),
        )
    } else {
        (
            "/: enter a URL, video link, or prompt".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}

pub fn render_status_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let state = model.controller.state();
    let phase = match model.controller.phase() {
        Phase::Empty => "empty",
        Phase::Rendering { .. } => "rendering",
        Phase::Rendered => "ready",
    };
    let nodes = model
        .controller
        .tree()
        .filter(|tree| tree.is_renderable())
        .map(|tree| format!("  {} nodes", tree.node_count()))
        .unwrap_or_default();
    let full_screen = if state.is_full_screen() {
        " [full screen]"
    } else {
        ""
    };

    let status = format!(
        " mindmapper  [{}%]  {phase}{nodes}{full_screen}  +/-:zoom 0:reset f:full s:save q:quit",
        state.zoom_percent()
    );
    let status_bar =
        Paragraph::new(status).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    frame.render_widget(status_bar, area);
}

pub fn render_toast_bar(model: &Model, frame: &mut Frame, area: Rect) {
    let Some((message, level)) = model.active_toast() else {
        return;
    };
    let (prefix, style) = match level {
        ToastLevel::Info => (
            "[info]",
            Style::default().bg(Color::DarkGray).fg(Color::White),
        ),
        ToastLevel::Warning => (
            "[warn]",
            Style::default().bg(Color::Yellow).fg(Color::Black),
        ),
        ToastLevel::Error => ("[error]", Style::default().bg(Color::Red).fg(Color::White)),
    };
    let toast = Paragraph::new(format!("{prefix} {message}")).style(style);
    frame.render_widget(toast, area);
}
