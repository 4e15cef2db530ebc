use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::Frame;

use crate::app::{App, Message, Model};

use super::event_loop::ResizeDebouncer;
use super::update::SCROLL_STEP_PX;

impl App {
    pub(super) fn handle_event(
        &self,
        event: &Event,
        model: &Model,
        now_ms: u64,
        resize_debouncer: &mut ResizeDebouncer,
    ) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(*key, model),
            Event::Mouse(mouse) => self.handle_mouse(*mouse, model),
            Event::Resize(w, h) => {
                crate::perf::log_event("event.resize.queue", format!("width={w} height={h}"));
                resize_debouncer.queue(*w, *h, now_ms);
                None
            }
            _ => None,
        }
    }

    pub(super) fn handle_key(&self, key: KeyEvent, model: &Model) -> Option<Message> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Message::Quit);
        }

        if model.input_active {
            return match key.code {
                KeyCode::Enter => Some(Message::Submit(model.input.clone())),
                KeyCode::Esc => Some(Message::CancelInput),
                KeyCode::Backspace => Some(Message::InputBackspace),
                KeyCode::Char(c) => Some(Message::InputChar(c)),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char('/' | 'i') => Some(Message::StartInput),
            KeyCode::Char('r') => Some(Message::Refetch),

            // View
            KeyCode::Char('+' | '=') => Some(Message::ZoomIn),
            KeyCode::Char('-' | '_') => Some(Message::ZoomOut),
            KeyCode::Char('0') => Some(Message::ResetView),
            KeyCode::Char('f') => Some(Message::ToggleFullScreen),
            KeyCode::Up | KeyCode::Char('k') => Some(Message::ScrollBy {
                dx: 0,
                dy: -SCROLL_STEP_PX,
            }),
            KeyCode::Down | KeyCode::Char('j') => Some(Message::ScrollBy {
                dx: 0,
                dy: SCROLL_STEP_PX,
            }),
            KeyCode::Left | KeyCode::Char('h') => Some(Message::ScrollBy {
                dx: -SCROLL_STEP_PX,
                dy: 0,
            }),
            KeyCode::Right | KeyCode::Char('l') => Some(Message::ScrollBy {
                dx: SCROLL_STEP_PX,
                dy: 0,
            }),

            KeyCode::Char('s') => Some(Message::Export),
            KeyCode::Esc => Some(Message::ClearSelection),
            KeyCode::Char('q') => Some(Message::Quit),
            _ => None,
        }
    }

    pub(super) fn handle_mouse(&self, mouse: MouseEvent, model: &Model) -> Option<Message> {
        let (column, row) = (mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                model
                    .surface_point(column, row)
                    .map(|_| Message::PointerDown { column, row })
            }
            MouseEventKind::Drag(MouseButton::Left) => Some(Message::PointerMove { column, row }),
            MouseEventKind::Up(MouseButton::Left) => Some(Message::PointerUp { column, row }),
            MouseEventKind::ScrollDown => Some(Message::ScrollBy {
                dx: 0,
                dy: SCROLL_STEP_PX,
            }),
            MouseEventKind::ScrollUp => Some(Message::ScrollBy {
                dx: 0,
                dy: -SCROLL_STEP_PX,
            }),
            _ => None,
        }
    }

    pub(super) fn view(&self, model: &mut Model, frame: &mut Frame) {
        crate::ui::render(model, frame);
    }
}
