use std::io::{Write, stdout};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::{App, Message, Model, update};

pub(super) struct ResizeDebouncer {
    delay_ms: u64,
    pending: Option<(u16, u16, u64)>,
}

impl ResizeDebouncer {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub(super) const fn queue(&mut self, width: u16, height: u16, now_ms: u64) {
        self.pending = Some((width, height, now_ms));
    }

    pub(super) fn take_ready(&mut self, now_ms: u64) -> Option<(u16, u16)> {
        let (width, height, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            Some((width, height))
        } else {
            None
        }
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl App {
    /// Run the main event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if terminal initialization or the event loop hits
    /// an I/O failure.
    pub fn run(&mut self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        // Create image picker BEFORE initializing terminal (queries stdio)
        let picker_scope = crate::perf::scope("app.create_picker");
        let picker = crate::ui::create_picker(self.force_half_cell);
        drop(picker_scope);

        let mut terminal = ratatui::try_init().context(
            "Failed to initialize terminal; mindmapper requires an interactive terminal",
        )?;
        let size = terminal.size()?;

        let mut model =
            Model::new(self.renderer.clone(), (size.width, size.height)).with_picker(picker);
        let (tx, rx) = mpsc::channel();

        let mut startup = Vec::new();
        if let Some(tree) = self.initial_tree.take() {
            startup.push(Message::TreeLoaded(Arc::new(tree)));
        }
        if let Some(input) = self.initial_input.take() {
            startup.push(Message::Submit(input));
        }
        for msg in startup {
            self.dispatch(&mut model, &tx, msg);
        }

        let result = self.event_loop(&mut terminal, &mut model, &tx, &rx);

        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();

        result
    }

    fn dispatch(&self, model: &mut Model, tx: &Sender<Message>, msg: Message) {
        crate::perf::log_event("event.message", format!("msg={}", describe(&msg)));
        let side_msg = msg.clone();
        *model = update(std::mem::take(model), msg);
        self.handle_message_side_effects(model, tx, &side_msg);
    }

    fn event_loop(
        &self,
        terminal: &mut DefaultTerminal,
        model: &mut Model,
        tx: &Sender<Message>,
        rx: &Receiver<Message>,
    ) -> Result<()> {
        let start = Instant::now();
        let mut resize_debouncer = ResizeDebouncer::new(100);
        let mut frame_idx: u64 = 0;
        let mut needs_render = true;

        execute!(stdout(), EnableMouseCapture)?;
        set_mouse_motion_tracking(true)?;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            // Results from fetch and render workers
            while let Ok(msg) = rx.try_recv() {
                self.dispatch(model, tx, msg);
                needs_render = true;
            }

            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            if let Some((width, height)) = resize_debouncer.take_ready(now_ms) {
                crate::perf::log_event(
                    "event.resize.apply",
                    format!("frame={frame_idx} width={width} height={height}"),
                );
                self.dispatch(model, tx, Message::Resize(width, height));
                needs_render = true;
            }

            let poll_ms = if needs_render {
                0
            } else if resize_debouncer.is_pending() || model.work_in_flight() {
                20
            } else {
                250
            };
            if event::poll(Duration::from_millis(poll_ms))? {
                // Coalesce key repeat and drag bursts into a single render.
                loop {
                    let event_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let msg =
                        self.handle_event(&event::read()?, model, event_ms, &mut resize_debouncer);
                    if let Some(msg) = msg {
                        self.dispatch(model, tx, msg);
                        needs_render = true;
                    }
                    if !event::poll(Duration::from_millis(0))? {
                        break;
                    }
                }
            }

            if needs_render {
                frame_idx += 1;
                let draw_start = Instant::now();
                terminal.draw(|frame| self.view(model, frame))?;
                crate::perf::log_event(
                    "frame.draw",
                    format!(
                        "frame={} draw_ms={:.3}",
                        frame_idx,
                        draw_start.elapsed().as_secs_f64() * 1000.0
                    ),
                );
                needs_render = false;
            }

            if model.should_quit {
                break;
            }
        }
        let _ = set_mouse_motion_tracking(false);
        Ok(())
    }
}

/// Message summary for the debug log; render payloads are elided.
fn describe(msg: &Message) -> String {
    match msg {
        Message::RenderCompleted { generation, result } => format!(
            "RenderCompleted {{ generation: {generation}, ok: {} }}",
            result.is_ok()
        ),
        Message::TreeLoaded(tree) => format!("TreeLoaded {{ nodes: {} }}", tree.node_count()),
        other => format!("{other:?}"),
    }
}

fn set_mouse_motion_tracking(enable: bool) -> std::io::Result<()> {
    // Button-event tracking (1002) with SGR encoding (1006) so drags report
    // every cell crossed.
    let mut out = stdout();
    if enable {
        out.write_all(b"\x1b[?1002h\x1b[?1006h")?;
    } else {
        out.write_all(b"\x1b[?1002l\x1b[?1006l")?;
    }
    out.flush()
}
