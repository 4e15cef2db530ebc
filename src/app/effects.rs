use std::sync::Arc;
use std::sync::mpsc::Sender;

use crate::app::{App, Message, Model, ToastLevel};
use crate::controller::RenderRequest;
use crate::export::{ExportError, ExportOptions};

impl App {
    /// Start the work `update` queued on the model and run synchronous
    /// side effects of `msg`.
    pub(super) fn handle_message_side_effects(
        &self,
        model: &mut Model,
        tx: &Sender<Message>,
        msg: &Message,
    ) {
        if let Some(input) = model.pending_fetch.take() {
            self.spawn_fetch(input, tx.clone());
        }
        if let Some(request) = model.pending_render.take() {
            self.spawn_render(request, tx.clone());
        }
        match msg {
            Message::Export => self.export(model),
            Message::FetchFailed(reason) => {
                crate::perf::log_event("fetch.error", reason);
            }
            _ => {}
        }
    }

    fn spawn_fetch(&self, input: String, tx: Sender<Message>) {
        let source = Arc::clone(&self.source);
        crate::perf::log_event("fetch.start", format!("input_bytes={}", input.len()));
        std::thread::spawn(move || {
            let msg = match source.generate(&input) {
                Ok(tree) => Message::TreeLoaded(Arc::new(tree)),
                Err(err) => {
                    tracing::warn!(error = %err, "mind map request failed");
                    Message::FetchFailed(err.to_string())
                }
            };
            let _ = tx.send(msg);
        });
    }

    fn spawn_render(&self, request: RenderRequest, tx: Sender<Message>) {
        let engine = Arc::clone(&self.engine);
        std::thread::spawn(move || {
            let RenderRequest { generation, source } = request;
            let result = engine.render(&source).map_err(|err| err.to_string());
            let _ = tx.send(Message::RenderCompleted { generation, result });
        });
    }

    fn export(&self, model: &mut Model) {
        let options = ExportOptions::new(&self.output_dir)
            .with_font_family(model.controller.config().font_family.clone());
        match model.controller.export(&options) {
            Ok(outcome) => {
                model.show_toast(
                    ToastLevel::Info,
                    format!("Saved {}", outcome.path.display()),
                );
            }
            Err(ExportError::NotRendered) => {
                model.show_toast(ToastLevel::Warning, "Nothing to export yet");
            }
            Err(err) => {
                model.show_toast(ToastLevel::Error, err.to_string());
            }
        }
    }
}
