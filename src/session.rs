//! Annotation session: drives an [`AnnotationEngine`] against real collaborators.
//!
//! The engine decides; the session performs. Every engine input hands back a
//! list of actions, and the session executes the ones that need I/O
//! (rasterizing a frame, fetching a page's stored annotations) before
//! returning the rest to the host UI. The host calls [`AnnotationSession::flush_due`]
//! from its timer at [`AnnotationSession::next_save_deadline`].

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::collections::VecDeque;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::config::EngineConfig;
use crate::doc::TextStyle;
use crate::engine::{Action, AnnotationEngine};
use crate::error::{DocumentLoadError, ErrorCode, PersistenceError, SessionError};
use crate::geom::Point;
use crate::persistence::{FlushReport, load_if_present};
use crate::raster::{Rasterizer, measure_document, rasterize_frame};
use crate::store::AnnotationStore;
use crate::tools::ToolMode;
use crate::viewport::{DocumentHandle, LayoutMode};

/// What the host UI has to handle after a session call.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Host-facing actions, in the order the engine produced them.
    pub actions: Vec<Action>,
    /// Annotation loads that failed. The page stays usable and is asked
    /// for again on its next visit.
    pub load_errors: Vec<PersistenceError>,
}

pub struct AnnotationSession<R, S> {
    engine: AnnotationEngine,
    rasterizer: R,
    store: S,
    score_id: String,
}

impl<R, S> AnnotationSession<R, S>
where
    R: Rasterizer,
    S: AnnotationStore,
{
    #[must_use]
    pub fn new(config: EngineConfig, rasterizer: R, store: S) -> Self {
        Self { engine: AnnotationEngine::new(config), rasterizer, store, score_id: String::new() }
    }

    #[must_use]
    pub fn engine(&self) -> &AnnotationEngine {
        &self.engine
    }

    #[must_use]
    pub fn rasterizer(&self) -> &R {
        &self.rasterizer
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn score_id(&self) -> &str {
        &self.score_id
    }

    // --- Lifecycle ---

    /// Fetch the score's PDF, open it, and show `initial_page`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DocumentLoad`] when the PDF cannot be fetched,
    /// parsed, or measured. The session stays closed.
    pub async fn open(&mut self, score_id: &str, initial_page: Option<u32>, now: Instant) -> Result<Outcome, SessionError> {
        self.close();
        let doc = match self.load_document(score_id).await {
            Ok(doc) => doc,
            Err(e) => {
                error!(score_id, error = %e, code = e.error_code(), "session: document load failed");
                return Err(e.into());
            }
        };
        info!(score_id, pages = doc.page_count(), "session: opened");
        score_id.clone_into(&mut self.score_id);
        let actions = self.engine.open(doc, initial_page, now);
        Ok(self.execute(actions, now).await)
    }

    /// Tear down. Pending saves are discarded, not flushed.
    pub fn close(&mut self) {
        if self.engine.viewport().is_open() {
            info!(score_id = %self.score_id, "session: closed");
        }
        self.engine.close();
    }

    // --- Navigation and zoom ---

    pub async fn go_to(&mut self, page: u32, now: Instant) -> Outcome {
        let actions = self.engine.go_to(page, now);
        self.execute(actions, now).await
    }

    pub async fn next_page(&mut self, now: Instant) -> Outcome {
        let actions = self.engine.next_page(now);
        self.execute(actions, now).await
    }

    pub async fn prev_page(&mut self, now: Instant) -> Outcome {
        let actions = self.engine.prev_page(now);
        self.execute(actions, now).await
    }

    pub async fn set_scale(&mut self, scale: f64, now: Instant) -> Outcome {
        let actions = self.engine.set_scale(scale, now);
        self.execute(actions, now).await
    }

    pub async fn zoom_in(&mut self, now: Instant) -> Outcome {
        let actions = self.engine.zoom_in(now);
        self.execute(actions, now).await
    }

    pub async fn zoom_out(&mut self, now: Instant) -> Outcome {
        let actions = self.engine.zoom_out(now);
        self.execute(actions, now).await
    }

    pub async fn set_layout_mode(&mut self, layout: LayoutMode, now: Instant) -> Outcome {
        let actions = self.engine.set_layout_mode(layout, now);
        self.execute(actions, now).await
    }

    pub async fn toggle_layout_mode(&mut self, now: Instant) -> Outcome {
        let actions = self.engine.toggle_layout_mode(now);
        self.execute(actions, now).await
    }

    // --- Editing ---

    pub fn set_tool(&mut self, mode: ToolMode, now: Instant) -> Vec<Action> {
        self.engine.set_tool(mode, now)
    }

    pub fn toggle_tool(&mut self, mode: ToolMode, now: Instant) -> Vec<Action> {
        self.engine.toggle_tool(mode, now)
    }

    pub fn pointer_down(&mut self, p: Point, now: Instant) -> Vec<Action> {
        self.engine.pointer_down(p, now)
    }

    pub fn pointer_move(&mut self, p: Point, now: Instant) -> Vec<Action> {
        self.engine.pointer_move(p, now)
    }

    pub fn pointer_up(&mut self, p: Point, now: Instant) -> Vec<Action> {
        self.engine.pointer_up(p, now)
    }

    pub fn set_text(&mut self, content: &str, now: Instant) -> Vec<Action> {
        self.engine.set_text(content, now)
    }

    pub fn exit_text_edit(&mut self, now: Instant) -> Vec<Action> {
        self.engine.exit_text_edit(now)
    }

    pub fn set_text_style(&mut self, style: TextStyle, now: Instant) -> Vec<Action> {
        self.engine.set_text_style(style, now)
    }

    pub fn set_brush_color(&mut self, color: &str) {
        self.engine.set_brush_color(color);
    }

    pub fn set_brush_width(&mut self, width: f64) {
        self.engine.set_brush_width(width);
    }

    pub fn delete_selection(&mut self, now: Instant) -> Vec<Action> {
        self.engine.delete_selection(now)
    }

    // --- Persistence ---

    #[must_use]
    pub fn next_save_deadline(&self) -> Option<Instant> {
        self.engine.next_save_deadline()
    }

    /// Write every page whose debounce window has elapsed.
    pub async fn flush_due(&mut self, now: Instant) -> FlushReport {
        self.engine.bridge_mut().flush_due(&self.store, &self.score_id, now).await
    }

    // --- Internal ---

    async fn load_document(&self, score_id: &str) -> Result<DocumentHandle, DocumentLoadError> {
        let bytes = self.store.fetch_pdf(score_id).await?;
        let info = self.rasterizer.open(&bytes).await?;
        measure_document(&self.rasterizer, info).await
    }

    /// Perform the I/O actions and hand the rest back to the host.
    async fn execute(&mut self, actions: Vec<Action>, now: Instant) -> Outcome {
        let mut queue: VecDeque<Action> = actions.into();
        let mut out = Outcome::default();
        while let Some(action) = queue.pop_front() {
            match action {
                Action::Render(request) => {
                    let Some(doc) = self.engine.viewport().document() else {
                        continue;
                    };
                    let result = rasterize_frame(&self.rasterizer, doc, &request).await;
                    match result {
                        Ok(frame) => queue.extend(self.engine.render_complete(request.ticket, frame)),
                        Err(e) => self.engine.render_failed(request.ticket, &e),
                    }
                }
                Action::LoadAnnotations { page } => {
                    match load_if_present(&self.store, &self.score_id, page).await {
                        Ok(doc) => queue.extend(self.engine.annotations_loaded(page, doc, now)),
                        Err(e) => {
                            warn!(page, error = %e, "session: annotations unavailable");
                            out.load_errors.push(e);
                        }
                    }
                }
                other => out.actions.push(other),
            }
        }
        out
    }
}
