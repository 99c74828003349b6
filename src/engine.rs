//! Annotation engine: the synchronous core that ties the components together.
//!
//! `AnnotationEngine` owns the viewport, the surface manager, the tool state
//! machine, and the persistence bridge. It performs no I/O: every input
//! returns a list of [`Action`]s for the host (rasterize a frame, fetch a
//! page's annotations, focus the caret, repaint). Time is passed in
//! explicitly so the debounce and double-tap windows are deterministic.
//!
//! Data flows one way: viewport change → surface rebuild or rescale → scene
//! events → snapshot → persistence bridge.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::time::Instant;

use tracing::debug;

use crate::config::EngineConfig;
use crate::consts::{DEFAULT_BRUSH_WIDTH, MAX_BRUSH_WIDTH, MIN_BRUSH_WIDTH};
use crate::doc::{AnnotationObject, ObjectId, SceneDocument, TextData, TextStyle};
use crate::error::RenderError;
use crate::geom::Point;
use crate::persistence::PersistenceBridge;
use crate::raster::Bitmap;
use crate::scene::{Brush, Scene};
use crate::surface::SurfaceManager;
use crate::tools::{GestureState, ToolEffect, ToolMode, ToolState};
use crate::viewport::{DocumentHandle, LayoutMode, RenderRequest, ViewChange, ViewportController};

/// Actions returned from engine inputs for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Rasterize this frame and hand it back through `render_complete`.
    Render(RenderRequest),
    /// Fetch the stored annotations for a page shown for the first time.
    LoadAnnotations { page: u32 },
    /// Put the keyboard caret into a text object.
    FocusTextCaret { id: ObjectId },
    /// Selection changed; carries the selected text's style, if it is text.
    SelectionChanged(Option<TextStyle>),
    SetCursor(String),
    /// Whether pointer input should fall through to the page underneath.
    PointerPassthrough(bool),
    RenderNeeded,
}

pub struct AnnotationEngine {
    config: EngineConfig,
    viewport: ViewportController,
    surface: SurfaceManager,
    tools: ToolState,
    bridge: PersistenceBridge,
    text_style: TextStyle,
    brush: Brush,
}

impl AnnotationEngine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            viewport: ViewportController::new(config.device_pixel_ratio, config.page_gap_px),
            surface: SurfaceManager::new(),
            tools: ToolState::new(config.drag_threshold_px, config.double_tap),
            bridge: PersistenceBridge::new(config.save_debounce),
            text_style: TextStyle::default(),
            brush: Brush::default(),
            config,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    #[must_use]
    pub fn surface(&self) -> &SurfaceManager {
        &self.surface
    }

    #[must_use]
    pub fn scene(&self) -> Option<&Scene> {
        self.surface.scene()
    }

    #[must_use]
    pub fn tools(&self) -> &ToolState {
        &self.tools
    }

    #[must_use]
    pub fn tool(&self) -> ToolMode {
        self.tools.mode()
    }

    #[must_use]
    pub fn bridge(&self) -> &PersistenceBridge {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut PersistenceBridge {
        &mut self.bridge
    }

    #[must_use]
    pub fn text_style(&self) -> &TextStyle {
        &self.text_style
    }

    #[must_use]
    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    // --- Document ---

    /// Show a freshly opened document.
    pub fn open(&mut self, doc: DocumentHandle, initial_page: Option<u32>, now: Instant) -> Vec<Action> {
        if self.viewport.is_open() {
            self.close();
        }
        self.bridge = PersistenceBridge::new(self.config.save_debounce);
        let change = self.viewport.open(doc, initial_page);
        let mut actions = self.apply_view_change(change, now);
        actions.extend(self.tool_feedback());
        actions
    }

    /// Tear down: pending saves are cancelled, the scene is disposed, and
    /// the document is released. Committed edits that were never flushed
    /// are lost.
    pub fn close(&mut self) {
        self.tools.cancel(None);
        self.bridge.cancel_all();
        self.surface.dispose();
        self.viewport.close();
    }

    // --- Navigation and zoom ---

    pub fn go_to(&mut self, page: u32, now: Instant) -> Vec<Action> {
        let change = self.viewport.go_to(page);
        self.maybe_apply(change, now)
    }

    pub fn next_page(&mut self, now: Instant) -> Vec<Action> {
        let change = self.viewport.next_page();
        self.maybe_apply(change, now)
    }

    pub fn prev_page(&mut self, now: Instant) -> Vec<Action> {
        let change = self.viewport.prev_page();
        self.maybe_apply(change, now)
    }

    pub fn set_scale(&mut self, scale: f64, now: Instant) -> Vec<Action> {
        let change = self.viewport.set_scale(scale);
        self.maybe_apply(change, now)
    }

    pub fn zoom_in(&mut self, now: Instant) -> Vec<Action> {
        let change = self.viewport.zoom_in();
        self.maybe_apply(change, now)
    }

    pub fn zoom_out(&mut self, now: Instant) -> Vec<Action> {
        let change = self.viewport.zoom_out();
        self.maybe_apply(change, now)
    }

    pub fn set_layout_mode(&mut self, layout: LayoutMode, now: Instant) -> Vec<Action> {
        let change = self.viewport.set_layout_mode(layout);
        self.maybe_apply(change, now)
    }

    pub fn toggle_layout_mode(&mut self, now: Instant) -> Vec<Action> {
        let layout = self.viewport.layout().toggled();
        self.set_layout_mode(layout, now)
    }

    // --- Render completion ---

    /// A frame finished rasterizing. Stale frames are dropped.
    pub fn render_complete(&mut self, ticket: u64, bitmap: Bitmap) -> Vec<Action> {
        match self.viewport.complete_render(ticket, bitmap) {
            Ok(frame) => {
                let size = frame.css_size();
                self.surface.resize(size);
                vec![Action::RenderNeeded]
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn render_failed(&mut self, ticket: u64, err: &RenderError) {
        self.viewport.fail_render(ticket, err);
    }

    /// Stored annotations for `page` arrived from the host's fetch.
    ///
    /// Edits made on the page while the fetch was in flight are kept on top
    /// of the stored objects, and the merged page is scheduled for saving.
    pub fn annotations_loaded(&mut self, page: u32, doc: Option<SceneDocument>, now: Instant) -> Vec<Action> {
        match self.bridge.record_fetched(page, doc, now) {
            Some(doc) => self.show_loaded(page, doc),
            None => Vec::new(),
        }
    }

    /// Ignored when the user has moved on to another page.
    fn show_loaded(&mut self, page: u32, doc: SceneDocument) -> Vec<Action> {
        if self.surface.merge_stored(page, doc) {
            vec![Action::RenderNeeded]
        } else {
            Vec::new()
        }
    }

    // --- Tools ---

    /// Activate `mode`, cancelling any gesture in progress.
    pub fn set_tool(&mut self, mode: ToolMode, now: Instant) -> Vec<Action> {
        let effects = self.tools.set_mode(mode, self.surface.scene_mut());
        self.surface.apply_flags(mode.flags());
        let mut actions = Self::effects_to_actions(effects);
        actions.extend(self.tool_feedback());
        actions.extend(self.after_input(now));
        actions
    }

    /// Toolbar semantics: choosing the active tool again turns it off.
    pub fn toggle_tool(&mut self, mode: ToolMode, now: Instant) -> Vec<Action> {
        let next = self.tools.mode().toggled(mode);
        self.set_tool(next, now)
    }

    pub fn set_brush_color(&mut self, color: &str) {
        color.clone_into(&mut self.brush.color);
        if let Some(scene) = self.surface.scene_mut() {
            scene.set_brush_color(color);
        }
    }

    /// Brush width for new strokes, clamped to the supported range.
    pub fn set_brush_width(&mut self, width: f64) {
        self.brush.width = if width.is_finite() {
            width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH)
        } else {
            DEFAULT_BRUSH_WIDTH
        };
        if let Some(scene) = self.surface.scene_mut() {
            scene.set_brush_width(self.brush.width);
        }
    }

    /// Change the text style for new text, restyling the selected text too.
    pub fn set_text_style(&mut self, style: TextStyle, now: Instant) -> Vec<Action> {
        self.text_style = style;
        let Some(scene) = self.surface.scene_mut() else {
            return Vec::new();
        };
        let Some(id) = scene.active_object().filter(|o| o.is_text()).map(|o| o.id) else {
            return Vec::new();
        };
        let style = &self.text_style;
        scene.modify(&id, |o| {
            if let Some(text) = o.as_text_mut() {
                text.apply_style(style);
            }
        });
        let mut actions = self.after_input(now);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Remove the selected object in Select mode.
    pub fn delete_selection(&mut self, now: Instant) -> Vec<Action> {
        if self.tools.mode() != ToolMode::Select {
            return Vec::new();
        }
        let Some(scene) = self.surface.scene_mut() else {
            return Vec::new();
        };
        let Some(id) = scene.active() else {
            return Vec::new();
        };
        scene.remove(&id);
        let mut actions = self.after_input(now);
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Pointer input ---

    pub fn pointer_down(&mut self, p: Point, now: Instant) -> Vec<Action> {
        let Some(scene) = self.surface.scene_mut() else {
            return Vec::new();
        };
        let effects = self.tools.pointer_down(scene, p, now);
        self.finish_input(effects, now)
    }

    pub fn pointer_move(&mut self, p: Point, now: Instant) -> Vec<Action> {
        let Some(scene) = self.surface.scene_mut() else {
            return Vec::new();
        };
        self.tools.pointer_move(scene, p);
        let mut actions = self.after_input(now);
        if matches!(self.tools.gesture(), GestureState::Drawing | GestureState::DraggingObject { .. }) {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    pub fn pointer_up(&mut self, p: Point, now: Instant) -> Vec<Action> {
        let Some(scene) = self.surface.scene_mut() else {
            return Vec::new();
        };
        let effects = self.tools.pointer_up(scene, p, now, &self.text_style);
        self.finish_input(effects, now)
    }

    // --- Text editing ---

    /// Commit typed content into the text object being edited.
    pub fn set_text(&mut self, content: &str, now: Instant) -> Vec<Action> {
        let Some(scene) = self.surface.scene_mut() else {
            return Vec::new();
        };
        if !self.tools.set_text(scene, content) {
            return Vec::new();
        }
        let mut actions = self.after_input(now);
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Leave text edit mode, discarding the object if it stayed empty.
    pub fn exit_text_edit(&mut self, now: Instant) -> Vec<Action> {
        let Some(scene) = self.surface.scene_mut() else {
            return Vec::new();
        };
        let effects: Vec<ToolEffect> = self.tools.exit_edit(scene).into_iter().collect();
        self.finish_input(effects, now)
    }

    // --- Persistence ---

    /// Earliest pending save deadline, for the host's timer.
    #[must_use]
    pub fn next_save_deadline(&self) -> Option<Instant> {
        self.bridge.next_deadline()
    }

    // --- Internal ---

    fn maybe_apply(&mut self, change: Option<ViewChange>, now: Instant) -> Vec<Action> {
        match change {
            Some(change) => self.apply_view_change(change, now),
            None => Vec::new(),
        }
    }

    fn apply_view_change(&mut self, change: ViewChange, now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();
        let frame = change.request.frame;
        let scale = change.current.scale;

        if change.needs_rebuild() || self.surface.scene().is_none() {
            // Settle the outgoing page first so its last edits are saved under its own index.
            let effects = self.tools.cancel(self.surface.scene_mut());
            actions.extend(Self::effects_to_actions(effects));
            actions.extend(self.after_input(now));

            let page = change.current.page_index;
            let stored = self.bridge.cached(page).cloned();
            self.surface.on_page_change(page, scale, frame, stored);
            if let Some(scene) = self.surface.scene_mut() {
                scene.set_brush_color(&self.brush.color);
                scene.set_brush_width(self.brush.width);
            }
            actions.push(Action::SelectionChanged(None));
            actions.push(Action::Render(change.request));
            if self.bridge.needs_fetch(page) {
                actions.push(Action::LoadAnnotations { page });
            }
        } else {
            if change.is_rescale() {
                let from = self.surface.scale();
                if from > 0.0 {
                    self.tools.rescale(scale / from);
                }
                self.surface.on_scale_change(scale, frame);
            }
            actions.push(Action::Render(change.request));
        }
        actions
    }

    fn finish_input(&mut self, effects: Vec<ToolEffect>, now: Instant) -> Vec<Action> {
        let mut actions = Self::effects_to_actions(effects);
        actions.extend(self.after_input(now));
        if !actions.is_empty() && !actions.contains(&Action::RenderNeeded) {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    /// Drain scene events: schedule a save on mutation, report selection.
    fn after_input(&mut self, now: Instant) -> Vec<Action> {
        let out = self.surface.flush_events();
        if let Some(doc) = out.snapshot {
            self.bridge.schedule_save(self.surface.page_index(), doc, now);
        }
        if out.selection_changed {
            let style = self.scene().and_then(Scene::active_object).and_then(AnnotationObject::as_text).map(TextData::style);
            debug!(text = style.is_some(), "engine: selection changed");
            vec![Action::SelectionChanged(style)]
        } else {
            Vec::new()
        }
    }

    fn effects_to_actions(effects: Vec<ToolEffect>) -> Vec<Action> {
        let mut actions = Vec::new();
        for effect in effects {
            match effect {
                ToolEffect::FocusTextCaret(id) => actions.push(Action::FocusTextCaret { id }),
                ToolEffect::EditEnded { .. } | ToolEffect::Erased(_) | ToolEffect::StrokeCompleted(_) => {
                    if !actions.contains(&Action::RenderNeeded) {
                        actions.push(Action::RenderNeeded);
                    }
                }
            }
        }
        actions
    }

    fn tool_feedback(&self) -> Vec<Action> {
        let mode = self.tools.mode();
        let cursor = match mode {
            ToolMode::None | ToolMode::Select => "default",
            ToolMode::Freehand => "crosshair",
            ToolMode::Text => "text",
            ToolMode::Eraser => "cell",
        };
        vec![Action::PointerPassthrough(mode.flags().inert), Action::SetCursor(cursor.to_string())]
    }
}
