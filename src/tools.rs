//! Tool model: the active tool and the pointer gesture state machine.
//!
//! `ToolMode` is the user's explicit choice; `GestureState` is the gesture
//! being tracked between pointer-down and pointer-up. `ToolState` interprets
//! pointer events for the active mode and applies the resulting mutations to
//! the live [`Scene`]. Every path through a gesture ends back in
//! [`GestureState::Idle`], and changing modes cancels whatever was pending:
//! the gesture, the double-tap window, and any text edit.

#[cfg(test)]
#[path = "tools_test.rs"]
mod tools_test;

use std::time::{Duration, Instant};

use tracing::debug;

use crate::consts::TEXT_PLACEHOLDER;
use crate::doc::{AnnotationObject, ObjectId, TextData, TextStyle};
use crate::geom::Point;
use crate::scene::{Scene, SurfaceOptions};
use crate::surface::InteractionFlags;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolMode {
    /// No tool: the surface is inert and pointer input reaches the page.
    #[default]
    None,
    /// Click/drag selection and moving of existing objects.
    Select,
    /// Draw freehand strokes with the brush.
    Freehand,
    /// Place and edit text.
    Text,
    /// Remove the topmost object under the pointer.
    Eraser,
}

impl ToolMode {
    /// Surface configuration for this mode.
    #[must_use]
    pub fn flags(self) -> InteractionFlags {
        let (selection, drawing_mode, objects_selectable, skip_target_find, inert) = match self {
            Self::None => (false, false, true, false, true),
            Self::Select => (true, false, true, false, false),
            Self::Text => (false, false, true, false, false),
            Self::Freehand => (false, true, false, true, false),
            Self::Eraser => (false, false, false, false, false),
        };
        InteractionFlags {
            options: SurfaceOptions { selection, drawing_mode },
            objects_selectable,
            skip_target_find,
            inert,
        }
    }

    /// The mode after the toolbar button for `requested` is pressed: pressing
    /// the active tool again turns it off.
    #[must_use]
    pub fn toggled(self, requested: Self) -> Self {
        if self == requested { Self::None } else { requested }
    }
}

/// Internal state for the gesture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GestureState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Pointer is down but has not moved past the drag threshold.
    Pressed {
        /// Scene position of the pointer-down.
        origin: Point,
        /// Object under the pointer at pointer-down, if any.
        target: Option<ObjectId>,
        /// Whether releasing here counts as a tap.
        tap: bool,
    },
    /// A freehand stroke is being captured.
    Drawing,
    /// An object is being moved in Select mode.
    DraggingObject {
        id: ObjectId,
        /// Pointer position at the previous event.
        last: Point,
    },
    /// The pointer moved past the threshold with nothing to drag.
    Panning,
}

/// A completed tap on a text object, waiting for a possible second tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingTap {
    pub id: ObjectId,
    pub at: Instant,
}

/// A text object in edit mode.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEdit {
    pub id: ObjectId,
    /// Created by a tap on empty canvas and not yet committed.
    pub provisional: bool,
}

/// Side effects the host has to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolEffect {
    /// Put the keyboard caret into this text object.
    FocusTextCaret(ObjectId),
    /// Editing stopped; `discarded` when the object was deleted as empty.
    EditEnded { id: ObjectId, discarded: bool },
    Erased(ObjectId),
    StrokeCompleted(ObjectId),
}

pub struct ToolState {
    mode: ToolMode,
    gesture: GestureState,
    pending_tap: Option<PendingTap>,
    editing: Option<TextEdit>,
    drag_threshold: f64,
    double_tap: Duration,
}

impl ToolState {
    #[must_use]
    pub fn new(drag_threshold: f64, double_tap: Duration) -> Self {
        Self {
            mode: ToolMode::None,
            gesture: GestureState::Idle,
            pending_tap: None,
            editing: None,
            drag_threshold,
            double_tap,
        }
    }

    #[must_use]
    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    #[must_use]
    pub fn gesture(&self) -> GestureState {
        self.gesture
    }

    #[must_use]
    pub fn editing(&self) -> Option<&TextEdit> {
        self.editing.as_ref()
    }

    #[must_use]
    pub fn pending_tap(&self) -> Option<PendingTap> {
        self.pending_tap
    }

    /// Switch tools, cancelling every pending gesture first.
    pub fn set_mode(&mut self, mode: ToolMode, scene: Option<&mut Scene>) -> Vec<ToolEffect> {
        let effects = self.cancel(scene);
        if mode != self.mode {
            debug!(from = ?self.mode, to = ?mode, "tools: mode changed");
        }
        self.mode = mode;
        effects
    }

    /// Drop the in-flight gesture, the double-tap window, and any text edit.
    ///
    /// The live scene, when given, loses its partial stroke and has its edit
    /// closed out; committed objects stay.
    pub fn cancel(&mut self, scene: Option<&mut Scene>) -> Vec<ToolEffect> {
        self.gesture = GestureState::Idle;
        self.pending_tap = None;
        let Some(scene) = scene else {
            self.editing = None;
            return Vec::new();
        };
        scene.cancel_stroke();
        self.exit_edit(scene).into_iter().collect()
    }

    /// Re-express the in-flight gesture's anchor points after a zoom by `ratio`.
    pub fn rescale(&mut self, ratio: f64) {
        match &mut self.gesture {
            GestureState::Pressed { origin, .. } => *origin = origin.scaled(ratio),
            GestureState::DraggingObject { last, .. } => *last = last.scaled(ratio),
            GestureState::Idle | GestureState::Drawing | GestureState::Panning => {}
        }
    }

    // --- Pointer input ---

    pub fn pointer_down(&mut self, scene: &mut Scene, p: Point, now: Instant) -> Vec<ToolEffect> {
        match self.mode {
            ToolMode::None => Vec::new(),
            ToolMode::Select => {
                let target = scene.find_target(p).filter(|id| scene.get(id).is_some_and(|o| o.selectable));
                scene.set_active(target);
                self.gesture = GestureState::Pressed { origin: p, target, tap: false };
                Vec::new()
            }
            ToolMode::Freehand => {
                if scene.begin_stroke(p) {
                    self.gesture = GestureState::Drawing;
                }
                Vec::new()
            }
            ToolMode::Eraser => {
                let mut effects = Vec::new();
                if let Some(id) = scene.find_target(p).or_else(|| scene.find_containing(p)) {
                    scene.remove(&id);
                    effects.push(ToolEffect::Erased(id));
                }
                self.gesture = GestureState::Idle;
                effects
            }
            ToolMode::Text => self.text_down(scene, p, now),
        }
    }

    pub fn pointer_move(&mut self, scene: &mut Scene, p: Point) {
        match self.gesture {
            GestureState::Idle | GestureState::Panning => {}
            GestureState::Drawing => scene.extend_stroke(p),
            GestureState::Pressed { origin, target, .. } => {
                if origin.distance(p) <= self.drag_threshold {
                    return;
                }
                self.gesture = match (self.mode, target) {
                    (ToolMode::Select, Some(id)) => {
                        scene.modify(&id, |o| o.translate(p.x - origin.x, p.y - origin.y));
                        GestureState::DraggingObject { id, last: p }
                    }
                    _ => GestureState::Panning,
                };
            }
            GestureState::DraggingObject { id, last } => {
                scene.modify(&id, |o| o.translate(p.x - last.x, p.y - last.y));
                self.gesture = GestureState::DraggingObject { id, last: p };
            }
        }
    }

    pub fn pointer_up(
        &mut self,
        scene: &mut Scene,
        p: Point,
        now: Instant,
        style: &TextStyle,
    ) -> Vec<ToolEffect> {
        let gesture = std::mem::take(&mut self.gesture);
        match gesture {
            GestureState::Drawing => {
                scene.extend_stroke(p);
                scene.finish_stroke().map(ToolEffect::StrokeCompleted).into_iter().collect()
            }
            GestureState::Pressed { origin, target, tap: true } if origin.distance(p) <= self.drag_threshold => {
                self.text_tap(scene, p, target, now, style)
            }
            _ => Vec::new(),
        }
    }

    // --- Text editing ---

    /// Replace the content of the object being edited.
    pub fn set_text(&mut self, scene: &mut Scene, content: &str) -> bool {
        let Some(edit) = &self.editing else {
            return false;
        };
        scene.modify(&edit.id, |o| {
            if let Some(text) = o.as_text_mut() {
                content.clone_into(&mut text.text);
            }
        })
    }

    /// Leave edit mode. Empty text is always deleted; provisional text still
    /// showing the placeholder is deleted too.
    pub fn exit_edit(&mut self, scene: &mut Scene) -> Option<ToolEffect> {
        let edit = self.editing.take()?;
        let discard = match scene.get(&edit.id).and_then(AnnotationObject::as_text) {
            Some(text) => text.text.trim().is_empty() || (edit.provisional && text.text == TEXT_PLACEHOLDER),
            None => return Some(ToolEffect::EditEnded { id: edit.id, discarded: true }),
        };
        if discard {
            scene.remove(&edit.id);
            debug!(id = %edit.id, "tools: empty text discarded");
        }
        Some(ToolEffect::EditEnded { id: edit.id, discarded: discard })
    }

    fn text_down(&mut self, scene: &mut Scene, p: Point, now: Instant) -> Vec<ToolEffect> {
        let target = scene.find_target(p).filter(|id| scene.get(id).is_some_and(AnnotationObject::is_text));
        let mut effects = Vec::new();
        let mut tap = true;
        if let Some(edit) = &self.editing {
            if target == Some(edit.id) {
                // Caret placement inside the edited object.
                tap = false;
            } else {
                effects.extend(self.exit_edit(scene));
                self.pending_tap = None;
                tap = false;
            }
        }
        if self.pending_tap.is_some_and(|t| now.duration_since(t.at) > self.double_tap) {
            self.pending_tap = None;
        }
        self.gesture = GestureState::Pressed { origin: p, target, tap };
        effects
    }

    fn text_tap(
        &mut self,
        scene: &mut Scene,
        p: Point,
        target: Option<ObjectId>,
        now: Instant,
        style: &TextStyle,
    ) -> Vec<ToolEffect> {
        if let Some(id) = target.filter(|id| scene.get(id).is_some()) {
            let second = self
                .pending_tap
                .take()
                .is_some_and(|t| t.id == id && now.duration_since(t.at) <= self.double_tap);
            if second {
                scene.set_active(Some(id));
                self.editing = Some(TextEdit { id, provisional: false });
                return vec![ToolEffect::FocusTextCaret(id)];
            }
            scene.set_active(Some(id));
            self.pending_tap = Some(PendingTap { id, at: now });
            return Vec::new();
        }

        self.pending_tap = None;
        let obj = AnnotationObject::new_text(p, TextData::from_style(TEXT_PLACEHOLDER, style));
        let id = scene.add(obj);
        scene.set_active(Some(id));
        self.editing = Some(TextEdit { id, provisional: true });
        debug!(%id, x = p.x, y = p.y, "tools: provisional text created");
        vec![ToolEffect::FocusTextCaret(id)]
    }
}
