//! Interactive scene: the ordered object list drawn over a rasterized page.
//!
//! A `Scene` plays the role of a vector canvas library. It owns the objects
//! (back-to-front), the active selection, the freehand brush, and an event
//! queue. Mutations enqueue [`SceneEvent`]s while listeners are attached; the
//! surface manager drains them after each input. Once
//! [`Scene::detach_listeners`] runs, the queue is cleared and nothing more is
//! recorded, so a scene on its way out can never leak a stale change.

#[cfg(test)]
#[path = "scene_test.rs"]
mod scene_test;

use crate::consts::{DEFAULT_BRUSH_COLOR, DEFAULT_BRUSH_WIDTH, MAX_BRUSH_WIDTH, MIN_BRUSH_WIDTH};
use crate::doc::{AnnotationObject, ObjectId, SceneDocument};
use crate::geom::{Point, Size};
use crate::hit;

/// Identifies one scene instance over the lifetime of a session.
pub type SceneId = u64;

/// Change notifications raised by a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneEvent {
    ObjectAdded(ObjectId),
    ObjectModified(ObjectId),
    ObjectRemoved(ObjectId),
    SelectionCreated(ObjectId),
    SelectionUpdated(ObjectId),
    SelectionCleared,
    FreehandPathCompleted(ObjectId),
}

impl SceneEvent {
    /// Whether the event changes persisted content.
    #[must_use]
    pub fn is_mutation(self) -> bool {
        matches!(self, Self::ObjectAdded(_) | Self::ObjectModified(_) | Self::ObjectRemoved(_))
    }

    #[must_use]
    pub fn is_selection(self) -> bool {
        matches!(self, Self::SelectionCreated(_) | Self::SelectionUpdated(_) | Self::SelectionCleared)
    }
}

/// Construction flags for a scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurfaceOptions {
    /// Click/drag selection and transform handles are enabled.
    pub selection: bool,
    /// Pointer input draws freehand strokes.
    pub drawing_mode: bool,
}

/// Freehand brush settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Brush {
    pub color: String,
    pub width: f64,
}

impl Default for Brush {
    fn default() -> Self {
        Self { color: DEFAULT_BRUSH_COLOR.to_string(), width: DEFAULT_BRUSH_WIDTH }
    }
}

pub struct Scene {
    id: SceneId,
    size: Size,
    objects: Vec<AnnotationObject>,
    active: Option<ObjectId>,
    options: SurfaceOptions,
    skip_target_find: bool,
    brush: Brush,
    stroke: Option<Vec<Point>>,
    listening: bool,
    events: Vec<SceneEvent>,
}

impl Scene {
    #[must_use]
    pub fn new(id: SceneId, size: Size, options: SurfaceOptions) -> Self {
        Self {
            id,
            size,
            objects: Vec::new(),
            active: None,
            options,
            skip_target_find: false,
            brush: Brush::default(),
            stroke: None,
            listening: true,
            events: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> SceneId {
        self.id
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    pub fn set_dimensions(&mut self, size: Size) {
        self.size = size;
    }

    #[must_use]
    pub fn options(&self) -> SurfaceOptions {
        self.options
    }

    /// Reconfigure how pointer input is interpreted.
    pub fn set_options(&mut self, options: SurfaceOptions, skip_target_find: bool) {
        self.options = options;
        self.skip_target_find = skip_target_find;
        if !options.drawing_mode {
            self.stroke = None;
        }
    }

    /// Set the `selectable` flag on every object.
    pub fn set_objects_selectable(&mut self, selectable: bool) {
        for obj in &mut self.objects {
            obj.selectable = selectable;
        }
    }

    // --- Objects ---

    #[must_use]
    pub fn objects(&self) -> &[AnnotationObject] {
        &self.objects
    }

    #[must_use]
    pub fn get(&self, id: &ObjectId) -> Option<&AnnotationObject> {
        self.objects.iter().find(|o| o.id == *id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Append an object on top of the stack.
    pub fn add(&mut self, obj: AnnotationObject) -> ObjectId {
        let id = obj.id;
        self.objects.push(obj);
        self.emit(SceneEvent::ObjectAdded(id));
        id
    }

    /// Remove an object, clearing the selection if it was active.
    pub fn remove(&mut self, id: &ObjectId) -> Option<AnnotationObject> {
        let idx = self.objects.iter().position(|o| o.id == *id)?;
        let obj = self.objects.remove(idx);
        if self.active == Some(*id) {
            self.active = None;
            self.emit(SceneEvent::SelectionCleared);
        }
        self.emit(SceneEvent::ObjectRemoved(*id));
        Some(obj)
    }

    /// Mutate an object in place and recompute its coordinates.
    ///
    /// Returns false if the object does not exist.
    pub fn modify<F>(&mut self, id: &ObjectId, f: F) -> bool
    where
        F: FnOnce(&mut AnnotationObject),
    {
        let Some(obj) = self.objects.iter_mut().find(|o| o.id == *id) else {
            return false;
        };
        f(obj);
        obj.set_coords();
        self.emit(SceneEvent::ObjectModified(*id));
        true
    }

    // --- Selection ---

    #[must_use]
    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    #[must_use]
    pub fn active_object(&self) -> Option<&AnnotationObject> {
        self.active.and_then(|id| self.get(&id))
    }

    /// Make `id` the active object, or clear the selection with `None`.
    pub fn set_active(&mut self, id: Option<ObjectId>) {
        if self.active == id {
            return;
        }
        let had_selection = self.active.is_some();
        self.active = id.filter(|id| self.get(id).is_some());
        match (had_selection, self.active) {
            (false, Some(id)) => self.emit(SceneEvent::SelectionCreated(id)),
            (true, Some(id)) => self.emit(SceneEvent::SelectionUpdated(id)),
            (true, None) => self.emit(SceneEvent::SelectionCleared),
            (false, None) => {}
        }
    }

    // --- Target finding ---

    /// Scene-native target finding, honouring `skip_target_find`.
    #[must_use]
    pub fn find_target(&self, p: Point) -> Option<ObjectId> {
        if self.skip_target_find {
            return None;
        }
        hit::find_target(&self.objects, p)
    }

    /// Manual back-to-front bounding-box test over every object.
    #[must_use]
    pub fn find_containing(&self, p: Point) -> Option<ObjectId> {
        hit::find_containing(&self.objects, p)
    }

    // --- Brush and freehand ---

    #[must_use]
    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn set_brush_color(&mut self, color: &str) {
        color.clone_into(&mut self.brush.color);
    }

    /// Set the brush width, clamped to the supported range.
    pub fn set_brush_width(&mut self, width: f64) {
        self.brush.width = if width.is_finite() {
            width.clamp(MIN_BRUSH_WIDTH, MAX_BRUSH_WIDTH)
        } else {
            DEFAULT_BRUSH_WIDTH
        };
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.stroke.is_some()
    }

    /// Start a stroke. Ignored unless the scene is in drawing mode.
    pub fn begin_stroke(&mut self, p: Point) -> bool {
        if !self.options.drawing_mode {
            return false;
        }
        self.stroke = Some(vec![p]);
        true
    }

    pub fn extend_stroke(&mut self, p: Point) {
        if let Some(points) = &mut self.stroke {
            if points.last() != Some(&p) {
                points.push(p);
            }
        }
    }

    /// Finish the stroke and add it to the scene as a path object.
    pub fn finish_stroke(&mut self) -> Option<ObjectId> {
        let points = self.stroke.take()?;
        let mut path = AnnotationObject::new_path(points, &self.brush.color, self.brush.width);
        // Strokes drawn in drawing mode join the other objects as non-selectable.
        path.selectable = false;
        let id = self.add(path);
        self.emit(SceneEvent::FreehandPathCompleted(id));
        Some(id)
    }

    pub fn cancel_stroke(&mut self) {
        self.stroke = None;
    }

    // --- Documents and scale ---

    /// Snapshot the scene for persistence.
    #[must_use]
    pub fn to_document(&self, page_index: u32, scale: f64) -> SceneDocument {
        SceneDocument::new(page_index, scale, self.objects.clone())
    }

    /// Load stored objects beneath anything already on the scene.
    ///
    /// Loading raises no events: stored content is not a new edit.
    pub fn load_document(&mut self, doc: SceneDocument) {
        let mut objects = doc.objects;
        objects.retain(|o| self.get(&o.id).is_none());
        objects.append(&mut self.objects);
        self.objects = objects;
    }

    /// Multiply every object's geometry by `ratio`, keeping identities.
    pub fn rescale(&mut self, ratio: f64) {
        for obj in &mut self.objects {
            obj.rescale(ratio);
        }
        if let Some(points) = &mut self.stroke {
            for p in points.iter_mut() {
                *p = p.scaled(ratio);
            }
        }
    }

    // --- Events ---

    /// Stop recording events and drop any that are queued.
    pub fn detach_listeners(&mut self) {
        self.listening = false;
        self.events.clear();
    }

    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    fn emit(&mut self, event: SceneEvent) {
        if self.listening {
            self.events.push(event);
        }
    }
}
