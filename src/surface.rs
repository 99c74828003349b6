//! Annotation surface manager: exactly one live scene, bound to the frame.
//!
//! A page or layout change disposes the current scene (listeners detached
//! first) and builds a new one sized to the new frame. A zoom on the same page
//! rescales the existing scene in place so object identity, and with it any
//! selection or text edit, survives. After each input the engine calls
//! [`SurfaceManager::flush_events`], which turns mutation events into an
//! immutable [`SceneDocument`] snapshot tagged with the scene's page.

#[cfg(test)]
#[path = "surface_test.rs"]
mod surface_test;

use tracing::{debug, info};

use crate::consts::SCALE_EPSILON;
use crate::doc::SceneDocument;
use crate::geom::Size;
use crate::scene::{Scene, SceneEvent, SceneId, SurfaceOptions};

/// How the live scene should treat pointer input for the active tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionFlags {
    pub options: SurfaceOptions,
    pub objects_selectable: bool,
    pub skip_target_find: bool,
    /// Pointer events pass through to the page underneath.
    pub inert: bool,
}

impl Default for InteractionFlags {
    fn default() -> Self {
        Self {
            options: SurfaceOptions::default(),
            objects_selectable: true,
            skip_target_find: false,
            inert: true,
        }
    }
}

/// What the scene reported since the last flush.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceEvents {
    /// Snapshot to persist, present when any object was added, modified or removed.
    pub snapshot: Option<SceneDocument>,
    pub selection_changed: bool,
    pub events: Vec<SceneEvent>,
}

#[derive(Default)]
pub struct SurfaceManager {
    scene: Option<Scene>,
    last_id: SceneId,
    page_index: u32,
    scale: f64,
    flags: InteractionFlags,
}

impl SurfaceManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// Page the live scene belongs to (the left page of a spread).
    #[must_use]
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Viewport scale the scene's coordinates are expressed in.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    #[must_use]
    pub fn flags(&self) -> InteractionFlags {
        self.flags
    }

    /// Replace the live scene with a fresh one for `page`.
    ///
    /// The previous scene's listeners are detached before it is dropped, so
    /// nothing it does on the way out can reach the new page. A `stored`
    /// document captured at a different scale is multiplied by
    /// `scale / stored.scale` before it is loaded.
    pub fn on_page_change(&mut self, page: u32, scale: f64, frame: Size, stored: Option<SceneDocument>) -> SceneId {
        self.dispose();
        self.last_id += 1;
        let mut scene = Scene::new(self.last_id, frame, self.flags.options);
        scene.set_options(self.flags.options, self.flags.skip_target_find);

        if let Some(mut doc) = stored {
            reconcile(&mut doc, scale);
            scene.load_document(doc);
        }
        scene.set_objects_selectable(self.flags.objects_selectable);

        info!(scene = self.last_id, page, scale, objects = scene.len(), "surface: scene rebuilt");
        self.scene = Some(scene);
        self.page_index = page;
        self.scale = scale;
        self.last_id
    }

    /// Rescale the live scene in place for a zoom on the same page.
    pub fn on_scale_change(&mut self, scale: f64, frame: Size) {
        let Some(scene) = &mut self.scene else {
            self.scale = scale;
            return;
        };
        if self.scale > 0.0 && (scale - self.scale).abs() > SCALE_EPSILON {
            let ratio = scale / self.scale;
            scene.rescale(ratio);
            debug!(scene = scene.id(), ratio, "surface: scene rescaled");
        }
        scene.set_dimensions(frame);
        self.scale = scale;
    }

    /// Keep the scene exactly the size of the base bitmap.
    pub fn resize(&mut self, frame: Size) {
        if let Some(scene) = &mut self.scene {
            scene.set_dimensions(frame);
        }
    }

    /// Load a stored document into the live scene after it arrived late.
    ///
    /// Ignored if the scene has since moved to another page.
    pub fn merge_stored(&mut self, page: u32, mut doc: SceneDocument) -> bool {
        if page != self.page_index {
            return false;
        }
        let Some(scene) = &mut self.scene else {
            return false;
        };
        reconcile(&mut doc, self.scale);
        scene.load_document(doc);
        scene.set_objects_selectable(self.flags.objects_selectable);
        true
    }

    /// Apply the active tool's interaction flags to the live scene and to
    /// every scene built after this call.
    pub fn apply_flags(&mut self, flags: InteractionFlags) {
        self.flags = flags;
        if let Some(scene) = &mut self.scene {
            scene.set_options(flags.options, flags.skip_target_find);
            scene.set_objects_selectable(flags.objects_selectable);
        }
    }

    /// Immutable snapshot of the live scene.
    #[must_use]
    pub fn snapshot(&self) -> Option<SceneDocument> {
        self.scene.as_ref().map(|s| s.to_document(self.page_index, self.scale))
    }

    /// Drain scene events, snapshotting once if any of them mutated content.
    pub fn flush_events(&mut self) -> SurfaceEvents {
        let Some(scene) = &mut self.scene else {
            return SurfaceEvents::default();
        };
        let events = scene.drain_events();
        let mutated = events.iter().any(|e| e.is_mutation());
        let selection_changed = events.iter().any(|e| e.is_selection());
        let snapshot = mutated.then(|| scene.to_document(self.page_index, self.scale));
        SurfaceEvents { snapshot, selection_changed, events }
    }

    /// Detach and drop the live scene.
    pub fn dispose(&mut self) {
        if let Some(mut scene) = self.scene.take() {
            scene.detach_listeners();
            debug!(scene = scene.id(), page = self.page_index, "surface: scene disposed");
        }
    }
}

fn reconcile(doc: &mut SceneDocument, scale: f64) {
    let from = doc.scale;
    if doc.reconcile_to(scale) {
        debug!(page = doc.page_index, from, to = scale, "surface: stored document reconciled");
    }
}
