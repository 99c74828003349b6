//! Document model: annotation objects, text styling, and the scene document.
//!
//! This module defines what lives on an annotation surface. `AnnotationObject`
//! carries the shared geometry (`left`, `top`, `width`, `height`) and a typed
//! `AnnotationKind` for the two things the engine creates: freehand paths and
//! text. `SceneDocument` is the immutable snapshot that is persisted per page,
//! tagged with the scale it was captured at so a reload can be re-aligned to
//! the current zoom.
//!
//! Documents written by older clients use a looser shape; see [`crate::legacy`].

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::{
    DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_TEXT_COLOR, FALLBACK_TEXT_COLOR, MIN_NEW_FONT_SIZE, SCALE_EPSILON,
    SCENE_DOCUMENT_VERSION, TEXT_GLYPH_ADVANCE, TEXT_HALO_BLUR, TEXT_HALO_COLOR, TEXT_HALO_OFFSET, TEXT_LINE_HEIGHT,
    TEXT_OUTLINE_COLOR, TEXT_OUTLINE_RATIO,
};
use crate::error::PersistenceError;
use crate::geom::{Bounds, Point};

/// Unique identifier for an annotation object.
pub type ObjectId = Uuid;

fn default_true() -> bool {
    true
}

/// A drawable object on the annotation surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationObject {
    pub id: ObjectId,
    /// Left edge of the bounding box in scene coordinates.
    pub left: f64,
    /// Top edge of the bounding box in scene coordinates.
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(flatten)]
    pub kind: AnnotationKind,
    /// Whether the object can be picked up by selection gestures.
    #[serde(skip, default = "default_true")]
    pub selectable: bool,
}

/// The kinds of annotation the engine creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationKind {
    Path(PathData),
    Text(TextData),
}

/// A freehand stroke as a polyline in scene coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathData {
    pub points: Vec<Point>,
    pub stroke: String,
    pub stroke_width: f64,
}

/// An outline drawn around glyphs so light text stays readable on paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shadow {
    pub color: String,
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// A typed text object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextData {
    pub text: String,
    pub font_size: f64,
    pub font_family: String,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    pub fill: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<Shadow>,
}

/// Text properties chosen in the toolbar; applied to new and selected text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f64,
    pub font_family: String,
    pub bold: bool,
    pub italic: bool,
    pub fill: String,
    /// Background colour; `None` means transparent.
    pub background_color: Option<String>,
    pub shadow: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            bold: false,
            italic: false,
            fill: DEFAULT_TEXT_COLOR.to_string(),
            background_color: None,
            shadow: false,
        }
    }
}

impl TextData {
    /// Build the data for a freshly placed text object.
    ///
    /// New text is never smaller than [`MIN_NEW_FONT_SIZE`] and never gets an
    /// invisible fill.
    #[must_use]
    pub fn from_style(text: &str, style: &TextStyle) -> Self {
        let mut data = Self {
            text: text.to_string(),
            font_size: style.font_size.max(MIN_NEW_FONT_SIZE),
            font_family: style.font_family.clone(),
            bold: style.bold,
            italic: style.italic,
            fill: normalize_color(&style.fill),
            background_color: None,
            outline: None,
            shadow: None,
        };
        data.apply_decorations(style);
        data
    }

    /// Restyle an existing text object in place.
    pub fn apply_style(&mut self, style: &TextStyle) {
        if style.font_size > 0.0 {
            self.font_size = style.font_size;
        }
        if !style.font_family.is_empty() {
            self.font_family.clone_from(&style.font_family);
        }
        self.bold = style.bold;
        self.italic = style.italic;
        self.fill = normalize_color(&style.fill);
        self.apply_decorations(style);
    }

    /// The toolbar-facing view of this text's properties.
    #[must_use]
    pub fn style(&self) -> TextStyle {
        TextStyle {
            font_size: self.font_size,
            font_family: self.font_family.clone(),
            bold: self.bold,
            italic: self.italic,
            fill: self.fill.clone(),
            background_color: self.background_color.clone(),
            shadow: self.shadow.as_ref().is_some_and(|s| s.color != TEXT_HALO_COLOR),
        }
    }

    fn apply_decorations(&mut self, style: &TextStyle) {
        self.background_color = style.background_color.clone().filter(|c| !c.trim().is_empty());
        if self.background_color.is_some() {
            // Text over a background is already legible.
            self.outline = None;
            self.shadow = style.shadow.then(|| Shadow {
                color: self.fill.clone(),
                blur: 2.0,
                offset_x: 2.0,
                offset_y: 2.0,
            });
            return;
        }
        // Bare text always gets a dark outline and halo; a requested shadow is replaced.
        self.outline = Some(Outline {
            color: TEXT_OUTLINE_COLOR.to_string(),
            width: (self.font_size * TEXT_OUTLINE_RATIO).round().max(1.0),
        });
        self.shadow = Some(Shadow {
            color: TEXT_HALO_COLOR.to_string(),
            blur: TEXT_HALO_BLUR,
            offset_x: TEXT_HALO_OFFSET,
            offset_y: TEXT_HALO_OFFSET,
        });
    }
}

impl AnnotationObject {
    /// Create a path object from captured stroke points.
    #[must_use]
    pub fn new_path(points: Vec<Point>, stroke: &str, stroke_width: f64) -> Self {
        Self::with_kind(AnnotationKind::Path(PathData { points, stroke: stroke.to_string(), stroke_width }), 0.0, 0.0)
    }

    /// Create a text object whose top-left corner sits at `at`.
    #[must_use]
    pub fn new_text(at: Point, data: TextData) -> Self {
        Self::with_kind(AnnotationKind::Text(data), at.x, at.y)
    }

    pub(crate) fn with_kind(kind: AnnotationKind, left: f64, top: f64) -> Self {
        let mut obj = Self {
            id: Uuid::new_v4(),
            left,
            top,
            width: 0.0,
            height: 0.0,
            kind,
            selectable: true,
        };
        obj.set_coords();
        obj
    }

    /// Recompute the bounding box from the object's own geometry.
    pub fn set_coords(&mut self) {
        match &self.kind {
            AnnotationKind::Path(path) => {
                if let Some(b) = Bounds::enclosing(&path.points) {
                    let b = b.inflated(path.stroke_width / 2.0);
                    self.left = b.left;
                    self.top = b.top;
                    self.width = b.width;
                    self.height = b.height;
                }
            }
            AnnotationKind::Text(text) => {
                let (w, h) = measure_text(&text.text, text.font_size);
                self.width = w;
                self.height = h;
            }
        }
    }

    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.left, self.top, self.width, self.height)
    }

    /// Multiply position, size, stroke and font metrics by `ratio`.
    pub fn rescale(&mut self, ratio: f64) {
        self.left *= ratio;
        self.top *= ratio;
        self.width *= ratio;
        self.height *= ratio;
        match &mut self.kind {
            AnnotationKind::Path(path) => {
                for p in &mut path.points {
                    *p = p.scaled(ratio);
                }
                path.stroke_width *= ratio;
            }
            AnnotationKind::Text(text) => {
                text.font_size *= ratio;
                if let Some(outline) = &mut text.outline {
                    outline.width *= ratio;
                }
                if let Some(shadow) = &mut text.shadow {
                    shadow.blur *= ratio;
                    shadow.offset_x *= ratio;
                    shadow.offset_y *= ratio;
                }
            }
        }
        self.set_coords();
    }

    /// Move the object by `(dx, dy)` scene pixels.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.left += dx;
        self.top += dy;
        if let AnnotationKind::Path(path) = &mut self.kind {
            for p in &mut path.points {
                *p = Point::new(p.x + dx, p.y + dy);
            }
        }
        self.set_coords();
    }

    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, AnnotationKind::Text(_))
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&TextData> {
        match &self.kind {
            AnnotationKind::Text(text) => Some(text),
            AnnotationKind::Path(_) => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextData> {
        match &mut self.kind {
            AnnotationKind::Text(text) => Some(text),
            AnnotationKind::Path(_) => None,
        }
    }
}

/// Approximate the box of `text` at `font_size` without font metrics.
fn measure_text(text: &str, font_size: f64) -> (f64, f64) {
    let lines: Vec<&str> = text.split('\n').collect();
    let longest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0).max(1);
    #[allow(clippy::cast_precision_loss)]
    let (cols, rows) = (longest as f64, lines.len() as f64);
    (cols * font_size * TEXT_GLYPH_ADVANCE, rows * font_size * TEXT_LINE_HEIGHT)
}

/// Replace colours that would render invisibly with the fallback text colour.
#[must_use]
pub fn normalize_color(color: &str) -> String {
    let v = color.trim().to_ascii_lowercase();
    if v.is_empty() || v == "transparent" {
        return FALLBACK_TEXT_COLOR.to_string();
    }
    if let Some(inner) = v.strip_prefix("rgba(").and_then(|s| s.strip_suffix(')')) {
        let parts: Vec<&str> = inner.split(',').collect();
        if parts.len() == 4 && parts[3].trim().parse::<f64>().is_ok_and(|a| a == 0.0) {
            return FALLBACK_TEXT_COLOR.to_string();
        }
    }
    color.trim().to_string()
}

// =============================================================================
// SCENE DOCUMENT
// =============================================================================

/// Immutable snapshot of one page's scene, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDocument {
    pub version: u32,
    /// Viewport scale the coordinates were captured at.
    pub scale: f64,
    /// 1-based page the scene belongs to.
    pub page_index: u32,
    pub objects: Vec<AnnotationObject>,
}

impl SceneDocument {
    #[must_use]
    pub fn new(page_index: u32, scale: f64, objects: Vec<AnnotationObject>) -> Self {
        Self { version: SCENE_DOCUMENT_VERSION, scale, page_index, objects }
    }

    /// Serialize to the string stored in `annotationsJson`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> Result<String, PersistenceError> {
        serde_json::to_string(self).map_err(|e| PersistenceError::Malformed(e.to_string()))
    }

    /// Parse a stored document for `page`, normalizing legacy shapes.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Malformed`] if the input is not JSON or has
    /// no recognisable object list.
    pub fn from_json(raw: &str, page: u32) -> Result<Self, PersistenceError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| PersistenceError::Malformed(e.to_string()))?;
        if value.get("version").is_some_and(serde_json::Value::is_u64) {
            if let Ok(doc) = serde_json::from_value::<Self>(value.clone()) {
                return Ok(doc);
            }
        }
        crate::legacy::normalize_document(&value, page)
    }

    /// Bring the coordinates to `scale`. Returns `false` when nothing changed,
    /// including when the document's own scale is unusable.
    pub fn reconcile_to(&mut self, scale: f64) -> bool {
        if !self.scale.is_finite() || self.scale <= 0.0 || (self.scale - scale).abs() <= SCALE_EPSILON {
            return false;
        }
        let ratio = scale / self.scale;
        for obj in &mut self.objects {
            obj.rescale(ratio);
        }
        self.scale = scale;
        true
    }

    /// Put `stored`'s objects beneath this document's, re-aligned to this
    /// document's scale. Objects already present by id are not duplicated.
    pub fn merge_beneath(&mut self, mut stored: SceneDocument) {
        stored.reconcile_to(self.scale);
        let mut objects = stored.objects;
        objects.retain(|o| !self.objects.iter().any(|own| own.id == o.id));
        objects.append(&mut self.objects);
        self.objects = objects;
    }
}
