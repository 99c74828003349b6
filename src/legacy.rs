//! Normalization of annotation documents written by older clients.
//!
//! Early clients persisted the scene library's own JSON: a `{"version": "5.x",
//! "objects": [...]}` envelope whose objects are identified by free-form
//! `type` strings, carry SVG-style path commands, and keep a separate
//! `scaleX`/`scaleY` transform. Those documents recorded no viewport scale, so
//! they are read as captured at 1.0. Objects of unknown kinds are dropped.

#[cfg(test)]
#[path = "legacy_test.rs"]
mod legacy_test;

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::consts::{DEFAULT_BRUSH_COLOR, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, FALLBACK_TEXT_COLOR};
use crate::doc::{AnnotationKind, AnnotationObject, Outline, PathData, SceneDocument, Shadow, TextData};
use crate::error::PersistenceError;
use crate::geom::Point;

/// Convert a legacy document envelope into a [`SceneDocument`].
pub(crate) fn normalize_document(value: &Value, page: u32) -> Result<SceneDocument, PersistenceError> {
    let Some(objects) = value.get("objects").and_then(Value::as_array) else {
        return Err(PersistenceError::Malformed("document has no objects array".into()));
    };

    let scale = num(value, "scale").filter(|s| *s > 0.0).unwrap_or(1.0);
    let page_index = match value.get("pageIndex").and_then(Value::as_u64).map(u32::try_from) {
        Some(Ok(p)) => p,
        _ => page,
    };

    let normalized = objects
        .iter()
        .filter_map(|raw| {
            let kind = raw.get("type").and_then(Value::as_str).unwrap_or("");
            let obj = match kind {
                "path" => normalize_path(raw),
                "i-text" | "itext" | "text" | "textbox" => Some(normalize_text(raw)),
                _ => None,
            };
            if obj.is_none() {
                warn!(kind, page, "skipping unsupported legacy annotation object");
            }
            obj
        })
        .collect();

    Ok(SceneDocument::new(page_index, scale, normalized))
}

fn num(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

fn string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty()).map(str::to_string)
}

fn object_id(raw: &Value) -> Uuid {
    match raw.get("id").and_then(Value::as_str).map(Uuid::parse_str) {
        Some(Ok(id)) => id,
        _ => Uuid::new_v4(),
    }
}

/// Pull every coordinate pair out of `[["M", x, y], ["Q", cx, cy, x, y], ...]`.
fn command_points(commands: &[Value]) -> Vec<Point> {
    let mut points = Vec::new();
    for cmd in commands {
        let Some(parts) = cmd.as_array() else { continue };
        let coords: Vec<f64> = parts.iter().skip(1).filter_map(Value::as_f64).collect();
        for pair in coords.chunks_exact(2) {
            points.push(Point::new(pair[0], pair[1]));
        }
    }
    points
}

fn normalize_path(raw: &Value) -> Option<AnnotationObject> {
    let points = match raw.get("path") {
        Some(Value::Array(commands)) => command_points(commands),
        _ => Vec::new(),
    };
    let first = points.first()?;
    let (min_x, min_y) = points.iter().fold((first.x, first.y), |(mx, my), p| (mx.min(p.x), my.min(p.y)));

    let scale_x = num(raw, "scaleX").unwrap_or(1.0);
    let scale_y = num(raw, "scaleY").unwrap_or(1.0);
    let stroke_width = num(raw, "strokeWidth").unwrap_or(1.0);
    let left = num(raw, "left").unwrap_or(min_x);
    let top = num(raw, "top").unwrap_or(min_y);
    let pad = stroke_width / 2.0;

    // Path commands are in the object's local space; `left`/`top` place the
    // stroke-padded box, and the scale transform applies to both.
    let placed = points
        .iter()
        .map(|p| Point::new(left + (p.x - min_x + pad) * scale_x, top + (p.y - min_y + pad) * scale_y))
        .collect();

    let data = PathData {
        points: placed,
        stroke: string(raw, "stroke").unwrap_or_else(|| DEFAULT_BRUSH_COLOR.to_string()),
        stroke_width: stroke_width * (scale_x + scale_y) / 2.0,
    };
    let mut obj = AnnotationObject::with_kind(AnnotationKind::Path(data), left, top);
    obj.id = object_id(raw);
    Some(obj)
}

fn normalize_text(raw: &Value) -> AnnotationObject {
    let scale_y = num(raw, "scaleY").unwrap_or(1.0);
    let font_size = num(raw, "fontSize").unwrap_or(DEFAULT_FONT_SIZE) * scale_y;

    let bold = match raw.get("fontWeight") {
        Some(Value::String(w)) => w == "bold" || w.parse::<u32>().is_ok_and(|n| n >= 600),
        Some(Value::Number(n)) => n.as_u64().is_some_and(|n| n >= 600),
        _ => false,
    };

    let outline = match (string(raw, "stroke"), num(raw, "strokeWidth")) {
        (Some(color), Some(width)) if width > 0.0 => Some(Outline { color, width: width * scale_y }),
        _ => None,
    };

    let shadow = raw.get("shadow").filter(|s| s.is_object()).map(|s| Shadow {
        color: string(s, "color").unwrap_or_else(|| "#000000".to_string()),
        blur: num(s, "blur").unwrap_or(0.0) * scale_y,
        offset_x: num(s, "offsetX").unwrap_or(0.0) * scale_y,
        offset_y: num(s, "offsetY").unwrap_or(0.0) * scale_y,
    });

    let data = TextData {
        text: string(raw, "text").unwrap_or_default(),
        font_size,
        font_family: string(raw, "fontFamily").unwrap_or_else(|| DEFAULT_FONT_FAMILY.to_string()),
        bold,
        italic: raw.get("fontStyle").and_then(Value::as_str) == Some("italic"),
        fill: string(raw, "fill").unwrap_or_else(|| FALLBACK_TEXT_COLOR.to_string()),
        background_color: string(raw, "backgroundColor"),
        outline,
        shadow,
    };

    let left = num(raw, "left").unwrap_or(0.0);
    let top = num(raw, "top").unwrap_or(0.0);
    let mut obj = AnnotationObject::with_kind(AnnotationKind::Text(data), left, top);
    obj.id = object_id(raw);
    obj
}
