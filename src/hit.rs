#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::consts::STROKE_HIT_SLOP_PX;
use crate::doc::{AnnotationKind, AnnotationObject, ObjectId};
use crate::geom::Point;

/// Precise hit test: near the stroke for paths, inside the box for text.
#[must_use]
pub fn hits_object(obj: &AnnotationObject, p: Point) -> bool {
    match &obj.kind {
        AnnotationKind::Path(path) => {
            let reach = path.stroke_width / 2.0 + STROKE_HIT_SLOP_PX;
            match path.points.as_slice() {
                [] => false,
                [only] => only.distance(p) <= reach,
                points => points.windows(2).any(|w| p.distance_to_segment(w[0], w[1]) <= reach),
            }
        }
        AnnotationKind::Text(_) => obj.bounds().contains(p),
    }
}

/// Coarse hit test against the bounding box, whatever the object kind.
#[must_use]
pub fn contains_point(obj: &AnnotationObject, p: Point) -> bool {
    obj.bounds().contains(p)
}

/// Topmost object precisely under `p`. Objects are ordered back-to-front.
#[must_use]
pub fn find_target(objects: &[AnnotationObject], p: Point) -> Option<ObjectId> {
    objects.iter().rev().find(|o| hits_object(o, p)).map(|o| o.id)
}

/// Topmost object whose bounding box contains `p`, ignoring interaction flags.
#[must_use]
pub fn find_containing(objects: &[AnnotationObject], p: Point) -> Option<ObjectId> {
    objects.iter().rev().find(|o| contains_point(o, p)).map(|o| o.id)
}
