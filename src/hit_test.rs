use super::*;
use crate::doc::{TextData, TextStyle};

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn horizontal_stroke() -> AnnotationObject {
    AnnotationObject::new_path(vec![pt(0.0, 50.0), pt(100.0, 50.0)], "#000", 4.0)
}

fn text_at(x: f64, y: f64) -> AnnotationObject {
    AnnotationObject::new_text(pt(x, y), TextData::from_style("Text", &TextStyle::default()))
}

// =============================================================
// hits_object
// =============================================================

#[test]
fn stroke_hit_on_the_line() {
    assert!(hits_object(&horizontal_stroke(), pt(50.0, 50.0)));
}

#[test]
fn stroke_hit_within_width_and_slop() {
    assert!(hits_object(&horizontal_stroke(), pt(50.0, 54.5)));
}

#[test]
fn stroke_miss_outside_reach() {
    assert!(!hits_object(&horizontal_stroke(), pt(50.0, 60.0)));
}

#[test]
fn stroke_inside_bbox_but_off_line_misses_precisely() {
    let diagonal = AnnotationObject::new_path(vec![pt(0.0, 0.0), pt(100.0, 100.0)], "#000", 2.0);
    assert!(contains_point(&diagonal, pt(90.0, 10.0)));
    assert!(!hits_object(&diagonal, pt(90.0, 10.0)));
}

#[test]
fn single_point_stroke_is_a_dot() {
    let dot = AnnotationObject::new_path(vec![pt(10.0, 10.0)], "#000", 6.0);
    assert!(hits_object(&dot, pt(12.0, 12.0)));
    assert!(!hits_object(&dot, pt(30.0, 30.0)));
}

#[test]
fn text_hit_inside_box() {
    let text = text_at(10.0, 10.0);
    assert!(hits_object(&text, pt(12.0, 12.0)));
    assert!(!hits_object(&text, pt(5.0, 5.0)));
}

// =============================================================
// find_target / find_containing
// =============================================================

#[test]
fn find_target_prefers_topmost() {
    let below = text_at(0.0, 0.0);
    let above = text_at(0.0, 0.0);
    let above_id = above.id;
    assert_eq!(find_target(&[below, above], pt(5.0, 5.0)), Some(above_id));
}

#[test]
fn find_containing_ignores_flags() {
    let mut obj = text_at(0.0, 0.0);
    obj.selectable = false;
    let id = obj.id;
    assert_eq!(find_containing(&[obj], pt(5.0, 5.0)), Some(id));
}

#[test]
fn find_target_on_empty_space_is_none() {
    assert_eq!(find_target(&[horizontal_stroke()], pt(500.0, 500.0)), None);
}
