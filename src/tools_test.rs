#![allow(clippy::float_cmp)]

use super::*;
use crate::geom::Size;

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn tools(mode: ToolMode, scene: &mut Scene) -> ToolState {
    let mut state = ToolState::new(4.0, ms(300));
    state.set_mode(mode, Some(&mut *scene));
    let flags = mode.flags();
    scene.set_options(flags.options, flags.skip_target_find);
    scene.set_objects_selectable(flags.objects_selectable);
    state
}

fn scene() -> Scene {
    Scene::new(1, Size::new(800.0, 600.0), SurfaceOptions::default())
}

fn stroke_at(y: f64) -> AnnotationObject {
    AnnotationObject::new_path(vec![pt(0.0, y), pt(200.0, y)], "#000", 4.0)
}

fn text_at(x: f64, y: f64) -> AnnotationObject {
    AnnotationObject::new_text(pt(x, y), TextData::from_style("Dolce", &TextStyle::default()))
}

fn tap(state: &mut ToolState, scene: &mut Scene, p: Point, now: Instant) -> Vec<ToolEffect> {
    let mut effects = state.pointer_down(scene, p, now);
    effects.extend(state.pointer_up(scene, p, now, &TextStyle::default()));
    effects
}

// =============================================================
// Modes
// =============================================================

#[test]
fn default_mode_is_none() {
    let state = ToolState::new(4.0, ms(300));
    assert_eq!(state.mode(), ToolMode::None);
    assert_eq!(state.gesture(), GestureState::Idle);
}

#[test]
fn toggling_active_tool_turns_it_off() {
    assert_eq!(ToolMode::Freehand.toggled(ToolMode::Freehand), ToolMode::None);
    assert_eq!(ToolMode::Freehand.toggled(ToolMode::Text), ToolMode::Text);
    assert_eq!(ToolMode::None.toggled(ToolMode::Eraser), ToolMode::Eraser);
}

#[test]
fn selectability_by_mode() {
    assert!(ToolMode::Select.flags().objects_selectable);
    assert!(ToolMode::Text.flags().objects_selectable);
    assert!(ToolMode::None.flags().objects_selectable);
    assert!(!ToolMode::Freehand.flags().objects_selectable);
    assert!(!ToolMode::Eraser.flags().objects_selectable);
    assert!(ToolMode::Freehand.flags().options.drawing_mode);
    assert!(ToolMode::Select.flags().options.selection);
    assert!(ToolMode::None.flags().inert);
    assert!(!ToolMode::Text.flags().inert);
}

#[test]
fn none_mode_ignores_pointer() {
    let mut s = scene();
    let mut t = tools(ToolMode::None, &mut s);
    assert!(tap(&mut t, &mut s, pt(10.0, 10.0), Instant::now()).is_empty());
    assert!(s.is_empty());
}

// =============================================================
// Freehand
// =============================================================

#[test]
fn freehand_draws_one_path_per_gesture() {
    let mut s = scene();
    let mut t = tools(ToolMode::Freehand, &mut s);
    let now = Instant::now();
    t.pointer_down(&mut s, pt(10.0, 10.0), now);
    assert_eq!(t.gesture(), GestureState::Drawing);
    t.pointer_move(&mut s, pt(20.0, 20.0));
    let effects = t.pointer_up(&mut s, pt(30.0, 25.0), now, &TextStyle::default());

    assert_eq!(s.len(), 1);
    assert_eq!(effects, vec![ToolEffect::StrokeCompleted(s.objects()[0].id)]);
    assert_eq!(t.gesture(), GestureState::Idle);
}

#[test]
fn freehand_draws_over_existing_objects() {
    let mut s = scene();
    s.add(text_at(0.0, 0.0));
    let mut t = tools(ToolMode::Freehand, &mut s);
    t.pointer_down(&mut s, pt(5.0, 5.0), Instant::now());
    t.pointer_move(&mut s, pt(50.0, 5.0));
    t.pointer_up(&mut s, pt(60.0, 5.0), Instant::now(), &TextStyle::default());
    assert_eq!(s.len(), 2);
    assert_eq!(s.objects()[0].left, 0.0);
    assert!(s.active().is_none());
}

// =============================================================
// Eraser
// =============================================================

#[test]
fn eraser_removes_only_the_object_hit() {
    let mut s = scene();
    let keep = s.add(stroke_at(10.0));
    let gone = s.add(stroke_at(100.0));
    let mut t = tools(ToolMode::Eraser, &mut s);

    let effects = t.pointer_down(&mut s, pt(50.0, 100.0), Instant::now());
    assert_eq!(effects, vec![ToolEffect::Erased(gone)]);
    assert_eq!(s.len(), 1);
    assert!(s.get(&keep).is_some());
}

#[test]
fn eraser_miss_is_noop() {
    let mut s = scene();
    s.add(stroke_at(10.0));
    let mut t = tools(ToolMode::Eraser, &mut s);
    assert!(t.pointer_down(&mut s, pt(50.0, 400.0), Instant::now()).is_empty());
    assert_eq!(s.len(), 1);
}

#[test]
fn eraser_takes_topmost() {
    let mut s = scene();
    let below = s.add(text_at(0.0, 0.0));
    let above = s.add(text_at(0.0, 0.0));
    let mut t = tools(ToolMode::Eraser, &mut s);
    t.pointer_down(&mut s, pt(5.0, 5.0), Instant::now());
    assert!(s.get(&above).is_none());
    assert!(s.get(&below).is_some());
}

#[test]
fn eraser_falls_back_to_bounding_box() {
    let mut s = scene();
    let diagonal = s.add(AnnotationObject::new_path(vec![pt(0.0, 0.0), pt(100.0, 100.0)], "#000", 2.0));
    let mut t = tools(ToolMode::Eraser, &mut s);
    // Off the line but inside the box.
    let effects = t.pointer_down(&mut s, pt(90.0, 10.0), Instant::now());
    assert_eq!(effects, vec![ToolEffect::Erased(diagonal)]);
}

// =============================================================
// Text: creation and provisional lifecycle
// =============================================================

#[test]
fn tap_on_empty_canvas_creates_text_with_style() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    let style = TextStyle { font_size: 24.0, bold: true, fill: "#0000FF".into(), ..TextStyle::default() };

    let now = Instant::now();
    t.pointer_down(&mut s, pt(120.0, 80.0), now);
    let effects = t.pointer_up(&mut s, pt(120.0, 80.0), now, &style);

    assert_eq!(s.len(), 1);
    let obj = &s.objects()[0];
    assert_eq!((obj.left, obj.top), (120.0, 80.0));
    let text = obj.as_text().unwrap();
    assert_eq!(text.text, TEXT_PLACEHOLDER);
    assert_eq!(text.font_size, 24.0);
    assert!(text.bold);
    assert_eq!(text.fill, "#0000FF");
    assert_eq!(effects, vec![ToolEffect::FocusTextCaret(obj.id)]);
    assert_eq!(t.editing(), Some(&TextEdit { id: obj.id, provisional: true }));
    assert_eq!(s.active(), Some(obj.id));
}

#[test]
fn provisional_text_left_as_placeholder_is_discarded() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    tap(&mut t, &mut s, pt(50.0, 50.0), Instant::now());
    let id = t.editing().unwrap().id;

    let effect = t.exit_edit(&mut s);
    assert_eq!(effect, Some(ToolEffect::EditEnded { id, discarded: true }));
    assert!(s.is_empty());
}

#[test]
fn provisional_text_emptied_is_discarded() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    tap(&mut t, &mut s, pt(50.0, 50.0), Instant::now());
    t.set_text(&mut s, "   ");
    t.exit_edit(&mut s);
    assert!(s.is_empty());
}

#[test]
fn committed_text_survives_exit() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    tap(&mut t, &mut s, pt(50.0, 50.0), Instant::now());
    assert!(t.set_text(&mut s, "cresc."));
    let id = t.editing().unwrap().id;
    assert_eq!(t.exit_edit(&mut s), Some(ToolEffect::EditEnded { id, discarded: false }));
    assert_eq!(s.get(&id).unwrap().as_text().unwrap().text, "cresc.");
}

#[test]
fn tap_elsewhere_while_editing_only_ends_edit() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    let now = Instant::now();
    tap(&mut t, &mut s, pt(50.0, 50.0), now);
    t.set_text(&mut s, "rit.");

    let effects = tap(&mut t, &mut s, pt(400.0, 400.0), now + ms(1000));
    assert!(matches!(effects.as_slice(), [ToolEffect::EditEnded { discarded: false, .. }]));
    assert_eq!(s.len(), 1);
    assert!(t.editing().is_none());
    assert_eq!(t.gesture(), GestureState::Idle);
}

#[test]
fn set_text_without_edit_is_rejected() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    assert!(!t.set_text(&mut s, "x"));
}

// =============================================================
// Text: drag threshold and double tap
// =============================================================

#[test]
fn drag_beyond_threshold_creates_nothing() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    let now = Instant::now();
    t.pointer_down(&mut s, pt(50.0, 50.0), now);
    t.pointer_move(&mut s, pt(60.0, 50.0));
    assert_eq!(t.gesture(), GestureState::Panning);
    assert!(t.pointer_up(&mut s, pt(60.0, 50.0), now, &TextStyle::default()).is_empty());
    assert!(s.is_empty());
    assert_eq!(t.gesture(), GestureState::Idle);
}

#[test]
fn jitter_within_threshold_is_still_a_tap() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    let now = Instant::now();
    t.pointer_down(&mut s, pt(50.0, 50.0), now);
    t.pointer_move(&mut s, pt(52.0, 51.0));
    t.pointer_up(&mut s, pt(52.0, 51.0), now, &TextStyle::default());
    assert_eq!(s.len(), 1);
}

#[test]
fn release_far_away_without_moves_is_not_a_tap() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    let now = Instant::now();
    t.pointer_down(&mut s, pt(50.0, 50.0), now);
    t.pointer_up(&mut s, pt(90.0, 50.0), now, &TextStyle::default());
    assert!(s.is_empty());
}

#[test]
fn single_tap_on_text_selects_it() {
    let mut s = scene();
    let id = s.add(text_at(100.0, 100.0));
    let mut t = tools(ToolMode::Text, &mut s);
    let effects = tap(&mut t, &mut s, pt(105.0, 105.0), Instant::now());
    assert!(effects.is_empty());
    assert_eq!(s.active(), Some(id));
    assert!(t.editing().is_none());
    assert_eq!(s.len(), 1);
}

#[test]
fn double_tap_on_text_enters_edit() {
    let mut s = scene();
    let id = s.add(text_at(100.0, 100.0));
    let mut t = tools(ToolMode::Text, &mut s);
    let now = Instant::now();
    tap(&mut t, &mut s, pt(105.0, 105.0), now);
    let effects = tap(&mut t, &mut s, pt(106.0, 105.0), now + ms(200));
    assert_eq!(effects, vec![ToolEffect::FocusTextCaret(id)]);
    assert_eq!(t.editing(), Some(&TextEdit { id, provisional: false }));
}

#[test]
fn slow_second_tap_only_reselects() {
    let mut s = scene();
    s.add(text_at(100.0, 100.0));
    let mut t = tools(ToolMode::Text, &mut s);
    let now = Instant::now();
    tap(&mut t, &mut s, pt(105.0, 105.0), now);
    let effects = tap(&mut t, &mut s, pt(105.0, 105.0), now + ms(500));
    assert!(effects.is_empty());
    assert!(t.editing().is_none());
    assert!(t.pending_tap().is_some());
}

#[test]
fn double_tap_on_different_objects_does_not_edit() {
    let mut s = scene();
    s.add(text_at(100.0, 100.0));
    let b = s.add(text_at(300.0, 300.0));
    let mut t = tools(ToolMode::Text, &mut s);
    let now = Instant::now();
    tap(&mut t, &mut s, pt(105.0, 105.0), now);
    tap(&mut t, &mut s, pt(305.0, 305.0), now + ms(100));
    assert!(t.editing().is_none());
    assert_eq!(s.active(), Some(b));
}

#[test]
fn edited_existing_text_emptied_is_discarded() {
    let mut s = scene();
    s.add(text_at(100.0, 100.0));
    let mut t = tools(ToolMode::Text, &mut s);
    let now = Instant::now();
    tap(&mut t, &mut s, pt(105.0, 105.0), now);
    tap(&mut t, &mut s, pt(105.0, 105.0), now + ms(100));
    t.set_text(&mut s, "");
    t.exit_edit(&mut s);
    assert!(s.is_empty());
}

// =============================================================
// Select
// =============================================================

#[test]
fn select_click_selects_and_empty_click_clears() {
    let mut s = scene();
    let id = s.add(text_at(100.0, 100.0));
    let mut t = tools(ToolMode::Select, &mut s);
    tap(&mut t, &mut s, pt(105.0, 105.0), Instant::now());
    assert_eq!(s.active(), Some(id));
    tap(&mut t, &mut s, pt(500.0, 500.0), Instant::now());
    assert!(s.active().is_none());
}

#[test]
fn select_drag_moves_object() {
    let mut s = scene();
    let id = s.add(text_at(100.0, 100.0));
    let mut t = tools(ToolMode::Select, &mut s);
    let now = Instant::now();
    t.pointer_down(&mut s, pt(105.0, 105.0), now);
    t.pointer_move(&mut s, pt(125.0, 115.0));
    t.pointer_move(&mut s, pt(135.0, 125.0));
    t.pointer_up(&mut s, pt(135.0, 125.0), now, &TextStyle::default());

    let obj = s.get(&id).unwrap();
    assert_eq!((obj.left, obj.top), (130.0, 120.0));
    assert_eq!(t.gesture(), GestureState::Idle);
}

#[test]
fn drag_continues_smoothly_after_zoom() {
    let mut s = scene();
    let id = s.add(text_at(100.0, 100.0));
    let mut t = tools(ToolMode::Select, &mut s);
    t.pointer_down(&mut s, pt(105.0, 105.0), Instant::now());
    t.pointer_move(&mut s, pt(125.0, 115.0));

    s.rescale(2.0);
    t.rescale(2.0);
    assert!(matches!(t.gesture(), GestureState::DraggingObject { last, .. } if last == pt(250.0, 230.0)));

    t.pointer_move(&mut s, pt(260.0, 230.0));
    let obj = s.get(&id).unwrap();
    assert_eq!((obj.left, obj.top), (250.0, 220.0));
}

#[test]
fn rescale_moves_pressed_origin() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    t.pointer_down(&mut s, pt(50.0, 50.0), Instant::now());
    t.rescale(1.5);
    assert!(matches!(t.gesture(), GestureState::Pressed { origin, .. } if origin == pt(75.0, 75.0)));
}

#[test]
fn select_drag_on_empty_space_pans() {
    let mut s = scene();
    s.add(text_at(100.0, 100.0));
    let mut t = tools(ToolMode::Select, &mut s);
    t.pointer_down(&mut s, pt(500.0, 500.0), Instant::now());
    t.pointer_move(&mut s, pt(520.0, 500.0));
    assert_eq!(t.gesture(), GestureState::Panning);
}

// =============================================================
// Cancellation
// =============================================================

#[test]
fn mode_switch_cancels_stroke_in_progress() {
    let mut s = scene();
    let mut t = tools(ToolMode::Freehand, &mut s);
    t.pointer_down(&mut s, pt(0.0, 0.0), Instant::now());
    t.pointer_move(&mut s, pt(10.0, 10.0));
    t.set_mode(ToolMode::Select, Some(&mut s));
    assert_eq!(t.gesture(), GestureState::Idle);
    assert!(!s.is_drawing());
    t.pointer_up(&mut s, pt(20.0, 20.0), Instant::now(), &TextStyle::default());
    assert!(s.is_empty());
}

#[test]
fn mode_switch_clears_double_tap_window() {
    let mut s = scene();
    s.add(text_at(100.0, 100.0));
    let mut t = tools(ToolMode::Text, &mut s);
    let now = Instant::now();
    tap(&mut t, &mut s, pt(105.0, 105.0), now);
    t.set_mode(ToolMode::Select, Some(&mut s));
    t.set_mode(ToolMode::Text, Some(&mut s));
    tap(&mut t, &mut s, pt(105.0, 105.0), now + ms(100));
    assert!(t.editing().is_none());
}

#[test]
fn mode_switch_ends_provisional_edit() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    tap(&mut t, &mut s, pt(50.0, 50.0), Instant::now());
    let effects = t.set_mode(ToolMode::Freehand, Some(&mut s));
    assert!(matches!(effects.as_slice(), [ToolEffect::EditEnded { discarded: true, .. }]));
    assert!(s.is_empty());
    assert_eq!(t.mode(), ToolMode::Freehand);
}

#[test]
fn cancel_without_scene_forgets_edit() {
    let mut s = scene();
    let mut t = tools(ToolMode::Text, &mut s);
    tap(&mut t, &mut s, pt(50.0, 50.0), Instant::now());
    assert!(t.cancel(None).is_empty());
    assert!(t.editing().is_none());
    assert_eq!(t.mode(), ToolMode::Text);
}
