use sketch_layers::{Canvas, ComponentKind, DrawingEngine, TouchEvent};
use egui::{Pos2, pos2, vec2};

fn create_engine() -> DrawingEngine {
    DrawingEngine::new(Canvas::new(vec2(800.0, 600.0), 1.0))
}

fn stroke(engine: &mut DrawingEngine, from: Pos2, to: Pos2) {
    engine.on_touch(&TouchEvent::pressed(from));
    engine.on_touch(&TouchEvent::moved(to));
    engine.on_touch(&TouchEvent::released(to));
}

// Press on a component in selector mode, drag it and let go
fn drag(engine: &mut DrawingEngine, from: Pos2, to: Pos2) {
    engine.on_touch(&TouchEvent::pressed(from));
    engine.on_touch(&TouchEvent::moved(to));
    engine.on_touch(&TouchEvent::released(to));
}

fn add_text(engine: &mut DrawingEngine, text: &str) {
    engine.add_component(ComponentKind::Text, None);
    engine.set_text_entry(text);
}

#[test]
fn test_ink_stroke_is_committed_and_selectable() {
    let mut engine = create_engine();
    engine.add_component(ComponentKind::Ink, None);
    stroke(&mut engine, pos2(10.0, 10.0), pos2(60.0, 10.0));

    // The finished stroke is committed and a fresh ink layer takes over
    assert_eq!(engine.components().len(), 1);
    let ink = &engine.components()[0];
    assert_eq!(ink.kind(), ComponentKind::Ink);
    assert_eq!(ink.as_ink().unwrap().paths().len(), 1);
    assert!(ink.contains(pos2(15.0, 10.0)));
    assert!(!ink.contains(pos2(15.0, 30.0)));
    assert_eq!(engine.active_component_kind(), Some(ComponentKind::Ink));
    assert_eq!(engine.selected_component().map(|c| c.id()), Some(ink.id()));

    // Tapping the stroke in selector mode selects an edit copy of it
    engine.set_selector_mode();
    engine.on_touch(&TouchEvent::pressed(pos2(30.0, 12.0)));
    let selected = engine.selected_component().unwrap();
    assert_eq!(selected.previous_version(), Some(engine.components()[0].id()));
    assert!(!engine.components()[0].is_visible());
}

#[test]
fn test_tap_on_empty_canvas_selects_nothing() {
    let mut engine = create_engine();
    add_text(&mut engine, "hello");
    engine.set_selector_mode();

    engine.on_touch(&TouchEvent::pressed(pos2(700.0, 500.0)));
    engine.on_touch(&TouchEvent::released(pos2(700.0, 500.0)));
    assert!(engine.selected_component().is_none());
    assert_eq!(engine.components().len(), 1);
    assert!(engine.components()[0].is_visible());
}

#[test]
fn test_selection_without_changes_is_rolled_back() {
    let mut engine = create_engine();
    engine.add_component(ComponentKind::Ink, None);
    stroke(&mut engine, pos2(10.0, 10.0), pos2(60.0, 10.0));
    engine.set_selector_mode();
    let original = engine.components()[0].id();

    // Tap without moving
    engine.on_touch(&TouchEvent::pressed(pos2(30.0, 10.0)));
    engine.on_touch(&TouchEvent::released(pos2(30.0, 10.0)));
    assert_eq!(engine.components().len(), 2);

    engine.set_selector_mode();
    assert_eq!(engine.components().len(), 1);
    assert_eq!(engine.components()[0].id(), original);
    assert!(engine.components()[0].is_visible());
    assert_eq!(engine.components()[0].previous_version(), None);
}

#[test]
fn test_moved_selection_replaces_original() {
    let mut engine = create_engine();
    engine.add_component(ComponentKind::Ink, None);
    stroke(&mut engine, pos2(10.0, 10.0), pos2(60.0, 10.0));
    engine.set_selector_mode();
    let original = engine.components()[0].id();

    drag(&mut engine, pos2(30.0, 10.0), pos2(30.0, 40.0));
    engine.set_selector_mode();

    assert_eq!(engine.components().len(), 2);
    assert!(!engine.component(original).unwrap().is_visible());
    let version = &engine.components()[1];
    assert!(version.is_visible());
    assert_eq!(version.previous_version(), Some(original));
    assert_eq!(version.y(), engine.component(original).unwrap().y() + 30.0);
    assert_eq!(version.as_ink().unwrap().paths()[0][0], pos2(10.0, 40.0));
}

#[test]
fn test_delete_removes_whole_version_chain() {
    let mut engine = create_engine();
    engine.add_component(ComponentKind::Ink, None);
    stroke(&mut engine, pos2(10.0, 10.0), pos2(60.0, 10.0));
    engine.set_selector_mode();

    drag(&mut engine, pos2(30.0, 10.0), pos2(30.0, 40.0));
    drag(&mut engine, pos2(30.0, 40.0), pos2(30.0, 80.0));
    assert_eq!(engine.components().len(), 3);

    assert!(engine.delete_component());
    assert!(engine.components().is_empty());
    assert!(engine.is_selector_mode());
    assert!(engine.is_dirty());
}

#[test]
fn test_delete_only_touches_selected_chain() {
    let mut engine = create_engine();
    add_text(&mut engine, "keep");
    engine.add_component(ComponentKind::Ink, None);
    stroke(&mut engine, pos2(300.0, 300.0), pos2(350.0, 300.0));
    engine.set_selector_mode();
    assert_eq!(engine.components().len(), 2);

    engine.on_touch(&TouchEvent::pressed(pos2(320.0, 300.0)));
    assert!(engine.delete_component());
    assert_eq!(engine.components().len(), 1);
    assert_eq!(engine.components()[0].kind(), ComponentKind::Text);
}

#[test]
fn test_bring_to_front_exceeds_all_other_orders() {
    let mut engine = create_engine();
    add_text(&mut engine, "a");
    add_text(&mut engine, "b");
    add_text(&mut engine, "c");
    engine.set_selector_mode();
    let first = engine.components()[0].id();

    let version = engine.create_new_version_of_component(first).unwrap();
    engine.bring_to_front();
    engine.set_selector_mode();

    let front = engine.component(version).unwrap();
    assert_eq!(front.display_order(), 4);
    assert!(engine.components().iter().filter(|c| c.id() != version).all(|c| c.display_order() < 4));
}

#[test]
fn test_send_to_back_shifts_others_up() {
    let mut engine = create_engine();
    add_text(&mut engine, "a");
    add_text(&mut engine, "b");
    add_text(&mut engine, "c");

    // The text being edited is committed and sent to the back
    engine.send_to_back();
    assert!(engine.is_selector_mode());

    let orders: Vec<u32> = engine.components().iter().map(|c| c.display_order()).collect();
    assert_eq!(orders, vec![2, 3, 1]);
    assert_eq!(engine.selected_component().map(|c| c.display_order()), Some(1));
}

#[test]
fn test_send_to_back_at_back_is_noop() {
    let mut engine = create_engine();
    add_text(&mut engine, "only");
    engine.send_to_back();
    assert_eq!(engine.components()[0].display_order(), 1);
}

#[test]
fn test_scale_gesture_keeps_minimum_size() {
    let mut engine = create_engine();
    add_text(&mut engine, "x");
    engine.set_selector_mode();
    let original = engine.components()[0].clone();

    // Select, then drag the scale handle far up and left
    let center = original.bounding_box().center();
    engine.on_touch(&TouchEvent::pressed(center));
    engine.on_touch(&TouchEvent::released(center));
    let handle = engine.selected_component().unwrap().scale_box().center();
    drag(&mut engine, handle, pos2(1.0, 1.0));

    let scaled = engine.selected_component().unwrap();
    assert!(scaled.width() >= 50.0);
    assert!(scaled.height() >= 50.0);
}

#[test]
fn test_delete_last_component_undoes_additions() {
    let mut engine = create_engine();
    add_text(&mut engine, "one");
    add_text(&mut engine, "two");
    engine.delete_last_component();

    assert_eq!(engine.components().len(), 1);
    assert_eq!(engine.components()[0].as_text().unwrap().text(), "one");
    assert!(engine.is_selector_mode());

    engine.delete_last_component();
    engine.delete_last_component();
    assert!(engine.components().is_empty());
}
