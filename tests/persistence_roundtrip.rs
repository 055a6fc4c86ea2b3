use std::io::Cursor;

use egui::{Color32, pos2, vec2};
use futures::executor::block_on;
use image::{ImageFormat, Rgba, RgbaImage};
use sketch_layers::{Canvas, ComponentKind, DrawingDocument, DrawingEngine, TouchEvent};

fn create_engine() -> DrawingEngine {
    DrawingEngine::new(Canvas::new(vec2(800.0, 600.0), 1.0))
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([20, 120, 220, 255]));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    bytes
}

// One of each kind: a stroke, a line of text and a 200x100 picture shrunk to half size
fn create_mixed_drawing() -> DrawingEngine {
    let mut engine = create_engine();

    engine.add_component(ComponentKind::Ink, None);
    engine.set_active_color(Color32::RED);
    engine.on_touch(&TouchEvent::pressed(pos2(100.0, 300.0)));
    engine.on_touch(&TouchEvent::moved(pos2(150.0, 320.0)));
    engine.on_touch(&TouchEvent::moved(pos2(200.0, 300.0)));
    engine.on_touch(&TouchEvent::released(pos2(200.0, 300.0)));

    engine.add_component(ComponentKind::Text, None);
    engine.set_text_entry("Look here");

    engine.add_component(ComponentKind::Image, None);
    let png = png_bytes(200, 100);
    assert!(block_on(engine.set_image_stream(&png[..])));
    engine.set_location(10.0, 10.0, None, Some(50.0));

    engine.set_selector_mode();
    engine
}

#[test]
fn test_mixed_drawing_survives_save_and_load() {
    let mut engine = create_mixed_drawing();
    assert_eq!(engine.components().len(), 3);
    assert!(engine.is_dirty());

    let mut saved = Vec::new();
    assert!(engine.save_content(&mut saved));
    assert!(!engine.is_dirty());

    let mut restored = create_engine();
    assert!(restored.load_content(&saved[..]));
    assert!(restored.is_selector_mode());

    let kinds: Vec<ComponentKind> = restored.components().iter().map(|c| c.kind()).collect();
    assert_eq!(kinds, vec![ComponentKind::Ink, ComponentKind::Text, ComponentKind::Image]);

    for (before, after) in engine.components().iter().zip(restored.components()) {
        assert_eq!(before.id(), after.id());
        assert_eq!(before.display_order(), after.display_order());
        assert_eq!(before.bounding_box(), after.bounding_box());
        assert_eq!(before.color(), after.color());
        assert_eq!(before.stroke_width(), after.stroke_width());
        assert_eq!(before.is_visible(), after.is_visible());
    }

    let ink = restored.components()[0].as_ink().unwrap();
    assert_eq!(ink.paths()[0], vec![pos2(100.0, 300.0), pos2(150.0, 320.0), pos2(200.0, 300.0)]);
    assert_eq!(restored.components()[0].color(), Color32::RED);

    let text = restored.components()[1].as_text().unwrap();
    let original_text = engine.components()[1].as_text().unwrap();
    assert_eq!(text.text(), "Look here");
    assert_eq!(text.font_family(), original_text.font_family());
    assert_eq!(text.text_size(), original_text.text_size());

    let image = restored.components()[2].as_image().unwrap();
    let original_image = engine.components()[2].as_image().unwrap();
    assert!(!image.base64_image_data().is_empty());
    assert_eq!(image.base64_image_data(), original_image.base64_image_data());
    assert_eq!(image.lock_aspect_ratio(), original_image.lock_aspect_ratio());
    assert_eq!(image.bitmap_size(), Some((200, 100)));
    assert_eq!(restored.components()[2].width(), 100.0);
    assert_eq!(restored.components()[2].height(), 50.0);
}

#[test]
fn test_hidden_versions_are_saved() {
    let mut engine = create_engine();
    engine.add_component(ComponentKind::Text, None);
    engine.set_text_entry("draft");
    engine.set_selector_mode();
    let original = engine.components()[0].id();

    engine.create_new_version_of_component(original);
    engine.set_text_entry("final");
    engine.set_selector_mode();

    let json = serde_json::to_string(&engine.document()).unwrap();
    let document = DrawingDocument::from_json(&json).unwrap();
    assert_eq!(document.components.len(), 2);
    assert!(!document.components[0].is_visible());
    assert_eq!(document.components[1].previous_version(), Some(original));
}

#[test]
fn test_loading_bare_component_list() {
    let engine = create_mixed_drawing();
    let json = serde_json::to_string(engine.components()).unwrap();

    let mut restored = create_engine();
    assert!(restored.load_content(json.as_bytes()));
    assert_eq!(restored.components().len(), 3);
}

#[test]
fn test_ink_paths_are_stored_as_text() {
    let engine = create_mixed_drawing();
    let json = serde_json::to_value(engine.document()).unwrap();
    assert_eq!(json["components"][0]["content"]["paths"], "100,300,150,320,200,300");
}

#[test]
fn test_corrupt_ink_paths_fail_the_load() {
    let engine = create_mixed_drawing();
    let mut json = serde_json::to_value(engine.document()).unwrap();
    json["components"][0]["content"]["paths"] = "1,2,3".into();

    let mut restored = create_engine();
    assert!(!restored.load_content(json.to_string().as_bytes()));
    assert!(restored.components().is_empty());
}
