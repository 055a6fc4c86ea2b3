use egui::vec2;
use sketch_layers::{Canvas, ComponentKind, DrawingDocument, DrawingEngine, DrawingStore, EngineConfig};

fn sample_document(text: &str) -> DrawingDocument {
    let mut engine = DrawingEngine::new(Canvas::new(vec2(400.0, 300.0), 1.0));
    engine.add_component(ComponentKind::Text, None);
    engine.set_text_entry(text);
    engine.set_selector_mode();
    engine.document()
}

#[test]
fn test_save_load_and_list() {
    let dir = tempfile::tempdir().unwrap();
    let store = DrawingStore::new(dir.path().join("drawings"));

    store.save("beta", &sample_document("b")).unwrap();
    store.save("alpha", &sample_document("a")).unwrap();
    assert_eq!(store.list().unwrap(), vec!["alpha".to_string(), "beta".to_string()]);

    let loaded = store.load("alpha").unwrap();
    assert_eq!(loaded.components.len(), 1);
    assert_eq!(loaded.components[0].as_text().unwrap().text(), "a");

    store.delete("alpha").unwrap();
    assert_eq!(store.list().unwrap(), vec!["beta".to_string()]);
    assert!(store.load("alpha").is_err());
}

#[test]
fn test_saved_drawing_loads_into_engine() {
    let dir = tempfile::tempdir().unwrap();
    let store = DrawingStore::new(dir.path());
    store.save("note", &sample_document("remember")).unwrap();

    let mut engine = DrawingEngine::new(Canvas::new(vec2(400.0, 300.0), 1.0));
    assert_eq!(engine.load_document(store.load("note").unwrap()), 1);
    assert!(engine.is_selector_mode());
}

#[test]
fn test_autosaves_rotate_and_stay_out_of_list() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        drawings_dir: dir.path().to_path_buf(),
        max_autosaves: 3,
        ..EngineConfig::default()
    };
    let mut store = DrawingStore::from_config(&config);
    let document = sample_document("auto");

    // Too soon after the previous autosave
    assert_eq!(store.autosave_at(&document, 1000).unwrap(), Some("autosave_1000".to_string()));
    assert_eq!(store.autosave_at(&document, 1100).unwrap(), None);

    for now in [1300, 1600, 1900, 2200] {
        assert!(store.autosave_at(&document, now).unwrap().is_some());
    }

    assert!(store.list().unwrap().is_empty());
    assert_eq!(store.find_latest_autosave().unwrap(), Some("autosave_2200".to_string()));

    let remaining = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(remaining, 3);
    assert!(store.load("autosave_1000").is_err());
    assert!(store.load("autosave_1600").is_ok());
}

#[test]
fn test_invalid_names_are_refused() {
    let dir = tempfile::tempdir().unwrap();
    let store = DrawingStore::new(dir.path());
    assert!(store.save("../escape", &sample_document("x")).is_err());
    assert!(store.save(".hidden", &sample_document("x")).is_err());
    assert!(store.list().unwrap().is_empty());
}
