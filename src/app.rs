use std::fs::File;

use egui::vec2;
use futures::channel::oneshot;
use futures::io::AllowStdIo;

use crate::canvas::Canvas;
use crate::component::ComponentKind;
use crate::config::EngineConfig;
use crate::engine::{DrawingDocument, DrawingEngine, ImageLoadTicket, SnapshotTicket, fetch_url};
use crate::error::ImageLoadResult;
use crate::event::EngineEvent;
use crate::input::InputHandler;
use crate::store::{DrawingStore, timestamp_secs};

const CONFIG_KEY: &str = "sketch_layers_config";
const DRAWING_KEY: &str = "sketch_layers_drawing";

type PendingDownload = (ImageLoadTicket, oneshot::Receiver<ImageLoadResult<Vec<u8>>>);

/// Which tool the side panel shows as active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Select,
    Draw(ComponentKind),
    Idle,
}

pub struct AnnotationApp {
    engine: DrawingEngine,
    input: InputHandler,
    store: DrawingStore,
    config: EngineConfig,
    text_entry: String,
    image_path: String,
    image_url: String,
    drawing_name: String,
    pending_download: Option<PendingDownload>,
    pending_snapshot: Option<(String, SnapshotTicket)>,
    status: Option<String>,
}

impl AnnotationApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config: EngineConfig = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, CONFIG_KEY))
            .unwrap_or_default();

        let canvas = Canvas::new(vec2(800.0, 600.0), cc.egui_ctx.pixels_per_point()).with_context(cc.egui_ctx.clone());
        let mut engine = DrawingEngine::with_config(canvas, config.clone());
        engine.subscribe(|event: &EngineEvent| log::debug!("engine event: {:?}", event));

        if let Some(document) = cc.storage.and_then(restore_drawing) {
            engine.load_document(document);
        }

        Self {
            engine,
            input: InputHandler::new(egui::Rect::NOTHING),
            store: DrawingStore::from_config(&config),
            config,
            text_entry: String::new(),
            image_path: String::new(),
            image_url: String::new(),
            drawing_name: "untitled".to_owned(),
            pending_download: None,
            pending_snapshot: None,
            status: None,
        }
    }

    fn mode(&self) -> Mode {
        if self.engine.is_selector_mode() {
            return Mode::Select;
        }
        self.engine.active_component_kind().map_or(Mode::Idle, Mode::Draw)
    }

    fn report(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{}", message);
        self.status = Some(message);
    }

    fn poll_download(&mut self, ctx: &egui::Context) {
        let Some((ticket, mut receiver)) = self.pending_download.take() else {
            return;
        };

        match receiver.try_recv() {
            Ok(None) => {
                self.pending_download = Some((ticket, receiver));
                ctx.request_repaint_after(std::time::Duration::from_millis(100));
            }
            Ok(Some(Ok(bytes))) => {
                if !self.engine.complete_image_load(ticket, &bytes) {
                    self.report("Downloaded data is not a usable image");
                }
            }
            Ok(Some(Err(err))) => self.report(format!("Download failed: {}", err)),
            Err(_) => self.report("Download was cancelled"),
        }
    }

    fn poll_snapshot(&mut self) {
        let Some((name, mut ticket)) = self.pending_snapshot.take() else {
            return;
        };

        match ticket.poll_ready() {
            None => self.pending_snapshot = Some((name, ticket)),
            Some(Ok(bytes)) => {
                let path = self.store.dir().join(format!("{}.png", name));
                let written = std::fs::create_dir_all(self.store.dir()).and_then(|_| std::fs::write(&path, bytes));
                match written {
                    Ok(()) => self.report(format!("Thumbnail written to {}", path.display())),
                    Err(err) => self.report(format!("Failed to write thumbnail: {}", err)),
                }
            }
            Some(Err(err)) => self.report(format!("Snapshot failed: {}", err)),
        }
    }

    fn autosave(&mut self) {
        if !self.engine.is_dirty() || !self.store.should_autosave(timestamp_secs()) {
            return;
        }
        match self.store.try_autosave(&self.engine.document()) {
            Ok(Some(name)) => log::info!("autosaved as {}", name),
            Ok(None) => {}
            Err(err) => log::warn!("Autosave failed: {}", err),
        }
    }

    fn load_image_file(&mut self) {
        let file = match File::open(self.image_path.trim()) {
            Ok(file) => file,
            Err(err) => {
                self.report(format!("Cannot open {}: {}", self.image_path, err));
                return;
            }
        };
        if !futures::executor::block_on(self.engine.set_image_stream(AllowStdIo::new(file))) {
            self.report(format!("Failed to load {}", self.image_path));
        }
    }

    fn download_image(&mut self) {
        let url = self.image_url.trim().to_owned();
        if url.is_empty() {
            return;
        }
        if let Some(ticket) = self.engine.begin_image_load() {
            log::info!("downloading image from {}", url);
            self.pending_download = Some((ticket, fetch_url(&url)));
        }
    }

    fn save_drawing(&mut self) {
        match self.store.save(&self.drawing_name, &self.engine.document()) {
            Ok(()) => {
                self.engine.set_dirty(false);
                self.report(format!("Saved {}", self.drawing_name));
            }
            Err(err) => self.report(format!("Save failed: {}", err)),
        }
    }

    fn load_drawing(&mut self, name: &str) {
        match self.store.load(name) {
            Ok(document) => {
                let count = self.engine.load_document(document);
                self.report(format!("Loaded {} ({} components)", name, count));
            }
            Err(err) => self.report(format!("Load failed: {}", err)),
        }
    }

    fn tools_panel(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("tools_panel")
            .resizable(true)
            .default_width(220.0)
            .show(ctx, |ui| {
                ui.heading("Tools");

                let mode = self.mode();
                ui.horizontal_wrapped(|ui| {
                    if ui.selectable_label(mode == Mode::Select, "Select").clicked() {
                        self.engine.set_selector_mode();
                    }
                    for (kind, label) in [
                        (ComponentKind::Ink, "Ink"),
                        (ComponentKind::Text, "Text"),
                        (ComponentKind::Image, "Image"),
                    ] {
                        if ui.selectable_label(mode == Mode::Draw(kind), label).clicked() {
                            log::info!("Tool selected from UI: {}", label);
                            self.engine.add_component(kind, None);
                        }
                    }
                });
                ui.separator();

                let mut color = self.engine.active_color();
                ui.horizontal(|ui| {
                    ui.label("Colour");
                    if ui.color_edit_button_srgba(&mut color).changed() {
                        self.engine.set_active_color(color);
                    }
                });

                let has_active = self.engine.active_component().is_some();
                let mut stroke_width = self.engine.active_stroke_width();
                if ui
                    .add_enabled(has_active, egui::Slider::new(&mut stroke_width, 1.0..=40.0).text("Stroke"))
                    .changed()
                {
                    self.engine.set_active_stroke_width(stroke_width);
                }

                match self.engine.active_component_kind() {
                    Some(ComponentKind::Text) => self.text_options(ui),
                    Some(ComponentKind::Image) => self.image_options(ui),
                    _ => {}
                }
                ui.separator();

                ui.horizontal(|ui| {
                    if ui.button("Bring to front").clicked() {
                        self.engine.bring_to_front();
                    }
                    if ui.button("Send to back").clicked() {
                        self.engine.send_to_back();
                    }
                });
                ui.horizontal(|ui| {
                    if ui.button("Delete").clicked() && !self.engine.delete_component() {
                        self.report("Nothing to delete");
                    }
                    if ui.button("Undo last").clicked() {
                        self.engine.delete_last_component();
                    }
                });
                ui.separator();

                self.drawing_options(ui);

                if let Some(status) = &self.status {
                    ui.separator();
                    ui.label(status);
                }
            });
    }

    fn text_options(&mut self, ui: &mut egui::Ui) {
        ui.separator();
        let Some(text) = self.engine.active_component().and_then(|c| c.as_text()) else {
            return;
        };
        let (mut size, mut family) = (text.text_size(), text.font_family().to_owned());
        let current_family = family.clone();
        self.text_entry = text.text().to_owned();

        if ui.text_edit_multiline(&mut self.text_entry).changed() {
            self.engine.set_text_entry(&self.text_entry);
        }

        egui::ComboBox::from_label("Font")
            .selected_text(family.clone())
            .show_ui(ui, |ui| {
                for name in self.engine.font_families() {
                    ui.selectable_value(&mut family, name.clone(), name);
                }
            });
        if family != current_family {
            self.engine.set_text_font_family(&family);
        }

        if ui.add(egui::Slider::new(&mut size, 8.0..=160.0).text("Size")).changed() {
            self.engine.set_text_font_size(size);
        }
    }

    fn image_options(&mut self, ui: &mut egui::Ui) {
        ui.separator();
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.image_path);
            if ui.button("Open").clicked() {
                self.load_image_file();
            }
        });
        ui.horizontal(|ui| {
            ui.text_edit_singleline(&mut self.image_url);
            let downloading = self.pending_download.is_some();
            if ui.add_enabled(!downloading, egui::Button::new("Download")).clicked() {
                self.download_image();
            }
        });

        let mut lock = self
            .engine
            .active_component()
            .and_then(|c| c.as_image())
            .is_some_and(|image| image.lock_aspect_ratio());
        if ui.checkbox(&mut lock, "Lock aspect ratio").changed() {
            self.engine.set_lock_aspect_ratio(lock);
        }
    }

    fn drawing_options(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Drawing");
            ui.text_edit_singleline(&mut self.drawing_name);
        });
        ui.horizontal(|ui| {
            if ui.button("Save").clicked() {
                self.save_drawing();
            }
            if ui.button("Load").clicked() {
                let name = self.drawing_name.clone();
                self.load_drawing(&name);
            }
            if ui.button("Thumbnail").clicked() {
                let ticket = self.engine.request_snapshot(self.config.thumbnail());
                self.pending_snapshot = Some((self.drawing_name.clone(), ticket));
            }
        });
        if ui.button("Restore autosave").clicked() {
            match self.store.find_latest_autosave() {
                Ok(Some(name)) => self.load_drawing(&name),
                Ok(None) => self.report("No autosave found"),
                Err(err) => self.report(format!("Cannot read autosaves: {}", err)),
            }
        }

        if let Ok(names) = self.store.list() {
            egui::CollapsingHeader::new("Saved drawings").show(ui, |ui| {
                for name in names {
                    if ui.link(&name).clicked() {
                        self.drawing_name = name.clone();
                        self.load_drawing(&name);
                    }
                }
            });
        }
    }

    fn canvas_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
                let rect = response.rect;

                self.input.set_canvas_rect(rect);
                self.engine.set_view(rect, ctx.pixels_per_point());

                for event in self.input.process_input(ctx) {
                    self.engine.handle_input(&event);
                }

                self.engine.paint(&painter);
            });
    }
}

/// Stored as JSON; flattened components do not round-trip through RON
fn store_drawing(storage: &mut dyn eframe::Storage, document: &DrawingDocument) {
    match document.to_json() {
        Ok(json) => storage.set_string(DRAWING_KEY, json),
        Err(err) => log::warn!("Failed to persist drawing: {}", err),
    }
}

fn restore_drawing(storage: &dyn eframe::Storage) -> Option<DrawingDocument> {
    let json = storage.get_string(DRAWING_KEY)?;
    match DrawingDocument::from_json(&json) {
        Ok(document) => Some(document),
        Err(err) => {
            log::warn!("Failed to restore drawing: {}", err);
            None
        }
    }
}

impl eframe::App for AnnotationApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, CONFIG_KEY, &self.config);
        store_drawing(storage, &self.engine.document());
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_download(ctx);
        self.poll_snapshot();
        self.autosave();

        self.tools_panel(ctx);
        self.canvas_panel(ctx);
    }
}
