use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use super::DrawingEngine;
use crate::component::Component;
use crate::error::{PersistenceError, PersistenceResult};
use crate::event::EngineEvent;

/// Version written into saved drawings
pub const DOCUMENT_VERSION: u32 = 1;

/// The saved form of a drawing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawingDocument {
    pub version: u32,
    pub components: Vec<Component>,
}

/// Accepts both the versioned document and a bare component list
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDrawing {
    Document(DrawingDocument),
    Bare(Vec<Component>),
}

impl DrawingDocument {
    pub fn new(components: Vec<Component>) -> Self {
        Self {
            version: DOCUMENT_VERSION,
            components,
        }
    }

    pub fn to_writer(&self, writer: impl Write) -> PersistenceResult<()> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    pub fn to_json(&self) -> PersistenceResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_reader(mut reader: impl Read) -> PersistenceResult<Self> {
        let mut json = String::new();
        reader.read_to_string(&mut json)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> PersistenceResult<Self> {
        if json.trim().is_empty() {
            return Err(PersistenceError::Empty);
        }

        let document = match serde_json::from_str(json)? {
            StoredDrawing::Document(document) => document,
            StoredDrawing::Bare(components) => Self::new(components),
        };
        if document.version > DOCUMENT_VERSION {
            log::warn!(
                "Drawing version {} is newer than supported version {}",
                document.version,
                DOCUMENT_VERSION
            );
        }
        Ok(document)
    }
}

impl DrawingEngine {
    /// Snapshot of the committed components
    pub fn document(&self) -> DrawingDocument {
        DrawingDocument::new(self.components.clone())
    }

    /// Write every committed component. Returns whether the write succeeded.
    pub fn save_content(&mut self, writer: impl Write) -> bool {
        match self.document().to_writer(writer) {
            Ok(()) => {
                self.is_dirty = false;
                self.events.emit(EngineEvent::ContentSaved);
                true
            }
            Err(err) => {
                log::warn!("Failed to save drawing: {}", err);
                false
            }
        }
    }

    /// Replace all content with a saved drawing. On failure the engine is left empty.
    pub fn load_content(&mut self, reader: impl Read) -> bool {
        self.current = None;
        self.selected = None;
        self.components.clear();

        match DrawingDocument::from_reader(reader) {
            Ok(document) => {
                self.load_document(document);
                true
            }
            Err(err) => {
                log::warn!("Failed to load drawing: {}", err);
                self.canvas.invalidate();
                false
            }
        }
    }

    /// Replace all content with `document`, binding every component to the canvas
    pub fn load_document(&mut self, document: DrawingDocument) -> usize {
        self.current = None;
        self.selected = None;
        self.components = document.components;
        for component in &mut self.components {
            component.initialize(&self.canvas);
        }

        let count = self.components.len();
        log::info!("loaded {} components", count);
        self.set_selector_mode();
        self.canvas.invalidate();
        self.events.emit(EngineEvent::ContentLoaded { components: count });
        count
    }
}
