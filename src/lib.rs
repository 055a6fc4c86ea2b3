#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod canvas;
pub mod component;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod id_generator;
pub mod input;
pub mod scale;
pub mod store;

pub use app::AnnotationApp;
pub use canvas::{Canvas, FontMetrics};
pub use component::{Component, ComponentAction, ComponentKind, Content};
pub use config::EngineConfig;
pub use engine::{DrawingDocument, DrawingEngine, ImageLoadTicket, SnapshotTicket};
pub use event::{EngineEvent, EventBus, EventHandler};
pub use id_generator::ComponentId;
pub use input::{InputEvent, InputHandler, TouchEvent, TouchPhase};
pub use scale::{Range, Scale};
pub use store::DrawingStore;
