use egui::Color32;

use crate::component::ComponentKind;

/// Notifications emitted by the drawing engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The active component changed: a new one was created, selected, or the selection was cleared
    SelectionChanged,
    /// A component finished a move or resize gesture, or its content changed
    ComponentUpdated { kind: ComponentKind },
    ActiveColorChanged(Color32),
    ContentSaved,
    ContentLoaded { components: usize },
}
