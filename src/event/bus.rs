use parking_lot::Mutex;

use crate::event::{EngineEvent, EventHandler};

/// A simple event bus for broadcasting engine events to registered handlers
pub struct EventBus {
    handlers: Mutex<Vec<Box<dyn EventHandler>>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &format!("<{} handlers>", self.handlers.lock().len()))
            .finish()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }

    /// Subscribe a handler to receive events
    pub fn subscribe(&self, handler: impl EventHandler + 'static) {
        self.handlers.lock().push(Box::new(handler));
    }

    /// Emit an event to all registered handlers.
    ///
    /// Handlers must not emit on the same bus.
    pub fn emit(&self, event: EngineEvent) {
        log::trace!("emit {:?}", event);
        for handler in self.handlers.lock().iter_mut() {
            handler.handle_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_all_handlers_receive_events_in_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = seen.clone();
        bus.subscribe(move |event: &EngineEvent| first.lock().push(("first", event.clone())));
        let second = seen.clone();
        bus.subscribe(move |event: &EngineEvent| second.lock().push(("second", event.clone())));

        bus.emit(EngineEvent::SelectionChanged);
        bus.emit(EngineEvent::ContentSaved);

        let seen = seen.lock();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], ("first", EngineEvent::SelectionChanged));
        assert_eq!(seen[1], ("second", EngineEvent::SelectionChanged));
        assert_eq!(seen[3], ("second", EngineEvent::ContentSaved));
    }
}
