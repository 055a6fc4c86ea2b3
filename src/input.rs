use std::collections::HashSet;
use std::sync::Arc;

use egui::{ColorImage, Context, PointerButton, Pos2, Rect};

/// Identifier used for mouse/pen input that carries no contact id
pub const POINTER_TOUCH_ID: u64 = 0;

/// Phase of a touch contact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Pressed,
    Moved,
    Released,
    Cancelled,
}

/// A single touch contact update in view coordinates relative to the canvas origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    /// Stable per-contact identifier for the lifetime of the contact
    pub id: u64,
    pub phase: TouchPhase,
    pub location: Pos2,
}

impl TouchEvent {
    pub fn new(id: u64, phase: TouchPhase, location: Pos2) -> Self {
        Self { id, phase, location }
    }

    pub fn pressed(location: Pos2) -> Self {
        Self::new(POINTER_TOUCH_ID, TouchPhase::Pressed, location)
    }

    pub fn moved(location: Pos2) -> Self {
        Self::new(POINTER_TOUCH_ID, TouchPhase::Moved, location)
    }

    pub fn released(location: Pos2) -> Self {
        Self::new(POINTER_TOUCH_ID, TouchPhase::Released, location)
    }

    pub fn cancelled(location: Pos2) -> Self {
        Self::new(POINTER_TOUCH_ID, TouchPhase::Cancelled, location)
    }
}

/// Input the drawing engine consumes from the host
#[derive(Debug, Clone)]
pub enum InputEvent {
    Touch(TouchEvent),
    /// A screenshot of the whole viewport, delivered after the engine asked for one
    Screenshot(Arc<ColorImage>),
}

/// Converts raw egui input into [`InputEvent`]s for a canvas rectangle
#[derive(Debug)]
pub struct InputHandler {
    canvas_rect: Rect,
    pointer_down: bool,
    /// Touch contacts that started inside the canvas
    touches: HashSet<u64>,
}

impl InputHandler {
    pub fn new(canvas_rect: Rect) -> Self {
        Self {
            canvas_rect,
            pointer_down: false,
            touches: HashSet::new(),
        }
    }

    /// Update the canvas rectangle (e.g. if window is resized)
    pub fn set_canvas_rect(&mut self, rect: Rect) {
        self.canvas_rect = rect;
    }

    fn relative(&self, pos: Pos2) -> Pos2 {
        (pos - self.canvas_rect.min).to_pos2()
    }

    /// Process raw egui input for this frame.
    ///
    /// Touch contacts are reported with their own ids. Pointer events are
    /// ignored in frames that also carry touch events, since egui mirrors the
    /// first finger as a pointer.
    pub fn process_input(&mut self, ctx: &Context) -> Vec<InputEvent> {
        let mut events = Vec::new();

        ctx.input(|input| {
            let has_touch = input
                .raw
                .events
                .iter()
                .any(|event| matches!(event, egui::Event::Touch { .. }));

            for event in &input.raw.events {
                match event {
                    egui::Event::Touch { id, phase, pos, .. } => {
                        let phase = match phase {
                            egui::TouchPhase::Start => {
                                if !self.canvas_rect.contains(*pos) || !self.touches.insert(id.0) {
                                    continue;
                                }
                                TouchPhase::Pressed
                            }
                            egui::TouchPhase::Move if self.touches.contains(&id.0) => TouchPhase::Moved,
                            egui::TouchPhase::End if self.touches.remove(&id.0) => TouchPhase::Released,
                            egui::TouchPhase::Cancel if self.touches.remove(&id.0) => TouchPhase::Cancelled,
                            // contact began outside the canvas
                            _ => continue,
                        };
                        // offset so finger ids never collide with the pointer id
                        events.push(InputEvent::Touch(TouchEvent::new(
                            id.0.wrapping_add(1),
                            phase,
                            self.relative(*pos),
                        )));
                    }
                    egui::Event::PointerButton {
                        pos,
                        button: PointerButton::Primary,
                        pressed,
                        ..
                    } if !has_touch => {
                        if *pressed {
                            if self.canvas_rect.contains(*pos) {
                                self.pointer_down = true;
                                events.push(InputEvent::Touch(TouchEvent::pressed(self.relative(*pos))));
                            }
                        } else if self.pointer_down {
                            self.pointer_down = false;
                            events.push(InputEvent::Touch(TouchEvent::released(self.relative(*pos))));
                        }
                    }
                    egui::Event::PointerMoved(pos) if !has_touch && self.pointer_down => {
                        events.push(InputEvent::Touch(TouchEvent::moved(self.relative(*pos))));
                    }
                    egui::Event::PointerGone if self.pointer_down => {
                        self.pointer_down = false;
                        let last = input.pointer.latest_pos().unwrap_or(self.canvas_rect.min);
                        events.push(InputEvent::Touch(TouchEvent::cancelled(self.relative(last))));
                    }
                    egui::Event::Screenshot { image, .. } => {
                        events.push(InputEvent::Screenshot(image.clone()));
                    }
                    _ => {}
                }
            }
        });

        events
    }
}
