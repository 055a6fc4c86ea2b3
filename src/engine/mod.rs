use std::cmp::Reverse;

use egui::{Color32, Painter, Pos2, Rect};

use crate::canvas::Canvas;
use crate::component::{Component, ComponentAction, ComponentKind};
use crate::config::EngineConfig;
use crate::event::{EngineEvent, EventBus, EventHandler};
use crate::id_generator::ComponentId;
use crate::input::{InputEvent, TouchEvent, TouchPhase};

mod image_load;
mod persistence;
mod snapshot;

pub use image_load::{ImageLoadTicket, fetch_url};
pub use persistence::DrawingDocument;
pub use snapshot::SnapshotTicket;

use snapshot::PendingSnapshot;

/// The component receiving edits that is not a plain committed entry
#[derive(Debug)]
enum Current {
    /// Newly created, not yet part of `components`
    Fresh(Box<Component>),
    /// An edit copy already appended to `components`
    Version(ComponentId),
}

/// Owns the committed components and routes touch, paint and edit operations to them
#[derive(Debug)]
pub struct DrawingEngine {
    /// Insertion order; paint order comes from each component's display order
    components: Vec<Component>,
    current: Option<Current>,
    selected: Option<ComponentId>,
    selector_mode: bool,
    active_color: Color32,
    is_dirty: bool,
    refreshing: bool,
    canvas: Canvas,
    events: EventBus,
    config: EngineConfig,
    snapshot: Option<PendingSnapshot>,
}

impl DrawingEngine {
    pub fn new(canvas: Canvas) -> Self {
        Self::with_config(canvas, EngineConfig::default())
    }

    pub fn with_config(canvas: Canvas, config: EngineConfig) -> Self {
        Self {
            components: Vec::new(),
            current: None,
            selected: None,
            selector_mode: false,
            active_color: config.initial_color,
            is_dirty: false,
            refreshing: false,
            canvas,
            events: EventBus::new(),
            config,
            snapshot: None,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Place the canvas on screen; call once per frame before painting
    pub fn set_view(&mut self, rect: Rect, pixels_per_point: f32) {
        self.canvas.set_view(rect, pixels_per_point);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn subscribe(&self, handler: impl EventHandler + 'static) {
        self.events.subscribe(handler);
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.iter().find(|c| c.id() == id)
    }

    pub fn selected_component(&self) -> Option<&Component> {
        self.selected.and_then(|id| self.component(id))
    }

    pub fn is_selector_mode(&self) -> bool {
        self.selector_mode
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.is_dirty = dirty;
    }

    /// The component edits apply to: the current one, else the selected one
    pub fn active_component(&self) -> Option<&Component> {
        match &self.current {
            Some(Current::Fresh(component)) => Some(component.as_ref()),
            Some(Current::Version(id)) => self.component(*id),
            None => self.selected_component(),
        }
    }

    fn active_parts(&mut self) -> Option<(&mut Component, &Canvas)> {
        let Self {
            components,
            current,
            selected,
            canvas,
            ..
        } = self;

        let component = match current {
            Some(Current::Fresh(component)) => Some(component.as_mut()),
            Some(Current::Version(id)) => components.iter_mut().find(|c| c.id() == *id),
            None => {
                let id = (*selected)?;
                components.iter_mut().find(|c| c.id() == id)
            }
        }?;
        Some((component, canvas))
    }

    /// Active component, only if it is of `kind`
    fn active_parts_of(&mut self, kind: ComponentKind) -> Option<(&mut Component, &Canvas)> {
        self.active_parts().filter(|(component, _)| component.kind() == kind)
    }

    fn component_parts(&mut self, id: ComponentId) -> Option<(&mut Component, &Canvas)> {
        let Self {
            components,
            current,
            canvas,
            ..
        } = self;

        let component = match current {
            Some(Current::Fresh(component)) if component.id() == id => Some(component.as_mut()),
            _ => components.iter_mut().find(|c| c.id() == id),
        }?;
        Some((component, canvas))
    }

    pub fn active_component_kind(&self) -> Option<ComponentKind> {
        self.active_component().map(|c| c.kind())
    }

    pub fn is_active_component_initialized(&self) -> bool {
        if self.selected.is_some() {
            return true;
        }
        self.active_component().is_some_and(|c| c.is_initialized())
    }

    pub fn active_color(&self) -> Color32 {
        self.active_color
    }

    /// Change the colour for new components and recolour the active one
    pub fn set_active_color(&mut self, color: Color32) {
        self.active_color = color;
        if let Some((component, canvas)) = self.active_parts() {
            component.set_color(color);
            canvas.invalidate();
        }
        self.events.emit(EngineEvent::ActiveColorChanged(color));
    }

    /// Stroke width of the active component, `0.0` without one
    pub fn active_stroke_width(&self) -> f32 {
        self.active_component().map_or(0.0, |c| c.stroke_width())
    }

    pub fn set_active_stroke_width(&mut self, width: f32) {
        if let Some((component, canvas)) = self.active_parts() {
            component.set_stroke_width(width);
            canvas.invalidate();
        }
    }

    pub fn font_families(&self) -> Vec<String> {
        self.canvas.fonts().family_names()
    }

    /// Suspend painting until [`DrawingEngine::end_refresh`]
    pub fn begin_refresh(&mut self) {
        self.refreshing = true;
    }

    pub fn end_refresh(&mut self) {
        self.refreshing = false;
        self.canvas.invalidate();
    }

    fn highest_display_order(&self) -> Option<u32> {
        self.components.iter().map(|c| c.display_order()).max()
    }

    fn find_last_component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.iter().rev().find(|c| c.kind() == kind)
    }

    /// Commit the edit in progress, or roll it back if an edit copy was never changed
    fn clear_component(&mut self) {
        let selected = self.selected.take();

        match self.current.take() {
            Some(Current::Fresh(mut component)) => {
                if component.is_initialized() {
                    component.complete();
                    log::debug!("committed {} component {}", component.kind(), component.id());
                    self.components.push(*component);
                }
            }
            Some(Current::Version(id)) => self.settle_version(id),
            None => {}
        }

        if let Some(id) = selected {
            if let Some(component) = self.components.iter_mut().find(|c| c.id() == id) {
                component.complete();
            }
        }
    }

    fn settle_version(&mut self, id: ComponentId) {
        let Some(index) = self.components.iter().position(|c| c.id() == id) else {
            return;
        };

        let component = &mut self.components[index];
        match component.previous_version() {
            Some(previous) if !component.is_edited() => {
                self.components.remove(index);
                if let Some(previous) = self.components.iter_mut().find(|c| c.id() == previous) {
                    previous.show();
                }
                log::debug!("rolled back unchanged edit of {}", previous);
            }
            _ => component.complete(),
        }
    }

    /// Start a new component, committing whatever was in progress
    pub fn add_component(&mut self, kind: ComponentKind, location: Option<Pos2>) -> ComponentId {
        self.selector_mode = false;
        self.clear_component();

        let mut component = Component::create(kind, &self.canvas);
        if let Some(last) = self.find_last_component(kind) {
            component.copy_options(last, &self.canvas);
        }
        component.set_color(self.active_color);
        if let Some(location) = location {
            component.set_location(location.x, location.y, None, None, &self.canvas);
        }
        component.set_display_order(self.highest_display_order().unwrap_or(0) + 1);

        let id = component.id();
        log::debug!("added {} component {}", kind, id);
        self.current = Some(Current::Fresh(Box::new(component)));

        self.events.emit(EngineEvent::SelectionChanged);
        self.canvas.invalidate();
        id
    }

    /// Hide `previous` and start editing a copy of it linked back to it
    pub fn create_new_version_of_component(&mut self, previous: ComponentId) -> Option<ComponentId> {
        self.selector_mode = false;
        self.new_version(previous)
    }

    fn new_version(&mut self, previous: ComponentId) -> Option<ComponentId> {
        self.components.iter_mut().find(|c| c.id() == previous)?.hide();
        self.clear_component();

        let source = self.component(previous)?;
        let mut version = Component::create(source.kind(), &self.canvas);
        version.set_previous_version(Some(previous));
        version.set_display_order(source.display_order());
        version.copy_component(source, &self.canvas);
        version.set_edited(false);

        let id = version.id();
        self.components.push(version);
        self.current = Some(Current::Version(id));

        self.events.emit(EngineEvent::SelectionChanged);
        self.canvas.invalidate();
        Some(id)
    }

    /// Switch touches to hit-testing, committing the edit in progress
    pub fn set_selector_mode(&mut self) {
        self.selector_mode = true;
        self.clear_component();
    }

    pub fn set_location(&mut self, x: f32, y: f32, width: Option<f32>, height: Option<f32>) {
        let Some((component, canvas)) = self.active_parts() else {
            return;
        };
        component.set_location(x, y, width, height, canvas);
        component.set_edited(true);
        self.is_dirty = true;
    }

    pub fn set_text_entry(&mut self, text: &str) {
        let Some((component, canvas)) = self.active_parts_of(ComponentKind::Text) else {
            return;
        };
        let action = component.set_text(text, canvas);
        self.is_dirty = true;
        self.handle_action(action);
    }

    pub fn set_text_font_family(&mut self, family: &str) {
        if let Some((component, canvas)) = self.active_parts_of(ComponentKind::Text) {
            component.set_font_family(family, canvas);
            self.is_dirty = true;
        }
    }

    pub fn set_text_font_size(&mut self, size: f32) {
        if let Some((component, canvas)) = self.active_parts_of(ComponentKind::Text) {
            component.set_text_size(size, canvas);
            self.is_dirty = true;
        }
    }

    pub fn set_lock_aspect_ratio(&mut self, lock: bool) {
        if let Some((component, canvas)) = self.active_parts_of(ComponentKind::Image) {
            component.set_lock_aspect_ratio(lock, canvas);
            self.is_dirty = true;
        }
    }

    /// Remove every entry of a version chain, newest first
    fn remove_chain(&mut self, id: ComponentId) -> usize {
        let mut removed = 0;
        let mut next = Some(id);
        while let Some(id) = next {
            next = match self.components.iter().position(|c| c.id() == id) {
                Some(index) => {
                    removed += 1;
                    self.components.remove(index).previous_version()
                }
                None => None,
            };
        }
        removed
    }

    /// Delete the selected component with its history, or drop an initialized new one.
    /// Always returns to selector mode when something was deleted.
    pub fn delete_component(&mut self) -> bool {
        if let Some(id) = self.selected {
            let removed = self.remove_chain(id);
            log::debug!("deleted {} entries of {}", removed, id);
        } else {
            let discard = match &self.current {
                Some(Current::Fresh(component)) if component.is_initialized() => None,
                Some(Current::Version(id)) => Some(*id),
                _ => return false,
            };
            self.current = None;
            if let Some(id) = discard {
                self.remove_chain(id);
            }
        }

        self.is_dirty = true;
        self.clear_component();
        self.canvas.invalidate();
        self.set_selector_mode();
        true
    }

    /// Undo the most recent addition, re-showing the version it replaced
    pub fn delete_last_component(&mut self) {
        self.canvas.invalidate();
        self.set_selector_mode();

        let Some(last) = self.components.pop() else {
            return;
        };
        if let Some(previous) = last.previous_version() {
            if let Some(previous) = self.components.iter_mut().find(|c| c.id() == previous) {
                previous.show();
            }
        }
        self.is_dirty = true;
    }

    pub fn bring_to_front(&mut self) {
        let highest = self.highest_display_order();
        let Some((component, canvas)) = self.active_parts() else {
            return;
        };

        let target = match highest {
            Some(highest) if component.display_order() >= highest => return,
            Some(highest) => highest + 1,
            None => 1,
        };
        component.set_display_order(target);
        component.set_edited(true);
        canvas.invalidate();
        self.is_dirty = true;
    }

    pub fn send_to_back(&mut self) {
        let saved = match &self.current {
            // an untouched new component stands for the last thing drawn
            Some(Current::Fresh(component)) if !component.is_initialized() => Some(None),
            Some(Current::Fresh(component)) => Some(Some(component.id())),
            Some(Current::Version(id)) => Some(Some(*id)),
            None => None,
        };

        if let Some(saved) = saved {
            if let Some(component) = saved.and_then(|id| self.components.iter_mut().find(|c| c.id() == id)) {
                // reordering counts as an edit, so the version is kept
                component.set_edited(true);
            }
            self.clear_component();
            let saved = match saved.or_else(|| self.components.last().map(|c| c.id())) {
                Some(id) => id,
                None => return,
            };
            self.select_committed(saved);
        }

        let Some(target) = self.active_component().map(|c| c.id()) else {
            return;
        };
        let Some(index) = self.components.iter().position(|c| c.id() == target) else {
            return;
        };
        if self.components[index].display_order() <= 1 {
            return;
        }

        for (i, component) in self.components.iter_mut().enumerate() {
            if i == index {
                component.set_display_order(1);
            } else {
                component.set_display_order(component.display_order() + 1);
            }
        }
        self.is_dirty = true;
        self.canvas.invalidate();
    }

    fn select_committed(&mut self, id: ComponentId) {
        self.selector_mode = true;
        if let Some(component) = self.components.iter_mut().find(|c| c.id() == id) {
            component.set_item_selected();
            self.selected = Some(id);
        }
    }

    fn handle_action(&mut self, action: Option<ComponentAction>) {
        match action {
            Some(ComponentAction::Completed(location)) => {
                if let Some(kind) = self.active_component_kind() {
                    self.clear_component();
                    self.add_component(kind, Some(location));
                }
            }
            Some(ComponentAction::Updated) => {
                if let Some(kind) = self.active_component_kind() {
                    self.events.emit(EngineEvent::ComponentUpdated { kind });
                }
            }
            None => {}
        }
    }

    fn current_is_ink(&self) -> bool {
        match &self.current {
            Some(Current::Fresh(component)) => component.kind() == ComponentKind::Ink,
            Some(Current::Version(id)) => self.component(*id).is_some_and(|c| c.kind() == ComponentKind::Ink),
            None => false,
        }
    }

    /// Dispatch one host input event
    pub fn handle_input(&mut self, event: &InputEvent) {
        match event {
            InputEvent::Touch(touch) => self.on_touch(touch),
            InputEvent::Screenshot(image) => self.on_screenshot(image),
        }
    }

    /// Route a touch: hit-test in selector mode, else feed the selected or current component
    pub fn on_touch(&mut self, event: &TouchEvent) {
        if event.phase == TouchPhase::Pressed {
            self.is_dirty = true;
            if self.current_is_ink() {
                self.selected = None;
            }
        }

        if self.selector_mode && event.phase == TouchPhase::Pressed {
            self.select_at(event);
            return;
        }

        if let Some(id) = self.selected {
            let action = self
                .component_parts(id)
                .and_then(|(component, canvas)| component.on_touch(event, canvas));
            self.handle_action(action);
            return;
        }

        let action = self
            .active_parts()
            .and_then(|(component, canvas)| component.on_touch(event, canvas));
        self.handle_action(action);

        if event.phase == TouchPhase::Released && self.current_is_ink() {
            // a finished stroke stays selectable without another tap
            self.selected = self.find_last_component(ComponentKind::Ink).map(|c| c.id());
            self.events.emit(EngineEvent::SelectionChanged);
            self.canvas.invalidate();
        }
    }

    fn select_at(&mut self, event: &TouchEvent) {
        let point = self.canvas.convert_to_pixel(event.location);

        if let Some(id) = self.selected {
            if let Some((component, canvas)) = self.component_parts(id) {
                if component.allows_scaling() && component.scale_box().contains(point) {
                    component.on_touch(event, canvas);
                    canvas.invalidate();
                    return;
                }
            }
        }

        let previous_selection = self.selected;
        self.clear_component();
        for component in &mut self.components {
            component.complete();
        }

        let mut by_order: Vec<&Component> = self.components.iter().collect();
        by_order.sort_by_key(|c| Reverse(c.display_order()));
        let hit = by_order
            .into_iter()
            .find(|c| c.is_visible() && c.contains(point))
            .map(|c| c.id());

        let Some(hit) = hit else {
            self.events.emit(EngineEvent::SelectionChanged);
            self.canvas.invalidate();
            return;
        };

        let Some(version) = self.new_version(hit) else {
            return;
        };
        self.selected = Some(version);

        let action = self.component_parts(version).and_then(|(component, canvas)| {
            component.set_item_selected();
            component.on_touch(event, canvas)
        });
        if let Some(component) = self.component(version) {
            self.active_color = component.color();
        }
        self.handle_action(action);

        if previous_selection != self.selected {
            self.events.emit(EngineEvent::SelectionChanged);
        }
        self.canvas.invalidate();
    }

    /// Paint every component into `painter`, scaled down so all visible content fits
    pub fn paint(&mut self, painter: &Painter) {
        if self.refreshing {
            return;
        }

        let Self {
            components,
            current,
            canvas,
            config,
            snapshot,
            ..
        } = self;

        painter.rect_filled(canvas.view_rect(), 0.0, config.background_color);

        let (x_bounds, y_bounds) = components
            .iter()
            .filter(|c| c.is_visible())
            .fold((0.0f32, 0.0f32), |(x, y), c| (x.max(c.x() + c.width()), y.max(c.y() + c.height())));

        let pixels = canvas.pixel_size();
        let scale_x = if x_bounds > pixels.x { pixels.x / x_bounds } else { 1.0 };
        let scale_y = if y_bounds > pixels.y { pixels.y / y_bounds } else { 1.0 };
        canvas.set_scale(scale_x.min(scale_y));

        let mut order: Vec<usize> = (0..components.len()).collect();
        order.sort_by_key(|&i| components[i].display_order());
        for i in order {
            components[i].draw(painter, canvas);
        }

        if let Some(Current::Fresh(component)) = current {
            component.draw(painter, canvas);
        }

        if let Some(pending) = snapshot {
            pending.request(painter.ctx());
        }

        canvas.take_repaint_request();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn engine() -> DrawingEngine {
        DrawingEngine::new(Canvas::new(vec2(800.0, 600.0), 1.0))
    }

    fn stroke(engine: &mut DrawingEngine, from: Pos2, to: Pos2) {
        engine.on_touch(&TouchEvent::pressed(from));
        engine.on_touch(&TouchEvent::moved(to));
        engine.on_touch(&TouchEvent::released(to));
    }

    #[test]
    fn test_new_components_stack_on_top() {
        let mut engine = engine();
        engine.add_component(ComponentKind::Ink, None);
        stroke(&mut engine, pos2(10.0, 10.0), pos2(20.0, 10.0));
        stroke(&mut engine, pos2(10.0, 50.0), pos2(20.0, 50.0));

        let orders: Vec<u32> = engine.components().iter().map(|c| c.display_order()).collect();
        assert_eq!(orders, vec![1, 2]);
        assert_eq!(engine.active_component().map(|c| c.display_order()), Some(3));
    }

    #[test]
    fn test_uninitialized_component_is_dropped_on_mode_switch() {
        let mut engine = engine();
        engine.add_component(ComponentKind::Text, None);
        engine.set_selector_mode();
        assert!(engine.components().is_empty());
        assert!(engine.active_component().is_none());
    }

    #[test]
    fn test_type_mismatched_setters_are_ignored() {
        let mut engine = engine();
        engine.add_component(ComponentKind::Ink, None);
        engine.set_text_entry("hello");
        engine.set_lock_aspect_ratio(false);
        assert!(!engine.is_dirty());
        assert_eq!(engine.active_component_kind(), Some(ComponentKind::Ink));
    }

    #[test]
    fn test_active_color_applies_to_active_and_new_components() {
        let mut engine = engine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        engine.subscribe(move |event: &EngineEvent| sink.lock().push(event.clone()));

        engine.add_component(ComponentKind::Ink, None);
        engine.set_active_color(Color32::RED);
        assert_eq!(engine.active_component().map(|c| c.color()), Some(Color32::RED));

        engine.add_component(ComponentKind::Image, None);
        assert_eq!(engine.active_component().map(|c| c.color()), Some(Color32::RED));
        assert!(seen.lock().contains(&EngineEvent::ActiveColorChanged(Color32::RED)));
    }

    #[test]
    fn test_text_entry_commits_with_options_carried_over() {
        let mut engine = engine();
        engine.add_component(ComponentKind::Text, None);
        engine.set_text_font_size(20.0);
        engine.set_text_entry("first");
        assert!(engine.is_active_component_initialized());

        engine.add_component(ComponentKind::Text, None);
        assert_eq!(engine.components().len(), 1);
        let text = engine.active_component().and_then(|c| c.as_text()).map(|t| t.text_size());
        assert_eq!(text, Some(20.0));
    }

    #[test]
    fn test_delete_without_active_component_returns_false() {
        let mut engine = engine();
        assert!(!engine.delete_component());
        engine.add_component(ComponentKind::Image, None);
        assert!(!engine.delete_component());
    }

    #[test]
    fn test_delete_last_component_reshows_previous_version() {
        let mut engine = engine();
        engine.add_component(ComponentKind::Text, None);
        engine.set_text_entry("note");
        engine.set_selector_mode();
        let original = engine.components()[0].id();

        let version = engine.create_new_version_of_component(original).unwrap();
        engine.set_text_entry("changed");
        engine.set_selector_mode();
        assert_eq!(engine.components().len(), 2);
        assert!(!engine.component(original).unwrap().is_visible());
        assert_eq!(engine.component(version).unwrap().previous_version(), Some(original));

        engine.delete_last_component();
        assert_eq!(engine.components().len(), 1);
        assert!(engine.component(original).unwrap().is_visible());
        assert!(engine.is_selector_mode());
    }

    #[test]
    fn test_refresh_suppresses_painting() {
        let ctx = egui::Context::default();
        let painter = Painter::new(ctx, egui::LayerId::background(), Rect::EVERYTHING);
        let mut engine = engine();
        engine.add_component(ComponentKind::Ink, None);

        engine.begin_refresh();
        engine.paint(&painter);
        engine.end_refresh();
        assert!(engine.canvas().take_repaint_request());
    }

    #[test]
    fn test_paint_scales_down_to_fit_content() {
        let ctx = egui::Context::default();
        let painter = Painter::new(ctx, egui::LayerId::background(), Rect::EVERYTHING);
        let mut engine = engine();
        engine.add_component(ComponentKind::Ink, None);
        stroke(&mut engine, pos2(10.0, 10.0), pos2(20.0, 10.0));
        engine.set_selector_mode();

        engine.paint(&painter);
        assert_eq!(engine.canvas().width_scale(), 1.0);

        engine.on_touch(&TouchEvent::pressed(pos2(15.0, 10.0)));
        engine.set_location(1500.0, 100.0, None, None);
        engine.set_selector_mode();
        engine.paint(&painter);
        let scale = engine.canvas().width_scale();
        assert!(scale < 1.0);
        assert_eq!(engine.canvas().height_scale(), scale);
    }
}
