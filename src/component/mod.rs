use egui::{Color32, Painter, Pos2, Rect, Shape, Stroke, Vec2, pos2, vec2};
use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::error::ImageLoadResult;
use crate::id_generator::ComponentId;
use crate::input::{TouchEvent, TouchPhase};

mod common;
pub(crate) mod image;
pub(crate) mod ink;
pub(crate) mod text;

pub use common::{IMAGE_PADDING, INK_HIT_TOLERANCE, MIN_SCALED_SIZE, SCALE_HANDLE_RADIUS};
pub use self::image::ImageContent;
pub use ink::{InkContent, encode_paths, parse_paths};
pub use text::{TextContent, TextLine};

/// The variant of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Ink,
    Text,
    Image,
}

impl ComponentKind {
    pub fn allows_scaling(&self) -> bool {
        !matches!(self, ComponentKind::Ink)
    }

    /// Whether a fresh component shows its bounding box while current
    pub fn draws_bounding_box(&self) -> bool {
        !matches!(self, ComponentKind::Ink)
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComponentKind::Ink => write!(f, "ink"),
            ComponentKind::Text => write!(f, "text"),
            ComponentKind::Image => write!(f, "image"),
        }
    }
}

/// What a component asks of its engine after handling a touch
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComponentAction {
    /// The component finished its action; the engine starts a new one at this logical location
    Completed(Pos2),
    /// The component changed shape or content
    Updated,
}

/// Which dimension drives the other when an image keeps its aspect ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResizeDriver {
    /// The bitmap's longer side drives
    Dominant,
    Width,
    Height,
}

/// Transient edit-session state, never persisted
#[derive(Debug, Clone, Default)]
pub(crate) struct Session {
    pub is_initialized: bool,
    pub is_current: bool,
    pub draw_bounding_box: bool,
    pub is_translating: bool,
    pub is_scaling: bool,
    pub start_point: Pos2,
}

/// Geometry and style shared by every variant, in logical units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: Color32,
    pub stroke_width: f32,
    pub is_edited: bool,
    pub is_visible: bool,
    #[serde(skip)]
    pub(crate) session: Session,
}

impl Frame {
    fn new(kind: ComponentKind) -> Self {
        Self {
            x: 10.0,
            y: 10.0,
            width: 100.0,
            height: 100.0,
            color: Color32::BLUE,
            stroke_width: 4.0,
            is_edited: false,
            is_visible: true,
            session: Session {
                is_current: true,
                draw_bounding_box: kind.draws_bounding_box(),
                ..Session::default()
            },
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_min_size(pos2(self.x, self.y), vec2(self.width, self.height))
    }
}

/// Variant payload of a component, tagged by type when persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Content {
    Ink(InkContent),
    Text(TextContent),
    Image(ImageContent),
}

/// Variant-specific hooks invoked by the shared component logic
pub(crate) trait Variant {
    fn initialize(&mut self, _frame: &mut Frame, _canvas: &Canvas) {}

    /// Touches not consumed by the move/resize affordance
    fn handle_touch(&mut self, event: &TouchEvent, _frame: &mut Frame, canvas: &Canvas) -> Option<ComponentAction> {
        (event.phase == TouchPhase::Released).then(|| ComponentAction::Completed(canvas.convert_to_pixel(event.location)))
    }

    fn handle_scale(&mut self, _frame: &mut Frame, _canvas: &Canvas, _driver: ResizeDriver) {}

    fn handle_translate(&mut self, _delta: Vec2) {}

    fn handle_draw(&mut self, frame: &mut Frame, painter: &Painter, canvas: &Canvas);

    /// `None` defers to bounding-box containment
    fn contains(&self, _frame: &Frame, _point: Pos2) -> Option<bool> {
        None
    }
}

impl Content {
    fn kind(&self) -> ComponentKind {
        match self {
            Content::Ink(_) => ComponentKind::Ink,
            Content::Text(_) => ComponentKind::Text,
            Content::Image(_) => ComponentKind::Image,
        }
    }

    fn variant_mut(&mut self) -> &mut dyn Variant {
        match self {
            Content::Ink(ink) => ink,
            Content::Text(text) => text,
            Content::Image(image) => image,
        }
    }

    fn variant(&self) -> &dyn Variant {
        match self {
            Content::Ink(ink) => ink,
            Content::Text(text) => text,
            Content::Image(image) => image,
        }
    }
}

/// One annotation unit on the canvas: an ink stroke set, a text block or an image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    id: ComponentId,
    #[serde(flatten)]
    frame: Frame,
    previous_version: Option<ComponentId>,
    display_order: u32,
    content: Content,
}

impl Component {
    /// Factory keyed by variant
    pub fn create(kind: ComponentKind, canvas: &Canvas) -> Self {
        let mut frame = Frame::new(kind);
        let content = match kind {
            ComponentKind::Ink => Content::Ink(InkContent::default()),
            ComponentKind::Text => Content::Text(TextContent::new(&mut frame, canvas)),
            ComponentKind::Image => Content::Image(ImageContent::default()),
        };

        Self {
            id: ComponentId::generate(),
            frame,
            previous_version: None,
            display_order: 0,
            content,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn kind(&self) -> ComponentKind {
        self.content.kind()
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn as_ink(&self) -> Option<&InkContent> {
        match &self.content {
            Content::Ink(ink) => Some(ink),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextContent> {
        match &self.content {
            Content::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_image(&self) -> Option<&ImageContent> {
        match &self.content {
            Content::Image(image) => Some(image),
            _ => None,
        }
    }

    pub fn x(&self) -> f32 {
        self.frame.x
    }

    pub fn y(&self) -> f32 {
        self.frame.y
    }

    pub fn width(&self) -> f32 {
        self.frame.width
    }

    pub fn height(&self) -> f32 {
        self.frame.height
    }

    pub fn color(&self) -> Color32 {
        self.frame.color
    }

    pub fn set_color(&mut self, color: Color32) {
        self.frame.color = color;
        self.frame.is_edited = true;
    }

    pub fn stroke_width(&self) -> f32 {
        self.frame.stroke_width
    }

    pub fn set_stroke_width(&mut self, width: f32) {
        self.frame.stroke_width = width;
        self.frame.is_edited = true;
    }

    pub fn previous_version(&self) -> Option<ComponentId> {
        self.previous_version
    }

    pub(crate) fn set_previous_version(&mut self, previous: Option<ComponentId>) {
        self.previous_version = previous;
    }

    pub fn display_order(&self) -> u32 {
        self.display_order
    }

    pub(crate) fn set_display_order(&mut self, order: u32) {
        self.display_order = order;
    }

    pub fn is_edited(&self) -> bool {
        self.frame.is_edited
    }

    pub(crate) fn set_edited(&mut self, edited: bool) {
        self.frame.is_edited = edited;
    }

    pub fn is_visible(&self) -> bool {
        self.frame.is_visible
    }

    pub fn hide(&mut self) {
        self.frame.is_visible = false;
    }

    pub fn show(&mut self) {
        self.frame.is_visible = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.frame.session.is_initialized
    }

    pub fn is_current(&self) -> bool {
        self.frame.session.is_current
    }

    pub fn allows_scaling(&self) -> bool {
        self.kind().allows_scaling()
    }

    /// Bind to a canvas after creation or deserialization
    pub fn initialize(&mut self, canvas: &Canvas) {
        self.frame.session.is_initialized = true;
        self.frame.session.is_current = false;
        self.frame.session.draw_bounding_box = self.kind().draws_bounding_box();
        self.content.variant_mut().initialize(&mut self.frame, canvas);
    }

    /// Show the selection affordance and accept move/resize gestures
    pub fn set_item_selected(&mut self) {
        let session = &mut self.frame.session;
        session.draw_bounding_box = true;
        session.is_current = true;
        session.is_initialized = true;
    }

    pub fn set_current(&mut self, current: bool) {
        self.frame.session.is_current = current;
    }

    /// Place the component; dimensions that are `None` or not positive stay unchanged
    pub fn set_location(&mut self, x: f32, y: f32, width: Option<f32>, height: Option<f32>, canvas: &Canvas) {
        let width = width.filter(|w| *w > 0.0);
        let height = height.filter(|h| *h > 0.0);

        self.frame.x = x;
        self.frame.y = y;
        if let Some(width) = width {
            self.frame.width = width;
        }
        if let Some(height) = height {
            self.frame.height = height;
        }

        let driver = match (width, height) {
            (Some(_), None) => ResizeDriver::Width,
            (None, Some(_)) => ResizeDriver::Height,
            _ => ResizeDriver::Dominant,
        };
        self.content.variant_mut().handle_scale(&mut self.frame, canvas, driver);
        canvas.invalidate();
    }

    /// End the edit session, dropping transient gesture state
    pub fn complete(&mut self) {
        let session = &mut self.frame.session;
        session.is_initialized = false;
        session.is_current = false;
        session.is_translating = false;
        session.is_scaling = false;
        self.frame.is_edited = false;
    }

    pub fn bounding_box(&self) -> Rect {
        self.frame.rect()
    }

    /// Square around the resize handle on the bottom-right corner
    pub fn scale_box(&self) -> Rect {
        Rect::from_center_size(self.frame.rect().right_bottom(), Vec2::splat(2.0 * SCALE_HANDLE_RADIUS))
    }

    pub fn contains(&self, point: Pos2) -> bool {
        self.content
            .variant()
            .contains(&self.frame, point)
            .unwrap_or_else(|| self.bounding_box().contains(point))
    }

    /// Route a touch through the move/resize affordance, or to the variant
    pub fn on_touch(&mut self, event: &TouchEvent, canvas: &Canvas) -> Option<ComponentAction> {
        let session = &self.frame.session;
        if !(session.draw_bounding_box && session.is_current && session.is_initialized) {
            return self.content.variant_mut().handle_touch(event, &mut self.frame, canvas);
        }

        match event.phase {
            TouchPhase::Pressed => {
                let start = canvas.convert_to_pixel(event.location);
                let scaling = self.allows_scaling() && self.scale_box().contains(start);
                let translating = !scaling && self.bounding_box().contains(start);

                let session = &mut self.frame.session;
                session.start_point = start;
                session.is_scaling = scaling;
                session.is_translating = translating;
                None
            }
            TouchPhase::Moved => {
                let point = canvas.convert_to_pixel(event.location);
                if point.x <= 0.0 || point.y <= 0.0 || point.x >= canvas.width() || point.y >= canvas.height() {
                    return None;
                }

                let delta = point - self.frame.session.start_point;
                if self.frame.session.is_translating {
                    self.frame.x += delta.x;
                    self.frame.y += delta.y;
                    self.content.variant_mut().handle_translate(delta);
                } else if self.frame.session.is_scaling {
                    self.frame.width = (self.frame.width + delta.x).max(MIN_SCALED_SIZE);
                    self.frame.height = (self.frame.height + delta.y).max(MIN_SCALED_SIZE);
                    self.content
                        .variant_mut()
                        .handle_scale(&mut self.frame, canvas, ResizeDriver::Dominant);
                } else {
                    return None;
                }

                self.frame.is_edited = true;
                self.frame.session.start_point = point;
                canvas.invalidate();
                None
            }
            TouchPhase::Released | TouchPhase::Cancelled => {
                let session = &mut self.frame.session;
                if !session.is_scaling && !session.is_translating {
                    return self.content.variant_mut().handle_touch(event, &mut self.frame, canvas);
                }

                session.is_scaling = false;
                session.is_translating = false;
                Some(ComponentAction::Updated)
            }
        }
    }

    pub fn draw(&mut self, painter: &Painter, canvas: &Canvas) {
        self.content.variant_mut().handle_draw(&mut self.frame, painter, canvas);

        if self.frame.session.draw_bounding_box && self.frame.session.is_current {
            self.draw_bounding_box(painter, canvas);
        }
    }

    fn draw_bounding_box(&self, painter: &Painter, canvas: &Canvas) {
        let rect = canvas.rect_to_screen(self.bounding_box());
        let outline = Stroke::new(1.0, Color32::BLACK);
        let corners = [
            rect.left_top(),
            rect.right_top(),
            rect.right_bottom(),
            rect.left_bottom(),
            rect.left_top(),
        ];
        painter.extend(Shape::dashed_line(&corners, outline, 4.0, 4.0));

        if !self.allows_scaling() {
            return;
        }

        let center = rect.right_bottom();
        let radius = SCALE_HANDLE_RADIUS * canvas.zoom();
        painter.circle(center, radius, Color32::from_rgba_unmultiplied(255, 255, 255, 153), outline);

        // diagonal double arrow
        let reach = Vec2::splat(radius * 0.45);
        painter.arrow(center, reach, outline);
        painter.arrow(center, -reach, outline);
    }

    /// Copy style so a new component continues the look of the last one of its kind
    pub fn copy_options(&mut self, source: &Component, canvas: &Canvas) {
        self.set_color(source.color());
        self.set_stroke_width(source.stroke_width());

        if let (Content::Text(text), Content::Text(source_text)) = (&mut self.content, &source.content) {
            text.copy_options(source_text, &mut self.frame, canvas);
        }
    }

    /// Copy the full state of `source`, used to produce a new version of it
    pub fn copy_component(&mut self, source: &Component, canvas: &Canvas) {
        self.set_location(source.x(), source.y(), None, None, canvas);
        self.set_color(source.color());
        self.set_stroke_width(source.stroke_width());
        self.frame.height = source.height();
        self.frame.width = source.width();

        match (&mut self.content, &source.content) {
            (Content::Ink(ink), Content::Ink(source_ink)) => ink.copy_paths(source_ink),
            (Content::Text(text), Content::Text(source_text)) => {
                text.copy_content(source_text, &mut self.frame, canvas);
            }
            (Content::Image(image), Content::Image(source_image)) => image.copy_content(source_image),
            _ => {}
        }
    }

    /// Replace the text of a text component. Returns `None` for other variants.
    pub fn set_text(&mut self, value: &str, canvas: &Canvas) -> Option<ComponentAction> {
        let Content::Text(text) = &mut self.content else {
            return None;
        };
        text.set_text(value, &mut self.frame, canvas);
        Some(ComponentAction::Updated)
    }

    pub fn set_text_size(&mut self, size: f32, canvas: &Canvas) -> bool {
        let Content::Text(text) = &mut self.content else {
            return false;
        };
        text.set_text_size(size, &mut self.frame, canvas);
        true
    }

    pub fn set_font_family(&mut self, family: &str, canvas: &Canvas) -> bool {
        let Content::Text(text) = &mut self.content else {
            return false;
        };
        text.set_font_family(family, &mut self.frame, canvas);
        true
    }

    pub fn set_lock_aspect_ratio(&mut self, lock: bool, canvas: &Canvas) -> bool {
        let Content::Image(image) = &mut self.content else {
            return false;
        };
        image.set_lock_aspect_ratio(lock, &mut self.frame, canvas);
        true
    }

    /// Drop the current bitmap and return the generation of the new load
    pub(crate) fn begin_image_load(&mut self, canvas: &Canvas) -> Option<u64> {
        let Content::Image(image) = &mut self.content else {
            return None;
        };
        Some(image.begin_load(&mut self.frame, canvas))
    }

    pub(crate) fn image_load_generation(&self) -> Option<u64> {
        self.as_image().map(|image| image.load_generation())
    }

    pub(crate) fn apply_image_bytes(&mut self, generation: u64, bytes: &[u8], canvas: &Canvas) -> ImageLoadResult<()> {
        match &mut self.content {
            Content::Image(image) => image.apply_bytes(generation, bytes, &mut self.frame, canvas),
            _ => Err(crate::error::ImageLoadError::Superseded),
        }
    }
}
