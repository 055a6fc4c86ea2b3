use std::cell::Cell;

use egui::epaint::text::Fonts;
use egui::{Context, FontDefinitions, FontFamily, FontId, Pos2, Rect, Vec2, pos2, vec2};

use crate::scale::{Range, Scale};

/// Upper bound for the metrics-only font atlas; nothing is ever uploaded from it
const METRICS_TEXTURE_SIDE: usize = 2048;

/// Font measurement independent of any running egui frame.
///
/// Metrics are taken at one pixel per point so that sizes are expressed in the
/// canvas' logical units.
pub struct FontMetrics {
    fonts: Fonts,
    families: Vec<FontFamily>,
}

impl FontMetrics {
    pub fn new() -> Self {
        let definitions = FontDefinitions::default();
        let families = definitions.families.keys().cloned().collect();
        Self {
            fonts: Fonts::new(1.0, METRICS_TEXTURE_SIDE, definitions),
            families,
        }
    }

    /// Map a persisted family name onto a family the font set knows about.
    /// Unknown names fall back to the proportional family.
    pub fn resolve_family(&self, name: &str) -> FontFamily {
        self.families
            .iter()
            .find(|family| family.to_string().eq_ignore_ascii_case(name))
            .cloned()
            .unwrap_or(FontFamily::Proportional)
    }

    pub fn family_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.families.iter().map(|f| f.to_string()).collect();
        names.sort();
        names
    }

    pub fn font_id(&self, family: &str, size: f32) -> FontId {
        FontId::new(size, self.resolve_family(family))
    }

    pub fn text_width(&self, text: &str, font_id: &FontId) -> f32 {
        text.chars().map(|c| self.fonts.glyph_width(font_id, c)).sum()
    }

    pub fn row_height(&self, font_id: &FontId) -> f32 {
        self.fonts.row_height(font_id)
    }

    /// Single-line extent of `text`
    pub fn measure(&self, text: &str, font_id: &FontId) -> Vec2 {
        vec2(self.text_width(text, font_id), self.row_height(font_id))
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMetrics")
            .field("families", &self.families)
            .finish_non_exhaustive()
    }
}

/// The paint surface a drawing engine renders into.
///
/// Components live in logical units: device pixels divided by the current
/// canvas scale. Touch locations arrive in view points relative to the
/// canvas origin and are converted with [`Canvas::convert_to_pixel`].
pub struct Canvas {
    view_rect: Rect,
    pixels_per_point: f32,
    width_scale: f32,
    height_scale: f32,
    repaint_requested: Cell<bool>,
    ctx: Option<Context>,
    fonts: FontMetrics,
}

impl Canvas {
    /// Create a canvas of `view_size` points anchored at the origin
    pub fn new(view_size: Vec2, pixels_per_point: f32) -> Self {
        Self {
            view_rect: Rect::from_min_size(Pos2::ZERO, view_size),
            pixels_per_point,
            width_scale: 1.0,
            height_scale: 1.0,
            repaint_requested: Cell::new(false),
            ctx: None,
            fonts: FontMetrics::new(),
        }
    }

    /// Attach an egui context so invalidation wakes up the host's render loop
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = Some(ctx);
        self
    }

    /// Update the on-screen placement of the canvas, called by the host every frame
    pub fn set_view(&mut self, rect: Rect, pixels_per_point: f32) {
        self.view_rect = rect;
        self.pixels_per_point = pixels_per_point;
    }

    pub fn view_rect(&self) -> Rect {
        self.view_rect
    }

    pub fn pixels_per_point(&self) -> f32 {
        self.pixels_per_point
    }

    /// Size of the surface in device pixels
    pub fn pixel_size(&self) -> Vec2 {
        self.view_rect.size() * self.pixels_per_point
    }

    /// Logical width of the surface under the current scale
    pub fn width(&self) -> f32 {
        self.pixel_size().x / self.width_scale
    }

    /// Logical height of the surface under the current scale
    pub fn height(&self) -> f32 {
        self.pixel_size().y / self.height_scale
    }

    pub fn width_scale(&self) -> f32 {
        self.width_scale
    }

    pub fn height_scale(&self) -> f32 {
        self.height_scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.width_scale = scale;
        self.height_scale = scale;
    }

    /// Convert a view location (points, relative to the canvas origin) into logical units
    pub fn convert_to_pixel(&self, location: Pos2) -> Pos2 {
        let view = self.view_rect.size();
        if view.x <= 0.0 || view.y <= 0.0 {
            return location;
        }

        let x_scale = Scale::new(Range::new(0.0, view.x), Range::new(0.0, self.width()));
        let y_scale = Scale::new(Range::new(0.0, view.y), Range::new(0.0, self.height()));

        pos2(
            x_scale.convert_to_output_range(location.x),
            y_scale.convert_to_output_range(location.y),
        )
    }

    /// Points per logical unit when painting
    pub fn zoom(&self) -> f32 {
        self.width_scale / self.pixels_per_point
    }

    /// Map a logical position to absolute screen points for an egui painter
    pub fn to_screen(&self, point: Pos2) -> Pos2 {
        pos2(
            self.view_rect.min.x + point.x * self.width_scale / self.pixels_per_point,
            self.view_rect.min.y + point.y * self.height_scale / self.pixels_per_point,
        )
    }

    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        Rect::from_min_max(self.to_screen(rect.min), self.to_screen(rect.max))
    }

    /// Request a repaint. Repeated requests before the next paint coalesce.
    pub fn invalidate(&self) {
        self.repaint_requested.set(true);
        if let Some(ctx) = &self.ctx {
            ctx.request_repaint();
        }
    }

    /// Returns whether a repaint was requested since the last call
    pub fn take_repaint_request(&self) -> bool {
        self.repaint_requested.replace(false)
    }

    pub fn context(&self) -> Option<&Context> {
        self.ctx.as_ref()
    }

    pub fn fonts(&self) -> &FontMetrics {
        &self.fonts
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("view_rect", &self.view_rect)
            .field("pixels_per_point", &self.pixels_per_point)
            .field("width_scale", &self.width_scale)
            .field("height_scale", &self.height_scale)
            .field("repaint_requested", &self.repaint_requested.get())
            .finish_non_exhaustive()
    }
}
