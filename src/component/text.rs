use egui::{Align2, Color32, Painter, Vec2, pos2, vec2};
use serde::{Deserialize, Serialize};

use super::{Frame, ResizeDriver, Variant};
use crate::canvas::{Canvas, FontMetrics};

/// Measured to size the box independently of the actual content
const REFERENCE_TEXT: &str = "REFERENCE_TEXT";
const MIN_TEXT_WIDTH: f32 = 20.0;
const MIN_TEXT_HEIGHT: f32 = 10.0;

pub const DEFAULT_FONT_FAMILY: &str = "Proportional";
pub const DEFAULT_TEXT_SIZE: f32 = 42.0;

/// A wrapped line and its measured width
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub value: String,
    pub width: f32,
}

/// A block of text word-wrapped to the component width
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    text: String,
    font_family: String,
    text_size: f32,
    #[serde(skip)]
    lines: Vec<TextLine>,
    #[serde(skip)]
    minimum: Vec2,
}

impl TextContent {
    pub(crate) fn new(frame: &mut Frame, canvas: &Canvas) -> Self {
        frame.x = 40.0;
        frame.y = 40.0;
        frame.width = 100.0;
        frame.height = 40.0;
        frame.color = Color32::BLACK;
        frame.stroke_width = 1.0;

        let mut content = Self {
            text: String::new(),
            font_family: DEFAULT_FONT_FAMILY.to_string(),
            text_size: DEFAULT_TEXT_SIZE,
            lines: Vec::new(),
            minimum: Vec2::ZERO,
        };
        content.update_minimum_dimensions(frame, canvas.fonts(), false);
        content
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn text_size(&self) -> f32 {
        self.text_size
    }

    pub fn lines(&self) -> &[TextLine] {
        &self.lines
    }

    /// Size of one reference row in the current font
    pub fn minimum_size(&self) -> Vec2 {
        self.minimum
    }

    pub(crate) fn set_text(&mut self, value: &str, frame: &mut Frame, canvas: &Canvas) {
        self.text = value.to_string();
        frame.session.is_initialized = !value.is_empty();
        frame.is_edited = !value.is_empty();
        self.update_minimum_dimensions(frame, canvas.fonts(), false);
        canvas.invalidate();
    }

    pub(crate) fn set_text_size(&mut self, size: f32, frame: &mut Frame, canvas: &Canvas) {
        self.text_size = size;
        frame.is_edited = true;
        self.update_minimum_dimensions(frame, canvas.fonts(), false);
        canvas.invalidate();
    }

    pub(crate) fn set_font_family(&mut self, family: &str, frame: &mut Frame, canvas: &Canvas) {
        self.font_family = family.to_string();
        frame.is_edited = true;
        self.update_minimum_dimensions(frame, canvas.fonts(), false);
        canvas.invalidate();
    }

    pub(crate) fn copy_options(&mut self, source: &TextContent, frame: &mut Frame, canvas: &Canvas) {
        self.set_text_size(source.text_size, frame, canvas);
        self.set_font_family(&source.font_family, frame, canvas);
    }

    pub(crate) fn copy_content(&mut self, source: &TextContent, frame: &mut Frame, canvas: &Canvas) {
        self.copy_options(source, frame, canvas);
        self.set_text(&source.text, frame, canvas);
    }

    /// Recompute the minimum box and the wrapped lines.
    ///
    /// A content or font change shrinks the height back to what the lines need;
    /// a resize keeps at least the height the user dragged to.
    fn update_minimum_dimensions(&mut self, frame: &mut Frame, fonts: &FontMetrics, keep_height: bool) {
        let font_id = fonts.font_id(&self.font_family, self.text_size);
        let reference = fonts.measure(REFERENCE_TEXT, &font_id);

        self.minimum = vec2(reference.x.max(MIN_TEXT_WIDTH), reference.y.max(MIN_TEXT_HEIGHT));
        frame.width = frame.width.max(self.minimum.x);

        self.lines = split_lines(&self.text, frame.width, |s| fonts.text_width(s, &font_id));

        frame.height = if keep_height {
            frame.height.max(self.minimum.y)
        } else {
            self.minimum.y
        };
        frame.height = frame.height.max(self.lines.len() as f32 * self.minimum.y);
    }
}

impl Variant for TextContent {
    fn initialize(&mut self, frame: &mut Frame, canvas: &Canvas) {
        self.update_minimum_dimensions(frame, canvas.fonts(), true);
    }

    fn handle_scale(&mut self, frame: &mut Frame, canvas: &Canvas, _driver: ResizeDriver) {
        self.update_minimum_dimensions(frame, canvas.fonts(), true);
    }

    fn handle_draw(&mut self, frame: &mut Frame, painter: &Painter, canvas: &Canvas) {
        if !frame.is_visible || self.text.trim().is_empty() || self.lines.is_empty() {
            return;
        }

        let font_id = canvas
            .fonts()
            .font_id(&self.font_family, self.text_size * canvas.zoom());
        let area = frame.rect();
        let mut y = area.center().y - self.lines.len() as f32 * self.minimum.y / 2.0;

        for line in &self.lines {
            y += self.minimum.y;
            let x = area.center().x - line.width / 2.0;
            painter.text(
                canvas.to_screen(pos2(x, y)),
                Align2::LEFT_BOTTOM,
                &line.value,
                font_id.clone(),
                frame.color,
            );
        }
    }
}

/// Greedy word wrap. Each word keeps its trailing space; explicit newlines always break.
fn split_lines(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<TextLine> {
    if text.is_empty() {
        return Vec::new();
    }

    let space_width = measure(" ");
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut width = 0.0;

        for word in paragraph.split(' ') {
            let word_width = measure(word);
            if !current.is_empty() && width + word_width > max_width {
                lines.push(TextLine {
                    value: std::mem::take(&mut current),
                    width,
                });
                width = 0.0;
            }
            current.push_str(word);
            current.push(' ');
            width += word_width + space_width;
        }

        lines.push(TextLine { value: current, width });
    }

    lines
}
