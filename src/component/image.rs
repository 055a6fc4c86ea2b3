use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use egui::{Color32, ColorImage, Painter, Rect, TextureHandle, TextureOptions, pos2};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use super::common::IMAGE_PADDING;
use super::{Frame, ResizeDriver, Variant};
use crate::canvas::Canvas;
use crate::error::{ImageLoadError, ImageLoadResult};

/// A bitmap, persisted inline as base64-encoded image file bytes
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageContent {
    base64_image_data: String,
    lock_aspect_ratio: bool,
    #[serde(skip)]
    bitmap: Option<Arc<RgbaImage>>,
    #[serde(skip)]
    texture: Option<TextureHandle>,
    #[serde(skip)]
    load_generation: u64,
}

impl Default for ImageContent {
    fn default() -> Self {
        Self {
            base64_image_data: String::new(),
            lock_aspect_ratio: true,
            bitmap: None,
            texture: None,
            load_generation: 0,
        }
    }
}

impl std::fmt::Debug for ImageContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageContent")
            .field("payload_len", &self.base64_image_data.len())
            .field("lock_aspect_ratio", &self.lock_aspect_ratio)
            .field("bitmap", &self.bitmap_size())
            .field("load_generation", &self.load_generation)
            .finish()
    }
}

impl ImageContent {
    pub fn base64_image_data(&self) -> &str {
        &self.base64_image_data
    }

    pub fn lock_aspect_ratio(&self) -> bool {
        self.lock_aspect_ratio
    }

    pub fn has_bitmap(&self) -> bool {
        self.bitmap.is_some()
    }

    /// Native size of the decoded bitmap in pixels
    pub fn bitmap_size(&self) -> Option<(u32, u32)> {
        self.bitmap.as_ref().map(|b| b.dimensions())
    }

    pub(crate) fn load_generation(&self) -> u64 {
        self.load_generation
    }

    pub(crate) fn set_lock_aspect_ratio(&mut self, lock: bool, frame: &mut Frame, canvas: &Canvas) {
        self.lock_aspect_ratio = lock;
        if lock {
            self.aspect_scale(frame, ResizeDriver::Dominant);
            canvas.invalidate();
        }
    }

    pub(crate) fn copy_content(&mut self, source: &ImageContent) {
        self.bitmap = source.bitmap.clone();
        self.texture = source.texture.clone();
        self.base64_image_data = source.base64_image_data.clone();
        self.lock_aspect_ratio = source.lock_aspect_ratio;
    }

    /// Drop the current bitmap ahead of a new load and return the load's generation
    pub(crate) fn begin_load(&mut self, frame: &mut Frame, canvas: &Canvas) -> u64 {
        self.bitmap = None;
        self.texture = None;
        self.load_generation += 1;
        frame.session.is_initialized = false;
        frame.is_edited = true;
        canvas.invalidate();
        self.load_generation
    }

    /// Decode `bytes` if `generation` is still the newest load
    pub(crate) fn apply_bytes(
        &mut self,
        generation: u64,
        bytes: &[u8],
        frame: &mut Frame,
        canvas: &Canvas,
    ) -> ImageLoadResult<()> {
        if generation != self.load_generation {
            return Err(ImageLoadError::Superseded);
        }

        let bitmap = image::load_from_memory(bytes)?.to_rgba8();
        log::debug!("decoded {}x{} image", bitmap.width(), bitmap.height());

        self.base64_image_data = STANDARD.encode(bytes);
        self.bitmap = Some(Arc::new(bitmap));
        self.texture = None;
        self.reset_scale(frame, canvas);
        canvas.invalidate();
        Ok(())
    }

    fn load_saved(&mut self, frame: &mut Frame) -> ImageLoadResult<()> {
        let bytes = STANDARD.decode(&self.base64_image_data)?;
        let bitmap = image::load_from_memory(&bytes)?.to_rgba8();
        self.bitmap = Some(Arc::new(bitmap));
        self.texture = None;
        frame.session.is_initialized = true;
        Ok(())
    }

    /// Fit the bitmap inside the canvas minus padding, keeping its aspect ratio,
    /// then nudge the frame so the whole image is visible.
    pub(crate) fn reset_scale(&mut self, frame: &mut Frame, canvas: &Canvas) {
        let Some((bitmap_width, bitmap_height)) = self.bitmap_size() else {
            return;
        };
        let (bitmap_width, bitmap_height) = (bitmap_width as f32, bitmap_height as f32);

        let max_width = canvas.width() - IMAGE_PADDING * 2.0;
        let max_height = canvas.height() - IMAGE_PADDING * 2.0;

        frame.width = bitmap_width;
        frame.height = bitmap_height;
        frame.session.is_initialized = true;
        frame.is_edited = true;

        if frame.width > max_width {
            frame.width = max_width;
            frame.height = max_width * bitmap_height / bitmap_width;
        }
        if frame.height > max_height {
            frame.width = max_height * bitmap_width / bitmap_height;
            frame.height = max_height;
        }

        let overflow = frame.x + frame.width - (max_width + IMAGE_PADDING);
        if overflow > 0.0 {
            frame.x -= overflow;
        }
        let overflow = frame.y + frame.height - (max_height + IMAGE_PADDING);
        if overflow > 0.0 {
            frame.y -= overflow;
        }

        frame.x = frame.x.max(IMAGE_PADDING);
        frame.y = frame.y.max(IMAGE_PADDING);
    }

    fn aspect_scale(&self, frame: &mut Frame, driver: ResizeDriver) {
        if !self.lock_aspect_ratio {
            return;
        }
        let Some((bitmap_width, bitmap_height)) = self.bitmap_size() else {
            return;
        };
        let ratio = bitmap_height as f32 / bitmap_width as f32;

        let width_drives = match driver {
            ResizeDriver::Width => true,
            ResizeDriver::Height => false,
            ResizeDriver::Dominant => bitmap_width > bitmap_height,
        };
        if width_drives {
            frame.height = frame.width * ratio;
        } else {
            frame.width = frame.height / ratio;
        }
    }
}

impl Variant for ImageContent {
    fn initialize(&mut self, frame: &mut Frame, _canvas: &Canvas) {
        if self.base64_image_data.is_empty() {
            return;
        }
        if let Err(err) = self.load_saved(frame) {
            log::warn!("Failed to restore saved image: {}", err);
        }
    }

    fn handle_scale(&mut self, frame: &mut Frame, _canvas: &Canvas, driver: ResizeDriver) {
        if !frame.session.is_initialized || !frame.session.is_current {
            return;
        }
        self.aspect_scale(frame, driver);
    }

    fn handle_draw(&mut self, frame: &mut Frame, painter: &Painter, canvas: &Canvas) {
        let Some(bitmap) = self.bitmap.clone() else {
            return;
        };
        if !frame.is_visible {
            return;
        }

        if frame.width < 0.0 || frame.height < 0.0 {
            self.reset_scale(frame, canvas);
        }

        let texture = self.texture.get_or_insert_with(|| {
            let size = [bitmap.width() as usize, bitmap.height() as usize];
            painter.ctx().load_texture(
                "image-component",
                ColorImage::from_rgba_unmultiplied(size, bitmap.as_raw()),
                TextureOptions::LINEAR,
            )
        });

        painter.image(
            texture.id(),
            canvas.rect_to_screen(frame.rect()),
            Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
            Color32::WHITE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;
    use egui::vec2;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let image = RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]));
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn loaded(width: u32, height: u32, canvas: &Canvas) -> (ImageContent, Frame) {
        let mut frame = Frame::new(ComponentKind::Image);
        let mut content = ImageContent::default();
        let generation = content.begin_load(&mut frame, canvas);
        content
            .apply_bytes(generation, &png_bytes(width, height), &mut frame, canvas)
            .unwrap();
        (content, frame)
    }

    #[test]
    fn test_small_image_keeps_native_size() {
        let canvas = Canvas::new(vec2(800.0, 600.0), 1.0);
        let (content, frame) = loaded(200, 100, &canvas);
        assert_eq!(content.bitmap_size(), Some((200, 100)));
        assert_eq!((frame.width, frame.height), (200.0, 100.0));
        assert!(frame.session.is_initialized);
        assert!(!content.base64_image_data().is_empty());
    }

    #[test]
    fn test_large_image_fits_inside_padding() {
        let canvas = Canvas::new(vec2(320.0, 400.0), 1.0);
        let (_, frame) = loaded(600, 300, &canvas);
        assert_eq!(frame.width, 300.0);
        assert_eq!(frame.height, 150.0);
        assert_eq!(frame.x, 10.0);
        assert_eq!(frame.y, 10.0);
    }

    #[test]
    fn test_overflowing_position_is_pulled_back() {
        let canvas = Canvas::new(vec2(400.0, 400.0), 1.0);
        let mut frame = Frame::new(ComponentKind::Image);
        frame.x = 350.0;
        frame.y = 5.0;
        let mut content = ImageContent::default();
        let generation = content.begin_load(&mut frame, &canvas);
        content
            .apply_bytes(generation, &png_bytes(100, 50), &mut frame, &canvas)
            .unwrap();
        assert_eq!(frame.x, 290.0);
        assert_eq!(frame.y, 10.0);
    }

    #[test]
    fn test_superseded_load_is_rejected() {
        let canvas = Canvas::new(vec2(800.0, 600.0), 1.0);
        let mut frame = Frame::new(ComponentKind::Image);
        let mut content = ImageContent::default();

        let first = content.begin_load(&mut frame, &canvas);
        let second = content.begin_load(&mut frame, &canvas);
        let result = content.apply_bytes(first, &png_bytes(10, 10), &mut frame, &canvas);
        assert!(matches!(result, Err(ImageLoadError::Superseded)));
        assert!(!content.has_bitmap());

        content
            .apply_bytes(second, &png_bytes(30, 20), &mut frame, &canvas)
            .unwrap();
        assert_eq!(content.bitmap_size(), Some((30, 20)));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let canvas = Canvas::new(vec2(800.0, 600.0), 1.0);
        let mut frame = Frame::new(ComponentKind::Image);
        let mut content = ImageContent::default();
        let generation = content.begin_load(&mut frame, &canvas);
        let result = content.apply_bytes(generation, b"not an image", &mut frame, &canvas);
        assert!(matches!(result, Err(ImageLoadError::Decode(_))));
    }

    #[test]
    fn test_aspect_lock_follows_driver() {
        let canvas = Canvas::new(vec2(800.0, 600.0), 1.0);
        let (content, mut frame) = loaded(200, 100, &canvas);

        frame.height = 50.0;
        content.aspect_scale(&mut frame, ResizeDriver::Height);
        assert_eq!(frame.width, 100.0);

        frame.width = 300.0;
        content.aspect_scale(&mut frame, ResizeDriver::Dominant);
        assert_eq!(frame.height, 150.0);
    }

    #[test]
    fn test_saved_payload_restores_bitmap() {
        let canvas = Canvas::new(vec2(800.0, 600.0), 1.0);
        let (content, _) = loaded(40, 30, &canvas);

        let mut restored = ImageContent {
            base64_image_data: content.base64_image_data().to_string(),
            ..Default::default()
        };
        let mut frame = Frame::new(ComponentKind::Image);
        restored.initialize(&mut frame, &canvas);
        assert_eq!(restored.bitmap_size(), Some((40, 30)));
        assert!(frame.session.is_initialized);
    }
}
