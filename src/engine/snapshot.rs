use std::io::{Cursor, Write};

use egui::{ColorImage, Context, Rect, UserData, ViewportCommand};
use futures::channel::oneshot;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};

use super::DrawingEngine;
use crate::error::{SnapshotError, SnapshotResult};

/// A snapshot waiting for the host to deliver a screenshot
#[derive(Debug)]
pub(crate) struct PendingSnapshot {
    thumbnail_size: Option<u32>,
    sender: oneshot::Sender<SnapshotResult<Vec<u8>>>,
    requested: bool,
}

impl PendingSnapshot {
    /// Ask the viewport for a screenshot, once
    pub(crate) fn request(&mut self, ctx: &Context) {
        if !self.requested {
            ctx.send_viewport_cmd(ViewportCommand::Screenshot(UserData::default()));
            self.requested = true;
        }
    }
}

/// Completes with the PNG bytes of a requested snapshot
#[derive(Debug)]
pub struct SnapshotTicket {
    receiver: oneshot::Receiver<SnapshotResult<Vec<u8>>>,
}

impl SnapshotTicket {
    /// Wait for the snapshot and write it out. Returns whether it was written.
    pub async fn save_to(self, mut writer: impl Write) -> bool {
        let result = match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(SnapshotError::Cancelled),
        };

        match result.and_then(|bytes| Ok(writer.write_all(&bytes)?)) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Failed to save snapshot: {}", err);
                false
            }
        }
    }

    /// Non-blocking check, for hosts polling once per frame
    pub fn poll_ready(&mut self) -> Option<SnapshotResult<Vec<u8>>> {
        match self.receiver.try_recv() {
            Ok(result) => result,
            Err(_) => Some(Err(SnapshotError::Cancelled)),
        }
    }
}

impl DrawingEngine {
    /// Commit the current edit and capture the canvas on the next paint.
    ///
    /// With a `thumbnail_size` the capture is centre-cropped to a square and
    /// downsampled to that edge length.
    pub fn request_snapshot(&mut self, thumbnail_size: Option<u32>) -> SnapshotTicket {
        self.clear_component();

        let (sender, receiver) = oneshot::channel();
        if self.snapshot.is_some() {
            log::debug!("replacing pending snapshot request");
        }
        self.snapshot = Some(PendingSnapshot {
            thumbnail_size: thumbnail_size.filter(|size| *size > 0),
            sender,
            requested: false,
        });
        self.canvas.invalidate();

        SnapshotTicket { receiver }
    }

    pub fn has_pending_snapshot(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Fulfil the pending snapshot from a screenshot of the whole viewport
    pub fn on_screenshot(&mut self, screenshot: &ColorImage) {
        let Some(pending) = self.snapshot.take() else {
            return;
        };

        let region = self.canvas.view_rect();
        let result = encode_snapshot(
            screenshot,
            region,
            self.canvas.pixels_per_point(),
            pending.thumbnail_size,
        );
        if let Err(err) = &result {
            log::warn!("Snapshot failed: {}", err);
        }
        if pending.sender.send(result).is_err() {
            log::debug!("snapshot ticket dropped before completion");
        }
    }
}

fn encode_snapshot(
    screenshot: &ColorImage,
    region: Rect,
    pixels_per_point: f32,
    thumbnail_size: Option<u32>,
) -> SnapshotResult<Vec<u8>> {
    let [width, height] = screenshot.size;
    let mut image = RgbaImage::new(width as u32, height as u32);
    for (pixel, color) in image.pixels_mut().zip(&screenshot.pixels) {
        *pixel = Rgba(color.to_srgba_unmultiplied());
    }

    let clamp = |value: f32, max: usize| (value * pixels_per_point).round().clamp(0.0, max as f32) as u32;
    let (x0, y0) = (clamp(region.min.x, width), clamp(region.min.y, height));
    let (x1, y1) = (clamp(region.max.x, width), clamp(region.max.y, height));
    if x1 <= x0 || y1 <= y0 {
        return Err(SnapshotError::EmptyImage);
    }
    let mut image = imageops::crop_imm(&image, x0, y0, x1 - x0, y1 - y0).to_image();

    if let Some(size) = thumbnail_size {
        let side = image.width().min(image.height());
        let square = imageops::crop_imm(
            &image,
            (image.width() - side) / 2,
            (image.height() - side) / 2,
            side,
            side,
        )
        .to_image();
        image = imageops::resize(&square, size, size, FilterType::Lanczos3);
    }

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
