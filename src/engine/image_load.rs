use std::io::Read;

use futures::channel::oneshot;
use futures::io::{AsyncRead, AsyncReadExt};

use super::DrawingEngine;
use crate::component::ComponentKind;
use crate::error::ImageLoadResult;
use crate::event::EngineEvent;
use crate::id_generator::ComponentId;

/// Identifies one image load request. Only the newest request for a component applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLoadTicket {
    component: ComponentId,
    generation: u64,
}

impl ImageLoadTicket {
    pub fn component(&self) -> ComponentId {
        self.component
    }
}

impl DrawingEngine {
    /// Clear the active image and start a load. `None` when no image is active.
    pub fn begin_image_load(&mut self) -> Option<ImageLoadTicket> {
        let (component, canvas) = self.active_parts_of(ComponentKind::Image)?;
        let generation = component.begin_image_load(canvas)?;
        let ticket = ImageLoadTicket {
            component: component.id(),
            generation,
        };
        self.is_dirty = true;
        Some(ticket)
    }

    /// Whether `ticket` is still the newest load of its component
    pub fn is_image_load_current(&self, ticket: &ImageLoadTicket) -> bool {
        let component = match self.active_component() {
            Some(active) if active.id() == ticket.component => Some(active),
            _ => self.component(ticket.component),
        };
        component.and_then(|c| c.image_load_generation()) == Some(ticket.generation)
    }

    /// Decode `bytes` into the ticket's component. Returns whether the image was applied.
    pub fn complete_image_load(&mut self, ticket: ImageLoadTicket, bytes: &[u8]) -> bool {
        let Some((component, canvas)) = self.component_parts(ticket.component) else {
            log::warn!("Image load finished for a component that no longer exists");
            return false;
        };

        match component.apply_image_bytes(ticket.generation, bytes, canvas) {
            Ok(()) => {
                self.events.emit(EngineEvent::ComponentUpdated {
                    kind: ComponentKind::Image,
                });
                true
            }
            Err(err) => {
                log::warn!("Failed to load image: {}", err);
                false
            }
        }
    }

    /// Load the active image from a byte stream
    pub async fn set_image_stream<R: AsyncRead + Unpin>(&mut self, mut reader: R) -> bool {
        let Some(ticket) = self.begin_image_load() else {
            return false;
        };

        let mut bytes = Vec::new();
        if let Err(err) = reader.read_to_end(&mut bytes).await {
            log::warn!("Failed to read image stream: {}", err);
            return false;
        }
        self.complete_image_load(ticket, &bytes)
    }

    /// Download and load the active image
    pub async fn set_image_url(&mut self, url: &str) -> bool {
        let Some(ticket) = self.begin_image_load() else {
            return false;
        };

        match fetch_url(url).await {
            Ok(Ok(bytes)) => self.complete_image_load(ticket, &bytes),
            Ok(Err(err)) => {
                log::warn!("Failed to download {}: {}", url, err);
                false
            }
            Err(_) => {
                log::warn!("Download of {} was cancelled", url);
                false
            }
        }
    }
}

/// Fetch `url` on a background thread
pub fn fetch_url(url: &str) -> oneshot::Receiver<ImageLoadResult<Vec<u8>>> {
    let (sender, receiver) = oneshot::channel();
    let url = url.to_string();

    std::thread::spawn(move || {
        log::debug!("downloading {}", url);
        let result = download(&url);
        if sender.send(result).is_err() {
            log::debug!("download of {} no longer awaited", url);
        }
    });

    receiver
}

fn download(url: &str) -> ImageLoadResult<Vec<u8>> {
    let response = ureq::get(url)
        .set("User-Agent", "sketch-layers")
        .call()
        .map_err(Box::new)?;

    let mut bytes = Vec::new();
    response.into_reader().read_to_end(&mut bytes)?;
    Ok(bytes)
}
