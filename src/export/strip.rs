// SPDX-License-Identifier: GPL-3.0-only

//! Photo strip export
//!
//! Captures are drawn at their slot rectangles on a canvas the size of the
//! template, then the template artwork is laid over them.

use super::ExportedFile;
use crate::constants::downloads;
use crate::errors::{AppError, AppResult, ExportError, PhotoError};
use crate::pipelines::photo::{CaptureSet, CapturedImage, encode_png};
use crate::storage::DownloadSink;
use crate::template::{FrameSlot, StripTemplate};
use futures::future::try_join_all;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::sync::Arc;
use tracing::{debug, info};

/// Builds `photobooth.png` from the session's captures
#[derive(Clone)]
pub struct StripExporter {
    sink: Arc<dyn DownloadSink>,
}

impl StripExporter {
    pub fn new(sink: Arc<dyn DownloadSink>) -> Self {
        Self { sink }
    }

    /// Composite the strip and deliver it
    pub async fn export(
        &self,
        template: &StripTemplate,
        captures: &CaptureSet,
    ) -> AppResult<ExportedFile> {
        let strip = render_strip(template, captures).await?;

        let png = tokio::task::spawn_blocking(move || encode_png(&strip))
            .await
            .map_err(|e| AppError::Other(format!("Encode task failed: {}", e)))??;

        let sink = Arc::clone(&self.sink);
        let bytes = png.len();
        let path = tokio::task::spawn_blocking(move || {
            sink.deliver(downloads::STRIP_FILENAME, downloads::STRIP_MIME, &png)
        })
        .await
        .map_err(|e| AppError::Other(format!("Delivery task failed: {}", e)))??;

        info!(path = %path.display(), bytes, "Strip exported");
        Ok(ExportedFile {
            path,
            mime: downloads::STRIP_MIME.to_string(),
            bytes,
        })
    }
}

/// Composite captures and template artwork at the template's natural size
pub async fn render_strip(template: &StripTemplate, captures: &CaptureSet) -> AppResult<RgbaImage> {
    let artwork = template
        .image()
        .cloned()
        .ok_or(ExportError::TemplateNotReady)?;
    let captured = captures.all();
    if captured.is_empty() {
        return Err(ExportError::NothingCaptured.into());
    }

    // Every capture must be decoded before the artwork goes on top
    let layout = template.layout().clone();
    let placed = try_join_all(captured.into_iter().map(|capture| {
        let slot = layout.slot(capture.index);
        tokio::task::spawn_blocking(move || decode_for_slot(capture, slot))
    }))
    .await
    .map_err(|e| AppError::Other(format!("Decode task failed: {}", e)))?;

    tokio::task::spawn_blocking(move || {
        let (width, height) = artwork.dimensions();
        let mut canvas = RgbaImage::new(width, height);
        for placement in placed {
            let (x, y, image) = placement?;
            imageops::overlay(&mut canvas, &image, x, y);
        }
        imageops::overlay(&mut canvas, &*artwork, 0, 0);
        debug!(width, height, "Strip composited");
        Ok::<_, AppError>(canvas)
    })
    .await
    .map_err(|e| AppError::Other(format!("Composite task failed: {}", e)))?
}

/// Decode a capture and size it to its slot rectangle
fn decode_for_slot(
    capture: CapturedImage,
    slot: Option<FrameSlot>,
) -> Result<(i64, i64, RgbaImage), PhotoError> {
    let slot = slot.ok_or(PhotoError::InvalidSlot(capture.index))?;
    let mut image = capture.decode()?;
    if image.dimensions() != (slot.width, slot.height) {
        image = imageops::resize(&image, slot.width, slot.height, FilterType::Triangle);
    }
    Ok((slot.x as i64, slot.y as i64, image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{TemplateLayout, TemplateSource};
    use image::Rgba;

    fn small_layout() -> TemplateLayout {
        TemplateLayout::new(vec![FrameSlot::new(2, 2, 6, 4), FrameSlot::new(2, 10, 6, 4)])
    }

    fn capture_filled(index: usize, color: Rgba<u8>) -> CapturedImage {
        let image = RgbaImage::from_pixel(6, 4, color);
        CapturedImage {
            index,
            width: 6,
            height: 4,
            png: Arc::from(encode_png(&image).unwrap().into_boxed_slice()),
        }
    }

    #[tokio::test]
    async fn unloaded_template_is_refused() {
        let template = StripTemplate::new(
            TemplateSource::Builtin {
                width: 10,
                height: 16,
            },
            small_layout(),
        );
        let captures = CaptureSet::new();
        captures.store(capture_filled(0, Rgba([255, 0, 0, 255])));

        let err = render_strip(&template, &captures).await.unwrap_err();
        assert_eq!(err.to_string(), "Strip not ready yet.");
    }

    #[tokio::test]
    async fn empty_capture_set_is_refused() {
        let template = StripTemplate::from_image("t", RgbaImage::new(10, 16), small_layout());
        let err = render_strip(&template, &CaptureSet::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "No photos captured yet.");
    }

    #[tokio::test]
    async fn artwork_is_drawn_over_captures() {
        // Opaque border pixel at (2,2), transparent elsewhere
        let mut artwork = RgbaImage::new(10, 16);
        artwork.put_pixel(2, 2, Rgba([0, 0, 0, 255]));
        let template = StripTemplate::from_image("t", artwork, small_layout());

        let captures = CaptureSet::new();
        captures.store(capture_filled(0, Rgba([255, 0, 0, 255])));
        captures.store(capture_filled(1, Rgba([0, 0, 255, 255])));

        let strip = render_strip(&template, &captures).await.unwrap();
        assert_eq!(strip.dimensions(), (10, 16));
        assert_eq!(strip.get_pixel(2, 2), &Rgba([0, 0, 0, 255]));
        assert_eq!(strip.get_pixel(3, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(strip.get_pixel(3, 11), &Rgba([0, 0, 255, 255]));
        assert_eq!(strip.get_pixel(0, 0).0[3], 0);
    }
}
