// SPDX-License-Identifier: MPL-2.0

//! Slot capture pipeline
//!
//! ```text
//! latest CameraFrame → cover fit (+ mirror) → PNG → CaptureSet[slot]
//! ```
//!
//! The compositing and encoding are CPU-bound and run on the blocking pool,
//! so the session's countdown keeps ticking while a capture is processed.

pub mod encoding;
pub mod processing;

pub use encoding::{decode_png, encode_png};
pub use processing::{CoverGeometry, compose_frame, cover_fit};

use crate::backends::camera::CameraFrame;
use crate::errors::PhotoError;
use crate::template::FrameSlot;
use image::RgbaImage;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// A PNG still captured into one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// Slot index on the strip
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Encoded PNG bytes
    pub png: Arc<[u8]>,
}

impl CapturedImage {
    /// Decode the stored PNG
    pub fn decode(&self) -> Result<RgbaImage, PhotoError> {
        decode_png(&self.png)
    }
}

/// Captures of the current session, keyed by slot index
///
/// Cloning shares the same storage.
#[derive(Debug, Clone, Default)]
pub struct CaptureSet {
    images: Arc<Mutex<BTreeMap<usize, CapturedImage>>>,
}

impl CaptureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a capture, replacing any earlier one for the same slot
    pub fn store(&self, image: CapturedImage) {
        self.lock().insert(image.index, image);
    }

    pub fn get(&self, index: usize) -> Option<CapturedImage> {
        self.lock().get(&index).cloned()
    }

    /// All captures in slot order
    pub fn all(&self) -> Vec<CapturedImage> {
        self.lock().values().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<usize, CapturedImage>> {
        self.images.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Composite `frame` into the size of `slot` and encode it as PNG
pub async fn capture_slot(
    frame: Arc<CameraFrame>,
    index: usize,
    slot: FrameSlot,
    mirror: bool,
) -> Result<CapturedImage, PhotoError> {
    let captured = tokio::task::spawn_blocking(move || {
        let image = compose_frame(&frame, slot.width, slot.height, mirror)?;
        let png = encode_png(&image)?;
        Ok::<_, PhotoError>(CapturedImage {
            index,
            width: image.width(),
            height: image.height(),
            png: Arc::from(png.into_boxed_slice()),
        })
    })
    .await
    .map_err(|e| PhotoError::EncodingFailed(format!("Capture task failed: {}", e)))??;

    info!(
        slot = index,
        width = captured.width,
        height = captured.height,
        mirror,
        "Slot captured"
    );
    Ok(captured)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(index: usize, fill: u8) -> CapturedImage {
        CapturedImage {
            index,
            width: 1,
            height: 1,
            png: Arc::from(vec![fill].into_boxed_slice()),
        }
    }

    #[test]
    fn store_overwrites_same_slot() {
        let set = CaptureSet::new();
        set.store(capture(2, 1));
        set.store(capture(0, 2));
        set.store(capture(2, 3));

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(2).unwrap().png[0], 3);
        let order: Vec<usize> = set.all().iter().map(|c| c.index).collect();
        assert_eq!(order, vec![0, 2]);
    }

    #[tokio::test]
    async fn capture_matches_slot_size() {
        let frame = Arc::new(CameraFrame::from_rgba(32, 24, vec![90; 32 * 24 * 4]));
        let slot = FrameSlot::new(5, 5, 30, 11);
        let captured = capture_slot(frame, 1, slot, true).await.unwrap();

        assert_eq!((captured.width, captured.height), (30, 11));
        assert_eq!(captured.decode().unwrap().dimensions(), (30, 11));
    }
}
