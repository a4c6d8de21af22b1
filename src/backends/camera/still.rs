// SPDX-License-Identifier: GPL-3.0-only

//! Still-image virtual camera
//!
//! Serves a fixed frame loaded from an image file, or a generated test
//! pattern. It never provides a microphone, so acquiring it with audio
//! always falls through to the video-only strategy.

use super::types::{CameraFrame, MediaConstraints, MediaStream, frame_channel};
use super::CaptureDevice;
use crate::constants::file_formats;
use crate::errors::CameraError;
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Where the still frames come from
#[derive(Debug, Clone)]
pub enum StillSource {
    /// Image file decoded once at open time
    File(PathBuf),
    /// Generated color bars of the given size
    TestPattern { width: u32, height: u32 },
}

/// Virtual camera that always shows the same picture
#[derive(Debug, Clone)]
pub struct StillImageDevice {
    name: String,
    source: StillSource,
}

impl StillImageDevice {
    /// Camera backed by an image file
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("still:{}", path.display()),
            source: StillSource::File(path),
        }
    }

    /// Camera showing generated color bars
    pub fn test_pattern(width: u32, height: u32) -> Self {
        Self {
            name: format!("test-pattern:{}x{}", width, height),
            source: StillSource::TestPattern { width, height },
        }
    }

    fn load_frame(&self) -> Result<CameraFrame, CameraError> {
        match &self.source {
            StillSource::File(path) => load_image_as_frame(path),
            StillSource::TestPattern { width, height } => {
                if *width == 0 || *height == 0 {
                    return Err(CameraError::InitializationFailed(
                        "test pattern needs non-zero dimensions".to_string(),
                    ));
                }
                Ok(CameraFrame::from_image(&test_pattern(*width, *height)))
            }
        }
    }
}

impl CaptureDevice for StillImageDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, constraints: &MediaConstraints) -> Result<MediaStream, CameraError> {
        if constraints.audio {
            return Err(CameraError::AccessDenied(format!(
                "{} has no microphone",
                self.name
            )));
        }

        let frame = self.load_frame()?;
        info!(
            device = %self.name,
            width = frame.width,
            height = frame.height,
            "Still image camera opened"
        );

        let (sender, receiver) = frame_channel();
        sender.send_replace(Some(Arc::new(frame)));

        // The sender must outlive the stream or metadata waits see a disconnect
        Ok(MediaStream::new(self.name.clone(), receiver).with_keepalive(Arc::new(sender)))
    }
}

/// Decode an image file into an RGBA frame
pub fn load_image_as_frame(path: &Path) -> Result<CameraFrame, CameraError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_image_extension(&extension) {
        return Err(CameraError::InitializationFailed(format!(
            "Unsupported file format: {}",
            extension
        )));
    }

    let image = image::open(path)
        .map_err(|e| {
            CameraError::InitializationFailed(format!("Failed to load {}: {}", path.display(), e))
        })?
        .to_rgba8();

    debug!(path = %path.display(), width = image.width(), height = image.height(), "Image loaded");
    Ok(CameraFrame::from_image(&image))
}

/// Eight vertical color bars over a horizontal brightness ramp
///
/// Left and right halves differ, so mirrored captures are easy to tell apart.
pub fn test_pattern(width: u32, height: u32) -> RgbaImage {
    const BARS: [[u8; 3]; 8] = [
        [255, 255, 255],
        [255, 255, 0],
        [0, 255, 255],
        [0, 255, 0],
        [255, 0, 255],
        [255, 0, 0],
        [0, 0, 255],
        [16, 16, 16],
    ];

    RgbaImage::from_fn(width, height, |x, y| {
        let bar = BARS[(x as usize * BARS.len() / width as usize).min(BARS.len() - 1)];
        let level = 96 + (y * 159 / height.max(1)) as u16;
        Rgba([
            (bar[0] as u16 * level / 255) as u8,
            (bar[1] as u16 * level / 255) as u8,
            (bar[2] as u16 * level / 255) as u8,
            255,
        ])
    })
}
