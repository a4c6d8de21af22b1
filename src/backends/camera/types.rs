// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for capture backends

use crate::errors::{CameraError, PhotoError};
use image::RgbaImage;
use std::any::Any;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// One RGBA video frame
#[derive(Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA pixels, `stride` bytes per row
    pub data: Arc<[u8]>,
    /// Row stride in bytes (may include padding)
    pub stride: u32,
    /// Timestamp when the frame was produced
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap a tightly packed RGBA buffer
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data.into_boxed_slice()),
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    /// Build a frame from a decoded image
    pub fn from_image(image: &RgbaImage) -> Self {
        Self::from_rgba(image.width(), image.height(), image.as_raw().clone())
    }

    /// Whether the source has reported usable dimensions
    pub fn has_dimensions(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Copy the frame into a packed RGBA image, dropping row padding
    pub fn to_rgba_image(&self) -> Result<RgbaImage, PhotoError> {
        let row_bytes = self.width as usize * 4;
        let stride = self.stride as usize;
        if stride < row_bytes {
            return Err(PhotoError::InvalidFrame(format!(
                "stride {} smaller than row size {}",
                stride, row_bytes
            )));
        }

        let needed = stride * (self.height as usize).saturating_sub(1) + row_bytes;
        if self.height > 0 && self.data.len() < needed {
            return Err(PhotoError::InvalidFrame(format!(
                "RGBA data too small: expected {}, got {}",
                needed,
                self.data.len()
            )));
        }

        let packed = if stride == row_bytes {
            self.data[..row_bytes * self.height as usize].to_vec()
        } else {
            let mut packed = Vec::with_capacity(row_bytes * self.height as usize);
            for row in self.data.chunks(stride).take(self.height as usize) {
                packed.extend_from_slice(&row[..row_bytes]);
            }
            packed
        };

        RgbaImage::from_raw(self.width, self.height, packed)
            .ok_or_else(|| PhotoError::InvalidFrame("failed to build RGBA image".to_string()))
    }
}

impl std::fmt::Debug for CameraFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Publishing half of a stream's latest-frame slot
pub type FrameSender = watch::Sender<Option<Arc<CameraFrame>>>;

/// Receiving half of a stream's latest-frame slot
pub type FrameReceiver = watch::Receiver<Option<Arc<CameraFrame>>>;

/// Create an empty latest-frame slot
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    watch::channel(None)
}

/// What a single acquisition attempt asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaConstraints {
    /// Request a microphone track alongside the video
    pub audio: bool,
    /// Specific device to open (backend-defined, e.g. `/dev/video0`); `None` picks the default
    pub device: Option<String>,
}

impl MediaConstraints {
    /// Camera plus microphone
    pub fn audio_video(device: Option<String>) -> Self {
        Self {
            audio: true,
            device,
        }
    }

    /// Camera only
    pub fn video_only(device: Option<String>) -> Self {
        Self {
            audio: false,
            device,
        }
    }

    /// Audio+video first, then video-only
    pub fn default_strategies(device: Option<String>) -> Vec<Self> {
        vec![
            Self::audio_video(device.clone()),
            Self::video_only(device),
        ]
    }
}

/// A live capture stream
///
/// Cloning is cheap; every clone observes the same latest frame. The
/// backend resources stay alive as long as any clone does.
#[derive(Clone)]
pub struct MediaStream {
    label: String,
    frames: FrameReceiver,
    audio_device: Option<String>,
    keepalive: Option<Arc<dyn Any + Send + Sync>>,
}

impl MediaStream {
    /// Create a stream from its latest-frame receiver
    pub fn new(label: impl Into<String>, frames: FrameReceiver) -> Self {
        Self {
            label: label.into(),
            frames,
            audio_device: None,
            keepalive: None,
        }
    }

    /// Attach a microphone track (backend-defined device name, empty for default)
    pub fn with_audio(mut self, device: impl Into<String>) -> Self {
        self.audio_device = Some(device.into());
        self
    }

    /// Keep backend resources (pipelines, senders) alive with the stream
    pub fn with_keepalive(mut self, resource: Arc<dyn Any + Send + Sync>) -> Self {
        self.keepalive = Some(resource);
        self
    }

    /// Human readable source name
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the stream carries a microphone track
    pub fn has_audio(&self) -> bool {
        self.audio_device.is_some()
    }

    /// Microphone device name if the stream carries audio
    pub fn audio_device(&self) -> Option<&str> {
        self.audio_device.as_deref()
    }

    /// Most recent frame, if any has arrived
    pub fn latest_frame(&self) -> Option<Arc<CameraFrame>> {
        self.frames.borrow().clone()
    }

    /// Dimensions of the most recent frame, if known
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.frames
            .borrow()
            .as_ref()
            .filter(|frame| frame.has_dimensions())
            .map(|frame| (frame.width, frame.height))
    }

    /// Independent receiver for consumers that follow every frame (recorders)
    pub fn subscribe(&self) -> FrameReceiver {
        self.frames.clone()
    }

    /// Wait until the source reports non-zero dimensions
    ///
    /// Returns immediately when dimensions are already known. There is no
    /// timeout here; callers that want one wrap this in `tokio::time::timeout`.
    pub async fn wait_for_metadata(&self) -> Result<(u32, u32), CameraError> {
        if let Some(dims) = self.dimensions() {
            return Ok(dims);
        }

        let mut frames = self.frames.clone();
        let frame = frames
            .wait_for(|frame| frame.as_ref().is_some_and(|f| f.has_dimensions()))
            .await
            .map_err(|_| CameraError::Disconnected)?;

        match frame.as_ref() {
            Some(f) => Ok((f.width, f.height)),
            None => Err(CameraError::Disconnected),
        }
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("label", &self.label)
            .field("audio_device", &self.audio_device)
            .field("dimensions", &self.dimensions())
            .finish()
    }
}

/// Camera device discovered on the system
#[derive(Debug, Clone, Default)]
pub struct DeviceInfo {
    /// Name of the device (V4L2 card)
    pub card: String,
    /// Driver name (V4L2 driver)
    pub driver: String,
    /// Device path (e.g., /dev/video0)
    pub path: String,
}
