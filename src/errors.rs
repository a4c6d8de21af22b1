// SPDX-License-Identifier: MPL-2.0

//! Error types for the photobooth

use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone)]
pub enum AppError {
    /// Camera/microphone acquisition errors
    Camera(CameraError),
    /// Recording-related errors
    Recording(RecordingError),
    /// Frame capture errors
    Photo(PhotoError),
    /// Strip and clip export errors
    Export(ExportError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// Capture device errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    /// Every acquisition strategy failed; carries the last underlying message
    AccessDenied(String),
    /// Pipeline construction or state change failed
    InitializationFailed(String),
    /// The source stopped producing frames
    Disconnected,
    /// Backend error (e.g. GStreamer)
    BackendError(String),
    /// Video metadata did not arrive within the configured timeout
    MetadataTimeout,
}

/// Recording-specific errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    /// Failed to start recording
    StartFailed(String),
    /// Failed to stop recording
    StopFailed(String),
    /// Encoder or muxer not available
    EncoderNotAvailable(String),
    /// Recording already in progress
    AlreadyRecording,
    /// No recording in progress
    NotRecording,
}

/// Frame capture errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoError {
    /// No frame available for capture
    NoFrameAvailable,
    /// Slot index outside the template layout
    InvalidSlot(usize),
    /// Frame buffer does not match its declared geometry
    InvalidFrame(String),
    /// Encoding failed
    EncodingFailed(String),
    /// Decoding a stored capture failed
    DecodingFailed(String),
}

/// Export precondition and delivery errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// The main strip template has not finished loading
    TemplateNotReady,
    /// No frames have been captured yet
    NothingCaptured,
    /// The recording buffer is empty
    NothingRecorded,
    /// Template image could not be loaded
    TemplateLoad(String),
    /// Writing the delivered file failed
    DeliveryFailed(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Camera(e) => write!(f, "Camera error: {}", e),
            AppError::Recording(e) => write!(f, "Recording error: {}", e),
            AppError::Photo(e) => write!(f, "Photo error: {}", e),
            AppError::Export(e) => write!(f, "{}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for CameraError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraError::AccessDenied(msg) => write!(f, "Camera access denied: {}", msg),
            CameraError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            CameraError::Disconnected => write!(f, "Camera disconnected"),
            CameraError::BackendError(msg) => write!(f, "Backend error: {}", msg),
            CameraError::MetadataTimeout => write!(f, "Camera never reported its dimensions"),
        }
    }
}

impl fmt::Display for RecordingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingError::StartFailed(msg) => write!(f, "Failed to start recording: {}", msg),
            RecordingError::StopFailed(msg) => write!(f, "Failed to stop recording: {}", msg),
            RecordingError::EncoderNotAvailable(msg) => write!(f, "Encoder not available: {}", msg),
            RecordingError::AlreadyRecording => write!(f, "Recording already in progress"),
            RecordingError::NotRecording => write!(f, "No recording in progress"),
        }
    }
}

impl fmt::Display for PhotoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoError::NoFrameAvailable => write!(f, "No frame available for capture"),
            PhotoError::InvalidSlot(index) => write!(f, "No frame slot at index {}", index),
            PhotoError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            PhotoError::EncodingFailed(msg) => write!(f, "Encoding failed: {}", msg),
            PhotoError::DecodingFailed(msg) => write!(f, "Decoding failed: {}", msg),
        }
    }
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::TemplateNotReady => write!(f, "Strip not ready yet."),
            ExportError::NothingCaptured => write!(f, "No photos captured yet."),
            ExportError::NothingRecorded => write!(
                f,
                "No recorded video yet. Press START to record a session."
            ),
            ExportError::TemplateLoad(msg) => write!(f, "Failed to load strip template: {}", msg),
            ExportError::DeliveryFailed(msg) => write!(f, "Failed to save download: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for CameraError {}
impl std::error::Error for RecordingError {}
impl std::error::Error for PhotoError {}
impl std::error::Error for ExportError {}

// Conversions from sub-errors to AppError
impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        AppError::Camera(err)
    }
}

impl From<RecordingError> for AppError {
    fn from(err: RecordingError) -> Self {
        AppError::Recording(err)
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        AppError::Photo(err)
    }
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        AppError::Export(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::DeliveryFailed(err.to_string())
    }
}

impl From<image::ImageError> for PhotoError {
    fn from(err: image::ImageError) -> Self {
        PhotoError::EncodingFailed(err.to_string())
    }
}

impl From<gstreamer::glib::Error> for CameraError {
    fn from(err: gstreamer::glib::Error) -> Self {
        CameraError::BackendError(err.to_string())
    }
}
