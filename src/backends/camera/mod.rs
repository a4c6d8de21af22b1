// SPDX-License-Identifier: MPL-2.0

//! Camera backend abstraction
//!
//! ```text
//! ┌──────────────────────┐
//! │  Binder / Session    │
//! └──────────┬───────────┘
//!            │ acquire_stream(strategies)
//!            ▼
//! ┌──────────────────────┐
//! │ CaptureDevice trait  │  ← open(constraints) -> MediaStream
//! └──────────┬───────────┘
//!       ┌────┴─────┐
//!       ▼          ▼
//!  ┌─────────┐ ┌─────────┐
//!  │GStreamer│ │  Still  │
//!  └─────────┘ └─────────┘
//! ```

pub mod gst_device;
pub mod still;
pub mod types;
pub mod v4l2_utils;

pub use gst_device::GstCameraDevice;
pub use still::StillImageDevice;
pub use types::*;

use crate::errors::CameraError;
use tracing::{info, warn};

/// A source of live capture streams
pub trait CaptureDevice: Send + Sync {
    /// Human readable device name
    fn name(&self) -> &str;

    /// Open a stream satisfying `constraints`
    ///
    /// Fails when the constraints cannot be met, e.g. a microphone was
    /// requested but none is available or access to it was denied.
    fn open(&self, constraints: &MediaConstraints) -> Result<MediaStream, CameraError>;
}

/// Try each acquisition strategy in order until one yields a stream
///
/// Every failed attempt is logged; when all fail the last underlying
/// message is surfaced as [`CameraError::AccessDenied`].
pub fn acquire_stream(
    device: &dyn CaptureDevice,
    strategies: &[MediaConstraints],
) -> Result<MediaStream, CameraError> {
    let mut last_error: Option<CameraError> = None;

    for (attempt, constraints) in strategies.iter().enumerate() {
        match device.open(constraints) {
            Ok(stream) => {
                info!(
                    device = device.name(),
                    attempt,
                    audio = stream.has_audio(),
                    "Capture stream acquired"
                );
                return Ok(stream);
            }
            Err(e) => {
                warn!(
                    device = device.name(),
                    attempt,
                    audio = constraints.audio,
                    error = %e,
                    "Capture attempt failed"
                );
                last_error = Some(e);
            }
        }
    }

    let message = match last_error {
        Some(CameraError::AccessDenied(msg)) => msg,
        Some(other) => other.to_string(),
        None => "no acquisition strategy configured".to_string(),
    };
    Err(CameraError::AccessDenied(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Device that fails on audio and records every attempt
    struct NoMicrophone {
        attempts: Mutex<Vec<MediaConstraints>>,
        camera_works: bool,
    }

    impl CaptureDevice for NoMicrophone {
        fn name(&self) -> &str {
            "no-mic"
        }

        fn open(&self, constraints: &MediaConstraints) -> Result<MediaStream, CameraError> {
            self.attempts.lock().unwrap().push(constraints.clone());
            if constraints.audio {
                return Err(CameraError::AccessDenied("microphone denied".into()));
            }
            if !self.camera_works {
                return Err(CameraError::AccessDenied("camera denied".into()));
            }
            let (_tx, rx) = frame_channel();
            Ok(MediaStream::new("no-mic", rx))
        }
    }

    #[test]
    fn falls_back_to_video_only() {
        let device = NoMicrophone {
            attempts: Mutex::new(Vec::new()),
            camera_works: true,
        };
        let stream = acquire_stream(&device, &MediaConstraints::default_strategies(None)).unwrap();

        assert!(!stream.has_audio());
        let attempts = device.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].audio);
        assert!(!attempts[1].audio);
    }

    #[test]
    fn total_failure_reports_last_message() {
        let device = NoMicrophone {
            attempts: Mutex::new(Vec::new()),
            camera_works: false,
        };
        let err = acquire_stream(&device, &MediaConstraints::default_strategies(None)).unwrap_err();
        assert_eq!(err, CameraError::AccessDenied("camera denied".into()));
    }
}
