// SPDX-License-Identifier: GPL-3.0-only

//! Binding a capture device to preview, recorder and session
//!
//! Runs once at startup: acquire a stream (audio+video, falling back to
//! video only), negotiate a recording format, and bind a recorder whose
//! chunks land in the session's recording buffer.

use crate::backends::camera::{CaptureDevice, MediaConstraints, MediaStream, acquire_stream};
use crate::errors::AppResult;
use crate::pipelines::video::{RecordingCapability, RecordingFormat, negotiate_format};
use crate::session::{SessionController, SessionState, SharedRecorder};
use crate::template::TemplateLayout;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// A bound stream with its optional recorder
pub struct BoundMedia {
    pub stream: MediaStream,
    pub recorder: Option<SharedRecorder>,
    pub state: Arc<SessionState>,
}

impl BoundMedia {
    /// Negotiated recording format, if any
    pub fn format(&self) -> Option<&RecordingFormat> {
        self.state.format.as_ref()
    }

    /// Session controller over this binding
    pub fn into_controller(self, layout: TemplateLayout) -> SessionController {
        SessionController::new(self.stream, self.recorder, layout, self.state)
    }
}

/// Acquire `device` and prepare recording
///
/// Device failure is fatal. A missing recording capability or a recorder
/// that cannot be created only disables recording.
pub fn bind(
    device: &dyn CaptureDevice,
    strategies: &[MediaConstraints],
    capability: Option<&dyn RecordingCapability>,
) -> AppResult<BoundMedia> {
    let stream = acquire_stream(device, strategies)?;

    let Some(capability) = capability else {
        info!(device = device.name(), "Recording unavailable, stills only");
        return Ok(BoundMedia {
            stream,
            recorder: None,
            state: Arc::new(SessionState::new(None)),
        });
    };

    let format = negotiate_format(capability);
    let state = Arc::new(SessionState::new(format.clone()));

    let recorder = match capability.create_recorder(&stream, format.as_ref(), state.recording.sink())
    {
        Ok(recorder) => {
            info!(mime = recorder.mime_type(), "Recorder bound to stream");
            Some(Arc::new(Mutex::new(recorder)))
        }
        Err(e) => {
            warn!(error = %e, "Recorder unavailable, stills only");
            None
        }
    };

    Ok(BoundMedia {
        stream,
        recorder,
        state,
    })
}
