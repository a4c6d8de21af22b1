// SPDX-License-Identifier: GPL-3.0-only

//! Live camera capture through GStreamer
//!
//! ```text
//! v4l2src / autovideosrc ! videoconvert ! videoscale ! video/x-raw,format=RGBA ! appsink
//! ```
//!
//! Every sample pulled from the appsink replaces the stream's latest frame.

use super::CaptureDevice;
use super::types::{CameraFrame, FrameSender, MediaConstraints, MediaStream, frame_channel};
use crate::backends::audio;
use crate::constants::{pipeline, timing};
use crate::errors::CameraError;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A camera opened through a GStreamer source element
#[derive(Debug, Clone)]
pub struct GstCameraDevice {
    name: String,
    /// V4L2 device path; `None` uses `autovideosrc`
    device: Option<String>,
}

impl GstCameraDevice {
    /// Camera at a V4L2 path such as `/dev/video0`
    pub fn with_path(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            name: path.clone(),
            device: Some(path),
        }
    }

    /// Whatever camera the system picks by default
    pub fn system_default() -> Self {
        Self {
            name: "default camera".to_string(),
            device: None,
        }
    }

    fn pipeline_description(&self, device: Option<&str>) -> String {
        let source = match device.or(self.device.as_deref()) {
            Some(path) => format!("v4l2src device={}", path),
            None => "autovideosrc".to_string(),
        };
        format!(
            "{} ! videoconvert ! videoscale ! video/x-raw,format={} ! appsink name=sink",
            source,
            pipeline::OUTPUT_FORMAT
        )
    }
}

impl CaptureDevice for GstCameraDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self, constraints: &MediaConstraints) -> Result<MediaStream, CameraError> {
        gst::init()?;

        // Microphone first so a denied microphone never leaves a camera running
        let microphone = if constraints.audio {
            Some(audio::probe_microphone(None)?)
        } else {
            None
        };

        let description = self.pipeline_description(constraints.device.as_deref());
        info!(pipeline = %description, audio = constraints.audio, "Opening camera");

        let (sender, receiver) = frame_channel();
        let capture = CapturePipeline::start(&description, sender)?;

        let mut stream =
            MediaStream::new(self.name.clone(), receiver).with_keepalive(Arc::new(capture));
        if let Some(mic) = microphone {
            stream = stream.with_audio(mic);
        }
        Ok(stream)
    }
}

/// Running preview pipeline; stopped when dropped
struct CapturePipeline {
    pipeline: gst::Element,
    appsink: AppSink,
}

impl CapturePipeline {
    fn start(description: &str, sender: FrameSender) -> Result<Self, CameraError> {
        let pipeline = gst::parse::launch(description).map_err(|e| {
            CameraError::InitializationFailed(format!("Failed to create pipeline: {}", e))
        })?;

        let bin = pipeline
            .clone()
            .dynamic_cast::<gst::Bin>()
            .map_err(|_| CameraError::InitializationFailed("Pipeline is not a bin".to_string()))?;

        let appsink = bin
            .by_name("sink")
            .ok_or_else(|| CameraError::InitializationFailed("Failed to get appsink".to_string()))?
            .dynamic_cast::<AppSink>()
            .map_err(|_| {
                CameraError::InitializationFailed("Failed to cast appsink".to_string())
            })?;

        appsink.set_property("sync", false);
        appsink.set_property("max-buffers", pipeline::MAX_BUFFERS);
        appsink.set_property("drop", true);
        appsink.set_property("enable-last-sample", false);

        let frame_counter = Arc::new(AtomicU64::new(0));
        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let frame_num = frame_counter.fetch_add(1, Ordering::Relaxed);
                    let captured_at = Instant::now();

                    let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let caps = sample.caps().ok_or(gst::FlowError::Error)?;
                    let video_info = VideoInfo::from_caps(caps).map_err(|e| {
                        if frame_num % 30 == 0 {
                            error!(frame = frame_num, error = ?e, "Failed to get video info");
                        }
                        gst::FlowError::Error
                    })?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;

                    let frame = CameraFrame {
                        width: video_info.width(),
                        height: video_info.height(),
                        data: Arc::from(map.as_slice()),
                        stride: video_info.stride()[0] as u32,
                        captured_at,
                    };

                    if frame_num == 0 {
                        info!(
                            width = frame.width,
                            height = frame.height,
                            stride = frame.stride,
                            "First camera frame"
                        );
                    }

                    // Nobody is watching any more; stop pulling
                    if sender.is_closed() {
                        return Err(gst::FlowError::Eos);
                    }
                    sender.send_replace(Some(Arc::new(frame)));
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        pipeline.set_state(gst::State::Playing).map_err(|e| {
            CameraError::InitializationFailed(format!("Failed to start pipeline: {}", e))
        })?;

        let (result, state, pending) =
            pipeline.state(gst::ClockTime::from_seconds(timing::PROBE_TIMEOUT_SECS));
        debug!(result = ?result, state = ?state, pending = ?pending, "Pipeline state");

        let capture = Self { pipeline, appsink };

        // Busy or missing devices report through the bus rather than set_state
        if let Some(bus) = capture.pipeline.bus()
            && let Some(msg) = bus.pop_filtered(&[gst::MessageType::Error])
            && let gst::MessageView::Error(err) = msg.view()
        {
            let message = err.error().to_string();
            error!(error = %message, "Camera pipeline failed to start");
            return Err(CameraError::AccessDenied(message));
        }

        if result.is_err() {
            return Err(CameraError::InitializationFailed(
                "Pipeline did not reach PLAYING".to_string(),
            ));
        }
        if state != gst::State::Playing {
            warn!("Camera pipeline is not in PLAYING state yet");
        }

        Ok(capture)
    }
}

impl Drop for CapturePipeline {
    fn drop(&mut self) {
        debug!("Stopping camera pipeline");
        self.appsink
            .set_callbacks(gstreamer_app::AppSinkCallbacks::builder().build());
        let _ = self.pipeline.set_state(gst::State::Null);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_uses_v4l2src() {
        let device = GstCameraDevice::with_path("/dev/video2");
        let description = device.pipeline_description(None);
        assert!(description.starts_with("v4l2src device=/dev/video2 !"));
        assert!(description.ends_with("appsink name=sink"));
    }

    #[test]
    fn constraint_device_overrides_default() {
        let device = GstCameraDevice::system_default();
        assert!(device.pipeline_description(None).starts_with("autovideosrc"));
        assert!(
            device
                .pipeline_description(Some("/dev/video4"))
                .starts_with("v4l2src device=/dev/video4")
        );
    }
}
