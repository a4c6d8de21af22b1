// SPDX-License-Identifier: MPL-2.0

//! GStreamer session recorder
//!
//! ```text
//! appsrc (RGBA frames sampled from the stream)
//!   ! videoconvert ! queue ! <encoder> [! parser] ─┐
//!                                                 ├─ <muxer> ! appsink → ChunkSink
//! autoaudiosrc ! queue ! audioconvert            │
//!   ! audioresample ! <audio encoder> ───────────┘
//! ```
//!
//! The muxer runs in streaming mode so every buffer leaving it is a chunk
//! of a playable file; concatenating all chunks yields the clip.

use super::encoder_selection::{ContainerFormat, EncoderChoice, select_encoders};
use super::{ChunkSink, Recorder, RecorderState, RecordingCapability, RecordingFormat, StopAck};
use crate::backends::camera::{FrameReceiver, MediaStream};
use crate::constants::{recording, timing};
use crate::errors::RecordingError;
use futures::channel::oneshot;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Recording support backed by the installed GStreamer plugins
#[derive(Debug, Clone, Copy, Default)]
pub struct GstRecordingCapability;

impl RecordingCapability for GstRecordingCapability {
    fn is_type_supported(&self, mime: &str) -> bool {
        select_encoders(mime).is_some()
    }

    fn create_recorder(
        &self,
        stream: &MediaStream,
        format: Option<&RecordingFormat>,
        sink: ChunkSink,
    ) -> Result<Box<dyn Recorder>, RecordingError> {
        let mime = format
            .map(|f| f.mime.as_str())
            .unwrap_or(recording::FALLBACK_MIME);
        let recorder = GstRecorder::new(stream.clone(), mime, sink)?;
        Ok(Box::new(recorder))
    }
}

/// Records a [`MediaStream`] into muxed chunks
pub struct GstRecorder {
    stream: MediaStream,
    mime: String,
    choice: EncoderChoice,
    sink: ChunkSink,
    active: Option<ActiveRecording>,
}

/// Pipeline and feeder thread of a recording in progress
struct ActiveRecording {
    pipeline: gst::Pipeline,
    running: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
}

impl GstRecorder {
    /// Create an inactive recorder producing `mime`
    pub fn new(stream: MediaStream, mime: &str, sink: ChunkSink) -> Result<Self, RecordingError> {
        gst::init().map_err(|e| RecordingError::StartFailed(e.to_string()))?;

        let choice = select_encoders(mime)
            .ok_or_else(|| RecordingError::EncoderNotAvailable(mime.to_string()))?;

        info!(
            mime,
            stream = stream.label(),
            audio = stream.has_audio(),
            "Recorder created"
        );

        Ok(Self {
            stream,
            mime: mime.to_string(),
            choice,
            sink,
            active: None,
        })
    }

    fn build_pipeline(
        &self,
        width: u32,
        height: u32,
    ) -> Result<(gst::Pipeline, gst_app::AppSrc), RecordingError> {
        let framerate = recording::RECORDING_FRAMERATE as i32;
        let video_info =
            gst_video::VideoInfo::builder(gst_video::VideoFormat::Rgba, width, height)
                .fps(gst::Fraction::new(framerate, 1))
                .build()
                .map_err(|e| RecordingError::StartFailed(format!("Invalid video info: {}", e)))?;
        let caps = video_info
            .to_caps()
            .map_err(|e| RecordingError::StartFailed(format!("Invalid caps: {}", e)))?;

        let pipeline = gst::Pipeline::new();

        let appsrc = gst_app::AppSrc::builder()
            .caps(&caps)
            .format(gst::Format::Time)
            .is_live(true)
            .build();
        let videoconvert = make_element("videoconvert")?;
        let video_queue = make_element("queue")?;
        let encoder = make_element(self.choice.video_encoder)?;
        let parser = self.choice.parser.map(make_element).transpose()?;
        let muxer = make_element(self.choice.muxer())?;
        configure_muxer(&muxer, self.choice.container);

        let appsink = gst_app::AppSink::builder().sync(false).build();
        let sink = Arc::clone(&self.sink);
        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink.pull_sample().map_err(|_| gst::FlowError::Eos)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                    sink(map.as_slice().to_vec());
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );

        let mut video_chain: Vec<&gst::Element> =
            vec![appsrc.upcast_ref(), &videoconvert, &video_queue, &encoder];
        if let Some(parser) = &parser {
            video_chain.push(parser);
        }

        pipeline
            .add_many(video_chain.iter().copied())
            .map_err(|e| RecordingError::StartFailed(e.to_string()))?;
        pipeline
            .add_many([&muxer, appsink.upcast_ref()])
            .map_err(|e| RecordingError::StartFailed(e.to_string()))?;

        gst::Element::link_many(video_chain.iter().copied())
            .map_err(|_| RecordingError::StartFailed("Failed to link video chain".into()))?;
        video_chain
            .last()
            .ok_or_else(|| RecordingError::StartFailed("Empty video chain".into()))?
            .link(&muxer)
            .map_err(|_| RecordingError::StartFailed("Failed to link encoder to muxer".into()))?;
        muxer
            .link(&appsink)
            .map_err(|_| RecordingError::StartFailed("Failed to link muxer to appsink".into()))?;

        if let (Some(device), Some(audio_encoder)) =
            (self.stream.audio_device(), self.choice.audio_encoder)
        {
            add_audio_branch(&pipeline, &muxer, device, audio_encoder)?;
        } else if self.stream.has_audio() {
            warn!(mime = %self.mime, "No audio encoder for container, recording video only");
        }

        Ok((pipeline, appsrc))
    }
}

impl Recorder for GstRecorder {
    fn state(&self) -> RecorderState {
        if self.active.is_some() {
            RecorderState::Recording
        } else {
            RecorderState::Inactive
        }
    }

    fn mime_type(&self) -> &str {
        &self.mime
    }

    fn start(&mut self) -> Result<(), RecordingError> {
        if self.active.is_some() {
            return Err(RecordingError::AlreadyRecording);
        }

        let (width, height) = self
            .stream
            .dimensions()
            .ok_or_else(|| RecordingError::StartFailed("Video dimensions unknown".into()))?;

        let (pipeline, appsrc) = self.build_pipeline(width, height)?;

        info!(width, height, mime = %self.mime, "Starting recording");
        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| RecordingError::StartFailed(e.to_string()))?;

        // Check for immediate errors
        if let Some(bus) = pipeline.bus()
            && let Some(msg) = bus.timed_pop_filtered(
                gst::ClockTime::from_mseconds(100),
                &[gst::MessageType::Error],
            )
            && let gst::MessageView::Error(err) = msg.view()
        {
            error!(
                error = %err.error(),
                debug = ?err.debug(),
                source = ?err.src().map(|s| s.name()),
                "GStreamer error during recording start"
            );
            let _ = pipeline.set_state(gst::State::Null);
            return Err(RecordingError::StartFailed(err.error().to_string()));
        }

        let running = Arc::new(AtomicBool::new(true));
        let feeder = spawn_feeder(
            appsrc,
            self.stream.subscribe(),
            (width, height),
            Arc::clone(&running),
        )
        .map_err(|e| {
            let _ = pipeline.set_state(gst::State::Null);
            RecordingError::StartFailed(format!("Failed to spawn frame feeder: {}", e))
        })?;

        self.active = Some(ActiveRecording {
            pipeline,
            running,
            feeder: Some(feeder),
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<StopAck, RecordingError> {
        let mut active = self.active.take().ok_or(RecordingError::NotRecording)?;
        info!("Stopping recording");

        active.running.store(false, Ordering::SeqCst);
        if !active.pipeline.send_event(gst::event::Eos::new()) {
            warn!("Failed to send EOS event to recording pipeline");
        }

        let (ack_tx, ack_rx) = oneshot::channel();
        let pipeline = active.pipeline.clone();
        let feeder = active.feeder.take();

        std::thread::Builder::new()
            .name("recorder-finalize".into())
            .spawn(move || {
                if let Some(feeder) = feeder {
                    let _ = feeder.join();
                }
                wait_for_eos(&pipeline);
                let _ = pipeline.set_state(gst::State::Null);
                debug!("Recording pipeline finalized");
                let _ = ack_tx.send(());
            })
            .map_err(|e| RecordingError::StopFailed(e.to_string()))?;

        Ok(ack_rx)
    }
}

impl Drop for GstRecorder {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.running.store(false, Ordering::SeqCst);
            let _ = active.pipeline.set_state(gst::State::Null);
        }
    }
}

fn make_element(name: &str) -> Result<gst::Element, RecordingError> {
    gst::ElementFactory::make(name)
        .build()
        .map_err(|e| RecordingError::EncoderNotAvailable(format!("{}: {}", name, e)))
}

/// Streaming output so chunks can be emitted without seeking back
fn configure_muxer(muxer: &gst::Element, container: ContainerFormat) {
    match container {
        ContainerFormat::WebM => {
            if muxer.has_property("streamable") {
                muxer.set_property("streamable", true);
            }
        }
        ContainerFormat::MP4 => {
            if muxer.has_property("fragment-duration") {
                muxer.set_property("fragment-duration", 1000u32);
            }
        }
    }
}

fn add_audio_branch(
    pipeline: &gst::Pipeline,
    muxer: &gst::Element,
    device: &str,
    audio_encoder: &str,
) -> Result<(), RecordingError> {
    let source = if device.is_empty() {
        make_element("autoaudiosrc")?
    } else {
        gst::ElementFactory::make("pulsesrc")
            .property("device", device)
            .build()
            .map_err(|e| RecordingError::StartFailed(format!("pulsesrc: {}", e)))?
    };
    let queue = make_element("queue")?;
    let convert = make_element("audioconvert")?;
    let resample = make_element("audioresample")?;
    let encoder = make_element(audio_encoder)?;

    let chain = [&source, &queue, &convert, &resample, &encoder];
    pipeline
        .add_many(chain)
        .map_err(|e| RecordingError::StartFailed(e.to_string()))?;
    gst::Element::link_many(chain)
        .map_err(|_| RecordingError::StartFailed("Failed to link audio chain".into()))?;
    encoder
        .link(muxer)
        .map_err(|_| RecordingError::StartFailed("Failed to link audio encoder to muxer".into()))?;

    debug!(device, encoder = audio_encoder, "Audio branch added");
    Ok(())
}

/// Push the stream's latest frame into `appsrc` at the recording framerate
fn spawn_feeder(
    appsrc: gst_app::AppSrc,
    frames: FrameReceiver,
    size: (u32, u32),
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    let fps = recording::RECORDING_FRAMERATE as u64;
    let interval = Duration::from_nanos(1_000_000_000 / fps);

    std::thread::Builder::new()
        .name("recorder-feeder".into())
        .spawn(move || {
            let mut frame_num: u64 = 0;
            while running.load(Ordering::SeqCst) {
                let latest = frames.borrow().clone();
                let Some(frame) = latest else {
                    std::thread::sleep(interval);
                    continue;
                };
                if (frame.width, frame.height) != size {
                    debug!(
                        width = frame.width,
                        height = frame.height,
                        "Frame size changed, skipping"
                    );
                    std::thread::sleep(interval);
                    continue;
                }

                let pixels = match frame.to_rgba_image() {
                    Ok(image) => image.into_raw(),
                    Err(e) => {
                        warn!(error = %e, "Dropping malformed frame");
                        std::thread::sleep(interval);
                        continue;
                    }
                };

                let mut buffer = gst::Buffer::from_mut_slice(pixels);
                if let Some(buffer) = buffer.get_mut() {
                    buffer.set_pts(gst::ClockTime::from_nseconds(
                        frame_num * 1_000_000_000 / fps,
                    ));
                    buffer.set_duration(gst::ClockTime::from_nseconds(1_000_000_000 / fps));
                }

                if let Err(e) = appsrc.push_buffer(buffer) {
                    debug!(error = ?e, "appsrc refused buffer, feeder exiting");
                    return;
                }
                frame_num += 1;
                std::thread::sleep(interval);
            }
            let _ = appsrc.end_of_stream();
            debug!(frames = frame_num, "Frame feeder finished");
        })
}

/// Block until the pipeline posts EOS or an error, bounded by a timeout
fn wait_for_eos(pipeline: &gst::Pipeline) {
    let Some(bus) = pipeline.bus() else {
        return;
    };
    match bus.timed_pop_filtered(
        gst::ClockTime::from_seconds(timing::RECORDER_EOS_TIMEOUT_SECS),
        &[gst::MessageType::Eos, gst::MessageType::Error],
    ) {
        Some(msg) => match msg.view() {
            gst::MessageView::Eos(_) => debug!("Recording reached EOS"),
            gst::MessageView::Error(err) => {
                error!(error = %err.error(), "Recording pipeline error during stop")
            }
            _ => {}
        },
        None => warn!("Timed out waiting for recording EOS"),
    }
}
