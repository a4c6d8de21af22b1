// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for capture session sequencing

use futures::channel::oneshot;
use image::imageops;
use photobooth::backends::camera::{
    CameraFrame, CaptureDevice, FrameSender, MediaConstraints, MediaStream, StillImageDevice,
    frame_channel,
};
use photobooth::binder;
use photobooth::errors::{AppError, CameraError, PhotoError, RecordingError};
use photobooth::pipelines::video::{
    ChunkSink, Recorder, RecorderState, RecordingCapability, RecordingFormat, StopAck,
};
use photobooth::preview::PreviewBoard;
use photobooth::session::{
    SessionController, SessionEvent, SessionOutcome, SessionPhase, SessionState, SessionTiming,
};
use photobooth::template::{StripTemplate, TemplateLayout};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Classic layout at a tenth of the size so captures stay cheap
fn small_layout() -> TemplateLayout {
    TemplateLayout::classic().scaled_down(10)
}

/// Recorder that emits a header chunk on start and a tail chunk on stop
struct FakeRecorder {
    state: RecorderState,
    sink: ChunkSink,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    fail_start: bool,
}

impl Recorder for FakeRecorder {
    fn state(&self) -> RecorderState {
        self.state
    }

    fn mime_type(&self) -> &str {
        "video/webm;codecs=vp9"
    }

    fn start(&mut self) -> Result<(), RecordingError> {
        if self.fail_start {
            return Err(RecordingError::StartFailed("encoder busy".into()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.state = RecorderState::Recording;
        (self.sink)(vec![0x1a, 0x45]);
        Ok(())
    }

    fn stop(&mut self) -> Result<StopAck, RecordingError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.state = RecorderState::Inactive;
        (self.sink)(vec![0xdf, 0xa3]);
        (self.sink)(Vec::new());
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(());
        Ok(rx)
    }
}

#[derive(Default)]
struct FakeCapability {
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
    fail_start: bool,
}

impl RecordingCapability for FakeCapability {
    fn is_type_supported(&self, mime: &str) -> bool {
        mime.starts_with("video/webm")
    }

    fn create_recorder(
        &self,
        _stream: &MediaStream,
        _format: Option<&RecordingFormat>,
        sink: ChunkSink,
    ) -> Result<Box<dyn Recorder>, RecordingError> {
        Ok(Box::new(FakeRecorder {
            state: RecorderState::Inactive,
            sink,
            starts: Arc::clone(&self.starts),
            stops: Arc::clone(&self.stops),
            fail_start: self.fail_start,
        }))
    }
}

/// Camera whose frames the test controls
struct ControlledCamera {
    stream: MediaStream,
}

impl ControlledCamera {
    fn new() -> (Self, FrameSender) {
        let (sender, receiver) = frame_channel();
        let camera = Self {
            stream: MediaStream::new("controlled", receiver),
        };
        (camera, sender)
    }
}

impl CaptureDevice for ControlledCamera {
    fn name(&self) -> &str {
        "controlled"
    }

    fn open(&self, constraints: &MediaConstraints) -> Result<MediaStream, CameraError> {
        if constraints.audio {
            return Err(CameraError::AccessDenied("no microphone".into()));
        }
        Ok(self.stream.clone())
    }
}

fn test_frame(width: u32, height: u32) -> Arc<CameraFrame> {
    let image = photobooth::backends::camera::still::test_pattern(width, height);
    Arc::new(CameraFrame::from_image(&image))
}

fn controller_with(capability: &FakeCapability) -> SessionController {
    let device = StillImageDevice::test_pattern(64, 48);
    let bound = binder::bind(
        &device,
        &MediaConstraints::default_strategies(None),
        Some(capability),
    )
    .unwrap();
    bound.into_controller(small_layout())
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

#[tokio::test(start_paused = true)]
async fn full_session_takes_thirteen_point_six_seconds() {
    let capability = FakeCapability::default();
    let controller = controller_with(&capability);

    let outcome = controller.start_session().await.unwrap();
    let SessionOutcome::Completed(report) = outcome else {
        panic!("session was rejected");
    };

    assert_eq!(report.frames, 4);
    assert!(report.recorded);
    assert!(report.elapsed >= Duration::from_millis(13_600));
    assert!(report.elapsed < Duration::from_millis(13_700));

    let state = controller.state();
    for (index, slot) in small_layout().slots().iter().enumerate() {
        let capture = state.captures.get(index).expect("slot captured");
        assert_eq!((capture.width, capture.height), (slot.width, slot.height));
        assert_eq!(
            capture.decode().unwrap().dimensions(),
            (slot.width, slot.height)
        );
    }

    assert_eq!(capability.starts.load(Ordering::SeqCst), 1);
    assert_eq!(capability.stops.load(Ordering::SeqCst), 1);
    assert_eq!(state.recording.len(), 2, "empty chunk must be discarded");
    assert!(!state.is_capturing());
}

#[tokio::test(start_paused = true)]
async fn countdown_shows_each_second_then_clears() {
    let controller = controller_with(&FakeCapability::default());
    controller.set_countdown_input("2");
    let mut events = controller.subscribe();

    controller.start_session().await.unwrap();

    let seen = drain(&mut events);
    let first_slot: Vec<&SessionEvent> = seen
        .iter()
        .skip_while(|e| **e != SessionEvent::PhaseChanged(SessionPhase::CountingDown(0)))
        .take_while(|e| **e != SessionEvent::PhaseChanged(SessionPhase::Capturing(0)))
        .filter(|e| matches!(e, SessionEvent::Countdown(_)))
        .collect();
    assert_eq!(
        first_slot,
        vec![
            &SessionEvent::Countdown(Some(2)),
            &SessionEvent::Countdown(Some(1)),
            &SessionEvent::Countdown(None),
        ]
    );

    let captured: Vec<usize> = seen
        .iter()
        .filter_map(|e| match e {
            SessionEvent::FrameCaptured { index, .. } => Some(*index),
            _ => None,
        })
        .collect();
    assert_eq!(captured, vec![0, 1, 2, 3]);
    assert!(matches!(seen.last(), Some(SessionEvent::Finalized { .. })));
}

#[tokio::test(start_paused = true)]
async fn reentrant_start_is_rejected_without_effect() {
    let capability = FakeCapability::default();
    let controller = Arc::new(controller_with(&capability));

    let running = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.start_session().await }
    });

    // Slot 0 is captured at 3s; slot 1 is counting down
    tokio::time::sleep(Duration::from_secs(4)).await;
    let state = controller.state();
    assert!(state.is_capturing());
    assert_eq!(state.captures.len(), 1);
    assert_eq!(state.recording.len(), 1);
    let mut events = controller.subscribe();

    let second = controller.start_session().await.unwrap();
    assert_eq!(second, SessionOutcome::Rejected);
    assert!(drain(&mut events).is_empty());
    assert_eq!(state.captures.len(), 1);
    assert!(state.captures.get(0).is_some());
    assert_eq!(state.recording.len(), 1);

    let first = running.await.unwrap().unwrap();
    assert!(matches!(first, SessionOutcome::Completed(_)));
    assert_eq!(capability.starts.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn finalization_runs_once_when_capture_fails() {
    let (camera, sender) = ControlledCamera::new();
    sender.send_replace(Some(test_frame(64, 48)));

    let capability = FakeCapability::default();
    let bound = binder::bind(
        &camera,
        &MediaConstraints::default_strategies(None),
        Some(&capability),
    )
    .unwrap();
    let controller = Arc::new(bound.into_controller(small_layout()));
    let mut events = controller.subscribe();

    let running = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.start_session().await }
    });

    // After slot 0 (3.4s), the camera loses its frame during slot 1's countdown
    tokio::time::sleep(Duration::from_millis(4500)).await;
    sender.send_replace(None);

    let err = running.await.unwrap().unwrap_err();
    assert!(matches!(err, AppError::Photo(PhotoError::NoFrameAvailable)));

    let seen = drain(&mut events);
    let finalized = seen
        .iter()
        .filter(|e| matches!(e, SessionEvent::Finalized { .. }))
        .count();
    assert_eq!(finalized, 1);
    assert!(seen.contains(&SessionEvent::Countdown(None)));
    assert_eq!(capability.stops.load(Ordering::SeqCst), 1);
    assert_eq!(controller.state().captures.len(), 1);
    assert!(!controller.state().is_capturing());

    // The guard was released: a new session can start
    sender.send_replace(Some(test_frame(64, 48)));
    let again = controller.start_session().await.unwrap();
    assert!(matches!(again, SessionOutcome::Completed(_)));
}

#[tokio::test(start_paused = true)]
async fn dropped_session_releases_the_guard() {
    let controller = Arc::new(controller_with(&FakeCapability::default()));

    let running = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.start_session().await }
    });
    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(controller.state().is_capturing());

    running.abort();
    assert!(running.await.unwrap_err().is_cancelled());
    assert!(!controller.state().is_capturing());

    controller.set_countdown_seconds(1);
    let again = controller.start_session().await.unwrap();
    assert!(matches!(again, SessionOutcome::Completed(r) if r.frames == 4));
}

#[tokio::test(start_paused = true)]
async fn recorder_start_failure_is_not_fatal() {
    let capability = FakeCapability {
        fail_start: true,
        ..FakeCapability::default()
    };
    let controller = controller_with(&capability);

    let SessionOutcome::Completed(report) = controller.start_session().await.unwrap() else {
        panic!("session was rejected");
    };
    assert_eq!(report.frames, 4);
    assert!(!report.recorded);
    assert_eq!(capability.stops.load(Ordering::SeqCst), 0);
    assert!(controller.state().recording.is_empty());
}

#[tokio::test(start_paused = true)]
async fn session_waits_for_video_metadata() {
    let (camera, sender) = ControlledCamera::new();
    let bound = binder::bind(&camera, &MediaConstraints::default_strategies(None), None).unwrap();
    let controller = Arc::new(bound.into_controller(small_layout()));
    controller.set_countdown_seconds(1);

    let running = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.start_session().await }
    });

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(controller.state().captures.is_empty());
    assert!(controller.state().is_capturing());

    sender.send_replace(Some(test_frame(40, 30)));
    let outcome = running.await.unwrap().unwrap();
    assert!(matches!(outcome, SessionOutcome::Completed(r) if r.frames == 4 && !r.recorded));
}

#[tokio::test(start_paused = true)]
async fn metadata_timeout_releases_the_session() {
    let (camera, _sender) = ControlledCamera::new();
    let bound = binder::bind(&camera, &MediaConstraints::default_strategies(None), None).unwrap();
    let controller = bound.into_controller(small_layout()).with_timing(SessionTiming {
        metadata_timeout: Some(Duration::from_secs(5)),
        ..SessionTiming::default()
    });

    let err = controller.start_session().await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Camera(CameraError::MetadataTimeout)
    ));
    assert!(!controller.state().is_capturing());
}

#[tokio::test(start_paused = true)]
async fn mirrored_session_flips_every_capture() {
    let plain = controller_with(&FakeCapability::default());
    plain.set_countdown_seconds(1);
    plain.start_session().await.unwrap();

    let mirrored = controller_with(&FakeCapability::default());
    mirrored.set_countdown_seconds(1);
    mirrored.set_mirror(true);
    mirrored.start_session().await.unwrap();

    for index in 0..4 {
        let a = plain.state().captures.get(index).unwrap().decode().unwrap();
        let b = mirrored.state().captures.get(index).unwrap().decode().unwrap();
        assert_eq!(b, imageops::flip_horizontal(&a));
    }
}

#[tokio::test(start_paused = true)]
async fn negative_delay_skips_the_countdown() {
    let controller = controller_with(&FakeCapability::default());
    controller.set_countdown_input("-5");

    let SessionOutcome::Completed(report) = controller.start_session().await.unwrap() else {
        panic!("session was rejected");
    };
    assert_eq!(report.elapsed, Duration::from_millis(1600));
}

#[tokio::test(start_paused = true)]
async fn captures_show_up_on_the_preview_board() {
    let layout = small_layout();
    let mut board = PreviewBoard::new(
        StripTemplate::new(
            photobooth::template::TemplateSource::Builtin {
                width: 221,
                height: 500,
            },
            layout.clone(),
        ),
        Vec::new(),
        221.0,
    );
    board.load_main().await.unwrap();
    let board = Arc::new(Mutex::new(board));

    let device = StillImageDevice::test_pattern(64, 48);
    let bound = binder::bind(&device, &MediaConstraints::default_strategies(None), None).unwrap();
    let controller = bound
        .into_controller(layout)
        .with_board(Arc::clone(&board));
    controller.set_countdown_seconds(1);
    controller.start_session().await.unwrap();

    let board = board.lock().unwrap();
    for index in 0..4 {
        assert_eq!(
            board.bound_capture(index),
            controller.state().captures.get(index).as_ref()
        );
    }
}

#[test]
fn state_starts_idle() {
    let state = SessionState::default();
    assert!(!state.is_capturing());
    assert!(state.captures.is_empty());
    assert!(state.recording.is_empty());
}
